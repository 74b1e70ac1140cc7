//! Process-wide physical constants.
//!
//! Loaded once by the caller and threaded through every component as an
//! immutable struct; nothing here is a hidden global.

use serde::{Deserialize, Serialize};

/// Physical constants in SI units except where noted. Velocities throughout
/// the solver are m/a and viscosities Pa·a, so `sec_year` is the bridge for
/// callers whose rate factors arrive in SI time units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalConstants {
    /// Gravitational acceleration (m s⁻²)
    pub g: f64,
    /// Ice density (kg m⁻³)
    pub rho_ice: f64,
    /// Seawater density (kg m⁻³)
    pub rho_sw: f64,
    /// Freshwater density (kg m⁻³)
    pub rho_w: f64,
    /// Seconds per year
    pub sec_year: f64,
    /// Melting point at standard pressure (K)
    pub t0: f64,
    /// Latent heat of fusion of ice (J kg⁻¹)
    pub l_ice: f64,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            g: 9.81,
            rho_ice: 910.0,
            rho_sw: 1028.0,
            rho_w: 1000.0,
            sec_year: 31_536_000.0,
            t0: 273.15,
            l_ice: 3.35e5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_densities_order_correctly() {
        let c = PhysicalConstants::default();
        assert!(c.rho_ice < c.rho_w);
        assert!(c.rho_w < c.rho_sw);
    }
}
