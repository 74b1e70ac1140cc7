//! Solver parameter block and its validation.
//!
//! Physics choices are tagged sums with per-variant payloads, so an invalid
//! combination is either unrepresentable or rejected by [`DivaParams::validate`]
//! before the first iteration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Sliding law producing the scalar friction coefficient `beta` on aa-nodes.
///
/// `q` is the inverse sliding exponent (`q = 1/m`); `u_0` regularizes the
/// Coulomb law at low speeds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SlidingLaw {
    /// Spatially uniform coefficient, ignoring the bed field.
    Constant { beta: f64 },
    /// `beta = c_bed`
    Linear,
    /// `beta = c_bed^q · |u_b|^(q-1)`
    Power { q: f64 },
    /// `beta = c_bed · (|u_b| / (|u_b| + u_0))^q / |u_b|`
    RegularizedCoulomb { q: f64, u_0: f64 },
}

/// Multiplicative reduction of `beta` approaching the grounding line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GroundingLineScaling {
    None,
    /// Scale by `f_gl` at any grounded node whose 4-neighborhood contains a
    /// fully floating cell.
    Fractional { f_gl: f64 },
    /// Scale by `min(H_grnd, h_grnd_lim) / h_grnd_lim`.
    ThicknessRamp { h_grnd_lim: f64 },
    /// Scale by the thickness above floatation (optionally normalized by
    /// the ice thickness).
    ZStar { norm: bool },
}

/// Rule for staggering `beta` from aa-nodes to ac-nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BetaStagger {
    /// Arithmetic mean of the two adjacent centers.
    Simple,
    /// Zero over fully floating edges, grounded-side value across the
    /// grounding line, mean elsewhere.
    Upstream,
    /// Blend across the grounding line by the edge grounded fraction.
    Subgrid,
}

/// Map-plane boundary policy for the momentum solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Boundaries {
    /// Copy the adjacent interior value outward after each solve.
    ZeroGradient,
    /// Wrap-around halos on the staggered grids.
    Periodic,
    /// Border values are prescribed by the caller and never touched.
    Infinite,
}

/// Effective-pressure model modulating basal friction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EffectivePressure {
    /// No effective-pressure scaling of `beta`.
    None,
    /// Full overburden: `N_eff = rho_ice · g · H_ice` (no water pressure).
    Overburden,
    /// Leguy et al. (2014): water pressure ramps up with ocean connectivity
    /// exponent `p` (`0` sealed bed, `1` full connection).
    Leguy { p: f64 },
}

/// Parameter block for one velocity solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivaParams {
    /// Opaque option string forwarded to the linear-solver backend.
    pub solver_opt: String,
    pub boundaries: Boundaries,
    /// Frozen bed: basal velocity is identically zero.
    pub no_slip: bool,
    pub sliding_law: SlidingLaw,
    pub gl_scaling: GroundingLineScaling,
    pub gl_stagger: BetaStagger,
    pub effective_pressure: EffectivePressure,
    /// Friction floor over grounded ice (Pa a m⁻¹)
    pub beta_min: f64,
    /// Gaussian smoothing of `beta` in units of `dx` (0 disables)
    pub beta_smooth_n: f64,
    /// Basal-speed floor entering the sliding laws (m/a)
    pub u_b_min: f64,
    /// Effective strain rate floor (a⁻¹), squared before use
    pub eps_0: f64,
    /// Effective viscosity floor (Pa a)
    pub visc_min: f64,
    /// Glen flow-law exponent
    pub n_glen: f64,
    /// Cap on solved velocity components (m/a)
    pub ssa_vel_max: f64,
    pub ssa_iter_max: usize,
    /// Picard relaxation factor in (0, 1]
    pub ssa_iter_rel: f64,
    /// Relative L2 convergence tolerance
    pub ssa_iter_conv: f64,
    /// Per-cell relative L1 tolerance below which a cell is frozen out of
    /// the solve after the first iteration (0 disables pruning)
    pub ssa_prune_tol: f64,
    /// Emit per-iteration convergence diagnostics at debug level.
    pub ssa_write_log: bool,
}

impl Default for DivaParams {
    fn default() -> Self {
        Self {
            solver_opt: String::new(),
            boundaries: Boundaries::ZeroGradient,
            no_slip: false,
            sliding_law: SlidingLaw::RegularizedCoulomb { q: 0.2, u_0: 100.0 },
            gl_scaling: GroundingLineScaling::None,
            gl_stagger: BetaStagger::Subgrid,
            effective_pressure: EffectivePressure::Leguy { p: 1.0 },
            beta_min: 10.0,
            beta_smooth_n: 0.0,
            u_b_min: 1e-3,
            eps_0: 1e-8,
            visc_min: 1e3,
            n_glen: 3.0,
            ssa_vel_max: 5000.0,
            ssa_iter_max: 100,
            ssa_iter_rel: 0.7,
            ssa_iter_conv: 1e-3,
            ssa_prune_tol: 1e-5,
            ssa_write_log: false,
        }
    }
}

/// Fatal configuration errors, reported before any iteration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("grounding-line thickness ramp requires H_grnd_lim > 0 (got {0})")]
    NonPositiveHGrndLim(f64),
    #[error("grounding-line scaling fraction must lie in [0,1] (got {0})")]
    GlFractionOutOfRange(f64),
    #[error("ocean connectivity exponent must lie in [0,1] (got {0})")]
    ConnectivityOutOfRange(f64),
    #[error("relaxation factor must lie in (0,1] (got {0})")]
    RelaxationOutOfRange(f64),
    #[error("Glen exponent must be positive (got {0})")]
    NonPositiveGlenExponent(f64),
    #[error("at least one iteration is required")]
    ZeroIterations,
    #[error("viscosity floor must be positive (got {0})")]
    NonPositiveViscosityFloor(f64),
}

impl DivaParams {
    /// Check the parameter block; every violation is fatal.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.gl_scaling {
            GroundingLineScaling::ThicknessRamp { h_grnd_lim } if h_grnd_lim <= 0.0 => {
                return Err(ConfigError::NonPositiveHGrndLim(h_grnd_lim));
            }
            GroundingLineScaling::Fractional { f_gl } if !(0.0..=1.0).contains(&f_gl) => {
                return Err(ConfigError::GlFractionOutOfRange(f_gl));
            }
            _ => {}
        }
        if let EffectivePressure::Leguy { p } = self.effective_pressure {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::ConnectivityOutOfRange(p));
            }
        }
        if !(self.ssa_iter_rel > 0.0 && self.ssa_iter_rel <= 1.0) {
            return Err(ConfigError::RelaxationOutOfRange(self.ssa_iter_rel));
        }
        if self.n_glen <= 0.0 {
            return Err(ConfigError::NonPositiveGlenExponent(self.n_glen));
        }
        if self.ssa_iter_max == 0 {
            return Err(ConfigError::ZeroIterations);
        }
        if self.visc_min <= 0.0 {
            return Err(ConfigError::NonPositiveViscosityFloor(self.visc_min));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_are_valid() {
        assert!(DivaParams::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_thickness_ramp() {
        let params = DivaParams {
            gl_scaling: GroundingLineScaling::ThicknessRamp { h_grnd_lim: 0.0 },
            ..DivaParams::default()
        };
        assert_eq!(
            params.validate(),
            Err(ConfigError::NonPositiveHGrndLim(0.0))
        );
    }

    #[test]
    fn rejects_gl_fraction_outside_unit_interval() {
        let params = DivaParams {
            gl_scaling: GroundingLineScaling::Fractional { f_gl: 1.5 },
            ..DivaParams::default()
        };
        assert_eq!(
            params.validate(),
            Err(ConfigError::GlFractionOutOfRange(1.5))
        );
    }

    #[test]
    fn rejects_relaxation_outside_half_open_interval() {
        for rel in [0.0, -0.1, 1.2] {
            let params = DivaParams {
                ssa_iter_rel: rel,
                ..DivaParams::default()
            };
            assert!(params.validate().is_err());
        }
    }
}
