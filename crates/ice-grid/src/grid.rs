//! Map-plane grid geometry and the sigma vertical axis.

use serde::{Deserialize, Serialize};

/// A regular map-plane grid with a terrain-following sigma axis.
///
/// `zeta_aa` holds the layer-center samples of the normalized vertical
/// coordinate with `zeta_aa[0] = 0` at the ice base and
/// `zeta_aa[nz-1] = 1` at the surface. `zeta_ac` holds the interface
/// samples between consecutive layer centers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    pub nx: usize,
    pub ny: usize,
    pub nz: usize,
    /// Grid spacing in x (m)
    pub dx: f64,
    /// Grid spacing in y (m)
    pub dy: f64,
    pub zeta_aa: Vec<f64>,
    pub zeta_ac: Vec<f64>,
}

impl Grid {
    /// Create a grid with `nz` evenly spaced vertical samples.
    pub fn new(nx: usize, ny: usize, nz: usize, dx: f64, dy: f64) -> Self {
        assert!(nz >= 2, "vertical axis needs at least two samples");
        let zeta_aa: Vec<f64> = (0..nz).map(|k| k as f64 / (nz - 1) as f64).collect();
        Self::with_zeta(nx, ny, dx, dy, zeta_aa)
    }

    /// Create a grid from an explicit vertical axis.
    ///
    /// `zeta_aa` must be strictly increasing from 0 to 1.
    pub fn with_zeta(nx: usize, ny: usize, dx: f64, dy: f64, zeta_aa: Vec<f64>) -> Self {
        let nz = zeta_aa.len();
        assert!(nz >= 2, "vertical axis needs at least two samples");
        assert!(zeta_aa[0] == 0.0 && zeta_aa[nz - 1] == 1.0, "zeta spans [0,1]");
        assert!(
            zeta_aa.windows(2).all(|w| w[1] > w[0]),
            "zeta must be strictly increasing"
        );
        let zeta_ac: Vec<f64> = zeta_aa.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect();
        Self {
            nx,
            ny,
            nz,
            dx,
            dy,
            zeta_aa,
            zeta_ac,
        }
    }

    /// Number of map-plane nodes per field.
    pub fn len_2d(&self) -> usize {
        self.nx * self.ny
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_zeta_spans_unit_interval() {
        let g = Grid::new(4, 4, 5, 1000.0, 1000.0);
        assert_eq!(g.zeta_aa, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(g.zeta_ac.len(), 4);
        assert_eq!(g.zeta_ac[0], 0.125);
    }

    #[test]
    #[should_panic(expected = "strictly increasing")]
    fn rejects_non_monotone_zeta() {
        let _ = Grid::with_zeta(4, 4, 1.0, 1.0, vec![0.0, 0.6, 0.5, 1.0]);
    }
}
