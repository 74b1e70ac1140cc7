//! Field state owned by the DIVA coordinator during a solve.

use ice_grid::{Aa, Acx, Acy, Field2, Field3, Grid, Mask2};

use crate::params::Boundaries;

/// Static inputs supplied by the caller for one velocity solve.
///
/// All geometry is aa-centered except the driving stress and the edge
/// grounded fractions, which live on the faces they act on.
#[derive(Debug, Clone)]
pub struct IceGeometry {
    /// Ice thickness (m)
    pub h_ice: Field2<Aa>,
    /// Overburden thickness above floatation (m)
    pub h_grnd: Field2<Aa>,
    /// Grounded area fraction in [0,1]
    pub f_grnd: Field2<Aa>,
    pub f_grnd_acx: Field2<Acx>,
    pub f_grnd_acy: Field2<Acy>,
    /// Bed elevation (m)
    pub z_bed: Field2<Aa>,
    /// Sea level (m)
    pub z_sl: Field2<Aa>,
    /// Basal water column (m)
    pub h_w: Field2<Aa>,
    /// Bed roughness entering the sliding law
    pub c_bed: Field2<Aa>,
    /// Glen rate factor per layer (a⁻¹ Pa⁻ⁿ)
    pub att: Field3<Aa>,
    /// Driving stress (Pa)
    pub taud_acx: Field2<Acx>,
    pub taud_acy: Field2<Acy>,
}

impl IceGeometry {
    /// Geometry with every field zeroed, for callers that fill it in parts.
    pub fn zeros(grid: &Grid) -> Self {
        let (nx, ny, nz) = (grid.nx, grid.ny, grid.nz);
        Self {
            h_ice: Field2::zeros(nx, ny),
            h_grnd: Field2::zeros(nx, ny),
            f_grnd: Field2::zeros(nx, ny),
            f_grnd_acx: Field2::zeros(nx, ny),
            f_grnd_acy: Field2::zeros(nx, ny),
            z_bed: Field2::zeros(nx, ny),
            z_sl: Field2::zeros(nx, ny),
            h_w: Field2::zeros(nx, ny),
            c_bed: Field2::zeros(nx, ny),
            att: Field3::zeros(nx, ny, nz),
            taud_acx: Field2::zeros(nx, ny),
            taud_acy: Field2::zeros(nx, ny),
        }
    }
}

/// Velocity solution state: warm-started from the previous outer step or
/// zero-initialized for a cold start, updated in place by the solve.
#[derive(Debug, Clone)]
pub struct VelocityState {
    /// Full 3-D horizontal velocity (m/a)
    pub ux: Field3<Acx>,
    pub uy: Field3<Acy>,
    /// Internal (deformational) velocity, `u - u_b`
    pub ux_i: Field3<Acx>,
    pub uy_i: Field3<Acy>,
    /// Depth-averaged velocity (m/a)
    pub ux_bar: Field2<Acx>,
    pub uy_bar: Field2<Acy>,
    /// Basal velocity (m/a)
    pub ux_b: Field2<Acx>,
    pub uy_b: Field2<Acy>,
    /// Vertical shear per layer (a⁻¹)
    pub duxdz: Field3<Acx>,
    pub duydz: Field3<Acy>,
    /// Basal stress (Pa)
    pub taub_acx: Field2<Acx>,
    pub taub_acy: Field2<Acy>,
    /// Effective viscosity per layer (Pa a)
    pub visc_eff: Field3<Aa>,
    /// Depth-integrated effective viscosity (Pa a m)
    pub visc_eff_int: Field2<Aa>,
    /// Basal friction coefficient (Pa a m⁻¹)
    pub beta: Field2<Aa>,
    pub beta_acx: Field2<Acx>,
    pub beta_acy: Field2<Acy>,
    /// Effective friction after the vertical-shear correction
    pub beta_eff: Field2<Aa>,
    pub beta_eff_acx: Field2<Acx>,
    pub beta_eff_acy: Field2<Acy>,
    /// Diagnostic inversion of the effective friction
    pub beta_diva: Field2<Aa>,
    /// Effective pressure (bar)
    pub n_eff: Field2<Aa>,
    /// Solver-region masks (positive = solve, 0 = prescribed, negative = frozen)
    pub ssa_mask_acx: Mask2<Acx>,
    pub ssa_mask_acy: Mask2<Acy>,
    /// Per-cell relative L1 error from the previous iteration
    pub ssa_err_acx: Field2<Acx>,
    pub ssa_err_acy: Field2<Acy>,
    /// Iterations taken by the most recent solve
    pub ssa_iter_now: usize,
}

impl VelocityState {
    /// Cold-start state: all velocities and stresses zero, masks prescribed.
    pub fn zeros(grid: &Grid) -> Self {
        let (nx, ny, nz) = (grid.nx, grid.ny, grid.nz);
        Self {
            ux: Field3::zeros(nx, ny, nz),
            uy: Field3::zeros(nx, ny, nz),
            ux_i: Field3::zeros(nx, ny, nz),
            uy_i: Field3::zeros(nx, ny, nz),
            ux_bar: Field2::zeros(nx, ny),
            uy_bar: Field2::zeros(nx, ny),
            ux_b: Field2::zeros(nx, ny),
            uy_b: Field2::zeros(nx, ny),
            duxdz: Field3::zeros(nx, ny, nz),
            duydz: Field3::zeros(nx, ny, nz),
            taub_acx: Field2::zeros(nx, ny),
            taub_acy: Field2::zeros(nx, ny),
            visc_eff: Field3::zeros(nx, ny, nz),
            visc_eff_int: Field2::zeros(nx, ny),
            beta: Field2::zeros(nx, ny),
            beta_acx: Field2::zeros(nx, ny),
            beta_acy: Field2::zeros(nx, ny),
            beta_eff: Field2::zeros(nx, ny),
            beta_eff_acx: Field2::zeros(nx, ny),
            beta_eff_acy: Field2::zeros(nx, ny),
            beta_diva: Field2::zeros(nx, ny),
            n_eff: Field2::zeros(nx, ny),
            ssa_mask_acx: Mask2::zeros(nx, ny),
            ssa_mask_acy: Mask2::zeros(nx, ny),
            ssa_err_acx: Field2::zeros(nx, ny),
            ssa_err_acy: Field2::zeros(nx, ny),
            ssa_iter_now: 0,
        }
    }
}

/// Build initial solver-region masks from the ice cover and boundary policy:
/// interior edges touching ice are solved, everything else is prescribed.
///
/// Under `Periodic` the halo columns/rows stay prescribed and are filled by
/// the wrap assignment instead.
pub fn default_ssa_masks(
    grid: &Grid,
    h_ice: &Field2<Aa>,
    boundaries: Boundaries,
) -> (Mask2<Acx>, Mask2<Acy>) {
    let (nx, ny) = (grid.nx, grid.ny);
    let mut mask_acx = Mask2::zeros(nx, ny);
    let mut mask_acy = Mask2::zeros(nx, ny);

    // interior stencil support: one aa neighbor each side plus an ab row;
    // periodic keeps an extra halo cell on the staggered axis
    let (i_hi_x, j_hi_x, i_hi_y, j_hi_y) = match boundaries {
        Boundaries::Periodic => (nx - 3, ny - 2, nx - 2, ny - 3),
        _ => (nx - 2, ny - 2, nx - 2, ny - 2),
    };

    for j in 1..=j_hi_x {
        for i in 1..=i_hi_x {
            if h_ice[(i, j)] > 0.0 || h_ice[(i + 1, j)] > 0.0 {
                mask_acx[(i, j)] = 1;
            }
        }
    }
    for j in 1..=j_hi_y {
        for i in 1..=i_hi_y {
            if h_ice[(i, j)] > 0.0 || h_ice[(i, j + 1)] > 0.0 {
                mask_acy[(i, j)] = 1;
            }
        }
    }
    (mask_acx, mask_acy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cold_start_state_is_all_zero() {
        let grid = Grid::new(5, 5, 4, 1e3, 1e3);
        let state = VelocityState::zeros(&grid);
        assert_eq!(state.ux_bar.max_abs(), 0.0);
        assert_eq!(state.ssa_mask_acx.count_active(), 0);
        assert_eq!(state.ssa_iter_now, 0);
    }

    #[test]
    fn default_masks_cover_iced_interior_only() {
        let grid = Grid::new(6, 6, 3, 1e3, 1e3);
        let h_ice = Field2::constant(6, 6, 500.0);
        let (mx, my) = default_ssa_masks(&grid, &h_ice, Boundaries::ZeroGradient);
        // borders prescribed
        assert_eq!(mx[(0, 2)], 0);
        assert_eq!(mx[(5, 2)], 0);
        assert_eq!(mx[(2, 0)], 0);
        // interior active
        assert_eq!(mx[(2, 2)], 1);
        assert_eq!(my[(2, 2)], 1);
    }

    #[test]
    fn ice_free_domain_yields_empty_masks() {
        let grid = Grid::new(6, 6, 3, 1e3, 1e3);
        let h_ice = Field2::zeros(6, 6);
        let (mx, my) = default_ssa_masks(&grid, &h_ice, Boundaries::ZeroGradient);
        assert_eq!(mx.count_active(), 0);
        assert_eq!(my.count_active(), 0);
    }
}
