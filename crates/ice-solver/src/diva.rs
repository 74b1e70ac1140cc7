//! DIVA coordinator: the nonlinear fixed-point loop over viscosity, drag
//! and the depth-integrated momentum solve.
//!
//! Each iteration reads the previous depth-averaged velocity, rebuilds the
//! vertical-shear profile from the basal stress, recomputes the 3-D
//! effective viscosity and the basal drag, solves the 2-D momentum system,
//! relaxes the update, and tests convergence. After the loop the full 3-D
//! velocity is reconstructed from the basal velocity and the cumulative
//! F-integral (Goldberg 2011; Lipscomb et al. 2019).
//!
//! Non-convergence is reported, not fatal: the latest iterate is returned,
//! matching practice where transients occasionally fail to settle between
//! outer time steps.

use thiserror::Error;

use ice_grid::{Acx, Acy, Field2, Grid};

use crate::backend::{BackendError, LinearSolver};
use crate::basal_drag::{
    basal_speed_aa, diagnose_beta_diva, effective_friction, effective_pressure,
    friction_coefficient, stagger_beta,
};
use crate::constants::PhysicalConstants;
use crate::momentum::{apply_boundaries, solve_momentum};
use crate::params::{ConfigError, DivaParams};
use crate::state::{IceGeometry, VelocityState};
use crate::viscosity::{
    depth_integrated_viscosity, effective_viscosity, f_integral, f_integral_cumulative,
    stagger_acx_ice_margin, stagger_acx_ice_margin_3, stagger_acy_ice_margin,
    stagger_acy_ice_margin_3,
};

/// Denominator floor (m/a) for the per-cell relative error, so stagnant
/// cells measure their change absolutely and can still be pruned.
const U_ERR_FLOOR: f64 = 1e-3;

/// Fatal failures of a velocity solve.
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("linear solver failed: {0}")]
    Backend(#[from] BackendError),
}

/// Outcome of one coordinated solve.
#[derive(Debug, Clone)]
pub struct DivaResults {
    /// Iterations taken (also mirrored into the state)
    pub iterations: usize,
    /// Whether the relative L2 change dropped below tolerance
    pub converged: bool,
    /// Final relative L2 change over masked faces
    pub resid: f64,
    /// Relative change per iteration
    pub iteration_history: Vec<f64>,
}

/// Driver owning the fixed-point iteration for one velocity solve.
pub struct DivaSolver<'a> {
    grid: &'a Grid,
    consts: &'a PhysicalConstants,
    params: &'a DivaParams,
    backend: &'a dyn LinearSolver,
}

impl<'a> DivaSolver<'a> {
    /// Validate the configuration and build a solver.
    pub fn new(
        grid: &'a Grid,
        consts: &'a PhysicalConstants,
        params: &'a DivaParams,
        backend: &'a dyn LinearSolver,
    ) -> Result<Self, ConfigError> {
        params.validate()?;
        Ok(Self {
            grid,
            consts,
            params,
            backend,
        })
    }

    /// Run the fixed-point iteration, updating `state` in place.
    pub fn solve(
        &self,
        geom: &IceGeometry,
        state: &mut VelocityState,
    ) -> Result<DivaResults, SolverError> {
        let grid = self.grid;
        let params = self.params;
        let (nx, ny) = (grid.nx, grid.ny);

        state.n_eff = effective_pressure(
            params.effective_pressure,
            self.consts,
            &geom.h_ice,
            &geom.z_bed,
            &geom.z_sl,
        );

        let mut history = Vec::new();
        let mut converged = false;
        let mut resid = f64::INFINITY;

        for iter in 1..=params.ssa_iter_max {
            state.ssa_iter_now = iter;

            let ux_prev = state.ux_bar.clone();
            let uy_prev = state.uy_bar.clone();

            self.update_vertical_shear(geom, state);

            state.visc_eff = effective_viscosity(
                grid,
                &state.ux_bar,
                &state.uy_bar,
                &state.duxdz,
                &state.duydz,
                &geom.att,
                params.n_glen,
                params.eps_0,
                params.visc_min,
            );
            state.visc_eff_int = depth_integrated_viscosity(grid, &state.visc_eff, &geom.h_ice);
            let f2 = f_integral(grid, &state.visc_eff, &geom.h_ice, params.visc_min, 2);

            let u_b_aa = basal_speed_aa(grid, &state.ux_b, &state.uy_b, params.u_b_min);
            state.beta = friction_coefficient(
                params,
                self.consts,
                &geom.c_bed,
                &geom.h_ice,
                &geom.h_grnd,
                &geom.f_grnd,
                &geom.z_bed,
                &geom.z_sl,
                &u_b_aa,
                &state.n_eff,
            );
            (state.beta_acx, state.beta_acy) = stagger_beta(
                params.gl_stagger,
                &state.beta,
                &geom.f_grnd,
                &geom.f_grnd_acx,
                &geom.f_grnd_acy,
            );
            state.beta_eff = effective_friction(params.no_slip, &state.beta, &f2);
            state.beta_diva = diagnose_beta_diva(&state.beta);

            let f2_acx = stagger_acx_ice_margin(&f2, &geom.h_ice);
            let f2_acy = stagger_acy_ice_margin(&f2, &geom.h_ice);
            if params.no_slip {
                // invert the staggered F2 directly so that
                // beta_eff * F2 == 1 holds face-by-face and the basal
                // velocity vanishes exactly
                for j in 0..ny {
                    for i in 0..nx {
                        state.beta_eff_acx[(i, j)] = 1.0 / f2_acx[(i, j)];
                        state.beta_eff_acy[(i, j)] = 1.0 / f2_acy[(i, j)];
                    }
                }
            } else {
                (state.beta_eff_acx, state.beta_eff_acy) = stagger_beta(
                    params.gl_stagger,
                    &state.beta_eff,
                    &geom.f_grnd,
                    &geom.f_grnd_acx,
                    &geom.f_grnd_acy,
                );
            }

            if iter > 1 && params.ssa_prune_tol > 0.0 {
                prune_mask(&mut state.ssa_mask_acx, &state.ssa_err_acx, params.ssa_prune_tol);
                prune_mask(&mut state.ssa_mask_acy, &state.ssa_err_acy, params.ssa_prune_tol);
            }

            let diag = solve_momentum(
                grid,
                params.boundaries,
                &state.visc_eff_int,
                &state.beta_eff_acx,
                &state.beta_eff_acy,
                &geom.taud_acx,
                &geom.taud_acy,
                &state.ssa_mask_acx,
                &state.ssa_mask_acy,
                params.ssa_vel_max,
                &mut state.ux_bar,
                &mut state.uy_bar,
                self.backend,
            )?;
            if params.ssa_write_log && diag.capped > 0 {
                log::debug!(
                    "velocity cap clamped {} components at {} m/a",
                    diag.capped,
                    params.ssa_vel_max
                );
            }

            let rel = params.ssa_iter_rel;
            relax(&mut state.ux_bar, &ux_prev, rel);
            relax(&mut state.uy_bar, &uy_prev, rel);
            apply_boundaries(params.boundaries, &mut state.ux_bar, &mut state.uy_bar);

            resid = self.measure_convergence(state, &ux_prev, &uy_prev);
            history.push(resid);
            if params.ssa_write_log {
                log::debug!(
                    "iteration {:3}: rel change {:.3e}, momentum residual {:.3e}, active {}",
                    iter,
                    resid,
                    diag.residual_norm,
                    state.ssa_mask_acx.count_active() + state.ssa_mask_acy.count_active()
                );
            }

            // basal stress and basal velocity for the next drag evaluation
            for j in 0..ny {
                for i in 0..nx {
                    state.taub_acx[(i, j)] = state.beta_eff_acx[(i, j)] * state.ux_bar[(i, j)];
                    state.taub_acy[(i, j)] = state.beta_eff_acy[(i, j)] * state.uy_bar[(i, j)];
                    state.ux_b[(i, j)] =
                        state.ux_bar[(i, j)] - state.taub_acx[(i, j)] * f2_acx[(i, j)];
                    state.uy_b[(i, j)] =
                        state.uy_bar[(i, j)] - state.taub_acy[(i, j)] * f2_acy[(i, j)];
                }
            }

            if resid < params.ssa_iter_conv {
                converged = true;
                break;
            }
        }

        if !converged {
            log::warn!(
                "velocity solve did not converge in {} iterations (rel change {:.3e} > {:.3e}); returning latest iterate",
                state.ssa_iter_now,
                resid,
                params.ssa_iter_conv
            );
        }

        self.reconstruct_velocity_profile(geom, state);

        Ok(DivaResults {
            iterations: state.ssa_iter_now,
            converged,
            resid,
            iteration_history: history,
        })
    }

    /// `du/dz = (taub / visc) (1 - zeta)` per layer, with the viscosity
    /// staggered to the face one-sidedly at ice margins. The surface layer
    /// is shear-free by construction.
    fn update_vertical_shear(&self, geom: &IceGeometry, state: &mut VelocityState) {
        let grid = self.grid;
        let visc_acx = stagger_acx_ice_margin_3(&state.visc_eff, &geom.h_ice);
        let visc_acy = stagger_acy_ice_margin_3(&state.visc_eff, &geom.h_ice);
        for k in 0..grid.nz {
            let shape = 1.0 - grid.zeta_aa[k];
            for j in 0..grid.ny {
                for i in 0..grid.nx {
                    let vx = visc_acx[(i, j, k)].max(self.params.visc_min);
                    let vy = visc_acy[(i, j, k)].max(self.params.visc_min);
                    state.duxdz[(i, j, k)] = state.taub_acx[(i, j)] / vx * shape;
                    state.duydz[(i, j, k)] = state.taub_acy[(i, j)] / vy * shape;
                }
            }
        }
    }

    /// Relative L2 change over faces still marked for solving, plus the
    /// per-cell relative L1 errors consumed by mask pruning. Reductions run
    /// in a fixed order for bit-reproducibility.
    fn measure_convergence(
        &self,
        state: &mut VelocityState,
        ux_prev: &Field2<Acx>,
        uy_prev: &Field2<Acy>,
    ) -> f64 {
        let (nx, ny) = (self.grid.nx, self.grid.ny);
        let mut du_sq = 0.0;
        let mut u_sq = 0.0;
        for j in 0..ny {
            for i in 0..nx {
                let du = state.ux_bar[(i, j)] - ux_prev[(i, j)];
                state.ssa_err_acx[(i, j)] =
                    du.abs() / state.ux_bar[(i, j)].abs().max(U_ERR_FLOOR);
                if state.ssa_mask_acx[(i, j)] > 0 {
                    du_sq += du * du;
                    u_sq += state.ux_bar[(i, j)] * state.ux_bar[(i, j)];
                }
                let dv = state.uy_bar[(i, j)] - uy_prev[(i, j)];
                state.ssa_err_acy[(i, j)] =
                    dv.abs() / state.uy_bar[(i, j)].abs().max(U_ERR_FLOOR);
                if state.ssa_mask_acy[(i, j)] > 0 {
                    du_sq += dv * dv;
                    u_sq += state.uy_bar[(i, j)] * state.uy_bar[(i, j)];
                }
            }
        }
        if u_sq > 0.0 { (du_sq / u_sq).sqrt() } else { 0.0 }
    }

    /// Rebuild the 3-D horizontal velocity from the basal velocity and the
    /// cumulative F-integral, then split off the internal (deformational)
    /// part. The base layer reproduces the basal velocity exactly.
    fn reconstruct_velocity_profile(&self, geom: &IceGeometry, state: &mut VelocityState) {
        let grid = self.grid;
        let f1c =
            f_integral_cumulative(grid, &state.visc_eff, &geom.h_ice, self.params.visc_min);
        let f1c_acx = stagger_acx_ice_margin_3(&f1c, &geom.h_ice);
        let f1c_acy = stagger_acy_ice_margin_3(&f1c, &geom.h_ice);
        for k in 0..grid.nz {
            for j in 0..grid.ny {
                for i in 0..grid.nx {
                    let ux = state.ux_b[(i, j)] + state.taub_acx[(i, j)] * f1c_acx[(i, j, k)];
                    let uy = state.uy_b[(i, j)] + state.taub_acy[(i, j)] * f1c_acy[(i, j, k)];
                    state.ux[(i, j, k)] = ux;
                    state.uy[(i, j, k)] = uy;
                    state.ux_i[(i, j, k)] = ux - state.ux_b[(i, j)];
                    state.uy_i[(i, j, k)] = uy - state.uy_b[(i, j)];
                }
            }
        }
    }
}

fn relax<N: ice_grid::NodeFlavor>(
    u_new: &mut Field2<N>,
    u_prev: &Field2<N>,
    rel: f64,
) {
    let prev = u_prev.as_slice();
    for (v, &p) in u_new.as_mut_slice().iter_mut().zip(prev) {
        *v = rel * *v + (1.0 - rel) * p;
    }
}

fn prune_mask<N: ice_grid::NodeFlavor>(
    mask: &mut ice_grid::Mask2<N>,
    err: &Field2<N>,
    tol: f64,
) {
    let (nx, ny) = (mask.nx(), mask.ny());
    for j in 0..ny {
        for i in 0..nx {
            if mask[(i, j)] > 0 && err[(i, j)] < tol {
                mask[(i, j)] = -1;
            }
        }
    }
}
