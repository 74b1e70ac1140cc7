//! Iteration behavior: graceful non-convergence, the velocity cap, warm
//! starts and the recorded convergence history.

use ice_grid::Grid;
use ice_solver::{
    Boundaries, DenseLuBackend, DivaParams, DivaSolver, EffectivePressure, IceGeometry,
    PhysicalConstants, SlidingLaw, VelocityState, default_backend, default_ssa_masks,
};

fn sliding_slab(
    params: DivaParams,
) -> (Grid, PhysicalConstants, DivaParams, IceGeometry, VelocityState) {
    let grid = Grid::new(10, 10, 11, 1e4, 1e4);
    let consts = PhysicalConstants::default();

    let mut geom = IceGeometry::zeros(&grid);
    let taud = consts.rho_ice * consts.g * 1000.0 * 1e-3;
    geom.h_ice.fill(1000.0);
    geom.h_grnd.fill(1000.0);
    geom.f_grnd.fill(1.0);
    geom.f_grnd_acx.fill(1.0);
    geom.f_grnd_acy.fill(1.0);
    geom.z_sl.fill(-9999.0);
    geom.att.fill(1e-16);
    geom.taud_acx.fill(taud);

    let mut state = VelocityState::zeros(&grid);
    (state.ssa_mask_acx, state.ssa_mask_acy) =
        default_ssa_masks(&grid, &geom.h_ice, params.boundaries);
    (grid, consts, params, geom, state)
}

fn base_params() -> DivaParams {
    DivaParams {
        boundaries: Boundaries::Periodic,
        sliding_law: SlidingLaw::Constant { beta: 100.0 },
        effective_pressure: EffectivePressure::None,
        ssa_iter_conv: 1e-6,
        ssa_iter_max: 200,
        ssa_vel_max: 1e6,
        ..DivaParams::default()
    }
}

#[test]
fn exhausted_iterations_return_the_latest_iterate_without_error() {
    let params = DivaParams {
        ssa_iter_max: 1,
        ..base_params()
    };
    let (grid, consts, params, geom, mut state) = sliding_slab(params);
    let solver = DivaSolver::new(&grid, &consts, &params, &DenseLuBackend).unwrap();
    let results = solver.solve(&geom, &mut state).unwrap();

    assert!(!results.converged);
    assert_eq!(results.iterations, 1);
    assert_eq!(state.ssa_iter_now, 1);
    assert_eq!(results.iteration_history.len(), 1);
    // the returned field is the relaxed first iterate, not zero
    assert!(state.ux_bar[(4, 4)] > 0.0);
}

#[test]
fn velocity_cap_bounds_the_solution() {
    let params = DivaParams {
        sliding_law: SlidingLaw::Constant { beta: 1e-3 },
        ssa_vel_max: 2000.0,
        ssa_iter_conv: 1e-3,
        ..base_params()
    };
    let (grid, consts, params, geom, mut state) = sliding_slab(params);
    let solver = DivaSolver::new(&grid, &consts, &params, &DenseLuBackend).unwrap();
    solver.solve(&geom, &mut state).unwrap();
    assert!(state.ux_bar.max_abs() <= 2000.0 + 1e-9);
    assert!(state.uy_bar.max_abs() <= 2000.0 + 1e-9);
}

#[test]
fn warm_start_converges_faster_than_cold_start() {
    let (grid, consts, params, geom, mut state) = sliding_slab(base_params());
    let solver = DivaSolver::new(&grid, &consts, &params, &DenseLuBackend).unwrap();
    let cold = solver.solve(&geom, &mut state).unwrap();
    assert!(cold.converged);

    // solve again from the converged state with re-armed masks
    (state.ssa_mask_acx, state.ssa_mask_acy) =
        default_ssa_masks(&grid, &geom.h_ice, params.boundaries);
    let warm = solver.solve(&geom, &mut state).unwrap();
    assert!(warm.converged);
    assert!(
        warm.iterations < cold.iterations,
        "warm {} vs cold {}",
        warm.iterations,
        cold.iterations
    );
}

#[test]
fn convergence_history_contracts() {
    let (grid, consts, params, geom, mut state) = sliding_slab(base_params());
    let solver = DivaSolver::new(&grid, &consts, &params, &DenseLuBackend).unwrap();
    let results = solver.solve(&geom, &mut state).unwrap();
    assert!(results.converged);
    assert_eq!(results.iteration_history.len(), results.iterations);

    let hist = &results.iteration_history;
    assert!(hist.last().unwrap() < &params.ssa_iter_conv);
    // the tail of the history shrinks monotonically
    let tail = &hist[hist.len().saturating_sub(4)..];
    for w in tail.windows(2) {
        assert!(w[1] <= w[0] * 1.5, "history not contracting: {:?}", tail);
    }
}

#[test]
fn iterative_backend_reproduces_the_direct_solution() {
    let (grid, consts, params, geom, mut state_lu) = sliding_slab(base_params());
    let solver_lu = DivaSolver::new(&grid, &consts, &params, &DenseLuBackend).unwrap();
    solver_lu.solve(&geom, &mut state_lu).unwrap();

    let params_pcg = DivaParams {
        solver_opt: "pcg".to_string(),
        ..params.clone()
    };
    let backend = default_backend(&params_pcg.solver_opt);
    let mut state_pcg = VelocityState::zeros(&grid);
    (state_pcg.ssa_mask_acx, state_pcg.ssa_mask_acy) =
        default_ssa_masks(&grid, &geom.h_ice, params_pcg.boundaries);
    let solver_pcg = DivaSolver::new(&grid, &consts, &params_pcg, backend.as_ref()).unwrap();
    solver_pcg.solve(&geom, &mut state_pcg).unwrap();

    for j in 0..grid.ny {
        for i in 0..grid.nx {
            let a = state_lu.ux_bar[(i, j)];
            let b = state_pcg.ux_bar[(i, j)];
            assert!(
                (a - b).abs() <= 1e-4 * a.abs().max(1.0),
                "backends disagree at ({i},{j}): {a} vs {b}"
            );
        }
    }
}
