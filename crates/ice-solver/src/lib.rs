//! Ice-sheet velocity solver under the depth-integrated viscosity
//! approximation (DIVA).
//!
//! The crate couples four components into a nonlinear fixed-point
//! iteration:
//!
//! 1. **Viscosity & strain engine** ([`viscosity`]) — 3-D effective
//!    viscosity from Glen's flow law and its depth integrals.
//! 2. **Basal-drag engine** ([`basal_drag`]) — friction coefficient from a
//!    sliding law, effective pressure and grounding-line scalings.
//! 3. **Momentum solver** ([`momentum`]) — the depth-integrated elliptic
//!    system on the staggered C-grid, solved through a swappable
//!    [`backend`].
//! 4. **Coordinator** ([`diva`]) — drives the loop, reconstructs the
//!    vertical structure, and reports convergence.
//!
//! Grid geometry, typed staggered fields and the shared numerical
//! utilities live in the companion `ice_grid` crate.

pub mod backend;
pub mod basal_drag;
pub mod constants;
pub mod diva;
pub mod momentum;
pub mod params;
pub mod state;
pub mod viscosity;

pub use backend::{
    BackendError, DenseLuBackend, LinearSolver, MomentumSystem, PcgBackend, SolveInfo,
    SparseTriplets, default_backend,
};
pub use basal_drag::{
    basal_speed_aa, diagnose_beta_diva, effective_friction, effective_pressure,
    friction_coefficient, stagger_beta,
};
pub use constants::PhysicalConstants;
pub use diva::{DivaResults, DivaSolver, SolverError};
pub use momentum::{MomentumDiagnostics, apply_boundaries, solve_momentum};
pub use params::{
    BetaStagger, Boundaries, ConfigError, DivaParams, EffectivePressure, GroundingLineScaling,
    SlidingLaw,
};
pub use state::{IceGeometry, VelocityState, default_ssa_masks};
pub use viscosity::{
    depth_integrated_viscosity, effective_viscosity, f_integral, f_integral_cumulative,
};
