//! Linear-solver backend abstraction.
//!
//! The momentum assembly produces a backend-agnostic sparse system; the
//! actual solve is dispatched through the [`LinearSolver`] trait so the
//! numerical library can be swapped without touching the physics.

pub mod dense_lu;
pub mod pcg;
pub mod traits;

pub use dense_lu::DenseLuBackend;
pub use pcg::PcgBackend;
pub use traits::{BackendError, LinearSolver, MomentumSystem, SolveInfo, SparseTriplets};

/// Resolve the opaque solver option string to a backend.
///
/// `"pcg"` selects the Jacobi-preconditioned conjugate gradient; anything
/// else (including the empty string) selects the dense LU path.
pub fn default_backend(solver_opt: &str) -> Box<dyn LinearSolver> {
    match solver_opt {
        "pcg" => Box::new(PcgBackend::default()),
        _ => Box::new(DenseLuBackend),
    }
}
