//! Dense LU backend using nalgebra.
//!
//! Reconstructs the operator densely from COO triplets and factorizes it.
//! Robust for the grid sizes used in validation and regional runs; for
//! large domains prefer the iterative backend.

use nalgebra::{DMatrix, DVector};

use super::traits::{BackendError, LinearSolver, MomentumSystem, SolveInfo};

/// Direct solver backend; the default when no option string is given.
pub struct DenseLuBackend;

impl LinearSolver for DenseLuBackend {
    fn solve(&self, system: &MomentumSystem) -> Result<(DVector<f64>, SolveInfo), BackendError> {
        let n = system.num_dofs;

        let mut a = DMatrix::zeros(n, n);
        for idx in 0..system.matrix.nnz() {
            let r = system.matrix.row_indices[idx];
            let c = system.matrix.col_indices[idx];
            a[(r, c)] += system.matrix.values[idx];
        }

        let u = a
            .lu()
            .solve(&system.rhs)
            .ok_or(BackendError("singular momentum operator in LU solve".into()))?;

        Ok((
            u,
            SolveInfo {
                iterations: 1,
                residual_norm: None,
                solver_name: "nalgebra-LU".to_string(),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::traits::SparseTriplets;

    #[test]
    fn solves_diagonal_system() {
        let mut m = SparseTriplets::with_capacity(2, 2);
        m.push(0, 0, 2.0);
        m.push(1, 1, 4.0);
        let system = MomentumSystem {
            matrix: m,
            rhs: DVector::from_vec(vec![6.0, 8.0]),
            num_dofs: 2,
            fixed_dofs: vec![],
            initial_guess: DVector::zeros(2),
        };
        let (u, info) = DenseLuBackend.solve(&system).unwrap();
        assert!((u[0] - 3.0).abs() < 1e-14);
        assert!((u[1] - 2.0).abs() < 1e-14);
        assert_eq!(info.iterations, 1);
    }

    #[test]
    fn duplicate_triplets_accumulate() {
        let mut m = SparseTriplets::with_capacity(1, 2);
        m.push(0, 0, 1.5);
        m.push(0, 0, 1.5);
        let system = MomentumSystem {
            matrix: m,
            rhs: DVector::from_vec(vec![6.0]),
            num_dofs: 1,
            fixed_dofs: vec![],
            initial_guess: DVector::zeros(1),
        };
        let (u, _) = DenseLuBackend.solve(&system).unwrap();
        assert!((u[0] - 2.0).abs() < 1e-14);
    }
}
