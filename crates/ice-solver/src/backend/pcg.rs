//! Jacobi-preconditioned conjugate gradient backend.
//!
//! The assembled momentum operator is symmetric (the SSA stencil is
//! variational and Dirichlet couplings are folded into the right-hand
//! side), so CG with a diagonal preconditioner applies directly and scales
//! to domains where the dense factorization does not.

use nalgebra::DVector;
use nalgebra_sparse::{CooMatrix, CsrMatrix};

use super::traits::{BackendError, LinearSolver, MomentumSystem, SolveInfo};

/// Iterative solver backend, selected by the `"pcg"` option string.
pub struct PcgBackend {
    pub tolerance: f64,
    pub max_iterations: usize,
}

impl Default for PcgBackend {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 5000,
        }
    }
}

fn csr_mul_vec(a: &CsrMatrix<f64>, x: &DVector<f64>) -> DVector<f64> {
    let mut y = DVector::zeros(a.nrows());
    for (row, lane) in a.row_iter().enumerate() {
        let mut sum = 0.0;
        for (&col, &val) in lane.col_indices().iter().zip(lane.values().iter()) {
            sum += val * x[col];
        }
        y[row] = sum;
    }
    y
}

impl LinearSolver for PcgBackend {
    fn solve(&self, system: &MomentumSystem) -> Result<(DVector<f64>, SolveInfo), BackendError> {
        let n = system.num_dofs;

        let coo = CooMatrix::try_from_triplets(
            n,
            n,
            system.matrix.row_indices.clone(),
            system.matrix.col_indices.clone(),
            system.matrix.values.clone(),
        )
        .map_err(|e| BackendError(format!("invalid momentum triplets: {:?}", e)))?;
        let a = CsrMatrix::from(&coo);

        // Jacobi preconditioner
        let mut m_inv = DVector::from_element(n, 1.0);
        for (row, lane) in a.row_iter().enumerate() {
            for (&col, &val) in lane.col_indices().iter().zip(lane.values().iter()) {
                if col == row && val.abs() > 0.0 {
                    m_inv[row] = 1.0 / val;
                }
            }
        }

        let b = &system.rhs;
        let mut x = system.initial_guess.clone();
        let mut r = b - csr_mul_vec(&a, &x);
        let b_norm = b.norm();
        if b_norm == 0.0 {
            return Ok((
                DVector::zeros(n),
                SolveInfo {
                    iterations: 0,
                    residual_norm: Some(0.0),
                    solver_name: "pcg-jacobi".to_string(),
                },
            ));
        }

        let mut z = r.component_mul(&m_inv);
        let mut p = z.clone();
        let mut r_dot_z = r.dot(&z);

        let mut iterations = 0;
        for it in 0..self.max_iterations {
            iterations = it;
            if r.norm() / b_norm < self.tolerance {
                break;
            }
            let q = csr_mul_vec(&a, &p);
            let p_dot_q = p.dot(&q);
            if p_dot_q.abs() < f64::EPSILON * b_norm * b_norm {
                return Err(BackendError(
                    "conjugate gradient breakdown: search direction annihilated".into(),
                ));
            }
            let alpha = r_dot_z / p_dot_q;
            x += alpha * &p;
            r -= alpha * &q;
            z = r.component_mul(&m_inv);
            let r_dot_z_next = r.dot(&z);
            let beta = r_dot_z_next / r_dot_z;
            p = &z + beta * &p;
            r_dot_z = r_dot_z_next;
            iterations = it + 1;
        }

        let resid = r.norm() / b_norm;
        if resid >= self.tolerance && iterations >= self.max_iterations {
            return Err(BackendError(format!(
                "conjugate gradient stalled at relative residual {:.3e} after {} iterations",
                resid, iterations
            )));
        }

        Ok((
            x,
            SolveInfo {
                iterations,
                residual_norm: Some(resid),
                solver_name: "pcg-jacobi".to_string(),
            },
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::traits::SparseTriplets;

    fn spd_tridiagonal(n: usize) -> SparseTriplets {
        let mut m = SparseTriplets::with_capacity(n, 3 * n);
        for i in 0..n {
            m.push(i, i, 4.0);
            if i > 0 {
                m.push(i, i - 1, -1.0);
            }
            if i + 1 < n {
                m.push(i, i + 1, -1.0);
            }
        }
        m
    }

    #[test]
    fn pcg_matches_direct_solution() {
        let n = 20;
        let system = MomentumSystem {
            matrix: spd_tridiagonal(n),
            rhs: DVector::from_fn(n, |i, _| 1.0 + i as f64),
            num_dofs: n,
            fixed_dofs: vec![],
            initial_guess: DVector::zeros(n),
        };
        let (x_pcg, info) = PcgBackend::default().solve(&system).unwrap();
        let (x_lu, _) = crate::backend::DenseLuBackend.solve(&system).unwrap();
        assert!(info.residual_norm.unwrap() < 1e-9);
        for i in 0..n {
            assert!((x_pcg[i] - x_lu[i]).abs() < 1e-8);
        }
    }

    #[test]
    fn warm_start_at_solution_converges_immediately() {
        let n = 10;
        let mut system = MomentumSystem {
            matrix: spd_tridiagonal(n),
            rhs: DVector::from_element(n, 1.0),
            num_dofs: n,
            fixed_dofs: vec![],
            initial_guess: DVector::zeros(n),
        };
        let (x, _) = PcgBackend::default().solve(&system).unwrap();
        system.initial_guess = x;
        let (_, info) = PcgBackend::default().solve(&system).unwrap();
        assert_eq!(info.iterations, 0);
    }
}
