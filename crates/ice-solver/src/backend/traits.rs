//! Backend trait definitions for the momentum solve.

use nalgebra::DVector;

/// Error type for backend operations.
#[derive(Debug, Clone)]
pub struct BackendError(pub String);

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for BackendError {}

impl From<String> for BackendError {
    fn from(s: String) -> Self {
        BackendError(s)
    }
}

impl From<&str> for BackendError {
    fn from(s: &str) -> Self {
        BackendError(s.to_string())
    }
}

/// Sparse matrix in COO (coordinate/triplet) format.
///
/// Interchange format between the momentum assembly and any backend;
/// duplicate entries sum on conversion.
#[derive(Debug, Clone)]
pub struct SparseTriplets {
    pub nrows: usize,
    pub ncols: usize,
    pub row_indices: Vec<usize>,
    pub col_indices: Vec<usize>,
    pub values: Vec<f64>,
}

impl SparseTriplets {
    pub fn with_capacity(n: usize, nnz: usize) -> Self {
        Self {
            nrows: n,
            ncols: n,
            row_indices: Vec::with_capacity(nnz),
            col_indices: Vec::with_capacity(nnz),
            values: Vec::with_capacity(nnz),
        }
    }

    #[inline]
    pub fn push(&mut self, row: usize, col: usize, value: f64) {
        self.row_indices.push(row);
        self.col_indices.push(col);
        self.values.push(value);
    }

    /// Number of stored entries.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }
}

/// A momentum system ready for solving: `A u = b`.
///
/// Dirichlet values are already folded in: fixed DOFs carry identity rows
/// with their prescribed value on the right-hand side, and no free row
/// couples into a fixed column, so `A` keeps the symmetry of the operator.
#[derive(Debug, Clone)]
pub struct MomentumSystem {
    pub matrix: SparseTriplets,
    pub rhs: DVector<f64>,
    pub num_dofs: usize,
    /// DOFs held at their prescribed value (diagnostics and warm starts)
    pub fixed_dofs: Vec<usize>,
    /// Current iterate, used as the initial guess by iterative backends
    pub initial_guess: DVector<f64>,
}

/// Solver convergence and diagnostic info.
#[derive(Debug, Clone)]
pub struct SolveInfo {
    /// Iterations taken (1 for direct solvers)
    pub iterations: usize,
    /// Final residual norm, if the backend tracks one
    pub residual_norm: Option<f64>,
    /// Human-readable backend name
    pub solver_name: String,
}

/// Trait for a linear solver backend: solve `A u = b` for the velocity
/// update.
pub trait LinearSolver: Send + Sync {
    fn solve(&self, system: &MomentumSystem) -> Result<(DVector<f64>, SolveInfo), BackendError>;
}
