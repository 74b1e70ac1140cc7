//! Dense fields tagged with their staggered-grid node flavor.
//!
//! All flavors share `nx × ny` storage: staggered flavors simply leave their
//! trailing edge as halo. Index order is `(i, j)` with `i` fastest; layered
//! fields store each layer contiguously, base layer first.

use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// Marker trait for a node flavor on the staggered C-grid.
pub trait NodeFlavor: Copy + Clone + std::fmt::Debug + PartialEq {
    /// Short flavor name used in diagnostics.
    const NAME: &'static str;
}

/// Cell centers (scalars: thickness, viscosity, bed elevation).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Aa;

/// x-staggered faces (x-components of velocity, stress, flux).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Acx;

/// y-staggered faces (y-components).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Acy;

/// Corner nodes (strain rates, corner-averaged viscosity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ab;

impl NodeFlavor for Aa {
    const NAME: &'static str = "aa";
}
impl NodeFlavor for Acx {
    const NAME: &'static str = "acx";
}
impl NodeFlavor for Acy {
    const NAME: &'static str = "acy";
}
impl NodeFlavor for Ab {
    const NAME: &'static str = "ab";
}

/// A dense 2-D scalar field on nodes of flavor `N`.
#[derive(Debug, Clone, PartialEq)]
pub struct Field2<N: NodeFlavor> {
    nx: usize,
    ny: usize,
    data: Vec<f64>,
    _flavor: PhantomData<N>,
}

impl<N: NodeFlavor> Field2<N> {
    /// Zero-initialized field.
    pub fn zeros(nx: usize, ny: usize) -> Self {
        Self {
            nx,
            ny,
            data: vec![0.0; nx * ny],
            _flavor: PhantomData,
        }
    }

    /// Constant-valued field.
    pub fn constant(nx: usize, ny: usize, value: f64) -> Self {
        Self {
            nx,
            ny,
            data: vec![value; nx * ny],
            _flavor: PhantomData,
        }
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    #[inline]
    fn idx(&self, i: usize, j: usize) -> usize {
        debug_assert!(i < self.nx && j < self.ny, "{} index out of range", N::NAME);
        j * self.nx + i
    }

    /// Overwrite every node with `value`.
    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }

    /// Largest absolute value over all nodes.
    pub fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0, |m, v| m.max(v.abs()))
    }
}

impl<N: NodeFlavor> Index<(usize, usize)> for Field2<N> {
    type Output = f64;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        &self.data[self.idx(i, j)]
    }
}

impl<N: NodeFlavor> IndexMut<(usize, usize)> for Field2<N> {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        let idx = self.idx(i, j);
        &mut self.data[idx]
    }
}

/// A dense layered field on nodes of flavor `N`: `nx × ny` per layer,
/// `nz` layers with the base layer (`zeta = 0`) first.
#[derive(Debug, Clone, PartialEq)]
pub struct Field3<N: NodeFlavor> {
    nx: usize,
    ny: usize,
    nz: usize,
    data: Vec<f64>,
    _flavor: PhantomData<N>,
}

impl<N: NodeFlavor> Field3<N> {
    pub fn zeros(nx: usize, ny: usize, nz: usize) -> Self {
        Self {
            nx,
            ny,
            nz,
            data: vec![0.0; nx * ny * nz],
            _flavor: PhantomData,
        }
    }

    pub fn constant(nx: usize, ny: usize, nz: usize, value: f64) -> Self {
        Self {
            nx,
            ny,
            nz,
            data: vec![value; nx * ny * nz],
            _flavor: PhantomData,
        }
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn nz(&self) -> usize {
        self.nz
    }

    /// Contiguous slice holding layer `k`.
    pub fn layer(&self, k: usize) -> &[f64] {
        let n = self.nx * self.ny;
        &self.data[k * n..(k + 1) * n]
    }

    pub fn layer_mut(&mut self, k: usize) -> &mut [f64] {
        let n = self.nx * self.ny;
        &mut self.data[k * n..(k + 1) * n]
    }

    /// Split the whole field into per-layer mutable slices, base first.
    pub fn layers_mut(&mut self) -> std::slice::ChunksMut<'_, f64> {
        let n = self.nx * self.ny;
        self.data.chunks_mut(n)
    }

    /// Column values at `(i, j)`, base to surface.
    pub fn column(&self, i: usize, j: usize) -> Vec<f64> {
        let n = self.nx * self.ny;
        let off = j * self.nx + i;
        (0..self.nz).map(|k| self.data[k * n + off]).collect()
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }
}

impl<N: NodeFlavor> Index<(usize, usize, usize)> for Field3<N> {
    type Output = f64;

    #[inline]
    fn index(&self, (i, j, k): (usize, usize, usize)) -> &f64 {
        debug_assert!(i < self.nx && j < self.ny && k < self.nz);
        &self.data[(k * self.ny + j) * self.nx + i]
    }
}

impl<N: NodeFlavor> IndexMut<(usize, usize, usize)> for Field3<N> {
    #[inline]
    fn index_mut(&mut self, (i, j, k): (usize, usize, usize)) -> &mut f64 {
        debug_assert!(i < self.nx && j < self.ny && k < self.nz);
        &mut self.data[(k * self.ny + j) * self.nx + i]
    }
}

/// An integer mask on nodes of flavor `N` (solver-region encoding:
/// positive = solve, zero = prescribed, negative = frozen).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask2<N: NodeFlavor> {
    nx: usize,
    ny: usize,
    data: Vec<i8>,
    _flavor: PhantomData<N>,
}

impl<N: NodeFlavor> Mask2<N> {
    pub fn zeros(nx: usize, ny: usize) -> Self {
        Self {
            nx,
            ny,
            data: vec![0; nx * ny],
            _flavor: PhantomData,
        }
    }

    pub fn constant(nx: usize, ny: usize, value: i8) -> Self {
        Self {
            nx,
            ny,
            data: vec![value; nx * ny],
            _flavor: PhantomData,
        }
    }

    pub fn nx(&self) -> usize {
        self.nx
    }

    pub fn ny(&self) -> usize {
        self.ny
    }

    pub fn fill(&mut self, value: i8) {
        self.data.fill(value);
    }

    /// Number of nodes currently marked for solving.
    pub fn count_active(&self) -> usize {
        self.data.iter().filter(|&&m| m > 0).count()
    }

    /// Number of nodes frozen out of the solve.
    pub fn count_frozen(&self) -> usize {
        self.data.iter().filter(|&&m| m < 0).count()
    }
}

impl<N: NodeFlavor> Index<(usize, usize)> for Mask2<N> {
    type Output = i8;

    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &i8 {
        &self.data[j * self.nx + i]
    }
}

impl<N: NodeFlavor> IndexMut<(usize, usize)> for Mask2<N> {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut i8 {
        &mut self.data[j * self.nx + i]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field2_index_is_i_fastest() {
        let mut f = Field2::<Aa>::zeros(4, 3);
        f[(1, 0)] = 1.0;
        f[(0, 1)] = 2.0;
        assert_eq!(f.as_slice()[1], 1.0);
        assert_eq!(f.as_slice()[4], 2.0);
    }

    #[test]
    fn field3_layers_are_contiguous() {
        let mut f = Field3::<Acx>::zeros(3, 2, 2);
        f[(2, 1, 1)] = 5.0;
        assert_eq!(f.layer(1)[5], 5.0);
        assert_eq!(f.column(2, 1), vec![0.0, 5.0]);
    }

    #[test]
    fn mask_counts_active_and_frozen() {
        let mut m = Mask2::<Acx>::constant(3, 3, 1);
        m[(0, 0)] = 0;
        m[(1, 1)] = -1;
        assert_eq!(m.count_active(), 7);
        assert_eq!(m.count_frozen(), 1);
    }
}
