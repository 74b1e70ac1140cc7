//! Staggered-grid data model and shared numerics for the ice-dynamics solver.
//!
//! A regular 2-D map-plane grid carries scalars at cell centers (aa-nodes),
//! x/y vector components at cell faces (acx/acy-nodes) and corner quantities
//! at ab-nodes. The vertical axis is a terrain-following sigma coordinate.
//! Node flavors are distinct types, so mixing them is a compile error.

pub mod field;
pub mod grid;
pub mod integrate;
pub mod smoothing;
pub mod stagger;

pub use field::{Aa, Ab, Acx, Acy, Field2, Field3, Mask2, NodeFlavor};
pub use grid::Grid;
pub use integrate::{trapz, trapz_cumulative};
pub use smoothing::gaussian_smooth_masked;
pub use stagger::{
    stagger_aa_to_ab, stagger_aa_to_acx, stagger_aa_to_acy, unstagger_ab_to_aa,
    unstagger_acx_to_aa, unstagger_acy_to_aa,
};
