//! Staggering between node flavors.
//!
//! Neighbor indices are clamped at domain edges, so border nodes hold the
//! one-sided average of the values that exist.

use crate::field::{Aa, Ab, Acx, Acy, Field2};

/// aa → acx: face value is the mean of the two adjacent centers.
pub fn stagger_aa_to_acx(src: &Field2<Aa>) -> Field2<Acx> {
    let (nx, ny) = (src.nx(), src.ny());
    let mut out = Field2::zeros(nx, ny);
    for j in 0..ny {
        for i in 0..nx {
            let ip = (i + 1).min(nx - 1);
            out[(i, j)] = 0.5 * (src[(i, j)] + src[(ip, j)]);
        }
    }
    out
}

/// aa → acy: face value is the mean of the two adjacent centers.
pub fn stagger_aa_to_acy(src: &Field2<Aa>) -> Field2<Acy> {
    let (nx, ny) = (src.nx(), src.ny());
    let mut out = Field2::zeros(nx, ny);
    for j in 0..ny {
        for i in 0..nx {
            let jp = (j + 1).min(ny - 1);
            out[(i, j)] = 0.5 * (src[(i, j)] + src[(i, jp)]);
        }
    }
    out
}

/// aa → ab: corner value is the mean of the four surrounding centers.
pub fn stagger_aa_to_ab(src: &Field2<Aa>) -> Field2<Ab> {
    let (nx, ny) = (src.nx(), src.ny());
    let mut out = Field2::zeros(nx, ny);
    for j in 0..ny {
        for i in 0..nx {
            let ip = (i + 1).min(nx - 1);
            let jp = (j + 1).min(ny - 1);
            out[(i, j)] =
                0.25 * (src[(i, j)] + src[(ip, j)] + src[(i, jp)] + src[(ip, jp)]);
        }
    }
    out
}

/// ab → aa: center value is the mean of the four surrounding corners.
pub fn unstagger_ab_to_aa(src: &Field2<Ab>) -> Field2<Aa> {
    let (nx, ny) = (src.nx(), src.ny());
    let mut out = Field2::zeros(nx, ny);
    for j in 0..ny {
        for i in 0..nx {
            let im = i.saturating_sub(1);
            let jm = j.saturating_sub(1);
            out[(i, j)] =
                0.25 * (src[(im, jm)] + src[(i, jm)] + src[(im, j)] + src[(i, j)]);
        }
    }
    out
}

/// acx → aa: center value is the mean of the two adjacent faces.
pub fn unstagger_acx_to_aa(src: &Field2<Acx>) -> Field2<Aa> {
    let (nx, ny) = (src.nx(), src.ny());
    let mut out = Field2::zeros(nx, ny);
    for j in 0..ny {
        for i in 0..nx {
            let im = i.saturating_sub(1);
            out[(i, j)] = 0.5 * (src[(im, j)] + src[(i, j)]);
        }
    }
    out
}

/// acy → aa: center value is the mean of the two adjacent faces.
pub fn unstagger_acy_to_aa(src: &Field2<Acy>) -> Field2<Aa> {
    let (nx, ny) = (src.nx(), src.ny());
    let mut out = Field2::zeros(nx, ny);
    for j in 0..ny {
        for i in 0..nx {
            let jm = j.saturating_sub(1);
            out[(i, j)] = 0.5 * (src[(i, jm)] + src[(i, j)]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_field_is_invariant_under_staggering() {
        let aa = Field2::<Aa>::constant(5, 4, 3.5);
        assert!(stagger_aa_to_acx(&aa).as_slice().iter().all(|&v| v == 3.5));
        assert!(stagger_aa_to_ab(&aa).as_slice().iter().all(|&v| v == 3.5));
        let ab = stagger_aa_to_ab(&aa);
        assert!(unstagger_ab_to_aa(&ab).as_slice().iter().all(|&v| v == 3.5));
    }

    #[test]
    fn acx_staggering_averages_x_neighbors() {
        let mut aa = Field2::<Aa>::zeros(3, 1);
        aa[(0, 0)] = 1.0;
        aa[(1, 0)] = 3.0;
        aa[(2, 0)] = 5.0;
        let acx = stagger_aa_to_acx(&aa);
        assert_eq!(acx[(0, 0)], 2.0);
        assert_eq!(acx[(1, 0)], 4.0);
        // trailing edge clamps to the last center
        assert_eq!(acx[(2, 0)], 5.0);
    }

    #[test]
    fn ab_staggering_averages_four_centers() {
        let mut aa = Field2::<Aa>::zeros(2, 2);
        aa[(0, 0)] = 1.0;
        aa[(1, 0)] = 2.0;
        aa[(0, 1)] = 3.0;
        aa[(1, 1)] = 6.0;
        let ab = stagger_aa_to_ab(&aa);
        assert_eq!(ab[(0, 0)], 3.0);
    }
}
