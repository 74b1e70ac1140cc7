//! Viscosity and strain engine.
//!
//! Builds the 3-D effective viscosity from the depth-averaged velocity and
//! the vertical-shear profile via Glen's flow law:
//!
//! `visc = 1/2 · eps_sq^((1-n)/(2n)) · ATT^(-1/n)`
//!
//! with the effective strain rate squared
//!
//! `eps_sq = dudx² + dvdy² + dudx·dvdy + 1/4 (dudy+dvdx)²
//!           + 1/4 duxdz² + 1/4 duydz² + eps_0²`
//!
//! All strain-rate components are collocated on ab (corner) nodes, where the
//! horizontal derivatives of the staggered velocity fall naturally; the
//! corner viscosity is then averaged back to aa-nodes. The four-corner
//! averaging damps the checkerboard modes that appear at low strain rates
//! when viscosity is collocated at cell centers directly.

use ice_grid::{Aa, Acx, Acy, Field2, Field3, Grid, trapz, trapz_cumulative};
use rayon::prelude::*;

/// Rate-factor floor guarding the `ATT^(-1/n)` evaluation at nodes where
/// the caller left the rate factor zero (open ocean, ice-free land).
const ATT_TINY: f64 = 1e-30;

/// Compute the 3-D effective viscosity on aa-nodes (Pa a).
///
/// Layers are independent and evaluated in parallel.
#[allow(clippy::too_many_arguments)]
pub fn effective_viscosity(
    grid: &Grid,
    ux_bar: &Field2<Acx>,
    uy_bar: &Field2<Acy>,
    duxdz: &Field3<Acx>,
    duydz: &Field3<Acy>,
    att: &Field3<Aa>,
    n_glen: f64,
    eps_0: f64,
    visc_min: f64,
) -> Field3<Aa> {
    let (nx, ny, nz) = (grid.nx, grid.ny, grid.nz);
    let (dx, dy) = (grid.dx, grid.dy);
    let n2 = nx * ny;

    let mut visc = Field3::zeros(nx, ny, nz);
    visc.as_mut_slice()
        .par_chunks_mut(n2)
        .enumerate()
        .for_each(|(k, layer)| {
            let mut visc_ab = vec![0.0; n2];

            for j in 0..ny {
                for i in 0..nx {
                    let ip = (i + 1).min(nx - 1);
                    let im = i.saturating_sub(1);
                    let jp = (j + 1).min(ny - 1);
                    let jm = j.saturating_sub(1);

                    // 4-point averaged centered differences, step 4*dx / 4*dy
                    let dudx = (ux_bar[(ip, j)] - ux_bar[(im, j)] + ux_bar[(ip, jp)]
                        - ux_bar[(im, jp)])
                        / (4.0 * dx);
                    let dvdy = (uy_bar[(i, jp)] - uy_bar[(i, jm)] + uy_bar[(ip, jp)]
                        - uy_bar[(ip, jm)])
                        / (4.0 * dy);

                    // cross derivatives fall directly on the corner
                    let dudy = (ux_bar[(i, jp)] - ux_bar[(i, j)]) / dy;
                    let dvdx = (uy_bar[(ip, j)] - uy_bar[(i, j)]) / dx;

                    // vertical shear averaged from the two adjacent faces
                    let duxdz_ab = 0.5 * (duxdz[(i, j, k)] + duxdz[(i, jp, k)]);
                    let duydz_ab = 0.5 * (duydz[(i, j, k)] + duydz[(ip, j, k)]);

                    let eps_sq = dudx * dudx
                        + dvdy * dvdy
                        + dudx * dvdy
                        + 0.25 * (dudy + dvdx) * (dudy + dvdx)
                        + 0.25 * duxdz_ab * duxdz_ab
                        + 0.25 * duydz_ab * duydz_ab
                        + eps_0 * eps_0;

                    let att_ab = 0.25
                        * (att[(i, j, k)] + att[(ip, j, k)] + att[(i, jp, k)] + att[(ip, jp, k)]);
                    let att_ab = att_ab.max(ATT_TINY);

                    visc_ab[j * nx + i] = 0.5
                        * eps_sq.powf((1.0 - n_glen) / (2.0 * n_glen))
                        * att_ab.powf(-1.0 / n_glen);
                }
            }

            // unstagger ab -> aa
            for j in 0..ny {
                for i in 0..nx {
                    let im = i.saturating_sub(1);
                    let jm = j.saturating_sub(1);
                    layer[j * nx + i] = 0.25
                        * (visc_ab[jm * nx + im]
                            + visc_ab[jm * nx + i]
                            + visc_ab[j * nx + im]
                            + visc_ab[j * nx + i]);
                }
            }

            // domain corners take the mean of their two edge neighbors to
            // suppress extremes from the one-sided averaging
            layer[0] = 0.5 * (layer[1] + layer[nx]);
            layer[nx - 1] = 0.5 * (layer[nx - 2] + layer[2 * nx - 1]);
            layer[(ny - 1) * nx] = 0.5 * (layer[(ny - 2) * nx] + layer[(ny - 1) * nx + 1]);
            layer[ny * nx - 1] = 0.5 * (layer[(ny - 1) * nx - 1] + layer[ny * nx - 2]);

            for v in layer.iter_mut() {
                *v = v.max(visc_min);
            }
        });

    visc
}

/// Depth-integrated effective viscosity (Pa a m):
/// `∫ visc d(zeta) · H_ice`, keeping the raw integral where the column is
/// ice-free so the momentum operator never sees a zero coefficient.
pub fn depth_integrated_viscosity(
    grid: &Grid,
    visc_eff: &Field3<Aa>,
    h_ice: &Field2<Aa>,
) -> Field2<Aa> {
    let (nx, ny) = (grid.nx, grid.ny);
    let mut out = Field2::zeros(nx, ny);
    for j in 0..ny {
        for i in 0..nx {
            let integral = trapz(&grid.zeta_aa, &visc_eff.column(i, j));
            let h = h_ice[(i, j)];
            out[(i, j)] = if h > 0.0 { integral * h } else { integral };
        }
    }
    out
}

/// F-integral of order `n`: `F_n = ∫ (H / visc) (1 - zeta)^n d(zeta)`.
///
/// Ice-free columns take the analytic floor `1 / (visc_min (n+1))`, the
/// integral evaluated with `H/visc = 1/visc_min`.
pub fn f_integral(
    grid: &Grid,
    visc_eff: &Field3<Aa>,
    h_ice: &Field2<Aa>,
    visc_min: f64,
    n: u32,
) -> Field2<Aa> {
    let (nx, ny) = (grid.nx, grid.ny);
    let floor = 1.0 / (visc_min * (n as f64 + 1.0));
    let mut out = Field2::zeros(nx, ny);
    let mut integrand = vec![0.0; grid.nz];
    for j in 0..ny {
        for i in 0..nx {
            let h = h_ice[(i, j)];
            if h > 0.0 {
                for (k, val) in integrand.iter_mut().enumerate() {
                    let zeta = grid.zeta_aa[k];
                    *val = h / visc_eff[(i, j, k)] * (1.0 - zeta).powi(n as i32);
                }
                out[(i, j)] = trapz(&grid.zeta_aa, &integrand);
            } else {
                out[(i, j)] = floor;
            }
        }
    }
    out
}

/// Cumulative first-order F-integral per layer:
/// element `k` holds `∫₀^{zeta_aa[k]} (H / visc) (1 - zeta') d(zeta')`.
///
/// Used to reconstruct the 3-D velocity profile; the base layer is zero, so
/// the reconstructed bottom velocity equals the basal velocity exactly.
pub fn f_integral_cumulative(
    grid: &Grid,
    visc_eff: &Field3<Aa>,
    h_ice: &Field2<Aa>,
    visc_min: f64,
) -> Field3<Aa> {
    let (nx, ny, nz) = (grid.nx, grid.ny, grid.nz);
    let mut out = Field3::zeros(nx, ny, nz);
    let mut integrand = vec![0.0; nz];
    for j in 0..ny {
        for i in 0..nx {
            let h = h_ice[(i, j)];
            let h_over = if h > 0.0 { h } else { 0.0 };
            for (k, val) in integrand.iter_mut().enumerate() {
                let zeta = grid.zeta_aa[k];
                let visc = if h > 0.0 {
                    visc_eff[(i, j, k)]
                } else {
                    visc_min
                };
                *val = h_over / visc * (1.0 - zeta);
            }
            let cum = trapz_cumulative(&grid.zeta_aa, &integrand);
            for (k, c) in cum.into_iter().enumerate() {
                out[(i, j, k)] = c;
            }
        }
    }
    out
}

/// Stagger an aa scalar to acx faces with one-sided selection at ice
/// margins: a face between an iced and an ice-free column takes the iced
/// side's value instead of blending toward the floor.
pub fn stagger_acx_ice_margin(src: &Field2<Aa>, h_ice: &Field2<Aa>) -> Field2<Acx> {
    let (nx, ny) = (src.nx(), src.ny());
    let mut out = Field2::zeros(nx, ny);
    for j in 0..ny {
        for i in 0..nx {
            let ip = (i + 1).min(nx - 1);
            out[(i, j)] = one_sided(src[(i, j)], src[(ip, j)], h_ice[(i, j)], h_ice[(ip, j)]);
        }
    }
    out
}

/// acy counterpart of [`stagger_acx_ice_margin`].
pub fn stagger_acy_ice_margin(src: &Field2<Aa>, h_ice: &Field2<Aa>) -> Field2<Acy> {
    let (nx, ny) = (src.nx(), src.ny());
    let mut out = Field2::zeros(nx, ny);
    for j in 0..ny {
        for i in 0..nx {
            let jp = (j + 1).min(ny - 1);
            out[(i, j)] = one_sided(src[(i, j)], src[(i, jp)], h_ice[(i, j)], h_ice[(i, jp)]);
        }
    }
    out
}

/// Layer-wise [`stagger_acx_ice_margin`] for a 3-D field.
pub fn stagger_acx_ice_margin_3(src: &Field3<Aa>, h_ice: &Field2<Aa>) -> Field3<Acx> {
    let (nx, ny, nz) = (src.nx(), src.ny(), src.nz());
    let mut out = Field3::zeros(nx, ny, nz);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let ip = (i + 1).min(nx - 1);
                out[(i, j, k)] = one_sided(
                    src[(i, j, k)],
                    src[(ip, j, k)],
                    h_ice[(i, j)],
                    h_ice[(ip, j)],
                );
            }
        }
    }
    out
}

/// Layer-wise [`stagger_acy_ice_margin`] for a 3-D field.
pub fn stagger_acy_ice_margin_3(src: &Field3<Aa>, h_ice: &Field2<Aa>) -> Field3<Acy> {
    let (nx, ny, nz) = (src.nx(), src.ny(), src.nz());
    let mut out = Field3::zeros(nx, ny, nz);
    for k in 0..nz {
        for j in 0..ny {
            for i in 0..nx {
                let jp = (j + 1).min(ny - 1);
                out[(i, j, k)] = one_sided(
                    src[(i, j, k)],
                    src[(i, jp, k)],
                    h_ice[(i, j)],
                    h_ice[(i, jp)],
                );
            }
        }
    }
    out
}

#[inline]
fn one_sided(a: f64, b: f64, h_a: f64, h_b: f64) -> f64 {
    match (h_a > 0.0, h_b > 0.0) {
        (true, true) => 0.5 * (a + b),
        (true, false) => a,
        (false, true) => b,
        (false, false) => 0.5 * (a + b),
    }
}
