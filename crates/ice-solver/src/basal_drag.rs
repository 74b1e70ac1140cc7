//! Basal-drag engine.
//!
//! Builds the scalar friction coefficient `beta` on aa-nodes from bed
//! roughness and basal velocity, applies the effective-pressure and
//! grounding-line scalings, smooths over grounded ice, and staggers the
//! result to the faces where the momentum operator consumes it.

use ice_grid::{Aa, Acx, Acy, Field2, Grid, gaussian_smooth_masked};

use crate::constants::PhysicalConstants;
use crate::params::{
    BetaStagger, DivaParams, EffectivePressure, GroundingLineScaling, SlidingLaw,
};

/// Basal speed on aa-nodes, assembled from the staggered components with a
/// positive floor so the sliding laws never divide by zero.
pub fn basal_speed_aa(
    grid: &Grid,
    ux_b: &Field2<Acx>,
    uy_b: &Field2<Acy>,
    u_b_min: f64,
) -> Field2<Aa> {
    let (nx, ny) = (grid.nx, grid.ny);
    let mut out = Field2::zeros(nx, ny);
    for j in 0..ny {
        for i in 0..nx {
            let im = i.saturating_sub(1);
            let jm = j.saturating_sub(1);
            let ux = 0.5 * (ux_b[(im, j)] + ux_b[(i, j)]);
            let uy = 0.5 * (uy_b[(i, jm)] + uy_b[(i, j)]);
            out[(i, j)] = (ux * ux + uy * uy).sqrt().max(u_b_min);
        }
    }
    out
}

/// Effective pressure on aa-nodes, in bar.
///
/// The Leguy et al. (2014) model ramps the basal water pressure up to the
/// ice pressure as the column approaches floatation, with connectivity
/// exponent `p` (`0` sealed bed, `1` full ocean connection).
pub fn effective_pressure(
    model: EffectivePressure,
    consts: &PhysicalConstants,
    h_ice: &Field2<Aa>,
    z_bed: &Field2<Aa>,
    z_sl: &Field2<Aa>,
) -> Field2<Aa> {
    let (nx, ny) = (h_ice.nx(), h_ice.ny());
    let mut out = Field2::zeros(nx, ny);
    for j in 0..ny {
        for i in 0..nx {
            let h = h_ice[(i, j)];
            if h <= 0.0 {
                continue;
            }
            let p_ice = consts.rho_ice * consts.g * h;
            let n_pa = match model {
                EffectivePressure::None => 0.0,
                EffectivePressure::Overburden => p_ice,
                EffectivePressure::Leguy { p } => {
                    let h_float =
                        (consts.rho_sw / consts.rho_ice * (z_sl[(i, j)] - z_bed[(i, j)])).max(0.0);
                    let p_w = if h < h_float {
                        p_ice
                    } else {
                        p_ice * (1.0 - (1.0 - (h_float / h).min(1.0)).powf(p))
                    };
                    p_ice - p_w
                }
            };
            out[(i, j)] = (1e-5 * n_pa).max(0.0);
        }
    }
    out
}

/// Evaluate the sliding law at one aa-node.
fn sliding_law_beta(law: SlidingLaw, c_bed: f64, u_b: f64) -> f64 {
    match law {
        SlidingLaw::Constant { beta } => beta,
        SlidingLaw::Linear => c_bed,
        SlidingLaw::Power { q } => c_bed.powf(q) * u_b.powf(q - 1.0),
        SlidingLaw::RegularizedCoulomb { q, u_0 } => {
            c_bed * (u_b / (u_b + u_0)).powf(q) / u_b
        }
    }
}

/// Compute the friction coefficient `beta` on aa-nodes.
///
/// Pipeline: sliding law, effective-pressure scaling, grounding-line
/// scaling, zeroing over fully floating cells, mask-restricted Gaussian
/// smoothing, and the grounded friction floor.
#[allow(clippy::too_many_arguments)]
pub fn friction_coefficient(
    params: &DivaParams,
    consts: &PhysicalConstants,
    c_bed: &Field2<Aa>,
    h_ice: &Field2<Aa>,
    h_grnd: &Field2<Aa>,
    f_grnd: &Field2<Aa>,
    z_bed: &Field2<Aa>,
    z_sl: &Field2<Aa>,
    u_b_aa: &Field2<Aa>,
    n_eff: &Field2<Aa>,
) -> Field2<Aa> {
    let (nx, ny) = (c_bed.nx(), c_bed.ny());
    let mut beta = Field2::zeros(nx, ny);

    for j in 0..ny {
        for i in 0..nx {
            let mut b = sliding_law_beta(params.sliding_law, c_bed[(i, j)], u_b_aa[(i, j)]);

            if !matches!(params.effective_pressure, EffectivePressure::None) {
                b *= n_eff[(i, j)];
            }

            match params.gl_scaling {
                GroundingLineScaling::None => {}
                GroundingLineScaling::Fractional { f_gl } => {
                    if f_grnd[(i, j)] > 0.0 && has_floating_neighbor(f_grnd, i, j) {
                        b *= f_gl;
                    }
                }
                GroundingLineScaling::ThicknessRamp { h_grnd_lim } => {
                    b *= h_grnd[(i, j)].min(h_grnd_lim).max(0.0) / h_grnd_lim;
                }
                GroundingLineScaling::ZStar { norm } => {
                    let h = h_ice[(i, j)];
                    let mut f_scale = if z_bed[(i, j)] >= z_sl[(i, j)] {
                        h
                    } else {
                        (h - (z_sl[(i, j)] - z_bed[(i, j)]) * consts.rho_sw / consts.rho_ice)
                            .max(0.0)
                    };
                    if norm && h > 0.0 {
                        f_scale /= h;
                    }
                    b *= f_scale;
                }
            }

            beta[(i, j)] = if f_grnd[(i, j)] > 0.0 { b } else { 0.0 };
        }
    }

    if params.beta_smooth_n > 0.0 {
        let grounded: Vec<bool> = (0..nx * ny)
            .map(|idx| {
                let (i, j) = (idx % nx, idx / nx);
                f_grnd[(i, j)] > 0.0 && h_ice[(i, j)] > 0.0
            })
            .collect();
        beta = gaussian_smooth_masked(&beta, &grounded, params.beta_smooth_n);
    }

    for j in 0..ny {
        for i in 0..nx {
            if f_grnd[(i, j)] > 0.0 {
                beta[(i, j)] = beta[(i, j)].max(params.beta_min);
            }
        }
    }
    beta
}

fn has_floating_neighbor(f_grnd: &Field2<Aa>, i: usize, j: usize) -> bool {
    let (nx, ny) = (f_grnd.nx(), f_grnd.ny());
    let mut floating = false;
    if i > 0 {
        floating |= f_grnd[(i - 1, j)] == 0.0;
    }
    if i + 1 < nx {
        floating |= f_grnd[(i + 1, j)] == 0.0;
    }
    if j > 0 {
        floating |= f_grnd[(i, j - 1)] == 0.0;
    }
    if j + 1 < ny {
        floating |= f_grnd[(i, j + 1)] == 0.0;
    }
    floating
}

/// Stagger `beta` to acx/acy faces under the configured grounding-line
/// policy.
pub fn stagger_beta(
    policy: BetaStagger,
    beta: &Field2<Aa>,
    f_grnd: &Field2<Aa>,
    f_grnd_acx: &Field2<Acx>,
    f_grnd_acy: &Field2<Acy>,
) -> (Field2<Acx>, Field2<Acy>) {
    let (nx, ny) = (beta.nx(), beta.ny());
    let mut acx = Field2::zeros(nx, ny);
    let mut acy = Field2::zeros(nx, ny);

    for j in 0..ny {
        for i in 0..nx {
            let ip = (i + 1).min(nx - 1);
            acx[(i, j)] = stagger_edge(
                policy,
                beta[(i, j)],
                beta[(ip, j)],
                f_grnd[(i, j)],
                f_grnd[(ip, j)],
                f_grnd_acx[(i, j)],
            );
            let jp = (j + 1).min(ny - 1);
            acy[(i, j)] = stagger_edge(
                policy,
                beta[(i, j)],
                beta[(i, jp)],
                f_grnd[(i, j)],
                f_grnd[(i, jp)],
                f_grnd_acy[(i, j)],
            );
        }
    }
    (acx, acy)
}

fn stagger_edge(
    policy: BetaStagger,
    beta_a: f64,
    beta_b: f64,
    f_a: f64,
    f_b: f64,
    f_edge: f64,
) -> f64 {
    let grounded_a = f_a > 0.0;
    let grounded_b = f_b > 0.0;
    match policy {
        BetaStagger::Simple => 0.5 * (beta_a + beta_b),
        BetaStagger::Upstream => match (grounded_a, grounded_b) {
            (false, false) => 0.0,
            (true, false) => beta_a,
            (false, true) => beta_b,
            (true, true) => 0.5 * (beta_a + beta_b),
        },
        BetaStagger::Subgrid => match (grounded_a, grounded_b) {
            (false, false) => 0.0,
            (true, true) => 0.5 * (beta_a + beta_b),
            (true, false) => f_edge * beta_a + (1.0 - f_edge) * beta_b,
            (false, true) => f_edge * beta_b + (1.0 - f_edge) * beta_a,
        },
    }
}

/// Effective friction for the depth-integrated solve (Goldberg 2011,
/// Lipscomb et al. 2019): `beta_eff = beta / (1 + beta F2)`, or `1 / F2`
/// when the bed is frozen.
pub fn effective_friction(no_slip: bool, beta: &Field2<Aa>, f2: &Field2<Aa>) -> Field2<Aa> {
    let (nx, ny) = (beta.nx(), beta.ny());
    let mut out = Field2::zeros(nx, ny);
    for j in 0..ny {
        for i in 0..nx {
            out[(i, j)] = if no_slip {
                1.0 / f2[(i, j)]
            } else {
                beta[(i, j)] / (1.0 + beta[(i, j)] * f2[(i, j)])
            };
        }
    }
    out
}

/// Diagnostic inversion of the effective friction back to a basal friction
/// coefficient. The Newton root-finder is a planned extension; for now the
/// diagnostic mirrors `beta` unchanged.
pub fn diagnose_beta_diva(beta: &Field2<Aa>) -> Field2<Aa> {
    beta.clone()
}
