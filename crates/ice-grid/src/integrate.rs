//! Trapezoid integration along the sigma axis.

/// Trapezoid rule for `∫ vals d(zeta)` over the full column.
///
/// `zeta` and `vals` must have equal length; a column with fewer than two
/// samples integrates to zero.
pub fn trapz(zeta: &[f64], vals: &[f64]) -> f64 {
    debug_assert_eq!(zeta.len(), vals.len());
    let mut acc = 0.0;
    for k in 1..zeta.len() {
        acc += 0.5 * (vals[k] + vals[k - 1]) * (zeta[k] - zeta[k - 1]);
    }
    acc
}

/// Cumulative trapezoid: element `k` holds `∫₀^{zeta[k]} vals d(zeta)`.
///
/// The base element is zero by construction.
pub fn trapz_cumulative(zeta: &[f64], vals: &[f64]) -> Vec<f64> {
    debug_assert_eq!(zeta.len(), vals.len());
    let mut out = vec![0.0; zeta.len()];
    for k in 1..zeta.len() {
        out[k] = out[k - 1] + 0.5 * (vals[k] + vals[k - 1]) * (zeta[k] - zeta[k - 1]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trapz_is_exact_for_linear_functions() {
        let zeta: Vec<f64> = (0..6).map(|k| k as f64 / 5.0).collect();
        let vals: Vec<f64> = zeta.iter().map(|z| 2.0 * z + 1.0).collect();
        assert!((trapz(&zeta, &vals) - 2.0).abs() < 1e-14);
    }

    #[test]
    fn cumulative_matches_full_integral_at_surface() {
        let zeta: Vec<f64> = (0..11).map(|k| k as f64 / 10.0).collect();
        let vals: Vec<f64> = zeta.iter().map(|z| (1.0 - z).powi(2)).collect();
        let cum = trapz_cumulative(&zeta, &vals);
        assert_eq!(cum[0], 0.0);
        assert!((cum[10] - trapz(&zeta, &vals)).abs() < 1e-14);
    }

    #[test]
    fn handles_nonuniform_spacing() {
        let zeta = vec![0.0, 0.1, 0.4, 1.0];
        let vals = vec![1.0, 1.0, 1.0, 1.0];
        assert!((trapz(&zeta, &vals) - 1.0).abs() < 1e-14);
    }
}
