//! The Okumura correction factors applied on top of the median basic
//! loss: rolling-hilly terrain (median and fine), general slope,
//! mixed land-sea, and isolated ridge.

use crate::{InterValues, Trace};

/// Median rolling-hilly-terrain correction. The terrain irregularity
/// is floored at 15 m, below which the curve would turn non-physical.
pub(crate) fn median_rolling_hilly(delta_h_m: f64) -> f64 {
    const A: f64 = -1.5072013;
    const B: f64 = 8.458676;
    const C: f64 = -6.102538;

    let delta_h = delta_h_m.max(15.0);
    A + delta_h.log10() * (B + C * delta_h.log10())
}

/// Fine rolling-hilly-terrain correction: positions the mobile within
/// the terrain undulation using the 10/50/90% elevation quantiles.
/// Zero for terrain smoother than 10 m of irregularity.
pub(crate) fn fine_rolling_hilly(iv: &InterValues, h_m_gnd_m: f64) -> f64 {
    const A: f64 = -11.728795;
    const B: f64 = 15.544272;
    const C: f64 = -1.8154766;

    if iv.delta_h_m < 10.0 {
        return 0.0;
    }
    let k_h = A + iv.delta_h_m.log10() * (B + C * iv.delta_h_m.log10());

    if h_m_gnd_m >= iv.pfl10_m {
        k_h
    } else if h_m_gnd_m <= iv.pfl90_m {
        -k_h
    } else if h_m_gnd_m >= iv.pfl50_m {
        k_h * (h_m_gnd_m - iv.pfl50_m) / (iv.pfl10_m - iv.pfl50_m)
    } else {
        -k_h * (h_m_gnd_m - iv.pfl90_m) / (iv.pfl50_m - iv.pfl90_m)
    }
}

/// General slope correction from the average terrain slope at the
/// mobile, per the fig-34 curves with their distance interpolation.
pub(crate) fn general_slope(theta_m_mrad: f64, d_km: f64) -> f64 {
    const EMM1: f64 = 0.25;
    const EMM2: f64 = 0.8;
    const EMP1: f64 = 0.125;
    const EMP2: f64 = 0.35;
    const EMP3: f64 = 0.6;

    if theta_m_mrad <= 0.0 {
        if d_km <= 10.0 {
            theta_m_mrad * EMM1
        } else if d_km >= 30.0 {
            theta_m_mrad * EMM2
        } else {
            theta_m_mrad * (EMM1 + 0.05 * (EMM2 - EMM1) * (d_km - 10.0))
        }
    } else if d_km <= 10.0 {
        theta_m_mrad * EMP1
    } else if d_km >= 60.0 {
        theta_m_mrad * EMP3
    } else if d_km <= 30.0 {
        theta_m_mrad * (EMP1 + 0.05 * (d_km - 10.0) * (EMP2 - EMP1))
    } else {
        theta_m_mrad * (EMP2 + (d_km - 30.0) * (EMP3 - EMP2) / 30.0)
    }
}

/// Mixed land-sea correction: bilinear in the sea fraction over the
/// 30 km and 60 km curve families, linear in distance between them,
/// flat outside. When neither end dominates the sea coverage, the two
/// curves of a family are averaged.
pub(crate) fn mixed_path(d_km: f64, iv: &mut InterValues) -> f64 {
    const BETA_30: [f64; 10] = [0.0, 0.15, 0.35, 0.45, 0.6, 0.65, 0.725, 0.775, 0.85, 1.0];
    const CORR_30: [[f64; 10]; 2] = [
        [0.0, 1.0, 3.0, 4.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0],
        [0.0, 4.0, 5.5, 7.0, 8.5, 9.0, 9.5, 9.8, 10.25, 11.0],
    ];
    const BETA_60: [f64; 10] = [0.0, 0.15, 0.3, 0.4, 0.5, 0.6, 0.725, 0.85, 0.9, 1.0];
    const CORR_60: [[f64; 10]; 2] = [
        [0.0, 2.0, 4.0, 5.5, 7.0, 9.0, 11.0, 13.0, 14.0, 15.0],
        [0.0, 4.25, 6.25, 9.2, 10.5, 11.75, 13.0, 14.0, 14.25, 15.0],
    ];

    if iv.beta == 0.0 {
        iv.trace |= Trace::MIXED_PATH_ALL_LAND;
        return 0.0;
    }
    iv.trace |= Trace::MIXED_PATH_SEA;

    let mut ist_30 = 0;
    while ist_30 < 9 && iv.beta > BETA_30[ist_30 + 1] {
        ist_30 += 1;
    }
    let mut ist_60 = 0;
    while ist_60 < 9 && iv.beta > BETA_60[ist_60 + 1] {
        ist_60 += 1;
    }

    let mut slope_30 = [0.0; 2];
    let mut slope_60 = [0.0; 2];
    for i in 0..2 {
        slope_30[i] = (CORR_30[i][ist_30 + 1] - CORR_30[i][ist_30])
            / (BETA_30[ist_30 + 1] - BETA_30[ist_30]);
        slope_60[i] = (CORR_60[i][ist_60 + 1] - CORR_60[i][ist_60])
            / (BETA_60[ist_60 + 1] - BETA_60[ist_60]);
    }

    let corr_at_30 = |iv: &InterValues| -> f64 {
        if iv.iend_ov_sea == 0 || iv.iend_ov_sea == 1 {
            let end = iv.iend_ov_sea as usize;
            CORR_30[end][ist_30] + (iv.beta - BETA_30[ist_30]) * slope_30[end]
        } else {
            0.5 * (CORR_30[0][ist_30]
                + CORR_30[1][ist_30]
                + (iv.beta - BETA_30[ist_30]) * (slope_30[0] + slope_30[1]))
        }
    };
    let corr_at_60 = |iv: &InterValues| -> f64 {
        if iv.iend_ov_sea == 0 || iv.iend_ov_sea == 1 {
            let end = iv.iend_ov_sea as usize;
            CORR_60[end][ist_60] + (iv.beta - BETA_60[ist_60]) * slope_60[end]
        } else {
            0.5 * (CORR_60[0][ist_60]
                + CORR_60[1][ist_60]
                + (iv.beta - BETA_60[ist_60]) * (slope_60[0] + slope_60[1]))
        }
    };

    if d_km <= 30.0 {
        corr_at_30(iv)
    } else if d_km >= 60.0 {
        corr_at_60(iv)
    } else {
        let dist_fact = (d_km - 30.0) / 30.0;
        let qmp_corr_30 = corr_at_30(iv);
        let qmp_corr_60 = corr_at_60(iv);
        qmp_corr_30 + dist_fact * (qmp_corr_60 - qmp_corr_30)
    }
}

/// Isolated-ridge correction from the fig-31 curve family, scaled by
/// the normalized ridge height. `v2_curve_clamp` selects the revised
/// interpolation that clamps to the outer curves and caps the factor
/// at 0 dB away from the ridge.
pub(crate) fn isolated_ridge(
    d1_hzn_km: f64,
    d2_hzn_km: f64,
    h_edge_m: f64,
    v2_curve_clamp: bool,
) -> f64 {
    const D1_KM: [f64; 3] = [15.0, 30.0, 60.0];
    const D2_KM: [f64; 9] = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
    // fig-31 ordinates at the d2 anchors; row 0 is curve C (d1 <= 15),
    // row 2 is curve A (d1 <= 60).
    const CURVE_DATA: [[f64; 9]; 3] = [
        [4.0, -13.0, -17.5, -17.5, -15.0, -12.5, -10.0, -8.0, -6.0],
        [12.0, -8.5, -13.0, -12.0, -10.0, -8.0, -6.5, -5.0, -4.0],
        [20.0, -4.0, -6.5, -6.0, -4.5, -3.5, -2.5, -2.0, -1.0],
    ];

    // Ridge height scaling, normalized to the 200 m reference ridge.
    let alpha = (h_edge_m / 200.0).sqrt();

    let id1 = usize::from(d1_hzn_km >= D1_KM[1]);
    let mut id2 = 0;
    while id2 < 7 && d2_hzn_km > D2_KM[id2 + 1] {
        id2 += 1;
    }

    let frac_d2 = (d2_hzn_km - D2_KM[id2]) / (D2_KM[id2 + 1] - D2_KM[id2]);
    let c1 = CURVE_DATA[id1][id2] + (CURVE_DATA[id1][id2 + 1] - CURVE_DATA[id1][id2]) * frac_d2;
    let c2 = CURVE_DATA[id1 + 1][id2]
        + (CURVE_DATA[id1 + 1][id2 + 1] - CURVE_DATA[id1 + 1][id2]) * frac_d2;

    if !v2_curve_clamp {
        alpha * (c1 + (c2 - c1) * (d1_hzn_km - D1_KM[id1]) / (D1_KM[id1 + 1] - D1_KM[id1]))
    } else {
        let mut k_im = if d1_hzn_km <= 15.0 {
            c1
        } else if d1_hzn_km >= 60.0 {
            c2
        } else {
            c1 + (c2 - c1) * (d1_hzn_km - D1_KM[id1]) / (D1_KM[id1 + 1] - D1_KM[id1])
        };
        // Keep the asymptote from turning into a gain away from the
        // ridge; near d2 = 0 the gain is physical.
        if d2_hzn_km > 2.0 {
            k_im = k_im.min(0.0);
        }
        alpha * k_im
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InterValues, Trace};
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_median_rolling_hilly_floors_at_15() {
        assert_eq!(median_rolling_hilly(0.0), median_rolling_hilly(15.0));
        // At the floor the curve is within a hundredth of a dB of zero.
        assert_abs_diff_eq!(median_rolling_hilly(15.0), 0.0, epsilon = 0.01);
        // The curve decreases with roughness; subtracting it raises
        // the predicted loss over rough terrain.
        assert_abs_diff_eq!(median_rolling_hilly(100.0), -9.0, epsilon = 1e-3);
    }

    #[test]
    fn test_fine_rolling_hilly_zones() {
        let iv = InterValues {
            pfl10_m: 100.0,
            pfl50_m: 60.0,
            pfl90_m: 20.0,
            delta_h_m: 80.0,
            ..InterValues::default()
        };
        let k_h = -11.728795 + 80.0_f64.log10() * (15.544272 - 1.8154766 * 80.0_f64.log10());
        assert_abs_diff_eq!(fine_rolling_hilly(&iv, 120.0), k_h, epsilon = 1e-12);
        assert_abs_diff_eq!(fine_rolling_hilly(&iv, 10.0), -k_h, epsilon = 1e-12);
        // Midpoint of the upper zone interpolates to half.
        assert_abs_diff_eq!(fine_rolling_hilly(&iv, 80.0), 0.5 * k_h, epsilon = 1e-12);
        assert_abs_diff_eq!(fine_rolling_hilly(&iv, 40.0), -0.5 * k_h, epsilon = 1e-12);
    }

    #[test]
    fn test_fine_rolling_hilly_smooth_terrain_is_zero() {
        let iv = InterValues {
            delta_h_m: 9.9,
            ..InterValues::default()
        };
        assert_eq!(fine_rolling_hilly(&iv, 0.0), 0.0);
    }

    #[test]
    fn test_general_slope_anchors() {
        assert_eq!(general_slope(0.0, 5.0), 0.0);
        assert_abs_diff_eq!(general_slope(-10.0, 5.0), -2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(general_slope(-10.0, 40.0), -8.0, epsilon = 1e-12);
        assert_abs_diff_eq!(general_slope(10.0, 5.0), 1.25, epsilon = 1e-12);
        assert_abs_diff_eq!(general_slope(10.0, 70.0), 6.0, epsilon = 1e-12);
        // Interpolated point half way between the 10 and 30 km curves.
        assert_abs_diff_eq!(general_slope(10.0, 20.0), 2.375, epsilon = 1e-12);
    }

    #[test]
    fn test_mixed_path_no_sea() {
        let mut iv = InterValues::default();
        assert_eq!(mixed_path(20.0, &mut iv), 0.0);
        assert!(iv.trace.contains(Trace::MIXED_PATH_ALL_LAND));
    }

    #[test]
    fn test_mixed_path_all_sea_short_path() {
        let mut iv = InterValues {
            beta: 1.0,
            iend_ov_sea: -1,
            ..InterValues::default()
        };
        assert_abs_diff_eq!(mixed_path(2.0, &mut iv), 11.0, epsilon = 1e-9);
        assert!(iv.trace.contains(Trace::MIXED_PATH_SEA));
    }

    #[test]
    fn test_mixed_path_interpolates_between_30_and_60() {
        let mut iv = InterValues {
            beta: 1.0,
            iend_ov_sea: 1,
            ..InterValues::default()
        };
        let at_30 = mixed_path(30.0, &mut iv);
        let at_60 = mixed_path(60.0, &mut iv);
        let at_45 = mixed_path(45.0, &mut iv);
        assert_abs_diff_eq!(at_30, 11.0, epsilon = 1e-9);
        assert_abs_diff_eq!(at_60, 15.0, epsilon = 1e-9);
        assert_abs_diff_eq!(at_45, 13.0, epsilon = 1e-9);
    }

    #[test]
    fn test_isolated_ridge_reference_height_at_anchor() {
        // A 200 m ridge (alpha = 1) at d1 = 15, d2 = 2 reads curve C
        // directly.
        assert_abs_diff_eq!(isolated_ridge(15.0, 2.0, 200.0, false), -17.5, epsilon = 1e-9);
        // Ridge height scaling is sqrt(h/200).
        assert_abs_diff_eq!(isolated_ridge(15.0, 2.0, 50.0, false), -17.5 * 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_isolated_ridge_v2_clamps() {
        // Beyond curve A the revised form clamps to the curve instead
        // of extrapolating past it.
        let unclamped = isolated_ridge(90.0, 3.0, 200.0, false);
        let clamped = isolated_ridge(90.0, 3.0, 200.0, true);
        assert_abs_diff_eq!(unclamped, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(clamped, -6.0, epsilon = 1e-9);
        // Positive factors are capped to 0 dB away from the ridge.
        assert!(isolated_ridge(60.0, 8.0, 200.0, true) <= 0.0);
    }
}
