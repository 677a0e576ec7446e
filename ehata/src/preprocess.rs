//! Terrain-path preprocessing, executed in fixed order: average ground
//! heights, elevation quantiles, mobile slope, sea-path analysis, and
//! the single-horizon test. The profile is mobile-first throughout.

use crate::{InterValues, Trace};
use terrain::{
    math::{least_squares, quantile},
    Profile,
};

pub(crate) fn preprocess_terrain_path(
    profile: &Profile,
    h_b_m: f64,
    h_m_m: f64,
    winnforum: bool,
    iv: &mut InterValues,
) {
    find_average_ground_height(profile, winnforum, iv);
    compute_terrain_statistics(profile, iv);
    mobile_terrain_slope(profile, iv);
    analyze_sea_path(profile, iv);
    single_horizon_test(profile, h_m_m, h_b_m, iv);
}

fn mean(samples: &[f64]) -> f64 {
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Average ground height near each terminal. Short paths use the
/// endpoint elevations; mid-length paths average everything beyond
/// 3 km from the terminal and ramp that toward the endpoint value;
/// long paths average the 3..15 km band.
///
/// The WinnForum form converts kilometers to sample indices with
/// `ceil` and blends via the ramp; the legacy form truncates and
/// scales the bare mean.
fn find_average_ground_height(profile: &Profile, winnforum: bool, iv: &mut InterValues) {
    let np = profile.num_intervals();
    let elev = profile.elevations();
    let xi_km = profile.step_m() / 1000.0;
    let d_km = np as f64 * xi_km;

    let skip = if winnforum {
        (3.0 / xi_km).ceil() as usize
    } else {
        (3.0 / xi_km) as usize
    };

    if d_km < 3.0 {
        iv.h_avg_m[0] = elev[0];
        iv.h_avg_m[1] = elev[np];
        iv.trace |= Trace::AVG_HEIGHT_ENDPOINTS;
    } else if d_km <= 15.0 {
        let mean_0 = mean(&elev[skip..=np]);
        let mean_1 = mean(&elev[0..=np - skip]);
        if winnforum {
            iv.h_avg_m[0] = elev[0] - (elev[0] - mean_0) * (d_km - 3.0) / 12.0;
            iv.h_avg_m[1] = elev[np] - (elev[np] - mean_1) * (d_km - 3.0) / 12.0;
        } else {
            iv.h_avg_m[0] = mean_0 * (d_km - 3.0) / 12.0;
            iv.h_avg_m[1] = mean_1 * (d_km - 3.0) / 12.0;
        }
        iv.trace |= Trace::AVG_HEIGHT_RAMP;
    } else {
        let i15 = (15.0 / xi_km) as usize;
        iv.h_avg_m[0] = mean(&elev[skip..=i15]);
        iv.h_avg_m[1] = mean(&elev[np - i15..=np - skip]);
        iv.trace |= Trace::AVG_HEIGHT_WINDOW;
    }
}

/// 10/50/90% elevation quantiles over the 10 km adjacent to the
/// mobile (the whole path when shorter), and the terrain irregularity
/// `delta_h` they imply. Short paths extrapolate to the asymptotic
/// irregularity.
fn compute_terrain_statistics(profile: &Profile, iv: &mut InterValues) {
    let np = profile.num_intervals();
    let elev = profile.elevations();
    let xi_km = profile.step_m() / 1000.0;
    let d_km = profile.distance_m() / 1000.0;

    let i_end = if d_km < 10.0 {
        iv.trace |= Trace::QUANTILES_FULL_PATH;
        np
    } else {
        iv.trace |= Trace::QUANTILES_MOBILE_WINDOW;
        (10.0 / xi_km) as usize
    };

    let mut segment = elev[..=i_end].to_vec();
    let npts = i_end + 1;
    let rank = |p: f64| ((p * npts as f64 - 1.0) as i32).max(0) as usize;
    iv.pfl10_m = quantile(&mut segment, rank(0.1));
    iv.pfl50_m = quantile(&mut segment, rank(0.5));
    iv.pfl90_m = quantile(&mut segment, rank(0.9));
    iv.delta_h_m = iv.pfl10_m - iv.pfl90_m;

    if d_km < 10.0 {
        let factor = (1.0 - 0.8 * (-0.2_f64).exp()) / (1.0 - 0.8 * (-0.02 * d_km).exp());
        iv.pfl10_m *= factor;
        iv.pfl50_m *= factor;
        iv.pfl90_m *= factor;
        iv.delta_h_m *= factor;
    }
}

/// Mean terrain slope in the vicinity of the mobile, in milliradians,
/// fitted over windows growing from 5 to 10 km. Sign follows the
/// Okumura convention (positive tilts toward the base).
fn mobile_terrain_slope(profile: &Profile, iv: &mut InterValues) {
    let elev = profile.elevations();
    let xi = profile.step_m();
    let d_m = profile.distance_m();

    iv.slope_max = -1.0e31;
    iv.slope_min = 1.0e31;
    let mut slope_five = 0.0;

    let x1 = 0.0;
    let mut x2 = 5000.0;
    while d_m >= x2 && x2 <= 10000.0 {
        let npts = (x2 / xi) as usize;
        let (z1, z2) = least_squares(xi, &elev[..=npts], x1, x2);
        let slope = -1000.0 * (z2 - z1) / (x2 - x1);
        iv.slope_min = iv.slope_min.min(slope);
        iv.slope_max = iv.slope_max.max(slope);
        if x2 == 5000.0 {
            slope_five = slope;
        }
        x2 += 1000.0;
    }

    if d_m <= 5000.0 || iv.slope_max * iv.slope_min < 0.0 {
        iv.theta_m_mrad = slope_five;
        iv.trace |= Trace::SLOPE_AT_5KM;
    } else if iv.slope_max >= 0.0 {
        iv.theta_m_mrad = iv.slope_max;
        iv.trace |= Trace::SLOPE_MAX;
    } else {
        iv.theta_m_mrad = iv.slope_min;
        iv.trace |= Trace::SLOPE_MIN;
    }
}

/// Fraction of the path over sea (samples at exactly zero elevation)
/// and which half of the path carries more of it.
fn analyze_sea_path(profile: &Profile, iv: &mut InterValues) {
    let np = profile.num_intervals();
    let elev = profile.elevations();
    let index_midpoint = np / 2;

    let mut sea_cnt = 0usize;
    let mut low_cnt = 0usize;
    let mut high_cnt = 0usize;
    for (i, &e) in elev.iter().enumerate() {
        if e == 0.0 {
            sea_cnt += 1;
            if i + 1 <= index_midpoint {
                low_cnt += 1;
            } else {
                high_cnt += 1;
            }
        }
    }

    iv.beta = sea_cnt as f64 / (np + 1) as f64;
    iv.iend_ov_sea = if low_cnt > high_cnt {
        1
    } else if high_cnt > low_cnt {
        0
    } else {
        -1
    };
}

fn average_terrain_height(profile: &Profile) -> f64 {
    mean(profile.elevations())
}

/// Horizon scan shared with the Longley-Rice geometry: each terminal
/// tracks its maximum elevation angle against a ray curving at half
/// the effective earth curvature. Horizons left at the full path
/// distance mean the terminal is unobstructed.
fn find_horizons(
    profile: &Profile,
    gme: f64,
    d_m: f64,
    h_1_m: f64,
    h_2_m: f64,
    d_hzn_m: &mut [f64; 2],
) {
    let np = profile.num_intervals();
    let elev = profile.elevations();
    let xi = profile.step_m();
    let za = elev[0] + h_1_m;
    let zb = elev[np] + h_2_m;
    let qc = 0.5 * gme;
    let mut q = qc * d_m;
    let mut theta = [0.0; 2];

    theta[1] = (zb - za) / d_m;
    theta[0] = theta[1] - q;
    theta[1] = -theta[1] - q;
    d_hzn_m[0] = d_m;
    d_hzn_m[1] = d_m;

    if np < 2 {
        return;
    }
    let mut sa = 0.0;
    let mut sb = d_m;
    let mut wq = true;
    for &e in &elev[1..np] {
        sa += xi;
        sb -= xi;
        q = e - (qc * sa + theta[0]) * sa - za;
        if q > 0.0 {
            theta[0] += q / sa;
            d_hzn_m[0] = sa;
            wq = false;
        }
        if !wq {
            q = e - (qc * sb + theta[1]) * sb - zb;
            if q > 0.0 {
                theta[1] += q / sb;
                d_hzn_m[1] = sb;
            }
        }
    }
}

/// Classifies the path as single- or double-horizon. A path is single
/// horizon when both terminals' horizons meet at the same obstruction
/// (within half a sample step); the obstruction's excess height above
/// the terminal-to-terminal chord becomes `hedge_tilda`.
fn single_horizon_test(profile: &Profile, h_m_m: f64, h_b_m: f64, iv: &mut InterValues) {
    let np = profile.num_intervals();
    let elev = profile.elevations();
    let xi = profile.step_m();
    let d_m = profile.distance_m();

    let h_gnd_m = average_terrain_height(profile);
    let en0 = 301.0;
    let ens = if h_gnd_m == 0.0 {
        en0
    } else {
        en0 * (-h_gnd_m / 9460.0).exp()
    };
    let gma = 157e-9;
    let gme = gma * (1.0 - 0.04665 * (ens / 179.3).exp());

    find_horizons(profile, gme, d_m, h_m_m, h_b_m, &mut iv.d_hzn_m);

    let d_diff_m = d_m - iv.d_hzn_m[0] - iv.d_hzn_m[1];
    let q = (d_diff_m - 0.5 * xi).max(0.0) - (-d_diff_m - 0.5 * xi).max(0.0);
    if q != 0.0 {
        iv.single_horizon = false;
        iv.trace |= Trace::TWO_HORIZONS;
    } else {
        iv.single_horizon = true;
        iv.trace |= Trace::SINGLE_HORIZON;
        let iedge = (iv.d_hzn_m[0] / xi) as usize;

        let za = h_b_m + elev[np];
        let zb = h_m_m + elev[0];
        iv.hedge_tilda = elev[iedge] - (za * iv.d_hzn_m[1] + zb * iv.d_hzn_m[0]) / d_m
            + 0.5 * gme * iv.d_hzn_m[0] * iv.d_hzn_m[1];
        if iv.hedge_tilda < 0.0 {
            iv.hedge_tilda = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InterValues, Trace};
    use approx::assert_abs_diff_eq;

    fn flat_profile(n_intervals: usize, step_m: f64, elevation: f64) -> Profile {
        Profile::new(step_m, vec![elevation; n_intervals + 1]).unwrap()
    }

    #[test]
    fn test_average_height_short_path_uses_endpoints() {
        let mut elevations = vec![50.0; 201];
        elevations[0] = 10.0;
        elevations[200] = 30.0;
        let profile = Profile::new(10.0, elevations).unwrap();
        let mut iv = InterValues::default();
        find_average_ground_height(&profile, true, &mut iv);
        assert_eq!(iv.h_avg_m, [10.0, 30.0]);
        assert!(iv.trace.contains(Trace::AVG_HEIGHT_ENDPOINTS));
    }

    #[test]
    fn test_average_height_long_path_averages_band() {
        // 20 km of 100 m steps; elevation 7 m everywhere, so both
        // bands average to exactly 7.
        let profile = flat_profile(200, 100.0, 7.0);
        let mut iv = InterValues::default();
        find_average_ground_height(&profile, true, &mut iv);
        assert_eq!(iv.h_avg_m, [7.0, 7.0]);
        assert!(iv.trace.contains(Trace::AVG_HEIGHT_WINDOW));
    }

    #[test]
    fn test_average_height_ramp_blends_toward_endpoint() {
        // 9 km at 100 m steps, endpoint 100 m above the plain: the
        // WinnForum ramp pulls the average half way back toward the
        // endpoint at d = 9 km.
        let mut elevations = vec![0.0; 91];
        elevations[0] = 100.0;
        let profile = Profile::new(100.0, elevations).unwrap();
        let mut iv = InterValues::default();
        find_average_ground_height(&profile, true, &mut iv);
        assert!(iv.trace.contains(Trace::AVG_HEIGHT_RAMP));
        // mean beyond 3 km is 0, so h_avg0 = 100 - 100 * 6/12 = 50.
        assert_abs_diff_eq!(iv.h_avg_m[0], 50.0, epsilon = 1e-12);
    }

    #[test]
    fn test_terrain_statistics_quantiles() {
        // 15 km path whose first 10 km ramp from 0 to 100 m; the
        // statistics window stops at 10 km.
        let elevations: Vec<f64> = (0..=150).map(|i| (i as f64).min(100.0)).collect();
        let profile = Profile::new(100.0, elevations).unwrap();
        let mut iv = InterValues::default();
        compute_terrain_statistics(&profile, &mut iv);
        assert!(iv.trace.contains(Trace::QUANTILES_MOBILE_WINDOW));
        // 101 window samples 0..=100: descending rank 9 is 91, rank 49
        // is 51, rank 89 is 11.
        assert_abs_diff_eq!(iv.pfl10_m, 91.0, epsilon = 1e-12);
        assert_abs_diff_eq!(iv.pfl50_m, 51.0, epsilon = 1e-12);
        assert_abs_diff_eq!(iv.pfl90_m, 11.0, epsilon = 1e-12);
        assert_abs_diff_eq!(iv.delta_h_m, 80.0, epsilon = 1e-12);
    }

    #[test]
    fn test_terrain_statistics_short_path_extrapolates() {
        let profile = flat_profile(50, 100.0, 40.0);
        let mut iv = InterValues::default();
        compute_terrain_statistics(&profile, &mut iv);
        assert!(iv.trace.contains(Trace::QUANTILES_FULL_PATH));
        let factor =
            (1.0 - 0.8 * (-0.2_f64).exp()) / (1.0 - 0.8 * (-0.02_f64 * 5.0).exp());
        assert_abs_diff_eq!(iv.pfl50_m, 40.0 * factor, epsilon = 1e-12);
        assert_abs_diff_eq!(iv.delta_h_m, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mobile_slope_uniform_descent() {
        // Terrain falling away from the mobile at 10 m/km: slope is
        // +10 mrad in the Okumura sign convention for every window, so
        // slope_max is selected.
        let elevations: Vec<f64> = (0..=100).map(|i| 1000.0 - (i as f64)).collect();
        let profile = Profile::new(100.0, elevations).unwrap();
        let mut iv = InterValues::default();
        mobile_terrain_slope(&profile, &mut iv);
        assert!(iv.trace.contains(Trace::SLOPE_MAX));
        assert_abs_diff_eq!(iv.theta_m_mrad, 10.0, epsilon = 1e-6);
        assert_abs_diff_eq!(iv.slope_min, 10.0, epsilon = 1e-6);
    }

    #[test]
    fn test_mobile_slope_short_path_uses_five_km_window() {
        let profile = flat_profile(40, 100.0, 5.0);
        let mut iv = InterValues::default();
        mobile_terrain_slope(&profile, &mut iv);
        // d = 4 km: no window fits, the 5 km slope defaults to zero.
        assert!(iv.trace.contains(Trace::SLOPE_AT_5KM));
        assert_eq!(iv.theta_m_mrad, 0.0);
    }

    #[test]
    fn test_sea_path_flat_sea() {
        let profile = flat_profile(200, 10.0, 0.0);
        let mut iv = InterValues::default();
        analyze_sea_path(&profile, &mut iv);
        assert_eq!(iv.beta, 1.0);
        assert_eq!(iv.iend_ov_sea, -1);
    }

    #[test]
    fn test_sea_path_sea_at_mobile_end() {
        let mut elevations = vec![20.0; 101];
        for e in elevations.iter_mut().take(30) {
            *e = 0.0;
        }
        let profile = Profile::new(100.0, elevations).unwrap();
        let mut iv = InterValues::default();
        analyze_sea_path(&profile, &mut iv);
        assert_abs_diff_eq!(iv.beta, 30.0 / 101.0, epsilon = 1e-12);
        assert_eq!(iv.iend_ov_sea, 1);
    }

    #[test]
    fn test_single_horizon_ridge() {
        // A tent profile: both horizons land on the central ridge.
        let elevations: Vec<f64> = (0..=1000)
            .map(|i| 100.0 + 0.3 * i.min(1000 - i) as f64)
            .collect();
        let profile = Profile::new(10.0, elevations).unwrap();
        let mut iv = InterValues::default();
        single_horizon_test(&profile, 1.5, 50.0, &mut iv);
        assert!(iv.single_horizon);
        assert!(iv.trace.contains(Trace::SINGLE_HORIZON));
        assert_eq!(iv.d_hzn_m, [5000.0, 5000.0]);
        // Ridge rises 250 m over terminals around 100 m; the excess
        // height lands a bit above 120 m once the chord and curvature
        // terms are removed.
        assert!(iv.hedge_tilda > 100.0 && iv.hedge_tilda < 150.0);
    }

    #[test]
    fn test_two_horizons_on_open_path() {
        // Unobstructed flat path: both horizons stay at the full
        // distance, which the criterion classifies as two-horizon.
        let profile = flat_profile(500, 10.0, 30.0);
        let mut iv = InterValues::default();
        single_horizon_test(&profile, 1.5, 50.0, &mut iv);
        assert!(!iv.single_horizon);
        assert!(iv.trace.contains(Trace::TWO_HORIZONS));
    }
}
