//! Median basic propagation loss: the Hata urban formula extended to
//! 3 GHz, with the break-point switch to the long-distance exponent
//! and the suburban/rural offsets.

use crate::{Environment, InterValues, Trace};
use std::f64::consts::PI;

pub(crate) fn median_basic_prop_loss(
    f_mhz: f64,
    h_b_m: f64,
    h_m_m: f64,
    d_km: f64,
    environment: Environment,
    iv: &mut InterValues,
) -> f64 {
    let perm = 4.0e-7 * PI;
    let eps = 8.854e-12;
    let c = 1.0 / (eps * perm).sqrt();

    // Extend the urban median reference attenuation to 3000 MHz by
    // solving for alpha_1, beta_1, gamma_1 through three anchors at
    // 1 km: 22 dB @ 1500 MHz, 23.5 dB @ 2000 MHz, 25.85 dB @ 3000 MHz.
    let sr_1km = (1.0e6 + (200.0_f64 - 3.0).powi(2)).sqrt();
    let htg_hb_ref = 13.82 * 200.0_f64.log10();
    let htg_hm_ref = 3.2 * (11.75 * 3.0_f64).log10().powi(2) - 4.97;
    let wn_1500 = 2.0 * PI * 1.5e9 / c;

    let gamma_1 = (3.85 / 2.0_f64.log10() - 1.5 / (4.0_f64 / 3.0).log10()) / 1.5_f64.log10();
    let beta_1 = 20.0 + 1.5 / (4.0_f64 / 3.0).log10() - gamma_1 * 3.0e6_f64.log10();
    let alpha_1 = 22.0 + htg_hb_ref + htg_hm_ref + 20.0 * (2.0 * wn_1500 * sr_1km).log10()
        - 1500.0_f64.log10() * (beta_1 + gamma_1 * 1500.0_f64.log10());

    // Suburban coefficients through 11.5 / 12.4 / 14 dB at the same
    // anchor frequencies.
    let denom = (4.0_f64 / 3.0).log10() * 1.5_f64.log10() * 2.0_f64.log10();
    let gamma_1_suburban =
        (2.5 * (4.0_f64 / 3.0).log10() - 0.9 * 2.0_f64.log10()) / denom;
    let beta_1_suburban = (0.9 * 2.0_f64.log10() * 4.5e6_f64.log10()
        - 2.5 * (4.0_f64 / 3.0).log10() * 3.0e6_f64.log10())
        / denom;
    let alpha_1_suburban = 11.5
        - beta_1_suburban * 1.5e3_f64.log10()
        - gamma_1_suburban * 1.5e3_f64.log10().powi(2);

    // 100 km anchor triple (63.5 / 65.75 / 69.5 dB), pre-solved.
    let alpha_100 = 120.78129;
    let beta_100 = -52.714929;
    let gamma_100 = 10.919011;

    // Distance power-law coefficients from fig 12 at base effective
    // heights of 24.5, 70, and 200 m (n/2 of 2.5, 3, 3.22).
    let tau = (0.72 * (70.0_f64 / 24.5).log10() - 0.5 * (200.0_f64 / 24.5).log10())
        / (70.0_f64 / 24.5).log10()
        / (200.0_f64 / 70.0).log10()
        / (200.0_f64 / 24.5).log10();
    let sigma = 0.72 / (200.0_f64 / 24.5).log10() - tau * (200.0_f64 * 24.5).log10();
    let rho = 2.5 - 24.5_f64.log10() * (sigma + tau * 24.5_f64.log10());

    let suburban_factor = alpha_1_suburban
        + beta_1_suburban * f_mhz.log10()
        + gamma_1_suburban * f_mhz.log10().powi(2);
    let rural_factor = 40.94 - 18.33 * f_mhz.log10() + 4.78 * f_mhz.log10().powi(2);

    // Height-gain corrections are assumed identical above and below
    // the break point.
    let wnmh = 2.0e6 * PI * f_mhz / c;
    let term1 = f_mhz.log10() * (beta_1 + gamma_1 * f_mhz.log10());
    iv.att_1km = alpha_1 + term1 - htg_hb_ref - htg_hm_ref - 20.0 * (2.0 * wnmh * sr_1km).log10();
    iv.att_100km = alpha_100 + f_mhz.log10() * (beta_100 + gamma_100 * f_mhz.log10());

    let term2 = -13.82 * h_b_m.log10();

    // Break-point distance between the Hata exponent n_l and the
    // long-distance exponent n_h.
    let n_h = 2.0 * (rho + h_b_m.log10() * (sigma + tau * h_b_m.log10()) - 1.0);
    let n_l = 0.1 * (44.9 - 6.55 * h_b_m.log10()) - 2.0;
    iv.d_bp_km = 10.0_f64.powf((2.0 * n_h + 0.1 * (iv.att_1km - iv.att_100km)) / (n_h - n_l));

    let terma = -3.2 * (11.75 * h_m_m).log10().powi(2) + 4.97;
    // Slant range from base to mobile.
    let sr_d = (1.0e6 * d_km.powi(2) + (h_b_m - h_m_m).powi(2)).sqrt();

    let plb_urban = if d_km <= iv.d_bp_km {
        iv.trace |= Trace::MEDIAN_BELOW_BREAKPOINT;
        alpha_1 + term1 + term2 + terma + (44.9 - 6.55 * h_b_m.log10()) * d_km.log10()
    } else {
        iv.trace |= Trace::MEDIAN_ABOVE_BREAKPOINT;
        iv.att_100km + htg_hb_ref + term2 + htg_hm_ref + terma - 20.0 * n_h
            + 10.0 * n_h * d_km.log10()
            + 20.0 * (2.0 * wnmh * sr_d).log10()
    };

    match environment {
        Environment::Urban => {
            iv.trace |= Trace::MEDIAN_URBAN;
            plb_urban
        }
        Environment::Suburban => {
            iv.trace |= Trace::MEDIAN_SUBURBAN;
            plb_urban - suburban_factor
        }
        Environment::Rural => {
            iv.trace |= Trace::MEDIAN_RURAL;
            plb_urban - rural_factor
        }
    }
}
