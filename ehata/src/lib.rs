//! # Extended-Hata propagation model
//!
//! Median path loss for urban, suburban, and rural macro links between
//! 1500 and 3000 MHz (functional below), over a terrain [`Profile`]
//! given **mobile-first**: the first elevation sample is the mobile
//! (receiver) end, the last is the base (transmitter) end. Callers
//! holding a transmitter-first transect can flip it with
//! [`Profile::reversed`].
//!
//! The WinnForum extensions (snapped path distance, `ceil` index
//! conversion, endpoint-blended average heights, and the revised
//! effective-height clamps) are enabled by default and controlled
//! process-wide through [`set_winnforum_extensions`].

mod corrections;
mod median;
mod preprocess;

use log::debug;
use std::ops::{BitOr, BitOrAssign};
use std::sync::atomic::{AtomicBool, Ordering};
use terrain::Profile;

/// Revised isolated-ridge interpolation (curve clamping and the 0 dB
/// cap). The reference model ships with it disabled.
const ISOLATED_RIDGE_V2_CORR: bool = false;

static WINNFORUM_EXTENSIONS: AtomicBool = AtomicBool::new(true);

/// Toggles the WinnForum extensions process-wide. Intended to be set
/// once at startup; evaluations snapshot the flag on entry.
pub fn set_winnforum_extensions(on: bool) {
    WINNFORUM_EXTENSIONS.store(on, Ordering::SeqCst);
}

/// Current state of the WinnForum-extensions toggle.
pub fn winnforum_extensions() -> bool {
    WINNFORUM_EXTENSIONS.load(Ordering::SeqCst)
}

/// Propagation environment.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Urban,
    Suburban,
    Rural,
}

impl Environment {
    /// Maps a land-category code: 23 and 24 are urban, 22 suburban,
    /// anything else rural.
    pub fn from_code(code: i32) -> Self {
        match code {
            23 | 24 => Environment::Urban,
            22 => Environment::Suburban,
            _ => Environment::Rural,
        }
    }
}

/// Record of which code paths an evaluation executed, for diagnostics
/// and test assertions. Combine with `|`, query with
/// [`Trace::contains`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Trace(u32);

impl Trace {
    /// Path under 3 km: terminal averages are the endpoint elevations.
    pub const AVG_HEIGHT_ENDPOINTS: Trace = Trace(1 << 0);
    /// Path 3..15 km: band average blended toward the endpoint.
    pub const AVG_HEIGHT_RAMP: Trace = Trace(1 << 1);
    /// Path over 15 km: plain 3..15 km band average.
    pub const AVG_HEIGHT_WINDOW: Trace = Trace(1 << 2);
    /// Quantiles over the whole (short) path.
    pub const QUANTILES_FULL_PATH: Trace = Trace(1 << 3);
    /// Quantiles over the 10 km adjacent to the mobile.
    pub const QUANTILES_MOBILE_WINDOW: Trace = Trace(1 << 4);
    /// Mobile slope taken from the 5 km window.
    pub const SLOPE_AT_5KM: Trace = Trace(1 << 5);
    /// Mobile slope taken as the window maximum.
    pub const SLOPE_MAX: Trace = Trace(1 << 6);
    /// Mobile slope taken as the window minimum.
    pub const SLOPE_MIN: Trace = Trace(1 << 7);
    /// Horizon test found distinct horizons.
    pub const TWO_HORIZONS: Trace = Trace(1 << 8);
    /// Horizon test found a shared obstruction.
    pub const SINGLE_HORIZON: Trace = Trace(1 << 9);
    /// Median loss used the Hata exponent (below break point).
    pub const MEDIAN_BELOW_BREAKPOINT: Trace = Trace(1 << 10);
    /// Median loss used the long-distance exponent.
    pub const MEDIAN_ABOVE_BREAKPOINT: Trace = Trace(1 << 11);
    pub const MEDIAN_URBAN: Trace = Trace(1 << 12);
    pub const MEDIAN_SUBURBAN: Trace = Trace(1 << 13);
    pub const MEDIAN_RURAL: Trace = Trace(1 << 14);
    /// No sea samples; mixed-path factor is 0 dB.
    pub const MIXED_PATH_ALL_LAND: Trace = Trace(1 << 15);
    /// Sea samples present; mixed-path tables interpolated.
    pub const MIXED_PATH_SEA: Trace = Trace(1 << 16);
    /// Final dispatch through the isolated-ridge branch.
    pub const DISPATCH_SINGLE_HORIZON: Trace = Trace(1 << 17);
    /// Final dispatch through the rolling-terrain branch.
    pub const DISPATCH_TWO_HORIZON: Trace = Trace(1 << 18);

    pub fn contains(self, other: Trace) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn bits(self) -> u32 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for Trace {
    type Output = Trace;

    fn bitor(self, rhs: Trace) -> Trace {
        Trace(self.0 | rhs.0)
    }
}

impl BitOrAssign for Trace {
    fn bitor_assign(&mut self, rhs: Trace) {
        self.0 |= rhs.0;
    }
}

/// Intermediate values computed on the way to the loss, exposed for
/// diagnostics.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InterValues {
    /// Break-point distance between the two distance exponents.
    pub d_bp_km: f64,
    /// Median attenuation relative to free space at 1 km.
    pub att_1km: f64,
    /// Median attenuation relative to free space at 100 km.
    pub att_100km: f64,

    /// Effective base antenna height, after clamping.
    pub h_b_eff_m: f64,
    /// Effective mobile antenna height, after clamping.
    pub h_m_eff_m: f64,

    /// 10% terrain elevation quantile near the mobile.
    pub pfl10_m: f64,
    /// 50% terrain elevation quantile near the mobile.
    pub pfl50_m: f64,
    /// 90% terrain elevation quantile near the mobile.
    pub pfl90_m: f64,
    /// Terrain irregularity (10% minus 90% quantile).
    pub delta_h_m: f64,

    /// Path distance.
    pub d_km: f64,
    /// Horizon distances, mobile end first.
    pub d_hzn_m: [f64; 2],
    /// Average ground height near each terminal, mobile end first.
    pub h_avg_m: [f64; 2],
    /// Terrain slope at the mobile, milliradians.
    pub theta_m_mrad: f64,
    /// Fraction of the path over sea.
    pub beta: f64,
    /// Which end is over sea: 1 mobile, 0 base, -1 tied.
    pub iend_ov_sea: i32,
    /// Excess height of the shared obstruction, when single-horizon.
    pub hedge_tilda: f64,
    pub single_horizon: bool,

    pub slope_max: f64,
    pub slope_min: f64,

    pub trace: Trace,
}

/// Extended-Hata path loss in dB. Profile is mobile-first; heights are
/// structural heights above ground.
pub fn extended_hata(
    profile: &Profile,
    f_mhz: f64,
    h_b_m: f64,
    h_m_m: f64,
    environment: Environment,
) -> f64 {
    extended_hata_dbg(profile, f_mhz, h_b_m, h_m_m, environment).0
}

/// Extended-Hata path loss plus the intermediate values it was built
/// from.
pub fn extended_hata_dbg(
    profile: &Profile,
    f_mhz: f64,
    h_b_m: f64,
    h_m_m: f64,
    environment: Environment,
) -> (f64, InterValues) {
    extended_hata_with(
        profile,
        f_mhz,
        h_b_m,
        h_m_m,
        environment,
        winnforum_extensions(),
    )
}

/// Median basic propagation loss only, skipping the terrain-derived
/// correction factors. Heights are used as passed, without the
/// effective-height computation or clamps.
pub fn median_basic_prop_loss(
    f_mhz: f64,
    h_b_m: f64,
    h_m_m: f64,
    d_km: f64,
    environment: Environment,
) -> (f64, InterValues) {
    let mut iv = InterValues {
        d_km,
        h_b_eff_m: h_b_m,
        h_m_eff_m: h_m_m,
        ..InterValues::default()
    };
    let plb = median::median_basic_prop_loss(f_mhz, h_b_m, h_m_m, d_km, environment, &mut iv);
    (plb, iv)
}

fn extended_hata_with(
    profile: &Profile,
    f_mhz: f64,
    h_b_m: f64,
    h_m_m: f64,
    environment: Environment,
    winnforum: bool,
) -> (f64, InterValues) {
    let np = profile.num_intervals();
    let elev = profile.elevations();
    let mut iv = InterValues::default();

    preprocess::preprocess_terrain_path(profile, h_b_m, h_m_m, winnforum, &mut iv);

    let h_m_gnd_m = elev[0];
    iv.h_m_eff_m = h_m_m + elev[0] - iv.h_avg_m[0];
    iv.h_b_eff_m = h_b_m + elev[np] - iv.h_avg_m[1];
    let d1_hzn_km = iv.d_hzn_m[1] * 0.001;
    let d2_hzn_km = iv.d_hzn_m[0] * 0.001;

    if winnforum {
        iv.h_b_eff_m = iv.h_b_eff_m.clamp(20.0, 200.0);
        iv.h_m_eff_m = h_m_m;
    } else {
        iv.h_m_eff_m = iv.h_m_eff_m.clamp(1.0, 10.0);
        iv.h_b_eff_m = iv.h_b_eff_m.clamp(30.0, 200.0);
    }

    iv.d_km = profile.distance_m() / 1000.0;

    let plb_median_db = median::median_basic_prop_loss(
        f_mhz,
        iv.h_b_eff_m,
        iv.h_m_eff_m,
        iv.d_km,
        environment,
        &mut iv,
    );

    let plb = if iv.single_horizon {
        iv.trace |= Trace::DISPATCH_SINGLE_HORIZON;
        let ridge = corrections::isolated_ridge(
            d1_hzn_km,
            d2_hzn_km,
            iv.hedge_tilda,
            ISOLATED_RIDGE_V2_CORR,
        );
        let mixed = corrections::mixed_path(iv.d_km, &mut iv);
        plb_median_db - ridge - mixed
    } else {
        iv.trace |= Trace::DISPATCH_TWO_HORIZON;
        let rolling = corrections::median_rolling_hilly(iv.delta_h_m);
        let fine = corrections::fine_rolling_hilly(&iv, h_m_gnd_m);
        let slope = corrections::general_slope(iv.theta_m_mrad, iv.d_km);
        let mixed = corrections::mixed_path(iv.d_km, &mut iv);
        plb_median_db - rolling - fine - slope - mixed
    };

    debug!(
        "ehata; d_km: {:.3}, single_horizon: {}, h_b_eff: {:.1}, loss_db: {:.2}",
        iv.d_km, iv.single_horizon, iv.h_b_eff_m, plb
    );

    (plb, iv)
}
