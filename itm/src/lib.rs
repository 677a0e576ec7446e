//! # Longley-Rice Irregular Terrain Model
//!
//! A native implementation of the ITM in point-to-point mode, plus the
//! single area-mode utility entry. Given a terrain [`Profile`] between
//! two terminals and the link parameters, it predicts the quantile of
//! basic transmission loss requested by a confidence and a reliability.
//!
//! All per-link calibration lives in a caller-owned [`Link`]; the
//! one-shot [`point_to_point`] and batch [`point_to_point_rels`]
//! functions are sugar over it. Evaluations never fail: out-of-range
//! parameters surface as a [`Warning`] alongside the numeric loss.
//!
//! # Suggested Surface Parameters
//!
//! | Ground attribute | Conductivity (S/m) | Relative permittivity |
//! |------------------|-------------------:|----------------------:|
//! | Poor ground      |              0.001 |                     4 |
//! | Average ground   |              0.005 |                    15 |
//! | Good ground      |               0.02 |                    25 |
//! | Fresh water      |               0.01 |                    25 |
//! | Sea water        |                5.0 |                    25 |

mod attenuation;
mod error;
mod geometry;
mod params;
mod variability;

pub use crate::{
    error::Warning,
    params::{Climate, Mode, ModeVariability, Polarization, SitingCriteria},
};

use crate::{
    attenuation::Attenuation,
    variability::{inverse_normal, Variability},
};
use log::debug;
use num_complex::Complex64;
use terrain::Profile;

/// The FORTRAN `DIM` intrinsic: `x - y` when positive, else zero.
pub(crate) fn fortran_dim(x: f64, y: f64) -> f64 {
    if x > y {
        x - y
    } else {
        0.0
    }
}

/// Path state shared by the geometry, attenuation, and variability
/// kernels.
#[derive(Debug, Clone)]
pub(crate) struct Prop {
    pub aref: f64,
    pub dist: f64,
    /// Structural antenna heights above ground, transmitter first.
    pub hg: [f64; 2],
    pub wn: f64,
    pub dh: f64,
    pub ens: f64,
    pub gme: f64,
    pub zgnd: Complex64,
    /// Effective antenna heights.
    pub he: [f64; 2],
    /// Horizon distances.
    pub dl: [f64; 2],
    /// Horizon elevation angles.
    pub the: [f64; 2],
    pub kwx: i32,
    pub mdp: i32,
}

impl Prop {
    fn new(hg: [f64; 2]) -> Self {
        Self {
            aref: 0.0,
            dist: 0.0,
            hg,
            wn: 0.0,
            dh: 0.0,
            ens: 0.0,
            gme: 0.0,
            zgnd: Complex64::new(0.0, 0.0),
            he: [0.0; 2],
            dl: [0.0; 2],
            the: [0.0; 2],
            kwx: 0,
            mdp: -1,
        }
    }
}

/// Wave number, effective refractivity and earth curvature, and ground
/// transfer impedance from the primary link parameters. `zsys` is the
/// mean path elevation used to refer the surface refractivity to the
/// path altitude; pass zero when the refractivity is already final.
fn propagation_constants(
    prop: &mut Prop,
    freq_mhz: f64,
    zsys: f64,
    en0: f64,
    polarization: Polarization,
    dielectric: f64,
    conductivity: f64,
) {
    const GMA: f64 = 157e-9;

    prop.wn = freq_mhz / 47.7;
    prop.ens = en0;
    if zsys != 0.0 {
        prop.ens *= (-zsys / 9460.0).exp();
    }
    prop.gme = GMA * (1.0 - 0.04665 * (prop.ens / 179.3).exp());
    let zq = Complex64::new(dielectric, 376.62 * conductivity / prop.wn);
    let mut zgnd = (zq - 1.0).sqrt();
    if polarization == Polarization::Vertical {
        zgnd /= zq;
    }
    prop.zgnd = zgnd;
}

/// A point-to-point evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub attenuation_db: f64,
    pub mode: Mode,
    pub warning: Warning,
}

/// A prepared point-to-point path.
///
/// Construction performs all terrain preprocessing and sub-model
/// calibration; [`Link::loss_db`] then evaluates any number of
/// confidence/reliability quantiles against the same path.
#[derive(Debug)]
pub struct Link {
    prop: Prop,
    var: Variability,
    mode: Mode,
    free_space_db: f64,
    incidence_deg: [f64; 2],
}

impl Link {
    /// Prepares a path for evaluation.
    ///
    /// - `profile`: terrain transect, transmitter at the first sample
    /// - `tx_height_m`, `rx_height_m`: antenna heights above ground
    /// - `dielectric`, `conductivity`: ground constants (see the crate
    ///   table)
    /// - `surface_refractivity`: N-units, 250..400 (301 is 4/3 earth)
    /// - `mdvar`: mode of variability, 0..=3, +10 to freeze location
    ///   variability, +20 to freeze situation variability
    /// - `refractivity_is_final`: skip the altitude correction that
    ///   refers the refractivity to the mean path elevation
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        profile: &Profile,
        tx_height_m: f64,
        rx_height_m: f64,
        dielectric: f64,
        conductivity: f64,
        surface_refractivity: f64,
        freq_mhz: f64,
        climate: Climate,
        polarization: Polarization,
        mdvar: i32,
        refractivity_is_final: bool,
    ) -> Self {
        let np = profile.num_intervals();
        let elev = profile.elevations();
        let mut prop = Prop::new([tx_height_m, rx_height_m]);

        let mut en0 = surface_refractivity;
        let mut zsys = 0.0;
        if !refractivity_is_final {
            if en0 <= 0.0 {
                en0 = 310.0;
            }
            // Mean elevation over the middle of the path, in the raw
            // profile's index arithmetic.
            let ja = (3.0 + 0.1 * np as f64) as usize;
            let jb = np - ja + 6;
            for i in (ja - 1)..jb {
                zsys += elev[i - 2];
            }
            zsys /= (jb - ja + 1) as f64;
        }

        propagation_constants(
            &mut prop,
            freq_mhz,
            zsys,
            en0,
            polarization,
            dielectric,
            conductivity,
        );
        let incidence_deg = geometry::fit_profile(profile, &mut prop);
        let mut atten = Attenuation::new(&mut prop);
        atten.reference_attenuation(0.0, &mut prop);
        let var = Variability::new(climate, mdvar, &mut prop);

        let free_space_db =
            32.45 + 20.0 * freq_mhz.log10() + 20.0 * (prop.dist / 1000.0).log10();

        let horizon_excess_m = prop.dist - atten.propa.dla;
        let mode = if (horizon_excess_m as i64) < 0 {
            Mode::LineOfSight
        } else {
            let single = horizon_excess_m as i64 == 0;
            let troposcatter =
                !(prop.dist <= atten.propa.dlsa || prop.dist <= atten.propa.dx);
            match (single, troposcatter) {
                (true, false) => Mode::SingleHorizonDiffraction,
                (true, true) => Mode::SingleHorizonTroposcatter,
                (false, false) => Mode::DoubleHorizonDiffraction,
                (false, true) => Mode::DoubleHorizonTroposcatter,
            }
        };

        debug!(
            "itm link; dist_m: {:.1}, delta_h: {:.1}, mode: {}, kwx: {}",
            prop.dist, prop.dh, mode, prop.kwx
        );

        Self {
            prop,
            var,
            mode,
            free_space_db,
            incidence_deg,
        }
    }

    /// Basic transmission loss (dB) at the requested confidence and
    /// reliability, both in (0, 1).
    pub fn loss_db(&mut self, confidence: f64, reliability: f64) -> f64 {
        let zc = inverse_normal(confidence);
        let zr = inverse_normal(reliability);
        self.var.offset(zr, 0.0, zc, &mut self.prop) + self.free_space_db
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn warning(&self) -> Warning {
        Warning::from_code(self.prop.kwx)
    }

    pub fn warning_code(&self) -> i32 {
        self.prop.kwx
    }

    /// Vertical incidence angles at each terminal in degrees, positive
    /// upward, as seen along the raw terrain before any horizon
    /// adjustment.
    pub fn incidence_angles_deg(&self) -> (f64, f64) {
        (self.incidence_deg[0], self.incidence_deg[1])
    }

    /// Terrain irregularity over the path, in meters.
    pub fn delta_h_m(&self) -> f64 {
        self.prop.dh
    }

    /// Effective antenna heights, transmitter first, in meters.
    pub fn effective_heights_m(&self) -> (f64, f64) {
        (self.prop.he[0], self.prop.he[1])
    }

    pub fn distance_m(&self) -> f64 {
        self.prop.dist
    }
}

/// Point-to-point basic transmission loss at one confidence/reliability
/// quantile.
#[allow(clippy::too_many_arguments)]
pub fn point_to_point(
    profile: &Profile,
    tx_height_m: f64,
    rx_height_m: f64,
    dielectric: f64,
    conductivity: f64,
    surface_refractivity: f64,
    freq_mhz: f64,
    climate: Climate,
    polarization: Polarization,
    confidence: f64,
    reliability: f64,
    mdvar: i32,
    refractivity_is_final: bool,
) -> Report {
    let mut link = Link::new(
        profile,
        tx_height_m,
        rx_height_m,
        dielectric,
        conductivity,
        surface_refractivity,
        freq_mhz,
        climate,
        polarization,
        mdvar,
        refractivity_is_final,
    );
    let attenuation_db = link.loss_db(confidence, reliability);
    Report {
        attenuation_db,
        mode: link.mode(),
        warning: link.warning(),
    }
}

/// Point-to-point losses for a batch of reliabilities at a fixed
/// confidence, amortizing the terrain preprocessing across the batch.
#[allow(clippy::too_many_arguments)]
pub fn point_to_point_rels(
    profile: &Profile,
    tx_height_m: f64,
    rx_height_m: f64,
    dielectric: f64,
    conductivity: f64,
    surface_refractivity: f64,
    freq_mhz: f64,
    climate: Climate,
    polarization: Polarization,
    confidence: f64,
    reliabilities: &[f64],
    mdvar: i32,
    refractivity_is_final: bool,
) -> (Vec<f64>, Mode, Warning) {
    let mut link = Link::new(
        profile,
        tx_height_m,
        rx_height_m,
        dielectric,
        conductivity,
        surface_refractivity,
        freq_mhz,
        climate,
        polarization,
        mdvar,
        refractivity_is_final,
    );
    let losses = reliabilities
        .iter()
        .map(|&rel| link.loss_db(confidence, rel))
        .collect();
    (losses, link.mode(), link.warning())
}

/// Area-mode basic transmission loss, with terminal geometry estimated
/// from the terrain irregularity and siting criteria instead of a
/// profile.
#[allow(clippy::too_many_arguments)]
pub fn area(
    mode_variability: ModeVariability,
    delta_h_m: f64,
    tx_height_m: f64,
    rx_height_m: f64,
    distance_km: f64,
    tx_siting: SitingCriteria,
    rx_siting: SitingCriteria,
    dielectric: f64,
    conductivity: f64,
    surface_refractivity: f64,
    freq_mhz: f64,
    climate: Climate,
    polarization: Polarization,
    pct_time: f64,
    pct_location: f64,
    pct_confidence: f64,
) -> (f64, Warning) {
    let zt = inverse_normal(pct_time);
    let zl = inverse_normal(pct_location);
    let zc = inverse_normal(pct_confidence);

    let mut prop = Prop::new([tx_height_m, rx_height_m]);
    prop.dh = delta_h_m;
    prop.ens = surface_refractivity;
    propagation_constants(
        &mut prop,
        freq_mhz,
        0.0,
        surface_refractivity,
        polarization,
        dielectric,
        conductivity,
    );
    geometry::area_terminal_geometry([tx_siting, rx_siting], &mut prop);

    let mut atten = Attenuation::new(&mut prop);
    atten.reference_attenuation(distance_km * 1000.0, &mut prop);
    let mut var = Variability::new(climate, mode_variability as i32, &mut prop);

    let free_space_db = 32.45 + 20.0 * freq_mhz.log10() + 20.0 * (prop.dist / 1000.0).log10();
    let loss_db = free_space_db + var.offset(zt, zl, zc, &mut prop);
    (loss_db, Warning::from_code(prop.kwx))
}
