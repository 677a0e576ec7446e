//! Terrain preprocessing: horizon finding, terrain irregularity, and
//! the effective-height fit that turns a raw elevation profile into the
//! smooth-earth parameters the attenuation kernel consumes.

use crate::{fortran_dim, Prop, SitingCriteria};
use terrain::{
    math::{least_squares, quantile},
    Profile,
};

/// Locates each terminal's radio horizon.
///
/// Scans inward from both ends tracking the maximum elevation angle
/// against a ray curving at half the effective earth curvature. When no
/// interior sample rises above a terminal's line of sight, that
/// terminal's horizon stays at the full path distance.
pub(crate) fn horizons(profile: &Profile, prop: &mut Prop) {
    let elev = profile.elevations();
    let np = profile.num_intervals();
    let xi = profile.step_m();
    let za = elev[0] + prop.hg[0];
    let zb = elev[np] + prop.hg[1];
    let qc = 0.5 * prop.gme;
    let mut q = qc * prop.dist;

    prop.the[1] = (zb - za) / prop.dist;
    prop.the[0] = prop.the[1] - q;
    prop.the[1] = -prop.the[1] - q;
    prop.dl[0] = prop.dist;
    prop.dl[1] = prop.dist;

    if np >= 2 {
        let mut sa = 0.0;
        let mut sb = prop.dist;
        let mut wq = true;
        for &e in &elev[1..np] {
            sa += xi;
            sb -= xi;
            q = e - (qc * sa + prop.the[0]) * sa - za;
            if q > 0.0 {
                prop.the[0] += q / sa;
                prop.dl[0] = sa;
                wq = false;
            }
            if !wq {
                q = e - (qc * sb + prop.the[1]) * sb - zb;
                if q > 0.0 {
                    prop.the[1] += q / sb;
                    prop.dl[1] = sb;
                }
            }
        }
    }
}

/// Terrain irregularity delta-h over the window `[x1, x2]` (meters).
///
/// Resamples the window onto roughly `10 * k` points (4 <= k <= 25),
/// detrends by a linear fit, takes the 90th-minus-10th quantile spread,
/// and extrapolates short windows to the asymptotic value.
pub(crate) fn terrain_irregularity(profile: &Profile, x1: f64, x2: f64) -> f64 {
    let elev = profile.elevations();
    let np = profile.num_intervals();
    let mut xa = x1 / profile.step_m();
    let mut xb = x2 / profile.step_m();
    if xb - xa < 2.0 {
        return 0.0;
    }

    let ka = ((0.1 * (xb - xa + 8.0)) as usize).clamp(4, 25);
    let n = 10 * ka - 5;
    let kb = n - ka + 1;
    let sn = (n - 1) as f64;

    // Resample onto a unit-step scratch buffer.
    let mut s = vec![0.0; n];
    xb = (xb - xa) / sn;
    let mut k = (xa + 1.0) as usize;
    xa -= k as f64;
    for v in s.iter_mut() {
        while xa > 0.0 && k < np {
            xa -= 1.0;
            k += 1;
        }
        *v = elev[k] + (elev[k] - elev[k - 1]) * xa;
        xa += xb;
    }

    // Detrend, then take the 10%/90% spread.
    let (z0, zn) = least_squares(1.0, &s, 0.0, sn);
    let slope = (zn - z0) / sn;
    let mut base = z0;
    for v in s.iter_mut() {
        *v -= base;
        base += slope;
    }
    let dh = quantile(&mut s, ka - 1) - quantile(&mut s, kb - 1);

    dh / (1.0 - 0.8 * (-(x2 - x1) / 50.0e3).exp())
}

/// Fits the profile into smooth-earth parameters: horizons, terrain
/// irregularity, and effective heights, refitting with a shorter
/// regression window when the horizon sum says the path is not truly
/// transhorizon. Returns the vertical incidence angles in degrees as
/// seen before any horizon adjustment.
pub(crate) fn fit_profile(profile: &Profile, prop: &mut Prop) -> [f64; 2] {
    let elev = profile.elevations();
    let np = profile.num_intervals();

    prop.dist = np as f64 * profile.step_m();
    horizons(profile, prop);
    let incidence_deg = [
        prop.the[0].atan().to_degrees(),
        prop.the[1].atan().to_degrees(),
    ];

    let mut xl = [0.0; 2];
    for j in 0..2 {
        xl[j] = (15.0 * prop.hg[j]).min(0.1 * prop.dl[j]);
    }
    xl[1] = prop.dist - xl[1];
    prop.dh = terrain_irregularity(profile, xl[0], xl[1]);

    if prop.dl[0] + prop.dl[1] > 1.5 * prop.dist {
        // Both horizons beyond the path: treat as smooth-earth and
        // derive everything from a single full-window fit.
        let (za, zb) = least_squares(profile.step_m(), elev, xl[0], xl[1]);
        prop.he[0] = prop.hg[0] + fortran_dim(elev[0], za);
        prop.he[1] = prop.hg[1] + fortran_dim(elev[np], zb);
        for j in 0..2 {
            prop.dl[j] = (2.0 * prop.he[j] / prop.gme).sqrt()
                * (-0.07 * (prop.dh / prop.he[j].max(5.0)).sqrt()).exp();
        }
        let q = prop.dl[0] + prop.dl[1];
        if q <= prop.dist {
            let q = (prop.dist / q).powi(2);
            for j in 0..2 {
                prop.he[j] *= q;
                prop.dl[j] = (2.0 * prop.he[j] / prop.gme).sqrt()
                    * (-0.07 * (prop.dh / prop.he[j].max(5.0)).sqrt()).exp();
            }
        }
        for j in 0..2 {
            let q = (2.0 * prop.he[j] / prop.gme).sqrt();
            prop.the[j] = (0.65 * prop.dh * (q / prop.dl[j] - 1.0) - 2.0 * prop.he[j]) / q;
        }
    } else {
        let (za, _) = least_squares(profile.step_m(), elev, xl[0], 0.9 * prop.dl[0]);
        let (_, zb) = least_squares(
            profile.step_m(),
            elev,
            prop.dist - 0.9 * prop.dl[1],
            xl[1],
        );
        prop.he[0] = prop.hg[0] + fortran_dim(elev[0], za);
        prop.he[1] = prop.hg[1] + fortran_dim(elev[np], zb);
    }

    prop.mdp = -1;
    incidence_deg
}

/// Area-mode terminal geometry: estimates effective heights, horizon
/// distances, and horizon angles from the terrain irregularity and the
/// siting care taken at each terminal, with no profile available.
pub(crate) fn area_terminal_geometry(criteria: [SitingCriteria; 2], prop: &mut Prop) {
    for j in 0..2 {
        if criteria[j] == SitingCriteria::Random {
            prop.he[j] = prop.hg[j];
        } else {
            let mut q = if criteria[j] == SitingCriteria::Careful {
                4.0
            } else {
                9.0
            };
            if prop.hg[j] < 5.0 {
                q *= (0.3141593 * prop.hg[j]).sin();
            }
            prop.he[j] = prop.hg[j]
                + (1.0 + q) * (-(2.0 * prop.hg[j] / prop.dh.max(1e-3)).min(20.0)).exp();
        }
        let q = (2.0 * prop.he[j] / prop.gme).sqrt();
        prop.dl[j] = q * (-0.07 * (prop.dh / prop.he[j].max(5.0)).sqrt()).exp();
        prop.the[j] = (0.65 * prop.dh * (q / prop.dl[j] - 1.0) - 2.0 * prop.he[j]) / q;
    }
    prop.mdp = 1;
}
