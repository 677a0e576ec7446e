//! Quantile variability: converts the reference attenuation into a
//! confidence/reliability-dependent loss using climate-parameterised
//! statistics of time, location, and situation variability.

use crate::{Climate, Prop};

// Climate coefficient tables, one entry per climate region in
// declaration order (equatorial .. maritime temperate over sea).
const BV1: [f64; 7] = [-9.67, -0.62, 1.26, -9.21, -0.62, -0.39, 3.15];
const BV2: [f64; 7] = [12.7, 9.19, 15.5, 9.05, 9.19, 2.86, 857.9];
const XV1: [f64; 7] = [144.9e3, 228.9e3, 262.6e3, 84.1e3, 228.9e3, 141.7e3, 2222.0e3];
const XV2: [f64; 7] = [190.3e3, 205.2e3, 185.2e3, 101.1e3, 205.2e3, 315.9e3, 164.8e3];
const XV3: [f64; 7] = [133.8e3, 143.6e3, 99.8e3, 98.6e3, 143.6e3, 167.4e3, 116.3e3];
const BSM1: [f64; 7] = [2.13, 2.66, 6.11, 1.98, 2.68, 6.86, 8.51];
const BSM2: [f64; 7] = [159.5, 7.67, 6.65, 13.11, 7.16, 10.38, 169.8];
const XSM1: [f64; 7] = [762.2e3, 100.4e3, 138.2e3, 139.1e3, 93.7e3, 187.8e3, 609.8e3];
const XSM2: [f64; 7] = [123.6e3, 172.5e3, 242.2e3, 132.7e3, 186.8e3, 169.6e3, 119.9e3];
const XSM3: [f64; 7] = [94.5e3, 136.4e3, 178.6e3, 193.5e3, 133.5e3, 108.9e3, 106.6e3];
const BSP1: [f64; 7] = [2.11, 6.87, 10.08, 3.68, 4.75, 8.58, 8.43];
const BSP2: [f64; 7] = [102.3, 15.53, 9.60, 159.3, 8.12, 13.97, 8.19];
const XSP1: [f64; 7] = [636.9e3, 138.7e3, 165.3e3, 464.4e3, 93.2e3, 216.0e3, 136.2e3];
const XSP2: [f64; 7] = [134.8e3, 143.7e3, 225.7e3, 93.1e3, 135.9e3, 152.0e3, 188.5e3];
const XSP3: [f64; 7] = [95.6e3, 98.6e3, 129.7e3, 94.2e3, 113.4e3, 122.7e3, 122.9e3];
const BSD1: [f64; 7] = [1.224, 0.801, 1.380, 1.000, 1.224, 1.518, 1.518];
const BZD1: [f64; 7] = [1.282, 2.161, 1.282, 20.0, 1.282, 1.282, 1.282];
const BFM1: [f64; 7] = [1.0, 1.0, 1.0, 1.0, 0.92, 1.0, 1.0];
const BFM2: [f64; 7] = [0.0, 0.0, 0.0, 0.0, 0.25, 0.0, 0.0];
const BFM3: [f64; 7] = [0.0, 0.0, 0.0, 0.0, 1.77, 0.0, 0.0];
const BFP1: [f64; 7] = [1.0, 0.93, 1.0, 0.93, 0.93, 1.0, 1.0];
const BFP2: [f64; 7] = [0.0, 0.31, 0.0, 0.19, 0.31, 0.0, 0.0];
const BFP3: [f64; 7] = [0.0, 2.00, 0.0, 1.79, 2.00, 0.0, 0.0];

/// The climate curves' shared functional form over effective distance.
fn curve(c1: f64, c2: f64, x1: f64, x2: f64, x3: f64, de: f64) -> f64 {
    (c1 + c2 / (1.0 + ((de - x2) / x3).powi(2))) * (de / x1).powi(2)
        / (1.0 + (de / x1).powi(2))
}

/// Inverse of the standard normal complementary distribution, by the
/// Abramowitz & Stegun rational approximation. The median is pinned to
/// exactly zero; the approximation is otherwise off by a hair on
/// either side of it.
pub(crate) fn inverse_normal(q: f64) -> f64 {
    const C0: f64 = 2.515516698;
    const C1: f64 = 0.802853;
    const C2: f64 = 0.010328;
    const D1: f64 = 1.432788;
    const D2: f64 = 0.189269;
    const D3: f64 = 0.001308;

    if q == 0.5 {
        return 0.0;
    }
    let x = 0.5 - q;
    let mut t = (0.5 - x.abs()).max(0.000001);
    t = (-2.0 * t.ln()).sqrt();
    let v = t - ((C2 * t + C1) * t + C0) / (((D3 * t + D2) * t + D1) * t + 1.0);
    if x < 0.0 {
        -v
    } else {
        v
    }
}

/// Per-link variability state: climate curves evaluated at the
/// effective distance, fully computed at link setup.
#[derive(Debug)]
pub(crate) struct Variability {
    kdv: i32,
    zd: f64,
    vmd: f64,
    vs0: f64,
    sgl: f64,
    sgtm: f64,
    sgtp: f64,
    sgtd: f64,
    tgtd: f64,
    pub sgc: f64,
}

impl Variability {
    pub(crate) fn new(climate: Climate, mdvar: i32, prop: &mut Prop) -> Self {
        let k = climate.index();

        let mut kdv = mdvar;
        let ws = kdv >= 20;
        if ws {
            kdv -= 20;
        }
        let w1 = kdv >= 10;
        if w1 {
            kdv -= 10;
        }
        if !(0..=3).contains(&kdv) {
            kdv = 0;
            prop.kwx = prop.kwx.max(2);
        }

        let q = (0.133 * prop.wn).ln();
        let gm = BFM1[k] + BFM2[k] / ((BFM3[k] * q).powi(2) + 1.0);
        let gp = BFP1[k] + BFP2[k] / ((BFP3[k] * q).powi(2) + 1.0);

        let dexa = (18e6 * prop.he[0]).sqrt()
            + (18e6 * prop.he[1]).sqrt()
            + (575.7e12 / prop.wn).powf(1.0 / 3.0);
        let de = if prop.dist < dexa {
            130e3 * prop.dist / dexa
        } else {
            130e3 + prop.dist - dexa
        };

        let vmd = curve(BV1[k], BV2[k], XV1[k], XV2[k], XV3[k], de);
        let sgtm = curve(BSM1[k], BSM2[k], XSM1[k], XSM2[k], XSM3[k], de) * gm;
        let sgtp = curve(BSP1[k], BSP2[k], XSP1[k], XSP2[k], XSP3[k], de) * gp;
        let sgtd = sgtp * BSD1[k];
        let zd = BZD1[k];
        let tgtd = (sgtp - sgtd) * zd;

        let sgl = if w1 {
            0.0
        } else {
            let q = (1.0 - 0.8 * (-prop.dist / 50e3).exp()) * prop.dh * prop.wn;
            10.0 * q / (q + 13.0)
        };
        let vs0 = if ws {
            0.0
        } else {
            (5.0 + 3.0 * (-de / 100e3).exp()).powi(2)
        };

        Self {
            kdv,
            zd,
            vmd,
            vs0,
            sgl,
            sgtm,
            sgtp,
            sgtd,
            tgtd,
            sgc: 0.0,
        }
    }

    /// The quantile offset for standard-normal deviates of time,
    /// location, and confidence. Negative offsets are smoothed so the
    /// returned value approaches a floor instead of diverging.
    pub(crate) fn offset(&mut self, zzt: f64, zzl: f64, zzc: f64, prop: &mut Prop) -> f64 {
        const RT: f64 = 7.8;
        const RL: f64 = 24.0;

        let mut zt = zzt;
        let mut zl = zzl;
        let zc = zzc;
        match self.kdv {
            0 => {
                zt = zc;
                zl = zc;
            }
            1 => {
                zl = zc;
            }
            2 => {
                zl = zt;
            }
            _ => {}
        }
        if zt.abs() > 3.1 || zl.abs() > 3.1 || zc.abs() > 3.1 {
            prop.kwx = prop.kwx.max(1);
        }

        let sgt = if zt < 0.0 {
            self.sgtm
        } else if zt <= self.zd {
            self.sgtp
        } else {
            self.sgtd + self.tgtd / zt
        };
        let vs = self.vs0
            + (sgt * zt).powi(2) / (RT + zc * zc)
            + (self.sgl * zl).powi(2) / (RL + zc * zc);

        let yr;
        match self.kdv {
            0 => {
                yr = 0.0;
                self.sgc = (sgt * sgt + self.sgl * self.sgl + vs).sqrt();
            }
            1 => {
                yr = sgt * zt;
                self.sgc = (self.sgl * self.sgl + vs).sqrt();
            }
            2 => {
                yr = (sgt * sgt + self.sgl * self.sgl).sqrt() * zt;
                self.sgc = vs.sqrt();
            }
            _ => {
                yr = sgt * zt + self.sgl * zl;
                self.sgc = vs.sqrt();
            }
        }

        let mut avarv = prop.aref - self.vmd - yr - self.sgc * zc;
        if avarv < 0.0 {
            avarv = avarv * (29.0 - avarv) / (29.0 - 10.0 * avarv);
        }
        avarv
    }
}

#[cfg(test)]
mod tests {
    use super::inverse_normal;
    use approx::assert_abs_diff_eq;

    /// Complementary cumulative standard normal, by the Abramowitz &
    /// Stegun polynomial tail approximation.
    fn normal_upper_tail(z: f64) -> f64 {
        const B1: f64 = 0.319381530;
        const B2: f64 = -0.356563782;
        const B3: f64 = 1.781477937;
        const B4: f64 = -1.821255987;
        const B5: f64 = 1.330274429;
        const RP: f64 = 4.317008;
        const RRT2PI: f64 = 0.398942280;

        let t = z.abs();
        let q = if t >= 10.0 {
            0.0
        } else {
            let t = RP / (t + RP);
            (-0.5 * z * z).exp() * RRT2PI * ((((B5 * t + B4) * t + B3) * t + B2) * t + B1) * t
        };
        if z < 0.0 {
            1.0 - q
        } else {
            q
        }
    }

    #[test]
    fn test_median_is_exactly_zero() {
        assert_eq!(inverse_normal(0.5), 0.0);
    }

    #[test]
    fn test_antisymmetric_about_median() {
        for q in [0.01, 0.05, 0.1, 0.25, 0.4, 0.45] {
            assert_abs_diff_eq!(
                inverse_normal(q),
                -inverse_normal(1.0 - q),
                epsilon = 1e-6
            );
        }
    }

    #[test]
    fn test_round_trips_through_the_tail_probability() {
        for q in [0.01, 0.1, 0.5, 0.9, 0.99] {
            assert_abs_diff_eq!(normal_upper_tail(inverse_normal(q)), q, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_known_deviates() {
        assert_abs_diff_eq!(inverse_normal(0.01), 2.3263, epsilon = 5e-4);
        assert_abs_diff_eq!(inverse_normal(0.9), -1.2816, epsilon = 5e-4);
    }
}
