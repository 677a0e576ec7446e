use crate::TerrainError;

/// A linearly-spaced terrain transect between two radio terminals.
///
/// A profile with `N + 1` elevation samples spans `N` intervals of
/// `step_m` meters each. Elevations are meters above mean sea level.
/// Which end is the transmitter is a convention of the consuming model:
/// the Longley-Rice kernel treats the first sample as the transmitter
/// end, while the Extended-Hata kernel expects the mobile at the first
/// sample. [`Profile::reversed`] converts between the two.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    step_m: f64,
    elevations: Vec<f64>,
}

impl Profile {
    /// Builds a profile, rejecting shapes the kernels cannot evaluate.
    pub fn new(step_m: f64, elevations: Vec<f64>) -> Result<Self, TerrainError> {
        if elevations.len() < 2 {
            return Err(TerrainError::TooFewSamples(elevations.len()));
        }
        if !(step_m > 0.0) || !step_m.is_finite() {
            return Err(TerrainError::NonPositiveStep(step_m));
        }
        if let Some(i) = elevations.iter().position(|e| !e.is_finite()) {
            return Err(TerrainError::NonFiniteSample(i));
        }
        Ok(Self { step_m, elevations })
    }

    /// Distance between adjacent samples, in meters.
    pub fn step_m(&self) -> f64 {
        self.step_m
    }

    /// Elevation samples, in meters above mean sea level.
    pub fn elevations(&self) -> &[f64] {
        &self.elevations
    }

    /// Number of sample intervals (one less than the sample count).
    pub fn num_intervals(&self) -> usize {
        self.elevations.len() - 1
    }

    /// Total path length in meters, snapped to the nearest integer when
    /// the accumulated `N * step` lands within 1e-5 of one.
    ///
    /// Several piecewise formulas switch on exact 10/30/60 km
    /// thresholds; without the snap, floating-point drift in `N * step`
    /// flips branches between otherwise identical inputs.
    pub fn distance_m(&self) -> f64 {
        let distance_m = self.num_intervals() as f64 * self.step_m;
        if (distance_m - distance_m.round()).abs() < 1e-5 {
            distance_m.round()
        } else {
            distance_m
        }
    }

    /// The same transect walked from the other terminal.
    pub fn reversed(&self) -> Self {
        let mut elevations = self.elevations.clone();
        elevations.reverse();
        Self {
            step_m: self.step_m,
            elevations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Profile;

    #[test]
    fn test_rejects_bad_shapes() {
        assert!(Profile::new(10.0, vec![1.0]).is_err());
        assert!(Profile::new(0.0, vec![1.0, 2.0]).is_err());
        assert!(Profile::new(-5.0, vec![1.0, 2.0]).is_err());
        assert!(Profile::new(10.0, vec![1.0, f64::NAN]).is_err());
    }

    #[test]
    fn test_distance_snaps_to_integer() {
        // 156 intervals of 77800/156 m; the accumulated product drifts
        // below 77800 but the snap recovers the integer exactly.
        let step = 77800.0 / 156.0;
        let profile = Profile::new(step, vec![0.0; 157]).unwrap();
        assert_eq!(profile.distance_m(), 77800.0);
    }

    #[test]
    fn test_distance_left_alone_when_not_near_integer() {
        let profile = Profile::new(498.7, vec![0.0; 3]).unwrap();
        assert_eq!(profile.distance_m(), 2.0 * 498.7);
    }

    #[test]
    fn test_reversed() {
        let profile = Profile::new(30.0, vec![1.0, 2.0, 3.0]).unwrap();
        let reversed = profile.reversed();
        assert_eq!(reversed.elevations(), &[3.0, 2.0, 1.0]);
        assert_eq!(reversed.step_m(), 30.0);
        assert_eq!(reversed.reversed(), profile);
    }
}
