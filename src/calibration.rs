//! Angle/step calibration (F and its inverse G) and step quantization (Q).

use crate::error::{PositionerError, PositionerResult, ensure_positive};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Monotone mapping between a rotor angle (radians) and motor steps.
///
/// `F` ([`angle_to_step`](Self::angle_to_step)) is strictly increasing over
/// [`domain`](Self::domain); `G` ([`step_to_angle`](Self::step_to_angle)) is its inverse.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCalibration")]
pub enum Calibration {
    /// Constant gear ratio: `F(θ) = steps_per_rev · (θ − origin) / 2π`.
    ///
    /// The domain is one revolution starting at `origin`.
    Linear { steps_per_rev: f64, origin: f64 },

    /// Measured `(angle, step)` samples, linearly interpolated.
    ///
    /// Both coordinates must be strictly increasing. Outside the sampled range
    /// the end segments are extrapolated.
    Tabulated { points: Vec<(f64, f64)> },
}

/// Unchecked wire form; decoding goes through the validating constructors.
#[derive(Deserialize)]
enum RawCalibration {
    Linear { steps_per_rev: f64, origin: f64 },
    Tabulated { points: Vec<(f64, f64)> },
}

impl TryFrom<RawCalibration> for Calibration {
    type Error = PositionerError;

    fn try_from(raw: RawCalibration) -> PositionerResult<Self> {
        match raw {
            RawCalibration::Linear {
                steps_per_rev,
                origin,
            } => Self::linear(steps_per_rev, origin),
            RawCalibration::Tabulated { points } => Self::tabulated(points),
        }
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::Linear {
            steps_per_rev: 160_000.0,
            origin: 0.0,
        }
    }
}

impl Calibration {
    /// Builds a linear calibration, rejecting non-positive step counts.
    pub fn linear(steps_per_rev: f64, origin: f64) -> PositionerResult<Self> {
        ensure_positive("steps_per_rev", steps_per_rev)?;
        if !origin.is_finite() {
            return Err(PositionerError::invalid_argument(
                "calibration origin must be finite",
            ));
        }
        Ok(Self::Linear {
            steps_per_rev,
            origin,
        })
    }

    /// Builds a tabulated calibration from at least two strictly increasing samples.
    pub fn tabulated(points: Vec<(f64, f64)>) -> PositionerResult<Self> {
        if points.len() < 2 {
            return Err(PositionerError::invalid_argument(
                "a tabulated calibration needs at least two points",
            ));
        }
        if points
            .iter()
            .any(|(a, s)| !a.is_finite() || !s.is_finite())
        {
            return Err(PositionerError::invalid_argument(
                "calibration points must be finite",
            ));
        }
        if points
            .windows(2)
            .any(|w| w[1].0 <= w[0].0 || w[1].1 <= w[0].1)
        {
            return Err(PositionerError::invalid_argument(
                "calibration points must be strictly increasing in angle and step",
            ));
        }
        Ok(Self::Tabulated { points })
    }

    /// Closed angular interval on which `F` is defined.
    pub fn domain(&self) -> (f64, f64) {
        match self {
            Self::Linear { origin, .. } => (*origin, origin + TAU),
            Self::Tabulated { points } => (points[0].0, points[points.len() - 1].0),
        }
    }

    /// `F`: angle (rad) to continuous step value.
    pub fn angle_to_step(&self, angle: f64) -> f64 {
        match self {
            Self::Linear {
                steps_per_rev,
                origin,
            } => steps_per_rev * ((angle - origin) / TAU),
            Self::Tabulated { points } => interpolate(points, angle, |p| p.0, |p| p.1),
        }
    }

    /// `G`: continuous step value to angle (rad).
    pub fn step_to_angle(&self, step: f64) -> f64 {
        match self {
            Self::Linear {
                steps_per_rev,
                origin,
            } => origin + TAU * (step / steps_per_rev),
            Self::Tabulated { points } => interpolate(points, step, |p| p.1, |p| p.0),
        }
    }

    /// Smallest `dF/dθ` over the domain, in steps per radian.
    ///
    /// Dividing a step rate by this gives an upper bound on angular speed.
    pub fn min_slope(&self) -> f64 {
        match self {
            Self::Linear { steps_per_rev, .. } => steps_per_rev / TAU,
            Self::Tabulated { points } => points
                .windows(2)
                .map(|w| (w[1].1 - w[0].1) / (w[1].0 - w[0].0))
                .fold(f64::INFINITY, f64::min),
        }
    }

    /// Angle spanned by one step at the coarsest point of the calibration.
    pub fn step_angle(&self) -> f64 {
        1.0 / self.min_slope()
    }
}

fn interpolate(
    points: &[(f64, f64)],
    x: f64,
    key: impl Fn(&(f64, f64)) -> f64,
    value: impl Fn(&(f64, f64)) -> f64,
) -> f64 {
    // Index of the segment containing x, clamped to the end segments.
    let upper = points
        .iter()
        .position(|p| key(p) >= x)
        .unwrap_or(points.len() - 1)
        .clamp(1, points.len() - 1);
    let (a, b) = (&points[upper - 1], &points[upper]);
    let t = (x - key(a)) / (key(b) - key(a));
    value(a) + t * (value(b) - value(a))
}

/// Snaps continuous step values to the nearest integer step of a closed range.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Quantizer {
    q_min: f64,
    q_max: f64,
}

impl Quantizer {
    /// Derives the integer range `[ceil(F(min)), floor(F(max))]` for an angular domain.
    pub fn for_domain(
        calibration: &Calibration,
        theta_min: f64,
        theta_max: f64,
    ) -> PositionerResult<Self> {
        let q_min = calibration.angle_to_step(theta_min).ceil();
        let q_max = calibration.angle_to_step(theta_max).floor();
        if q_min > q_max {
            return Err(PositionerError::invalid_argument(format!(
                "angular domain [{theta_min}, {theta_max}] contains no integer step"
            )));
        }
        Ok(Self { q_min, q_max })
    }

    /// `Q`: nearest valid integer step.
    pub fn quantize(&self, step: f64) -> f64 {
        step.round().clamp(self.q_min, self.q_max)
    }

    /// Largest valid integer step not above `step`.
    pub fn quantize_down(&self, step: f64) -> f64 {
        step.floor().clamp(self.q_min, self.q_max)
    }

    pub fn q_min(&self) -> f64 {
        self.q_min
    }

    pub fn q_max(&self) -> f64 {
        self.q_max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tabulated_rejects_non_monotone() {
        let err = Calibration::tabulated(vec![(0.0, 0.0), (1.0, 10.0), (0.5, 20.0)]);
        assert!(matches!(err, Err(PositionerError::InvalidArgument(_))));
    }

    #[test]
    fn test_tabulated_inverse() {
        let cal = Calibration::tabulated(vec![(0.0, 0.0), (1.0, 100.0), (2.0, 300.0)]).unwrap();
        assert_eq!(cal.angle_to_step(1.5), 200.0);
        assert_eq!(cal.step_to_angle(200.0), 1.5);
        assert_eq!(cal.min_slope(), 100.0);
        assert_eq!(cal.domain(), (0.0, 2.0));
    }

    #[test]
    fn test_decoding_validates_points() {
        let empty = serde_json::from_str::<Calibration>(r#"{"Tabulated":{"points":[]}}"#);
        assert!(empty.is_err());
        let single = serde_json::from_str::<Calibration>(r#"{"Tabulated":{"points":[[0.0,0.0]]}}"#);
        assert!(single.is_err());
        let linear = serde_json::from_str::<Calibration>(
            r#"{"Linear":{"steps_per_rev":-1.0,"origin":0.0}}"#,
        );
        assert!(linear.is_err());

        let cal = Calibration::tabulated(vec![(0.0, 0.0), (1.0, 100.0)]).unwrap();
        let json = serde_json::to_string(&cal).unwrap();
        assert_eq!(serde_json::from_str::<Calibration>(&json).unwrap(), cal);
    }

    #[test]
    fn test_quantizer_range_and_clamp() {
        let cal = Calibration::linear(360.0, 0.0).unwrap();
        let q = Quantizer::for_domain(&cal, 0.01, 1.0).unwrap();
        assert_eq!(q.q_min(), 1.0);
        assert_eq!(q.q_max(), (1.0 * 360.0 / TAU).floor());
        assert_eq!(q.quantize(-5.0), 1.0);
        assert_eq!(q.quantize(10.4), 10.0);
    }

    #[test]
    fn test_quantizer_empty_range() {
        let cal = Calibration::linear(360.0, 0.0).unwrap();
        assert!(Quantizer::for_domain(&cal, 0.001, 0.002).is_err());
    }
}
