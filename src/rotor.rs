//! Angular state shared by both rotors: domain, calibration, quantization and
//! the save/restore stack.

use crate::calibration::{Calibration, Quantizer};
use crate::error::{PositionerError, PositionerResult};
use serde::{Deserialize, Serialize};

/// A saved rotor position, restored by [`Rotor::pop`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RotorSnapshot {
    pub theta: f64,
    pub quantify: bool,
}

/// One rotor axis.
///
/// The angle is always inside `[theta_min, theta_max]`, and on the step grid
/// whenever quantization is enabled.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Rotor {
    calibration: Calibration,
    quantizer: Quantizer,
    theta_min: f64,
    theta_max: f64,
    theta: f64,
    quantify: bool,
    stack: Vec<RotorSnapshot>,
}

impl Rotor {
    /// Creates a rotor at `theta`, which must lie in the domain.
    pub fn new(
        calibration: Calibration,
        theta_min: f64,
        theta_max: f64,
        theta: f64,
        quantify: bool,
    ) -> PositionerResult<Self> {
        check_domain(&calibration, theta_min, theta_max)?;
        let quantizer = Quantizer::for_domain(&calibration, theta_min, theta_max)?;
        let mut rotor = Self {
            calibration,
            quantizer,
            theta_min,
            theta_max,
            theta: theta_min,
            quantify,
            stack: Vec::new(),
        };
        rotor.set_theta(theta)?;
        Ok(rotor)
    }

    pub fn theta(&self) -> f64 {
        self.theta
    }

    pub fn theta_min(&self) -> f64 {
        self.theta_min
    }

    pub fn theta_max(&self) -> f64 {
        self.theta_max
    }

    pub fn quantify(&self) -> bool {
        self.quantify
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn quantizer(&self) -> &Quantizer {
        &self.quantizer
    }

    /// Current position in steps, `F(theta)`.
    pub fn step(&self) -> f64 {
        self.calibration.angle_to_step(self.theta)
    }

    /// Step range of the domain, `[F(theta_min), F(theta_max)]`.
    pub fn step_domain(&self) -> (f64, f64) {
        (
            self.calibration.angle_to_step(self.theta_min),
            self.calibration.angle_to_step(self.theta_max),
        )
    }

    pub fn is_in_domain(&self, theta: f64) -> bool {
        self.theta_min <= theta && theta <= self.theta_max
    }

    /// Checks a step value by translating it through `G` first, so the
    /// boundary test is made once, in radians.
    pub fn is_in_domain_step(&self, step: f64) -> bool {
        step.is_finite() && self.is_in_domain(self.calibration.step_to_angle(step))
    }

    /// Nearest realizable angle to `theta`.
    pub fn quantize_angle(&self, theta: f64) -> f64 {
        let step = self.quantizer.quantize(self.calibration.angle_to_step(theta));
        self.calibration
            .step_to_angle(step)
            .clamp(self.theta_min, self.theta_max)
    }

    pub fn set_theta(&mut self, theta: f64) -> PositionerResult<()> {
        if !theta.is_finite() || !self.is_in_domain(theta) {
            return Err(PositionerError::invalid_argument(format!(
                "angle {theta} outside domain [{}, {}]",
                self.theta_min, self.theta_max
            )));
        }
        self.theta = if self.quantify {
            self.quantize_angle(theta)
        } else {
            theta
        };
        Ok(())
    }

    pub fn set_step(&mut self, step: f64) -> PositionerResult<()> {
        if !self.is_in_domain_step(step) {
            return Err(PositionerError::invalid_argument(format!(
                "step {step} outside step domain {:?}",
                self.step_domain()
            )));
        }
        self.set_theta(self.calibration.step_to_angle(step))
    }

    /// Enabling quantization snaps the current angle to the grid immediately.
    pub fn set_quantify(&mut self, quantify: bool) {
        self.quantify = quantify;
        if quantify {
            self.theta = self.quantize_angle(self.theta);
        }
    }

    /// Replaces the angular domain, re-derives the step range, then re-clamps
    /// the current angle into the new bounds.
    pub fn set_domain(&mut self, theta_min: f64, theta_max: f64) -> PositionerResult<()> {
        check_domain(&self.calibration, theta_min, theta_max)?;
        let quantizer = Quantizer::for_domain(&self.calibration, theta_min, theta_max)?;

        self.quantizer = quantizer;
        self.theta_min = theta_min;
        self.theta_max = theta_max;
        let clamped = self.theta.clamp(theta_min, theta_max);
        self.theta = if self.quantify {
            self.quantize_angle(clamped)
        } else {
            clamped
        };
        Ok(())
    }

    /// Swaps the calibration; the current domain must fit inside the new one.
    pub fn set_calibration(&mut self, calibration: Calibration) -> PositionerResult<()> {
        check_domain(&calibration, self.theta_min, self.theta_max)?;
        let quantizer = Quantizer::for_domain(&calibration, self.theta_min, self.theta_max)?;
        self.calibration = calibration;
        self.quantizer = quantizer;
        if self.quantify {
            self.theta = self.quantize_angle(self.theta);
        }
        Ok(())
    }

    /// Saves angle and quantification flag.
    pub fn push(&mut self) {
        self.stack.push(RotorSnapshot {
            theta: self.theta,
            quantify: self.quantify,
        });
    }

    /// Restores the most recently pushed angle and quantification flag.
    pub fn pop(&mut self) -> PositionerResult<()> {
        let snapshot = self
            .stack
            .pop()
            .ok_or_else(|| PositionerError::invalid_operation("rotor stack is empty"))?;
        // The domain may have shrunk since the push.
        let theta = snapshot.theta.clamp(self.theta_min, self.theta_max);
        self.quantify = snapshot.quantify;
        self.theta = if self.quantify && theta != snapshot.theta {
            self.quantize_angle(theta)
        } else {
            theta
        };
        Ok(())
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }
}

fn check_domain(calibration: &Calibration, theta_min: f64, theta_max: f64) -> PositionerResult<()> {
    if !theta_min.is_finite() || !theta_max.is_finite() || theta_min > theta_max {
        return Err(PositionerError::invalid_argument(format!(
            "invalid angular domain [{theta_min}, {theta_max}]"
        )));
    }
    let (f_min, f_max) = calibration.domain();
    if theta_min < f_min || theta_max > f_max {
        return Err(PositionerError::invalid_argument(format!(
            "angular domain [{theta_min}, {theta_max}] exceeds calibration domain [{f_min}, {f_max}]"
        )));
    }
    Ok(())
}
