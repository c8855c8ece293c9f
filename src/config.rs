//! Construction defaults for positioners.

use crate::arm::stadium_contour;
use crate::calibration::Calibration;
use crate::contour::Contour;
use crate::error::{PositionerError, PositionerResult};
use crate::spm::{KnowledgeDegree, Purpose, SpmComponents};
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};

/// Angular configuration of one rotor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RotorConfig {
    pub calibration: Calibration,
    pub theta_min: f64,
    pub theta_max: f64,
    /// Initial angle (rad).
    pub theta: f64,
    /// Whether the rotor starts snapped to its step grid.
    pub quantify: bool,
}

/// Template geometry of the arm, in its local frame (mm, rad).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArmConfig {
    pub l12: f64,
    pub l13: f64,
    /// Angular offset of `P3` from the `P1→P2` axis.
    pub theta_o3: f64,
    /// Radius of the fiber lens.
    pub r3: f64,
    /// Explicit contour; when absent a rounded bar of half-width `r3`
    /// reaching `P3` is used.
    #[serde(default)]
    pub contour: Option<Contour>,
}

/// Error sources feeding the SPM components.
///
/// Two default sets circulate for `eo` (`1e-3` and `1e-6` rad); the coarser
/// one is the default here and the finer one is [`ToleranceConfig::fine`].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToleranceConfig {
    /// Orientation error of the positioner base (rad).
    pub eo: f64,
    /// Position error of the positioner base (mm).
    pub ep: f64,
    /// Time to stop a positioner after an emergency command (s).
    pub tstop: f64,
    /// Maximum start-time shift between positioners (s).
    pub tshiff: f64,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            eo: 0.001,
            ep: 0.01,
            tstop: 0.005,
            tshiff: 0.001,
        }
    }
}

impl ToleranceConfig {
    pub fn fine() -> Self {
        Self {
            eo: 0.000001,
            ..Self::default()
        }
    }
}

/// Everything needed to build an actuator and its positioner wrapper.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionerConfig {
    /// Cylinder length `P0→P1` (mm).
    pub l01: f64,
    pub arm: ArmConfig,
    pub rotor_1: RotorConfig,
    pub rotor_2: RotorConfig,
    pub spm: SpmComponents,
    pub knowledge: KnowledgeDegree,
    pub purpose: Purpose,
    pub tolerances: ToleranceConfig,
}

impl Default for PositionerConfig {
    fn default() -> Self {
        Self {
            l01: 5.8025,
            arm: ArmConfig {
                l12: 5.8025,
                l13: 5.8025,
                theta_o3: 0.0,
                r3: 0.75,
                contour: None,
            },
            rotor_1: RotorConfig {
                calibration: Calibration::default(),
                theta_min: 0.0,
                theta_max: TAU,
                theta: 0.0,
                quantify: true,
            },
            rotor_2: RotorConfig {
                calibration: Calibration::default(),
                theta_min: 0.0,
                theta_max: PI,
                theta: 0.0,
                quantify: true,
            },
            spm: SpmComponents::default(),
            knowledge: KnowledgeDegree::default(),
            purpose: Purpose::default(),
            tolerances: ToleranceConfig::default(),
        }
    }
}

impl PositionerConfig {
    /// Parses a configuration from JSON.
    ///
    /// Missing top-level sections and tolerance entries take their defaults;
    /// a section that is present (`arm`, `rotor_1`, `rotor_2`) must be complete.
    /// Calibrations and contours are validated while decoding.
    pub fn from_json(json: &str) -> PositionerResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| PositionerError::invalid_argument(format!("bad positioner config: {e}")))
    }

    pub fn to_json(&self) -> PositionerResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| PositionerError::invalid_argument(format!("cannot encode config: {e}")))
    }

    /// The arm contour template this configuration resolves to.
    pub fn arm_contour(&self) -> PositionerResult<Contour> {
        match &self.arm.contour {
            Some(contour) => Ok(contour.clone()),
            None => stadium_contour(self.arm.l13, self.arm.r3, self.arm.theta_o3),
        }
    }
}
