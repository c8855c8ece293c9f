//! Positioner instruction set.

use crate::error::{PositionerError, PositionerResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a positioner executes programmed gestures.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlMode {
    /// Waits for a fleet-wide start signal.
    #[default]
    Synchronous,
    /// Starts as soon as it is programmed.
    Asynchronous,
}

/// One instruction; the mnemonic is the wire name.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Instruction {
    /// `MS`: switch to synchronous control.
    SynchronousMode,
    /// `MA`: switch to asynchronous control.
    AsynchronousMode,
    /// `M1 p`: move rotor 1 to step `p`.
    MoveRotor1(f64),
    /// `M2 p`: move rotor 2 to step `p`.
    MoveRotor2(f64),
    /// `MM p1 p2`: move both rotors.
    MoveBoth(f64, f64),
    /// `SP`: clear the programmed gesture.
    Stop,
}

impl Instruction {
    /// Builds an instruction from its mnemonic and step arguments.
    pub fn parse(name: &str, args: &[f64]) -> PositionerResult<Self> {
        if name.is_empty() {
            return Err(PositionerError::invalid_argument("instruction name is empty"));
        }
        let expected = match name {
            "MS" | "MA" | "SP" => 0,
            "M1" | "M2" => 1,
            "MM" => 2,
            other => {
                return Err(PositionerError::ImpossibleState(format!(
                    "unknown instruction {other:?}"
                )));
            }
        };
        if args.len() != expected {
            return Err(PositionerError::invalid_argument(format!(
                "{name} takes {expected} argument(s), got {}",
                args.len()
            )));
        }
        if let Some(bad) = args.iter().find(|a| !a.is_finite()) {
            return Err(PositionerError::invalid_argument(format!(
                "{name} argument {bad} is not finite"
            )));
        }
        Ok(match name {
            "MS" => Self::SynchronousMode,
            "MA" => Self::AsynchronousMode,
            "SP" => Self::Stop,
            "M1" => Self::MoveRotor1(args[0]),
            "M2" => Self::MoveRotor2(args[0]),
            _ => Self::MoveBoth(args[0], args[1]),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::SynchronousMode => "MS",
            Self::AsynchronousMode => "MA",
            Self::MoveRotor1(_) => "M1",
            Self::MoveRotor2(_) => "M2",
            Self::MoveBoth(..) => "MM",
            Self::Stop => "SP",
        }
    }

    pub fn args(&self) -> Vec<f64> {
        match *self {
            Self::MoveRotor1(p) | Self::MoveRotor2(p) => vec![p],
            Self::MoveBoth(p1, p2) => vec![p1, p2],
            _ => Vec::new(),
        }
    }

    /// Whether executing the instruction programs rotor motion.
    pub fn is_motion(&self) -> bool {
        matches!(
            self,
            Self::MoveRotor1(_) | Self::MoveRotor2(_) | Self::MoveBoth(..)
        )
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())?;
        for arg in self.args() {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
