//! # fiber-positioner
//!
//! Geometry, kinematics and collision detection for the two-rotor robotic
//! fiber positioners that populate a spectrograph focal plane.
//!
//! Each positioner is a rotating cylinder carrying an arm; the fiber sits at
//! the arm tip `P3`. The crate models the rotors with their step calibration
//! and quantization, inflates every body by a security perimeter margin (SPM)
//! chosen from how well its position is known and what the result is used
//! for, computes the safe area in which an arm can never touch a neighbour,
//! and drives an external motion generator through a small instruction set.
//!
//! Positions are in millimetres in the focal-plane frame, angles in radians.

pub mod actuator;
pub mod area;
pub mod arm;
pub mod barrier;
pub mod calibration;
pub mod config;
pub mod contour;
pub mod cylinder;
pub mod error;
pub mod fleet;
pub mod instruction;
pub mod motion;
pub mod positioner;
pub mod rotor;
pub mod spm;

pub use actuator::*;
pub use area::*;
pub use arm::*;
pub use barrier::*;
pub use calibration::*;
pub use config::*;
pub use contour::*;
pub use cylinder::*;
pub use error::*;
pub use fleet::*;
pub use instruction::*;
pub use motion::*;
pub use positioner::*;
pub use rotor::*;
pub use spm::*;
