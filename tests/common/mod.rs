// tests/common/mod.rs
#![allow(dead_code)]

use fiber_positioner::{Actuator, ComposedMotion, PositionerConfig, RoboticPositioner};
use glam::DVec2;
use std::cell::RefCell;
use std::rc::Rc;

/// Rotor speed of the test motion generator (steps/s).
pub const VMAX: f64 = 1000.0;

/// What the positioner last programmed, shared with the test body.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Program {
    pub mf1: Option<(f64, f64)>,
    pub mf2: Option<(f64, f64)>,
}

/// Constant-speed motion generator; each rotor travels straight from start to
/// final step at `VMAX` and then stays there.
#[derive(Debug)]
pub struct LinearMotion {
    program: Rc<RefCell<Program>>,
}

impl LinearMotion {
    pub fn new() -> (Self, Rc<RefCell<Program>>) {
        let program = Rc::new(RefCell::new(Program::default()));
        (
            Self {
                program: Rc::clone(&program),
            },
            program,
        )
    }
}

fn position_at(segment: Option<(f64, f64)>, t: f64) -> f64 {
    match segment {
        None => 0.0,
        Some((sta, fin)) => {
            let duration = (fin - sta).abs() / VMAX;
            if t >= duration {
                fin
            } else {
                sta + (fin - sta) * t.max(0.0) / duration
            }
        }
    }
}

impl ComposedMotion for LinearMotion {
    fn program_mf1(&mut self, p_sta: f64, p_fin: f64) {
        *self.program.borrow_mut() = Program {
            mf1: Some((p_sta, p_fin)),
            mf2: None,
        };
    }

    fn program_mf2(&mut self, p_sta: f64, p_fin: f64) {
        *self.program.borrow_mut() = Program {
            mf1: None,
            mf2: Some((p_sta, p_fin)),
        };
    }

    fn program_both(&mut self, p1_sta: f64, p2_sta: f64, p1_fin: f64, p2_fin: f64) {
        *self.program.borrow_mut() = Program {
            mf1: Some((p1_sta, p1_fin)),
            mf2: Some((p2_sta, p2_fin)),
        };
    }

    fn clear_program(&mut self) {
        *self.program.borrow_mut() = Program::default();
    }

    fn vmaxabs1(&self) -> f64 {
        VMAX
    }

    fn vmaxabs2(&self) -> f64 {
        VMAX
    }

    fn position_at1(&self, t: f64) -> f64 {
        position_at(self.program.borrow().mf1, t)
    }

    fn position_at2(&self, t: f64) -> f64 {
        position_at(self.program.borrow().mf2, t)
    }
}

pub fn actuator_at(id: i32, x: f64, y: f64) -> Actuator {
    Actuator::new(id, DVec2::new(x, y), 0.0).unwrap()
}

pub fn positioner_at(id: i32, x: f64, y: f64) -> (RoboticPositioner, Rc<RefCell<Program>>) {
    let (motion, program) = LinearMotion::new();
    let positioner = RoboticPositioner::with_config(
        id,
        DVec2::new(x, y),
        0.0,
        &PositionerConfig::default(),
        Box::new(motion),
    )
    .unwrap();
    (positioner, program)
}
