//! Rotor-1 geometry: the cylinder rotating about the fixed base point `P0`.
//!
//! The cylinder frame `S1` is flipped with respect to the focal plane, so the
//! absolute direction of `P0→P1` is `theta1 = thetaO1 − theta_1`.

use crate::arm::Arm;
use crate::barrier::Barrier;
use crate::config::PositionerConfig;
use crate::contour::Figure;
use crate::error::{PositionerError, PositionerResult, ensure_positive};
use crate::rotor::Rotor;
use glam::DVec2;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Cylinder {
    l01: f64,
    p0: DVec2,
    theta_o1: f64,
    rotor: Rotor,
    p1: DVec2,
    arm: Arm,
    barrier: Barrier,
}

impl Cylinder {
    pub fn new(config: &PositionerConfig, p0: DVec2, theta_o1: f64) -> PositionerResult<Self> {
        ensure_positive("L01", config.l01)?;
        let r1 = &config.rotor_1;
        let rotor = Rotor::new(
            r1.calibration.clone(),
            r1.theta_min,
            r1.theta_max,
            r1.theta,
            r1.quantify,
        )?;
        let theta1 = theta_o1 - rotor.theta();
        let p1 = p0 + config.l01 * DVec2::from_angle(theta1);
        let arm = Arm::new(config, p1, theta1)?;
        let barrier = Barrier::disc(config.l01 + arm.l1v(), p0, theta_o1)?;
        Ok(Self {
            l01: config.l01,
            p0,
            theta_o1,
            rotor,
            p1,
            arm,
            barrier,
        })
    }

    pub fn l01(&self) -> f64 {
        self.l01
    }

    pub fn p0(&self) -> DVec2 {
        self.p0
    }

    pub fn theta_o1(&self) -> f64 {
        self.theta_o1
    }

    /// Position of the rotor-2 axis.
    pub fn p1(&self) -> DVec2 {
        self.p1
    }

    pub fn rotor(&self) -> &Rotor {
        &self.rotor
    }

    pub fn theta_1(&self) -> f64 {
        self.rotor.theta()
    }

    /// Absolute direction of `P0→P1`.
    pub fn theta1(&self) -> f64 {
        self.theta_o1 - self.rotor.theta()
    }

    pub fn arm(&self) -> &Arm {
        &self.arm
    }

    pub(crate) fn arm_mut(&mut self) -> &mut Arm {
        &mut self.arm
    }

    pub fn barrier(&self) -> &Barrier {
        &self.barrier
    }

    pub(crate) fn barrier_mut(&mut self) -> &mut Barrier {
        &mut self.barrier
    }

    pub fn set_arm_template(
        &mut self,
        l12: f64,
        l13: f64,
        theta_o3: f64,
        r3: f64,
    ) -> PositionerResult<()> {
        self.arm.set_template(l12, l13, theta_o3, r3)?;
        self.assimilate()
    }

    pub fn set_arm_contour_template(&mut self, figures: Vec<Figure>) -> PositionerResult<()> {
        self.arm.set_contour_template(figures)?;
        self.assimilate()
    }

    pub fn set_l01(&mut self, l01: f64) -> PositionerResult<()> {
        ensure_positive("L01", l01)?;
        self.l01 = l01;
        self.assimilate()
    }

    pub fn set_origin(&mut self, p0: DVec2, theta_o1: f64) -> PositionerResult<()> {
        if !p0.is_finite() || !theta_o1.is_finite() {
            return Err(PositionerError::invalid_argument(
                "origin and orientation must be finite",
            ));
        }
        self.p0 = p0;
        self.theta_o1 = theta_o1;
        self.barrier.set_origin(p0, theta_o1);
        self.assimilate()
    }

    pub fn set_theta_1(&mut self, theta_1: f64) -> PositionerResult<()> {
        self.rotor.set_theta(theta_1)?;
        self.place_arm();
        Ok(())
    }

    pub fn set_step_1(&mut self, step: f64) -> PositionerResult<()> {
        self.rotor.set_step(step)?;
        self.place_arm();
        Ok(())
    }

    pub fn set_domain(&mut self, theta_1_min: f64, theta_1_max: f64) -> PositionerResult<()> {
        self.rotor.set_domain(theta_1_min, theta_1_max)?;
        self.place_arm();
        Ok(())
    }

    pub fn set_quantify(&mut self, quantify: bool) {
        self.rotor.set_quantify(quantify);
        self.place_arm();
    }

    pub fn push(&mut self) {
        self.rotor.push();
    }

    pub fn pop(&mut self) -> PositionerResult<()> {
        self.rotor.pop()?;
        self.place_arm();
        Ok(())
    }

    /// Refreshes the barrier radius after the arm template changed.
    pub(crate) fn assimilate(&mut self) -> PositionerResult<()> {
        let radius = self.l01 + self.arm.l1v();
        if (radius - self.barrier.r_max()).abs() > f64::EPSILON * radius {
            let spm = self.barrier.spm();
            let mut barrier = Barrier::disc(radius, self.p0, self.theta_o1)?;
            barrier.set_spm(spm)?;
            self.barrier = barrier;
        }
        self.place_arm();
        Ok(())
    }

    fn place_arm(&mut self) {
        let theta1 = self.theta1();
        self.p1 = self.p0 + self.l01 * DVec2::from_angle(theta1);
        self.arm.set_origin(self.p1, theta1);
    }
}
