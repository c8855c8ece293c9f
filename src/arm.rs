//! Rotor-2 geometry: the arm carried by the cylinder, ending in the fiber lens.
//!
//! The arm is described by a template in its local frame `S2` (origin at the
//! rotor-2 axis `P1`, `P2` on the x axis) and by the current rotor angle. The
//! *image* (`P2`, `P3`, `V` and the contour in the focal-plane frame) is
//! recomputed after every change, so readers never see stale geometry.
//!
//! Angles:
//! - `theta_3` is the rotor-2 coordinate of `P3`; it is the stored state.
//! - `theta_2 = theta_3 + theta_o3` is the same rotation expressed for `P2`.
//! - `theta3 = theta1 + π − theta_3` is the absolute direction of `P1→P3`,
//!   with `theta1` the absolute direction of the cylinder `P0→P1`.
//!
//! `theta_3 = 0` folds the arm back over the cylinder; `theta_3 = π`
//! stretches it radially outward.

use crate::config::PositionerConfig;
use crate::contour::{CLOSURE_TOLERANCE, Contour, Figure};
use crate::error::{PositionerError, PositionerResult, ensure_non_negative, ensure_positive};
use crate::rotor::Rotor;
use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Arm {
    l12: f64,
    l13: f64,
    theta_o3: f64,
    r3: f64,
    contour_template: Contour,
    /// Whether the contour template is the stadium built from `l13`, `r3`, `theta_o3`.
    derived_contour: bool,

    // Derived from the template.
    l1v: f64,
    p2_local: DVec2,
    p3_local: DVec2,
    v_local: DVec2,

    rotor: Rotor,
    p1: DVec2,
    theta1: f64,
    spm: f64,

    // Image in the focal-plane frame.
    p2: DVec2,
    p3: DVec2,
    v: DVec2,
    contour: Contour,
}

impl Arm {
    pub fn new(config: &PositionerConfig, p1: DVec2, theta1: f64) -> PositionerResult<Self> {
        let arm = &config.arm;
        check_template(arm.l12, arm.l13, arm.theta_o3, arm.r3)?;
        let contour_template = config.arm_contour()?;
        let p3_local = arm.l13 * DVec2::from_angle(arm.theta_o3);
        let derived_contour = arm.contour.is_none();
        if !derived_contour {
            check_lens_fits(&contour_template, p3_local, arm.r3)?;
        }
        let r2 = &config.rotor_2;
        let rotor = Rotor::new(
            r2.calibration.clone(),
            r2.theta_min,
            r2.theta_max,
            r2.theta,
            r2.quantify,
        )?;
        let (v_local, l1v) = contour_template.farthest_point_from(DVec2::ZERO);
        let mut this = Self {
            l12: arm.l12,
            l13: arm.l13,
            theta_o3: arm.theta_o3,
            r3: arm.r3,
            contour: contour_template.clone(),
            contour_template,
            derived_contour,
            l1v,
            p2_local: DVec2::new(arm.l12, 0.0),
            p3_local,
            v_local,
            rotor,
            p1,
            theta1,
            spm: 0.0,
            p2: DVec2::ZERO,
            p3: DVec2::ZERO,
            v: DVec2::ZERO,
        };
        this.recompute_image();
        Ok(this)
    }

    // --- template ---

    pub fn l12(&self) -> f64 {
        self.l12
    }

    pub fn l13(&self) -> f64 {
        self.l13
    }

    pub fn theta_o3(&self) -> f64 {
        self.theta_o3
    }

    pub fn r3(&self) -> f64 {
        self.r3
    }

    /// Farthest distance from the rotor-2 axis to the contour; the arm's
    /// effective collision radius.
    pub fn l1v(&self) -> f64 {
        self.l1v
    }

    pub fn contour_template(&self) -> &Contour {
        &self.contour_template
    }

    /// Replaces the template points and lens radius.
    ///
    /// A stadium contour is rebuilt around the new lens. A custom contour is
    /// kept, and the lens disc must fit inside it.
    pub fn set_template(&mut self, l12: f64, l13: f64, theta_o3: f64, r3: f64) -> PositionerResult<()> {
        check_template(l12, l13, theta_o3, r3)?;
        let p3_local = l13 * DVec2::from_angle(theta_o3);
        let contour = if self.derived_contour {
            stadium_contour(l13, r3, theta_o3)?
        } else {
            check_lens_fits(&self.contour_template, p3_local, r3)?;
            self.contour_template.clone()
        };
        self.l12 = l12;
        self.l13 = l13;
        self.theta_o3 = theta_o3;
        self.r3 = r3;
        self.p2_local = DVec2::new(l12, 0.0);
        self.p3_local = p3_local;
        self.adopt_contour(contour);
        Ok(())
    }

    /// Replaces the contour template; the figures must form a closed contour
    /// enclosing the fiber lens.
    pub fn set_contour_template(&mut self, figures: Vec<Figure>) -> PositionerResult<()> {
        let contour = Contour::new(figures)?;
        check_lens_fits(&contour, self.p3_local, self.r3)?;
        self.derived_contour = false;
        self.adopt_contour(contour);
        Ok(())
    }

    fn adopt_contour(&mut self, contour: Contour) {
        let (v_local, l1v) = contour.farthest_point_from(DVec2::ZERO);
        self.contour_template = contour;
        self.v_local = v_local;
        self.l1v = l1v;
        self.recompute_image();
    }

    // --- rotor 2 ---

    pub fn rotor(&self) -> &Rotor {
        &self.rotor
    }

    pub fn theta_3(&self) -> f64 {
        self.rotor.theta()
    }

    pub fn theta_2(&self) -> f64 {
        self.rotor.theta() + self.theta_o3
    }

    /// Absolute direction of `P1→P2`.
    pub fn theta2(&self) -> f64 {
        self.theta1 + PI - self.theta_2()
    }

    /// Absolute direction of `P1→P3`.
    pub fn theta3(&self) -> f64 {
        self.theta1 + PI - self.theta_3()
    }

    /// `theta_2` at which the arm points radially outward.
    pub fn theta_2_rad(&self) -> f64 {
        PI + self.theta_o3
    }

    pub fn set_theta_3(&mut self, theta_3: f64) -> PositionerResult<()> {
        self.rotor.set_theta(theta_3)?;
        self.recompute_image();
        Ok(())
    }

    pub fn set_theta_2(&mut self, theta_2: f64) -> PositionerResult<()> {
        self.set_theta_3(theta_2 - self.theta_o3)
    }

    pub fn set_step_3(&mut self, step: f64) -> PositionerResult<()> {
        self.rotor.set_step(step)?;
        self.recompute_image();
        Ok(())
    }

    pub fn set_domain(&mut self, theta_3_min: f64, theta_3_max: f64) -> PositionerResult<()> {
        self.rotor.set_domain(theta_3_min, theta_3_max)?;
        self.recompute_image();
        Ok(())
    }

    pub fn set_quantify(&mut self, quantify: bool) {
        self.rotor.set_quantify(quantify);
        self.recompute_image();
    }

    pub fn push(&mut self) {
        self.rotor.push();
    }

    pub fn pop(&mut self) -> PositionerResult<()> {
        self.rotor.pop()?;
        self.recompute_image();
        Ok(())
    }

    // --- placement & image ---

    pub(crate) fn set_origin(&mut self, p1: DVec2, theta1: f64) {
        self.p1 = p1;
        self.theta1 = theta1;
        self.recompute_image();
    }

    /// Places `P2`, `P3`, `V` and the contour for the current angle and origin.
    pub fn recompute_image(&mut self) {
        let angle = self.theta2();
        let rot = DVec2::from_angle(angle);
        self.p2 = self.p1 + rot.rotate(self.p2_local);
        self.p3 = self.p1 + rot.rotate(self.p3_local);
        self.v = self.p1 + rot.rotate(self.v_local);
        self.contour = self.contour_template.transformed(angle, self.p1);
    }

    pub fn p1(&self) -> DVec2 {
        self.p1
    }

    pub fn p2(&self) -> DVec2 {
        self.p2
    }

    /// Centre of the fiber lens.
    pub fn p3(&self) -> DVec2 {
        self.p3
    }

    /// Contour point farthest from the rotor-2 axis.
    pub fn v(&self) -> DVec2 {
        self.v
    }

    pub fn contour(&self) -> &Contour {
        &self.contour
    }

    pub fn spm(&self) -> f64 {
        self.spm
    }

    pub fn set_spm(&mut self, spm: f64) -> PositionerResult<()> {
        ensure_non_negative("arm SPM", spm)?;
        self.spm = spm;
        Ok(())
    }

    /// Whether the two arms come closer than the sum of their margins.
    ///
    /// Arms whose axes are farther apart than both reaches plus both margins
    /// cannot touch, and skip the contour comparison.
    pub fn collides_with(&self, other: &Arm) -> bool {
        let reach = self.l1v + self.spm + other.l1v + other.spm;
        if self.p1.distance(other.p1) >= reach {
            return false;
        }
        let tolerance = self.spm + other.spm;
        self.contour.is_closer_than(&other.contour, tolerance)
            || other.contour.is_closer_than(&self.contour, tolerance)
    }
}

/// Rounded bar of half-width `r3` from the rotor-2 axis to `P3`.
pub(crate) fn stadium_contour(l13: f64, r3: f64, theta_o3: f64) -> PositionerResult<Contour> {
    Ok(Contour::stadium(l13, r3)?.transformed(theta_o3, DVec2::ZERO))
}

fn check_lens_fits(contour: &Contour, p3_local: DVec2, r3: f64) -> PositionerResult<()> {
    if !contour.contains(p3_local) || contour.distance_to_point(p3_local) < r3 - CLOSURE_TOLERANCE {
        return Err(PositionerError::invalid_argument(format!(
            "fiber lens of radius {r3} at {p3_local} does not fit inside the arm contour"
        )));
    }
    Ok(())
}

fn check_template(l12: f64, l13: f64, theta_o3: f64, r3: f64) -> PositionerResult<()> {
    ensure_positive("L12", l12)?;
    ensure_positive("L13", l13)?;
    ensure_positive("R3", r3)?;
    if !theta_o3.is_finite() {
        return Err(PositionerError::invalid_argument("theta_O3 must be finite"));
    }
    Ok(())
}
