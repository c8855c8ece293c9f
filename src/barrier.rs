//! Fixed obstacle standing in for a positioner whose rotor angles are unknown.

use crate::contour::Contour;
use crate::error::{PositionerResult, ensure_non_negative};
use glam::DVec2;
use serde::{Deserialize, Serialize};

/// A contour fixed to the positioner base.
///
/// The template lives in a local frame centred on `P0`; the image is the
/// template rotated by the base orientation and translated to `P0`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Barrier {
    template: Contour,
    p0: DVec2,
    theta_o1: f64,
    spm: f64,
    r_max: f64,
    contour: Contour,
}

impl Barrier {
    pub fn new(template: Contour, p0: DVec2, theta_o1: f64) -> Self {
        let r_max = template.farthest_distance_from(DVec2::ZERO);
        let contour = template.transformed(theta_o1, p0);
        Self {
            template,
            p0,
            theta_o1,
            spm: 0.0,
            r_max,
            contour,
        }
    }

    /// Circular barrier enclosing everything within `radius` of the base.
    pub fn disc(radius: f64, p0: DVec2, theta_o1: f64) -> PositionerResult<Self> {
        Ok(Self::new(Contour::circle(DVec2::ZERO, radius)?, p0, theta_o1))
    }

    pub fn set_template(&mut self, template: Contour) {
        self.r_max = template.farthest_distance_from(DVec2::ZERO);
        self.contour = template.transformed(self.theta_o1, self.p0);
        self.template = template;
    }

    pub fn set_origin(&mut self, p0: DVec2, theta_o1: f64) {
        self.p0 = p0;
        self.theta_o1 = theta_o1;
        self.contour = self.template.transformed(theta_o1, p0);
    }

    pub fn set_spm(&mut self, spm: f64) -> PositionerResult<()> {
        ensure_non_negative("barrier SPM", spm)?;
        self.spm = spm;
        Ok(())
    }

    pub fn spm(&self) -> f64 {
        self.spm
    }

    pub fn contour(&self) -> &Contour {
        &self.contour
    }

    pub fn template(&self) -> &Contour {
        &self.template
    }

    pub fn p0(&self) -> DVec2 {
        self.p0
    }

    /// Largest distance from `P0` to the barrier contour.
    pub fn r_max(&self) -> f64 {
        self.r_max
    }
}
