//! The actuator: cylinder, arm and barrier composed into one positioner body,
//! with its security margins, safety bounds and collision queries.

use crate::area::{AreaStatistics, MAX_ADJACENTS};
use crate::arm::Arm;
use crate::barrier::Barrier;
use crate::config::PositionerConfig;
use crate::contour::{Contour, Figure};
use crate::cylinder::Cylinder;
use crate::error::{PositionerError, PositionerResult};
use crate::spm::{KnowledgeDegree, Purpose, SpmComponents, SpmTarget, SpmValues, select_spm};
use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use tracing::{debug, warn};

/// Convergence tolerance of the safe-radius search (mm).
pub const SAFE_SEARCH_TOLERANCE: f64 = 1e-8;

/// Bits in an `f64` significand, counting the sign.
pub const MANTISSA_BITS: u32 = f64::MANTISSA_DIGITS + 1;

/// Iteration cap of the safe-radius search. Past this point the bracket is
/// narrower than the angle resolution of an `f64`.
pub const SAFE_SEARCH_MAX_ITERATIONS: u32 = MANTISSA_BITS + 4;

/// Slack accepted when testing whether a point lies on the reach annulus (mm).
const REACH_EPSILON: f64 = 1e-9;

/// Safe-area bounds derived from the neighbourhood.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SafetyBounds {
    /// Farthest contour distance from `P0` with both rotors at origin.
    pub r_min: f64,
    /// Radius the arm may sweep without reaching any neighbour's domain.
    /// Negative when neighbours are packed tighter than the retracted arm.
    pub r_saf: f64,
    /// Distance `P0→P2` at the safe arm angle.
    pub r_2_saf: f64,
    pub theta_2_saf: f64,
    pub theta_3_saf: f64,
    /// `theta_2` at which the arm is radial.
    pub theta_2_rad: f64,
    /// Bisection steps spent finding `theta_3_saf`.
    pub iterations: u32,
}

impl SafetyBounds {
    fn unconstrained(r_max: f64, theta_2_rad: f64) -> Self {
        Self {
            r_min: r_max,
            r_saf: r_max,
            r_2_saf: r_max,
            theta_2_saf: PI,
            theta_3_saf: PI,
            theta_2_rad,
            iterations: 0,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Actuator {
    id: i32,
    cylinder: Cylinder,

    spm_components: SpmComponents,
    spm_values: SpmValues,
    knowledge: KnowledgeDegree,
    purpose: Purpose,
    spm: f64,

    adjacents: Vec<usize>,
    safety: SafetyBounds,
    area: AreaStatistics,

    pending: bool,
    collision: bool,
}

impl Actuator {
    /// Builds an actuator with the default configuration.
    pub fn new(id: i32, p0: DVec2, theta_o1: f64) -> PositionerResult<Self> {
        Self::with_config(id, p0, theta_o1, &PositionerConfig::default())
    }

    pub fn with_config(
        id: i32,
        p0: DVec2,
        theta_o1: f64,
        config: &PositionerConfig,
    ) -> PositionerResult<Self> {
        if !p0.is_finite() || !theta_o1.is_finite() {
            return Err(PositionerError::invalid_argument(
                "origin and orientation must be finite",
            ));
        }
        config.spm.validate()?;
        let cylinder = Cylinder::new(config, p0, theta_o1)?;
        let r_max = cylinder.l01() + cylinder.arm().l1v();
        let safety = SafetyBounds::unconstrained(r_max, cylinder.arm().theta_2_rad());
        let mut actuator = Self {
            id,
            cylinder,
            spm_components: config.spm,
            spm_values: config.spm.derive(),
            knowledge: config.knowledge,
            purpose: config.purpose,
            spm: 0.0,
            adjacents: Vec::new(),
            safety,
            area: AreaStatistics::default(),
            pending: true,
            collision: false,
        };
        actuator.assign_spm()?;
        actuator.refresh_area();
        Ok(actuator)
    }

    // --- identity & geometry ---

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn set_id(&mut self, id: i32) {
        self.id = id;
    }

    pub fn cylinder(&self) -> &Cylinder {
        &self.cylinder
    }

    pub fn arm(&self) -> &Arm {
        self.cylinder.arm()
    }

    pub fn barrier(&self) -> &Barrier {
        self.cylinder.barrier()
    }

    pub fn p0(&self) -> DVec2 {
        self.cylinder.p0()
    }

    pub fn p1(&self) -> DVec2 {
        self.cylinder.p1()
    }

    pub fn p2(&self) -> DVec2 {
        self.arm().p2()
    }

    pub fn p3(&self) -> DVec2 {
        self.arm().p3()
    }

    pub fn theta_1(&self) -> f64 {
        self.cylinder.theta_1()
    }

    pub fn theta_2(&self) -> f64 {
        self.arm().theta_2()
    }

    pub fn theta_3(&self) -> f64 {
        self.arm().theta_3()
    }

    /// Farthest any point of the arm contour can get from `P0`.
    pub fn r_max(&self) -> f64 {
        self.cylinder.l01() + self.arm().l1v()
    }

    /// Nominal reach of the fiber point `P3`.
    pub fn r_3_max_nom(&self) -> f64 {
        self.cylinder.l01() + self.arm().l13()
    }

    pub fn set_origin(&mut self, p0: DVec2, theta_o1: f64) -> PositionerResult<()> {
        self.cylinder.set_origin(p0, theta_o1)?;
        self.pending = true;
        Ok(())
    }

    pub fn set_l01(&mut self, l01: f64) -> PositionerResult<()> {
        self.cylinder.set_l01(l01)?;
        self.after_geometry_change();
        Ok(())
    }

    pub fn set_arm_template(
        &mut self,
        l12: f64,
        l13: f64,
        theta_o3: f64,
        r3: f64,
    ) -> PositionerResult<()> {
        self.cylinder.set_arm_template(l12, l13, theta_o3, r3)?;
        self.after_geometry_change();
        Ok(())
    }

    pub fn set_arm_contour_template(&mut self, figures: Vec<Figure>) -> PositionerResult<()> {
        self.cylinder.set_arm_contour_template(figures)?;
        self.after_geometry_change();
        Ok(())
    }

    fn after_geometry_change(&mut self) {
        self.safety.theta_2_rad = self.arm().theta_2_rad();
        self.refresh_area();
        self.pending = true;
    }

    // --- rotors ---

    pub fn set_theta_1(&mut self, theta_1: f64) -> PositionerResult<()> {
        self.cylinder.set_theta_1(theta_1)?;
        self.pending = true;
        Ok(())
    }

    pub fn set_theta_3(&mut self, theta_3: f64) -> PositionerResult<()> {
        self.cylinder.arm_mut().set_theta_3(theta_3)?;
        self.pending = true;
        Ok(())
    }

    pub fn set_theta_2(&mut self, theta_2: f64) -> PositionerResult<()> {
        self.cylinder.arm_mut().set_theta_2(theta_2)?;
        self.pending = true;
        Ok(())
    }

    /// Moves both rotors; neither moves unless both angles are valid.
    pub fn set_angles(&mut self, theta_1: f64, theta_3: f64) -> PositionerResult<()> {
        let (r1, r2) = (self.cylinder.rotor(), self.arm().rotor());
        if !r1.is_in_domain(theta_1) || !r2.is_in_domain(theta_3) {
            return Err(PositionerError::invalid_argument(format!(
                "angles ({theta_1}, {theta_3}) outside rotor domains"
            )));
        }
        self.set_theta_1(theta_1)?;
        self.set_theta_3(theta_3)
    }

    pub fn set_step_1(&mut self, step: f64) -> PositionerResult<()> {
        self.cylinder.set_step_1(step)?;
        self.pending = true;
        Ok(())
    }

    pub fn set_step_3(&mut self, step: f64) -> PositionerResult<()> {
        self.cylinder.arm_mut().set_step_3(step)?;
        self.pending = true;
        Ok(())
    }

    pub fn set_domain_1(&mut self, theta_1_min: f64, theta_1_max: f64) -> PositionerResult<()> {
        self.cylinder.set_domain(theta_1_min, theta_1_max)?;
        self.pending = true;
        Ok(())
    }

    pub fn set_domain_3(&mut self, theta_3_min: f64, theta_3_max: f64) -> PositionerResult<()> {
        self.cylinder.arm_mut().set_domain(theta_3_min, theta_3_max)?;
        self.pending = true;
        Ok(())
    }

    pub fn set_quantify_1(&mut self, quantify: bool) {
        self.cylinder.set_quantify(quantify);
        self.pending = true;
    }

    pub fn set_quantify_3(&mut self, quantify: bool) {
        self.cylinder.arm_mut().set_quantify(quantify);
        self.pending = true;
    }

    pub fn quantify_1(&self) -> bool {
        self.cylinder.rotor().quantify()
    }

    pub fn quantify_3(&self) -> bool {
        self.arm().rotor().quantify()
    }

    pub fn push_theta_1(&mut self) {
        self.cylinder.push();
    }

    pub fn pop_theta_1(&mut self) -> PositionerResult<()> {
        self.cylinder.pop()
    }

    pub fn push_theta_3(&mut self) {
        self.cylinder.arm_mut().push();
    }

    pub fn pop_theta_3(&mut self) -> PositionerResult<()> {
        self.cylinder.arm_mut().pop()
    }

    /// Angle of each rotor closest to its zero position.
    pub fn origin_angles(&self) -> (f64, f64) {
        let (r1, r2) = (self.cylinder.rotor(), self.arm().rotor());
        (
            0.0_f64.clamp(r1.theta_min(), r1.theta_max()),
            0.0_f64.clamp(r2.theta_min(), r2.theta_max()),
        )
    }

    /// Moves both rotors to their origin.
    pub fn retract(&mut self) -> PositionerResult<()> {
        let (theta_1, theta_3) = self.origin_angles();
        self.set_angles(theta_1, theta_3)
    }

    // --- inverse kinematics ---

    /// Rotor angles placing the fiber at `p3`.
    ///
    /// Fails with `InvalidArgument` when `p3` is outside the reach annulus or
    /// the required angles fall outside the rotor domains.
    pub fn angles_for_p3(&self, p3: DVec2) -> PositionerResult<(f64, f64)> {
        if !p3.is_finite() {
            return Err(PositionerError::invalid_argument("target point must be finite"));
        }
        let l01 = self.cylinder.l01();
        let l13 = self.arm().l13();
        let rel = p3 - self.p0();
        let d = rel.length();
        if d > l01 + l13 + REACH_EPSILON || d < (l01 - l13).abs() - REACH_EPSILON {
            return Err(PositionerError::invalid_argument(format!(
                "point ({}, {}) is out of reach",
                p3.x, p3.y
            )));
        }

        let cos_3 = (l01 * l01 + l13 * l13 - d * d) / (2.0 * l01 * l13);
        let theta_3 = cos_3.clamp(-1.0, 1.0).acos();
        let theta1 = if d == 0.0 {
            self.cylinder.theta1()
        } else {
            let cos_b = (l01 * l01 + d * d - l13 * l13) / (2.0 * l01 * d);
            rel.y.atan2(rel.x) - cos_b.clamp(-1.0, 1.0).acos()
        };

        let r1 = self.cylinder.rotor();
        let raw = self.cylinder.theta_o1() - theta1;
        let theta_1 = raw - TAU * ((raw - r1.theta_min()) / TAU).floor();
        if !r1.is_in_domain(theta_1) || !self.arm().rotor().is_in_domain(theta_3) {
            return Err(PositionerError::invalid_argument(format!(
                "point ({}, {}) needs angles ({theta_1}, {theta_3}) outside rotor domains",
                p3.x, p3.y
            )));
        }
        Ok((theta_1, theta_3))
    }

    pub fn is_reachable(&self, p3: DVec2) -> bool {
        self.angles_for_p3(p3).is_ok()
    }

    /// Moves the rotors to bring the fiber to `p3` (up to quantization).
    pub fn set_p3(&mut self, p3: DVec2) -> PositionerResult<()> {
        let (theta_1, theta_3) = self.angles_for_p3(p3)?;
        self.set_angles(theta_1, theta_3)
    }

    // --- margins ---

    pub fn spm_components(&self) -> &SpmComponents {
        &self.spm_components
    }

    pub fn spm_values(&self) -> &SpmValues {
        &self.spm_values
    }

    /// Live margin currently applied to the arm or the barrier.
    pub fn spm(&self) -> f64 {
        self.spm
    }

    pub fn knowledge(&self) -> KnowledgeDegree {
        self.knowledge
    }

    pub fn purpose(&self) -> Purpose {
        self.purpose
    }

    pub fn set_knowledge(&mut self, knowledge: KnowledgeDegree) -> PositionerResult<()> {
        self.knowledge = knowledge;
        self.assign_spm()
    }

    pub fn set_purpose(&mut self, purpose: Purpose) -> PositionerResult<()> {
        self.purpose = purpose;
        self.assign_spm()
    }

    /// Replaces all base components at once; nothing changes if any is invalid.
    pub fn set_spm_components(&mut self, components: SpmComponents) -> PositionerResult<()> {
        components.validate()?;
        self.spm_components = components;
        self.spm_values = components.derive();
        self.assign_spm()
    }

    pub fn set_spm_rec(&mut self, rec: f64) -> PositionerResult<()> {
        self.set_spm_components(SpmComponents {
            rec,
            ..self.spm_components
        })
    }

    pub fn set_spm_sta(&mut self, sta: f64) -> PositionerResult<()> {
        self.set_spm_components(SpmComponents {
            sta,
            ..self.spm_components
        })
    }

    pub fn set_spm_dyn(&mut self, dyn_: f64) -> PositionerResult<()> {
        self.set_spm_components(SpmComponents {
            dyn_,
            ..self.spm_components
        })
    }

    pub fn set_spm_min(&mut self, min: f64) -> PositionerResult<()> {
        self.set_spm_components(SpmComponents {
            min,
            ..self.spm_components
        })
    }

    pub fn set_spm_off(&mut self, off: f64) -> PositionerResult<()> {
        self.set_spm_components(SpmComponents {
            off,
            ..self.spm_components
        })
    }

    /// Applies the margin selected by knowledge degree and purpose.
    pub fn assign_spm(&mut self) -> PositionerResult<()> {
        let (spm, target) = select_spm(
            &self.spm_components,
            &self.spm_values,
            self.knowledge,
            self.purpose,
        );
        match target {
            SpmTarget::Arm => self.cylinder.arm_mut().set_spm(spm)?,
            SpmTarget::Barrier => self.cylinder.barrier_mut().set_spm(spm)?,
        }
        self.spm = spm;
        Ok(())
    }

    // --- neighbourhood ---

    pub fn adjacents(&self) -> &[usize] {
        &self.adjacents
    }

    /// Replaces the adjacency list (fleet indices, at most six).
    ///
    /// Only the fleet may call this: it alone can check the indices.
    pub(crate) fn set_adjacents(&mut self, adjacents: Vec<usize>) -> PositionerResult<()> {
        if adjacents.len() > MAX_ADJACENTS {
            return Err(PositionerError::invalid_argument(format!(
                "an actuator has at most {MAX_ADJACENTS} adjacents, got {}",
                adjacents.len()
            )));
        }
        self.adjacents = adjacents;
        self.refresh_area();
        Ok(())
    }

    pub fn area(&self) -> &AreaStatistics {
        &self.area
    }

    fn refresh_area(&mut self) {
        self.area = AreaStatistics::compute(self.r_3_max_nom(), self.adjacents.len());
    }

    pub fn safety(&self) -> &SafetyBounds {
        &self.safety
    }

    pub(crate) fn set_safety(&mut self, safety: SafetyBounds) {
        self.safety = safety;
    }

    pub fn pending(&self) -> bool {
        self.pending
    }

    pub fn set_pending(&mut self, pending: bool) {
        self.pending = pending;
    }

    pub fn collision(&self) -> bool {
        self.collision
    }

    pub fn set_collision(&mut self, collision: bool) {
        self.collision = collision;
    }

    // --- safe area ---

    /// Computes the safe-area bounds against up to six neighbours without
    /// modifying this actuator.
    ///
    /// The arm is searched by bisection on `theta_3` with the cylinder at its
    /// origin, assuming the contour's reach from `P0` grows with `theta_3`
    /// over the rotor domain.
    pub fn compute_safe_parameters(&self, neighbours: &[&Actuator]) -> PositionerResult<SafetyBounds> {
        if neighbours.len() > MAX_ADJACENTS {
            return Err(PositionerError::invalid_argument(format!(
                "at most {MAX_ADJACENTS} neighbours, got {}",
                neighbours.len()
            )));
        }
        let theta_2_rad = self.arm().theta_2_rad();
        if neighbours.is_empty() {
            return Ok(SafetyBounds::unconstrained(self.r_max(), theta_2_rad));
        }

        let mut scratch = self.clone();
        scratch.knowledge = KnowledgeDegree::Approximate;
        scratch.purpose = Purpose::Generation;
        scratch.assign_spm()?;
        scratch.set_quantify_1(false);
        scratch.set_quantify_3(false);
        scratch.retract()?;

        let p0 = scratch.p0();
        let r_min = scratch.arm().contour().farthest_distance_from(p0);
        let r_saf = neighbours
            .iter()
            .map(|other| {
                p0.distance(other.p0()) - other.r_max() - other.spm_values.gen_a - scratch.spm
            })
            .fold(f64::INFINITY, f64::min);
        if r_saf < 0.0 {
            warn!(
                id = self.id,
                r_saf, "neighbours are packed tighter than the retracted arm"
            );
        }

        let rotor = scratch.arm().rotor();
        let (mut lo, mut hi) = (rotor.theta_min(), rotor.theta_max());
        let mut reach_at = |theta_3: f64| -> PositionerResult<f64> {
            scratch.set_theta_3(theta_3)?;
            Ok(scratch.arm().contour().farthest_distance_from(p0))
        };

        let mut iterations = 0;
        let theta_3_saf = if r_saf <= reach_at(lo)? {
            lo
        } else if r_saf >= reach_at(hi)? {
            hi
        } else {
            loop {
                let mid = 0.5 * (lo + hi);
                let reach = reach_at(mid)?;
                iterations += 1;
                if (reach - r_saf).abs() <= SAFE_SEARCH_TOLERANCE
                    || iterations >= SAFE_SEARCH_MAX_ITERATIONS
                {
                    break mid;
                }
                if reach < r_saf {
                    lo = mid;
                } else {
                    hi = mid;
                }
            }
        };
        scratch.set_theta_3(theta_3_saf)?;

        let bounds = SafetyBounds {
            r_min,
            r_saf,
            r_2_saf: p0.distance(scratch.p2()),
            theta_2_saf: theta_3_saf + scratch.arm().theta_o3(),
            theta_3_saf,
            theta_2_rad,
            iterations,
        };
        debug!(
            id = self.id,
            r_min = bounds.r_min,
            r_saf = bounds.r_saf,
            theta_3_saf = bounds.theta_3_saf,
            iterations,
            "safe parameters computed"
        );
        Ok(bounds)
    }

    pub fn calculate_safe_parameters(&mut self, neighbours: &[&Actuator]) -> PositionerResult<()> {
        self.safety = self.compute_safe_parameters(neighbours)?;
        Ok(())
    }

    /// Whether the arm lies entirely inside the safe radius.
    pub fn arm_in_safe_area(&self) -> bool {
        self.theta_3() <= self.safety.theta_3_saf
    }

    // --- distance & collision ---

    fn collision_contour(&self) -> &Contour {
        match self.knowledge {
            KnowledgeDegree::Unknown => self.barrier().contour(),
            _ => self.arm().contour(),
        }
    }

    fn reach(&self) -> f64 {
        match self.knowledge {
            KnowledgeDegree::Unknown => self.barrier().r_max(),
            _ => self.r_max(),
        }
    }

    /// Distance between the bodies, using the barrier for an unknown side.
    ///
    /// Evaluated in both directions and the smaller value kept.
    pub fn distance(&self, other: &Actuator) -> f64 {
        let (a, b) = (self.collision_contour(), other.collision_contour());
        a.distance_to(b).min(b.distance_to(a))
    }

    /// Distance left after subtracting both live margins.
    pub fn distance_free(&self, other: &Actuator) -> f64 {
        self.distance(other) - self.spm - other.spm
    }

    pub fn has_collision_with(&self, other: &Actuator) -> bool {
        if self.p0().distance(other.p0()) >= self.reach() + self.spm + other.reach() + other.spm {
            return false;
        }
        let known = |k: KnowledgeDegree| k != KnowledgeDegree::Unknown;
        if known(self.knowledge) && known(other.knowledge) {
            return self.arm().collides_with(other.arm());
        }
        let (a, b) = (self.collision_contour(), other.collision_contour());
        let tolerance = self.spm + other.spm;
        a.is_closer_than(b, tolerance) || b.is_closer_than(a, tolerance)
    }
}
