//! The robotic positioner: an actuator plus tolerances, operating state and
//! the instruction layer that drives the external motion generator.

use crate::actuator::Actuator;
use crate::config::{PositionerConfig, ToleranceConfig};
use crate::error::{PositionerError, PositionerResult, ensure_non_negative};
use crate::instruction::{ControlMode, Instruction};
use crate::motion::ComposedMotion;
use crate::spm::SpmComponents;
use glam::DVec2;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct RoboticPositioner {
    actuator: Actuator,
    tolerances: ToleranceConfig,
    fault: bool,
    disabled: bool,
    control_mode: ControlMode,
    /// Last instruction accepted.
    instruction: Option<Instruction>,
    /// Motion currently programmed into the CMF.
    gesture: Option<Instruction>,
    cmf: Box<dyn ComposedMotion>,
}

impl RoboticPositioner {
    pub fn new(
        id: i32,
        p0: DVec2,
        theta_o1: f64,
        cmf: Box<dyn ComposedMotion>,
    ) -> PositionerResult<Self> {
        Self::with_config(id, p0, theta_o1, &PositionerConfig::default(), cmf)
    }

    pub fn with_config(
        id: i32,
        p0: DVec2,
        theta_o1: f64,
        config: &PositionerConfig,
        cmf: Box<dyn ComposedMotion>,
    ) -> PositionerResult<Self> {
        check_tolerances(&config.tolerances)?;
        let mut positioner = Self {
            actuator: Actuator::with_config(id, p0, theta_o1, config)?,
            tolerances: config.tolerances,
            fault: false,
            disabled: false,
            control_mode: ControlMode::default(),
            instruction: None,
            gesture: None,
            cmf,
        };
        positioner.calculate_spm_components()?;
        Ok(positioner)
    }

    pub fn id(&self) -> i32 {
        self.actuator.id()
    }

    pub fn actuator(&self) -> &Actuator {
        &self.actuator
    }

    pub fn actuator_mut(&mut self) -> &mut Actuator {
        &mut self.actuator
    }

    pub fn cmf(&self) -> &dyn ComposedMotion {
        self.cmf.as_ref()
    }

    // --- tolerances ---

    pub fn tolerances(&self) -> &ToleranceConfig {
        &self.tolerances
    }

    pub fn set_eo(&mut self, eo: f64) -> PositionerResult<()> {
        self.set_tolerances(ToleranceConfig {
            eo,
            ..self.tolerances
        })
    }

    pub fn set_ep(&mut self, ep: f64) -> PositionerResult<()> {
        self.set_tolerances(ToleranceConfig {
            ep,
            ..self.tolerances
        })
    }

    pub fn set_tstop(&mut self, tstop: f64) -> PositionerResult<()> {
        self.set_tolerances(ToleranceConfig {
            tstop,
            ..self.tolerances
        })
    }

    pub fn set_tshiff(&mut self, tshiff: f64) -> PositionerResult<()> {
        self.set_tolerances(ToleranceConfig {
            tshiff,
            ..self.tolerances
        })
    }

    /// Replaces the tolerances and recomputes the SPM components from them.
    pub fn set_tolerances(&mut self, tolerances: ToleranceConfig) -> PositionerResult<()> {
        check_tolerances(&tolerances)?;
        let components = self.spm_components_for(&tolerances);
        self.actuator.set_spm_components(components)?;
        self.tolerances = tolerances;
        Ok(())
    }

    /// SPM components implied by `tolerances`; `off` is kept from the actuator.
    ///
    /// ```text
    /// ω_i   = vmaxabs_i / (min dF_i/dθ)
    /// v_tip = ω1·r_max + ω2·L1V
    /// rec   = v_tip·Tstop          sta = Eo·r_max + Ep
    /// dyn   = v_tip·Tshiff         min = (r_max·δθ1 + L1V·δθ2) / 2
    /// ```
    /// where `δθ_i` is the angle of one step.
    pub fn spm_components_for(&self, tolerances: &ToleranceConfig) -> SpmComponents {
        let a = &self.actuator;
        let cal_1 = a.cylinder().rotor().calibration();
        let cal_2 = a.arm().rotor().calibration();
        let r_max = a.r_max();
        let l1v = a.arm().l1v();

        let omega_1 = self.cmf.vmaxabs1().abs() / cal_1.min_slope();
        let omega_2 = self.cmf.vmaxabs2().abs() / cal_2.min_slope();
        let v_tip = omega_1 * r_max + omega_2 * l1v;

        SpmComponents {
            rec: v_tip * tolerances.tstop,
            sta: tolerances.eo * r_max + tolerances.ep,
            dyn_: v_tip * tolerances.tshiff,
            min: 0.5 * (r_max * cal_1.step_angle() + l1v * cal_2.step_angle()),
            off: a.spm_components().off,
        }
    }

    pub fn calculate_spm_components(&mut self) -> PositionerResult<()> {
        let components = self.spm_components_for(&self.tolerances);
        self.actuator.set_spm_components(components)
    }

    // --- operating state ---

    pub fn fault(&self) -> bool {
        self.fault
    }

    pub fn set_fault(&mut self, fault: bool) {
        self.fault = fault;
    }

    pub fn disabled(&self) -> bool {
        self.disabled
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    /// Neither faulty nor disabled.
    pub fn is_operative(&self) -> bool {
        !self.fault && !self.disabled
    }

    pub fn control_mode(&self) -> ControlMode {
        self.control_mode
    }

    pub fn instruction(&self) -> Option<Instruction> {
        self.instruction
    }

    /// The motion currently programmed into the CMF, if any.
    pub fn gesture(&self) -> Option<Instruction> {
        self.gesture
    }

    pub fn has_program(&self) -> bool {
        self.gesture.is_some()
    }

    fn ensure_operative(&self, what: &str) -> PositionerResult<()> {
        if !self.is_operative() {
            return Err(PositionerError::invalid_operation(format!(
                "positioner {} cannot {what} while faulty or disabled",
                self.id()
            )));
        }
        Ok(())
    }

    // --- instructions ---

    /// Parses and executes an instruction given by mnemonic.
    pub fn set_instruction(&mut self, name: &str, args: &[f64]) -> PositionerResult<()> {
        let instruction = Instruction::parse(name, args)?;
        self.execute(instruction)
    }

    pub fn execute(&mut self, instruction: Instruction) -> PositionerResult<()> {
        debug!(id = self.id(), %instruction, "executing instruction");
        match instruction {
            Instruction::SynchronousMode => self.control_mode = ControlMode::Synchronous,
            Instruction::AsynchronousMode => self.control_mode = ControlMode::Asynchronous,
            Instruction::Stop => self.clear_program()?,
            Instruction::MoveRotor1(p) => {
                self.ensure_operative("move")?;
                let p_fin = self.target_step_1(p)?;
                let (p_sta, _) = self.quantized_start_steps()?;
                self.cmf.program_mf1(p_sta, p_fin);
            }
            Instruction::MoveRotor2(p) => {
                self.ensure_operative("move")?;
                let p_fin = self.target_step_3(p)?;
                let (_, p_sta) = self.quantized_start_steps()?;
                self.cmf.program_mf2(p_sta, p_fin);
            }
            Instruction::MoveBoth(p1, p2) => {
                self.ensure_operative("move")?;
                let p1_fin = self.target_step_1(p1)?;
                let p2_fin = self.target_step_3(p2)?;
                let (p1_sta, p2_sta) = self.quantized_start_steps()?;
                self.cmf.program_both(p1_sta, p2_sta, p1_fin, p2_fin);
            }
        }
        if instruction.is_motion() {
            self.gesture = Some(instruction);
        }
        self.instruction = Some(instruction);
        Ok(())
    }

    fn target_step_1(&self, p: f64) -> PositionerResult<f64> {
        let rotor = self.actuator.cylinder().rotor();
        if !rotor.is_in_domain_step(p) {
            return Err(PositionerError::invalid_argument(format!(
                "rotor-1 step {p} outside {:?}",
                rotor.step_domain()
            )));
        }
        Ok(rotor.quantizer().quantize(p))
    }

    fn target_step_3(&self, p: f64) -> PositionerResult<f64> {
        let rotor = self.actuator.arm().rotor();
        if !rotor.is_in_domain_step(p) {
            return Err(PositionerError::invalid_argument(format!(
                "rotor-2 step {p} outside {:?}",
                rotor.step_domain()
            )));
        }
        Ok(rotor.quantizer().quantize(p))
    }

    /// Start steps of both rotors as read with quantization forced on. The
    /// rotor state is saved before and restored after the read.
    fn quantized_start_steps(&mut self) -> PositionerResult<(f64, f64)> {
        let pending = self.actuator.pending();
        self.actuator.push_theta_1();
        self.actuator.push_theta_3();
        self.actuator.set_quantify_1(true);
        self.actuator.set_quantify_3(true);
        let (r1, r2) = (self.actuator.cylinder().rotor(), self.actuator.arm().rotor());
        let steps = (
            r1.quantizer().quantize(r1.step()),
            r2.quantizer().quantize(r2.step()),
        );
        self.actuator.pop_theta_3()?;
        self.actuator.pop_theta_1()?;
        self.actuator.set_pending(pending);
        Ok(steps)
    }

    /// Clears the programmed gesture (`SP`).
    pub fn clear_program(&mut self) -> PositionerResult<()> {
        if self.gesture.is_none() {
            return Err(PositionerError::invalid_operation(format!(
                "positioner {} has no programmed gesture",
                self.id()
            )));
        }
        self.cmf.clear_program();
        self.gesture = None;
        Ok(())
    }

    /// Programs a simultaneous retraction of the arm into the safe area.
    ///
    /// Rotor 2 goes to the largest step not beyond `theta_3_saf`; rotor 1
    /// moves back by half of rotor 2's angular travel, stopping at its origin.
    /// Returns `false`, with nothing programmed, when the arm is already safe.
    pub fn program_retract_arm_to_safe_area(&mut self) -> PositionerResult<bool> {
        self.ensure_operative("retract")?;
        if !self.actuator.quantify_1() || !self.actuator.quantify_3() {
            return Err(PositionerError::invalid_operation(
                "retraction requires both rotors to be quantified",
            ));
        }
        let a = &self.actuator;
        let (r1, r2) = (a.cylinder().rotor(), a.arm().rotor());
        let theta_3_saf = a.safety().theta_3_saf;
        if a.theta_3() <= theta_3_saf {
            return Ok(false);
        }

        let p2_sta = r2.quantizer().quantize(r2.step());
        let p2_fin = r2
            .quantizer()
            .quantize_down(r2.calibration().angle_to_step(theta_3_saf));
        let travel = a.theta_3() - r2.calibration().step_to_angle(p2_fin);

        let (origin_1, _) = a.origin_angles();
        let mut theta_1_fin = a.theta_1() - 0.5 * travel;
        if theta_1_fin < origin_1 {
            warn!(id = a.id(), theta_1_fin, "retraction clamps rotor 1 at its origin");
            theta_1_fin = origin_1;
        }
        let p1_sta = r1.quantizer().quantize(r1.step());
        let p1_fin = r1
            .quantizer()
            .quantize(r1.calibration().angle_to_step(theta_1_fin));

        self.cmf.program_both(p1_sta, p2_sta, p1_fin, p2_fin);
        let instruction = Instruction::MoveBoth(p1_fin, p2_fin);
        self.gesture = Some(instruction);
        self.instruction = Some(instruction);
        Ok(true)
    }

    /// Programs a move bringing the fiber to `p3`.
    pub fn program_move_to(&mut self, p3: DVec2) -> PositionerResult<()> {
        let (theta_1, theta_3) = self.actuator.angles_for_p3(p3)?;
        let p1 = self
            .actuator
            .cylinder()
            .rotor()
            .calibration()
            .angle_to_step(theta_1);
        let p2 = self.actuator.arm().rotor().calibration().angle_to_step(theta_3);
        self.execute(Instruction::MoveBoth(p1, p2))
    }

    /// Places both rotors where the programmed gesture puts them at time `t`.
    ///
    /// Quantization is released on both rotors, since intermediate positions
    /// of a simultaneous motion are generally off the step grid.
    pub fn move_to_time(&mut self, t: f64) -> PositionerResult<()> {
        if self.gesture.is_none() {
            return Err(PositionerError::invalid_operation(format!(
                "positioner {} has no programmed gesture",
                self.id()
            )));
        }
        let (p1, p2) = (self.cmf.position_at1(t), self.cmf.position_at2(t));
        let a = &self.actuator;
        if !a.cylinder().rotor().is_in_domain_step(p1) || !a.arm().rotor().is_in_domain_step(p2) {
            return Err(PositionerError::invalid_argument(format!(
                "motion function leaves the rotor domains at t = {t}"
            )));
        }
        self.actuator.set_quantify_1(false);
        self.actuator.set_quantify_3(false);
        self.actuator.set_step_1(p1)?;
        self.actuator.set_step_3(p2)
    }
}

fn check_tolerances(t: &ToleranceConfig) -> PositionerResult<()> {
    ensure_non_negative("Eo", t.eo)?;
    ensure_non_negative("Ep", t.ep)?;
    ensure_non_negative("Tstop", t.tstop)?;
    ensure_non_negative("Tshiff", t.tshiff)
}
