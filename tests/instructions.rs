// tests/instructions.rs
mod common;

use approx::assert_abs_diff_eq;
use common::{Program, positioner_at};
use fiber_positioner::{Calibration, ControlMode, Fleet, Instruction, PositionerError};
use glam::DVec2;
use std::f64::consts::{FRAC_PI_4, PI};

#[test]
fn test_parse_errors() {
    assert!(matches!(
        Instruction::parse("", &[]),
        Err(PositionerError::InvalidArgument(_))
    ));
    assert!(matches!(
        Instruction::parse("XX", &[]),
        Err(PositionerError::ImpossibleState(_))
    ));
    assert!(matches!(
        Instruction::parse("M1", &[]),
        Err(PositionerError::InvalidArgument(_))
    ));
    assert!(matches!(
        Instruction::parse("MM", &[1.0]),
        Err(PositionerError::InvalidArgument(_))
    ));
    assert!(matches!(
        Instruction::parse("M2", &[f64::NAN]),
        Err(PositionerError::InvalidArgument(_))
    ));
}

#[test]
fn test_parse_and_display() {
    let mm = Instruction::parse("MM", &[40000.0, 80000.0]).unwrap();
    assert_eq!(mm, Instruction::MoveBoth(40000.0, 80000.0));
    assert_eq!(mm.to_string(), "MM 40000 80000");
    assert_eq!(Instruction::parse("SP", &[]).unwrap().name(), "SP");
    assert!(!Instruction::Stop.is_motion());
}

#[test]
fn test_control_mode_switch() {
    let (mut p, program) = positioner_at(0, 0.0, 0.0);
    assert_eq!(p.control_mode(), ControlMode::Synchronous);

    p.set_instruction("MA", &[]).unwrap();
    assert_eq!(p.control_mode(), ControlMode::Asynchronous);
    p.set_instruction("MS", &[]).unwrap();
    assert_eq!(p.control_mode(), ControlMode::Synchronous);
    assert_eq!(p.instruction(), Some(Instruction::SynchronousMode));
    assert!(!p.has_program());
    assert_eq!(*program.borrow(), Program::default());
}

#[test]
fn test_stop_without_program() {
    let (mut p, _) = positioner_at(0, 0.0, 0.0);
    assert!(matches!(
        p.set_instruction("SP", &[]),
        Err(PositionerError::InvalidOperation(_))
    ));
    assert_eq!(p.instruction(), None);
}

#[test]
fn test_single_rotor_programs() {
    let (mut p, program) = positioner_at(0, 0.0, 0.0);

    p.set_instruction("M1", &[40000.0]).unwrap();
    assert_eq!(program.borrow().mf1, Some((0.0, 40000.0)));
    assert_eq!(p.gesture(), Some(Instruction::MoveRotor1(40000.0)));

    p.set_instruction("M2", &[12345.6]).unwrap();
    assert_eq!(program.borrow().mf2, Some((0.0, 12346.0)));
    assert_eq!(program.borrow().mf1, None);

    p.set_instruction("SP", &[]).unwrap();
    assert!(!p.has_program());
    assert_eq!(*program.borrow(), Program::default());
}

#[test]
fn test_out_of_domain_target_rejected() {
    let (mut p, program) = positioner_at(0, 0.0, 0.0);
    p.set_instruction("M1", &[1000.0]).unwrap();

    // Rotor 2 stops at 80000 steps (pi).
    assert!(matches!(
        p.set_instruction("M2", &[90000.0]),
        Err(PositionerError::InvalidArgument(_))
    ));
    assert!(matches!(
        p.set_instruction("MM", &[-1.0, 100.0]),
        Err(PositionerError::InvalidArgument(_))
    ));
    assert_eq!(p.instruction(), Some(Instruction::MoveRotor1(1000.0)));
    assert_eq!(program.borrow().mf1, Some((0.0, 1000.0)));
}

#[test]
fn test_faulty_positioner_refuses_motion() {
    let (mut p, _) = positioner_at(0, 0.0, 0.0);
    p.set_fault(true);
    assert!(!p.is_operative());
    assert!(matches!(
        p.set_instruction("M1", &[100.0]),
        Err(PositionerError::InvalidOperation(_))
    ));
    p.set_instruction("MA", &[]).unwrap();

    p.set_fault(false);
    p.set_disabled(true);
    assert!(p.set_instruction("MM", &[100.0, 100.0]).is_err());
    p.set_disabled(false);
    assert!(p.set_instruction("MM", &[100.0, 100.0]).is_ok());
}

#[test]
fn test_move_to_time_follows_motion() {
    let (mut p, _) = positioner_at(0, 0.0, 0.0);
    assert!(matches!(
        p.move_to_time(0.0),
        Err(PositionerError::InvalidOperation(_))
    ));

    p.set_instruction("MM", &[40000.0, 80000.0]).unwrap();

    // Half way through rotor 1's 40 s stroke.
    p.move_to_time(20.0).unwrap();
    assert!(!p.actuator().quantify_1());
    assert_abs_diff_eq!(p.actuator().theta_1(), FRAC_PI_4, epsilon = 1e-12);
    assert_abs_diff_eq!(p.actuator().theta_3(), FRAC_PI_4, epsilon = 1e-12);

    p.move_to_time(1e6).unwrap();
    assert_abs_diff_eq!(p.actuator().p3().x, 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(p.actuator().p3().y, -11.605, epsilon = 1e-9);
}

#[test]
fn test_program_move_to_point() {
    let (mut p, program) = positioner_at(0, 0.0, 0.0);
    p.program_move_to(DVec2::new(0.0, -11.605)).unwrap();

    assert!(matches!(p.gesture(), Some(Instruction::MoveBoth(..))));
    assert_eq!(program.borrow().mf1, Some((0.0, 40000.0)));
    assert_eq!(program.borrow().mf2, Some((0.0, 80000.0)));

    assert!(p.program_move_to(DVec2::new(30.0, 0.0)).is_err());
}

#[test]
fn test_retraction_requires_quantified_rotors() {
    let (mut p, _) = positioner_at(0, 0.0, 0.0);
    p.actuator_mut().set_quantify_3(false);
    assert!(matches!(
        p.program_retract_arm_to_safe_area(),
        Err(PositionerError::InvalidOperation(_))
    ));
}

/// Positioner 0 with a neighbour 22 mm away and its safe area computed.
fn constrained_fleet() -> (Fleet, std::rc::Rc<std::cell::RefCell<Program>>) {
    let mut fleet = Fleet::new();
    let (p, program) = positioner_at(0, 0.0, 0.0);
    fleet.add(p);
    fleet.add(positioner_at(1, 22.0, 0.0).0);
    fleet.determine_adjacents().unwrap();
    fleet.calculate_all_safe_parameters().unwrap();
    (fleet, program)
}

#[test]
fn test_retraction_when_already_safe() {
    let (mut fleet, program) = constrained_fleet();
    let p = fleet.get_mut(0).unwrap();
    assert!(!p.program_retract_arm_to_safe_area().unwrap());
    assert!(!p.has_program());
    assert_eq!(*program.borrow(), Program::default());
}

#[test]
fn test_retraction_clamps_rotor_1_at_origin() {
    let (mut fleet, program) = constrained_fleet();
    let p = fleet.get_mut(0).unwrap();
    p.actuator_mut().set_theta_3(PI).unwrap();
    let theta_3_saf = p.actuator().safety().theta_3_saf;

    assert!(p.program_retract_arm_to_safe_area().unwrap());
    let (mf1, mf2) = {
        let program = program.borrow();
        (program.mf1.unwrap(), program.mf2.unwrap())
    };
    let cal = Calibration::default();
    assert_eq!(mf2.0, 80000.0);
    assert!(mf2.1 <= cal.angle_to_step(theta_3_saf));
    assert!(mf2.1 > cal.angle_to_step(theta_3_saf) - 1.0);
    assert_eq!(mf1, (0.0, 0.0));
    assert!(matches!(p.gesture(), Some(Instruction::MoveBoth(..))));
    assert_eq!(p.instruction(), p.gesture());
}

#[test]
fn test_retraction_moves_rotor_1_by_half_the_arm_travel() {
    let (mut fleet, program) = constrained_fleet();
    let p = fleet.get_mut(0).unwrap();
    p.set_instruction("MA", &[]).unwrap();
    p.actuator_mut().set_angles(PI, PI).unwrap();

    assert!(p.program_retract_arm_to_safe_area().unwrap());
    let (mf1, mf2) = {
        let program = program.borrow();
        (program.mf1.unwrap(), program.mf2.unwrap())
    };
    let cal = Calibration::default();
    let travel = PI - cal.step_to_angle(mf2.1);
    assert_eq!(mf1.0, 80000.0);
    assert_eq!(mf1.1, cal.angle_to_step(PI - 0.5 * travel).round());
    assert!(mf1.1 < mf1.0);
    assert_eq!(p.instruction(), Some(Instruction::MoveBoth(mf1.1, mf2.1)));
}
