// tests/margins.rs
mod common;

use approx::assert_abs_diff_eq;
use common::{VMAX, actuator_at, positioner_at};
use fiber_positioner::{KnowledgeDegree, PositionerError, Purpose, SpmComponents, ToleranceConfig};
use std::f64::consts::TAU;

#[test]
fn test_default_live_margin() {
    let a = actuator_at(0, 0.0, 0.0);
    // Precise knowledge, validation purpose: sta + dyn + min.
    assert_abs_diff_eq!(a.spm(), 0.2, epsilon = 1e-12);
    assert_abs_diff_eq!(a.arm().spm(), 0.2, epsilon = 1e-12);
}

#[test]
fn test_derived_margins_are_monotone() {
    let base = SpmComponents::default();
    let before = base.derive().as_array();

    let bumps: [fn(&mut SpmComponents); 5] = [
        |c| c.rec += 0.3,
        |c| c.sta += 0.3,
        |c| c.dyn_ += 0.3,
        |c| c.min += 0.3,
        |c| c.off += 0.3,
    ];
    for bump in bumps {
        let mut c = base;
        bump(&mut c);
        for (after, before) in c.derive().as_array().iter().zip(before.iter()) {
            assert!(after >= before);
        }
    }

    // Every level adds to the previous one.
    let v = base.derive();
    assert!(v.exe_p <= v.val_p && v.val_p <= v.gen_p && v.gen_p <= v.all_p);
    assert!(v.exe_a <= v.val_a && v.val_a <= v.gen_a && v.gen_a <= v.all_a);
}

#[test]
fn test_negative_component_is_rejected() {
    let mut a = actuator_at(0, 0.0, 0.0);
    let before = *a.spm_components();

    let err = a.set_spm_rec(-1.0);
    assert!(matches!(err, Err(PositionerError::InvalidArgument(_))));
    assert_eq!(*a.spm_components(), before);
    assert_abs_diff_eq!(a.spm(), 0.2, epsilon = 1e-12);

    assert!(a.set_spm_off(f64::NAN).is_err());
    assert_eq!(*a.spm_components(), before);
}

#[test]
fn test_component_update_rederives_live_margin() {
    let mut a = actuator_at(0, 0.0, 0.0);
    a.set_spm_dyn(0.5).unwrap();
    assert_abs_diff_eq!(a.spm_values().val_p, 0.6, epsilon = 1e-12);
    assert_abs_diff_eq!(a.spm(), 0.6, epsilon = 1e-12);
}

#[test]
fn test_selection_by_knowledge_and_purpose() {
    let mut a = actuator_at(0, 0.0, 0.0);

    a.set_purpose(Purpose::Allocation).unwrap();
    assert_abs_diff_eq!(a.spm(), a.spm_values().all_p, epsilon = 1e-15);

    a.set_knowledge(KnowledgeDegree::Approximate).unwrap();
    assert_abs_diff_eq!(a.spm(), a.spm_values().all_a, epsilon = 1e-15);

    a.set_purpose(Purpose::Execution).unwrap();
    assert_abs_diff_eq!(a.spm(), a.spm_values().exe_a, epsilon = 1e-15);
    assert_abs_diff_eq!(a.arm().spm(), a.spm(), epsilon = 1e-15);

    // Unknown position: the barrier carries the static margin.
    a.set_knowledge(KnowledgeDegree::Unknown).unwrap();
    assert_abs_diff_eq!(a.spm(), a.spm_components().sta, epsilon = 1e-15);
    assert_abs_diff_eq!(a.barrier().spm(), a.spm_components().sta, epsilon = 1e-15);
    assert_abs_diff_eq!(a.barrier().r_max(), a.r_max(), epsilon = 1e-9);
}

fn tip_speed(r_max: f64, l1v: f64) -> f64 {
    let omega = VMAX / (160_000.0 / TAU);
    omega * r_max + omega * l1v
}

#[test]
fn test_components_follow_tolerances() {
    let (mut p, _) = positioner_at(0, 0.0, 0.0);
    let (r_max, l1v) = (p.actuator().r_max(), p.actuator().arm().l1v());
    let v_tip = tip_speed(r_max, l1v);

    let c = *p.actuator().spm_components();
    assert_abs_diff_eq!(c.rec, v_tip * 0.005, epsilon = 1e-9);
    assert_abs_diff_eq!(c.sta, 0.001 * r_max + 0.01, epsilon = 1e-12);
    assert_abs_diff_eq!(c.dyn_, v_tip * 0.001, epsilon = 1e-9);
    assert_abs_diff_eq!(c.off, SpmComponents::default().off, epsilon = 1e-15);

    p.set_tstop(0.01).unwrap();
    assert_abs_diff_eq!(p.actuator().spm_components().rec, v_tip * 0.01, epsilon = 1e-9);
    assert_eq!(p.tolerances().tstop, 0.01);

    p.set_tolerances(ToleranceConfig::fine()).unwrap();
    assert_abs_diff_eq!(
        p.actuator().spm_components().sta,
        0.000001 * r_max + 0.01,
        epsilon = 1e-12
    );
}

#[test]
fn test_invalid_tolerance_changes_nothing() {
    let (mut p, _) = positioner_at(0, 0.0, 0.0);
    let tolerances = *p.tolerances();
    let components = *p.actuator().spm_components();

    assert!(matches!(
        p.set_eo(-1.0),
        Err(PositionerError::InvalidArgument(_))
    ));
    assert_eq!(*p.tolerances(), tolerances);
    assert_eq!(*p.actuator().spm_components(), components);
}
