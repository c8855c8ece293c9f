// tests/safe_area.rs
mod common;

use approx::assert_abs_diff_eq;
use common::{actuator_at, positioner_at};
use fiber_positioner::{
    Actuator, AreaStatistics, Fleet, PositionerError, SAFE_SEARCH_MAX_ITERATIONS,
    SAFE_SEARCH_TOLERANCE,
};
use std::f64::consts::PI;

/// Farthest reach of the arm contour from `P0` with rotor 1 at origin.
fn reach_at(a: &Actuator, theta_3: f64) -> f64 {
    let mut posed = a.clone();
    posed.set_quantify_1(false);
    posed.set_quantify_3(false);
    posed.set_angles(0.0, theta_3).unwrap();
    posed.arm().contour().farthest_distance_from(posed.p0())
}

#[test]
fn test_isolated_actuator_is_unconstrained() {
    let a = actuator_at(0, 0.0, 0.0);
    let bounds = a.compute_safe_parameters(&[]).unwrap();

    assert_eq!(bounds.r_min, a.r_max());
    assert_eq!(bounds.r_saf, a.r_max());
    assert_eq!(bounds.theta_3_saf, PI);
    assert_eq!(bounds.theta_2_saf, PI);
    assert_eq!(bounds.iterations, 0);
}

#[test]
fn test_bisection_meets_safe_radius() {
    let a = actuator_at(0, 0.0, 0.0);
    let b = actuator_at(1, 22.0, 0.0);
    let bounds = a.compute_safe_parameters(&[&b]).unwrap();

    // 22 - r_max(B) - 2 x SPMgen_a with default components.
    assert_abs_diff_eq!(bounds.r_saf, 22.0 - 12.355 - 0.7, epsilon = 1e-12);
    assert_abs_diff_eq!(bounds.r_min, 6.5525, epsilon = 1e-9);
    assert!(bounds.theta_3_saf > 0.0 && bounds.theta_3_saf < PI);
    assert!(bounds.iterations <= SAFE_SEARCH_MAX_ITERATIONS);

    let residual = (reach_at(&a, bounds.theta_3_saf) - bounds.r_saf).abs();
    assert!(residual <= SAFE_SEARCH_TOLERANCE || bounds.iterations == SAFE_SEARCH_MAX_ITERATIONS);

    assert_abs_diff_eq!(
        bounds.theta_2_saf,
        bounds.theta_3_saf + a.arm().theta_o3(),
        epsilon = 1e-15
    );
    assert_eq!(bounds.theta_2_rad, PI);

    let mut posed = a.clone();
    posed.set_quantify_3(false);
    posed.set_theta_3(bounds.theta_3_saf).unwrap();
    assert_abs_diff_eq!(bounds.r_2_saf, posed.p2().distance(posed.p0()), epsilon = 1e-9);
}

#[test]
fn test_closest_neighbour_dominates() {
    let a = actuator_at(0, 0.0, 0.0);
    let near = actuator_at(1, 22.0, 0.0);
    let far = actuator_at(2, 0.0, 24.0);

    let both = a.compute_safe_parameters(&[&far, &near]).unwrap();
    let only_near = a.compute_safe_parameters(&[&near]).unwrap();
    assert_eq!(both.r_saf, only_near.r_saf);
    assert_eq!(both.theta_3_saf, only_near.theta_3_saf);
}

#[test]
fn test_packed_neighbours_pin_arm_at_origin() {
    let a = actuator_at(0, 0.0, 0.0);

    let close = actuator_at(1, 15.0, 0.0);
    let bounds = a.compute_safe_parameters(&[&close]).unwrap();
    assert!(bounds.r_saf < bounds.r_min);
    assert_eq!(bounds.theta_3_saf, 0.0);
    assert_eq!(bounds.iterations, 0);

    let overlapping = actuator_at(2, 10.0, 0.0);
    let bounds = a.compute_safe_parameters(&[&overlapping]).unwrap();
    assert!(bounds.r_saf < 0.0);
    assert_eq!(bounds.theta_3_saf, 0.0);
}

#[test]
fn test_wide_spacing_frees_full_stroke() {
    let a = actuator_at(0, 0.0, 0.0);
    let b = actuator_at(1, 28.0, 0.0);
    let bounds = a.compute_safe_parameters(&[&b]).unwrap();
    assert_eq!(bounds.theta_3_saf, PI);
}

#[test]
fn test_more_than_six_neighbours_rejected() {
    let a = actuator_at(0, 0.0, 0.0);
    let others: Vec<Actuator> = (1..8).map(|i| actuator_at(i, 30.0 * i as f64, 0.0)).collect();
    let refs: Vec<&Actuator> = others.iter().collect();
    assert!(matches!(
        a.compute_safe_parameters(&refs),
        Err(PositionerError::InvalidArgument(_))
    ));
}

#[test]
fn test_fleet_safe_parameters_and_arm_check() {
    let mut fleet = Fleet::new();
    fleet.add(positioner_at(0, 0.0, 0.0).0);
    fleet.add(positioner_at(1, 22.0, 0.0).0);
    fleet.determine_adjacents().unwrap();
    fleet.calculate_all_safe_parameters().unwrap();

    let a = fleet.actuator(0).unwrap();
    assert!(a.safety().theta_3_saf < PI);
    assert!(a.arm_in_safe_area());
    let expected = fleet.compute_safe_parameters(0).unwrap();
    assert_eq!(*a.safety(), expected);

    fleet
        .get_mut(0)
        .unwrap()
        .actuator_mut()
        .set_theta_3(PI)
        .unwrap();
    assert!(!fleet.actuator(0).unwrap().arm_in_safe_area());
}

#[test]
fn test_area_statistics_identities() {
    let r = 11.605;
    let lens = r * r * (PI / 3.0 - 0.75_f64.sqrt());

    let alone = AreaStatistics::compute(r, 0);
    assert_abs_diff_eq!(alone.sc, PI * r * r, epsilon = 1e-9);
    assert_abs_diff_eq!(alone.sp, alone.sc, epsilon = 1e-9);
    assert_abs_diff_eq!(alone.re, 1.0, epsilon = 1e-12);

    let three = AreaStatistics::compute(r, 3);
    assert_abs_diff_eq!(three.ss, 3.0 * lens, epsilon = 1e-9);
    assert_abs_diff_eq!(three.sp, three.sc - 1.5 * lens, epsilon = 1e-9);
    assert_abs_diff_eq!(three.se, three.sc - three.ss, epsilon = 1e-9);

    let full = AreaStatistics::compute(r, 6);
    assert_abs_diff_eq!(full.sp, full.spt, epsilon = 1e-9);
    assert_abs_diff_eq!(full.se, full.set, epsilon = 1e-9);
    assert_abs_diff_eq!(full.re, full.ret, epsilon = 1e-12);
    // With a full ring the participative area is exactly the hexagon.
    assert_abs_diff_eq!(full.spt, full.sw, epsilon = 1e-9);
    // Independent of the reach.
    assert_abs_diff_eq!(full.ret, 2.0 - PI / (3.0 * 0.75_f64.sqrt()), epsilon = 1e-12);
    assert_abs_diff_eq!(AreaStatistics::compute(3.0, 6).ret, full.ret, epsilon = 1e-12);
}

#[test]
fn test_actuator_area_tracks_adjacents() {
    let mut fleet = Fleet::new();
    for i in 0..8 {
        fleet.add(positioner_at(i, 30.0 * i as f64, 0.0).0);
    }
    assert_abs_diff_eq!(fleet.actuator(0).unwrap().area().re, 1.0, epsilon = 1e-12);

    fleet.set_adjacents(0, (1..7).collect()).unwrap();
    let area = *fleet.actuator(0).unwrap().area();
    assert_abs_diff_eq!(area.re, area.ret, epsilon = 1e-12);
    assert!(fleet.set_adjacents(0, (1..8).collect()).is_err());
    assert_eq!(fleet.actuator(0).unwrap().adjacents().len(), 6);
}
