//! Contract of the composed motion function (CMF), the external generator of
//! time-parameterized rotor trajectories.
//!
//! Positions are in steps, velocities in steps per second and times in
//! seconds. The positioner only programs and samples the generator; it never
//! shapes trajectories itself.

use std::fmt::Debug;

pub trait ComposedMotion: Debug {
    /// Programs a rotor-1 gesture from `p_sta` to `p_fin`.
    fn program_mf1(&mut self, p_sta: f64, p_fin: f64);

    /// Programs a rotor-2 gesture from `p_sta` to `p_fin`.
    fn program_mf2(&mut self, p_sta: f64, p_fin: f64);

    /// Programs both rotors to move simultaneously.
    fn program_both(&mut self, p1_sta: f64, p2_sta: f64, p1_fin: f64, p2_fin: f64);

    fn clear_program(&mut self);

    /// Maximum absolute speed of rotor 1.
    fn vmaxabs1(&self) -> f64;

    /// Maximum absolute speed of rotor 2.
    fn vmaxabs2(&self) -> f64;

    /// Rotor-1 position at time `t` of the programmed gesture.
    fn position_at1(&self, t: f64) -> f64;

    /// Rotor-2 position at time `t` of the programmed gesture.
    fn position_at2(&self, t: f64) -> f64;
}
