//! Coverage statistics of a positioner under an ideal hexagonal tiling.
//!
//! With nominal fiber reach `r`, neighbours sit at pitch `√3·r`, which makes
//! each hexagonal cell exactly inscribed in the reach circle. Every neighbour
//! shares one lens-shaped region of area `L = r²(π/3 − √3/2)` with this
//! positioner.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Maximum number of neighbours in a hexagonal tiling.
pub const MAX_ADJACENTS: usize = 6;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AreaStatistics {
    /// Area of the reach circle.
    pub sc: f64,
    /// Area of the hexagonal cell.
    pub sw: f64,
    /// Participative area: the circle minus half of each shared lens.
    pub sp: f64,
    /// Area shared with the actual neighbours.
    pub ss: f64,
    /// Exclusive area, reachable by this positioner only.
    pub se: f64,
    /// Exclusive ratio `se / sp`.
    pub re: f64,
    /// Participative area with a full ring of six neighbours.
    pub spt: f64,
    /// Exclusive area with a full ring of six neighbours.
    pub set: f64,
    /// Exclusive ratio with a full ring of six neighbours.
    pub ret: f64,
}

impl AreaStatistics {
    pub fn compute(r_3_max_nom: f64, adjacents: usize) -> Self {
        let r2 = r_3_max_nom * r_3_max_nom;
        let n = adjacents.min(MAX_ADJACENTS) as f64;
        let lens = r2 * (PI / 3.0 - 0.75_f64.sqrt());

        let sc = PI * r2;
        let sw = 3.0 * 0.75_f64.sqrt() * r2;
        let sp = sc - n * lens / 2.0;
        let ss = n * lens;
        let se = sc - ss;
        let spt = sc - 3.0 * lens;
        let set = sc - 6.0 * lens;
        Self {
            sc,
            sw,
            sp,
            ss,
            se,
            re: ratio(se, sp),
            spt,
            set,
            ret: ratio(set, spt),
        }
    }
}

fn ratio(num: f64, den: f64) -> f64 {
    if den == 0.0 { 0.0 } else { num / den }
}
