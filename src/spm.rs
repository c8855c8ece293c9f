//! Security perimeter margins (SPM): base components, the eight derived
//! margins, and the (knowledge, purpose) selection table.

use crate::error::{PositionerResult, ensure_non_negative};
use serde::{Deserialize, Serialize};

/// How well the rotor positions of a positioner are known.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KnowledgeDegree {
    /// Both rotor angles known to within a step.
    #[default]
    Precise,
    /// Rotor angles known, but with a recovery uncertainty.
    Approximate,
    /// Rotor angles unknown; the barrier replaces the arm.
    Unknown,
}

/// Pipeline stage the margins are being evaluated for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Purpose {
    Allocation,
    Generation,
    #[default]
    Validation,
    Execution,
}

/// Independent margin sources (mm). All are non-negative.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpmComponents {
    /// Recovery margin, absorbing motion after a stop command.
    pub rec: f64,
    /// Static margin, absorbing position and orientation errors.
    pub sta: f64,
    /// Dynamic margin, absorbing timing shifts between positioners.
    pub dyn_: f64,
    /// Minimum margin, absorbing numerical and quantization error.
    pub min: f64,
    /// Offset margin, reserved for allocation.
    pub off: f64,
}

impl Default for SpmComponents {
    fn default() -> Self {
        Self {
            rec: 0.1,
            sta: 0.05,
            dyn_: 0.1,
            min: 0.05,
            off: 0.1,
        }
    }
}

impl SpmComponents {
    pub fn validate(&self) -> PositionerResult<()> {
        ensure_non_negative("SPMrec", self.rec)?;
        ensure_non_negative("SPMsta", self.sta)?;
        ensure_non_negative("SPMdyn", self.dyn_)?;
        ensure_non_negative("SPMmin", self.min)?;
        ensure_non_negative("SPMoff", self.off)
    }

    /// Composes the eight derived margins.
    ///
    /// Each level adds a non-negative term to the previous one, so every
    /// derived value is monotone in every component.
    pub fn derive(&self) -> SpmValues {
        let exe_p = self.sta + self.dyn_;
        let exe_a = self.rec + exe_p;
        let val_p = exe_p + self.min;
        let val_a = exe_a + self.min;
        let gen_p = val_p + self.min;
        let gen_a = val_a + self.min;
        SpmValues {
            exe_p,
            exe_a,
            val_p,
            val_a,
            gen_p,
            gen_a,
            all_p: gen_p + self.off,
            all_a: gen_a + self.off,
        }
    }
}

/// Derived margins; `_p` for precise knowledge, `_a` for approximate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpmValues {
    pub exe_p: f64,
    pub exe_a: f64,
    pub val_p: f64,
    pub val_a: f64,
    pub gen_p: f64,
    pub gen_a: f64,
    pub all_p: f64,
    pub all_a: f64,
}

impl SpmValues {
    pub fn as_array(&self) -> [f64; 8] {
        [
            self.exe_p, self.exe_a, self.val_p, self.val_a, self.gen_p, self.gen_a, self.all_p,
            self.all_a,
        ]
    }
}

/// Where the selected margin is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpmTarget {
    Arm,
    Barrier,
}

/// Picks the live margin for a knowledge degree and purpose.
pub fn select_spm(
    components: &SpmComponents,
    values: &SpmValues,
    knowledge: KnowledgeDegree,
    purpose: Purpose,
) -> (f64, SpmTarget) {
    use KnowledgeDegree::*;
    use Purpose::*;
    match (knowledge, purpose) {
        (Precise, Allocation) => (values.all_p, SpmTarget::Arm),
        (Precise, Generation) => (values.gen_p, SpmTarget::Arm),
        (Precise, Validation) => (values.val_p, SpmTarget::Arm),
        (Precise, Execution) => (values.exe_p, SpmTarget::Arm),
        (Approximate, Allocation) => (values.all_a, SpmTarget::Arm),
        (Approximate, Generation) => (values.gen_a, SpmTarget::Arm),
        (Approximate, Validation) => (values.val_a, SpmTarget::Arm),
        (Approximate, Execution) => (values.exe_a, SpmTarget::Arm),
        (Unknown, _) => (components.sta, SpmTarget::Barrier),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_chain() {
        let c = SpmComponents {
            rec: 1.0,
            sta: 2.0,
            dyn_: 3.0,
            min: 4.0,
            off: 5.0,
        };
        let v = c.derive();
        assert_eq!(v.exe_p, 5.0);
        assert_eq!(v.exe_a, 6.0);
        assert_eq!(v.val_p, 9.0);
        assert_eq!(v.val_a, 10.0);
        assert_eq!(v.gen_p, 13.0);
        assert_eq!(v.gen_a, 14.0);
        assert_eq!(v.all_p, 18.0);
        assert_eq!(v.all_a, 19.0);
    }

    #[test]
    fn test_unknown_targets_barrier() {
        let c = SpmComponents::default();
        let (spm, target) = select_spm(&c, &c.derive(), KnowledgeDegree::Unknown, Purpose::Allocation);
        assert_eq!(spm, c.sta);
        assert_eq!(target, SpmTarget::Barrier);
    }
}
