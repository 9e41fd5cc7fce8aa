//! Piecewise-constant sampling weights over the three curriculum phases.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CurriculumError, Result};

/// Relative sampling weights for sources 1, 2 and 3.
pub type WeightVector = [f64; 3];

/// Default table: each phase favors one source without excluding the others.
pub const SOFT_WEIGHTS: [WeightVector; 3] = [[0.7, 0.2, 0.1], [0.1, 0.7, 0.2], [0.2, 0.1, 0.7]];

/// Strict table: each phase draws from a single source.
pub const HARD_WEIGHTS: [WeightVector; 3] = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// Weight vector for step `i` of a run of `n` steps under the default table.
pub fn weights_for(i: i64, n: usize) -> Result<WeightVector> {
    PhaseSchedule::soft().weights_for(i, n)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Early,
    Middle,
    Late,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Early, Phase::Middle, Phase::Late];

    /// Boundaries sit at `total / 3` and `2 * total / 3` (floor division).
    /// Steps past `total` stay in the last phase.
    pub fn for_step(step: usize, total: usize) -> Self {
        let middle_start = total / 3;
        let late_start = 2 * total / 3;

        if step == 0 {
            Phase::Early
        } else if step < middle_start {
            Phase::Early
        } else if step < late_start {
            Phase::Middle
        } else {
            Phase::Late
        }
    }

    pub fn index(self) -> usize {
        match self {
            Phase::Early => 0,
            Phase::Middle => 1,
            Phase::Late => 2,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Early => "early",
            Phase::Middle => "middle",
            Phase::Late => "late",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleKind {
    #[default]
    Soft,
    Hard,
}

/// One weight vector per phase. Pure: holds no per-run state.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSchedule {
    table: [WeightVector; 3],
}

impl PhaseSchedule {
    pub fn soft() -> Self {
        Self {
            table: SOFT_WEIGHTS,
        }
    }

    pub fn hard() -> Self {
        Self {
            table: HARD_WEIGHTS,
        }
    }

    /// Custom table. Every weight must be finite and non-negative and every
    /// row needs at least one positive entry.
    pub fn from_table(table: [WeightVector; 3]) -> Result<Self> {
        for (phase, row) in Phase::ALL.iter().zip(table.iter()) {
            if row.iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err(CurriculumError::invalid_argument(format!(
                    "{} phase weights must be finite and non-negative (got {:?})",
                    phase, row
                )));
            }
            if row.iter().all(|w| *w == 0.0) {
                return Err(CurriculumError::invalid_argument(format!(
                    "{} phase weights must not all be zero",
                    phase
                )));
            }
        }
        Ok(Self { table })
    }

    pub fn phase_weights(&self, phase: Phase) -> WeightVector {
        self.table[phase.index()]
    }

    /// Infallible lookup for callers that already hold a valid step index.
    pub fn weights_at(&self, step: usize, total: usize) -> WeightVector {
        self.phase_weights(Phase::for_step(step, total))
    }

    pub fn weights_for(&self, i: i64, n: usize) -> Result<WeightVector> {
        if i < 0 {
            return Err(CurriculumError::invalid_argument(format!(
                "step index must be non-negative (got {})",
                i
            )));
        }
        if n == 0 {
            return Err(CurriculumError::invalid_argument(
                "total step count must be greater than zero",
            ));
        }
        let step = usize::try_from(i).map_err(|_| {
            CurriculumError::invalid_argument(format!("step index {} does not fit in usize", i))
        })?;
        Ok(self.weights_at(step, n))
    }
}

impl Default for PhaseSchedule {
    fn default() -> Self {
        Self::soft()
    }
}

impl From<ScheduleKind> for PhaseSchedule {
    fn from(kind: ScheduleKind) -> Self {
        match kind {
            ScheduleKind::Soft => Self::soft(),
            ScheduleKind::Hard => Self::hard(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EARLY: WeightVector = [0.7, 0.2, 0.1];
    const MIDDLE: WeightVector = [0.1, 0.7, 0.2];
    const LATE: WeightVector = [0.2, 0.1, 0.7];

    #[test]
    fn phases_partition_every_run_length() {
        for n in 3..200usize {
            for i in 0..(n + 10) {
                let weights = weights_for(i as i64, n).unwrap();
                let expected = if i < n / 3 {
                    EARLY
                } else if i < 2 * n / 3 {
                    MIDDLE
                } else {
                    LATE
                };
                assert_eq!(weights, expected, "step {} of {}", i, n);
            }
        }
    }

    #[test]
    fn nine_step_boundaries() {
        let phases: Vec<Phase> = (0..9).map(|i| Phase::for_step(i, 9)).collect();
        assert_eq!(
            phases,
            vec![
                Phase::Early,
                Phase::Early,
                Phase::Early,
                Phase::Middle,
                Phase::Middle,
                Phase::Middle,
                Phase::Late,
                Phase::Late,
                Phase::Late,
            ]
        );
    }

    #[test]
    fn step_zero_is_early_even_for_tiny_runs() {
        for n in 1..3 {
            assert_eq!(weights_for(0, n).unwrap(), EARLY);
            assert_eq!(weights_for(1, n).unwrap(), LATE);
        }
    }

    #[test]
    fn far_past_the_end_stays_late() {
        assert_eq!(weights_for(1_000_000, 21).unwrap(), LATE);
    }

    #[test]
    fn negative_step_is_rejected() {
        for n in [1usize, 9, 21, 1000] {
            assert!(matches!(
                weights_for(-1, n),
                Err(CurriculumError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn zero_total_is_rejected() {
        assert!(matches!(
            weights_for(0, 0),
            Err(CurriculumError::InvalidArgument(_))
        ));
    }

    #[test]
    fn hard_table_isolates_one_source_per_phase() {
        let schedule = PhaseSchedule::from(ScheduleKind::Hard);
        assert_eq!(schedule.weights_for(0, 9).unwrap(), [1.0, 0.0, 0.0]);
        assert_eq!(schedule.weights_for(4, 9).unwrap(), [0.0, 1.0, 0.0]);
        assert_eq!(schedule.weights_for(8, 9).unwrap(), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn custom_tables_are_validated() {
        assert!(PhaseSchedule::from_table([[1.0, 0.0, 0.0]; 3]).is_ok());
        assert!(PhaseSchedule::from_table([[0.0; 3], [1.0; 3], [1.0; 3]]).is_err());
        assert!(PhaseSchedule::from_table([[-0.1, 1.0, 1.0], [1.0; 3], [1.0; 3]]).is_err());
        assert!(PhaseSchedule::from_table([[f64::NAN, 1.0, 1.0], [1.0; 3], [1.0; 3]]).is_err());
    }
}
