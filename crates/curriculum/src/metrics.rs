use std::{fs, path::Path};

use serde::Serialize;

use crate::{
    interleave::{ChoiceLog, Draw, SourceId},
    scheduler::Phase,
    CurriculumError, Result,
};

/// Running tallies of where batches came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DrawStatistics {
    per_source: [usize; 3],
    per_phase: [[usize; 3]; 3],
    fallbacks: usize,
    draws: usize,
}

impl DrawStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record<B>(&mut self, draw: &Draw<B>) {
        self.tally(draw.phase, draw.source);
        self.fallbacks += draw.fallbacks;
    }

    /// Rebuilds the tallies from a finished log. `total_steps` must be the
    /// run's step budget so yields can be attributed to phases.
    pub fn from_choice_log(log: &ChoiceLog, total_steps: usize) -> Self {
        let mut stats = Self::default();
        for (step, source) in log.yielded().iter().enumerate() {
            stats.tally(Phase::for_step(step, total_steps), *source);
        }
        stats.fallbacks = log.failed_attempts();
        stats
    }

    fn tally(&mut self, phase: Phase, source: SourceId) {
        self.per_source[source.index()] += 1;
        self.per_phase[phase.index()][source.index()] += 1;
        self.draws += 1;
    }

    pub fn draws(&self) -> usize {
        self.draws
    }

    pub fn fallbacks(&self) -> usize {
        self.fallbacks
    }

    pub fn yielded(&self, source: SourceId) -> usize {
        self.per_source[source.index()]
    }

    pub fn phase_count(&self, phase: Phase, source: SourceId) -> usize {
        self.per_phase[phase.index()][source.index()]
    }

    /// Fraction of all yielded batches that came from `source`.
    pub fn share(&self, source: SourceId) -> f64 {
        if self.draws == 0 {
            0.0
        } else {
            self.yielded(source) as f64 / self.draws as f64
        }
    }

    /// Source with the most yields in `phase`; ties go to the lower id.
    pub fn dominant_source(&self, phase: Phase) -> Option<SourceId> {
        let counts = self.per_phase[phase.index()];
        let best = SourceId::ALL
            .into_iter()
            .fold(None::<SourceId>, |best, id| match best {
                Some(current) if counts[current.index()] >= counts[id.index()] => Some(current),
                _ => Some(id),
            })?;
        if counts[best.index()] == 0 {
            None
        } else {
            Some(best)
        }
    }
}

/// JSON report written at the end of a run.
#[derive(Debug, Clone, Serialize)]
pub struct ChoiceReport {
    pub seed: u64,
    pub total_steps: usize,
    pub batches: usize,
    pub fallbacks: usize,
    pub per_source: [usize; 3],
    pub planned: Vec<u8>,
    pub attempts: Vec<u8>,
    pub yielded: Vec<u8>,
}

impl ChoiceReport {
    pub fn new(seed: u64, total_steps: usize, log: &ChoiceLog) -> Self {
        let numbers = |ids: &[SourceId]| ids.iter().map(|id| id.number()).collect::<Vec<_>>();
        let stats = DrawStatistics::from_choice_log(log, total_steps);
        Self {
            seed,
            total_steps,
            batches: log.yielded().len(),
            fallbacks: log.failed_attempts(),
            per_source: SourceId::ALL.map(|id| stats.yielded(id)),
            planned: numbers(log.planned()),
            attempts: numbers(log.attempts()),
            yielded: numbers(log.yielded()),
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_string_pretty(self).map_err(|err| {
            CurriculumError::runtime(format!("failed to encode choice report: {err}"))
        })?;
        fs::write(path, contents).map_err(|err| {
            CurriculumError::runtime(format!(
                "failed to write choice report {}: {err}",
                path.display()
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::VecSource;
    use crate::interleave::{CurriculumInterleaver, InterleaveOptions};

    fn drained(
        lengths: [usize; 3],
        seed: u64,
    ) -> (DrawStatistics, CurriculumInterleaver<VecSource<u32>>) {
        let sources = lengths.map(|len| VecSource::from((0..len as u32).collect::<Vec<_>>()));
        let mut interleaver =
            CurriculumInterleaver::new(sources, InterleaveOptions::seeded(seed)).unwrap();
        let mut stats = DrawStatistics::new();
        while let Some(draw) = interleaver.next_draw() {
            stats.record(&draw);
        }
        (stats, interleaver)
    }

    #[test]
    fn incremental_and_rebuilt_tallies_agree() {
        let (stats, interleaver) = drained([6, 9, 4], 17);
        let rebuilt =
            DrawStatistics::from_choice_log(interleaver.choice_log(), interleaver.total_steps());
        for phase in Phase::ALL {
            for id in SourceId::ALL {
                assert_eq!(stats.phase_count(phase, id), rebuilt.phase_count(phase, id));
            }
        }
        // The rebuilt count also covers the failed tries of the final step.
        assert!(rebuilt.fallbacks() >= stats.fallbacks());
        assert_eq!(stats.draws(), rebuilt.draws());
        assert_eq!(stats.draws(), 19);
        assert_eq!(stats.yielded(SourceId::One), 6);
        assert_eq!(stats.yielded(SourceId::Two), 9);
        assert_eq!(stats.yielded(SourceId::Three), 4);
    }

    #[test]
    fn shares_sum_to_one() {
        let (stats, _) = drained([5, 5, 5], 2);
        let total: f64 = SourceId::ALL.iter().map(|id| stats.share(*id)).sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert_eq!(DrawStatistics::new().share(SourceId::One), 0.0);
    }

    #[test]
    fn early_and_middle_phases_favor_their_source() {
        let (stats, _) = drained([200, 200, 200], 540);
        assert_eq!(stats.dominant_source(Phase::Early), Some(SourceId::One));
        assert_eq!(stats.dominant_source(Phase::Middle), Some(SourceId::Two));
        assert_eq!(DrawStatistics::new().dominant_source(Phase::Late), None);
    }

    #[test]
    fn report_serializes_numbers() {
        let (_, interleaver) = drained([2, 2, 2], 5);
        let report = ChoiceReport::new(5, interleaver.total_steps(), interleaver.choice_log());
        assert_eq!(report.batches, 6);
        assert_eq!(report.per_source, [2, 2, 2]);
        assert_eq!(report.attempts.len(), report.batches + report.fallbacks);
        assert!(report.yielded.iter().all(|n| (1..=3).contains(n)));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log").join("choices.json");
        report.write_json(&path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["batches"], 6);
        assert_eq!(value["seed"], 5);
    }
}
