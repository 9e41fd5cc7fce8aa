use std::{fmt, iter::FusedIterator};

use rand::{
    distributions::{Distribution, WeightedIndex},
    rngs::StdRng,
    seq::SliceRandom,
    Rng, SeedableRng,
};
use serde::{Deserialize, Serialize};

use crate::{
    config::{CurriculumConfig, DEFAULT_SEED},
    data::{BatchSource, PairBatchLoader},
    scheduler::{Phase, PhaseSchedule, WeightVector},
    CurriculumError, Result,
};

/// Identifies one of the three curriculum sources, numbered 1 to 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceId {
    One,
    Two,
    Three,
}

impl SourceId {
    pub const ALL: [SourceId; 3] = [SourceId::One, SourceId::Two, SourceId::Three];

    pub fn index(self) -> usize {
        match self {
            SourceId::One => 0,
            SourceId::Two => 1,
            SourceId::Three => 2,
        }
    }

    pub fn number(self) -> u8 {
        self.index() as u8 + 1
    }

    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            1 => Some(SourceId::One),
            2 => Some(SourceId::Two),
            3 => Some(SourceId::Three),
            _ => None,
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// How a replacement source is picked after the chosen one turns out empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Uniform over all three ids, exhausted or not. An exhausted pick fails
    /// over again immediately.
    #[default]
    Uniform,
    /// Uniform over the sources not yet marked exhausted.
    LiveOnly,
}

#[derive(Debug, Clone)]
pub struct InterleaveOptions {
    pub seed: u64,
    pub schedule: PhaseSchedule,
    pub fallback: FallbackPolicy,
}

impl InterleaveOptions {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }
}

impl Default for InterleaveOptions {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            schedule: PhaseSchedule::soft(),
            fallback: FallbackPolicy::default(),
        }
    }
}

/// Audit trail of a run.
///
/// `planned` holds the weighted draw of every step that started, `attempts`
/// every source tried including failed and fallback tries, and `yielded` the
/// source of each batch handed out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChoiceLog {
    planned: Vec<SourceId>,
    attempts: Vec<SourceId>,
    yielded: Vec<SourceId>,
}

impl ChoiceLog {
    pub fn planned(&self) -> &[SourceId] {
        &self.planned
    }

    pub fn attempts(&self) -> &[SourceId] {
        &self.attempts
    }

    pub fn yielded(&self) -> &[SourceId] {
        &self.yielded
    }

    /// Attempts that did not produce a batch.
    pub fn failed_attempts(&self) -> usize {
        self.attempts.len() - self.yielded.len()
    }
}

/// A yielded batch together with the decision that produced it.
#[derive(Debug, Clone)]
pub struct Draw<B> {
    pub step: usize,
    pub phase: Phase,
    pub weights: WeightVector,
    pub planned: SourceId,
    pub source: SourceId,
    pub fallbacks: usize,
    pub batch: B,
}

/// Lazily merges three batch sources under the curriculum weights.
///
/// Every batch of every source is yielded exactly once and each source keeps
/// its own order. The sequence ends once all three sources are exhausted and
/// stays ended.
pub struct CurriculumInterleaver<S>
where
    S: BatchSource,
{
    sources: [S; 3],
    exhausted: [bool; 3],
    schedule: PhaseSchedule,
    distributions: [WeightedIndex<f64>; 3],
    fallback: FallbackPolicy,
    rng: StdRng,
    total_steps: usize,
    step: usize,
    log: ChoiceLog,
    finished: bool,
}

/// Builds an interleaver over three sources in curriculum order.
pub fn interleave<S>(
    source1: S,
    source2: S,
    source3: S,
    options: InterleaveOptions,
) -> Result<CurriculumInterleaver<S>>
where
    S: BatchSource,
{
    CurriculumInterleaver::new([source1, source2, source3], options)
}

impl<S> CurriculumInterleaver<S>
where
    S: BatchSource,
{
    pub fn new(sources: [S; 3], options: InterleaveOptions) -> Result<Self> {
        let empty: Vec<String> = SourceId::ALL
            .iter()
            .filter(|id| sources[id.index()].is_empty())
            .map(|id| id.to_string())
            .collect();
        if !empty.is_empty() {
            return Err(CurriculumError::invalid_argument(format!(
                "source(s) {} have no batches",
                empty.join(", ")
            )));
        }

        let total_steps = sources.iter().map(BatchSource::len).sum();

        let schedule = options.schedule;
        let distribution = |phase: Phase| {
            WeightedIndex::new(schedule.phase_weights(phase)).map_err(|err| {
                CurriculumError::invalid_argument(format!(
                    "{} phase weights cannot be sampled: {}",
                    phase, err
                ))
            })
        };
        let distributions = [
            distribution(Phase::Early)?,
            distribution(Phase::Middle)?,
            distribution(Phase::Late)?,
        ];

        Ok(Self {
            sources,
            exhausted: [false; 3],
            schedule,
            distributions,
            fallback: options.fallback,
            rng: StdRng::seed_from_u64(options.seed),
            total_steps,
            step: 0,
            log: ChoiceLog::default(),
            finished: false,
        })
    }

    /// Sum of the announced source lengths; fixes the phase boundaries.
    pub fn total_steps(&self) -> usize {
        self.total_steps
    }

    /// Number of batches yielded so far.
    pub fn steps_taken(&self) -> usize {
        self.step
    }

    pub fn schedule(&self) -> &PhaseSchedule {
        &self.schedule
    }

    pub fn fallback_policy(&self) -> FallbackPolicy {
        self.fallback
    }

    pub fn source(&self, id: SourceId) -> &S {
        &self.sources[id.index()]
    }

    pub fn is_exhausted(&self, id: SourceId) -> bool {
        self.exhausted[id.index()]
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn choice_log(&self) -> &ChoiceLog {
        &self.log
    }

    pub fn into_choice_log(self) -> ChoiceLog {
        self.log
    }

    /// Advances one step and reports how the batch was chosen.
    pub fn next_draw(&mut self) -> Option<Draw<S::Batch>> {
        if self.finished {
            return None;
        }

        let step = self.step;
        let phase = Phase::for_step(step, self.total_steps);
        let weights = self.schedule.phase_weights(phase);
        let planned = SourceId::ALL[self.distributions[phase.index()].sample(&mut self.rng)];
        self.log.planned.push(planned);

        let mut choice = planned;
        let mut fallbacks = 0;
        loop {
            self.log.attempts.push(choice);

            let slot = choice.index();
            if !self.exhausted[slot] {
                if let Some(batch) = self.sources[slot].try_next() {
                    self.log.yielded.push(choice);
                    self.step += 1;
                    return Some(Draw {
                        step,
                        phase,
                        weights,
                        planned,
                        source: choice,
                        fallbacks,
                        batch,
                    });
                }
                self.exhausted[slot] = true;
            }

            choice = match self.fallback_choice() {
                Some(next) => next,
                None => {
                    self.finished = true;
                    return None;
                }
            };
            fallbacks += 1;
        }
    }

    fn fallback_choice(&mut self) -> Option<SourceId> {
        if self.exhausted.iter().all(|done| *done) {
            return None;
        }
        match self.fallback {
            FallbackPolicy::Uniform => {
                let slot = self.rng.gen_range(0..SourceId::ALL.len());
                Some(SourceId::ALL[slot])
            }
            FallbackPolicy::LiveOnly => {
                let live: Vec<SourceId> = SourceId::ALL
                    .into_iter()
                    .filter(|id| !self.exhausted[id.index()])
                    .collect();
                live.choose(&mut self.rng).copied()
            }
        }
    }
}

impl CurriculumInterleaver<PairBatchLoader> {
    /// Loads the three configured corpora and wires them up with the
    /// configured schedule, fallback policy and seed.
    pub fn from_config(config: &CurriculumConfig) -> Result<Self> {
        let [first, second, third] = config.open_sources()?;
        interleave(first, second, third, config.interleave_options())
    }
}

impl<S> Iterator for CurriculumInterleaver<S>
where
    S: BatchSource,
{
    type Item = S::Batch;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_draw().map(|draw| draw.batch)
    }
}

impl<S> FusedIterator for CurriculumInterleaver<S> where S: BatchSource {}

impl<S> fmt::Debug for CurriculumInterleaver<S>
where
    S: BatchSource,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurriculumInterleaver")
            .field("total_steps", &self.total_steps)
            .field("step", &self.step)
            .field("exhausted", &self.exhausted)
            .field("fallback", &self.fallback)
            .field("finished", &self.finished)
            .finish()
    }
}
