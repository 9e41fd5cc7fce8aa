pub mod config;
pub mod data;
mod error;
pub mod interleave;
pub mod logging;
pub mod metrics;
pub mod scheduler;

pub use config::CurriculumConfig;
pub use data::{BatchSource, IterSource, PairBatchLoader, SentencePairBatch, VecSource};
pub use error::{CurriculumError, Result};
pub use interleave::{
    interleave, ChoiceLog, CurriculumInterleaver, Draw, FallbackPolicy, InterleaveOptions,
    SourceId,
};
pub use logging::{Logger, LoggingSettings};
pub use metrics::{ChoiceReport, DrawStatistics};
pub use scheduler::{weights_for, Phase, PhaseSchedule, ScheduleKind, WeightVector};
