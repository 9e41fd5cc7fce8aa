use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use simplification_data::{ParallelCorpus, TierPair};

use crate::{
    data::PairBatchLoader,
    interleave::{FallbackPolicy, InterleaveOptions},
    scheduler::{PhaseSchedule, ScheduleKind},
    CurriculumError, Result,
};

pub const DEFAULT_SEED: u64 = 540;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurriculumConfig {
    pub data: DataConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl CurriculumConfig {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)?;
        let mut config: CurriculumConfig = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::from_str(&contents)?,
            Some("toml") | None => toml::from_str(&contents)?,
            Some(other) => {
                return Err(CurriculumError::ConfigFormat(format!(
                    "unsupported configuration extension '{}'",
                    other
                )));
            }
        };

        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        config.apply_base_path(base_dir);
        config.validate()?;

        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_path(path)
    }

    /// The three tier pairs in curriculum order, read from the standard
    /// `dataset/<PAIR>/<TIER>.txt` layout under `base`.
    pub fn with_default_layout(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        let sources = TierPair::CURRICULUM
            .into_iter()
            .map(|pair| {
                let (source, target) = pair.default_paths(base);
                SourceConfig {
                    pair,
                    source,
                    target,
                }
            })
            .collect();

        Self {
            data: DataConfig {
                sources,
                batch_size: default_batch_size(),
                shuffle: default_shuffle(),
            },
            schedule: ScheduleConfig::default(),
            runtime: RuntimeConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.data.sources.len() != 3 {
            errors.push(format!(
                "data.sources must list exactly 3 tier pairs (got {})",
                self.data.sources.len()
            ));
        }

        for (idx, source) in self.data.sources.iter().enumerate() {
            if source.source.as_os_str().is_empty() {
                errors.push(format!("data.sources[{}].source must not be empty", idx));
            }
            if source.target.as_os_str().is_empty() {
                errors.push(format!("data.sources[{}].target must not be empty", idx));
            }
            if self.data.sources[..idx]
                .iter()
                .any(|earlier| earlier.pair == source.pair)
            {
                errors.push(format!(
                    "data.sources[{}] repeats tier pair '{}'",
                    idx,
                    source.pair.key()
                ));
            } else if source.pair.curriculum_slot() as usize != idx + 1 {
                errors.push(format!(
                    "data.sources[{}] holds tier pair '{}' but curriculum slot {} expects '{}'",
                    idx,
                    source.pair.key(),
                    idx + 1,
                    TierPair::CURRICULUM
                        .get(idx)
                        .map(|pair| pair.key())
                        .unwrap_or("none")
                ));
            }
        }

        if self.data.batch_size == 0 {
            errors.push("data.batch_size must be greater than 0".to_string());
        }

        if self.runtime.log_every_n_steps == 0 {
            errors.push("runtime.log_every_n_steps must be greater than 0".to_string());
        }

        if self.runtime.logging.tensorboard_flush_every_n == 0 {
            errors.push("runtime.logging.tensorboard_flush_every_n must be greater than 0".to_string());
        }

        if let Some(path) = &self.runtime.choice_log {
            if path.as_os_str().is_empty() {
                errors.push("runtime.choice_log must not be empty".to_string());
            }
        }

        if !errors.is_empty() {
            return Err(CurriculumError::validation(errors));
        }

        Ok(())
    }

    fn apply_base_path(&mut self, base: &Path) {
        self.data.apply_base_path(base);
        self.runtime.apply_base_path(base);
    }

    pub fn interleave_options(&self) -> InterleaveOptions {
        InterleaveOptions {
            seed: self.runtime.seed,
            schedule: PhaseSchedule::from(self.schedule.kind),
            fallback: self.schedule.fallback,
        }
    }

    /// Loads each configured corpus and wraps it in a batch loader, in the
    /// configured order.
    pub fn open_sources(&self) -> Result<[PairBatchLoader; 3]> {
        self.validate()?;
        self.ensure_prerequisites()?;

        let mut loaders = Vec::with_capacity(3);
        for source in &self.data.sources {
            let corpus = ParallelCorpus::load(&source.source, &source.target)?;
            loaders.push(PairBatchLoader::new(
                corpus,
                source.pair,
                self.data.batch_size,
                self.data.shuffle,
                self.runtime.seed,
            )?);
        }

        loaders.try_into().map_err(|_: Vec<PairBatchLoader>| {
            CurriculumError::validation(vec!["data.sources must list exactly 3 tier pairs".into()])
        })
    }

    fn ensure_prerequisites(&self) -> Result<()> {
        let mut missing = Vec::new();

        for (idx, source) in self.data.sources.iter().enumerate() {
            if !source.source.is_file() {
                missing.push(format!(
                    "data.sources[{}].source ({})",
                    idx,
                    source.source.display()
                ));
            }
            if !source.target.is_file() {
                missing.push(format!(
                    "data.sources[{}].target ({})",
                    idx,
                    source.target.display()
                ));
            }
        }

        if !missing.is_empty() {
            return Err(CurriculumError::invalid_argument(format!(
                "missing dataset files: {}",
                missing.join(", ")
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub sources: Vec<SourceConfig>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_shuffle")]
    pub shuffle: bool,
}

impl DataConfig {
    fn apply_base_path(&mut self, base: &Path) {
        for source in &mut self.sources {
            absolutize_in_place(&mut source.source, base);
            absolutize_in_place(&mut source.target, base);
        }
    }
}

/// One difficulty-paired dataset: aligned source and target sentence files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub pair: TierPair,
    pub source: PathBuf,
    pub target: PathBuf,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default)]
    pub kind: ScheduleKind,
    #[serde(default)]
    pub fallback: FallbackPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_log_every_n_steps")]
    pub log_every_n_steps: usize,
    #[serde(default)]
    pub choice_log: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            log_every_n_steps: default_log_every_n_steps(),
            choice_log: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl RuntimeConfig {
    fn apply_base_path(&mut self, base: &Path) {
        if let Some(path) = self.choice_log.as_mut() {
            absolutize_in_place(path, base);
        }
        if let Some(dir) = self.logging.tensorboard.as_mut() {
            absolutize_in_place(dir, base);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_enable_stdout")]
    pub enable_stdout: bool,
    #[serde(default)]
    pub tensorboard: Option<PathBuf>,
    #[serde(default = "default_tensorboard_flush_every_n")]
    pub tensorboard_flush_every_n: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_stdout: default_enable_stdout(),
            tensorboard: None,
            tensorboard_flush_every_n: default_tensorboard_flush_every_n(),
        }
    }
}

fn absolutize_in_place(path: &mut PathBuf, base: &Path) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}

fn default_batch_size() -> usize {
    4
}

fn default_shuffle() -> bool {
    true
}

fn default_seed() -> u64 {
    DEFAULT_SEED
}

fn default_log_every_n_steps() -> usize {
    10
}

fn default_enable_stdout() -> bool {
    true
}

fn default_tensorboard_flush_every_n() -> usize {
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const MINIMAL: &str = r#"
[[data.sources]]
pair = "ele_int"
source = "ELE_INT/ELE.txt"
target = "ELE_INT/INT.txt"

[[data.sources]]
pair = "int_adv"
source = "ADV_INT/INT.txt"
target = "ADV_INT/ADV.txt"

[[data.sources]]
pair = "ele_adv"
source = "ADV_ELE/ELE.txt"
target = "ADV_ELE/ADV.txt"
"#;

    #[test]
    fn minimal_toml_gets_defaults_and_absolute_paths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("curriculum.toml");
        fs::write(&path, MINIMAL).unwrap();

        let config = CurriculumConfig::load(&path).unwrap();
        assert_eq!(config.data.batch_size, 4);
        assert!(config.data.shuffle);
        assert_eq!(config.runtime.seed, DEFAULT_SEED);
        assert_eq!(config.runtime.log_every_n_steps, 10);
        assert_eq!(config.schedule.kind, ScheduleKind::Soft);
        assert_eq!(config.schedule.fallback, FallbackPolicy::Uniform);
        assert_eq!(
            config.data.sources[1].target,
            dir.path().join("ADV_INT/ADV.txt")
        );
    }

    #[test]
    fn json_config_is_accepted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("curriculum.json");
        let config = CurriculumConfig::with_default_layout("/data");
        let mut value = serde_json::to_value(&config).unwrap();
        value["schedule"]["fallback"] = serde_json::Value::String("live_only".into());
        value["schedule"]["kind"] = serde_json::Value::String("hard".into());
        fs::write(&path, value.to_string()).unwrap();

        let loaded = CurriculumConfig::load(&path).unwrap();
        assert_eq!(loaded.schedule.fallback, FallbackPolicy::LiveOnly);
        assert_eq!(loaded.interleave_options().schedule, PhaseSchedule::hard());
        assert_eq!(
            loaded.data.sources[2].source,
            PathBuf::from("/data/dataset/ADV_ELE/ELE.txt")
        );
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("curriculum.yaml");
        fs::write(&path, MINIMAL).unwrap();
        assert!(matches!(
            CurriculumConfig::load(&path),
            Err(CurriculumError::ConfigFormat(_))
        ));
    }

    #[test]
    fn validation_collects_every_problem() {
        let mut config = CurriculumConfig::with_default_layout(".");
        config.data.sources.pop();
        config.data.sources[1].pair = TierPair::ElementaryIntermediate;
        config.data.batch_size = 0;
        config.runtime.log_every_n_steps = 0;

        match config.validate() {
            Err(CurriculumError::Validation(messages)) => {
                assert_eq!(messages.len(), 4, "{:?}", messages);
                assert!(messages[0].contains("exactly 3"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn sources_must_follow_curriculum_order() {
        let mut config = CurriculumConfig::with_default_layout(".");
        config.data.sources.swap(0, 2);

        match config.validate() {
            Err(CurriculumError::Validation(messages)) => {
                assert_eq!(messages.len(), 2, "{:?}", messages);
                assert!(messages[0].contains("data.sources[0] holds tier pair 'ele_adv'"));
                assert!(messages[1].contains("curriculum slot 3 expects 'ele_adv'"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn missing_dataset_files_are_listed() {
        let dir = tempdir().unwrap();
        let config = CurriculumConfig::with_default_layout(dir.path());
        let err = config.open_sources().unwrap_err();
        match err {
            CurriculumError::InvalidArgument(msg) => {
                assert!(msg.contains("data.sources[0].source"));
                assert!(msg.contains("data.sources[2].target"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
