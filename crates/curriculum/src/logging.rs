use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use bytes::BytesMut;
use crc32fast::Hasher as Crc32;
use prost::Message;

use crate::{
    config::LoggingConfig,
    interleave::{ChoiceLog, Draw, SourceId},
    metrics::DrawStatistics,
    scheduler::Phase,
    CurriculumError, Result,
};

#[derive(Clone, Debug)]
pub struct LoggingSettings {
    pub enable_stdout: bool,
    pub tensorboard_dir: Option<PathBuf>,
    pub tensorboard_flush_every_n: usize,
}

impl LoggingSettings {
    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            enable_stdout: config.enable_stdout,
            tensorboard_dir: config.tensorboard.clone(),
            tensorboard_flush_every_n: config.tensorboard_flush_every_n.max(1),
        }
    }

    pub fn quiet() -> Self {
        Self {
            enable_stdout: false,
            tensorboard_dir: None,
            tensorboard_flush_every_n: 1,
        }
    }
}

/// Reports curriculum draws to stdout and, optionally, a TensorBoard event file.
pub struct Logger {
    settings: LoggingSettings,
    tensorboard: Option<EventWriter>,
}

impl Logger {
    pub fn new(settings: LoggingSettings) -> Result<Self> {
        let tensorboard = match settings.tensorboard_dir.as_ref() {
            Some(dir) => Some(EventWriter::create(dir, settings.tensorboard_flush_every_n)?),
            None => None,
        };
        Ok(Self {
            settings,
            tensorboard,
        })
    }

    pub fn event_file(&self) -> Option<&Path> {
        self.tensorboard.as_ref().map(|writer| writer.path.as_path())
    }

    pub fn log_draw<B>(&mut self, draw: &Draw<B>) {
        if self.settings.enable_stdout {
            println!(
                "curriculum step={} phase={} weights=[{:.1}, {:.1}, {:.1}] planned={} source={} fallbacks={}",
                draw.step,
                draw.phase,
                draw.weights[0],
                draw.weights[1],
                draw.weights[2],
                draw.planned,
                draw.source,
                draw.fallbacks
            );
        }

        if let Some(writer) = self.tensorboard.as_mut() {
            let step = draw.step as i64;
            let _ = writer.write_scalar("curriculum/source", step, draw.source.number() as f64);
            let _ = writer.write_scalar("curriculum/fallbacks", step, draw.fallbacks as f64);
            let _ = writer.write_scalar("curriculum/phase", step, draw.phase.index() as f64);
            for id in SourceId::ALL {
                let tag = format!("curriculum/weight_{}", id.number());
                let _ = writer.write_scalar(&tag, step, draw.weights[id.index()]);
            }
        }
    }

    pub fn log_summary(&mut self, log: &ChoiceLog, stats: &DrawStatistics) {
        if self.settings.enable_stdout {
            println!(
                "curriculum done batches={} attempts={} failed_attempts={}",
                log.yielded().len(),
                log.attempts().len(),
                log.failed_attempts()
            );
            for phase in Phase::ALL {
                println!(
                    "  phase={} source1={} source2={} source3={}",
                    phase,
                    stats.phase_count(phase, SourceId::One),
                    stats.phase_count(phase, SourceId::Two),
                    stats.phase_count(phase, SourceId::Three)
                );
            }
            println!("  planned choices: {}", join_ids(log.planned()));
            println!("  actual choices: {}", join_ids(log.attempts()));
        }

        if let Some(writer) = self.tensorboard.as_mut() {
            let step = log.yielded().len() as i64;
            for id in SourceId::ALL {
                let tag = format!("curriculum/share_{}", id.number());
                let _ = writer.write_scalar(&tag, step, stats.share(id));
            }
        }
    }

    pub fn flush(&mut self) {
        if let Some(writer) = self.tensorboard.as_mut() {
            let _ = writer.flush();
        }
    }
}

fn join_ids(ids: &[SourceId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// TFRecord-framed event file: length, masked CRC of the length, payload,
/// masked CRC of the payload.
struct EventWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    flush_every: usize,
    pending: usize,
}

impl EventWriter {
    fn create(dir: &Path, flush_every: usize) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|err| {
            CurriculumError::runtime(format!(
                "failed to create tensorboard directory {}: {err}",
                dir.display()
            ))
        })?;
        let filename = format!(
            "events.out.tfevents.{}.{}",
            current_unix_timestamp(),
            hostname()
        );
        let path = dir.join(filename);
        let file = File::create(&path).map_err(|err| {
            CurriculumError::runtime(format!(
                "failed to create tensorboard file {}: {err}",
                path.display()
            ))
        })?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            flush_every: flush_every.max(1),
            pending: 0,
        })
    }

    fn write_scalar(&mut self, tag: &str, step: i64, value: f64) -> Result<()> {
        let event = Event {
            wall_time: current_wall_time(),
            step,
            summary: Some(Summary {
                value: vec![summary::Value {
                    tag: tag.to_string(),
                    simple_value: Some(value as f32),
                }],
            }),
        };

        let mut payload = BytesMut::with_capacity(event.encoded_len());
        event.encode(&mut payload).map_err(|err| {
            CurriculumError::runtime(format!("failed to encode tensorboard event: {err}"))
        })?;

        let len_bytes = (payload.len() as u64).to_le_bytes();
        let len_crc = masked_crc32(&len_bytes).to_le_bytes();
        let data_crc = masked_crc32(&payload).to_le_bytes();
        let frame: [&[u8]; 4] = [&len_bytes, &len_crc, &payload, &data_crc];
        for part in frame {
            self.writer.write_all(part).map_err(|err| {
                CurriculumError::runtime(format!("failed to write tensorboard event: {err}"))
            })?;
        }

        self.pending += 1;
        if self.pending >= self.flush_every {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(|err| {
            CurriculumError::runtime(format!("failed to flush tensorboard file: {err}"))
        })?;
        self.pending = 0;
        Ok(())
    }
}

impl Drop for EventWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

fn masked_crc32(data: &[u8]) -> u32 {
    let mut hasher = Crc32::new();
    hasher.update(data);
    let crc = hasher.finalize();
    ((crc >> 15) | (crc << 17)).wrapping_add(0xa282_ead8)
}

fn current_unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn current_wall_time() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|dur| dur.as_secs_f64())
        .unwrap_or(0.0)
}

fn hostname() -> String {
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "localhost".to_string())
}

#[derive(Clone, PartialEq, Message)]
struct Event {
    #[prost(double, tag = "1")]
    wall_time: f64,
    #[prost(int64, tag = "2")]
    step: i64,
    #[prost(message, optional, tag = "5")]
    summary: Option<Summary>,
}

#[derive(Clone, PartialEq, Message)]
struct Summary {
    #[prost(message, repeated, tag = "1")]
    value: Vec<summary::Value>,
}

mod summary {
    use prost::Message;

    #[derive(Clone, PartialEq, Message)]
    pub struct Value {
        #[prost(string, tag = "1")]
        pub tag: String,
        #[prost(float, optional, tag = "2")]
        pub simple_value: Option<f32>,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::VecSource;
    use crate::interleave::{CurriculumInterleaver, InterleaveOptions};
    use tempfile::tempdir;

    fn read_frames(bytes: &[u8]) -> Vec<Event> {
        let mut events = Vec::new();
        let mut cursor = 0;
        while cursor < bytes.len() {
            let len_bytes: [u8; 8] = bytes[cursor..cursor + 8].try_into().unwrap();
            let len_crc = u32::from_le_bytes(bytes[cursor + 8..cursor + 12].try_into().unwrap());
            assert_eq!(len_crc, masked_crc32(&len_bytes));

            let len = u64::from_le_bytes(len_bytes) as usize;
            let start = cursor + 12;
            let payload = &bytes[start..start + len];
            let data_crc =
                u32::from_le_bytes(bytes[start + len..start + len + 4].try_into().unwrap());
            assert_eq!(data_crc, masked_crc32(payload));

            events.push(Event::decode(payload).unwrap());
            cursor = start + len + 4;
        }
        events
    }

    #[test]
    fn writes_framed_scalar_events() {
        let dir = tempdir().unwrap();
        let settings = LoggingSettings {
            enable_stdout: false,
            tensorboard_dir: Some(dir.path().join("runs")),
            tensorboard_flush_every_n: 1,
        };
        let mut logger = Logger::new(settings).unwrap();

        let sources = [1usize, 1, 1].map(|len| VecSource::from(vec![0u8; len]));
        let mut interleaver =
            CurriculumInterleaver::new(sources, InterleaveOptions::seeded(1)).unwrap();
        let mut stats = DrawStatistics::new();
        while let Some(draw) = interleaver.next_draw() {
            stats.record(&draw);
            logger.log_draw(&draw);
        }
        logger.log_summary(interleaver.choice_log(), &stats);
        logger.flush();

        let path = logger.event_file().unwrap().to_path_buf();
        let events = read_frames(&fs::read(path).unwrap());
        // Six scalars per draw plus three shares.
        assert_eq!(events.len(), 3 * 6 + 3);

        let first = events[0].summary.as_ref().unwrap();
        assert_eq!(first.value[0].tag, "curriculum/source");
        assert_eq!(events[0].step, 0);

        let last = events.last().unwrap().summary.as_ref().unwrap();
        assert_eq!(last.value[0].tag, "curriculum/share_3");
    }

    #[test]
    fn quiet_logger_has_no_event_file() {
        let logger = Logger::new(LoggingSettings::quiet()).unwrap();
        assert!(logger.event_file().is_none());
    }

    #[test]
    fn settings_clamp_flush_interval() {
        let config = LoggingConfig {
            enable_stdout: true,
            tensorboard: None,
            tensorboard_flush_every_n: 0,
        };
        assert_eq!(LoggingSettings::from_config(&config).tensorboard_flush_every_n, 1);
    }
}
