use std::{
    path::PathBuf,
    str::FromStr,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use clap::Parser;
use curriculum::{
    ChoiceReport, CurriculumConfig, CurriculumError, CurriculumInterleaver, DrawStatistics,
    Logger, LoggingSettings,
};
use serde_json::{Map, Number, Value};

fn main() {
    if let Err(err) = run() {
        eprintln!("curriculum failed: {}", err);
        std::process::exit(1);
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Curriculum batch scheduler over three tier-pair datasets", long_about = None)]
struct Args {
    #[arg(
        short,
        long,
        value_name = "PATH",
        help = "Path to curriculum config file"
    )]
    config: PathBuf,

    #[arg(
        long = "override",
        value_name = "KEY=VALUE",
        help = "Override configuration value using dot-separated paths"
    )]
    overrides: Vec<OverrideArg>,

    #[arg(long, help = "Seed for the source sampler (overrides runtime.seed)")]
    seed: Option<u64>,
}

#[derive(Debug, Clone)]
struct OverrideArg {
    path: String,
    value: String,
}

impl FromStr for OverrideArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (path, value) = s
            .split_once('=')
            .ok_or_else(|| "override must be in the form key=value".to_string())?;
        if path.trim().is_empty() {
            return Err("override key must not be empty".into());
        }
        Ok(Self {
            path: path.trim().to_string(),
            value: value.trim().to_string(),
        })
    }
}

fn run() -> Result<(), CurriculumError> {
    let args = Args::parse();

    let mut config = CurriculumConfig::load(&args.config)?;
    if !args.overrides.is_empty() {
        config = apply_overrides(config, &args.overrides)?;
    }
    if let Some(seed) = args.seed {
        config.runtime.seed = seed;
    }
    config.validate()?;

    let mut interleaver = CurriculumInterleaver::from_config(&config)?;
    let mut logger = Logger::new(LoggingSettings::from_config(&config.runtime.logging))?;
    println!(
        "curriculum: {} steps over {} sources (seed={}, schedule={:?}, fallback={:?})",
        interleaver.total_steps(),
        config.data.sources.len(),
        config.runtime.seed,
        config.schedule.kind,
        config.schedule.fallback
    );

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let handler_flag = shutdown_flag.clone();
    ctrlc::set_handler(move || {
        handler_flag.store(true, Ordering::Relaxed);
    })
    .map_err(|err| CurriculumError::runtime(format!("failed to install signal handler: {err}")))?;

    let log_every = config.runtime.log_every_n_steps;
    let mut stats = DrawStatistics::new();
    let mut sentences = 0usize;
    while let Some(draw) = interleaver.next_draw() {
        stats.record(&draw);
        sentences += draw.batch.size();
        if draw.step % log_every == 0 {
            logger.log_draw(&draw);
        }
        if shutdown_flag.load(Ordering::Relaxed) {
            println!("interrupted after {} batches", interleaver.steps_taken());
            break;
        }
    }

    logger.log_summary(interleaver.choice_log(), &stats);
    logger.flush();
    println!(
        "curriculum: yielded {} batches ({} sentence pairs)",
        interleaver.steps_taken(),
        sentences
    );

    if let Some(path) = config.runtime.choice_log.as_ref() {
        let report = ChoiceReport::new(
            config.runtime.seed,
            interleaver.total_steps(),
            interleaver.choice_log(),
        );
        report.write_json(path)?;
        println!("saved choice log to {}", path.display());
    }

    Ok(())
}

fn apply_overrides(
    config: CurriculumConfig,
    overrides: &[OverrideArg],
) -> Result<CurriculumConfig, CurriculumError> {
    let mut value = serde_json::to_value(config).map_err(|err| {
        CurriculumError::runtime(format!("failed to serialize config for overrides: {err}"))
    })?;

    for override_arg in overrides {
        let segments: Vec<&str> = override_arg.path.split('.').collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(CurriculumError::runtime(format!(
                "invalid override path '{}'",
                override_arg.path
            )));
        }
        assign(&mut value, &segments, parse_override_value(&override_arg.value))?;
    }

    serde_json::from_value(value).map_err(|err| {
        CurriculumError::runtime(format!(
            "failed to deserialize config after overrides: {err}"
        ))
    })
}

fn parse_override_value(raw: &str) -> Value {
    let trimmed = raw.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }
    if let Ok(int_val) = trimmed.parse::<u64>() {
        return Value::Number(Number::from(int_val));
    }
    if let Some(number) = trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(number);
    }
    if trimmed.starts_with('[') || trimmed.starts_with('{') {
        if let Ok(json_val) = serde_json::from_str::<Value>(trimmed) {
            return json_val;
        }
    }
    Value::String(trimmed.to_string())
}

/// Walks `segments` through nested objects; numeric segments index arrays.
fn assign(target: &mut Value, segments: &[&str], new_value: Value) -> Result<(), CurriculumError> {
    let Some((head, rest)) = segments.split_first() else {
        *target = new_value;
        return Ok(());
    };

    if target.is_null() {
        *target = Value::Object(Map::new());
    }

    let slot = match target {
        Value::Array(items) => {
            let index = head.parse::<usize>().map_err(|_| {
                CurriculumError::runtime(format!("override segment '{}' must be an index", head))
            })?;
            items.get_mut(index).ok_or_else(|| {
                CurriculumError::runtime(format!("override index {} is out of range", index))
            })?
        }
        Value::Object(map) => map.entry(head.to_string()).or_insert(Value::Null),
        _ => {
            return Err(CurriculumError::runtime(format!(
                "override path segment '{}' points into a non-object value",
                head
            )))
        }
    };

    assign(slot, rest, new_value)
}
