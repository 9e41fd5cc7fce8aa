use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

/// One aligned sentence and its rewrite at another difficulty tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentencePair {
    pub source: String,
    pub target: String,
}

impl SentencePair {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Line-aligned parallel corpus held in memory.
///
/// Line `k` of the source file is paired with line `k` of the target file.
/// Lines are trimmed; positions where both sides are blank are dropped.
#[derive(Clone, Debug, Default)]
pub struct ParallelCorpus {
    pairs: Vec<SentencePair>,
    origin: Option<(PathBuf, PathBuf)>,
}

impl ParallelCorpus {
    pub fn load(source_path: impl AsRef<Path>, target_path: impl AsRef<Path>) -> io::Result<Self> {
        let source_path = source_path.as_ref();
        let target_path = target_path.as_ref();

        let sources = read_lines(source_path)?;
        let targets = read_lines(target_path)?;

        if sources.len() != targets.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "misaligned parallel corpus: {} has {} lines but {} has {}",
                    source_path.display(),
                    sources.len(),
                    target_path.display(),
                    targets.len()
                ),
            ));
        }

        let pairs: Vec<SentencePair> = sources
            .into_iter()
            .zip(targets)
            .filter(|(src, tgt)| !(src.is_empty() && tgt.is_empty()))
            .map(|(source, target)| SentencePair { source, target })
            .collect();

        println!(
            "[simplification-data crate] ParallelCorpus::load {} pair(s) from {:?}",
            pairs.len(),
            source_path.parent().unwrap_or(source_path)
        );

        Ok(Self {
            pairs,
            origin: Some((source_path.to_path_buf(), target_path.to_path_buf())),
        })
    }

    pub fn from_pairs(pairs: Vec<SentencePair>) -> Self {
        Self {
            pairs,
            origin: None,
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[SentencePair] {
        &self.pairs
    }

    pub fn into_pairs(self) -> Vec<SentencePair> {
        self.pairs
    }

    /// Files the corpus was read from, if it was loaded from disk.
    pub fn origin(&self) -> Option<(&Path, &Path)> {
        self.origin
            .as_ref()
            .map(|(src, tgt)| (src.as_path(), tgt.as_path()))
    }
}

fn read_lines(path: &Path) -> io::Result<Vec<String>> {
    let file = File::open(path).map_err(|err| {
        io::Error::new(
            err.kind(),
            format!("failed to open {}: {}", path.display(), err),
        )
    })?;
    BufReader::new(file)
        .lines()
        .map(|line| line.map(|text| text.trim().to_string()))
        .collect()
}
