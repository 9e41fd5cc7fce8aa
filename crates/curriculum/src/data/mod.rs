use std::vec;

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use simplification_data::{ParallelCorpus, SentencePair, TierPair};

use crate::{CurriculumError, Result};

/// Finite, single-pass provider of batches.
///
/// `len` is the number of batches the source announces up front. `try_next`
/// returns `None` once the source has nothing left; that is the ordinary end
/// of data, not an error.
pub trait BatchSource {
    type Batch;

    fn len(&self) -> usize;

    fn try_next(&mut self) -> Option<Self::Batch>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S> BatchSource for Box<S>
where
    S: BatchSource + ?Sized,
{
    type Batch = S::Batch;

    fn len(&self) -> usize {
        (**self).len()
    }

    fn try_next(&mut self) -> Option<Self::Batch> {
        (**self).try_next()
    }
}

/// Adapts any exact-size iterator into a batch source. The announced length
/// is captured once at construction.
#[derive(Debug, Clone)]
pub struct IterSource<I> {
    inner: I,
    len: usize,
}

impl<I> IterSource<I>
where
    I: ExactSizeIterator,
{
    pub fn new(inner: I) -> Self {
        let len = inner.len();
        Self { inner, len }
    }
}

impl<I> BatchSource for IterSource<I>
where
    I: Iterator,
{
    type Batch = I::Item;

    fn len(&self) -> usize {
        self.len
    }

    fn try_next(&mut self) -> Option<Self::Batch> {
        self.inner.next()
    }
}

pub type VecSource<B> = IterSource<vec::IntoIter<B>>;

impl<B> From<Vec<B>> for VecSource<B> {
    fn from(batches: Vec<B>) -> Self {
        IterSource::new(batches.into_iter())
    }
}

/// Collated batch: the source sentences and their aligned targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentencePairBatch {
    pub pair: TierPair,
    pub sources: Vec<String>,
    pub targets: Vec<String>,
}

impl SentencePairBatch {
    fn collate(pair: TierPair, rows: Vec<SentencePair>) -> Self {
        let (sources, targets) = rows
            .into_iter()
            .map(|row| (row.source, row.target))
            .unzip();
        Self {
            pair,
            sources,
            targets,
        }
    }

    pub fn size(&self) -> usize {
        self.sources.len()
    }
}

/// Splits a parallel corpus into fixed-size batches, optionally shuffled
/// with a seeded RNG. The last batch may be short.
#[derive(Debug)]
pub struct PairBatchLoader {
    pair: TierPair,
    batch_size: usize,
    rows: vec::IntoIter<SentencePair>,
    batches: usize,
    emitted: usize,
}

impl PairBatchLoader {
    pub fn new(
        corpus: ParallelCorpus,
        pair: TierPair,
        batch_size: usize,
        shuffle: bool,
        seed: u64,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(CurriculumError::invalid_argument(
                "batch_size must be greater than zero",
            ));
        }

        let mut rows = corpus.into_pairs();
        if shuffle {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(pair.curriculum_slot() as u64));
            rows.shuffle(&mut rng);
        }
        let batches = rows.len().div_ceil(batch_size);

        Ok(Self {
            pair,
            batch_size,
            rows: rows.into_iter(),
            batches,
            emitted: 0,
        })
    }

    pub fn pair(&self) -> TierPair {
        self.pair
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn remaining(&self) -> usize {
        self.batches - self.emitted
    }
}

impl BatchSource for PairBatchLoader {
    type Batch = SentencePairBatch;

    fn len(&self) -> usize {
        self.batches
    }

    fn try_next(&mut self) -> Option<Self::Batch> {
        let rows: Vec<SentencePair> = self.rows.by_ref().take(self.batch_size).collect();
        if rows.is_empty() {
            return None;
        }
        self.emitted += 1;
        Some(SentencePairBatch::collate(self.pair, rows))
    }
}
