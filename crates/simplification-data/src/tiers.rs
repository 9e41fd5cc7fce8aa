use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Reading difficulty of a sentence collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Elementary,
    Intermediate,
    Advanced,
}

impl Tier {
    /// File stem used by the dataset layout (`ELE.txt`, `INT.txt`, `ADV.txt`).
    pub fn file_stem(self) -> &'static str {
        match self {
            Tier::Elementary => "ELE",
            Tier::Intermediate => "INT",
            Tier::Advanced => "ADV",
        }
    }

    pub fn rank(self) -> u8 {
        match self {
            Tier::Elementary => 0,
            Tier::Intermediate => 1,
            Tier::Advanced => 2,
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_stem())
    }
}

/// A difficulty-paired dataset: sentences of one tier aligned with the same
/// sentences rewritten at another tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TierPair {
    #[serde(rename = "ele_int")]
    ElementaryIntermediate,
    #[serde(rename = "int_adv")]
    IntermediateAdvanced,
    #[serde(rename = "ele_adv")]
    ElementaryAdvanced,
}

impl TierPair {
    /// Pairs in curriculum order: the easiest transition first.
    pub const CURRICULUM: [TierPair; 3] = [
        TierPair::ElementaryIntermediate,
        TierPair::IntermediateAdvanced,
        TierPair::ElementaryAdvanced,
    ];

    pub fn source_tier(self) -> Tier {
        match self {
            TierPair::ElementaryIntermediate | TierPair::ElementaryAdvanced => Tier::Elementary,
            TierPair::IntermediateAdvanced => Tier::Intermediate,
        }
    }

    pub fn target_tier(self) -> Tier {
        match self {
            TierPair::ElementaryIntermediate => Tier::Intermediate,
            TierPair::IntermediateAdvanced | TierPair::ElementaryAdvanced => Tier::Advanced,
        }
    }

    /// 1-based position of this pair among the curriculum sources.
    pub fn curriculum_slot(self) -> u8 {
        match self {
            TierPair::ElementaryIntermediate => 1,
            TierPair::IntermediateAdvanced => 2,
            TierPair::ElementaryAdvanced => 3,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            TierPair::ElementaryIntermediate => "ele_int",
            TierPair::IntermediateAdvanced => "int_adv",
            TierPair::ElementaryAdvanced => "ele_adv",
        }
    }

    /// Directory holding both sides of the pair, named harder-first
    /// (`ELE_INT`, `ADV_INT`, `ADV_ELE`).
    pub fn directory_name(self) -> &'static str {
        match self {
            TierPair::ElementaryIntermediate => "ELE_INT",
            TierPair::IntermediateAdvanced => "ADV_INT",
            TierPair::ElementaryAdvanced => "ADV_ELE",
        }
    }

    /// Source and target file paths under `base/dataset/<DIR>/`.
    pub fn default_paths(self, base: impl AsRef<Path>) -> (PathBuf, PathBuf) {
        let dir = base
            .as_ref()
            .join("dataset")
            .join(self.directory_name());
        (
            dir.join(format!("{}.txt", self.source_tier().file_stem())),
            dir.join(format!("{}.txt", self.target_tier().file_stem())),
        )
    }
}

impl fmt::Display for TierPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.source_tier(), self.target_tier())
    }
}
