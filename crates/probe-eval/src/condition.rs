//! Evaluation conditions and model variants.
//!
//! Both serialize as their string keys so they can key JSON maps in the
//! results document.

use crate::error::{EvalError, EvalResult};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which system prompt the test set was rendered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PromptMode {
    Train,
    Test,
}

impl PromptMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Train => "TRAIN",
            Self::Test => "TEST",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Instructions {
    With,
    Without,
}

impl Instructions {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::With => "with",
            Self::Without => "no",
        }
    }
}

/// One test condition, e.g. `test_TRAIN_MODE_with_instructions`.
///
/// `Ord` follows the canonical order of [`Condition::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Condition {
    pub mode: PromptMode,
    pub instructions: Instructions,
}

impl Condition {
    pub const ALL: [Self; 4] = [
        Self::new(PromptMode::Train, Instructions::With),
        Self::new(PromptMode::Train, Instructions::Without),
        Self::new(PromptMode::Test, Instructions::With),
        Self::new(PromptMode::Test, Instructions::Without),
    ];

    #[must_use]
    pub const fn new(mode: PromptMode, instructions: Instructions) -> Self {
        Self { mode, instructions }
    }

    pub fn key(&self) -> String {
        format!("test_{}_MODE_{}_instructions", self.mode.as_str(), self.instructions.as_str())
    }

    /// `<data_dir>/<key>.jsonl`
    #[must_use]
    pub fn test_file(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(format!("{}.jsonl", self.key()))
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl FromStr for Condition {
    type Err = EvalError;

    fn from_str(s: &str) -> EvalResult<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.key() == s)
            .ok_or_else(|| EvalError::UnknownCondition(s.to_string()))
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        key.parse().map_err(de::Error::custom)
    }
}

/// The model being evaluated within an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModelVariant {
    Baseline,
    Trained,
}

impl ModelVariant {
    pub const ALL: [Self; 2] = [Self::Baseline, Self::Trained];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Baseline => "baseline",
            Self::Trained => "trained",
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelVariant {
    type Err = EvalError;

    fn from_str(s: &str) -> EvalResult<Self> {
        match s {
            "baseline" => Ok(Self::Baseline),
            "trained" => Ok(Self::Trained),
            other => Err(EvalError::UnknownVariant(other.to_string())),
        }
    }
}

impl Serialize for ModelVariant {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ModelVariant {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        key.parse().map_err(de::Error::custom)
    }
}
