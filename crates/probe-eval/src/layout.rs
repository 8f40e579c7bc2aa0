use crate::error::{EvalError, EvalResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Numeric experiment identifier, chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExperimentId(pub u32);

impl fmt::Display for ExperimentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ExperimentId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// Filesystem layout for experiment results.
///
/// Each experiment lives in `<root>/<experiment_id>/results.json`.
#[derive(Debug, Clone)]
pub struct ResultsLayout {
    root: PathBuf,
}

impl ResultsLayout {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn experiment_dir(&self, id: ExperimentId) -> PathBuf {
        self.root.join(id.to_string())
    }

    #[must_use]
    pub fn results_path(&self, id: ExperimentId) -> PathBuf {
        self.experiment_dir(id).join("results.json")
    }

    /// Creates the experiment directory. An existing directory is an error so
    /// that earlier results are never overwritten.
    pub fn create_experiment_dir(&self, id: ExperimentId) -> EvalResult<PathBuf> {
        std::fs::create_dir_all(&self.root)?;
        let dir = self.experiment_dir(id);
        match std::fs::create_dir(&dir) {
            Ok(()) => Ok(dir),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Err(EvalError::ExperimentExists(id, dir)),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout_paths() {
        let layout = ResultsLayout::new(PathBuf::from("results"));
        assert_eq!(layout.results_path(ExperimentId(7)), PathBuf::from("results/7/results.json"));
    }

    #[test]
    fn test_create_experiment_dir_refuses_existing() {
        let temp = TempDir::new().unwrap();
        let layout = ResultsLayout::new(temp.path().join("results"));

        let dir = layout.create_experiment_dir(ExperimentId(1)).unwrap();
        assert!(dir.is_dir());
        assert!(matches!(
            layout.create_experiment_dir(ExperimentId(1)),
            Err(EvalError::ExperimentExists(ExperimentId(1), _))
        ));
    }

    #[test]
    fn test_experiment_id_parse() {
        assert_eq!("12".parse::<ExperimentId>().unwrap(), ExperimentId(12));
        assert!("x".parse::<ExperimentId>().is_err());
    }
}
