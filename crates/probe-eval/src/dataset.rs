use crate::condition::Condition;
use crate::error::{EvalError, EvalResult};
use probe_abstraction::ChatMessage;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// One line of a condition's test file.
///
/// Everything besides `messages` (`name`, `country`, `capital`, ...) is kept
/// as metadata and carried onto the evaluation record unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestExample {
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
    pub messages: Vec<ChatMessage>,
}

impl TestExample {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self { metadata: Map::new(), messages }
    }

    #[must_use]
    pub fn with_field(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// Reads a JSONL test set. Blank lines are skipped.
pub fn read_test_set(path: &Path) -> EvalResult<Vec<TestExample>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| EvalError::Dataset(format!("failed to read {}: {e}", path.display())))?;
    let mut examples = Vec::new();

    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let example: TestExample = serde_json::from_str(line).map_err(|e| {
            EvalError::Dataset(format!("{}: failed to parse jsonl line {}: {}", path.display(), idx + 1, e))
        })?;
        if example.messages.is_empty() {
            return Err(EvalError::Dataset(format!("{}: line {} has no messages", path.display(), idx + 1)));
        }
        examples.push(example);
    }

    Ok(examples)
}

/// Reads the test set of `condition` from `<data_dir>/<key>.jsonl`.
pub fn read_condition(data_dir: &Path, condition: Condition) -> EvalResult<Vec<TestExample>> {
    read_test_set(&condition.test_file(data_dir))
}

pub fn write_test_set(path: &Path, examples: &[TestExample]) -> EvalResult<()> {
    let mut out = String::new();
    for ex in examples {
        out.push_str(&serde_json::to_string(ex)?);
        out.push('\n');
    }
    std::fs::write(path, out)?;
    Ok(())
}
