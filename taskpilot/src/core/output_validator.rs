//! Structural validation of generated-code stdout.
//!
//! Stdout must be exactly one JSON object conforming to
//! `schemas/task_output.schema.json`. The semantic `status` value is not judged.

use std::sync::LazyLock;

use jsonschema::{Draft, Validator};
use serde_json::Value;

use crate::core::types::ValidatedOutput;

pub const TASK_OUTPUT_SCHEMA: &str = include_str!("../../schemas/task_output.schema.json");

static VALIDATOR: LazyLock<Validator> = LazyLock::new(|| {
    let schema: Value =
        serde_json::from_str(TASK_OUTPUT_SCHEMA).expect("task output schema should be valid json");
    jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(&schema)
        .expect("task output schema should compile")
});

/// Why stdout was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputRejection {
    /// Stdout was empty after trimming.
    Empty,
    /// Stdout was not a single JSON document.
    Parse(String),
    /// Stdout parsed but violated the schema.
    Schema(Vec<String>),
}

impl std::fmt::Display for OutputRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputRejection::Empty => write!(f, "output parse error: stdout was empty"),
            OutputRejection::Parse(msg) => write!(f, "output parse error: {msg}"),
            OutputRejection::Schema(errors) => {
                write!(f, "output schema validation failed:\n- {}", errors.join("\n- "))
            }
        }
    }
}

/// Parse `stdout` and validate it against the task output schema.
pub fn validate_output(stdout: &str) -> Result<ValidatedOutput, OutputRejection> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Err(OutputRejection::Empty);
    }
    let value: Value =
        serde_json::from_str(trimmed).map_err(|err| OutputRejection::Parse(err.to_string()))?;

    let errors: Vec<String> = VALIDATOR
        .iter_errors(&value)
        .map(|err| err.to_string())
        .collect();
    if !errors.is_empty() {
        return Err(OutputRejection::Schema(errors));
    }

    serde_json::from_value(value).map_err(|err| OutputRejection::Parse(err.to_string()))
}
