//! Shared deterministic types for the generation loop and the classifier.
//!
//! These types define stable contracts between core components. They should not
//! depend on external state or I/O.

use serde::{Deserialize, Serialize};

/// Status declared by generated code in its structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStatus {
    Success,
    Failure,
}

impl OutputStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputStatus::Success => "success",
            OutputStatus::Failure => "failure",
        }
    }
}

/// Structured output printed by generated code, after schema validation.
///
/// A `Failure` status is still a well-formed output: the loop only checks
/// structure, not whether the task itself succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedOutput {
    pub status: OutputStatus,
    pub result: String,
}

/// Outcome of one sandboxed execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    /// `None` when the child was terminated by a signal (including the timeout kill).
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

impl ExecutionResult {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Loop phase for a single generation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Generating,
    Executing,
    Validating,
    Succeeded,
    Exhausted,
}

impl Phase {
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Generating => "generating",
            Phase::Executing => "executing",
            Phase::Validating => "validating",
            Phase::Succeeded => "succeeded",
            Phase::Exhausted => "exhausted",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_status_serializes_lowercase() {
        let output = ValidatedOutput {
            status: OutputStatus::Failure,
            result: "no data found".to_string(),
        };
        let json = serde_json::to_string(&output).expect("serialize");
        assert_eq!(json, r#"{"status":"failure","result":"no data found"}"#);
    }

    #[test]
    fn timed_out_result_is_not_success_even_with_zero_code() {
        let result = ExecutionResult {
            exit_code: Some(0),
            stdout: String::new(),
            stderr: String::new(),
            timed_out: true,
        };
        assert!(!result.success());
    }
}
