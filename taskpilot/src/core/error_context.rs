//! Rendering of per-attempt failures into the error context fed back to the LLM.
//!
//! Contexts are bounded: each captured stream is cut to a byte budget with a
//! truncation notice so a noisy child cannot blow up the next prompt.

use std::time::Duration;

use crate::core::output_validator::OutputRejection;
use crate::core::types::ExecutionResult;

/// Context for a child that ran past its wall-clock budget.
pub fn timed_out(result: &ExecutionResult, timeout: Duration, limit: usize) -> String {
    format!(
        "execution timed out after {timeout:?}\n{}",
        stream_block("stderr", &result.stderr, limit)
    )
}

/// Context for a child that exited unsuccessfully.
pub fn non_zero_exit(result: &ExecutionResult, limit: usize) -> String {
    let code = match result.exit_code {
        Some(code) => code.to_string(),
        None => "signal".to_string(),
    };
    format!(
        "non-zero exit (code {code})\n{}",
        stream_block("stderr", &result.stderr, limit)
    )
}

/// Context for stdout that failed parsing or schema validation.
pub fn rejected_output(
    rejection: &OutputRejection,
    result: &ExecutionResult,
    limit: usize,
) -> String {
    format!(
        "{rejection}\n{}\n{}",
        stream_block("stdout", &result.stdout, limit),
        stream_block("stderr", &result.stderr, limit)
    )
}

/// Context for a failure before the child could report anything.
pub fn attempt_error(stage: &str, err: &anyhow::Error, limit: usize) -> String {
    truncate(&format!("{stage} failed: {err:#}"), limit)
}

fn stream_block(label: &str, body: &str, limit: usize) -> String {
    let body = body.trim_end();
    if body.is_empty() {
        return format!("=== {label} ===\n(empty)");
    }
    format!("=== {label} ===\n{}", truncate(body, limit))
}

/// Cut `text` to at most `limit` bytes on a char boundary, noting what was dropped.
pub fn truncate(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n[truncated {} bytes]", &text[..end], text.len() - end)
}
