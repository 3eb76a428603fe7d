//! Test-only doubles for the LLM backend and the sandbox.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{Result, anyhow};

use crate::core::types::ExecutionResult;
use crate::io::config::AgentConfig;
use crate::io::llm::{ChatRequest, LlmClient, LlmError};
use crate::io::sandbox::Sandbox;

/// LLM that replays scripted replies in order and records every request.
///
/// `Err(status)` entries surface as `LlmError::Api` with that status.
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<String, u16>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<Result<String, u16>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Script that only ever succeeds.
    pub fn replies<'a, I: IntoIterator<Item = &'a str>>(replies: I) -> Self {
        Self::new(replies.into_iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

impl LlmClient for ScriptedLlm {
    fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        match self.replies.lock().expect("replies lock").pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(status)) => Err(LlmError::Api {
                status,
                message: "scripted failure".to_string(),
            }),
            None => Err(LlmError::InvalidResponse(
                "scripted llm has no replies left".to_string(),
            )),
        }
    }
}

/// What a scripted sandbox observed on one call.
#[derive(Debug, Clone)]
pub struct SandboxCall {
    pub path: PathBuf,
    /// Artifact contents at execution time (`None` if the file was missing).
    pub code: Option<String>,
    pub timeout: Duration,
}

/// Sandbox that returns scripted results without spawning processes.
pub struct ScriptedSandbox {
    results: Mutex<VecDeque<Result<ExecutionResult, String>>>,
    calls: Mutex<Vec<SandboxCall>>,
    panic_on_execute: bool,
}

impl ScriptedSandbox {
    pub fn new(results: Vec<Result<ExecutionResult, String>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            calls: Mutex::new(Vec::new()),
            panic_on_execute: false,
        }
    }

    /// Sandbox whose every execution panics, to exercise unwinding paths.
    pub fn panicking() -> Self {
        Self {
            panic_on_execute: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> Vec<SandboxCall> {
        self.calls.lock().expect("calls lock").clone()
    }
}

impl Sandbox for ScriptedSandbox {
    fn artifact_suffix(&self) -> &str {
        ".sh"
    }

    fn execute(&self, code_path: &Path, timeout: Duration) -> Result<ExecutionResult> {
        self.calls.lock().expect("calls lock").push(SandboxCall {
            path: code_path.to_path_buf(),
            code: fs::read_to_string(code_path).ok(),
            timeout,
        });
        if self.panic_on_execute {
            panic!("scripted sandbox panic");
        }
        match self.results.lock().expect("results lock").pop_front() {
            Some(Ok(result)) => Ok(result),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("scripted sandbox has no results left")),
        }
    }
}

/// Clean exit with `stdout`.
pub fn exec_ok(stdout: &str) -> Result<ExecutionResult, String> {
    Ok(ExecutionResult {
        exit_code: Some(0),
        stdout: stdout.to_string(),
        stderr: String::new(),
        timed_out: false,
    })
}

/// Exit with `code` and `stderr`.
pub fn exec_exit(code: i32, stderr: &str) -> Result<ExecutionResult, String> {
    Ok(ExecutionResult {
        exit_code: Some(code),
        stdout: String::new(),
        stderr: stderr.to_string(),
        timed_out: false,
    })
}

/// Child killed at the timeout.
pub fn exec_timeout() -> Result<ExecutionResult, String> {
    Ok(ExecutionResult {
        exit_code: None,
        stdout: String::new(),
        stderr: String::new(),
        timed_out: true,
    })
}

/// Config rooted in `dir`: data under `dir/data`, artifacts under `dir/scratch`,
/// generated code run with `sh`.
pub fn test_config(dir: &Path) -> AgentConfig {
    let mut cfg = AgentConfig::default();
    cfg.data_root = dir.join("data");
    cfg.scratch_dir = Some(dir.join("scratch"));
    cfg.generation.interpreter = vec!["sh".to_string()];
    cfg.generation.code_suffix = ".sh".to_string();
    cfg
}
