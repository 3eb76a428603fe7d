//! Generate-execute-validate loop for dynamically generated code.
//!
//! Each attempt asks the LLM for a program, runs it through a [`Sandbox`] and
//! validates its stdout. A failed attempt feeds its error context into the next
//! generation until the attempt budget is spent. The loop never spawns
//! processes itself; swapping the sandbox does not touch this module.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tempfile::TempPath;
use tracing::{debug, info, instrument, warn};

use crate::core::attempts::{AttemptState, AttemptTransition};
use crate::core::error_context;
use crate::core::output_validator::validate_output;
use crate::core::types::{ExecutionResult, Phase, ValidatedOutput};
use crate::io::config::AgentConfig;
use crate::io::llm::{LlmClient, query};
use crate::io::prompt::{render_generator_system, render_generator_task};
use crate::io::sandbox::Sandbox;

const ARTIFACT_PREFIX: &str = "taskpilot-gen-";

/// Successful loop termination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationOutcome {
    /// Schema-valid output printed by the generated code.
    pub output: ValidatedOutput,
    /// Source of the program that produced `output`.
    pub code: String,
    /// Attempts used, including the successful one.
    pub attempts: u32,
}

/// Terminal failure after the attempt budget is spent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("task execution failed after {attempts} attempt(s): {last_error}")]
pub struct TaskExecutionFailed {
    pub attempts: u32,
    /// Error context of the final attempt only.
    pub last_error: String,
    /// Most recent program the LLM produced, if any attempt got that far.
    pub last_code: Option<String>,
}

/// Settings for the loop, derived once from [`AgentConfig`].
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    system_prompt: String,
    max_attempts: u32,
    max_tokens: u32,
    exec_timeout: Duration,
    context_limit_bytes: usize,
    scratch_dir: PathBuf,
}

/// Failure of a single attempt, before the loop decides to retry.
struct AttemptFailure {
    code: Option<String>,
    context: String,
}

impl CodeGenerator {
    pub fn from_config(cfg: &AgentConfig) -> Result<Self> {
        let system_prompt = render_generator_system(&cfg.data_root, &cfg.generation.code_suffix)?;
        Ok(Self {
            system_prompt,
            max_attempts: cfg.generation.max_attempts,
            max_tokens: cfg.llm.generate_max_tokens,
            exec_timeout: cfg.generation.exec_timeout(),
            context_limit_bytes: cfg.generation.error_context_limit_bytes,
            scratch_dir: cfg.scratch_dir(),
        })
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Run the loop for `task` until a schema-valid output appears or attempts run out.
    #[instrument(skip_all, fields(max_attempts = self.max_attempts, task_bytes = task.len()))]
    pub fn run<L, S>(
        &self,
        llm: &L,
        sandbox: &S,
        task: &str,
    ) -> Result<GenerationOutcome, TaskExecutionFailed>
    where
        L: LlmClient + ?Sized,
        S: Sandbox + ?Sized,
    {
        let mut state = AttemptState::new(self.max_attempts);
        let mut last_code: Option<String> = None;

        loop {
            let attempt = state.number();
            match self.attempt(llm, sandbox, task, state.last_error()) {
                Ok((code, output)) => {
                    info!(
                        attempt,
                        phase = Phase::Succeeded.as_str(),
                        status = output.status.as_str(),
                        "generated code produced valid output"
                    );
                    return Ok(GenerationOutcome {
                        output,
                        code,
                        attempts: attempt,
                    });
                }
                Err(failure) => {
                    if failure.code.is_some() {
                        last_code = failure.code;
                    }
                    warn!(
                        attempt,
                        max_attempts = state.max_attempts(),
                        context = %failure.context,
                        "attempt failed"
                    );
                    if state.record_failure(failure.context) == AttemptTransition::Exhausted {
                        warn!(attempt, phase = Phase::Exhausted.as_str(), "attempts exhausted");
                        return Err(TaskExecutionFailed {
                            attempts: attempt,
                            last_error: state.into_last_error().unwrap_or_default(),
                            last_code,
                        });
                    }
                }
            }
        }
    }

    fn attempt<L, S>(
        &self,
        llm: &L,
        sandbox: &S,
        task: &str,
        previous_error: Option<&str>,
    ) -> Result<(String, ValidatedOutput), AttemptFailure>
    where
        L: LlmClient + ?Sized,
        S: Sandbox + ?Sized,
    {
        let limit = self.context_limit_bytes;

        debug!(phase = Phase::Generating.as_str(), retry = previous_error.is_some());
        let user = render_generator_task(task, previous_error).map_err(|err| AttemptFailure {
            code: None,
            context: error_context::attempt_error("prompt rendering", &err, limit),
        })?;
        let code = query(llm, &self.system_prompt, &user, self.max_tokens).map_err(|err| {
            AttemptFailure {
                code: None,
                context: error_context::truncate(&format!("llm request failed: {err}"), limit),
            }
        })?;

        debug!(phase = Phase::Executing.as_str(), code_bytes = code.len());
        let result = match self.execute(sandbox, &code) {
            Ok(result) => result,
            Err(err) => {
                return Err(AttemptFailure {
                    code: Some(code),
                    context: error_context::attempt_error("execution", &err, limit),
                });
            }
        };

        debug!(phase = Phase::Validating.as_str(), exit_code = ?result.exit_code, timed_out = result.timed_out);
        match self.validate(&result) {
            Ok(output) => Ok((code, output)),
            Err(context) => Err(AttemptFailure {
                code: Some(code),
                context,
            }),
        }
    }

    /// Persist `code` as a temporary artifact, run it, then remove the artifact.
    ///
    /// The artifact is a [`TempPath`], so it is also removed when the sandbox
    /// returns an error or panics.
    fn execute<S: Sandbox + ?Sized>(&self, sandbox: &S, code: &str) -> Result<ExecutionResult> {
        let artifact = write_artifact(&self.scratch_dir, sandbox.artifact_suffix(), code)?;
        let result = sandbox.execute(&artifact, self.exec_timeout);
        let artifact_path = artifact.to_path_buf();
        if let Err(err) = artifact.close() {
            warn!(err = %err, path = %artifact_path.display(), "failed to remove code artifact");
        }
        result
    }

    fn validate(&self, result: &ExecutionResult) -> Result<ValidatedOutput, String> {
        let limit = self.context_limit_bytes;
        if result.timed_out {
            return Err(error_context::timed_out(result, self.exec_timeout, limit));
        }
        if !result.success() {
            return Err(error_context::non_zero_exit(result, limit));
        }
        validate_output(&result.stdout)
            .map_err(|rejection| error_context::rejected_output(&rejection, result, limit))
    }
}

fn write_artifact(dir: &Path, suffix: &str, code: &str) -> Result<TempPath> {
    fs::create_dir_all(dir).with_context(|| format!("create scratch dir {}", dir.display()))?;
    let mut file = tempfile::Builder::new()
        .prefix(ARTIFACT_PREFIX)
        .suffix(suffix)
        .tempfile_in(dir)
        .with_context(|| format!("create code artifact in {}", dir.display()))?;
    file.write_all(code.as_bytes())
        .context("write code artifact")?;
    file.flush().context("flush code artifact")?;
    Ok(file.into_temp_path())
}

/// Run the generation loop with settings taken from `cfg`.
pub fn run_generated_task<L, S>(
    llm: &L,
    sandbox: &S,
    cfg: &AgentConfig,
    task: &str,
) -> Result<GenerationOutcome>
where
    L: LlmClient + ?Sized,
    S: Sandbox + ?Sized,
{
    let generator = CodeGenerator::from_config(cfg)?;
    Ok(generator.run(llm, sandbox, task)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::OutputStatus;
    use crate::test_support::{ScriptedLlm, ScriptedSandbox, exec_exit, exec_ok, exec_timeout};

    fn generator(scratch: &Path) -> CodeGenerator {
        let mut cfg = AgentConfig::default();
        cfg.scratch_dir = Some(scratch.to_path_buf());
        cfg.generation.code_suffix = ".sh".to_string();
        CodeGenerator::from_config(&cfg).expect("generator")
    }

    fn scratch_is_empty(dir: &Path) -> bool {
        fs::read_dir(dir).expect("read scratch").next().is_none()
    }

    #[test]
    fn accepts_first_valid_output_without_retry() {
        let temp = tempfile::tempdir().expect("tempdir");
        let llm = ScriptedLlm::replies(["print('42')"]);
        let sandbox = ScriptedSandbox::new(vec![exec_ok(r#"{"status":"success","result":"42"}"#)]);

        let outcome = generator(temp.path())
            .run(&llm, &sandbox, "answer")
            .expect("outcome");

        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.code, "print('42')");
        assert_eq!(outcome.output.result, "42");
        assert_eq!(llm.requests().len(), 1);
        assert!(!llm.requests()[0].user.contains("Previous error"));
    }

    #[test]
    fn failure_status_terminates_successfully() {
        let temp = tempfile::tempdir().expect("tempdir");
        let llm = ScriptedLlm::replies(["code"]);
        let sandbox = ScriptedSandbox::new(vec![exec_ok(
            r#"{"status":"failure","result":"no data found"}"#,
        )]);

        let outcome = generator(temp.path())
            .run(&llm, &sandbox, "task")
            .expect("outcome");

        assert_eq!(outcome.output.status, OutputStatus::Failure);
        assert_eq!(outcome.attempts, 1);
    }

    #[test]
    fn retries_with_only_the_latest_error_context() {
        let temp = tempfile::tempdir().expect("tempdir");
        let llm = ScriptedLlm::replies(["v1", "v2", "v3"]);
        let sandbox = ScriptedSandbox::new(vec![
            exec_exit(1, "first boom"),
            exec_ok("not json"),
            exec_ok(r#"{"status":"success","result":"done"}"#),
        ]);

        let outcome = generator(temp.path())
            .run(&llm, &sandbox, "task")
            .expect("outcome");

        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.code, "v3");
        let requests = llm.requests();
        assert!(requests[1].user.contains("non-zero exit (code 1)"));
        assert!(requests[1].user.contains("first boom"));
        assert!(requests[2].user.contains("output parse error"));
        assert!(!requests[2].user.contains("first boom"));
    }

    #[test]
    fn exhaustion_carries_last_context_and_code() {
        let temp = tempfile::tempdir().expect("tempdir");
        let llm = ScriptedLlm::replies(["v1", "v2", "v3", "v4"]);
        let sandbox = ScriptedSandbox::new(vec![
            exec_exit(1, "err one"),
            exec_exit(2, "err two"),
            exec_exit(3, "err three"),
        ]);

        let err = generator(temp.path())
            .run(&llm, &sandbox, "task")
            .unwrap_err();

        assert_eq!(err.attempts, 3);
        assert_eq!(err.last_code.as_deref(), Some("v3"));
        assert!(err.last_error.contains("code 3"));
        assert!(err.last_error.contains("err three"));
        assert!(!err.last_error.contains("err two"));
        assert_eq!(llm.requests().len(), 3);
        assert_eq!(sandbox.calls().len(), 3);
        assert!(err.to_string().contains("err three"));
    }

    #[test]
    fn timeout_consumes_an_attempt_and_is_reported_distinctly() {
        let temp = tempfile::tempdir().expect("tempdir");
        let llm = ScriptedLlm::replies(["slow", "fast"]);
        let sandbox = ScriptedSandbox::new(vec![
            exec_timeout(),
            exec_ok(r#"{"status":"success","result":"ok"}"#),
        ]);

        let outcome = generator(temp.path())
            .run(&llm, &sandbox, "task")
            .expect("outcome");

        assert_eq!(outcome.attempts, 2);
        let retry_prompt = &llm.requests()[1].user;
        assert!(retry_prompt.contains("execution timed out after 60s"));
        assert!(!retry_prompt.contains("non-zero exit"));
    }

    #[test]
    fn upstream_failure_consumes_an_attempt() {
        let temp = tempfile::tempdir().expect("tempdir");
        let llm = ScriptedLlm::new(vec![Err(503), Ok("code".to_string())]);
        let sandbox = ScriptedSandbox::new(vec![exec_ok(r#"{"status":"success","result":"1"}"#)]);

        let outcome = generator(temp.path())
            .run(&llm, &sandbox, "task")
            .expect("outcome");

        assert_eq!(outcome.attempts, 2);
        assert_eq!(sandbox.calls().len(), 1);
        assert!(llm.requests()[1].user.contains("llm request failed"));
    }

    #[test]
    fn upstream_failure_on_every_attempt_keeps_no_code() {
        let temp = tempfile::tempdir().expect("tempdir");
        let llm = ScriptedLlm::new(vec![Err(500), Err(500), Err(401)]);
        let sandbox = ScriptedSandbox::new(Vec::new());

        let err = generator(temp.path())
            .run(&llm, &sandbox, "task")
            .unwrap_err();

        assert_eq!(err.attempts, 3);
        assert_eq!(err.last_code, None);
        assert!(err.last_error.contains("401"));
    }

    #[test]
    fn artifacts_exist_during_execution_and_are_removed_after() {
        let temp = tempfile::tempdir().expect("tempdir");
        let llm = ScriptedLlm::replies(["echo a", "echo b"]);
        let sandbox = ScriptedSandbox::new(vec![
            exec_exit(1, "nope"),
            exec_ok(r#"{"status":"success","result":"b"}"#),
        ]);

        generator(temp.path())
            .run(&llm, &sandbox, "task")
            .expect("outcome");

        let calls = sandbox.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].code.as_deref(), Some("echo a"));
        assert_eq!(calls[1].code.as_deref(), Some("echo b"));
        assert!(calls.iter().all(|c| c.path.starts_with(temp.path())));
        assert!(calls.iter().all(|c| c.path.extension().is_some_and(|e| e == "sh")));
        assert!(scratch_is_empty(temp.path()));
    }

    #[test]
    fn sandbox_error_consumes_attempt_and_removes_artifact() {
        let temp = tempfile::tempdir().expect("tempdir");
        let llm = ScriptedLlm::replies(["a", "b"]);
        let sandbox = ScriptedSandbox::new(vec![
            Err("interpreter missing".to_string()),
            exec_ok(r#"{"status":"success","result":"1"}"#),
        ]);

        let outcome = generator(temp.path())
            .run(&llm, &sandbox, "task")
            .expect("outcome");

        assert_eq!(outcome.attempts, 2);
        assert!(llm.requests()[1].user.contains("execution failed: interpreter missing"));
        assert!(scratch_is_empty(temp.path()));
    }

    #[test]
    fn sandbox_panic_still_removes_artifact() {
        let temp = tempfile::tempdir().expect("tempdir");
        let llm = ScriptedLlm::replies(["boom"]);
        let sandbox = ScriptedSandbox::panicking();
        let generator = generator(temp.path());

        let caught = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = generator.run(&llm, &sandbox, "task");
        }));

        assert!(caught.is_err());
        assert!(scratch_is_empty(temp.path()));
    }

    #[test]
    fn budget_of_one_never_retries() {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut cfg = AgentConfig::default();
        cfg.scratch_dir = Some(temp.path().to_path_buf());
        cfg.generation.max_attempts = 1;
        let llm = ScriptedLlm::replies(["a", "b"]);
        let sandbox = ScriptedSandbox::new(vec![exec_exit(1, "x"), exec_exit(1, "y")]);

        let err = run_generated_task(&llm, &sandbox, &cfg, "task").unwrap_err();
        let failed = err
            .downcast_ref::<TaskExecutionFailed>()
            .expect("task execution failed");
        assert_eq!(failed.attempts, 1);
        assert_eq!(llm.requests().len(), 1);
    }

    #[test]
    fn system_prompt_is_sent_on_every_attempt() {
        let temp = tempfile::tempdir().expect("tempdir");
        let llm = ScriptedLlm::replies(["a", "b"]);
        let sandbox = ScriptedSandbox::new(vec![
            exec_exit(1, "x"),
            exec_ok(r#"{"status":"success","result":"1"}"#),
        ]);
        let generator = generator(temp.path());

        generator.run(&llm, &sandbox, "task").expect("outcome");

        let requests = llm.requests();
        assert!(requests.iter().all(|r| r.system == generator.system_prompt()));
        assert!(requests.iter().all(|r| r.max_tokens == 1500));
    }
}
