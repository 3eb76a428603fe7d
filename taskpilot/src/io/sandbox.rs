//! Execution sandbox for untrusted generated code.
//!
//! The [`Sandbox`] trait is the only seam between the generation loop and
//! process execution: the loop hands over a code artifact path and a timeout,
//! and receives an [`ExecutionResult`]. Tests use scripted sandboxes that never
//! spawn processes.
//!
//! Isolation contract of [`ProcessSandbox`]: one child per call, working
//! directory is the data root, stdin is closed, the environment is cleared down
//! to `PATH` and `TASKPILOT_DATA_ROOT`, and the child is killed at the timeout.
//! Nothing stronger (no namespaces, no seccomp).

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tracing::{info, instrument, warn};

use crate::core::types::ExecutionResult;
use crate::io::config::GenerationConfig;
use crate::io::process::run_command_with_timeout;

/// Environment variable through which generated code learns the data root.
pub const DATA_ROOT_ENV: &str = "TASKPILOT_DATA_ROOT";

/// Abstraction over execution backends for generated code.
pub trait Sandbox {
    /// File suffix the backend expects for code artifacts (e.g. `.py`).
    fn artifact_suffix(&self) -> &str {
        ""
    }

    /// Run the code at `code_path`, killing it after `timeout`.
    ///
    /// Returns `Err` only when the child could not be run at all; a crash,
    /// non-zero exit or timeout is reported through the `ExecutionResult`.
    fn execute(&self, code_path: &Path, timeout: Duration) -> Result<ExecutionResult>;
}

/// Sandbox that runs code with a local interpreter in a child process.
#[derive(Debug, Clone)]
pub struct ProcessSandbox {
    interpreter: Vec<String>,
    suffix: String,
    workdir: PathBuf,
    output_limit_bytes: usize,
}

impl ProcessSandbox {
    pub fn new(
        interpreter: Vec<String>,
        suffix: impl Into<String>,
        workdir: impl Into<PathBuf>,
        output_limit_bytes: usize,
    ) -> Self {
        Self {
            interpreter,
            suffix: suffix.into(),
            workdir: workdir.into(),
            output_limit_bytes,
        }
    }

    pub fn from_config(cfg: &GenerationConfig, data_root: &Path) -> Self {
        Self::new(
            cfg.interpreter.clone(),
            cfg.code_suffix.clone(),
            data_root,
            cfg.output_limit_bytes,
        )
    }

    fn command(&self, code_path: &Path) -> Result<Command> {
        let (program, args) = self
            .interpreter
            .split_first()
            .ok_or_else(|| anyhow!("sandbox interpreter is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(args)
            .arg(code_path)
            .current_dir(&self.workdir)
            .env_clear()
            .env(DATA_ROOT_ENV, &self.workdir);
        if let Some(path) = std::env::var_os("PATH") {
            cmd.env("PATH", path);
        }
        Ok(cmd)
    }
}

impl Sandbox for ProcessSandbox {
    fn artifact_suffix(&self) -> &str {
        &self.suffix
    }

    #[instrument(skip_all, fields(code_path = %code_path.display(), timeout_secs = timeout.as_secs()))]
    fn execute(&self, code_path: &Path, timeout: Duration) -> Result<ExecutionResult> {
        info!(workdir = %self.workdir.display(), "executing generated code");
        let cmd = self.command(code_path)?;
        let output = run_command_with_timeout(cmd, None, timeout, self.output_limit_bytes)?;
        let result = ExecutionResult {
            exit_code: output.exit_code,
            stdout: output.stdout_text(),
            stderr: output.stderr_text(),
            timed_out: output.timed_out,
        };
        if result.timed_out {
            warn!("generated code timed out");
        } else if !result.success() {
            warn!(exit_code = ?result.exit_code, "generated code failed");
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Instant;

    fn sh_sandbox(workdir: &Path) -> ProcessSandbox {
        ProcessSandbox::new(vec!["sh".to_string()], ".sh", workdir, 10_000)
    }

    #[test]
    fn runs_code_in_data_root_with_cleared_env() {
        let temp = tempfile::tempdir().expect("tempdir");
        let code = temp.path().join("env.sh");
        fs::write(
            &code,
            "printf '%s|%s|%s' \"$(pwd)\" \"$TASKPILOT_DATA_ROOT\" \"${HOME:-unset}\"\n",
        )
        .expect("write code");

        let result = sh_sandbox(temp.path())
            .execute(&code, Duration::from_secs(5))
            .expect("execute");

        assert_eq!(result.exit_code, Some(0));
        let parts: Vec<&str> = result.stdout.split('|').collect();
        assert_eq!(
            fs::canonicalize(parts[0]).expect("canonical pwd"),
            fs::canonicalize(temp.path()).expect("canonical root")
        );
        assert_eq!(parts[1], temp.path().display().to_string());
        assert_eq!(parts[2], "unset");
    }

    #[test]
    fn reports_non_zero_exit_and_stderr() {
        let temp = tempfile::tempdir().expect("tempdir");
        let code = temp.path().join("fail.sh");
        fs::write(&code, "echo broken >&2\nexit 7\n").expect("write code");

        let result = sh_sandbox(temp.path())
            .execute(&code, Duration::from_secs(5))
            .expect("execute");

        assert_eq!(result.exit_code, Some(7));
        assert!(!result.timed_out);
        assert_eq!(result.stderr, "broken\n");
    }

    #[test]
    fn reports_timeout_distinctly() {
        let temp = tempfile::tempdir().expect("tempdir");
        let code = temp.path().join("slow.sh");
        fs::write(&code, "exec sleep 5\n").expect("write code");

        let result = sh_sandbox(temp.path())
            .execute(&code, Duration::from_millis(300))
            .expect("execute");

        assert!(result.timed_out);
        assert_eq!(result.exit_code, None);
    }

    #[test]
    fn timeout_holds_when_code_forks_a_child() {
        let temp = tempfile::tempdir().expect("tempdir");
        let code = temp.path().join("fork.sh");
        fs::write(&code, "sleep 6\necho finished\n").expect("write code");

        let started = Instant::now();
        let result = sh_sandbox(temp.path())
            .execute(&code, Duration::from_millis(300))
            .expect("execute");

        assert!(result.timed_out);
        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(!result.stdout.contains("finished"));
    }

    #[test]
    fn background_child_is_killed_once_code_exits() {
        let temp = tempfile::tempdir().expect("tempdir");
        let code = temp.path().join("background.sh");
        fs::write(
            &code,
            "sleep 6 &\n(sleep 1; echo late > late.txt) &\nprintf '%s' '{\"status\":\"success\",\"result\":\"1\"}'\n",
        )
        .expect("write code");

        let started = Instant::now();
        let result = sh_sandbox(temp.path())
            .execute(&code, Duration::from_secs(5))
            .expect("execute");

        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(result.success());
        assert_eq!(result.stdout, r#"{"status":"success","result":"1"}"#);
        std::thread::sleep(Duration::from_millis(1500));
        assert!(!temp.path().join("late.txt").exists());
    }

    #[test]
    fn exposes_configured_suffix() {
        let sandbox = ProcessSandbox::from_config(&GenerationConfig::default(), Path::new("/data"));
        assert_eq!(sandbox.artifact_suffix(), ".py");
    }
}
