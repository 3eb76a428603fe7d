//! Handlers that shell out to external tools.

use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::info;

use super::HandlerContext;
use crate::io::process::{CommandOutput, run_command_with_timeout};

const TOOL_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const TOOL_OUTPUT_LIMIT_BYTES: usize = 1_000_000;

/// `uv run <datagen_url> <user_email>`
pub(super) fn run_datagen(ctx: &HandlerContext<'_>) -> Result<String> {
    let handlers = &ctx.config.handlers;
    let mut cmd = Command::new("uv");
    cmd.arg("run")
        .arg(&handlers.datagen_url)
        .arg(&handlers.user_email)
        .current_dir(ctx.data_root.path());
    let output = run_tool(cmd, "uv run datagen")?;
    info!(stdout_bytes = output.stdout.len(), "datagen finished");
    Ok("A1 executed: datagen.py ran successfully.".to_string())
}

/// `prettier --write <data_root>/format.md`
pub(super) fn format_markdown(ctx: &HandlerContext<'_>) -> Result<String> {
    if !ctx.data_root.exists("format.md")? {
        bail!("format.md not found under {}", ctx.data_root.path().display());
    }
    let path = ctx.data_root.resolve("format.md")?;
    let mut cmd = Command::new("prettier");
    cmd.arg("--write").arg(&path);
    run_tool(cmd, "prettier --write")?;
    Ok("A2 executed: format.md formatted with Prettier.".to_string())
}

fn run_tool(cmd: Command, label: &str) -> Result<CommandOutput> {
    let output = run_command_with_timeout(cmd, None, TOOL_TIMEOUT, TOOL_OUTPUT_LIMIT_BYTES)
        .with_context(|| format!("run {label}"))?;
    if output.timed_out {
        bail!("{label} timed out after {TOOL_TIMEOUT:?}");
    }
    if !output.success() {
        bail!(
            "{label} failed (exit {:?}): {}",
            output.exit_code,
            output.stderr_text().trim()
        );
    }
    Ok(output)
}
