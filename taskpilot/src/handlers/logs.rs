use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};

use super::HandlerContext;

const RECENT_LOG_COUNT: usize = 10;

/// `.log` files directly under `dir`, newest first.
fn logs_by_recency(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut logs: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read {}", dir.display()))? {
        let entry = entry.context("read log dir entry")?;
        let path = entry.path();
        if path.extension().is_none_or(|ext| ext != "log") {
            continue;
        }
        let metadata = entry
            .metadata()
            .with_context(|| format!("stat {}", path.display()))?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata
            .modified()
            .with_context(|| format!("mtime {}", path.display()))?;
        logs.push((modified, path));
    }
    logs.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    Ok(logs.into_iter().map(|(_, path)| path).collect())
}

fn first_line(path: &Path) -> Result<String> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let text = String::from_utf8_lossy(&bytes);
    Ok(text.lines().next().unwrap_or("").trim().to_string())
}

pub(super) fn recent_log_heads_task(ctx: &HandlerContext<'_>) -> Result<String> {
    let dir = ctx.data_root.resolve("logs")?;
    let heads = logs_by_recency(&dir)?
        .iter()
        .take(RECENT_LOG_COUNT)
        .map(|path| first_line(path))
        .collect::<Result<Vec<_>>>()?;
    ctx.data_root.write("logs-recent.txt", &heads.join("\n"))?;
    Ok("A5 executed: Recent log lines written.".to_string())
}
