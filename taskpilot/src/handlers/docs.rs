use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use walkdir::WalkDir;

use super::HandlerContext;

fn first_h1(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix("# "))
        .map(|title| title.trim().to_string())
}

/// Map each Markdown file under `dir` (relative, `/`-separated) to its first H1.
/// Files without an H1 are left out.
pub(crate) fn build_index(dir: &Path) -> Result<BTreeMap<String, String>> {
    let mut index = BTreeMap::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walk {}", dir.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "md") {
            continue;
        }
        let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let Some(title) = first_h1(&text) else {
            continue;
        };
        let rel = path
            .strip_prefix(dir)
            .with_context(|| format!("relativize {}", path.display()))?;
        let key = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        index.insert(key, title);
    }
    Ok(index)
}

pub(super) fn index_docs_task(ctx: &HandlerContext<'_>) -> Result<String> {
    let dir = ctx.data_root.resolve("docs")?;
    let index = build_index(&dir)?;
    let payload = serde_json::to_string(&index).context("serialize docs index")?;
    ctx.data_root.write("docs/index.json", &payload)?;
    Ok("A6 executed: Docs index created.".to_string())
}
