//! Classification and fixed-handler dispatch for `taskpilot run` and `POST /run`.

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::core::classifier::{Resolution, UNKNOWN_KEY, normalize_key, resolve_key};
use crate::handlers::{self, CatalogEntry, HandlerContext};
use crate::io::config::AgentConfig;
use crate::io::data_root::DataRoot;
use crate::io::llm::{DEFAULT_SYSTEM_MESSAGE, LlmClient, query};
use crate::io::prompt::render_classifier;

/// The classifier produced a key that has no handler (including `unknown`).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown or unmapped task identifier: {key}")]
pub struct UnresolvedTask {
    pub key: String,
}

/// A handler that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRun {
    pub key: String,
    pub message: String,
}

/// Map a free-text description to a normalized key token.
///
/// The token is not checked against the catalog here. An empty description
/// yields `unknown` without contacting the LLM.
#[instrument(skip_all, fields(description_bytes = description.len()))]
pub fn classify<L: LlmClient + ?Sized>(
    llm: &L,
    cfg: &AgentConfig,
    description: &str,
) -> Result<String> {
    let prompt = render_classifier(&handlers::catalog_lines(), description)?;
    if description.trim().is_empty() {
        info!("empty description classified as unknown");
        return Ok(UNKNOWN_KEY.to_string());
    }
    let raw = query(
        llm,
        DEFAULT_SYSTEM_MESSAGE,
        &prompt,
        cfg.llm.classify_max_tokens,
    )
    .context("classify task")?;
    let token = normalize_key(&raw);
    info!(token = %token, "task classified");
    Ok(token)
}

/// Classify `description` and look up its handler.
pub fn resolve<L: LlmClient + ?Sized>(
    llm: &L,
    cfg: &AgentConfig,
    description: &str,
) -> Result<&'static CatalogEntry> {
    let token = classify(llm, cfg, description)?;
    match resolve_key(&token, handlers::keys()) {
        Resolution::Known(key) => {
            handlers::find(&key).ok_or_else(|| UnresolvedTask { key }.into())
        }
        Resolution::Unresolved(key) => Err(UnresolvedTask { key }.into()),
    }
}

/// Classify, dispatch, and run the matching handler against the configured data root.
#[instrument(skip_all)]
pub fn run_task(llm: &dyn LlmClient, cfg: &AgentConfig, description: &str) -> Result<TaskRun> {
    let entry = resolve(llm, cfg, description)?;
    let data_root = DataRoot::new(&cfg.data_root);
    let ctx = HandlerContext {
        data_root: &data_root,
        llm,
        config: cfg,
    };
    info!(key = entry.key, "running handler");
    let message = (entry.run)(&ctx).with_context(|| format!("handler {} failed", entry.key))?;
    Ok(TaskRun {
        key: entry.key.to_string(),
        message,
    })
}
