//! Agent configuration loaded once at process start (`taskpilot.toml`).

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "taskpilot.toml";

/// Agent configuration (TOML).
///
/// Missing fields default to the values the agent was designed around
/// (`/data` root, three attempts, sixty-second executions).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Restricted directory every handler and generated program works under.
    pub data_root: PathBuf,

    /// Where generated code artifacts are written. Defaults to the system temp dir.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,

    pub llm: LlmConfig,
    pub generation: GenerationConfig,
    pub handlers: HandlerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LlmConfig {
    /// Base URL of an OpenAI-compatible API (`/chat/completions` is appended).
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the bearer token.
    pub api_key_env: String,
    pub request_timeout_secs: u64,
    pub classify_max_tokens: u32,
    pub generate_max_tokens: u32,
    pub handler_max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "AIPROXY_TOKEN".to_string(),
            request_timeout_secs: 60,
            classify_max_tokens: 200,
            generate_max_tokens: 1500,
            handler_max_tokens: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GenerationConfig {
    /// Total generation attempts per request.
    pub max_attempts: u32,
    /// Wall-clock budget for one execution of generated code.
    pub exec_timeout_secs: u64,
    /// Truncate captured stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
    /// Truncate each stream quoted in an error context beyond this many bytes.
    pub error_context_limit_bytes: usize,
    /// Interpreter command; the code artifact path is appended as the last argument.
    pub interpreter: Vec<String>,
    /// File suffix for code artifacts (e.g. `.py`).
    pub code_suffix: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            exec_timeout_secs: 60,
            output_limit_bytes: 100_000,
            error_context_limit_bytes: 4_000,
            interpreter: vec!["python3".to_string()],
            code_suffix: ".py".to_string(),
        }
    }
}

impl GenerationConfig {
    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec_timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HandlerConfig {
    /// Email passed to the data generation script. `USER_EMAIL` overrides it.
    pub user_email: String,
    pub datagen_url: String,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            user_email: "your.email@example.com".to_string(),
            datagen_url: "https://raw.githubusercontent.com/sanand0/tools-in-data-science-public/tds-2025-01/project-1/datagen.py".to_string(),
        }
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("/data"),
            scratch_dir: None,
            llm: LlmConfig::default(),
            generation: GenerationConfig::default(),
            handlers: HandlerConfig::default(),
        }
    }
}

impl AgentConfig {
    pub fn validate(&self) -> Result<()> {
        if self.data_root.as_os_str().is_empty() {
            return Err(anyhow!("data_root must be non-empty"));
        }
        if self.llm.base_url.trim().is_empty() {
            return Err(anyhow!("llm.base_url must be non-empty"));
        }
        if self.llm.model.trim().is_empty() {
            return Err(anyhow!("llm.model must be non-empty"));
        }
        if self.llm.api_key_env.trim().is_empty() {
            return Err(anyhow!("llm.api_key_env must be non-empty"));
        }
        if self.llm.request_timeout_secs == 0 {
            return Err(anyhow!("llm.request_timeout_secs must be > 0"));
        }
        if self.llm.classify_max_tokens == 0
            || self.llm.generate_max_tokens == 0
            || self.llm.handler_max_tokens == 0
        {
            return Err(anyhow!("llm max_tokens settings must be > 0"));
        }
        if self.generation.max_attempts == 0 {
            return Err(anyhow!("generation.max_attempts must be > 0"));
        }
        if self.generation.exec_timeout_secs == 0 {
            return Err(anyhow!("generation.exec_timeout_secs must be > 0"));
        }
        if self.generation.output_limit_bytes == 0 {
            return Err(anyhow!("generation.output_limit_bytes must be > 0"));
        }
        if self.generation.error_context_limit_bytes == 0 {
            return Err(anyhow!("generation.error_context_limit_bytes must be > 0"));
        }
        if self.generation.interpreter.is_empty() || self.generation.interpreter[0].trim().is_empty()
        {
            return Err(anyhow!("generation.interpreter must be a non-empty array"));
        }
        Ok(())
    }

    /// Directory for temporary code artifacts.
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Load config from a TOML file and apply environment overrides.
///
/// If the file is missing, returns `AgentConfig::default()` (with overrides).
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    let mut cfg = if path.exists() {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?
    } else {
        AgentConfig::default()
    };
    apply_env_overrides(&mut cfg, |name| std::env::var(name).ok());
    cfg.validate()?;
    Ok(cfg)
}

fn apply_env_overrides<F: Fn(&str) -> Option<String>>(cfg: &mut AgentConfig, lookup: F) {
    if let Some(email) = lookup("USER_EMAIL").filter(|v| !v.trim().is_empty()) {
        cfg.handlers.user_email = email;
    }
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AgentConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_generation_contract() {
        let cfg = AgentConfig::default();
        assert_eq!(cfg.generation.max_attempts, 3);
        assert_eq!(cfg.generation.exec_timeout(), Duration::from_secs(60));
        assert_eq!(cfg.data_root, PathBuf::from("/data"));
        cfg.validate().expect("defaults validate");
    }

    #[test]
    fn load_missing_returns_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg.generation, GenerationConfig::default());
        assert_eq!(cfg.llm, LlmConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("taskpilot.toml");
        let mut cfg = AgentConfig::default();
        cfg.data_root = temp.path().join("data");
        cfg.generation.interpreter = vec!["sh".to_string()];
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded.data_root, cfg.data_root);
        assert_eq!(loaded.generation, cfg.generation);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("taskpilot.toml");
        fs::write(&path, "data_root = \"/srv/data\"\n[generation]\nmax_attempts = 5\n")
            .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.data_root, PathBuf::from("/srv/data"));
        assert_eq!(cfg.generation.max_attempts, 5);
        assert_eq!(cfg.generation.exec_timeout_secs, 60);
    }

    #[test]
    fn validate_rejects_zero_attempts_and_empty_interpreter() {
        let mut cfg = AgentConfig::default();
        cfg.generation.max_attempts = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = AgentConfig::default();
        cfg.generation.interpreter = vec![" ".to_string()];
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("interpreter"));
    }

    #[test]
    fn user_email_env_overrides_file() {
        let mut cfg = AgentConfig::default();
        apply_env_overrides(&mut cfg, |name| {
            (name == "USER_EMAIL").then(|| "me@example.com".to_string())
        });
        assert_eq!(cfg.handlers.user_email, "me@example.com");
    }
}
