//! Shared application state for the HTTP server.

use std::sync::Arc;

use anyhow::Result;
use taskpilot::generate::CodeGenerator;
use taskpilot::io::config::AgentConfig;
use taskpilot::io::data_root::DataRoot;
use taskpilot::io::llm::LlmClient;
use taskpilot::io::sandbox::Sandbox;

pub type SharedLlm = Arc<dyn LlmClient + Send + Sync>;
pub type SharedSandbox = Arc<dyn Sandbox + Send + Sync>;

/// Shared state accessible from all request handlers.
///
/// Everything is read-only after startup; requests share no mutable state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AgentConfig>,
    pub llm: SharedLlm,
    pub sandbox: SharedSandbox,
    pub generator: Arc<CodeGenerator>,
}

impl AppState {
    pub fn new(config: AgentConfig, llm: SharedLlm, sandbox: SharedSandbox) -> Result<Self> {
        let generator = CodeGenerator::from_config(&config)?;
        Ok(Self {
            config: Arc::new(config),
            llm,
            sandbox,
            generator: Arc::new(generator),
        })
    }

    pub fn data_root(&self) -> DataRoot {
        DataRoot::new(&self.config.data_root)
    }
}
