//! Side-effecting operations: config, filesystem, processes, and the LLM backend.

pub mod config;
pub mod data_root;
pub mod llm;
pub mod process;
pub mod prompt;
pub mod sandbox;
