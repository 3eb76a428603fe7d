//! Deterministic, pure logic shared by the agent.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data and return deterministic outputs suitable for tests.

pub mod attempts;
pub mod classifier;
pub mod error_context;
pub mod output_validator;
pub mod path;
pub mod types;
