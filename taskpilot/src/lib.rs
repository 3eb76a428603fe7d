//! LLM-backed task-execution agent.
//!
//! A free-text task is either classified onto a fixed catalog of handlers
//! ([`dispatch`]) or turned into a program that is generated, executed, and
//! validated in a bounded retry loop ([`generate`]). The architecture keeps a
//! strict separation:
//!
//! - **[`core`]**: Pure logic (key normalization, output validation, attempt
//!   bookkeeping, error context). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (config, data root, process
//!   execution, LLM HTTP client). Seams are traits so tests can swap them.
//!
//! Orchestration modules ([`dispatch`], [`generate`]) combine the two and back
//! both the CLI and the HTTP server.

pub mod core;
pub mod dispatch;
pub mod exit_codes;
pub mod generate;
pub mod handlers;
pub mod io;
pub mod logging;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
