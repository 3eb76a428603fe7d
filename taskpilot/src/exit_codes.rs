//! Stable exit codes for taskpilot CLI commands.

/// Command succeeded.
pub const OK: i32 = 0;
/// Invalid config, path, or input, or any other error.
pub const INVALID: i32 = 1;
/// The classifier produced no catalog key for the description.
pub const UNRESOLVED: i32 = 2;
/// Generated code never produced valid output within the attempt budget.
pub const EXHAUSTED: i32 = 3;
