//! Attempt accounting for the generation loop.
//!
//! Only the most recent failure is kept: each failure replaces the previous
//! error context instead of appending to it.

/// What the loop should do after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptTransition {
    /// Budget remains; generate again with the new error context.
    Retry,
    /// Budget spent; the loop must stop.
    Exhausted,
}

/// Per-request attempt state. Owned by exactly one in-flight request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptState {
    attempt: u32,
    max_attempts: u32,
    last_error: Option<String>,
}

impl AttemptState {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts,
            last_error: None,
        }
    }

    /// One-based attempt number, for logs and reports.
    pub fn number(&self) -> u32 {
        self.attempt + 1
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Error context from the previous attempt, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Record a failed attempt and decide whether another one is allowed.
    ///
    /// The attempt counter only advances on `Retry`, so after `Exhausted` it
    /// still names the final attempt.
    pub fn record_failure(&mut self, error: String) -> AttemptTransition {
        self.last_error = Some(error);
        if self.attempt + 1 < self.max_attempts {
            self.attempt += 1;
            AttemptTransition::Retry
        } else {
            AttemptTransition::Exhausted
        }
    }

    /// Consume the state, returning the final error context.
    pub fn into_last_error(self) -> Option<String> {
        self.last_error
    }
}
