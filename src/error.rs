//! Typed errors the CLI layer needs to match on, alongside the
//! `anyhow::Result` used everywhere else in this crate.

use std::fmt;

/// Config file present but malformed, or a preflight cap was exceeded.
#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
}

impl ConfigError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

/// Store schema version does not match what this binary understands.
#[derive(Debug)]
pub struct SchemaError {
    pub found: String,
    pub expected: String,
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unsupported store schema version {}; expected {}",
            self.found, self.expected
        )
    }
}

impl std::error::Error for SchemaError {}

/// Query could not even be planned (bad flag combination, unknown tag).
#[derive(Debug)]
pub struct QueryPlanError {
    pub message: String,
}

impl QueryPlanError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for QueryPlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for QueryPlanError {}
