//! Error types for the resolver crate.

use thiserror::Error;

/// Errors that can occur when building rules or resolving names.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Invalid regular expression pattern for a dynamic rule.
    #[error("invalid rule pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A dynamic rule's value producer failed.
    #[error("rule '{key}' failed to resolve '{input}': {message}")]
    Rule {
        key: String,
        input: String,
        message: String,
    },
}

impl ResolveError {
    /// Creates a rule failure for the given rule key and input string.
    pub fn rule(key: impl Into<String>, input: impl Into<String>, message: impl Into<String>) -> Self {
        ResolveError::Rule {
            key: key.into(),
            input: input.into(),
            message: message.into(),
        }
    }
}

/// Result type for resolver operations.
pub type Result<T> = std::result::Result<T, ResolveError>;
