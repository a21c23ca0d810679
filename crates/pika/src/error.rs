//! Error types for the engine.

use thiserror::Error;

use crate::plugin::HookError;

/// Errors surfaced by fallible engine operations.
///
/// The hook pipeline itself never returns these: plugin failures are logged
/// and the previous payload is carried forward.
#[derive(Debug, Error)]
pub enum PikaError {
    /// A plugin hook failed.
    #[error(transparent)]
    Hook(#[from] HookError),

    /// A resolver rule failed or could not be built.
    #[error(transparent)]
    Resolve(#[from] pika_resolver::ResolveError),

    /// A configuration value is malformed.
    #[error("invalid config: {0}")]
    Config(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, PikaError>;
