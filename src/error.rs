//! Caller-visible error taxonomy
//!
//! Everything that goes wrong before a sandboxed process starts is an
//! [`EngineError`]. Once the sandbox is running, all terminal conditions are
//! reported as an `ExecutionResult` status instead, never as an error.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Submission rejected before the security filter ran
    /// (empty source, oversized source, unsupported language string).
    #[error("invalid submission: {0}")]
    Validation(String),

    /// The static security filter matched a forbidden pattern.
    #[error("forbidden pattern in source code: {pattern}")]
    SecurityViolation { pattern: String },

    /// Compilation failed, the compiler could not be launched, or it exited
    /// cleanly without producing the expected artifact.
    #[error("compilation failed: {diagnostics}")]
    Compile { diagnostics: String },

    /// Workspace or I/O fault before the sandbox was started.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
