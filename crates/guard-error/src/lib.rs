//! Typed errors for the expression guard.
//!
//! Validation verdicts are data, not errors: a rejected script yields a list
//! of violations. [`GuardError`] covers only the failures around validation,
//! such as a batch that is not valid JSON or an input that cannot be read.

use thiserror::Error;

/// Failure of a guard operation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GuardError {
    /// The batch payload is not a JSON array of instructions.
    #[error("malformed batch: {0}")]
    MalformedBatch(#[source] serde_json::Error),

    /// Reading input or writing output failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// An internal error (catch-all for unexpected failures).
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl GuardError {
    /// Returns a static error code string for programmatic matching.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedBatch(_) => "MALFORMED_BATCH",
            Self::Io(_) => "IO",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Convert to a structured JSON error object.
    ///
    /// Malformed batches carry the line and column reported by the JSON
    /// parser.
    pub fn to_structured_error(&self) -> serde_json::Value {
        let mut obj = serde_json::json!({
            "error": true,
            "code": self.code(),
            "message": self.to_string(),
        });
        if let Self::MalformedBatch(e) = self {
            obj["line"] = e.line().into();
            obj["column"] = e.column().into();
        }
        obj
    }
}

// Compile-time assertion: GuardError must be Send + Sync + 'static
const _: fn() = || {
    fn assert_bounds<T: Send + Sync + 'static>() {}
    assert_bounds::<GuardError>();
};
