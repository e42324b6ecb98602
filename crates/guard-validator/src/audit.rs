//! Audit trail for validation decisions.
//!
//! Each script that passes through a [`crate::batch::BatchRunner`] yields one
//! [`AuditEntry`]: a fresh validation id, the SHA-256 of the script, a short
//! preview, the number of declared dependencies, and the verdict. Scripts
//! are never logged whole.
//!
//! Backends implement [`AuditLogger`]. [`TracingAuditLogger`] emits events
//! through `tracing`; [`JsonLinesAuditLogger`] appends newline-delimited JSON
//! to any `AsyncWrite`.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::time::Instant;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::violation::Violation;

/// Longest script preview kept in an entry, in bytes.
const SCRIPT_PREVIEW_MAX: usize = 200;

/// Record of one validation decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    /// Unique id of this validation.
    pub validation_id: String,
    /// When validation started.
    pub timestamp: DateTime<Utc>,
    /// SHA-256 of the script, hex encoded.
    pub script_hash: String,
    /// Leading bytes of the script.
    pub script_preview: String,
    /// How many dependency paths the script was allowed to read.
    pub allowed_variables: usize,
    /// Number of violations reported.
    pub violation_count: usize,
    /// Wall time spent validating, in microseconds.
    pub duration_us: u64,
    /// Verdict.
    pub outcome: AuditOutcome,
}

/// Verdict recorded for a script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
#[non_exhaustive]
pub enum AuditOutcome {
    /// No violations.
    Accepted,
    /// At least one violation; the first is kept for triage.
    Rejected {
        /// Message of the first violation.
        first_message: String,
    },
    /// The script never reached the walker.
    Unparseable,
}

impl AuditOutcome {
    /// Classify a validation result.
    pub fn from_violations(violations: &[Violation]) -> Self {
        match violations.first() {
            None => Self::Accepted,
            Some(first) if first.message == crate::violation::Reason::Unparseable.to_string() => {
                Self::Unparseable
            }
            Some(first) => Self::Rejected {
                first_message: first.message.clone(),
            },
        }
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected { .. } => "rejected",
            Self::Unparseable => "unparseable",
        }
    }
}

/// Sink for audit entries.
#[async_trait::async_trait]
pub trait AuditLogger: Send + Sync {
    /// Record one entry. Failures are logged, never propagated.
    async fn log(&self, entry: &AuditEntry);
}

/// Discards every entry.
pub struct NoopAuditLogger;

#[async_trait::async_trait]
impl AuditLogger for NoopAuditLogger {
    async fn log(&self, _entry: &AuditEntry) {}
}

/// Emits each entry as an `INFO` event carrying `audit = true`.
///
/// Filter with `RUST_LOG=guard_validator::audit=info`.
pub struct TracingAuditLogger;

#[async_trait::async_trait]
impl AuditLogger for TracingAuditLogger {
    async fn log(&self, entry: &AuditEntry) {
        tracing::info!(
            audit = true,
            validation_id = %entry.validation_id,
            script_hash = %entry.script_hash,
            allowed_variables = entry.allowed_variables,
            violations = entry.violation_count,
            duration_us = entry.duration_us,
            outcome = entry.outcome.label(),
            "script audited"
        );
    }
}

/// Appends entries as JSON lines to an `AsyncWrite` sink.
pub struct JsonLinesAuditLogger<W: AsyncWrite + Unpin + Send> {
    writer: Mutex<W>,
}

impl<W: AsyncWrite + Unpin + Send> JsonLinesAuditLogger<W> {
    /// Wrap `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the sink.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

#[async_trait::async_trait]
impl<W: AsyncWrite + Unpin + Send + 'static> AuditLogger for JsonLinesAuditLogger<W> {
    async fn log(&self, entry: &AuditEntry) {
        let mut line = match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!(error = %e, "failed to serialize audit entry");
                return;
            }
        };
        line.push('\n');

        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.write_all(line.as_bytes()).await {
            tracing::warn!(error = %e, "failed to write audit entry");
            return;
        }
        if let Err(e) = writer.flush().await {
            tracing::warn!(error = %e, "failed to flush audit sink");
        }
    }
}

/// SHA-256 of `data`, lowercase hex.
pub fn sha256_hex(data: &str) -> String {
    let digest = Sha256::digest(data.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Leading bytes of `script`, cut on a char boundary, with `...` when cut.
pub fn script_preview(script: &str) -> String {
    if script.len() <= SCRIPT_PREVIEW_MAX {
        return script.to_string();
    }
    let mut end = SCRIPT_PREVIEW_MAX;
    while !script.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &script[..end])
}

/// Collects the parts of an [`AuditEntry`] known before validation runs.
pub struct AuditEntryBuilder {
    validation_id: String,
    timestamp: DateTime<Utc>,
    script_hash: String,
    script_preview: String,
    allowed_variables: usize,
    start: Instant,
}

impl AuditEntryBuilder {
    /// Start timing a validation of `script`.
    pub fn new(script: &str, allowed_variables: usize) -> Self {
        Self {
            validation_id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            script_hash: sha256_hex(script),
            script_preview: script_preview(script),
            allowed_variables,
            start: Instant::now(),
        }
    }

    /// Close the entry with the validation result.
    pub fn finish(self, violations: &[Violation]) -> AuditEntry {
        AuditEntry {
            validation_id: self.validation_id,
            timestamp: self.timestamp,
            script_hash: self.script_hash,
            script_preview: self.script_preview,
            allowed_variables: self.allowed_variables,
            violation_count: violations.len(),
            duration_us: u64::try_from(self.start.elapsed().as_micros()).unwrap_or(u64::MAX),
            outcome: AuditOutcome::from_violations(violations),
        }
    }
}
