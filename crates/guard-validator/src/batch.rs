//! Batch validation.
//!
//! A batch is a JSON array of [`Instruction`]s. The result is an array of
//! the same length whose `i`-th element lists the violations of the `i`-th
//! script; instructions are independent of one another.

use std::sync::Arc;

use guard_error::GuardError;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Semaphore;

use crate::audit::{AuditEntryBuilder, AuditLogger, NoopAuditLogger};
#[cfg(feature = "metrics")]
use crate::metrics::GuardMetrics;
use crate::validator::Validator;
use crate::violation::Violation;

/// Default number of scripts validated at once by a [`BatchRunner`].
pub const DEFAULT_MAX_CONCURRENT: usize = 8;

/// One script to validate, with the dependency paths it may read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instruction {
    /// Script source.
    pub script: String,
    /// Dotted paths such as `"Q1.value"`.
    #[serde(default)]
    pub allowed_variables: Vec<String>,
}

impl Instruction {
    /// Build an instruction.
    pub fn new(
        script: impl Into<String>,
        allowed_variables: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            script: script.into(),
            allowed_variables: allowed_variables.into_iter().map(Into::into).collect(),
        }
    }
}

/// Violations of one script; empty when accepted.
pub type ValidationResult = Vec<Violation>;

/// Decode a JSON batch.
pub fn parse_batch(json: &str) -> Result<Vec<Instruction>, GuardError> {
    serde_json::from_str(json).map_err(GuardError::MalformedBatch)
}

/// Encode batch results as JSON.
pub fn encode_results(results: &[ValidationResult]) -> Result<String, GuardError> {
    serde_json::to_string(results).map_err(|e| GuardError::Internal(anyhow::Error::new(e)))
}

impl Validator {
    /// Validate every instruction in order on the calling thread.
    pub fn validate_batch(&self, instructions: &[Instruction]) -> Vec<ValidationResult> {
        let results: Vec<ValidationResult> = instructions
            .iter()
            .map(|i| self.validate_script(&i.script, &i.allowed_variables))
            .collect();
        log_batch(&results);
        results
    }

    /// Validate a JSON batch and return the JSON results.
    pub fn validate_code(&self, json: &str) -> Result<String, GuardError> {
        let instructions = parse_batch(json)?;
        encode_results(&self.validate_batch(&instructions))
    }
}

/// Validate a JSON batch with the default configuration.
///
/// ```
/// let out = guard_validator::validate_code(
///     r#"[{"script": "Q1.value + 1", "allowedVariables": ["Q1.value"]}, {"script": "x"}]"#,
/// ).unwrap();
/// assert_eq!(out, r#"[[],[{"message":"x is not defined","start":0,"end":1}]]"#);
/// ```
pub fn validate_code(json: &str) -> Result<String, GuardError> {
    Validator::default().validate_code(json)
}

fn log_batch(results: &[ValidationResult]) {
    let rejected = results.iter().filter(|r| !r.is_empty()).count();
    tracing::info!(
        scripts = results.len(),
        accepted = results.len() - rejected,
        rejected,
        "batch validated"
    );
}

/// Validates batches on the blocking pool, bounded by a semaphore.
///
/// Each script is audited through the configured [`AuditLogger`]. Results
/// come back in instruction order whatever order the scripts finish in.
pub struct BatchRunner {
    validator: Arc<Validator>,
    semaphore: Arc<Semaphore>,
    audit_logger: Arc<dyn AuditLogger>,
    #[cfg(feature = "metrics")]
    metrics: Option<Arc<GuardMetrics>>,
}

impl BatchRunner {
    /// Create a runner validating at most `max_concurrent` scripts at once.
    ///
    /// A limit of zero is treated as one.
    pub fn new(validator: Validator, max_concurrent: usize) -> Self {
        Self {
            validator: Arc::new(validator),
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            audit_logger: Arc::new(NoopAuditLogger),
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Send audit entries to `logger`.
    pub fn with_audit_logger(mut self, logger: Arc<dyn AuditLogger>) -> Self {
        self.audit_logger = logger;
        self
    }

    /// Record validation metrics.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, metrics: Arc<GuardMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The validator scripts are run through.
    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Validate `instructions` concurrently.
    pub async fn run(
        &self,
        instructions: Vec<Instruction>,
    ) -> Result<Vec<ValidationResult>, GuardError> {
        let mut handles = Vec::with_capacity(instructions.len());
        for instruction in instructions {
            let validator = Arc::clone(&self.validator);
            let semaphore = Arc::clone(&self.semaphore);
            let audit_logger = Arc::clone(&self.audit_logger);
            #[cfg(feature = "metrics")]
            let metrics = self.metrics.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| GuardError::Internal(anyhow::Error::new(e)))?;

                let builder =
                    AuditEntryBuilder::new(&instruction.script, instruction.allowed_variables.len());
                let violations = tokio::task::spawn_blocking(move || {
                    validator.validate_script(&instruction.script, &instruction.allowed_variables)
                })
                .await
                .map_err(|e| GuardError::Internal(anyhow::Error::new(e)))?;

                let entry = builder.finish(&violations);
                #[cfg(feature = "metrics")]
                if let Some(metrics) = &metrics {
                    metrics.record(
                        &entry.outcome,
                        entry.violation_count,
                        entry.duration_us as f64 / 1_000_000.0,
                    );
                }
                audit_logger.log(&entry).await;

                Ok::<_, GuardError>(violations)
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            let violations = handle.await.map_err(|e| GuardError::Internal(anyhow::Error::new(e)))??;
            results.push(violations);
        }
        log_batch(&results);
        Ok(results)
    }

    /// Validate a JSON batch concurrently and return the JSON results.
    pub async fn run_json(&self, json: &str) -> Result<String, GuardError> {
        let instructions = parse_batch(json)?;
        let results = self.run(instructions).await?;
        encode_results(&results)
    }

    /// Read a JSON batch from `reader` and validate it.
    ///
    /// Read failures, including input that is not UTF-8, are
    /// [`GuardError::Io`].
    pub async fn run_reader<R>(&self, mut reader: R) -> Result<String, GuardError>
    where
        R: AsyncRead + Unpin,
    {
        let mut json = String::new();
        reader.read_to_string(&mut json).await?;
        self.run_json(&json).await
    }
}

impl Default for BatchRunner {
    fn default() -> Self {
        Self::new(Validator::default(), DEFAULT_MAX_CONCURRENT)
    }
}
