//! Prometheus metrics for script validation.
//!
//! Only compiled with the `metrics` feature.

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::Histogram;
use prometheus_client::registry::Registry;

use crate::audit::AuditOutcome;

/// Labels keyed by verdict.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct OutcomeLabels {
    /// `accepted`, `rejected` or `unparseable`.
    pub outcome: String,
}

/// Validation metrics registered with a [`Registry`].
pub struct GuardMetrics {
    /// Scripts validated, by verdict.
    pub scripts_total: Family<OutcomeLabels, Counter>,
    /// Time spent per script, in seconds.
    pub validation_duration_seconds: Histogram,
    /// Violations reported across all scripts.
    pub violations_total: Counter,
}

impl GuardMetrics {
    /// Create the metrics and register them under `guard_`.
    pub fn new(registry: &mut Registry) -> Self {
        let scripts_total = Family::default();
        registry.register(
            "guard_scripts",
            "Scripts validated by outcome",
            scripts_total.clone(),
        );

        let validation_duration_seconds = Histogram::new(
            [0.000_01, 0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05].into_iter(),
        );
        registry.register(
            "guard_validation_duration_seconds",
            "Per-script validation time",
            validation_duration_seconds.clone(),
        );

        let violations_total = Counter::default();
        registry.register(
            "guard_violations",
            "Violations reported",
            violations_total.clone(),
        );

        Self {
            scripts_total,
            validation_duration_seconds,
            violations_total,
        }
    }

    /// Record one validated script.
    pub fn record(&self, outcome: &AuditOutcome, violations: usize, duration_secs: f64) {
        let labels = OutcomeLabels {
            outcome: outcome.label().to_string(),
        };
        self.scripts_total.get_or_create(&labels).inc();
        self.validation_duration_seconds.observe(duration_secs);
        self.violations_total.inc_by(violations as u64);
    }
}
