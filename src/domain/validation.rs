//! Validation verdicts attached to model outputs before aggregation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::output::ModelOutput;

/// A single rule violation found by the validator.
///
/// Closed set of variants so every state is exhaustively handled; no
/// free-form string bags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationIssue {
    /// Output is older than the configured maximum age.
    Stale { age_secs: i64, max_age_secs: i64 },
    /// Predicted value falls outside the market's plausible range.
    OutOfBounds { value: f64, lower: f64, upper: f64 },
    /// Confidence is below the configured floor; excluded from the
    /// ensemble but kept for audit.
    LowSignal { confidence: f64, floor: f64 },
    /// Feature attributions do not add up to the predicted move from
    /// baseline. Warning only; does not exclude the output.
    InconsistentAttribution { deviation: f64, tolerance: f64 },
}

impl ValidationIssue {
    /// Whether this issue excludes the output from aggregation.
    pub fn excludes(&self) -> bool {
        !matches!(self, ValidationIssue::InconsistentAttribution { .. })
    }
}

/// A model output together with its validation verdict.
///
/// Invalid entries are excluded from aggregation but retained in the
/// audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedOutput {
    pub output: ModelOutput,
    pub is_valid: bool,
    pub violations: Vec<ValidationIssue>,
    pub validated_at: DateTime<Utc>,
}

impl ValidatedOutput {
    /// The first violation that caused exclusion, if any.
    pub fn primary_violation(&self) -> Option<&ValidationIssue> {
        self.violations.iter().find(|v| v.excludes())
    }
}
