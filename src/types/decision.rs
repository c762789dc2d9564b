//! Decision results and the replies rendered from them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of scoring one applicant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Whether the loan is approved
    pub approved: bool,
    /// Positive-class probability returned by the pipeline (0.0 - 1.0)
    pub probability: f64,
}

impl PredictionResult {
    pub fn label(&self) -> &'static str {
        if self.approved {
            "APPROVED"
        } else {
            "REJECTED"
        }
    }

    /// Name of the confidence metric shown for this outcome
    pub fn metric_name(&self) -> &'static str {
        if self.approved {
            "Approval Confidence"
        } else {
            "Risk Score"
        }
    }

    /// Approval confidence when approved, risk score when rejected, in percent
    pub fn metric_percent(&self) -> f64 {
        if self.approved {
            self.probability * 100.0
        } else {
            (1.0 - self.probability) * 100.0
        }
    }

    /// Metric formatted to one decimal place, e.g. `82.0%`
    pub fn metric_display(&self) -> String {
        format!("{:.1}%", self.metric_percent())
    }
}

impl fmt::Display for PredictionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}: {})",
            self.label(),
            self.metric_name(),
            self.metric_display()
        )
    }
}

/// Rendered decision sent back to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionReport {
    pub decision_id: String,
    pub application_id: String,
    pub approved: bool,
    pub probability: f64,
    /// `APPROVED` or `REJECTED`
    pub label: String,
    pub metric_name: String,
    /// One-decimal percentage string
    pub metric: String,
    pub decided_at: DateTime<Utc>,
}

impl DecisionReport {
    pub fn new(application_id: String, result: &PredictionResult) -> Self {
        Self {
            decision_id: uuid::Uuid::new_v4().to_string(),
            application_id,
            approved: result.approved,
            probability: result.probability,
            label: result.label().to_string(),
            metric_name: result.metric_name().to_string(),
            metric: result.metric_display(),
            decided_at: Utc::now(),
        }
    }
}

/// Reply to a single application request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DecisionReply {
    Decided(DecisionReport),
    Failed {
        application_id: Option<String>,
        message: String,
    },
}

impl DecisionReply {
    pub fn failed(application_id: Option<String>, cause: impl fmt::Display) -> Self {
        DecisionReply::Failed {
            application_id,
            message: format!("Prediction Error: {}", cause),
        }
    }
}

/// Static description of the loaded model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStatus {
    pub name: String,
    pub algorithm: String,
    pub feature_count: usize,
    pub ready: bool,
}
