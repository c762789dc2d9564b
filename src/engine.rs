//! Decision engine: applicant record in, approval decision out.

use crate::error::DecisionError;
use crate::feature_extractor::{FeatureExtractor, FEATURE_COUNT};
use crate::models::Pipeline;
use crate::types::applicant::ApplicantRecord;
use crate::types::decision::{ModelStatus, PredictionResult};
use std::sync::Arc;
use tracing::debug;

/// Probability above which a loan is approved. Exactly 0.5 is rejected.
pub const APPROVAL_THRESHOLD: f64 = 0.5;

/// Apply the approval threshold to a pipeline probability.
pub fn is_approved(probability: f64) -> bool {
    probability > APPROVAL_THRESHOLD
}

/// Score one applicant against a pipeline.
pub fn decide_with(
    applicant: &ApplicantRecord,
    pipeline: &dyn Pipeline,
) -> Result<PredictionResult, DecisionError> {
    let features = FeatureExtractor::new().extract(applicant);

    let probability = pipeline
        .predict_probability(&features)
        .map_err(DecisionError::Inference)?;

    if !(0.0..=1.0).contains(&probability) {
        return Err(DecisionError::InvalidProbability(probability));
    }

    Ok(PredictionResult {
        approved: is_approved(probability),
        probability,
    })
}

/// Holds the shared pipeline handle and turns applicants into decisions.
#[derive(Clone)]
pub struct DecisionEngine {
    pipeline: Arc<dyn Pipeline>,
}

impl DecisionEngine {
    pub fn new(pipeline: Arc<dyn Pipeline>) -> Self {
        Self { pipeline }
    }

    /// Decide a single application. Failures are per request.
    pub fn decide(&self, applicant: &ApplicantRecord) -> Result<PredictionResult, DecisionError> {
        let result = decide_with(applicant, self.pipeline.as_ref())?;

        debug!(
            model = %self.pipeline.name(),
            approved = result.approved,
            probability = result.probability,
            "Applicant decided"
        );

        Ok(result)
    }

    pub fn status(&self) -> ModelStatus {
        ModelStatus {
            name: self.pipeline.name().to_string(),
            algorithm: "Extreme Gradient Boosting".to_string(),
            feature_count: FEATURE_COUNT,
            ready: true,
        }
    }
}
