//! Request handling: raw payload in, rendered reply out.

use crate::engine::DecisionEngine;
use crate::metrics::DecisionMetrics;
use crate::types::applicant::LoanApplication;
use crate::types::decision::{DecisionReply, DecisionReport};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

/// Turns application payloads into decision replies.
///
/// Every error is folded into a `failed` reply; nothing here stops the
/// service.
#[derive(Clone)]
pub struct ApplicationHandler {
    engine: DecisionEngine,
    metrics: Arc<DecisionMetrics>,
}

impl ApplicationHandler {
    pub fn new(engine: DecisionEngine, metrics: Arc<DecisionMetrics>) -> Self {
        Self { engine, metrics }
    }

    pub fn handle(&self, payload: &[u8]) -> DecisionReply {
        let start_time = Instant::now();

        let application: LoanApplication = match serde_json::from_slice(payload) {
            Ok(application) => application,
            Err(e) => {
                warn!(error = %e, "Failed to deserialize application");
                self.metrics.record_failure();
                return DecisionReply::failed(None, format!("invalid application: {}", e));
            }
        };

        let app_id = application.application_id.clone();

        if let Err(e) = application.applicant.validate() {
            warn!(application_id = %app_id, error = %e, "Application rejected by validation");
            self.metrics.record_failure();
            return DecisionReply::failed(Some(app_id), e);
        }

        match self.engine.decide(&application.applicant) {
            Ok(result) => {
                let elapsed = start_time.elapsed();
                self.metrics.record_decision(elapsed, &result);

                info!(
                    application_id = %app_id,
                    label = result.label(),
                    probability = result.probability,
                    summary = %application.applicant.summary(),
                    decision_time_us = elapsed.as_micros() as u64,
                    "Application decided"
                );

                DecisionReply::Decided(DecisionReport::new(app_id, &result))
            }
            Err(e) => {
                error!(application_id = %app_id, error = %e, "Decision failed");
                self.metrics.record_failure();
                DecisionReply::failed(Some(app_id), e)
            }
        }
    }
}
