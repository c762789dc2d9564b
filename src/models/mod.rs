//! Pipeline loading and inference

pub mod inference;
pub mod loader;

pub use inference::{ColumnKind, InputLayout, OnnxPipeline};
pub use loader::ModelLoader;

use crate::feature_extractor::FeatureVector;

/// A trained classification pipeline, callable but never mutated by callers.
///
/// Implementations are shared across requests behind an `Arc`.
pub trait Pipeline: Send + Sync {
    /// Name used in logs and status replies
    fn name(&self) -> &str;

    /// Positive-class (approval) probability for one applicant.
    fn predict_probability(&self, features: &FeatureVector) -> anyhow::Result<f64>;
}
