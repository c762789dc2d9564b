//! Loan Approval Service Library
//!
//! Scores loan applications with a pre-trained gradient-boosted pipeline
//! exported to ONNX and serves decisions over NATS.

pub mod config;
pub mod consumer;
pub mod engine;
pub mod error;
pub mod feature_extractor;
pub mod handler;
pub mod metrics;
pub mod models;
pub mod producer;
pub mod types;

pub use config::AppConfig;
pub use consumer::ApplicationConsumer;
pub use engine::{DecisionEngine, APPROVAL_THRESHOLD};
pub use error::{DecisionError, LoadError, ValidationError};
pub use feature_extractor::{FeatureExtractor, FeatureVector};
pub use handler::ApplicationHandler;
pub use models::{ModelLoader, OnnxPipeline, Pipeline};
pub use producer::DecisionProducer;
pub use types::{applicant::ApplicantRecord, applicant::LoanApplication, decision::PredictionResult};
