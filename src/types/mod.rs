//! Type definitions for the loan approval service

pub mod applicant;
pub mod decision;

pub use applicant::{
    ApplicantRecord, ApplicantSummary, Education, Gender, HomeOwnership, LoanApplication,
    LoanIntent, PreviousDefaults,
};
pub use decision::{DecisionReply, DecisionReport, ModelStatus, PredictionResult};
