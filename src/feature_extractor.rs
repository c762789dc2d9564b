//! Feature assembly for loan approval model inference.
//!
//! The exported pipeline was trained on a fixed set of 13 named columns.
//! Features are assembled in exactly that order; reordering them silently
//! corrupts predictions.

use crate::types::applicant::ApplicantRecord;

/// Number of columns the pipeline consumes
pub const FEATURE_COUNT: usize = 13;

/// Column names in the order the pipeline was trained on
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "person_age",
    "person_gender",
    "person_education",
    "person_income",
    "person_emp_exp",
    "person_home_ownership",
    "loan_intent",
    "loan_amnt",
    "loan_int_rate",
    "loan_percent_income",
    "cb_person_cred_hist_length",
    "credit_score",
    "previous_loan_defaults_on_file",
];

/// A single column value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue {
    Numeric(f64),
    /// Category label plus its ordinal code within the column's domain
    Categorical { label: &'static str, code: u32 },
}

impl FeatureValue {
    /// Numeric encoding used for tensor input.
    pub fn encode(&self) -> f32 {
        match self {
            FeatureValue::Numeric(v) => *v as f32,
            FeatureValue::Categorical { code, .. } => *code as f32,
        }
    }
}

/// One applicant as an ordered row of pipeline columns
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: [FeatureValue; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn values(&self) -> &[FeatureValue; FEATURE_COUNT] {
        &self.values
    }

    /// Look up a column by its training name.
    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        FEATURE_NAMES
            .iter()
            .position(|n| *n == name)
            .map(|i| &self.values[i])
    }

    /// Column name paired with value, in pipeline order
    pub fn named(&self) -> impl Iterator<Item = (&'static str, &FeatureValue)> {
        FEATURE_NAMES.iter().copied().zip(self.values.iter())
    }

    /// Flatten to the `[1, 13]` float row fed to the model.
    pub fn to_f32_row(&self) -> Vec<f32> {
        self.values.iter().map(FeatureValue::encode).collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Transforms applicant records into model input features.
pub struct FeatureExtractor;

impl FeatureExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Assemble the canonical feature vector for one applicant.
    ///
    /// `loan_percent_income` is recomputed here from amount and income.
    pub fn extract(&self, applicant: &ApplicantRecord) -> FeatureVector {
        FeatureVector {
            values: [
                FeatureValue::Numeric(applicant.age as f64),
                categorical(applicant.gender.as_str(), applicant.gender as u32),
                categorical(applicant.education.as_str(), applicant.education as u32),
                FeatureValue::Numeric(applicant.income as f64),
                FeatureValue::Numeric(applicant.employment_experience_years as f64),
                categorical(
                    applicant.home_ownership.as_str(),
                    applicant.home_ownership as u32,
                ),
                categorical(applicant.loan_intent.as_str(), applicant.loan_intent as u32),
                FeatureValue::Numeric(applicant.loan_amount as f64),
                FeatureValue::Numeric(applicant.loan_interest_rate),
                FeatureValue::Numeric(applicant.loan_percent_income()),
                FeatureValue::Numeric(applicant.credit_history_length_years as f64),
                FeatureValue::Numeric(applicant.credit_score as f64),
                categorical(
                    applicant.previous_defaults.as_str(),
                    applicant.previous_defaults as u32,
                ),
            ],
        }
    }

    pub fn feature_count(&self) -> usize {
        FEATURE_COUNT
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn categorical(label: &'static str, code: u32) -> FeatureValue {
    FeatureValue::Categorical { label, code }
}
