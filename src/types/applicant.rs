//! Applicant data structures for loan approval scoring

use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Applicant gender as recorded in the training data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub const ALL: [Gender; 2] = [Gender::Male, Gender::Female];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

/// Highest completed education level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Education {
    #[serde(rename = "High School")]
    HighSchool,
    Associate,
    Bachelor,
    Master,
    Doctorate,
}

impl Education {
    pub const ALL: [Education; 5] = [
        Education::HighSchool,
        Education::Associate,
        Education::Bachelor,
        Education::Master,
        Education::Doctorate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Education::HighSchool => "High School",
            Education::Associate => "Associate",
            Education::Bachelor => "Bachelor",
            Education::Master => "Master",
            Education::Doctorate => "Doctorate",
        }
    }
}

/// Housing situation of the applicant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HomeOwnership {
    Rent,
    Own,
    Mortgage,
    Other,
}

impl HomeOwnership {
    pub const ALL: [HomeOwnership; 4] = [
        HomeOwnership::Rent,
        HomeOwnership::Own,
        HomeOwnership::Mortgage,
        HomeOwnership::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HomeOwnership::Rent => "RENT",
            HomeOwnership::Own => "OWN",
            HomeOwnership::Mortgage => "MORTGAGE",
            HomeOwnership::Other => "OTHER",
        }
    }
}

/// Stated purpose of the loan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoanIntent {
    Personal,
    Education,
    Medical,
    Venture,
    Home,
    DebtConsolidation,
}

impl LoanIntent {
    pub const ALL: [LoanIntent; 6] = [
        LoanIntent::Personal,
        LoanIntent::Education,
        LoanIntent::Medical,
        LoanIntent::Venture,
        LoanIntent::Home,
        LoanIntent::DebtConsolidation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LoanIntent::Personal => "PERSONAL",
            LoanIntent::Education => "EDUCATION",
            LoanIntent::Medical => "MEDICAL",
            LoanIntent::Venture => "VENTURE",
            LoanIntent::Home => "HOME",
            LoanIntent::DebtConsolidation => "DEBTCONSOLIDATION",
        }
    }
}

/// Whether a previous loan default is on file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreviousDefaults {
    No,
    Yes,
}

impl PreviousDefaults {
    pub const ALL: [PreviousDefaults; 2] = [PreviousDefaults::No, PreviousDefaults::Yes];

    pub fn as_str(&self) -> &'static str {
        match self {
            PreviousDefaults::No => "No",
            PreviousDefaults::Yes => "Yes",
        }
    }
}

/// One loan applicant as entered on the application form.
///
/// `loan_percent_income` is not stored: it is always derived from
/// `loan_amount` and `income`, and a value supplied on the wire is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantRecord {
    /// Age in years (18-80)
    #[serde(alias = "person_age")]
    pub age: u32,

    #[serde(alias = "person_gender")]
    pub gender: Gender,

    #[serde(alias = "person_education")]
    pub education: Education,

    /// Annual income in whole currency units (0-1,000,000)
    #[serde(alias = "person_income")]
    pub income: u64,

    /// Years of employment experience (0-50)
    #[serde(alias = "person_emp_exp")]
    pub employment_experience_years: u32,

    #[serde(alias = "person_home_ownership")]
    pub home_ownership: HomeOwnership,

    pub loan_intent: LoanIntent,

    /// Requested amount in whole currency units (0-500,000)
    #[serde(alias = "loan_amnt")]
    pub loan_amount: u64,

    /// Interest rate in percent (0.0-30.0)
    #[serde(alias = "loan_int_rate")]
    pub loan_interest_rate: f64,

    /// Length of credit history in years (0-40)
    #[serde(alias = "cb_person_cred_hist_length")]
    pub credit_history_length_years: u32,

    /// Credit score (300-850)
    pub credit_score: u32,

    #[serde(alias = "previous_loan_defaults_on_file")]
    pub previous_defaults: PreviousDefaults,
}

impl ApplicantRecord {
    /// Loan amount as a fraction of income, rounded to two decimals.
    ///
    /// Rounds the exact binary quotient half-to-even, so 1000/8000 gives
    /// 0.12 and 15/1000 (stored just below 0.015) gives 0.01. Zero income
    /// yields 0.0.
    pub fn loan_percent_income(&self) -> f64 {
        if self.income == 0 {
            return 0.0;
        }
        let ratio = self.loan_amount as f64 / self.income as f64;
        format!("{:.2}", ratio).parse().unwrap_or(ratio)
    }

    /// Check every field against the ranges the application form allows.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_range("age", self.age as f64, 18.0, 80.0)?;
        check_range("income", self.income as f64, 0.0, 1_000_000.0)?;
        check_range(
            "employment_experience_years",
            self.employment_experience_years as f64,
            0.0,
            50.0,
        )?;
        check_range("loan_amount", self.loan_amount as f64, 0.0, 500_000.0)?;
        check_range("loan_interest_rate", self.loan_interest_rate, 0.0, 30.0)?;
        check_range(
            "credit_history_length_years",
            self.credit_history_length_years as f64,
            0.0,
            40.0,
        )?;
        check_range("credit_score", self.credit_score as f64, 300.0, 850.0)?;
        Ok(())
    }

    /// Short human-readable summary of the application.
    pub fn summary(&self) -> ApplicantSummary {
        ApplicantSummary {
            income: format!("${}", group_thousands(self.income)),
            loan: format!(
                "${} ({}% of income)",
                group_thousands(self.loan_amount),
                (self.loan_percent_income() * 100.0) as i64
            ),
            education: self.education.as_str().to_string(),
            credit_score: self.credit_score,
        }
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    // NaN fails both comparisons, so test for membership rather than exclusion
    if value >= min && value <= max {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

/// Rendered application summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicantSummary {
    pub income: String,
    pub loan: String,
    pub education: String,
    pub credit_score: u32,
}

impl fmt::Display for ApplicantSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Income: {} | Loan: {} | Education: {} | Credit Score: {}",
            self.income, self.loan, self.education, self.credit_score
        )
    }
}

/// Application envelope received by the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanApplication {
    /// Caller-supplied identifier, generated when absent
    #[serde(default = "new_application_id")]
    pub application_id: String,

    #[serde(flatten)]
    pub applicant: ApplicantRecord,

    #[serde(default = "Utc::now")]
    pub submitted_at: DateTime<Utc>,
}

fn new_application_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl LoanApplication {
    pub fn new(application_id: String, applicant: ApplicantRecord) -> Self {
        Self {
            application_id,
            applicant,
            submitted_at: Utc::now(),
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_applicant() -> ApplicantRecord {
    ApplicantRecord {
        age: 30,
        gender: Gender::Female,
        education: Education::Bachelor,
        income: 50_000,
        employment_experience_years: 5,
        home_ownership: HomeOwnership::Rent,
        loan_intent: LoanIntent::Personal,
        loan_amount: 10_000,
        loan_interest_rate: 11.0,
        credit_history_length_years: 5,
        credit_score: 700,
        previous_defaults: PreviousDefaults::No,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loan_percent_income() {
        let applicant = sample_applicant();
        assert_eq!(applicant.loan_percent_income(), 0.2);

        let applicant = ApplicantRecord {
            income: 30_000,
            loan_amount: 10_000,
            ..sample_applicant()
        };
        assert_eq!(applicant.loan_percent_income(), 0.33);

        let applicant = ApplicantRecord {
            income: 3_000,
            loan_amount: 2_000,
            ..sample_applicant()
        };
        assert_eq!(applicant.loan_percent_income(), 0.67);
    }

    #[test]
    fn test_loan_percent_income_rounds_exact_quotient() {
        // 0.125 is an exact tie and goes to the even neighbour
        let tie = ApplicantRecord {
            income: 8_000,
            loan_amount: 1_000,
            ..sample_applicant()
        };
        assert_eq!(tie.loan_percent_income(), 0.12);

        // 0.015 is stored as 0.01499999...
        let below_half = ApplicantRecord {
            income: 1_000,
            loan_amount: 15,
            ..sample_applicant()
        };
        assert_eq!(below_half.loan_percent_income(), 0.01);
    }

    #[test]
    fn test_zero_income_ratio() {
        let applicant = ApplicantRecord {
            income: 0,
            loan_amount: 5_000,
            ..sample_applicant()
        };
        assert_eq!(applicant.loan_percent_income(), 0.0);
    }

    #[test]
    fn test_supplied_ratio_is_ignored() {
        let json = r#"{
            "person_age": 30, "person_gender": "male", "person_education": "High School",
            "person_income": 50000, "person_emp_exp": 5, "person_home_ownership": "MORTGAGE",
            "loan_intent": "DEBTCONSOLIDATION", "loan_amnt": 10000, "loan_int_rate": 11,
            "loan_percent_income": 0.95, "cb_person_cred_hist_length": 5,
            "credit_score": 700, "previous_loan_defaults_on_file": "Yes"
        }"#;

        let applicant: ApplicantRecord = serde_json::from_str(json).unwrap();

        assert_eq!(applicant.education, Education::HighSchool);
        assert_eq!(applicant.home_ownership, HomeOwnership::Mortgage);
        assert_eq!(applicant.loan_intent, LoanIntent::DebtConsolidation);
        assert_eq!(applicant.previous_defaults, PreviousDefaults::Yes);
        assert_eq!(applicant.loan_interest_rate, 11.0);
        assert_eq!(applicant.loan_percent_income(), 0.2);
    }

    #[test]
    fn test_enum_wire_names() {
        for education in Education::ALL {
            let json = serde_json::to_string(&education).unwrap();
            assert_eq!(json, format!("\"{}\"", education.as_str()));
        }
        for intent in LoanIntent::ALL {
            let json = serde_json::to_string(&intent).unwrap();
            assert_eq!(json, format!("\"{}\"", intent.as_str()));
        }
        for ownership in HomeOwnership::ALL {
            let json = serde_json::to_string(&ownership).unwrap();
            assert_eq!(json, format!("\"{}\"", ownership.as_str()));
        }
        assert_eq!(serde_json::to_string(&Gender::Female).unwrap(), "\"female\"");
        assert_eq!(serde_json::to_string(&PreviousDefaults::No).unwrap(), "\"No\"");
    }

    #[test]
    fn test_validation() {
        assert!(sample_applicant().validate().is_ok());

        let too_young = ApplicantRecord {
            age: 17,
            ..sample_applicant()
        };
        assert_eq!(
            too_young.validate(),
            Err(ValidationError::OutOfRange {
                field: "age",
                value: 17.0,
                min: 18.0,
                max: 80.0,
            })
        );

        let bad_rate = ApplicantRecord {
            loan_interest_rate: f64::NAN,
            ..sample_applicant()
        };
        assert!(bad_rate.validate().is_err());

        let bad_score = ApplicantRecord {
            credit_score: 900,
            ..sample_applicant()
        };
        assert!(bad_score.validate().is_err());
    }

    #[test]
    fn test_summary() {
        let summary = sample_applicant().summary();
        assert_eq!(summary.income, "$50,000");
        assert_eq!(summary.loan, "$10,000 (20% of income)");
        assert_eq!(summary.education, "Bachelor");
        assert_eq!(summary.credit_score, 700);

        let big = ApplicantRecord {
            income: 1_000_000,
            loan_amount: 0,
            ..sample_applicant()
        };
        assert_eq!(big.summary().income, "$1,000,000");
        assert_eq!(big.summary().loan, "$0 (0% of income)");
    }

    #[test]
    fn test_application_envelope() {
        let application = LoanApplication::new("app_001".to_string(), sample_applicant());
        let json = serde_json::to_string(&application).unwrap();
        let parsed: LoanApplication = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.application_id, "app_001");
        assert_eq!(parsed.applicant, application.applicant);

        let without_id = r#"{
            "age": 45, "gender": "female", "education": "Doctorate", "income": 120000,
            "employment_experience_years": 20, "home_ownership": "OWN", "loan_intent": "HOME",
            "loan_amount": 200000, "loan_interest_rate": 6.5,
            "credit_history_length_years": 18, "credit_score": 780, "previous_defaults": "No"
        }"#;
        let parsed: LoanApplication = serde_json::from_str(without_id).unwrap();
        assert!(!parsed.application_id.is_empty());
        assert_eq!(parsed.applicant.age, 45);
    }
}
