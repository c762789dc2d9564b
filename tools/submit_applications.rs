//! Test Application Submitter
//!
//! Generates loan applications, sends them to the service as NATS requests
//! and logs the decisions that come back.

use loan_approval_service::types::applicant::{
    ApplicantRecord, Education, Gender, HomeOwnership, LoanApplication, LoanIntent,
    PreviousDefaults,
};
use loan_approval_service::types::decision::DecisionReply;
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

/// Applicant generator for testing
struct ApplicantGenerator {
    rng: rand::rngs::ThreadRng,
    application_counter: u64,
}

impl ApplicantGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            application_counter: 0,
        }
    }

    fn next_id(&mut self) -> String {
        self.application_counter += 1;
        format!("app_{:012}", self.application_counter)
    }

    /// An applicant with steady income and a clean record
    fn generate_typical(&mut self) -> LoanApplication {
        let income = self.rng.gen_range(35_000..150_000);
        let applicant = ApplicantRecord {
            age: self.rng.gen_range(25..60),
            gender: self.pick(&Gender::ALL),
            education: self.pick(&Education::ALL),
            income,
            employment_experience_years: self.rng.gen_range(2..25),
            home_ownership: self.pick(&[HomeOwnership::Own, HomeOwnership::Mortgage]),
            loan_intent: self.pick(&LoanIntent::ALL),
            loan_amount: self.rng.gen_range(1_000..(income / 4)),
            loan_interest_rate: round_rate(self.rng.gen_range(5.0..12.0)),
            credit_history_length_years: self.rng.gen_range(3..20),
            credit_score: self.rng.gen_range(650..820),
            previous_defaults: PreviousDefaults::No,
        };
        LoanApplication::new(self.next_id(), applicant)
    }

    /// A young applicant borrowing a large share of a small income
    fn generate_high_risk(&mut self) -> LoanApplication {
        let income = self.rng.gen_range(0..30_000);
        let applicant = ApplicantRecord {
            age: self.rng.gen_range(18..26),
            gender: self.pick(&Gender::ALL),
            education: self.pick(&[Education::HighSchool, Education::Associate]),
            income,
            employment_experience_years: self.rng.gen_range(0..3),
            home_ownership: self.pick(&[HomeOwnership::Rent, HomeOwnership::Other]),
            loan_intent: self.pick(&[LoanIntent::Venture, LoanIntent::DebtConsolidation]),
            loan_amount: self.rng.gen_range(10_000..35_000),
            loan_interest_rate: round_rate(self.rng.gen_range(15.0..30.0)),
            credit_history_length_years: self.rng.gen_range(0..4),
            credit_score: self.rng.gen_range(300..600),
            previous_defaults: PreviousDefaults::Yes,
        };
        LoanApplication::new(self.next_id(), applicant)
    }

    fn pick<T: Copy>(&mut self, choices: &[T]) -> T {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

fn round_rate(rate: f64) -> f64 {
    (rate * 10.0).round() / 10.0
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("submit_applications=info".parse()?),
        )
        .init();

    info!("Starting Test Application Submitter");

    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("loan.applications");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(20);
    let risk_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.3);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        risk_rate = risk_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, risk_rate).await;
        }
    };

    let mut generator = ApplicantGenerator::new();
    let mut rng = rand::thread_rng();
    let (mut approved, mut rejected, mut failed) = (0u64, 0u64, 0u64);

    for _ in 0..count {
        let application = if rng.gen_bool(risk_rate) {
            generator.generate_high_risk()
        } else {
            generator.generate_typical()
        };

        let payload = serde_json::to_vec(&application)?;
        let response = client.request(subject.to_string(), payload.into()).await?;

        match serde_json::from_slice::<DecisionReply>(&response.payload)? {
            DecisionReply::Decided(report) => {
                if report.approved {
                    approved += 1;
                } else {
                    rejected += 1;
                }
                info!(
                    application_id = %report.application_id,
                    summary = %application.applicant.summary(),
                    "{} - {}: {}",
                    report.label,
                    report.metric_name,
                    report.metric
                );
            }
            DecisionReply::Failed {
                application_id,
                message,
            } => {
                failed += 1;
                warn!(application_id = ?application_id, "{}", message);
            }
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! {} applications ({} approved, {} rejected, {} failed)",
        count, approved, rejected, failed
    );

    Ok(())
}

async fn run_dry_mode(count: u64, risk_rate: f64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = ApplicantGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let application = if rng.gen_bool(risk_rate) {
            generator.generate_high_risk()
        } else {
            generator.generate_typical()
        };

        if (i + 1) % 10 == 0 || i == 0 {
            let json = serde_json::to_string_pretty(&application)?;
            info!("Sample application {}:\n{}", i + 1, json);
        }
    }

    Ok(())
}
