//! Loan Approval Service - Main Entry Point
//!
//! Loads the ONNX pipeline once, then answers loan applications received
//! over NATS with rendered approval decisions.

use anyhow::{Context, Result};
use futures::StreamExt;
use loan_approval_service::{
    config::{AppConfig, LoggingConfig, DEFAULT_CONFIG_PATH},
    consumer::ApplicationConsumer,
    engine::DecisionEngine,
    feature_extractor::FeatureExtractor,
    handler::ApplicationHandler,
    metrics::{DecisionMetrics, MetricsReporter},
    models::{ModelLoader, Pipeline},
    producer::DecisionProducer,
};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args().nth(1);
    let config = match &config_path {
        Some(path) => AppConfig::load_from_path(path),
        None => AppConfig::load(),
    }
    .with_context(|| {
        format!(
            "Failed to load configuration from {}",
            config_path.as_deref().unwrap_or(DEFAULT_CONFIG_PATH)
        )
    })?;

    init_logging(&config.logging)?;

    info!("Starting Loan Approval Service");
    info!(
        config = %config_path.as_deref().unwrap_or(DEFAULT_CONFIG_PATH),
        "Configuration loaded successfully"
    );

    // A missing or unreadable model is fatal: no application is accepted
    let loader = ModelLoader::with_threads(config.model.onnx_threads);
    let pipeline: Arc<dyn Pipeline> = match loader.load(&config.model.path) {
        Ok(pipeline) => {
            info!(
                layout = ?pipeline.layout(),
                output = %pipeline.output_name(),
                "Pipeline signature"
            );
            Arc::new(pipeline)
        }
        Err(e) => {
            error!(path = %config.model.path, error = %e, "Error loading model assets");
            return Err(e.into());
        }
    };

    let engine = DecisionEngine::new(pipeline);
    let status = engine.status();
    info!(
        model = %status.name,
        algorithm = %status.algorithm,
        features = FeatureExtractor::new().feature_count(),
        "Model ready"
    );

    let metrics = Arc::new(DecisionMetrics::new());
    let handler = ApplicationHandler::new(engine, metrics.clone());

    let client = async_nats::connect(&config.nats.url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = ApplicationConsumer::new(client.clone(), &config.nats.application_subject);
    let producer = DecisionProducer::new(client.clone(), &config.nats.decision_subject);

    // Status requests are answered from the same engine handle
    let mut status_requests = consumer.subscribe_to(&config.nats.status_subject).await?;
    let status_producer = producer.clone();
    tokio::spawn(async move {
        while let Some(message) = status_requests.next().await {
            if let Err(e) = status_producer.respond(message.reply, &status).await {
                error!(error = %e, "Failed to answer status request");
            }
        }
    });

    if config.pipeline.metrics_interval_secs > 0 {
        let reporter = MetricsReporter::new(metrics.clone(), config.pipeline.metrics_interval_secs);
        tokio::spawn(reporter.start());
    }

    let semaphore = Arc::new(Semaphore::new(config.pipeline.workers.max(1)));
    let mut applications = consumer.subscribe().await?;

    info!(
        workers = config.pipeline.workers,
        applications = %consumer.subject(),
        decisions = %producer.subject(),
        "Accepting loan applications"
    );

    loop {
        let message = tokio::select! {
            message = applications.next() => match message {
                Some(message) => message,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        };

        let permit = semaphore.clone().acquire_owned().await?;
        let handler = handler.clone();
        let producer = producer.clone();

        tokio::spawn(async move {
            let reply = handler.handle(&message.payload);

            if let Err(e) = producer.respond(message.reply, &reply).await {
                error!(error = %e, "Failed to publish decision");
            }

            drop(permit);
        });
    }

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!("loan_approval_service={}", logging.level))
    })?;

    if logging.format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    Ok(())
}
