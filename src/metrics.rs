//! Decision counters and latency statistics for the service.

use crate::types::decision::PredictionResult;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Metrics collector for application handling
pub struct DecisionMetrics {
    pub applications_processed: AtomicU64,
    pub approved: AtomicU64,
    pub rejected: AtomicU64,
    /// Requests that ended in a validation or decision error
    pub failed: AtomicU64,
    /// Decision times (in microseconds)
    decision_times: RwLock<Vec<u64>>,
    /// Probability distribution buckets
    probability_buckets: RwLock<[u64; 10]>,
    start_time: Instant,
}

impl DecisionMetrics {
    pub fn new() -> Self {
        Self {
            applications_processed: AtomicU64::new(0),
            approved: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            decision_times: RwLock::new(Vec::with_capacity(1000)),
            probability_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a successful decision
    pub fn record_decision(&self, elapsed: Duration, result: &PredictionResult) {
        self.applications_processed.fetch_add(1, Ordering::Relaxed);
        if result.approved {
            self.approved.fetch_add(1, Ordering::Relaxed);
        } else {
            self.rejected.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut times) = self.decision_times.write() {
            times.push(elapsed.as_micros() as u64);
            // Keep only the most recent samples
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }

        let bucket = (result.probability * 10.0).clamp(0.0, 9.0) as usize;
        if let Ok(mut buckets) = self.probability_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    /// Record a request that produced no decision
    pub fn record_failure(&self) {
        self.applications_processed.fetch_add(1, Ordering::Relaxed);
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_latency_stats(&self) -> LatencyStats {
        let mut sorted = match self.decision_times.read() {
            Ok(times) if !times.is_empty() => times.clone(),
            _ => return LatencyStats::default(),
        };
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u64 = sorted.iter().sum();
        let at = |q: f64| sorted[((count as f64 * q) as usize).min(count - 1)];

        LatencyStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: at(0.5),
            p95_us: at(0.95),
            p99_us: at(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Applications handled per second since startup
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.applications_processed.load(Ordering::Relaxed) as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_probability_distribution(&self) -> [u64; 10] {
        self.probability_buckets
            .read()
            .map(|b| *b)
            .unwrap_or([0; 10])
    }

    /// Share of decided applications that were approved, in percent
    pub fn approval_rate(&self) -> f64 {
        let approved = self.approved.load(Ordering::Relaxed);
        let decided = approved + self.rejected.load(Ordering::Relaxed);
        if decided > 0 {
            approved as f64 / decided as f64 * 100.0
        } else {
            0.0
        }
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let processed = self.applications_processed.load(Ordering::Relaxed);
        let approved = self.approved.load(Ordering::Relaxed);
        let rejected = self.rejected.load(Ordering::Relaxed);
        let failed = self.failed.load(Ordering::Relaxed);
        let latency = self.get_latency_stats();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║            LOAN APPROVAL SERVICE - METRICS SUMMARY           ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Applications: {:>8}  │  Throughput: {:>6.1} app/s          ║",
            processed,
            self.get_throughput()
        );
        info!(
            "║ Approved: {:>6}  Rejected: {:>6}  Failed: {:>6}  ({:>5.1}%) ║",
            approved,
            rejected,
            failed,
            self.approval_rate()
        );
        info!(
            "║ Decision Time (μs): mean={:>5} p50={:>5} p95={:>5} p99={:>5} ║",
            latency.mean_us, latency.p50_us, latency.p95_us, latency.p99_us
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Approval Probability Distribution:                           ║");
        let distribution = self.get_probability_distribution();
        let total: u64 = distribution.iter().sum();
        for (i, &count) in distribution.iter().enumerate() {
            let pct = if total > 0 { (count as f64 / total as f64) * 100.0 } else { 0.0 };
            let bar = "█".repeat(((pct / 2.0) as usize).min(20));
            info!(
                "║   {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                bar
            );
        }
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for DecisionMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Decision latency statistics
#[derive(Debug, Default)]
pub struct LatencyStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

/// Logs a metrics summary on a fixed interval
pub struct MetricsReporter {
    metrics: Arc<DecisionMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<DecisionMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        // The first tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = DecisionMetrics::new();

        metrics.record_decision(
            Duration::from_micros(100),
            &PredictionResult {
                approved: true,
                probability: 0.82,
            },
        );
        metrics.record_decision(
            Duration::from_micros(300),
            &PredictionResult {
                approved: false,
                probability: 0.5,
            },
        );
        metrics.record_failure();

        assert_eq!(metrics.applications_processed.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.approved.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.rejected.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.failed.load(Ordering::Relaxed), 1);
        assert!((metrics.approval_rate() - 50.0).abs() < 1e-9);

        let distribution = metrics.get_probability_distribution();
        assert_eq!(distribution[8], 1);
        assert_eq!(distribution[5], 1);
    }

    #[test]
    fn test_certain_probability_lands_in_top_bucket() {
        let metrics = DecisionMetrics::new();
        metrics.record_decision(
            Duration::from_micros(10),
            &PredictionResult {
                approved: true,
                probability: 1.0,
            },
        );
        assert_eq!(metrics.get_probability_distribution()[9], 1);
    }

    #[test]
    fn test_latency_stats() {
        let metrics = DecisionMetrics::new();
        assert_eq!(metrics.get_latency_stats().count, 0);

        for us in [100, 200, 300, 400] {
            metrics.record_decision(
                Duration::from_micros(us),
                &PredictionResult {
                    approved: false,
                    probability: 0.1,
                },
            );
        }

        let stats = metrics.get_latency_stats();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.mean_us, 250);
        assert_eq!(stats.p50_us, 300);
        assert_eq!(stats.max_us, 400);
    }
}
