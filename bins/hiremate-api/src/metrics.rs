//! Prometheus metrics for the grading API, exposed on GET /metrics.

use lazy_static::lazy_static;
use prometheus::{Encoder, Histogram, HistogramOpts, IntCounterVec, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    /// Runs by overall status (PASSED / FAILED).
    pub static ref RUNS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("hiremate_runs_total", "Graded runs by overall status"),
        &["status"]
    )
    .expect("valid metric definition");

    /// Graded test cases by outcome (passed / failed / error).
    pub static ref TEST_CASES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("hiremate_test_cases_total", "Graded test cases by outcome"),
        &["outcome"]
    )
    .expect("valid metric definition");

    pub static ref RUN_LATENCY: Histogram = Histogram::with_opts(
        HistogramOpts::new("hiremate_run_latency_seconds", "Wall-clock time to grade a run")
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0])
    )
    .expect("valid metric definition");
}

pub fn register_metrics() -> prometheus::Result<()> {
    REGISTRY.register(Box::new(RUNS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(TEST_CASES_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RUN_LATENCY.clone()))?;
    Ok(())
}

pub fn render_metrics() -> anyhow::Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(&REGISTRY.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
