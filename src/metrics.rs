use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder. Only one recorder per process.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        ensure_metrics_described();
        gauge!("model_version").set(0.0);

        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "feedback_submissions_total",
            "Feedback items accepted into respondent slots."
        );
        describe_counter!(
            "value_scores_computed_total",
            "Value scores computed or recomputed."
        );
        describe_counter!(
            "calibration_labels_total",
            "Administrator calibration labels accepted."
        );
        describe_counter!("model_retrains_total", "Successful model refits.");
        describe_counter!(
            "model_retrain_failures_total",
            "Refits that failed numerically; previous model kept."
        );
        describe_gauge!("model_version", "Version of the active feedback model.");
    });
}
