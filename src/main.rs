//! Event Value Engine — Binary Entrypoint
//! Boots the Axum HTTP server, wiring routes, shared state, and metrics.

use event_value_engine::{api, metrics::Metrics, AppState};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - VALUE_ENGINE_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("VALUE_ENGINE_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("scoring=info,calibration=info,events=info,warn"));

    // Shuttle may already have installed a subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let state = AppState::from_env()?;
    let metrics = Metrics::init()?;
    let router = api::router(state).merge(metrics.router());

    tracing::info!("event value engine ready");
    Ok(router.into())
}
