//! # Gatekeep API Server
//!
//! Actix-web front that admits every guarded request through the
//! authentication, authorization and rate limiting pipeline.

use actix_web::{App, HttpServer, web};
use tracing_actix_web::TracingLogger;

#[cfg(feature = "scheduler")]
mod background;
mod config;
mod handlers;
mod middleware;
mod observability;
mod state;
mod telemetry;

use config::AppConfig;
use observability::RequestIdMiddleware;
use state::AppState;
use telemetry::TelemetryConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    telemetry::init_telemetry(&TelemetryConfig::from_env());

    let config = AppConfig::from_env();

    tracing::info!(
        env = %config.env,
        "Starting Gatekeep API Server on {}:{}",
        config.host,
        config.port
    );

    let state = AppState::new(&config).await;

    #[cfg(feature = "scheduler")]
    let scheduler = start_scheduler(&state, &config).await;

    let served = HttpServer::new(move || {
        App::new()
            .wrap(RequestIdMiddleware)
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(state.clone()))
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await;

    #[cfg(feature = "scheduler")]
    if let Some(mut scheduler) = scheduler {
        if let Err(e) = scheduler.shutdown().await {
            tracing::warn!(error = %e, "Scheduler did not shut down cleanly");
        }
    }

    served
}

/// Start background jobs. The scheduler must outlive the server.
#[cfg(feature = "scheduler")]
async fn start_scheduler(state: &AppState, config: &AppConfig) -> Option<background::Scheduler> {
    let limiter = state.limiter.local()?;

    let scheduler = match background::Scheduler::new().await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Failed to create scheduler");
            return None;
        }
    };

    let started = async {
        background::schedule_limiter_sweep(&scheduler, limiter, &config.rate_limit.sweep_cron)
            .await?;
        scheduler.start().await
    };

    let result = started.await;
    match result {
        Ok(()) => Some(scheduler),
        Err(e) => {
            tracing::error!(error = %e, "Failed to start limiter sweep");
            None
        }
    }
}
