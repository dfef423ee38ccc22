//! # Switchboard API Server
//!
//! The main entry point for the Actix-web HTTP server.

use actix_web::{App, HttpServer, web};
use tokio_util::sync::CancellationToken;
use tracing_actix_web::TracingLogger;

use switchboard_infra::{Sweeper, spawn_decision_summary};

mod config;
mod handlers;
mod middleware;
mod observability;
mod state;
mod telemetry;

use config::AppConfig;
use middleware::{AdmissionMiddleware, IdentityMiddleware, TrustedProxies};
use observability::RequestIdMiddleware;
use state::AppState;
use telemetry::{TelemetryConfig, init_telemetry};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let telemetry = TelemetryConfig::from_env();
    init_telemetry(&telemetry);

    let config = AppConfig::from_env();

    tracing::info!(
        "Starting Switchboard API Server on {}:{}",
        config.host,
        config.port
    );

    let (state, decision_events) = AppState::new(&config);

    // Background tasks stop when the token is cancelled
    let shutdown_token = CancellationToken::new();

    let sweeper = Sweeper::new(
        state.counters.clone(),
        state.responses.clone(),
        config.sweep.clone(),
    )
    .spawn(shutdown_token.clone());

    let summary = spawn_decision_summary(
        decision_events,
        config.sweep.interval,
        shutdown_token.clone(),
    );

    let server_state = state.clone();
    let trusted_proxies = TrustedProxies::new(config.trusted_proxies.clone());
    let max_cached_body = config.response_cache.max_payload_bytes;
    let result = HttpServer::new(move || {
        // Registered inner to outer: identity resolves before admission runs
        App::new()
            .wrap(
                AdmissionMiddleware::new(
                    server_state.gate.clone(),
                    server_state.read_cache.clone(),
                )
                .with_max_cached_body(max_cached_body),
            )
            .wrap(
                IdentityMiddleware::new(server_state.token_service.clone())
                    .with_trusted_proxies(trusted_proxies.clone()),
            )
            .wrap(RequestIdMiddleware::new(&telemetry.service_name))
            .wrap(TracingLogger::default())
            .app_data(web::Data::new(server_state.clone()))
            .configure(handlers::configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await;

    tracing::info!("HTTP server stopped, shutting down background tasks");
    shutdown_token.cancel();

    if let Err(e) = sweeper.await {
        tracing::error!(error = %e, "Sweeper task panicked");
    }
    match summary.await {
        Ok(totals) => tracing::info!(
            allowed = totals.allowed,
            denied = totals.denied,
            cache_hits = totals.cache_hits,
            fail_open = totals.fail_open,
            "Final decision summary"
        ),
        Err(e) => tracing::error!(error = %e, "Decision summary task panicked"),
    }

    result
}
