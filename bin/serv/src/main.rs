use std::net::SocketAddr;

use anyhow::Context;
use axum::{Router, middleware, routing::get};
use qf_api::{ApiConfig, ApiState};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration from .env and the environment
    dotenvy::dotenv().ok();
    let config = ApiConfig::from_env()?;

    qf_api::tracing::init_tracing(&config.env);

    let metrics_handle = qf_api::metrics::init_metrics()?;
    tracing::info!("Prometheus metrics exporter initialized");

    let pool = qf_db::create_pool(&config.database_url, config.db_max_connections).await?;
    qf_db::ensure_db_and_migrate(&config.database_url, &pool)
        .await
        .context("failed to run migrations")?;

    let state = ApiState::new(&config, pool);

    // Periodic maintenance: token cleanup, stale attempts, cache purge
    let job_handles = qf_api::jobs::start_background_jobs(state.pool.clone(), state.cache.clone());
    tracing::info!(jobs = job_handles.len(), "Background jobs started");

    let cors = qf_api::middleware::cors::create_cors_layer(config.parsed_allowed_origins());

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    // Metrics endpoint lives outside the API state
    let metrics_app = Router::new()
        .route("/metrics", get(qf_api::metrics::metrics_handler))
        .with_state(metrics_handle);

    let app = qf_api::router::router()
        .with_state(state)
        .merge(metrics_app)
        .layer(cors)
        .layer(trace_layer)
        .layer(middleware::from_fn(qf_api::metrics::track_metrics))
        .layer(middleware::from_fn(
            qf_api::middleware::request_id::request_id_middleware,
        ));

    let app = qf_api::middleware::security_headers::apply_security_headers(app, config.env.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, env = ?config.env, "Server listening");

    // Rate limiting keys on the peer address when no proxy header is present
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    for handle in job_handles {
        handle.abort();
    }
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
