//! Thesisboard API Gateway
//!
//! The HTTP entry point for thesis catalog browsing.
//! Handles:
//! - Request routing to the catalog listings
//! - Rate limiting
//! - Observability (logging, metrics, request ids)

mod handlers;
mod middleware;

use anyhow::Context;
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use thesisboard_common::{
    catalog::{Catalog, MergeSettings},
    config::AppConfig,
    db::{DbPool, Repository},
    metrics,
    recommendations::create_recommendation_source,
};
use tokio::{signal, sync::Notify};
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use middleware::rate_limit::{create_rate_limiter, rate_limit_middleware, RateLimit};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub catalog: Arc<Catalog>,
    pub metrics: Option<PrometheusHandle>,
    pub rate_limit: Option<RateLimit>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;

    init_tracing(&config);

    info!(
        service = %config.observability.service_name,
        "Starting Thesisboard API Gateway v{}",
        thesisboard_common::VERSION
    );

    // Initialize metrics
    let metrics_handle = if config.observability.metrics_enabled {
        let handle = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                metrics::LATENCY_BUCKETS,
            )?
            .install_recorder()
            .context("Failed to install Prometheus recorder")?;
        metrics::register_metrics();
        Some(handle)
    } else {
        None
    };

    // Catalog over Postgres
    let db = DbPool::new(&config.database).await?;
    let repository = Arc::new(Repository::new(db));
    let recommendations = create_recommendation_source(&config.recommendations)?;
    let catalog = Catalog::new(
        repository,
        recommendations,
        MergeSettings::from_config(&config.recommendations),
    );

    let rate_limit = if config.rate_limit.enabled {
        Some(create_rate_limiter(&config.rate_limit)?)
    } else {
        None
    };

    let config = Arc::new(config);
    let state = AppState {
        config: config.clone(),
        catalog: Arc::new(catalog),
        metrics: metrics_handle,
        rate_limit,
    };

    // Build the router
    let app = create_router(state);

    // Start the server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    let shutdown = Arc::new(Notify::new());
    let trigger = shutdown.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            trigger.notify_one();
        })
        .into_future();

    let grace = config.shutdown_timeout();
    tokio::select! {
        result = server => result?,
        _ = async {
            shutdown.notified().await;
            tokio::time::sleep(grace).await;
        } => warn!(timeout_secs = grace.as_secs(), "Shutdown timeout elapsed, dropping open connections"),
    }

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.observability.json_logging {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Request ID propagation
    let request_id = SetRequestIdLayer::x_request_id(MakeRequestUuid);
    let propagate_id = PropagateRequestIdLayer::x_request_id();

    // API routes
    let mut api_routes = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))

        // Topic endpoints
        .route("/topics", get(handlers::topics::list_topics))
        .route("/topics/filter", post(handlers::topics::filter_topics))

        // Field endpoints
        .route("/fields", get(handlers::fields::list_fields))
        .route("/fields/names", get(handlers::fields::field_names))

        // Professor endpoints
        .route("/professors", get(handlers::professors::list_professors));

    if let Some(limit) = state.rate_limit.clone() {
        api_routes = api_routes.layer(from_fn_with_state(limit, rate_limit_middleware));
    }

    // Compose the app
    Router::new()
        .nest("/api", api_routes)
        .route("/metrics", get(handlers::metrics::render))
        .layer(from_fn(middleware::metrics::track_requests))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(propagate_id)
        .layer(request_id)
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
