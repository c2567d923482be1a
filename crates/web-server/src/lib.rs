use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    middleware,
    routing::{get, patch, put},
    Router,
};
use chrono::FixedOffset;
use configuration::{Config, CorsSettings};
use database::{DbRepository, FacilityStore};
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod handlers;


/// The shared application state that all handlers can access.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn FacilityStore>,
    /// Whether 500 bodies include the driver message as `details`.
    pub expose_details: bool,
    /// Where the movement chart cuts one day from the next.
    pub report_offset: FixedOffset,
}

impl AppState {
    pub fn new(store: Arc<dyn FacilityStore>, settings: &Config) -> anyhow::Result<Self> {
        let report_offset = settings.reporting.offset().with_context(|| {
            format!(
                "invalid reporting offset of {} minutes",
                settings.reporting.utc_offset_minutes
            )
        })?;
        Ok(Self {
            store,
            expose_details: settings.errors.expose_details,
            report_offset,
        })
    }
}

/// Restricts cross-origin calls to the single configured front end.
fn cors_layer(settings: &CorsSettings) -> anyhow::Result<CorsLayer> {
    let origin = settings.allowed_origin.trim();
    let origin =
        HeaderValue::from_str(origin).with_context(|| format!("invalid CORS origin '{origin}'"))?;
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::exact(origin))
        .allow_methods(AllowMethods::any())
        .allow_headers(AllowHeaders::any()))
}

/// Builds the application router with every API route and middleware.
pub fn build_router(state: Arc<AppState>, settings: &Config) -> anyhow::Result<Router> {
    let cors = cors_layer(&settings.cors)?;

    let app = Router::new()
        .route("/api/management", get(handlers::list_management))
        .route(
            "/api/management/:id",
            put(handlers::update_management).delete(handlers::delete_management),
        )
        .route("/api/management/movement/:id", get(handlers::get_movement))
        .route("/api/management/shake/:id", patch(handlers::record_shake))
        .route("/api/places", get(handlers::list_places))
        .route("/api/marker", get(handlers::list_markers))
        .route("/api/category", get(handlers::list_category))
        .route("/api/db-connect", get(handlers::db_connect))
        .layer(middleware::map_response_with_state(state.clone(), error::attach_details))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(DefaultBodyLimit::max(settings.server.body_limit_bytes));

    Ok(app)
}

/// Resolves when the process is asked to stop (Ctrl-C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C.");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM.");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received, draining in-flight requests.");
}

/// The main function to configure and run the web server.
///
/// Opens the pool, serves until a shutdown signal arrives, lets in-flight
/// requests finish and finally closes the pool.
pub async fn run_server(settings: Config) -> anyhow::Result<()> {
    let db_pool = database::connect(&settings.database).await?;
    let db_repo = DbRepository::new(db_pool, settings.database.query_timeout());

    let app_state = Arc::new(AppState::new(Arc::new(db_repo.clone()), &settings)?);
    let app = build_router(app_state, &settings)?;

    let addr = settings.server.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Web server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    db_repo.close().await;
    tracing::info!("Web server stopped.");
    Ok(())
}
