//! Application startup: router construction and server lifecycle.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::info;

use service_core::error::AppError;

use crate::config::PostingConfig;
use crate::handlers;
use crate::services::database::Database;

pub fn build_router(db: Database) -> Router {
    Router::new()
        .route("/v1/purchase-invoices/post", post(handlers::post_purchase_invoice))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .with_state(db)
}

/// Running application handle; binds the listener eagerly so tests can
/// ask for the ephemeral port.
pub struct Application {
    port: u16,
    listener: tokio::net::TcpListener,
    router: Router,
}

impl Application {
    pub async fn build(config: PostingConfig) -> Result<Self, AppError> {
        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await?;
        db.run_migrations().await?;

        let router = build_router(db);

        let address = format!("0.0.0.0:{}", config.common.port);
        let listener = tokio::net::TcpListener::bind(&address).await.map_err(|e| {
            AppError::InternalError(anyhow::anyhow!("Failed to bind to {}: {}", address, e))
        })?;
        let port = listener
            .local_addr()
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("No local address: {}", e)))?
            .port();

        Ok(Self {
            port,
            listener,
            router,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), AppError> {
        info!(port = self.port, "Starting posting-service");
        axum::serve(self.listener, self.router)
            .await
            .map_err(|e| AppError::InternalError(anyhow::anyhow!("Server error: {}", e)))
    }
}
