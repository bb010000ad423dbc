//! HTTP handlers for posting-service.

use axum::{extract::State, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use service_core::error::AppError;

use crate::posting;
use crate::services::database::Database;
use crate::services::metrics::ERRORS_TOTAL;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostInvoiceRequest {
    pub invoice_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct PostInvoiceResponse {
    pub success: bool,
}

/// Trigger a posting run for one submitted purchase invoice.
#[instrument(skip(db, request), fields(invoice_id = %request.invoice_id))]
pub async fn post_purchase_invoice(
    State(db): State<Database>,
    Json(request): Json<PostInvoiceRequest>,
) -> Result<Json<PostInvoiceResponse>, AppError> {
    posting::post_purchase_invoice(&db, request.invoice_id)
        .await
        .map_err(|err| {
            let error_type = match &err {
                AppError::BadRequest(_) => "validation_error",
                AppError::NotFound(_) => "not_found",
                AppError::Conflict(_) => "conflict",
                AppError::DatabaseError(_) => "db_error",
                _ => "internal_error",
            };
            ERRORS_TOTAL.with_label_values(&[error_type]).inc();
            err
        })?;

    Ok(Json(PostInvoiceResponse { success: true }))
}

/// Liveness probe with a database ping.
pub async fn health(State(db): State<Database>) -> Result<&'static str, AppError> {
    db.health_check().await?;
    Ok("OK")
}

/// Prometheus metrics in text format.
pub async fn metrics() -> impl IntoResponse {
    crate::services::metrics::get_metrics()
}
