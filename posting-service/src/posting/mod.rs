//! Purchase-invoice posting pipeline.
//!
//! One request-scoped run per submitted invoice: load reference data,
//! find reversal candidates, build the posting batch, commit it
//! atomically. On any failure the invoice is reset to Draft best-effort
//! and the error surfaces to the caller.

pub mod accrual;
pub mod builder;
pub mod committer;
pub mod ledger;
pub mod reference;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use service_core::error::AppError;

use crate::models::InvoiceStatus;
use crate::services::database::Database;
use crate::services::metrics::POSTINGS_TOTAL;

/// Post one submitted purchase invoice. All-or-nothing: either the full
/// set of journal, receipt and ledger rows commits and the invoice moves
/// to Submitted, or nothing persists and the invoice returns to Draft.
#[instrument(skip(db), fields(invoice_id = %invoice_id))]
pub async fn post_purchase_invoice(db: &Database, invoice_id: Uuid) -> Result<(), AppError> {
    match run(db, invoice_id).await {
        Ok(journal_id) => {
            POSTINGS_TOTAL.with_label_values(&["ok"]).inc();
            info!(journal_id = %journal_id, "Purchase invoice posted");
            Ok(())
        }
        Err(err) => {
            POSTINGS_TOTAL.with_label_values(&["error"]).inc();
            warn!(error = %err, "Posting failed");
            // Best-effort, outside any transaction; a failed reset is
            // logged but never masks the original error. A Conflict means
            // another run already submitted the invoice, so its status
            // must not be touched.
            if !matches!(err, AppError::Conflict(_) | AppError::NotFound(_)) {
                if let Err(reset_err) = db.reset_invoice_to_draft(invoice_id).await {
                    warn!(error = %reset_err, "Failed to reset invoice to Draft");
                }
            }
            Err(err)
        }
    }
}

async fn run(db: &Database, invoice_id: Uuid) -> Result<Uuid, AppError> {
    let data = reference::load(db, invoice_id).await?;

    // Cheap early check; the committer re-validates transactionally.
    if data.invoice.parsed_status() != InvoiceStatus::Draft {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Purchase invoice {} is not in Draft status; it may already be posted",
            invoice_id
        )));
    }

    let mut caches = reference::PostingCaches::new(db);
    let batch = builder::build_posting_batch(&data, &mut caches).await?;
    committer::commit_posting(db, &data.invoice, &batch).await
}
