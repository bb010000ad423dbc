//! Transactional committer: writes a [`PostingBatch`] atomically.
//!
//! All writes run inside one database transaction; any failure rolls the
//! whole posting back. The invoice's Draft -> Submitted flip is a guarded
//! conditional update, so two concurrent postings of the same invoice
//! cannot both commit.

use std::collections::BTreeMap;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{Postgres, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;

use service_core::error::AppError;

use crate::models::{derive_order_status, LineCompletion, PurchaseInvoice, ReceiptLineInsert};
use crate::services::database::Database;
use crate::services::metrics::DB_QUERY_DURATION;

use super::builder::PostingBatch;

const RECEIPT_SEQUENCE: &str = "receipt";
const RECEIPT_STATUS_POSTED: &str = "Posted";
const SOURCE_PURCHASE_INVOICE: &str = "Purchase Invoice";

/// Commit the batch and advance the invoice to Submitted. Returns the id
/// of the journal header created for this posting.
#[instrument(skip(db, batch), fields(invoice_id = %invoice.invoice_id))]
pub async fn commit_posting(
    db: &Database,
    invoice: &PurchaseInvoice,
    batch: &PostingBatch,
) -> Result<Uuid, AppError> {
    if let Some(group) = unbalanced_group(batch) {
        return Err(AppError::InternalError(anyhow::anyhow!(
            "Journal line group {} does not balance; refusing to post",
            group
        )));
    }

    let timer = DB_QUERY_DURATION
        .with_label_values(&["commit_posting"])
        .start_timer();

    let posting_date = Utc::now().date_naive();

    let mut tx = db.pool().begin().await.map_err(|e| {
        AppError::DatabaseError(anyhow::anyhow!("Failed to begin transaction: {}", e))
    })?;

    insert_receipts(&mut tx, invoice, batch, posting_date).await?;
    apply_order_line_updates(&mut tx, batch).await?;
    recompute_order_statuses(&mut tx, batch).await?;
    let journal_id = insert_journal(&mut tx, invoice, batch, posting_date).await?;
    insert_ledger_entries(&mut tx, batch, posting_date).await?;
    submit_invoice(&mut tx, invoice.invoice_id, posting_date).await?;

    tx.commit().await.map_err(|e| {
        AppError::DatabaseError(anyhow::anyhow!("Failed to commit posting: {}", e))
    })?;

    timer.observe_duration();

    info!(
        journal_id = %journal_id,
        journal_lines = batch.journal_lines.len(),
        receipt_lines = batch.receipt_lines.len(),
        "Posting committed"
    );

    Ok(journal_id)
}

/// Allocate the next human-readable number from the named sequence.
/// The row update is atomic, so concurrent allocations never collide.
async fn next_sequence(
    tx: &mut Transaction<'_, Postgres>,
    name: &str,
) -> Result<String, AppError> {
    let row: (String, i64, i32) = sqlx::query_as(
        r#"
        UPDATE sequences
        SET next_value = next_value + 1
        WHERE name = $1
        RETURNING prefix, next_value - 1, padding
        "#,
    )
    .bind(name)
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to advance sequence: {}", e)))?
    .ok_or_else(|| {
        AppError::DatabaseError(anyhow::anyhow!("Sequence '{}' is not configured", name))
    })?;

    let (prefix, value, padding) = row;
    Ok(format!(
        "{}{:0width$}",
        prefix,
        value,
        width = padding.max(0) as usize
    ))
}

/// Open accounting period covering the posting date.
async fn current_accounting_period(
    tx: &mut Transaction<'_, Postgres>,
    posting_date: NaiveDate,
) -> Result<Uuid, AppError> {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        SELECT period_id
        FROM accounting_periods
        WHERE status = 'Open' AND start_date <= $1 AND end_date >= $1
        ORDER BY start_date
        LIMIT 1
        "#,
    )
    .bind(posting_date)
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| {
        AppError::DatabaseError(anyhow::anyhow!("Failed to fetch accounting period: {}", e))
    })?
    .ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!(
            "No open accounting period for {}",
            posting_date
        ))
    })
}

/// One receipt header per location, numbered from the receipt sequence.
async fn insert_receipts(
    tx: &mut Transaction<'_, Postgres>,
    invoice: &PurchaseInvoice,
    batch: &PostingBatch,
    posting_date: NaiveDate,
) -> Result<(), AppError> {
    // BTreeMap keeps location grouping deterministic.
    let mut by_location: BTreeMap<Option<Uuid>, Vec<&ReceiptLineInsert>> = BTreeMap::new();
    for line in &batch.receipt_lines {
        by_location.entry(line.location_id).or_default().push(line);
    }

    for (location_id, lines) in by_location {
        let receipt_id = Uuid::new_v4();
        let receipt_number = next_sequence(tx, RECEIPT_SEQUENCE).await?;

        sqlx::query(
            r#"
            INSERT INTO receipts
                (receipt_id, receipt_number, location_id, status, source_document, source_document_id, posting_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(receipt_id)
        .bind(&receipt_number)
        .bind(location_id)
        .bind(RECEIPT_STATUS_POSTED)
        .bind(SOURCE_PURCHASE_INVOICE)
        .bind(invoice.invoice_id)
        .bind(posting_date)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to insert receipt: {}", e))
        })?;

        for line in lines {
            sqlx::query(
                r#"
                INSERT INTO receipt_lines
                    (receipt_line_id, receipt_id, part_id, order_line_id, quantity, unit_price, location_id, shelf_id)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(receipt_id)
            .bind(line.part_id)
            .bind(line.order_line_id)
            .bind(line.quantity)
            .bind(line.unit_price)
            .bind(line.location_id)
            .bind(&line.shelf_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to insert receipt line: {}", e))
            })?;
        }
    }

    Ok(())
}

async fn apply_order_line_updates(
    tx: &mut Transaction<'_, Postgres>,
    batch: &PostingBatch,
) -> Result<(), AppError> {
    for update in &batch.order_line_updates {
        sqlx::query(
            r#"
            UPDATE purchase_order_lines
            SET quantity_invoiced = $2, invoiced_complete = $3
            WHERE order_line_id = $1
            "#,
        )
        .bind(update.order_line_id)
        .bind(update.quantity_invoiced)
        .bind(update.invoiced_complete)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to update order line: {}", e))
        })?;
    }
    Ok(())
}

/// Recompute each touched order's status from the current completion
/// flags of all its lines.
async fn recompute_order_statuses(
    tx: &mut Transaction<'_, Postgres>,
    batch: &PostingBatch,
) -> Result<(), AppError> {
    let mut order_ids: Vec<Uuid> = batch
        .order_line_updates
        .iter()
        .map(|u| u.order_id)
        .collect();
    order_ids.sort_unstable();
    order_ids.dedup();

    for order_id in order_ids {
        let completions: Vec<LineCompletion> = sqlx::query_as(
            r#"
            SELECT received_complete, invoiced_complete
            FROM purchase_order_lines
            WHERE order_id = $1
            "#,
        )
        .bind(order_id)
        .fetch_all(&mut **tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to fetch order lines: {}", e))
        })?;

        let status = derive_order_status(&completions);
        sqlx::query("UPDATE purchase_orders SET status = $2 WHERE order_id = $1")
            .bind(order_id)
            .bind(status.as_str())
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                AppError::DatabaseError(anyhow::anyhow!("Failed to update order status: {}", e))
            })?;
    }

    Ok(())
}

async fn insert_journal(
    tx: &mut Transaction<'_, Postgres>,
    invoice: &PurchaseInvoice,
    batch: &PostingBatch,
    posting_date: NaiveDate,
) -> Result<Uuid, AppError> {
    let period_id = current_accounting_period(tx, posting_date).await?;
    let journal_id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO journals (journal_id, accounting_period_id, posting_date, description)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(journal_id)
    .bind(period_id)
    .bind(posting_date)
    .bind(format!("Purchase invoice {}", invoice.invoice_id))
    .execute(&mut **tx)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to insert journal: {}", e)))?;

    for line in &batch.journal_lines {
        sqlx::query(
            r#"
            INSERT INTO journal_lines
                (journal_line_id, journal_id, account_number, direction, amount, quantity,
                 line_group, document_ref_kind, document_ref_line_id, accrual, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(journal_id)
        .bind(&line.account_number)
        .bind(line.direction.as_str())
        .bind(line.amount)
        .bind(line.quantity)
        .bind(line.line_group)
        .bind(line.document_ref.map(|r| r.kind.as_str()))
        .bind(line.document_ref.map(|r| r.order_line_id))
        .bind(line.accrual)
        .bind(&line.description)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to insert journal line: {}", e))
        })?;
    }

    Ok(journal_id)
}

async fn insert_ledger_entries(
    tx: &mut Transaction<'_, Postgres>,
    batch: &PostingBatch,
    posting_date: NaiveDate,
) -> Result<(), AppError> {
    for entry in &batch.part_entries {
        sqlx::query(
            r#"
            INSERT INTO part_ledger
                (entry_id, part_id, entry_type, document_type, document_id, quantity, location_id, shelf_id, posting_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.part_id)
        .bind(&entry.entry_type)
        .bind(&entry.document_type)
        .bind(entry.document_id)
        .bind(entry.quantity)
        .bind(entry.location_id)
        .bind(&entry.shelf_id)
        .bind(posting_date)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to insert part ledger entry: {}", e))
        })?;
    }

    for entry in &batch.cost_entries {
        sqlx::query(
            r#"
            INSERT INTO cost_ledger
                (entry_id, part_id, cost_ledger_type, document_type, document_id, quantity, cost, cost_posted_to_gl, posting_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(entry.part_id)
        .bind(&entry.cost_ledger_type)
        .bind(&entry.document_type)
        .bind(entry.document_id)
        .bind(entry.quantity)
        .bind(entry.cost)
        .bind(entry.cost_posted_to_gl)
        .bind(posting_date)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to insert cost ledger entry: {}", e))
        })?;
    }

    Ok(())
}

/// Guarded status flip: only one posting of a given invoice can win.
async fn submit_invoice(
    tx: &mut Transaction<'_, Postgres>,
    invoice_id: Uuid,
    posting_date: NaiveDate,
) -> Result<(), AppError> {
    let result = sqlx::query(
        r#"
        UPDATE purchase_invoices
        SET status = 'Submitted', posting_date = $2
        WHERE invoice_id = $1 AND status = 'Draft'
        "#,
    )
    .bind(invoice_id)
    .bind(posting_date)
    .execute(&mut **tx)
    .await
    .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to submit invoice: {}", e)))?;

    if result.rows_affected() == 0 {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Purchase invoice {} is not in Draft status; it may already be posted",
            invoice_id
        )));
    }

    Ok(())
}

/// The builder only ever emits balanced pairs; a nonzero group sum means
/// a bug upstream and must never reach the ledger.
fn unbalanced_group(batch: &PostingBatch) -> Option<Uuid> {
    let mut sums: BTreeMap<Uuid, Decimal> = BTreeMap::new();
    for line in &batch.journal_lines {
        *sums.entry(line.line_group).or_default() += line.signed_amount();
    }
    sums.into_iter().find(|(_, sum)| !sum.is_zero()).map(|(group, _)| group)
}
