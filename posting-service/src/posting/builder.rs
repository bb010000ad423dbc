//! Posting-line builder: turns submitted invoice lines into balanced
//! journal groups, receipt lines, part-ledger and cost-ledger entries,
//! plus order-line counter updates. Pure over [`ReferenceData`]; the only
//! I/O is memoized account and posting-group lookups.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::{instrument, warn};
use uuid::Uuid;

use service_core::error::AppError;

use crate::models::{
    CostLedgerInsert, DocumentRef, JournalLineInsert, LineType, OrderLineUpdate, PartLedgerInsert,
    PurchaseInvoiceLine, PurchaseOrderLine, ReceiptLineInsert,
};

use super::accrual::{consume_layers, pair_layers};
use super::ledger::entry_pair;
use super::reference::{PostingCaches, ReferenceData};

const ENTRY_TYPE_POSITIVE_ADJUSTMENT: &str = "Positive Adjmt.";
const COST_TYPE_DIRECT: &str = "Direct Cost";
const DOCUMENT_PURCHASE_RECEIPT: &str = "Purchase Receipt";
const DOCUMENT_PURCHASE_INVOICE: &str = "Purchase Invoice";

/// Everything a posting run intends to write, accumulated in memory and
/// committed in one transaction.
#[derive(Debug, Clone, Default)]
pub struct PostingBatch {
    pub journal_lines: Vec<JournalLineInsert>,
    pub receipt_lines: Vec<ReceiptLineInsert>,
    pub part_entries: Vec<PartLedgerInsert>,
    pub cost_entries: Vec<CostLedgerInsert>,
    pub order_line_updates: Vec<OrderLineUpdate>,
}

/// Build the full posting batch for one invoice. Validation failures
/// (unsupported line type, non-direct-posting account, missing posting
/// group) abort the whole run before any write.
#[instrument(skip_all, fields(invoice_id = %data.invoice.invoice_id, line_count = data.lines.len()))]
pub async fn build_posting_batch(
    data: &ReferenceData,
    caches: &mut PostingCaches<'_>,
) -> Result<PostingBatch, AppError> {
    let mut batch = PostingBatch::default();
    // Working copies of the touched order lines, so several invoice lines
    // against the same order line see each other's counters.
    let mut working: HashMap<Uuid, PurchaseOrderLine> = data.order_lines.clone();
    let mut touched: Vec<Uuid> = Vec::new();

    for line in &data.lines {
        let line_type = line.parsed_line_type().ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!(
                "Unsupported invoice line type: {}",
                line.line_type
            ))
        })?;

        match line_type {
            LineType::Comment => {}
            LineType::Service => {
                warn!(
                    invoice_line_id = %line.invoice_line_id,
                    "Service invoice lines are not posted yet; skipping"
                );
            }
            LineType::FixedAsset => {
                warn!(
                    invoice_line_id = %line.invoice_line_id,
                    "Fixed-asset invoice lines are not posted yet; skipping"
                );
            }
            LineType::GlAccount => build_gl_account_line(line, caches, &mut batch).await?,
            LineType::Part => {
                build_part_line(data, line, caches, &mut working, &mut touched, &mut batch)
                    .await?
            }
        }
    }

    for order_line_id in &touched {
        if let Some(order_line) = working.get(order_line_id) {
            batch.order_line_updates.push(OrderLineUpdate {
                order_line_id: *order_line_id,
                order_id: order_line.order_id,
                quantity_invoiced: order_line.quantity_invoiced,
                invoiced_complete: order_line.invoiced_complete,
            });
        }
    }

    Ok(batch)
}

/// G/L account line: two balanced pairs against the company default
/// accounts. The target account must allow direct posting.
async fn build_gl_account_line(
    line: &PurchaseInvoiceLine,
    caches: &mut PostingCaches<'_>,
    batch: &mut PostingBatch,
) -> Result<(), AppError> {
    let account_number = line.account_number.as_deref().ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!(
            "G/L invoice line {} has no account number",
            line.invoice_line_id
        ))
    })?;

    let account = caches.account(account_number).await?;
    if account.parsed_class().is_none() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Account {} has unrecognized class '{}'",
            account.number,
            account.class
        )));
    }
    if !account.direct_posting {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Account {} does not allow direct posting",
            account.number
        )));
    }

    let defaults = caches.account_defaults().await?;
    let amount = line.extended_amount();
    let document_ref = line.order_line_id.map(DocumentRef::purchase_invoice);

    batch.journal_lines.extend(entry_pair(
        &account.number,
        &defaults.overhead_cost_applied_account,
        amount,
        line.quantity,
        document_ref,
        false,
        line.description.as_deref(),
    ));
    batch.journal_lines.extend(entry_pair(
        &defaults.purchase_account,
        &defaults.payables_account,
        amount,
        line.quantity,
        document_ref,
        false,
        line.description.as_deref(),
    ));

    Ok(())
}

/// Part line: either an immediate receive-and-invoice (no order link) or
/// the reversal/accrual split against the linked order line.
async fn build_part_line(
    data: &ReferenceData,
    line: &PurchaseInvoiceLine,
    caches: &mut PostingCaches<'_>,
    working: &mut HashMap<Uuid, PurchaseOrderLine>,
    touched: &mut Vec<Uuid>,
    batch: &mut PostingBatch,
) -> Result<(), AppError> {
    let part_id = line.part_id.ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!(
            "Part invoice line {} has no part",
            line.invoice_line_id
        ))
    })?;
    let part_group_id = *data.part_groups.get(&part_id).ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!("Part {} has no part group", part_id))
    })?;

    let inventory = caches
        .inventory_group(part_group_id, line.location_id)
        .await?;
    let purchasing = caches
        .purchasing_group(part_group_id, data.supplier.supplier_type_id)
        .await?;

    let invoice_id = data.invoice.invoice_id;

    let Some(order_line_id) = line.order_line_id else {
        // Direct (unordered) receipt: receive and invoice in one step.
        let amount = line.extended_amount();

        batch.receipt_lines.push(ReceiptLineInsert {
            part_id,
            order_line_id: None,
            quantity: line.quantity,
            unit_price: line.unit_price,
            location_id: line.location_id,
            shelf_id: line.shelf_id.clone(),
        });
        batch.part_entries.push(PartLedgerInsert {
            part_id,
            entry_type: ENTRY_TYPE_POSITIVE_ADJUSTMENT.to_string(),
            document_type: DOCUMENT_PURCHASE_RECEIPT.to_string(),
            document_id: invoice_id,
            quantity: line.quantity,
            location_id: line.location_id,
            shelf_id: line.shelf_id.clone(),
        });
        batch.cost_entries.push(CostLedgerInsert {
            part_id,
            cost_ledger_type: COST_TYPE_DIRECT.to_string(),
            document_type: DOCUMENT_PURCHASE_INVOICE.to_string(),
            document_id: invoice_id,
            quantity: line.quantity,
            cost: amount,
            cost_posted_to_gl: amount,
        });

        batch.journal_lines.extend(entry_pair(
            &inventory.inventory_account,
            &inventory.direct_cost_applied_account,
            amount,
            line.quantity,
            None,
            false,
            line.description.as_deref(),
        ));
        batch.journal_lines.extend(entry_pair(
            &purchasing.purchase_account,
            &purchasing.payables_account,
            amount,
            line.quantity,
            None,
            false,
            line.description.as_deref(),
        ));

        return Ok(());
    };

    let mut order_line = working
        .get(&order_line_id)
        .cloned()
        .ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!(
                "Purchase order line {} referenced by invoice line {} does not exist",
                order_line_id,
                line.invoice_line_id
            ))
        })?;

    // Only what was received but not yet invoiced can be reversed; the
    // rest of the invoiced quantity is accrued as invoiced-not-received.
    let quantity_to_reverse = line
        .quantity
        .min(order_line.received_not_invoiced())
        .max(Decimal::ZERO);
    let quantity_already_reversed = order_line.quantity_invoiced.max(Decimal::ZERO);

    let layers = pair_layers(
        data.accrual_lines
            .get(&order_line_id)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
    )?;
    let document_ref = Some(DocumentRef::purchase_invoice(order_line_id));

    for consumption in consume_layers(&layers, quantity_to_reverse, quantity_already_reversed) {
        let layer = &layers[consumption.layer];
        let reversal_amount = (consumption.quantity * layer.unit_cost).round_dp(2);
        // Invert the original pair at its own historical per-unit cost:
        // credit what was debited, debit what was credited.
        batch.journal_lines.extend(entry_pair(
            &layer.credit_account,
            &layer.debit_account,
            reversal_amount,
            consumption.quantity,
            document_ref,
            true,
            line.description.as_deref(),
        ));
    }

    if quantity_to_reverse > Decimal::ZERO {
        // The accrual is unwound; record the final receive-and-invoice
        // economics at the invoice's own unit price.
        let invoiced_amount = (quantity_to_reverse * line.unit_price).round_dp(2);
        batch.cost_entries.push(CostLedgerInsert {
            part_id,
            cost_ledger_type: COST_TYPE_DIRECT.to_string(),
            document_type: DOCUMENT_PURCHASE_INVOICE.to_string(),
            document_id: invoice_id,
            quantity: quantity_to_reverse,
            cost: invoiced_amount,
            cost_posted_to_gl: invoiced_amount,
        });
        batch.journal_lines.extend(entry_pair(
            &inventory.inventory_account,
            &inventory.direct_cost_applied_account,
            invoiced_amount,
            quantity_to_reverse,
            document_ref,
            false,
            line.description.as_deref(),
        ));
        batch.journal_lines.extend(entry_pair(
            &purchasing.purchase_account,
            &purchasing.payables_account,
            invoiced_amount,
            quantity_to_reverse,
            document_ref,
            false,
            line.description.as_deref(),
        ));
    }

    let quantity_to_accrue = line.quantity - quantity_to_reverse;
    if quantity_to_accrue > Decimal::ZERO {
        // Goods invoiced ahead of physical receipt.
        let accrued_amount = (quantity_to_accrue * line.unit_price).round_dp(2);
        batch.journal_lines.extend(entry_pair(
            &inventory.inventory_invoiced_not_received_account,
            &inventory.inventory_interim_accrual_account,
            accrued_amount,
            quantity_to_accrue,
            document_ref,
            true,
            line.description.as_deref(),
        ));
    }

    order_line.quantity_invoiced += line.quantity;
    order_line.invoiced_complete = order_line.quantity_invoiced >= order_line.invoice_target();
    working.insert(order_line_id, order_line);
    if !touched.contains(&order_line_id) {
        touched.push(order_line_id);
    }

    Ok(())
}
