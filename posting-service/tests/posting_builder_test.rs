//! Posting-line builder scenarios over in-memory reference data.

mod common;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use service_core::error::AppError;

use posting_service::models::{Direction, DocumentRefKind, JournalLineInsert};
use posting_service::posting::builder::{build_posting_batch, PostingBatch};
use posting_service::posting::reference::PostingCaches;

use common::*;

fn lookups_for_parts(part_group_id: Uuid) -> MemoryLookups {
    MemoryLookups::default()
        .with_defaults()
        .with_inventory_group(part_group_id, None)
        .with_purchasing_group(part_group_id, None)
}

async fn build(
    data: &posting_service::posting::reference::ReferenceData,
    lookups: &MemoryLookups,
) -> Result<PostingBatch, AppError> {
    let mut caches = PostingCaches::new(lookups);
    build_posting_batch(data, &mut caches).await
}

fn find<'a>(
    lines: &'a [JournalLineInsert],
    account: &str,
    direction: Direction,
) -> &'a JournalLineInsert {
    lines
        .iter()
        .find(|l| l.account_number == account && l.direction == direction)
        .unwrap_or_else(|| panic!("no {:?} line on account {}", direction, account))
}

#[tokio::test]
async fn unordered_part_line_receives_and_invoices_in_one_step() {
    let part_id = Uuid::new_v4();
    let part_group_id = Uuid::new_v4();
    let supplier = supplier();
    let invoice = invoice(supplier.supplier_id);
    let line = part_line(invoice.invoice_id, part_id, dec!(10), dec!(5), None);

    let mut data = reference_data(invoice, vec![line], supplier);
    data.part_groups.insert(part_id, part_group_id);

    let lookups = lookups_for_parts(part_group_id);
    let batch = build(&data, &lookups).await.unwrap();

    assert_balanced(&batch.journal_lines);
    assert_eq!(batch.journal_lines.len(), 4);
    assert_eq!(batch.receipt_lines.len(), 1);
    assert_eq!(batch.receipt_lines[0].quantity, dec!(10));
    assert_eq!(batch.part_entries.len(), 1);
    assert_eq!(batch.part_entries[0].entry_type, "Positive Adjmt.");
    assert_eq!(batch.part_entries[0].quantity, dec!(10));
    assert_eq!(batch.cost_entries.len(), 1);
    assert_eq!(batch.cost_entries[0].cost, dec!(50.00));
    assert_eq!(batch.cost_entries[0].cost_posted_to_gl, dec!(50.00));
    assert!(batch.order_line_updates.is_empty());

    let inventory = find(&batch.journal_lines, INVENTORY, Direction::Debit);
    assert_eq!(inventory.amount, dec!(50.00));
    assert!(!inventory.accrual);
    assert!(inventory.document_ref.is_none());
    find(&batch.journal_lines, DIRECT_COST_APPLIED, Direction::Credit);
    find(&batch.journal_lines, PURCHASE, Direction::Debit);
    let payables = find(&batch.journal_lines, PAYABLES, Direction::Credit);
    assert_eq!(payables.amount, dec!(50.00));
}

#[tokio::test]
async fn linked_part_line_reverses_accrual_at_historical_cost() {
    let part_id = Uuid::new_v4();
    let part_group_id = Uuid::new_v4();
    let supplier = supplier();
    let invoice = invoice(supplier.supplier_id);

    // Received 10 at $4, nothing invoiced yet; invoice 6 at $5.
    let order_line = order_line(part_id, dec!(10), dec!(10), dec!(0));
    let order_line_id = order_line.order_line_id;
    let line = part_line(
        invoice.invoice_id,
        part_id,
        dec!(6),
        dec!(5),
        Some(order_line_id),
    );

    let mut data = reference_data(invoice, vec![line], supplier);
    data.part_groups.insert(part_id, part_group_id);
    data.order_lines.insert(order_line_id, order_line);
    data.accrual_lines
        .insert(order_line_id, accrual_pair(order_line_id, dec!(10), dec!(4), 1));

    let lookups = lookups_for_parts(part_group_id);
    let batch = build(&data, &lookups).await.unwrap();

    assert_balanced(&batch.journal_lines);
    // Reversal pair + two invoiced pairs, nothing accrued forward.
    assert_eq!(batch.journal_lines.len(), 6);
    assert!(batch.receipt_lines.is_empty());
    assert!(batch.part_entries.is_empty());

    // The original pair was debit inventory / credit interim accrual, so
    // the reversal runs the other way, at the receipt's $4 unit cost.
    let reversal = find(&batch.journal_lines, INTERIM_ACCRUAL, Direction::Debit);
    assert_eq!(reversal.amount, dec!(24.00));
    assert_eq!(reversal.quantity, dec!(6));
    assert!(reversal.accrual);
    let document_ref = reversal.document_ref.unwrap();
    assert_eq!(document_ref.kind, DocumentRefKind::PurchaseInvoice);
    assert_eq!(document_ref.order_line_id, order_line_id);
    let reversal_credit = find(&batch.journal_lines, INVENTORY, Direction::Credit);
    assert_eq!(reversal_credit.amount, dec!(24.00));

    // The invoiced economics post at the invoice's own $5 price.
    let inventory = find(&batch.journal_lines, INVENTORY, Direction::Debit);
    assert_eq!(inventory.amount, dec!(30.00));
    assert!(!inventory.accrual);
    let payables = find(&batch.journal_lines, PAYABLES, Direction::Credit);
    assert_eq!(payables.amount, dec!(30.00));

    assert_eq!(batch.cost_entries.len(), 1);
    assert_eq!(batch.cost_entries[0].quantity, dec!(6));
    assert_eq!(batch.cost_entries[0].cost, dec!(30.00));

    assert_eq!(batch.order_line_updates.len(), 1);
    let update = &batch.order_line_updates[0];
    assert_eq!(update.quantity_invoiced, dec!(6));
    assert!(!update.invoiced_complete);
}

#[tokio::test]
async fn invoicing_past_received_quantity_accrues_the_excess() {
    let part_id = Uuid::new_v4();
    let part_group_id = Uuid::new_v4();
    let supplier = supplier();
    let invoice = invoice(supplier.supplier_id);

    // Received 10 at $4; invoice all 15 at $5. Reverse 10, accrue 5.
    let order_line = order_line(part_id, dec!(15), dec!(10), dec!(0));
    let order_line_id = order_line.order_line_id;
    let line = part_line(
        invoice.invoice_id,
        part_id,
        dec!(15),
        dec!(5),
        Some(order_line_id),
    );

    let mut data = reference_data(invoice, vec![line], supplier);
    data.part_groups.insert(part_id, part_group_id);
    data.order_lines.insert(order_line_id, order_line);
    data.accrual_lines
        .insert(order_line_id, accrual_pair(order_line_id, dec!(10), dec!(4), 1));

    let lookups = lookups_for_parts(part_group_id);
    let batch = build(&data, &lookups).await.unwrap();

    assert_balanced(&batch.journal_lines);
    assert_eq!(batch.journal_lines.len(), 8);

    let reversal = find(&batch.journal_lines, INTERIM_ACCRUAL, Direction::Debit);
    assert_eq!(reversal.amount, dec!(40.00));
    assert_eq!(reversal.quantity, dec!(10));

    let accrued = find(
        &batch.journal_lines,
        INVOICED_NOT_RECEIVED,
        Direction::Debit,
    );
    assert_eq!(accrued.amount, dec!(25.00));
    assert_eq!(accrued.quantity, dec!(5));
    assert!(accrued.accrual);
    let accrued_credit = find(&batch.journal_lines, INTERIM_ACCRUAL, Direction::Credit);
    assert_eq!(accrued_credit.amount, dec!(25.00));

    // Only the reversed quantity hits the cost ledger at invoice price.
    assert_eq!(batch.cost_entries.len(), 1);
    assert_eq!(batch.cost_entries[0].quantity, dec!(10));
    assert_eq!(batch.cost_entries[0].cost, dec!(50.00));

    let update = &batch.order_line_updates[0];
    assert_eq!(update.quantity_invoiced, dec!(15));
    assert!(update.invoiced_complete);
}

#[tokio::test]
async fn reversal_skips_layers_already_consumed_by_earlier_invoices() {
    let part_id = Uuid::new_v4();
    let part_group_id = Uuid::new_v4();
    let supplier = supplier();
    let invoice = invoice(supplier.supplier_id);

    // Two receipts (5 at $4, then 5 at $6); 4 units already invoiced by a
    // previous posting. The next 6 must take 1 from the first layer and 5
    // from the second.
    let order_line = order_line(part_id, dec!(10), dec!(10), dec!(4));
    let order_line_id = order_line.order_line_id;
    let line = part_line(
        invoice.invoice_id,
        part_id,
        dec!(6),
        dec!(5),
        Some(order_line_id),
    );

    let mut layers = accrual_pair(order_line_id, dec!(5), dec!(4), 1);
    layers.extend(accrual_pair(order_line_id, dec!(5), dec!(6), 3));

    let mut data = reference_data(invoice, vec![line], supplier);
    data.part_groups.insert(part_id, part_group_id);
    data.order_lines.insert(order_line_id, order_line);
    data.accrual_lines.insert(order_line_id, layers);

    let lookups = lookups_for_parts(part_group_id);
    let batch = build(&data, &lookups).await.unwrap();

    assert_balanced(&batch.journal_lines);

    let reversals: Vec<&JournalLineInsert> = batch
        .journal_lines
        .iter()
        .filter(|l| l.accrual && l.account_number == INTERIM_ACCRUAL)
        .collect();
    assert_eq!(reversals.len(), 2);
    assert_eq!(reversals[0].quantity, dec!(1));
    assert_eq!(reversals[0].amount, dec!(4.00));
    assert_eq!(reversals[1].quantity, dec!(5));
    assert_eq!(reversals[1].amount, dec!(30.00));

    let update = &batch.order_line_updates[0];
    assert_eq!(update.quantity_invoiced, dec!(10));
    assert!(update.invoiced_complete);
}

#[tokio::test]
async fn multiple_lines_against_one_order_line_chain_their_counters() {
    let part_id = Uuid::new_v4();
    let part_group_id = Uuid::new_v4();
    let supplier = supplier();
    let invoice = invoice(supplier.supplier_id);

    let order_line = order_line(part_id, dec!(10), dec!(10), dec!(0));
    let order_line_id = order_line.order_line_id;
    let first = part_line(
        invoice.invoice_id,
        part_id,
        dec!(5),
        dec!(5),
        Some(order_line_id),
    );
    let second = part_line(
        invoice.invoice_id,
        part_id,
        dec!(5),
        dec!(5),
        Some(order_line_id),
    );

    let mut data = reference_data(invoice, vec![first, second], supplier);
    data.part_groups.insert(part_id, part_group_id);
    data.order_lines.insert(order_line_id, order_line);
    data.accrual_lines
        .insert(order_line_id, accrual_pair(order_line_id, dec!(10), dec!(4), 1));

    let lookups = lookups_for_parts(part_group_id);
    let batch = build(&data, &lookups).await.unwrap();

    assert_balanced(&batch.journal_lines);

    // Each line reverses its own 5 units; together they drain the layer.
    let reversed: Decimal = batch
        .journal_lines
        .iter()
        .filter(|l| l.accrual && l.account_number == INTERIM_ACCRUAL)
        .map(|l| l.quantity)
        .sum();
    assert_eq!(reversed, dec!(10));

    // One consolidated update for the order line.
    assert_eq!(batch.order_line_updates.len(), 1);
    let update = &batch.order_line_updates[0];
    assert_eq!(update.quantity_invoiced, dec!(10));
    assert!(update.invoiced_complete);
}

#[tokio::test]
async fn gl_account_line_posts_two_pairs_against_defaults() {
    let supplier = supplier();
    let invoice = invoice(supplier.supplier_id);
    let line = gl_line(invoice.invoice_id, "60000", dec!(1), dec!(120));

    let data = reference_data(invoice, vec![line], supplier);
    let lookups = MemoryLookups::default()
        .with_defaults()
        .with_account("60000", "expense", true);

    let batch = build(&data, &lookups).await.unwrap();

    assert_balanced(&batch.journal_lines);
    assert_eq!(batch.journal_lines.len(), 4);
    let expense = find(&batch.journal_lines, "60000", Direction::Debit);
    assert_eq!(expense.amount, dec!(120.00));
    find(&batch.journal_lines, DEFAULT_OVERHEAD, Direction::Credit);
    find(&batch.journal_lines, DEFAULT_PURCHASE, Direction::Debit);
    find(&batch.journal_lines, DEFAULT_PAYABLES, Direction::Credit);
    assert!(batch.receipt_lines.is_empty());
    assert!(batch.cost_entries.is_empty());
}

#[tokio::test]
async fn gl_account_without_direct_posting_is_rejected() {
    let supplier = supplier();
    let invoice = invoice(supplier.supplier_id);
    let line = gl_line(invoice.invoice_id, "13000", dec!(1), dec!(120));

    let data = reference_data(invoice, vec![line], supplier);
    let lookups = MemoryLookups::default()
        .with_defaults()
        .with_account("13000", "asset", false);

    let result = build(&data, &lookups).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn gl_account_with_unrecognized_class_is_rejected() {
    let supplier = supplier();
    let invoice = invoice(supplier.supplier_id);
    let line = gl_line(invoice.invoice_id, "60000", dec!(1), dec!(120));

    let data = reference_data(invoice, vec![line], supplier);
    let lookups = MemoryLookups::default()
        .with_defaults()
        .with_account("60000", "miscellaneous", true);

    let result = build(&data, &lookups).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn inconsistent_accrual_history_aborts_the_run() {
    let part_id = Uuid::new_v4();
    let part_group_id = Uuid::new_v4();
    let supplier = supplier();
    let invoice = invoice(supplier.supplier_id);

    let order_line = order_line(part_id, dec!(10), dec!(10), dec!(0));
    let order_line_id = order_line.order_line_id;
    let line = part_line(
        invoice.invoice_id,
        part_id,
        dec!(6),
        dec!(5),
        Some(order_line_id),
    );

    // A pair with its credit side missing; nothing must be posted against
    // history like this.
    let mut layers = accrual_pair(order_line_id, dec!(10), dec!(4), 1);
    layers.truncate(1);

    let mut data = reference_data(invoice, vec![line], supplier);
    data.part_groups.insert(part_id, part_group_id);
    data.order_lines.insert(order_line_id, order_line);
    data.accrual_lines.insert(order_line_id, layers);

    let lookups = lookups_for_parts(part_group_id);
    let result = build(&data, &lookups).await;
    assert!(matches!(result, Err(AppError::InternalError(_))));
}

#[tokio::test]
async fn unknown_line_type_aborts_the_run() {
    let supplier = supplier();
    let invoice = invoice(supplier.supplier_id);
    let mut line = gl_line(invoice.invoice_id, "60000", dec!(1), dec!(10));
    line.line_type = "Charge (Item)".to_string();

    let data = reference_data(invoice, vec![line], supplier);
    let lookups = MemoryLookups::default();

    let result = build(&data, &lookups).await;
    assert!(matches!(result, Err(AppError::BadRequest(_))));
}

#[tokio::test]
async fn comment_lines_produce_nothing() {
    let supplier = supplier();
    let invoice = invoice(supplier.supplier_id);
    let mut line = gl_line(invoice.invoice_id, "60000", dec!(0), dec!(0));
    line.line_type = "Comment".to_string();
    line.account_number = None;

    let data = reference_data(invoice, vec![line], supplier);
    let lookups = MemoryLookups::default();

    let batch = build(&data, &lookups).await.unwrap();
    assert!(batch.journal_lines.is_empty());
    assert!(batch.receipt_lines.is_empty());
    assert!(batch.part_entries.is_empty());
    assert!(batch.cost_entries.is_empty());
    assert!(batch.order_line_updates.is_empty());
}
