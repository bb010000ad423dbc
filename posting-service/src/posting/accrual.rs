//! Receipt-accrual layers and FIFO reversal consumption.
//!
//! When goods are received before they are invoiced, receiving posts a
//! balanced accrual pair tagged with the originating order line. Invoicing
//! later unwinds those pairs oldest-first, each at its own historical
//! per-unit cost. The lot-consumption walk is a pure function so the
//! layering rules can be tested without a database.

use rust_decimal::Decimal;
use uuid::Uuid;

use service_core::error::AppError;

use crate::models::{Direction, JournalLine};

/// One outstanding accrual posting: a matched debit/credit pair carrying
/// its own quantity and per-unit cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccrualLayer {
    pub journal_id: Uuid,
    pub quantity: Decimal,
    pub unit_cost: Decimal,
    pub debit_account: String,
    pub credit_account: String,
}

/// Group receipt-tagged journal lines (already in original posting order)
/// into matched debit/credit layers. Lines are chunked into consecutive
/// `(journal_id, accrual)` runs; each debit/credit couple inside a run is
/// one layer. A line that cannot be paired means the accrual history is
/// inconsistent, and the whole run fails rather than reversing less than
/// it should.
pub fn pair_layers(lines: &[JournalLine]) -> Result<Vec<AccrualLayer>, AppError> {
    let mut layers = Vec::new();
    let mut pending: Option<&JournalLine> = None;
    let mut run_key: Option<(Uuid, bool)> = None;

    for line in lines {
        let key = (line.journal_id, line.accrual);
        if run_key != Some(key) {
            if let Some(orphan) = pending.take() {
                return Err(unpaired(orphan));
            }
            run_key = Some(key);
        }

        match pending.take() {
            None => pending = Some(line),
            Some(first) => layers.push(build_layer(first, line)?),
        }
    }

    if let Some(orphan) = pending {
        return Err(unpaired(orphan));
    }

    Ok(layers)
}

fn unpaired(line: &JournalLine) -> AppError {
    AppError::InternalError(anyhow::anyhow!(
        "Unpaired accrual journal line {} in journal {}; refusing to reverse against inconsistent history",
        line.journal_line_id,
        line.journal_id
    ))
}

fn build_layer(a: &JournalLine, b: &JournalLine) -> Result<AccrualLayer, AppError> {
    let (debit_line, credit_line) = match (a.parsed_direction(), b.parsed_direction()) {
        (Some(Direction::Debit), Some(Direction::Credit)) => (a, b),
        (Some(Direction::Credit), Some(Direction::Debit)) => (b, a),
        _ => {
            return Err(AppError::InternalError(anyhow::anyhow!(
                "Accrual pair in journal {} lacks matched debit/credit sides",
                a.journal_id
            )))
        }
    };
    let quantity = debit_line.quantity.abs();
    if quantity.is_zero() {
        return Err(AppError::InternalError(anyhow::anyhow!(
            "Accrual pair in journal {} carries zero quantity",
            debit_line.journal_id
        )));
    }
    Ok(AccrualLayer {
        journal_id: debit_line.journal_id,
        quantity,
        unit_cost: debit_line.amount / quantity,
        debit_account: debit_line.account_number.clone(),
        credit_account: credit_line.account_number.clone(),
    })
}

/// Quantity taken from one layer by the current reversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerConsumption {
    pub layer: usize,
    pub quantity: Decimal,
}

/// Walk layers oldest-first and decide how much of `quantity_to_reverse`
/// each one absorbs. `quantity_already_reversed` units were consumed by
/// earlier invoices against the same layers and are skipped before any
/// consumption starts, so no unit is ever reversed twice.
pub fn consume_layers(
    layers: &[AccrualLayer],
    quantity_to_reverse: Decimal,
    quantity_already_reversed: Decimal,
) -> Vec<LayerConsumption> {
    let mut consumptions = Vec::new();
    let mut skip = quantity_already_reversed.max(Decimal::ZERO);
    let mut remaining = quantity_to_reverse.max(Decimal::ZERO);

    for (index, layer) in layers.iter().enumerate() {
        if remaining.is_zero() {
            break;
        }
        let available = (layer.quantity - skip).max(Decimal::ZERO);
        skip = (skip - layer.quantity).max(Decimal::ZERO);

        let taken = available.min(remaining);
        if taken > Decimal::ZERO {
            consumptions.push(LayerConsumption {
                layer: index,
                quantity: taken,
            });
            remaining -= taken;
        }
    }

    consumptions
}
