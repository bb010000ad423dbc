//! Purchase-order models and status derivation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Purchase-order status, derived purely from line completion flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    ToReceiveAndInvoice,
    ToReceive,
    ToInvoice,
    Completed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ToReceiveAndInvoice => "To Receive and Invoice",
            Self::ToReceive => "To Receive",
            Self::ToInvoice => "To Invoice",
            Self::Completed => "Completed",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "To Receive" => Self::ToReceive,
            "To Invoice" => Self::ToInvoice,
            "Completed" => Self::Completed,
            _ => Self::ToReceiveAndInvoice,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derive order status from the current completion flags of all its lines.
/// Pure function of the flags; history never enters into it.
pub fn derive_order_status<'a, I>(lines: I) -> OrderStatus
where
    I: IntoIterator<Item = &'a LineCompletion>,
{
    let mut all_received = true;
    let mut all_invoiced = true;
    for line in lines {
        all_received &= line.received_complete;
        all_invoiced &= line.invoiced_complete;
    }
    match (all_received, all_invoiced) {
        (true, true) => OrderStatus::Completed,
        (false, true) => OrderStatus::ToReceive,
        (true, false) => OrderStatus::ToInvoice,
        (false, false) => OrderStatus::ToReceiveAndInvoice,
    }
}

/// Completion flags of one order line, as they will stand after this
/// posting's updates are applied.
#[derive(Debug, Clone, Copy, FromRow, Serialize, Deserialize)]
pub struct LineCompletion {
    pub received_complete: bool,
    pub invoiced_complete: bool,
}

/// Purchase order header.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub order_id: Uuid,
    pub order_number: String,
    pub supplier_id: Uuid,
    pub status: String,
    pub created_utc: DateTime<Utc>,
}

/// Purchase order line with cumulative fulfillment counters.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PurchaseOrderLine {
    pub order_line_id: Uuid,
    pub order_id: Uuid,
    pub part_id: Option<Uuid>,
    pub purchase_quantity: Decimal,
    pub quantity_to_receive: Option<Decimal>,
    pub quantity_to_invoice: Option<Decimal>,
    pub quantity_received: Decimal,
    pub quantity_invoiced: Decimal,
    pub unit_price: Decimal,
    pub location_id: Option<Uuid>,
    pub received_complete: bool,
    pub invoiced_complete: bool,
}

impl PurchaseOrderLine {
    /// Quantity the line is expected to be invoiced for, honoring the
    /// override when one is set.
    pub fn invoice_target(&self) -> Decimal {
        self.quantity_to_invoice.unwrap_or(self.purchase_quantity)
    }

    /// Units received but not yet invoiced; the pool available to reverse.
    pub fn received_not_invoiced(&self) -> Decimal {
        (self.quantity_received - self.quantity_invoiced).max(Decimal::ZERO)
    }
}

/// In-memory update to an order line's invoiced counters, applied by the
/// committer inside the posting transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineUpdate {
    pub order_line_id: Uuid,
    pub order_id: Uuid,
    /// New cumulative invoiced quantity.
    pub quantity_invoiced: Decimal,
    pub invoiced_complete: bool,
}
