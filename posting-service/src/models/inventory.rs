//! Receipt and inventory/cost movement models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Part master data; posting only needs the group mapping.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Part {
    pub part_id: Uuid,
    pub part_group_id: Uuid,
    pub name: String,
    pub created_utc: DateTime<Utc>,
}

/// Pending receipt line; grouped by location and attached to a numbered
/// receipt header at commit time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptLineInsert {
    pub part_id: Uuid,
    pub order_line_id: Option<Uuid>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub location_id: Option<Uuid>,
    pub shelf_id: Option<String>,
}

/// Pending part-ledger entry (physical movement).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartLedgerInsert {
    pub part_id: Uuid,
    pub entry_type: String,
    pub document_type: String,
    pub document_id: Uuid,
    pub quantity: Decimal,
    pub location_id: Option<Uuid>,
    pub shelf_id: Option<String>,
}

/// Pending cost-ledger entry (cost movement).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostLedgerInsert {
    pub part_id: Uuid,
    pub cost_ledger_type: String,
    pub document_type: String,
    pub document_id: Uuid,
    pub quantity: Decimal,
    pub cost: Decimal,
    pub cost_posted_to_gl: Decimal,
}
