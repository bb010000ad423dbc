//! Posting-group configuration: maps part groups to account numbers.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Inventory posting group, keyed by (part group, location).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct InventoryPostingGroup {
    pub id: Uuid,
    pub part_group_id: Uuid,
    pub location_id: Option<Uuid>,
    pub inventory_account: String,
    pub inventory_interim_accrual_account: String,
    pub inventory_invoiced_not_received_account: String,
    pub direct_cost_applied_account: String,
    pub overhead_cost_applied_account: String,
    pub purchase_variance_account: String,
}

/// Purchasing posting group, keyed by (part group, supplier type).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PurchasingPostingGroup {
    pub id: Uuid,
    pub part_group_id: Uuid,
    pub supplier_type_id: Option<Uuid>,
    pub purchase_account: String,
    pub payables_account: String,
    pub purchase_variance_account: String,
}
