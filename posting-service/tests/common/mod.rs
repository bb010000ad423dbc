//! Common test utilities for posting-service integration tests.

#![allow(dead_code)]

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use service_core::error::AppError;

use posting_service::models::{
    Account, AccountDefaults, Direction, InventoryPostingGroup, JournalLine, JournalLineInsert,
    PurchaseInvoice, PurchaseInvoiceLine, PurchaseOrderLine, PurchasingPostingGroup, Supplier,
};
use posting_service::posting::reference::{PostingLookups, ReferenceData};

pub const INVENTORY: &str = "13000";
pub const INTERIM_ACCRUAL: &str = "22100";
pub const INVOICED_NOT_RECEIVED: &str = "13300";
pub const DIRECT_COST_APPLIED: &str = "56000";
pub const OVERHEAD_COST_APPLIED: &str = "57000";
pub const INVENTORY_VARIANCE: &str = "58000";
pub const PURCHASE: &str = "50000";
pub const PAYABLES: &str = "20000";
pub const PURCHASE_VARIANCE: &str = "58100";
pub const DEFAULT_OVERHEAD: &str = "57500";
pub const DEFAULT_PURCHASE: &str = "50500";
pub const DEFAULT_PAYABLES: &str = "20500";

/// In-memory implementation of the builder's read-side collaborator.
#[derive(Default)]
pub struct MemoryLookups {
    pub accounts: HashMap<String, Account>,
    pub defaults: Option<AccountDefaults>,
    pub inventory: HashMap<(Uuid, Option<Uuid>), InventoryPostingGroup>,
    pub purchasing: HashMap<(Uuid, Option<Uuid>), PurchasingPostingGroup>,
}

impl MemoryLookups {
    pub fn with_account(mut self, number: &str, class: &str, direct_posting: bool) -> Self {
        self.accounts.insert(
            number.to_string(),
            Account {
                number: number.to_string(),
                name: format!("Account {}", number),
                class: class.to_string(),
                direct_posting,
                created_utc: Utc::now(),
            },
        );
        self
    }

    pub fn with_defaults(mut self) -> Self {
        self.defaults = Some(AccountDefaults {
            overhead_cost_applied_account: DEFAULT_OVERHEAD.to_string(),
            purchase_account: DEFAULT_PURCHASE.to_string(),
            payables_account: DEFAULT_PAYABLES.to_string(),
        });
        self
    }

    pub fn with_inventory_group(mut self, part_group_id: Uuid, location_id: Option<Uuid>) -> Self {
        self.inventory.insert(
            (part_group_id, location_id),
            InventoryPostingGroup {
                id: Uuid::new_v4(),
                part_group_id,
                location_id,
                inventory_account: INVENTORY.to_string(),
                inventory_interim_accrual_account: INTERIM_ACCRUAL.to_string(),
                inventory_invoiced_not_received_account: INVOICED_NOT_RECEIVED.to_string(),
                direct_cost_applied_account: DIRECT_COST_APPLIED.to_string(),
                overhead_cost_applied_account: OVERHEAD_COST_APPLIED.to_string(),
                purchase_variance_account: INVENTORY_VARIANCE.to_string(),
            },
        );
        self
    }

    pub fn with_purchasing_group(
        mut self,
        part_group_id: Uuid,
        supplier_type_id: Option<Uuid>,
    ) -> Self {
        self.purchasing.insert(
            (part_group_id, supplier_type_id),
            PurchasingPostingGroup {
                id: Uuid::new_v4(),
                part_group_id,
                supplier_type_id,
                purchase_account: PURCHASE.to_string(),
                payables_account: PAYABLES.to_string(),
                purchase_variance_account: PURCHASE_VARIANCE.to_string(),
            },
        );
        self
    }
}

#[async_trait]
impl PostingLookups for MemoryLookups {
    async fn account(&self, number: &str) -> Result<Option<Account>, AppError> {
        Ok(self.accounts.get(number).cloned())
    }

    async fn account_defaults(&self) -> Result<Option<AccountDefaults>, AppError> {
        Ok(self.defaults.clone())
    }

    async fn inventory_posting_group(
        &self,
        part_group_id: Uuid,
        location_id: Option<Uuid>,
    ) -> Result<Option<InventoryPostingGroup>, AppError> {
        Ok(self.inventory.get(&(part_group_id, location_id)).cloned())
    }

    async fn purchasing_posting_group(
        &self,
        part_group_id: Uuid,
        supplier_type_id: Option<Uuid>,
    ) -> Result<Option<PurchasingPostingGroup>, AppError> {
        Ok(self
            .purchasing
            .get(&(part_group_id, supplier_type_id))
            .cloned())
    }
}

pub fn invoice(supplier_id: Uuid) -> PurchaseInvoice {
    PurchaseInvoice {
        invoice_id: Uuid::new_v4(),
        invoice_number: Some("PI-0001".to_string()),
        supplier_id,
        status: "Draft".to_string(),
        currency_code: "USD".to_string(),
        exchange_rate: Decimal::ONE,
        subtotal: Decimal::ZERO,
        total: Decimal::ZERO,
        posting_date: None,
        created_utc: Utc::now(),
    }
}

pub fn supplier() -> Supplier {
    Supplier {
        supplier_id: Uuid::new_v4(),
        name: "Acme Industrial".to_string(),
        supplier_type_id: None,
        created_utc: Utc::now(),
    }
}

pub fn part_line(
    invoice_id: Uuid,
    part_id: Uuid,
    quantity: Decimal,
    unit_price: Decimal,
    order_line_id: Option<Uuid>,
) -> PurchaseInvoiceLine {
    PurchaseInvoiceLine {
        invoice_line_id: Uuid::new_v4(),
        invoice_id,
        line_type: "Part".to_string(),
        part_id: Some(part_id),
        service_id: None,
        asset_id: None,
        account_number: None,
        order_line_id,
        quantity,
        unit_price,
        location_id: None,
        shelf_id: None,
        description: None,
    }
}

pub fn gl_line(
    invoice_id: Uuid,
    account_number: &str,
    quantity: Decimal,
    unit_price: Decimal,
) -> PurchaseInvoiceLine {
    PurchaseInvoiceLine {
        invoice_line_id: Uuid::new_v4(),
        invoice_id,
        line_type: "G/L Account".to_string(),
        part_id: None,
        service_id: None,
        asset_id: None,
        account_number: Some(account_number.to_string()),
        order_line_id: None,
        quantity,
        unit_price,
        location_id: None,
        shelf_id: None,
        description: None,
    }
}

pub fn order_line(
    part_id: Uuid,
    purchase_quantity: Decimal,
    quantity_received: Decimal,
    quantity_invoiced: Decimal,
) -> PurchaseOrderLine {
    PurchaseOrderLine {
        order_line_id: Uuid::new_v4(),
        order_id: Uuid::new_v4(),
        part_id: Some(part_id),
        purchase_quantity,
        quantity_to_receive: None,
        quantity_to_invoice: None,
        quantity_received,
        quantity_invoiced,
        unit_price: Decimal::ZERO,
        location_id: None,
        received_complete: false,
        invoiced_complete: false,
    }
}

/// One original receipt-accrual pair: debit/credit journal lines for
/// `quantity` units at `unit_cost`, tagged to the order line.
pub fn accrual_pair(
    order_line_id: Uuid,
    quantity: Decimal,
    unit_cost: Decimal,
    entry_number_base: i64,
) -> Vec<JournalLine> {
    let journal_id = Uuid::new_v4();
    let line_group = Uuid::new_v4();
    let amount = (quantity * unit_cost).round_dp(2);
    let make = |direction: Direction, account: &str, entry_number: i64| JournalLine {
        journal_line_id: Uuid::new_v4(),
        journal_id,
        entry_number,
        account_number: account.to_string(),
        direction: direction.as_str().to_string(),
        amount,
        quantity,
        line_group,
        document_ref_kind: Some("receipt".to_string()),
        document_ref_line_id: Some(order_line_id),
        accrual: true,
        description: None,
        created_utc: Utc::now(),
    };
    vec![
        make(Direction::Debit, INVENTORY, entry_number_base),
        make(Direction::Credit, INTERIM_ACCRUAL, entry_number_base + 1),
    ]
}

pub fn reference_data(
    invoice: PurchaseInvoice,
    lines: Vec<PurchaseInvoiceLine>,
    supplier: Supplier,
) -> ReferenceData {
    ReferenceData {
        invoice,
        lines,
        supplier,
        part_groups: HashMap::new(),
        order_lines: HashMap::new(),
        accrual_lines: HashMap::new(),
    }
}

/// Assert that every line group in the batch sums to zero.
pub fn assert_balanced(lines: &[JournalLineInsert]) {
    let mut sums: HashMap<Uuid, Decimal> = HashMap::new();
    for line in lines {
        *sums.entry(line.line_group).or_default() += line.signed_amount();
    }
    for (group, sum) in sums {
        assert_eq!(sum, Decimal::ZERO, "line group {} does not balance", group);
    }
}
