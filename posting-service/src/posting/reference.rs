//! Reference data for one posting run: eager fan-out loads plus
//! request-scoped memo caches for account and posting-group lookups.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::future::try_join_all;
use tracing::instrument;
use uuid::Uuid;

use service_core::error::AppError;

use crate::models::{
    Account, AccountDefaults, InventoryPostingGroup, JournalLine, LineType, PurchaseInvoice,
    PurchaseInvoiceLine, PurchaseOrderLine, PurchasingPostingGroup, Supplier,
};
use crate::services::database::Database;

/// Read-side collaborator for the posting-line builder. `Database` is the
/// production implementation; tests supply an in-memory one.
#[async_trait]
pub trait PostingLookups: Send + Sync {
    async fn account(&self, number: &str) -> Result<Option<Account>, AppError>;

    async fn account_defaults(&self) -> Result<Option<AccountDefaults>, AppError>;

    async fn inventory_posting_group(
        &self,
        part_group_id: Uuid,
        location_id: Option<Uuid>,
    ) -> Result<Option<InventoryPostingGroup>, AppError>;

    async fn purchasing_posting_group(
        &self,
        part_group_id: Uuid,
        supplier_type_id: Option<Uuid>,
    ) -> Result<Option<PurchasingPostingGroup>, AppError>;
}

/// Memoization scoped to a single posting run. Posting groups can change
/// between runs, so nothing here outlives the request.
pub struct PostingCaches<'a> {
    lookups: &'a dyn PostingLookups,
    accounts: HashMap<String, Account>,
    defaults: Option<AccountDefaults>,
    inventory: HashMap<(Uuid, Option<Uuid>), InventoryPostingGroup>,
    purchasing: HashMap<(Uuid, Option<Uuid>), PurchasingPostingGroup>,
}

impl<'a> PostingCaches<'a> {
    pub fn new(lookups: &'a dyn PostingLookups) -> Self {
        Self {
            lookups,
            accounts: HashMap::new(),
            defaults: None,
            inventory: HashMap::new(),
            purchasing: HashMap::new(),
        }
    }

    pub async fn account(&mut self, number: &str) -> Result<Account, AppError> {
        if let Some(account) = self.accounts.get(number) {
            return Ok(account.clone());
        }
        let account = self.lookups.account(number).await?.ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!("Account {} does not exist", number))
        })?;
        self.accounts.insert(number.to_string(), account.clone());
        Ok(account)
    }

    pub async fn account_defaults(&mut self) -> Result<AccountDefaults, AppError> {
        if let Some(defaults) = &self.defaults {
            return Ok(defaults.clone());
        }
        let defaults = self.lookups.account_defaults().await?.ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!("Default posting accounts are not configured"))
        })?;
        self.defaults = Some(defaults.clone());
        Ok(defaults)
    }

    pub async fn inventory_group(
        &mut self,
        part_group_id: Uuid,
        location_id: Option<Uuid>,
    ) -> Result<InventoryPostingGroup, AppError> {
        let key = (part_group_id, location_id);
        if let Some(group) = self.inventory.get(&key) {
            return Ok(group.clone());
        }
        let group = self
            .lookups
            .inventory_posting_group(part_group_id, location_id)
            .await?
            .ok_or_else(|| {
                AppError::BadRequest(anyhow::anyhow!(
                    "No inventory posting group for part group {} at location {:?}",
                    part_group_id,
                    location_id
                ))
            })?;
        self.inventory.insert(key, group.clone());
        Ok(group)
    }

    pub async fn purchasing_group(
        &mut self,
        part_group_id: Uuid,
        supplier_type_id: Option<Uuid>,
    ) -> Result<PurchasingPostingGroup, AppError> {
        let key = (part_group_id, supplier_type_id);
        if let Some(group) = self.purchasing.get(&key) {
            return Ok(group.clone());
        }
        let group = self
            .lookups
            .purchasing_posting_group(part_group_id, supplier_type_id)
            .await?
            .ok_or_else(|| {
                AppError::BadRequest(anyhow::anyhow!(
                    "No purchasing posting group for part group {} and supplier type {:?}",
                    part_group_id,
                    supplier_type_id
                ))
            })?;
        self.purchasing.insert(key, group.clone());
        Ok(group)
    }
}

/// Everything a posting run reads before it starts writing.
#[derive(Debug, Clone)]
pub struct ReferenceData {
    pub invoice: PurchaseInvoice,
    pub lines: Vec<PurchaseInvoiceLine>,
    pub supplier: Supplier,
    /// part id -> part group id, for every part referenced by the invoice.
    pub part_groups: HashMap<Uuid, Uuid>,
    pub order_lines: HashMap<Uuid, PurchaseOrderLine>,
    /// Outstanding receipt-accrual journal lines per order line, in
    /// original posting order.
    pub accrual_lines: HashMap<Uuid, Vec<JournalLine>>,
}

/// Load the invoice and all reference data it touches. Independent reads
/// fan out concurrently; any failed fetch aborts the run before a single
/// write happens.
#[instrument(skip(db), fields(invoice_id = %invoice_id))]
pub async fn load(db: &Database, invoice_id: Uuid) -> Result<ReferenceData, AppError> {
    let invoice = db.fetch_invoice(invoice_id).await?.ok_or_else(|| {
        AppError::NotFound(anyhow::anyhow!("Purchase invoice {} not found", invoice_id))
    })?;
    let lines = db.fetch_invoice_lines(invoice_id).await?;

    let mut part_ids: Vec<Uuid> = lines.iter().filter_map(|l| l.part_id).collect();
    part_ids.sort_unstable();
    part_ids.dedup();
    let mut order_line_ids: Vec<Uuid> = lines.iter().filter_map(|l| l.order_line_id).collect();
    order_line_ids.sort_unstable();
    order_line_ids.dedup();

    let (parts, order_lines, supplier) = tokio::try_join!(
        db.fetch_parts(&part_ids),
        db.fetch_order_lines(&order_line_ids),
        db.fetch_supplier(invoice.supplier_id),
    )?;

    let supplier = supplier.ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!(
            "Supplier {} referenced by invoice {} does not exist",
            invoice.supplier_id,
            invoice_id
        ))
    })?;

    let part_groups: HashMap<Uuid, Uuid> = parts
        .into_iter()
        .map(|p| (p.part_id, p.part_group_id))
        .collect();
    for line in &lines {
        if line.parsed_line_type() == Some(LineType::Part) {
            if let Some(part_id) = line.part_id {
                if !part_groups.contains_key(&part_id) {
                    return Err(AppError::BadRequest(anyhow::anyhow!(
                        "Part {} referenced by invoice line {} does not exist",
                        part_id,
                        line.invoice_line_id
                    )));
                }
            }
        }
    }

    let order_lines: HashMap<Uuid, PurchaseOrderLine> = order_lines
        .into_iter()
        .map(|ol| (ol.order_line_id, ol))
        .collect();
    for id in &order_line_ids {
        if !order_lines.contains_key(id) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Purchase order line {} referenced by invoice {} does not exist",
                id,
                invoice_id
            )));
        }
    }

    // Only order lines with an outstanding received-not-invoiced balance
    // can have layers to reverse.
    let reversal_candidates: Vec<Uuid> = order_lines
        .values()
        .filter(|ol| ol.received_not_invoiced() > rust_decimal::Decimal::ZERO)
        .map(|ol| ol.order_line_id)
        .collect();
    let fetched = try_join_all(
        reversal_candidates
            .iter()
            .map(|id| db.fetch_receipt_accrual_lines(*id)),
    )
    .await?;
    let accrual_lines = reversal_candidates.into_iter().zip(fetched).collect();

    Ok(ReferenceData {
        invoice,
        lines,
        supplier,
        part_groups,
        order_lines,
        accrual_lines,
    })
}
