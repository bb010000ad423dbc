//! Database service for posting-service.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, instrument};
use uuid::Uuid;

use service_core::error::AppError;

use crate::models::{
    Account, AccountDefaults, InventoryPostingGroup, JournalLine, Part, PurchaseInvoice,
    PurchaseInvoiceLine, PurchaseOrderLine, PurchasingPostingGroup, Supplier,
};
use crate::posting::reference::PostingLookups;
use crate::services::metrics::DB_QUERY_DURATION;

/// Database connection pool wrapper.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool.
    #[instrument(skip(database_url), fields(service = "posting-service"))]
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self, AppError> {
        info!(
            max_connections = max_connections,
            min_connections = min_connections,
            "Connecting to PostgreSQL"
        );

        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600))
            .connect(database_url)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to connect: {}", e)))?;

        info!("PostgreSQL connection pool established");

        Ok(Self { pool })
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Check database health.
    #[instrument(skip(self))]
    pub async fn health_check(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Health check failed: {}", e)))?;
        Ok(())
    }

    /// Run database migrations.
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        info!("Running database migrations");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Migration failed: {}", e)))?;
        info!("Database migrations completed");
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Reference Data Fetches
    // -------------------------------------------------------------------------

    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn fetch_invoice(
        &self,
        invoice_id: Uuid,
    ) -> Result<Option<PurchaseInvoice>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["fetch_invoice"])
            .start_timer();

        let invoice = sqlx::query_as::<_, PurchaseInvoice>(
            r#"
            SELECT invoice_id, invoice_number, supplier_id, status, currency_code, exchange_rate,
                   subtotal, total, posting_date, created_utc
            FROM purchase_invoices
            WHERE invoice_id = $1
            "#,
        )
        .bind(invoice_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to fetch invoice: {}", e)))?;

        timer.observe_duration();

        Ok(invoice)
    }

    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn fetch_invoice_lines(
        &self,
        invoice_id: Uuid,
    ) -> Result<Vec<PurchaseInvoiceLine>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["fetch_invoice_lines"])
            .start_timer();

        let lines = sqlx::query_as::<_, PurchaseInvoiceLine>(
            r#"
            SELECT invoice_line_id, invoice_id, line_type, part_id, service_id, asset_id,
                   account_number, order_line_id, quantity, unit_price, location_id, shelf_id,
                   description
            FROM purchase_invoice_lines
            WHERE invoice_id = $1
            ORDER BY invoice_line_id
            "#,
        )
        .bind(invoice_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to fetch invoice lines: {}", e))
        })?;

        timer.observe_duration();

        Ok(lines)
    }

    #[instrument(skip(self, part_ids), fields(part_count = part_ids.len()))]
    pub async fn fetch_parts(&self, part_ids: &[Uuid]) -> Result<Vec<Part>, AppError> {
        if part_ids.is_empty() {
            return Ok(Vec::new());
        }

        let timer = DB_QUERY_DURATION
            .with_label_values(&["fetch_parts"])
            .start_timer();

        let parts = sqlx::query_as::<_, Part>(
            r#"
            SELECT part_id, part_group_id, name, created_utc
            FROM parts
            WHERE part_id = ANY($1)
            "#,
        )
        .bind(part_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to fetch parts: {}", e)))?;

        timer.observe_duration();

        Ok(parts)
    }

    #[instrument(skip(self, order_line_ids), fields(line_count = order_line_ids.len()))]
    pub async fn fetch_order_lines(
        &self,
        order_line_ids: &[Uuid],
    ) -> Result<Vec<PurchaseOrderLine>, AppError> {
        if order_line_ids.is_empty() {
            return Ok(Vec::new());
        }

        let timer = DB_QUERY_DURATION
            .with_label_values(&["fetch_order_lines"])
            .start_timer();

        let lines = sqlx::query_as::<_, PurchaseOrderLine>(
            r#"
            SELECT order_line_id, order_id, part_id, purchase_quantity, quantity_to_receive,
                   quantity_to_invoice, quantity_received, quantity_invoiced, unit_price,
                   location_id, received_complete, invoiced_complete
            FROM purchase_order_lines
            WHERE order_line_id = ANY($1)
            "#,
        )
        .bind(order_line_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to fetch order lines: {}", e))
        })?;

        timer.observe_duration();

        Ok(lines)
    }

    #[instrument(skip(self), fields(supplier_id = %supplier_id))]
    pub async fn fetch_supplier(&self, supplier_id: Uuid) -> Result<Option<Supplier>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["fetch_supplier"])
            .start_timer();

        let supplier = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT supplier_id, name, supplier_type_id, created_utc
            FROM suppliers
            WHERE supplier_id = $1
            "#,
        )
        .bind(supplier_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to fetch supplier: {}", e))
        })?;

        timer.observe_duration();

        Ok(supplier)
    }

    /// Outstanding receipt-accrual journal lines for one order line, in
    /// original posting order.
    #[instrument(skip(self), fields(order_line_id = %order_line_id))]
    pub async fn fetch_receipt_accrual_lines(
        &self,
        order_line_id: Uuid,
    ) -> Result<Vec<JournalLine>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["fetch_receipt_accrual_lines"])
            .start_timer();

        let lines = sqlx::query_as::<_, JournalLine>(
            r#"
            SELECT journal_line_id, journal_id, entry_number, account_number, direction, amount,
                   quantity, line_group, document_ref_kind, document_ref_line_id, accrual,
                   description, created_utc
            FROM journal_lines
            WHERE document_ref_kind = 'receipt' AND document_ref_line_id = $1
            ORDER BY entry_number
            "#,
        )
        .bind(order_line_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to fetch accrual lines: {}", e))
        })?;

        timer.observe_duration();

        Ok(lines)
    }

    // -------------------------------------------------------------------------
    // Recovery
    // -------------------------------------------------------------------------

    /// Defensive reset after a failed posting; runs outside any
    /// transaction. Guarded on the current status so a reset racing a
    /// concurrent successful posting can never undo its Submitted flip.
    #[instrument(skip(self), fields(invoice_id = %invoice_id))]
    pub async fn reset_invoice_to_draft(&self, invoice_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE purchase_invoices
            SET status = 'Draft', posting_date = NULL
            WHERE invoice_id = $1 AND status = 'Draft'
            "#,
        )
        .bind(invoice_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to reset invoice: {}", e))
        })?;
        Ok(())
    }
}

#[async_trait]
impl PostingLookups for Database {
    async fn account(&self, number: &str) -> Result<Option<Account>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["fetch_account"])
            .start_timer();

        let account = sqlx::query_as::<_, Account>(
            r#"
            SELECT number, name, class, direct_posting, created_utc
            FROM accounts
            WHERE number = $1
            "#,
        )
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to fetch account: {}", e)))?;

        timer.observe_duration();

        Ok(account)
    }

    async fn account_defaults(&self) -> Result<Option<AccountDefaults>, AppError> {
        let defaults = sqlx::query_as::<_, AccountDefaults>(
            r#"
            SELECT overhead_cost_applied_account, purchase_account, payables_account
            FROM account_defaults
            "#,
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!("Failed to fetch account defaults: {}", e))
        })?;

        Ok(defaults)
    }

    async fn inventory_posting_group(
        &self,
        part_group_id: Uuid,
        location_id: Option<Uuid>,
    ) -> Result<Option<InventoryPostingGroup>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["fetch_inventory_posting_group"])
            .start_timer();

        let group = sqlx::query_as::<_, InventoryPostingGroup>(
            r#"
            SELECT id, part_group_id, location_id, inventory_account,
                   inventory_interim_accrual_account, inventory_invoiced_not_received_account,
                   direct_cost_applied_account, overhead_cost_applied_account,
                   purchase_variance_account
            FROM inventory_posting_groups
            WHERE part_group_id = $1 AND location_id IS NOT DISTINCT FROM $2
            "#,
        )
        .bind(part_group_id)
        .bind(location_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!(
                "Failed to fetch inventory posting group: {}",
                e
            ))
        })?;

        timer.observe_duration();

        Ok(group)
    }

    async fn purchasing_posting_group(
        &self,
        part_group_id: Uuid,
        supplier_type_id: Option<Uuid>,
    ) -> Result<Option<PurchasingPostingGroup>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["fetch_purchasing_posting_group"])
            .start_timer();

        let group = sqlx::query_as::<_, PurchasingPostingGroup>(
            r#"
            SELECT id, part_group_id, supplier_type_id, purchase_account, payables_account,
                   purchase_variance_account
            FROM purchasing_posting_groups
            WHERE part_group_id = $1 AND supplier_type_id IS NOT DISTINCT FROM $2
            "#,
        )
        .bind(part_group_id)
        .bind(supplier_type_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::DatabaseError(anyhow::anyhow!(
                "Failed to fetch purchasing posting group: {}",
                e
            ))
        })?;

        timer.observe_duration();

        Ok(group)
    }
}
