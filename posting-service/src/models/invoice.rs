//! Purchase-invoice models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Purchase-invoice status. Transitions are one-way except for the
/// defensive rollback to Draft when a posting fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvoiceStatus {
    Draft,
    Submitted,
    Paid,
    Voided,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "Draft",
            Self::Submitted => "Submitted",
            Self::Paid => "Paid",
            Self::Voided => "Voided",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "Submitted" => Self::Submitted,
            "Paid" => Self::Paid,
            "Voided" => Self::Voided,
            _ => Self::Draft,
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Invoice line type. Anything outside this set is rejected before any
/// writes happen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineType {
    GlAccount,
    Part,
    Service,
    FixedAsset,
    Comment,
}

impl LineType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GlAccount => "G/L Account",
            Self::Part => "Part",
            Self::Service => "Service",
            Self::FixedAsset => "Fixed Asset",
            Self::Comment => "Comment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "G/L Account" => Some(Self::GlAccount),
            "Part" => Some(Self::Part),
            "Service" => Some(Self::Service),
            "Fixed Asset" => Some(Self::FixedAsset),
            "Comment" => Some(Self::Comment),
            _ => None,
        }
    }
}

/// Purchase invoice header.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PurchaseInvoice {
    pub invoice_id: Uuid,
    pub invoice_number: Option<String>,
    pub supplier_id: Uuid,
    pub status: String,
    pub currency_code: String,
    pub exchange_rate: Decimal,
    pub subtotal: Decimal,
    pub total: Decimal,
    pub posting_date: Option<NaiveDate>,
    pub created_utc: DateTime<Utc>,
}

impl PurchaseInvoice {
    pub fn parsed_status(&self) -> InvoiceStatus {
        InvoiceStatus::from_string(&self.status)
    }
}

/// Purchase invoice line.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PurchaseInvoiceLine {
    pub invoice_line_id: Uuid,
    pub invoice_id: Uuid,
    pub line_type: String,
    pub part_id: Option<Uuid>,
    pub service_id: Option<Uuid>,
    pub asset_id: Option<Uuid>,
    pub account_number: Option<String>,
    pub order_line_id: Option<Uuid>,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub location_id: Option<Uuid>,
    pub shelf_id: Option<String>,
    pub description: Option<String>,
}

impl PurchaseInvoiceLine {
    pub fn parsed_line_type(&self) -> Option<LineType> {
        LineType::from_str(&self.line_type)
    }

    /// Extended amount for this line at the invoice's unit price.
    pub fn extended_amount(&self) -> Decimal {
        (self.quantity * self.unit_price).round_dp(2)
    }
}

/// Supplier reference data; only the type matters to posting-group lookup.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Supplier {
    pub supplier_id: Uuid,
    pub name: String,
    pub supplier_type_id: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
}
