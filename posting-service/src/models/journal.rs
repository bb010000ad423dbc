//! Journal and journal-line models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Entry direction (debit or credit).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Debit,
    Credit,
}

impl Direction {
    /// Get string representation for database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debit => "debit",
            Self::Credit => "credit",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "debit" => Some(Self::Debit),
            "credit" => Some(Self::Credit),
            _ => None,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which document a journal line points back to. Stored as two real
/// columns (`document_ref_kind`, `document_ref_line_id`) rather than a
/// parseable string key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DocumentRefKind {
    /// Receipt accrual tag; the reversal finder queries on this kind.
    Receipt,
    /// Line produced by posting a purchase invoice.
    PurchaseInvoice,
}

impl DocumentRefKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Receipt => "receipt",
            Self::PurchaseInvoice => "purchase-invoice",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "receipt" => Some(Self::Receipt),
            "purchase-invoice" => Some(Self::PurchaseInvoice),
            _ => None,
        }
    }
}

/// Typed link from a journal line back to the purchase-order line it
/// originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    pub kind: DocumentRefKind,
    pub order_line_id: Uuid,
}

impl DocumentRef {
    pub fn receipt(order_line_id: Uuid) -> Self {
        Self {
            kind: DocumentRefKind::Receipt,
            order_line_id,
        }
    }

    pub fn purchase_invoice(order_line_id: Uuid) -> Self {
        Self {
            kind: DocumentRefKind::PurchaseInvoice,
            order_line_id,
        }
    }
}

/// Posted journal line.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct JournalLine {
    pub journal_line_id: Uuid,
    pub journal_id: Uuid,
    pub entry_number: i64,
    pub account_number: String,
    pub direction: String,
    pub amount: Decimal,
    pub quantity: Decimal,
    pub line_group: Uuid,
    pub document_ref_kind: Option<String>,
    pub document_ref_line_id: Option<Uuid>,
    pub accrual: bool,
    pub description: Option<String>,
    pub created_utc: DateTime<Utc>,
}

impl JournalLine {
    /// Get parsed direction.
    pub fn parsed_direction(&self) -> Option<Direction> {
        Direction::from_str(&self.direction)
    }

    /// Get signed amount (positive for debit, negative for credit).
    pub fn signed_amount(&self) -> Decimal {
        match self.parsed_direction() {
            Some(Direction::Debit) => self.amount,
            Some(Direction::Credit) => -self.amount,
            None => Decimal::ZERO,
        }
    }
}

/// Pending journal line computed by the posting-line builder; inserted by
/// the committer once the journal header exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalLineInsert {
    pub account_number: String,
    pub direction: Direction,
    pub amount: Decimal,
    pub quantity: Decimal,
    pub line_group: Uuid,
    pub document_ref: Option<DocumentRef>,
    pub accrual: bool,
    pub description: Option<String>,
}

impl JournalLineInsert {
    /// Get signed amount (positive for debit, negative for credit).
    pub fn signed_amount(&self) -> Decimal {
        match self.direction {
            Direction::Debit => self.amount,
            Direction::Credit => -self.amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_strings_round_trip() {
        for direction in [Direction::Debit, Direction::Credit] {
            assert_eq!(Direction::from_str(direction.as_str()), Some(direction));
        }
        assert_eq!(Direction::from_str("sideways"), None);
    }

    #[test]
    fn document_ref_kinds_round_trip() {
        for kind in [DocumentRefKind::Receipt, DocumentRefKind::PurchaseInvoice] {
            assert_eq!(DocumentRefKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(DocumentRefKind::from_str("credit-memo"), None);
    }

    #[test]
    fn document_ref_constructors_carry_the_kind() {
        let order_line_id = Uuid::new_v4();
        assert_eq!(
            DocumentRef::receipt(order_line_id).kind,
            DocumentRefKind::Receipt
        );
        assert_eq!(
            DocumentRef::purchase_invoice(order_line_id).kind,
            DocumentRefKind::PurchaseInvoice
        );
    }
}
