//! General-ledger account model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::posting::ledger::NormalBalance;

/// Account classes following standard accounting categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountClass {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

impl AccountClass {
    /// Get string representation for database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Liability => "liability",
            Self::Equity => "equity",
            Self::Revenue => "revenue",
            Self::Expense => "expense",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "asset" => Some(Self::Asset),
            "liability" => Some(Self::Liability),
            "equity" => Some(Self::Equity),
            "revenue" => Some(Self::Revenue),
            "expense" => Some(Self::Expense),
            _ => None,
        }
    }

    /// The side an account of this class grows on. Derived from the class
    /// itself so callers never have to assert it.
    pub fn normal_balance(self) -> NormalBalance {
        match self {
            Self::Asset | Self::Expense => NormalBalance::Debit,
            Self::Liability | Self::Equity | Self::Revenue => NormalBalance::Credit,
        }
    }
}

impl std::fmt::Display for AccountClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// General-ledger account.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Account {
    pub number: String,
    pub name: String,
    pub class: String,
    pub direct_posting: bool,
    pub created_utc: DateTime<Utc>,
}

impl Account {
    /// Get parsed account class.
    pub fn parsed_class(&self) -> Option<AccountClass> {
        AccountClass::from_str(&self.class)
    }
}

/// Company-level default accounts used when an invoice line posts straight
/// to the general ledger (no part, hence no posting group).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AccountDefaults {
    pub overhead_cost_applied_account: String,
    pub purchase_account: String,
    pub payables_account: String,
}
