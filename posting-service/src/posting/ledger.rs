//! Ledger sign primitives.
//!
//! Journal lines are stored as a direction plus a positive amount; the
//! signed view (debit positive, credit negative) makes every balanced
//! line group sum to zero. Balance-relative math goes through
//! [`debit`]/[`credit`], which take the account's normal balance derived
//! from its class rather than trusting the caller to supply it.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{Direction, DocumentRef, JournalLineInsert};

/// Which side an account grows on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalBalance {
    Debit,
    Credit,
}

/// Balance impact of debiting `amount` against an account with the given
/// normal balance: positive when the debit moves the account toward its
/// normal side.
pub fn debit(balance: NormalBalance, amount: Decimal) -> Decimal {
    match balance {
        NormalBalance::Debit => amount,
        NormalBalance::Credit => -amount,
    }
}

/// Balance impact of crediting `amount`; the mirror of [`debit`].
pub fn credit(balance: NormalBalance, amount: Decimal) -> Decimal {
    -debit(balance, amount)
}

/// Build one balanced two-line journal group: debit one account, credit
/// the other, same amount and quantity, sharing a fresh line group id.
pub fn entry_pair(
    debit_account: &str,
    credit_account: &str,
    amount: Decimal,
    quantity: Decimal,
    document_ref: Option<DocumentRef>,
    accrual: bool,
    description: Option<&str>,
) -> [JournalLineInsert; 2] {
    let line_group = Uuid::new_v4();
    [
        JournalLineInsert {
            account_number: debit_account.to_string(),
            direction: Direction::Debit,
            amount,
            quantity,
            line_group,
            document_ref,
            accrual,
            description: description.map(str::to_string),
        },
        JournalLineInsert {
            account_number: credit_account.to_string(),
            direction: Direction::Credit,
            amount,
            quantity,
            line_group,
            document_ref,
            accrual,
            description: description.map(str::to_string),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AccountClass;
    use rust_decimal_macros::dec;

    #[test]
    fn debit_normal_classes_sign_positive_on_debit() {
        assert_eq!(debit(NormalBalance::Debit, dec!(100)), dec!(100));
        assert_eq!(credit(NormalBalance::Debit, dec!(100)), dec!(-100));
    }

    #[test]
    fn credit_normal_classes_flip_signs() {
        assert_eq!(debit(NormalBalance::Credit, dec!(100)), dec!(-100));
        assert_eq!(credit(NormalBalance::Credit, dec!(100)), dec!(100));
    }

    #[test]
    fn normal_balance_derives_from_account_class() {
        assert_eq!(AccountClass::Asset.normal_balance(), NormalBalance::Debit);
        assert_eq!(AccountClass::Expense.normal_balance(), NormalBalance::Debit);
        assert_eq!(
            AccountClass::Liability.normal_balance(),
            NormalBalance::Credit
        );
        assert_eq!(AccountClass::Equity.normal_balance(), NormalBalance::Credit);
        assert_eq!(
            AccountClass::Revenue.normal_balance(),
            NormalBalance::Credit
        );
    }

    #[test]
    fn entry_pair_is_balanced_and_grouped() {
        let [d, c] = entry_pair("12000", "25000", dec!(50), dec!(10), None, false, None);
        assert_eq!(d.line_group, c.line_group);
        assert_eq!(d.signed_amount() + c.signed_amount(), Decimal::ZERO);
        assert_eq!(d.direction, Direction::Debit);
        assert_eq!(c.direction, Direction::Credit);
    }
}
