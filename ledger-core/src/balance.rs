//! Balance derivation
//!
//! Balances are never stored. They are recomputed on demand from the
//! transaction history, which is the system's consistency anchor:
//!
//! - account balance = Σ completed credits − Σ completed debits, where
//!   credits are `{AddMoney, Sale, Commission}` and debits are
//!   `{Withdraw, Transfer, AdminFee}`
//! - platform balance counts `{AddMoney, AdminFee}` as credits and
//!   `{Withdraw}` as debits; transfer/sale/commission rows are zero-sum or
//!   externally settled from the platform's own perspective
//!
//! Only `Completed` rows participate. Pending and rejected rows never
//! affect any balance.

use crate::types::{Transaction, TransactionKind, TransactionStatus};
use rust_decimal::Decimal;

/// Kinds that credit the owning account
pub fn is_account_credit(kind: TransactionKind) -> bool {
    matches!(
        kind,
        TransactionKind::AddMoney | TransactionKind::Sale | TransactionKind::Commission
    )
}

/// Kinds that debit the owning account
pub fn is_account_debit(kind: TransactionKind) -> bool {
    matches!(
        kind,
        TransactionKind::Withdraw | TransactionKind::Transfer | TransactionKind::AdminFee
    )
}

/// Derive an account balance from that account's transaction rows.
///
/// The caller supplies rows belonging to a single account; rows that are
/// not `Completed` are ignored. Returns zero for an empty history.
pub fn balance_of<'a, I>(transactions: I) -> Decimal
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut credits = Decimal::ZERO;
    let mut debits = Decimal::ZERO;

    for txn in transactions {
        if txn.status != TransactionStatus::Completed {
            continue;
        }
        if is_account_credit(txn.kind) {
            credits += txn.amount;
        } else if is_account_debit(txn.kind) {
            debits += txn.amount;
        }
    }

    credits - debits
}

/// Derive the platform-wide balance from all transaction rows.
pub fn platform_balance<'a, I>(transactions: I) -> Decimal
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let mut credits = Decimal::ZERO;
    let mut debits = Decimal::ZERO;

    for txn in transactions {
        if txn.status != TransactionStatus::Completed {
            continue;
        }
        match txn.kind {
            TransactionKind::AddMoney | TransactionKind::AdminFee => credits += txn.amount,
            TransactionKind::Withdraw => debits += txn.amount,
            _ => {}
        }
    }

    credits - debits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountId, Currency};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn txn(kind: TransactionKind, amount: Decimal, status: TransactionStatus) -> Transaction {
        let mut t = Transaction::new(
            AccountId::new("amina"),
            kind,
            amount,
            Currency::NGN,
            "test row",
        );
        match status {
            TransactionStatus::Pending => {}
            TransactionStatus::Completed => t.mark_completed(Utc::now()),
            TransactionStatus::Rejected => t.mark_rejected("no", Utc::now()),
        }
        t
    }

    #[test]
    fn test_empty_history_is_zero() {
        assert_eq!(balance_of([].iter()), Decimal::ZERO);
        assert_eq!(platform_balance([].iter()), Decimal::ZERO);
    }

    #[test]
    fn test_credit_debit_partition() {
        let rows = vec![
            txn(TransactionKind::AddMoney, dec!(1000.00), TransactionStatus::Completed),
            txn(TransactionKind::Sale, dec!(200.00), TransactionStatus::Completed),
            txn(TransactionKind::Commission, dec!(50.00), TransactionStatus::Completed),
            txn(TransactionKind::Withdraw, dec!(300.00), TransactionStatus::Completed),
            txn(TransactionKind::Transfer, dec!(100.00), TransactionStatus::Completed),
            txn(TransactionKind::AdminFee, dec!(5.00), TransactionStatus::Completed),
        ];
        assert_eq!(balance_of(rows.iter()), dec!(845.00));
    }

    #[test]
    fn test_pending_and_rejected_never_count() {
        let rows = vec![
            txn(TransactionKind::AddMoney, dec!(1000.00), TransactionStatus::Completed),
            txn(TransactionKind::Withdraw, dec!(999.00), TransactionStatus::Pending),
            txn(TransactionKind::AddMoney, dec!(500.00), TransactionStatus::Rejected),
            txn(TransactionKind::Transfer, dec!(400.00), TransactionStatus::Rejected),
        ];
        assert_eq!(balance_of(rows.iter()), dec!(1000.00));
    }

    #[test]
    fn test_platform_balance_kind_filter() {
        let rows = vec![
            txn(TransactionKind::AddMoney, dec!(1000.00), TransactionStatus::Completed),
            txn(TransactionKind::AdminFee, dec!(25.00), TransactionStatus::Completed),
            txn(TransactionKind::Withdraw, dec!(300.00), TransactionStatus::Completed),
            // Zero-sum / externally settled kinds are excluded.
            txn(TransactionKind::Transfer, dec!(5000.00), TransactionStatus::Completed),
            txn(TransactionKind::Sale, dec!(800.00), TransactionStatus::Completed),
            txn(TransactionKind::Commission, dec!(80.00), TransactionStatus::Completed),
        ];
        assert_eq!(platform_balance(rows.iter()), dec!(725.00));
    }
}
