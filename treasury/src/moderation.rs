//! Reviewer-facing moderation API
//!
//! A `Moderator` wraps the ledger's state machine with a reviewer identity.
//! Transitions are per-id and explicit; there is no batch path. The ledger
//! serializes transitions, so two reviewers racing on the same row produce
//! exactly one winner and one reported no-op failure.

use crate::Result;
use ledger_core::{AccountId, Ledger, ManualDeposit, Transaction};
use std::sync::Arc;
use uuid::Uuid;

/// A trusted actor authorized to settle pending rows
pub struct Moderator {
    ledger: Arc<Ledger>,
    reviewer: AccountId,
}

impl Moderator {
    /// Create a moderator acting as `reviewer`
    pub fn new(ledger: Arc<Ledger>, reviewer: AccountId) -> Self {
        Self { ledger, reviewer }
    }

    /// Reviewer identity
    pub fn reviewer(&self) -> &AccountId {
        &self.reviewer
    }

    /// Approve a pending transaction, finalizing it into `Completed`.
    ///
    /// Fails with `AlreadyFinalized` on a terminal row and with
    /// `InsufficientBalance` when a debit-kind row no longer has cover.
    pub async fn approve(&self, id: Uuid) -> Result<Transaction> {
        let txn = self.ledger.approve(id).await?;
        tracing::info!(reviewer = %self.reviewer, id = %txn.id, "Transaction approved");
        Ok(txn)
    }

    /// Reject a pending transaction with a reason.
    ///
    /// The stored reason is never overwritten by later attempts.
    pub async fn reject(&self, id: Uuid, reason: &str) -> Result<Transaction> {
        let txn = self.ledger.reject(id, reason).await?;
        tracing::info!(reviewer = %self.reviewer, id = %txn.id, "Transaction rejected");
        Ok(txn)
    }

    /// Approve a pending manual deposit.
    ///
    /// The deposit flips to approved and the `AddMoney` credit is created in
    /// the same atomic unit; either both settle or neither does.
    pub async fn approve_deposit(&self, id: Uuid) -> Result<(ManualDeposit, Transaction)> {
        let (deposit, credit) = self.ledger.approve_deposit(id, &self.reviewer).await?;
        tracing::info!(
            reviewer = %self.reviewer,
            deposit_id = %deposit.id,
            credit_reference = %credit.reference,
            "Manual deposit approved"
        );
        Ok((deposit, credit))
    }

    /// Reject a pending manual deposit with a reason; no ledger action
    pub async fn reject_deposit(&self, id: Uuid, reason: &str) -> Result<ManualDeposit> {
        let deposit = self.ledger.reject_deposit(id, &self.reviewer, reason).await?;
        tracing::info!(reviewer = %self.reviewer, deposit_id = %deposit.id, "Manual deposit rejected");
        Ok(deposit)
    }

    /// Pending transactions awaiting review, oldest first
    pub fn pending_transactions(&self) -> Result<Vec<Transaction>> {
        Ok(self.ledger.pending_transactions()?)
    }

    /// Pending deposits awaiting review, oldest first
    pub fn pending_deposits(&self) -> Result<Vec<ManualDeposit>> {
        Ok(self.ledger.pending_deposits()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::{Config, Currency, DepositStatus, EvidenceRef, TransactionKind};
    use rust_decimal_macros::dec;

    fn test_ledger() -> (Arc<Ledger>, tempfile::TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (Arc::new(Ledger::open(config).unwrap()), temp_dir)
    }

    #[tokio::test]
    async fn test_moderator_settles_review_queue() {
        let (ledger, _temp) = test_ledger();
        let moderator = Moderator::new(ledger.clone(), AccountId::new("admin"));
        let amina = AccountId::new("amina");

        let deposit = ledger
            .submit_deposit(ledger_core::ManualDeposit::new(
                amina.clone(),
                dec!(500.00),
                EvidenceRef::new("deposit_screenshots/proof.png"),
                "Amina O.",
                chrono::Utc::now(),
            ))
            .await
            .unwrap();
        assert_eq!(moderator.pending_deposits().unwrap().len(), 1);

        let (settled, credit) = moderator.approve_deposit(deposit.id).await.unwrap();
        assert_eq!(settled.status, DepositStatus::Approved);
        assert_eq!(settled.reviewed_by, Some(AccountId::new("admin")));
        assert_eq!(credit.amount, dec!(500.00));
        assert!(moderator.pending_deposits().unwrap().is_empty());

        let withdrawal = ledger
            .submit(ledger_core::Transaction::new(
                amina.clone(),
                TransactionKind::Withdraw,
                dec!(200.00),
                Currency::NGN,
                "Withdrawal request",
            ))
            .await
            .unwrap();
        assert_eq!(moderator.pending_transactions().unwrap().len(), 1);

        moderator.approve(withdrawal.id).await.unwrap();
        assert!(moderator.pending_transactions().unwrap().is_empty());
        assert_eq!(ledger.balance_of(&amina).unwrap(), dec!(300.00));
    }
}
