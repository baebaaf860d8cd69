//! Main ledger orchestration layer
//!
//! This module ties together storage, the balance engine and the
//! single-writer actor into a high-level API for wallet postings.
//!
//! # Example
//!
//! ```no_run
//! use ledger_core::{Config, Ledger};
//!
//! #[tokio::main]
//! async fn main() -> ledger_core::Result<()> {
//!     let config = Config::default();
//!     let ledger = Ledger::open(config)?;
//!
//!     let balance = ledger.balance_of(&ledger_core::AccountId::new("amina"))?;
//!     println!("balance: {}", balance);
//!
//!     Ok(())
//! }
//! ```

use crate::{
    actor::{spawn_ledger_actor, LedgerHandle, TransitionAction},
    balance,
    metrics::Metrics,
    types::{
        AccountId, DepositStatus, ManualDeposit, Transaction, TransactionReference,
        TransactionStatus,
    },
    Config, Error, Result, Storage,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

/// Bounded retries for reference regeneration on a uniqueness violation
const MAX_REFERENCE_RETRIES: usize = 3;

/// Main ledger interface
pub struct Ledger {
    /// Actor handle for serialized writes
    handle: LedgerHandle,

    /// Direct storage access (for reads)
    storage: Arc<Storage>,

    /// Metrics collector
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl Ledger {
    /// Open ledger with configuration
    pub fn open(config: Config) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config)?);
        let handle = spawn_ledger_actor(storage.clone(), config.default_currency);
        let metrics = Metrics::new().map_err(|e| Error::Other(e.to_string()))?;

        Ok(Self {
            handle,
            storage,
            metrics,
            config,
        })
    }

    /// Configuration in effect
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    // Write path

    /// Append a single transaction row
    pub async fn submit(&self, txn: Transaction) -> Result<Transaction> {
        let mut committed = self.commit(vec![txn]).await?;
        Ok(committed.pop().expect("commit returned the batch"))
    }

    /// Append a group of rows atomically.
    ///
    /// All rows become visible together or not at all. Colliding references
    /// are regenerated a bounded number of times before the violation
    /// surfaces.
    pub async fn commit(&self, txns: Vec<Transaction>) -> Result<Vec<Transaction>> {
        for txn in &txns {
            Self::validate(txn)?;
        }
        self.commit_with_retry(None, txns).await
    }

    /// Balance-guarded atomic append: the check that `account` can spend
    /// `spend` and the insert of every row happen inside one serialized
    /// unit of work.
    pub async fn commit_spend(
        &self,
        account: &AccountId,
        spend: Decimal,
        txns: Vec<Transaction>,
    ) -> Result<Vec<Transaction>> {
        if spend <= Decimal::ZERO {
            return Err(Error::InvalidAmount(format!(
                "spend must be positive, got {}",
                spend
            )));
        }
        for txn in &txns {
            Self::validate(txn)?;
        }
        self.commit_with_retry(Some((account.clone(), spend)), txns)
            .await
    }

    async fn commit_with_retry(
        &self,
        guard: Option<(AccountId, Decimal)>,
        mut txns: Vec<Transaction>,
    ) -> Result<Vec<Transaction>> {
        let timer = self.metrics.commit_duration.start_timer();

        for attempt in 0usize.. {
            let result = match &guard {
                Some((account, spend)) => {
                    self.handle
                        .commit_spend(account.clone(), *spend, txns.clone())
                        .await
                }
                None => self.handle.commit(txns.clone()).await,
            };

            match result {
                Ok(()) => {
                    timer.observe_duration();
                    self.metrics.postings_total.inc_by(txns.len() as u64);
                    return Ok(txns);
                }
                Err(Error::DuplicateReference(reference)) if attempt < MAX_REFERENCE_RETRIES => {
                    tracing::warn!(%reference, attempt, "Reference collision, regenerating");
                    self.regenerate_colliding_references(&mut txns)?;
                }
                Err(e) => {
                    if matches!(e, Error::InsufficientBalance { .. }) {
                        self.metrics.guard_rejections_total.inc();
                    }
                    return Err(e);
                }
            }
        }

        unreachable!("retry loop always returns")
    }

    /// Regenerate references that collide with stored rows or within the
    /// batch itself
    fn regenerate_colliding_references(&self, txns: &mut [Transaction]) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for txn in txns.iter_mut() {
            while self.storage.reference_exists(&txn.reference)?
                || !seen.insert(txn.reference.as_str().to_string())
            {
                txn.reference = TransactionReference::generate();
            }
        }
        Ok(())
    }

    fn validate(txn: &Transaction) -> Result<()> {
        if txn.amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(format!(
                "amount must be positive, got {}",
                txn.amount
            )));
        }
        Ok(())
    }

    // Moderation state machine

    /// Approve a pending transaction, finalizing it into `Completed`.
    ///
    /// Approving a debit-kind row re-checks the owner's balance; the row
    /// stays `Pending` and `InsufficientBalance` surfaces if the money has
    /// been spent since the request. Re-approving a terminal row fails with
    /// `AlreadyFinalized`.
    pub async fn approve(&self, id: Uuid) -> Result<Transaction> {
        let txn = self.handle.transition(id, TransitionAction::Approve).await?;
        self.metrics.transitions_total.inc();
        Ok(txn)
    }

    /// Reject a pending transaction, recording the reason.
    ///
    /// The reason is required. Re-rejecting a terminal row fails with
    /// `AlreadyFinalized` and never overwrites the stored reason.
    pub async fn reject(&self, id: Uuid, reason: &str) -> Result<Transaction> {
        if reason.trim().is_empty() {
            return Err(Error::Other("a rejection reason is required".to_string()));
        }
        let txn = self
            .handle
            .transition(
                id,
                TransitionAction::Reject {
                    reason: reason.to_string(),
                },
            )
            .await?;
        self.metrics.transitions_total.inc();
        Ok(txn)
    }

    // Manual deposits

    /// Store a new manual deposit submission (no ledger effect)
    pub async fn submit_deposit(&self, deposit: ManualDeposit) -> Result<ManualDeposit> {
        if deposit.amount <= Decimal::ZERO {
            return Err(Error::InvalidAmount(format!(
                "amount must be positive, got {}",
                deposit.amount
            )));
        }
        self.handle.submit_deposit(deposit.clone()).await?;
        Ok(deposit)
    }

    /// Approve a pending deposit: marks it approved and creates the
    /// `AddMoney` credit in one atomic batch. Both settle or neither does.
    pub async fn approve_deposit(
        &self,
        id: Uuid,
        reviewer: &AccountId,
    ) -> Result<(ManualDeposit, Transaction)> {
        let settled = self.handle.approve_deposit(id, reviewer.clone()).await?;
        self.metrics.transitions_total.inc();
        self.metrics.postings_total.inc();
        Ok(settled)
    }

    /// Reject a pending deposit, storing the reason; takes no ledger action
    pub async fn reject_deposit(
        &self,
        id: Uuid,
        reviewer: &AccountId,
        reason: &str,
    ) -> Result<ManualDeposit> {
        if reason.trim().is_empty() {
            return Err(Error::Other("a rejection reason is required".to_string()));
        }
        let deposit = self
            .handle
            .reject_deposit(id, reviewer.clone(), reason.to_string())
            .await?;
        self.metrics.transitions_total.inc();
        Ok(deposit)
    }

    // Read path (read-committed, straight from storage)

    /// Derive an account's available balance.
    ///
    /// Returns zero for an account with no completed rows.
    pub fn balance_of(&self, account: &AccountId) -> Result<Decimal> {
        let history = self.storage.transactions_of(account)?;
        Ok(balance::balance_of(history.iter()))
    }

    /// Derive the platform-wide balance
    pub fn platform_balance(&self) -> Result<Decimal> {
        let all = self.storage.all_transactions()?;
        Ok(balance::platform_balance(all.iter()))
    }

    /// Get transaction by ID
    pub fn transaction(&self, id: Uuid) -> Result<Transaction> {
        self.storage.transaction(id)
    }

    /// Look a transaction up by its unique reference
    pub fn find_by_reference(&self, reference: &TransactionReference) -> Result<Transaction> {
        self.storage.find_by_reference(reference)
    }

    /// Account history, newest first
    pub fn history(&self, account: &AccountId) -> Result<Vec<Transaction>> {
        let mut txns = self.storage.transactions_of(account)?;
        txns.reverse();
        Ok(txns)
    }

    /// All pending transactions, oldest first (review queue)
    pub fn pending_transactions(&self) -> Result<Vec<Transaction>> {
        self.storage
            .transactions_with_status(TransactionStatus::Pending)
    }

    /// Get deposit by ID
    pub fn deposit(&self, id: Uuid) -> Result<ManualDeposit> {
        self.storage.deposit(id)
    }

    /// Deposit submissions for an account, newest first
    pub fn deposits_of(&self, account: &AccountId) -> Result<Vec<ManualDeposit>> {
        let mut deposits = self.storage.deposits_of(account)?;
        deposits.reverse();
        Ok(deposits)
    }

    /// All pending deposits, oldest first (review queue)
    pub fn pending_deposits(&self) -> Result<Vec<ManualDeposit>> {
        self.storage.deposits_with_status(DepositStatus::Pending)
    }

    /// Shutdown ledger
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Currency, EvidenceRef, TransactionKind};
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn create_test_ledger() -> (Ledger, tempfile::TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_dir = temp_dir.path().to_path_buf();
        (Ledger::open(config).unwrap(), temp_dir)
    }

    fn seed_credit(owner: &str, amount: Decimal) -> Transaction {
        Transaction::new(
            AccountId::new(owner),
            TransactionKind::AddMoney,
            amount,
            Currency::NGN,
            "seed credit",
        )
        .completed()
    }

    #[tokio::test]
    async fn test_empty_balance_is_zero() {
        let (ledger, _temp) = create_test_ledger();
        assert_eq!(
            ledger.balance_of(&AccountId::new("nobody")).unwrap(),
            Decimal::ZERO
        );
        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_submit_and_balance() {
        let (ledger, _temp) = create_test_ledger();
        let amina = AccountId::new("amina");

        ledger.submit(seed_credit("amina", dec!(1000.00))).await.unwrap();
        assert_eq!(ledger.balance_of(&amina).unwrap(), dec!(1000.00));

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_non_positive_amount_rejected() {
        let (ledger, _temp) = create_test_ledger();

        let mut txn = seed_credit("amina", dec!(1.00));
        txn.amount = Decimal::ZERO;
        assert!(matches!(
            ledger.submit(txn).await,
            Err(Error::InvalidAmount(_))
        ));

        let mut txn = seed_credit("amina", dec!(1.00));
        txn.amount = dec!(-5.00);
        assert!(matches!(
            ledger.submit(txn).await,
            Err(Error::InvalidAmount(_))
        ));

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_reference_collision_regenerates() {
        let (ledger, _temp) = create_test_ledger();

        let first = ledger.submit(seed_credit("amina", dec!(10.00))).await.unwrap();

        let mut second = seed_credit("bayo", dec!(20.00));
        second.reference = first.reference.clone();
        let committed = ledger.submit(second).await.unwrap();

        assert_ne!(committed.reference, first.reference);
        assert_eq!(
            ledger.balance_of(&AccountId::new("bayo")).unwrap(),
            dec!(20.00)
        );

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_pending_rows_do_not_move_balance() {
        let (ledger, _temp) = create_test_ledger();
        let amina = AccountId::new("amina");

        ledger.submit(seed_credit("amina", dec!(1000.00))).await.unwrap();
        ledger
            .submit(Transaction::new(
                amina.clone(),
                TransactionKind::Withdraw,
                dec!(300.00),
                Currency::NGN,
                "withdrawal request",
            ))
            .await
            .unwrap();

        assert_eq!(ledger.balance_of(&amina).unwrap(), dec!(1000.00));

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_approve_completes_and_debits() {
        let (ledger, _temp) = create_test_ledger();
        let amina = AccountId::new("amina");

        ledger.submit(seed_credit("amina", dec!(1000.00))).await.unwrap();
        let withdrawal = ledger
            .submit(Transaction::new(
                amina.clone(),
                TransactionKind::Withdraw,
                dec!(300.00),
                Currency::NGN,
                "withdrawal request",
            ))
            .await
            .unwrap();

        let approved = ledger.approve(withdrawal.id).await.unwrap();
        assert_eq!(approved.status, TransactionStatus::Completed);
        assert!(approved.completed_at.is_some());
        assert_eq!(ledger.balance_of(&amina).unwrap(), dec!(700.00));

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_reject_twice_reports_already_finalized() {
        let (ledger, _temp) = create_test_ledger();

        ledger.submit(seed_credit("amina", dec!(1000.00))).await.unwrap();
        let withdrawal = ledger
            .submit(Transaction::new(
                AccountId::new("amina"),
                TransactionKind::Withdraw,
                dec!(300.00),
                Currency::NGN,
                "withdrawal request",
            ))
            .await
            .unwrap();

        let rejected = ledger.reject(withdrawal.id, "bank details missing").await.unwrap();
        assert_eq!(rejected.status, TransactionStatus::Rejected);

        let again = ledger.reject(withdrawal.id, "different reason").await;
        assert!(matches!(again, Err(Error::AlreadyFinalized(_))));

        // The first reason stands.
        let stored = ledger.transaction(withdrawal.id).unwrap();
        assert_eq!(
            stored.rejection_reason.as_deref(),
            Some("bank details missing")
        );

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_reject_requires_reason() {
        let (ledger, _temp) = create_test_ledger();

        let withdrawal = ledger
            .submit(Transaction::new(
                AccountId::new("amina"),
                TransactionKind::Withdraw,
                dec!(1.00),
                Currency::NGN,
                "withdrawal request",
            ))
            .await
            .unwrap();

        assert!(ledger.reject(withdrawal.id, "  ").await.is_err());

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_approve_debit_reguards_balance() {
        let (ledger, _temp) = create_test_ledger();
        let amina = AccountId::new("amina");

        ledger.submit(seed_credit("amina", dec!(100.00))).await.unwrap();
        let withdrawal = ledger
            .submit(Transaction::new(
                amina.clone(),
                TransactionKind::Withdraw,
                dec!(100.00),
                Currency::NGN,
                "withdrawal request",
            ))
            .await
            .unwrap();

        // Spend the balance before the withdrawal is reviewed.
        ledger
            .commit_spend(
                &amina,
                dec!(60.00),
                vec![Transaction::new(
                    amina.clone(),
                    TransactionKind::Transfer,
                    dec!(60.00),
                    Currency::NGN,
                    "transfer out",
                )
                .completed()],
            )
            .await
            .unwrap();

        let result = ledger.approve(withdrawal.id).await;
        assert!(matches!(result, Err(Error::InsufficientBalance { .. })));

        // The row stays pending and the balance never goes negative.
        let stored = ledger.transaction(withdrawal.id).unwrap();
        assert_eq!(stored.status, TransactionStatus::Pending);
        assert_eq!(ledger.balance_of(&amina).unwrap(), dec!(40.00));

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_deposit_approval_credits_atomically() {
        let (ledger, _temp) = create_test_ledger();
        let amina = AccountId::new("amina");
        let admin = AccountId::new("admin");

        let deposit = ledger
            .submit_deposit(ManualDeposit::new(
                amina.clone(),
                dec!(500.00),
                EvidenceRef::new("deposit_screenshots/proof.png"),
                "Amina O.",
                Utc::now(),
            ))
            .await
            .unwrap();

        assert_eq!(ledger.balance_of(&amina).unwrap(), Decimal::ZERO);

        let (settled, credit) = ledger.approve_deposit(deposit.id, &admin).await.unwrap();
        assert_eq!(settled.status, DepositStatus::Approved);
        assert_eq!(settled.credited_transaction, Some(credit.id));
        assert_eq!(settled.reviewed_by, Some(admin.clone()));
        assert_eq!(credit.kind, TransactionKind::AddMoney);
        assert_eq!(credit.amount, dec!(500.00));
        assert_eq!(ledger.balance_of(&amina).unwrap(), dec!(500.00));

        // Second approval is a reported no-op and credits nothing.
        let again = ledger.approve_deposit(deposit.id, &admin).await;
        assert!(matches!(again, Err(Error::AlreadyFinalized(_))));
        assert_eq!(ledger.balance_of(&amina).unwrap(), dec!(500.00));

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_deposit_rejection_has_no_ledger_effect() {
        let (ledger, _temp) = create_test_ledger();
        let amina = AccountId::new("amina");
        let admin = AccountId::new("admin");

        let deposit = ledger
            .submit_deposit(ManualDeposit::new(
                amina.clone(),
                dec!(500.00),
                EvidenceRef::new("deposit_screenshots/proof.png"),
                "Amina O.",
                Utc::now(),
            ))
            .await
            .unwrap();

        let rejected = ledger
            .reject_deposit(deposit.id, &admin, "screenshot unreadable")
            .await
            .unwrap();
        assert_eq!(rejected.status, DepositStatus::Rejected);
        assert_eq!(rejected.admin_notes, "screenshot unreadable");
        assert_eq!(ledger.balance_of(&amina).unwrap(), Decimal::ZERO);
        assert!(ledger.history(&amina).unwrap().is_empty());

        ledger.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_platform_balance() {
        let (ledger, _temp) = create_test_ledger();

        ledger.submit(seed_credit("amina", dec!(1000.00))).await.unwrap();
        ledger
            .submit(
                Transaction::new(
                    AccountId::new("platform.fees"),
                    TransactionKind::AdminFee,
                    dec!(25.00),
                    Currency::NGN,
                    "transfer fee",
                )
                .completed(),
            )
            .await
            .unwrap();

        assert_eq!(ledger.platform_balance().unwrap(), dec!(1025.00));

        ledger.shutdown().await.unwrap();
    }
}
