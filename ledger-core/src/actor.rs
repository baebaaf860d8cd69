//! Actor-based concurrency for the ledger
//!
//! All writes flow through one logical writer task, the single-writer
//! pattern: a balance check and the multi-leg insert it guards execute
//! inside the handling of one message, so concurrent spends from the same
//! account serialize instead of both passing a stale check. Approve/reject
//! transitions serialize the same way, so two reviewers cannot both win.
//!
//! Reads that do not guard a write go straight to storage (read-committed).

use crate::{
    balance,
    types::{AccountId, DepositStatus, ManualDeposit, Transaction, TransactionStatus},
    Currency, Error, Result, Storage,
};
use chrono::Utc;
use rust_decimal::Decimal;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Transition requested for a pending transaction
#[derive(Debug, Clone)]
pub enum TransitionAction {
    /// Finalize into `Completed`
    Approve,
    /// Finalize into `Rejected` with a reason
    Reject {
        /// Reason recorded on the row
        reason: String,
    },
}

/// Message sent to the ledger actor
pub enum LedgerMessage {
    /// Append a group of rows atomically
    Commit {
        /// Rows to append in one batch
        txns: Vec<Transaction>,
        /// Response channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Balance-guarded atomic append: verify the account can spend `spend`
    /// before the rows become visible
    CommitSpend {
        /// Account whose balance guards the batch
        account: AccountId,
        /// Amount the batch debits from the account
        spend: Decimal,
        /// Rows to append in one batch
        txns: Vec<Transaction>,
        /// Response channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Approve or reject a pending transaction
    Transition {
        /// Transaction ID
        id: Uuid,
        /// Requested transition
        action: TransitionAction,
        /// Response channel
        response: oneshot::Sender<Result<Transaction>>,
    },

    /// Store a new manual deposit submission
    SubmitDeposit {
        /// The submission
        deposit: ManualDeposit,
        /// Response channel
        response: oneshot::Sender<Result<()>>,
    },

    /// Approve a pending deposit, creating its wallet credit atomically
    ApproveDeposit {
        /// Deposit ID
        id: Uuid,
        /// Reviewer performing the transition
        reviewer: AccountId,
        /// Response channel
        response: oneshot::Sender<Result<(ManualDeposit, Transaction)>>,
    },

    /// Reject a pending deposit
    RejectDeposit {
        /// Deposit ID
        id: Uuid,
        /// Reviewer performing the transition
        reviewer: AccountId,
        /// Reason stored in the admin notes
        reason: String,
        /// Response channel
        response: oneshot::Sender<Result<ManualDeposit>>,
    },

    /// Shutdown actor
    Shutdown,
}

/// Actor that processes ledger messages
pub struct LedgerActor {
    /// Storage backend
    storage: Arc<Storage>,

    /// Mailbox for incoming messages
    mailbox: mpsc::Receiver<LedgerMessage>,

    /// Currency stamped onto deposit credits
    default_currency: Currency,
}

impl LedgerActor {
    /// Create new actor
    pub fn new(
        storage: Arc<Storage>,
        mailbox: mpsc::Receiver<LedgerMessage>,
        default_currency: Currency,
    ) -> Self {
        Self {
            storage,
            mailbox,
            default_currency,
        }
    }

    /// Run the actor event loop
    pub async fn run(mut self) {
        while let Some(msg) = self.mailbox.recv().await {
            match msg {
                LedgerMessage::Shutdown => break,
                other => self.handle_message(other),
            }
        }
    }

    /// Handle a single message
    fn handle_message(&mut self, msg: LedgerMessage) {
        match msg {
            LedgerMessage::Commit { txns, response } => {
                let _ = response.send(self.storage.append_transactions(&txns));
            }

            LedgerMessage::CommitSpend {
                account,
                spend,
                txns,
                response,
            } => {
                let _ = response.send(self.commit_spend(&account, spend, &txns));
            }

            LedgerMessage::Transition { id, action, response } => {
                let _ = response.send(self.transition(id, action));
            }

            LedgerMessage::SubmitDeposit { deposit, response } => {
                let _ = response.send(self.storage.put_deposit(&deposit));
            }

            LedgerMessage::ApproveDeposit { id, reviewer, response } => {
                let _ = response.send(self.approve_deposit(id, reviewer));
            }

            LedgerMessage::RejectDeposit {
                id,
                reviewer,
                reason,
                response,
            } => {
                let _ = response.send(self.reject_deposit(id, reviewer, reason));
            }

            LedgerMessage::Shutdown => {
                // Handled in main loop
            }
        }
    }

    /// Balance check and batch append in one serialized step
    fn commit_spend(
        &self,
        account: &AccountId,
        spend: Decimal,
        txns: &[Transaction],
    ) -> Result<()> {
        let history = self.storage.transactions_of(account)?;
        let available = balance::balance_of(history.iter());
        if available < spend {
            tracing::debug!(
                account = %account,
                %available,
                requested = %spend,
                "Guarded commit rejected"
            );
            return Err(Error::InsufficientBalance {
                available,
                requested: spend,
            });
        }

        self.storage.append_transactions(txns)
    }

    /// Approve or reject a pending transaction.
    ///
    /// Approving a debit-kind row re-checks the owner's balance so a pending
    /// withdrawal approved after the money has been spent fails instead of
    /// driving the balance negative.
    fn transition(&self, id: Uuid, action: TransitionAction) -> Result<Transaction> {
        let mut txn = self.storage.transaction(id)?;
        if txn.status != TransactionStatus::Pending {
            return Err(Error::AlreadyFinalized(format!(
                "transaction {} is {:?}",
                id, txn.status
            )));
        }

        let now = Utc::now();
        match action {
            TransitionAction::Approve => {
                if balance::is_account_debit(txn.kind) {
                    let history = self.storage.transactions_of(&txn.owner)?;
                    let available = balance::balance_of(history.iter());
                    if available < txn.amount {
                        return Err(Error::InsufficientBalance {
                            available,
                            requested: txn.amount,
                        });
                    }
                }
                txn.mark_completed(now);
            }
            TransitionAction::Reject { reason } => {
                txn.mark_rejected(reason, now);
            }
        }

        self.storage
            .update_transaction(TransactionStatus::Pending, &txn)?;

        tracing::info!(
            id = %txn.id,
            reference = %txn.reference,
            status = ?txn.status,
            "Transaction transitioned"
        );

        Ok(txn)
    }

    /// Approve a pending deposit and create its wallet credit in one batch
    fn approve_deposit(&self, id: Uuid, reviewer: AccountId) -> Result<(ManualDeposit, Transaction)> {
        let mut deposit = self.storage.deposit(id)?;
        if deposit.status != DepositStatus::Pending {
            return Err(Error::AlreadyFinalized(format!(
                "deposit {} is {:?}",
                id, deposit.status
            )));
        }

        let now = Utc::now();
        let credit = Transaction::new(
            deposit.owner.clone(),
            crate::types::TransactionKind::AddMoney,
            deposit.amount,
            self.default_currency,
            format!("Manual deposit by {}", deposit.depositor_name),
        )
        .with_metadata("deposit_id", deposit.id.to_string())
        .with_metadata("reviewed_by", reviewer.to_string())
        .completed();

        deposit.status = DepositStatus::Approved;
        deposit.reviewed_by = Some(reviewer);
        deposit.reviewed_at = Some(now);
        deposit.credited_transaction = Some(credit.id);

        self.storage.approve_deposit_atomic(&deposit, &credit)?;

        Ok((deposit, credit))
    }

    /// Reject a pending deposit, storing the reason; no ledger effect
    fn reject_deposit(
        &self,
        id: Uuid,
        reviewer: AccountId,
        reason: String,
    ) -> Result<ManualDeposit> {
        let mut deposit = self.storage.deposit(id)?;
        if deposit.status != DepositStatus::Pending {
            return Err(Error::AlreadyFinalized(format!(
                "deposit {} is {:?}",
                id, deposit.status
            )));
        }

        deposit.status = DepositStatus::Rejected;
        deposit.admin_notes = reason;
        deposit.reviewed_by = Some(reviewer);
        deposit.reviewed_at = Some(Utc::now());

        self.storage
            .update_deposit(DepositStatus::Pending, &deposit)?;

        tracing::info!(id = %deposit.id, "Manual deposit rejected");

        Ok(deposit)
    }
}

/// Handle for sending messages to the actor
#[derive(Clone)]
pub struct LedgerHandle {
    sender: mpsc::Sender<LedgerMessage>,
}

impl LedgerHandle {
    /// Create new handle
    pub fn new(sender: mpsc::Sender<LedgerMessage>) -> Self {
        Self { sender }
    }

    async fn send(&self, msg: LedgerMessage) -> Result<()> {
        self.sender
            .send(msg)
            .await
            .map_err(|_| Error::Concurrency("Actor mailbox closed".to_string()))
    }

    /// Append a group of rows atomically
    pub async fn commit(&self, txns: Vec<Transaction>) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(LedgerMessage::Commit { txns, response: tx }).await?;
        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Balance-guarded atomic append
    pub async fn commit_spend(
        &self,
        account: AccountId,
        spend: Decimal,
        txns: Vec<Transaction>,
    ) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(LedgerMessage::CommitSpend {
            account,
            spend,
            txns,
            response: tx,
        })
        .await?;
        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Approve or reject a pending transaction
    pub async fn transition(&self, id: Uuid, action: TransitionAction) -> Result<Transaction> {
        let (tx, rx) = oneshot::channel();
        self.send(LedgerMessage::Transition {
            id,
            action,
            response: tx,
        })
        .await?;
        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Store a new manual deposit submission
    pub async fn submit_deposit(&self, deposit: ManualDeposit) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.send(LedgerMessage::SubmitDeposit {
            deposit,
            response: tx,
        })
        .await?;
        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Approve a pending deposit
    pub async fn approve_deposit(
        &self,
        id: Uuid,
        reviewer: AccountId,
    ) -> Result<(ManualDeposit, Transaction)> {
        let (tx, rx) = oneshot::channel();
        self.send(LedgerMessage::ApproveDeposit {
            id,
            reviewer,
            response: tx,
        })
        .await?;
        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Reject a pending deposit
    pub async fn reject_deposit(
        &self,
        id: Uuid,
        reviewer: AccountId,
        reason: String,
    ) -> Result<ManualDeposit> {
        let (tx, rx) = oneshot::channel();
        self.send(LedgerMessage::RejectDeposit {
            id,
            reviewer,
            reason,
            response: tx,
        })
        .await?;
        rx.await
            .map_err(|_| Error::Concurrency("Response channel closed".to_string()))?
    }

    /// Shutdown actor
    pub async fn shutdown(&self) -> Result<()> {
        self.send(LedgerMessage::Shutdown).await
    }
}

/// Spawn the ledger actor
pub fn spawn_ledger_actor(storage: Arc<Storage>, default_currency: Currency) -> LedgerHandle {
    let (tx, rx) = mpsc::channel(1000); // Bounded channel for backpressure
    let actor = LedgerActor::new(storage, rx, default_currency);

    tokio::spawn(async move {
        actor.run().await;
    });

    LedgerHandle::new(tx)
}
