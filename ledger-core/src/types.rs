//! Core types for the wallet ledger
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Exact arithmetic (Decimal for money)
//! - Append-mostly storage: rows are created once and only their status
//!   ever changes, through the moderation state machine

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Account identifier (platform user or system account)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Create new account ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ISO 4217 currency code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[non_exhaustive]
pub enum Currency {
    /// Nigerian Naira (platform default)
    NGN,
    /// US Dollar
    USD,
    /// Euro
    EUR,
    /// British Pound
    GBP,
}

impl Currency {
    /// ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::NGN => "NGN",
            Currency::USD => "USD",
            Currency::EUR => "EUR",
            Currency::GBP => "GBP",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "NGN" => Some(Currency::NGN),
            "USD" => Some(Currency::USD),
            "EUR" => Some(Currency::EUR),
            "GBP" => Some(Currency::GBP),
            _ => None,
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::NGN
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Payment method identifier (reference data, owned by the treasury layer)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodId(String);

impl MethodId {
    /// Create new method ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to an uploaded proof-of-payment image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRef(String);

impl EvidenceRef {
    /// Create new evidence reference
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Globally unique transaction reference
///
/// Generated once at creation and immutable thereafter. The generator is
/// collision-resistant (random UUID payload); the store still enforces
/// uniqueness as a backstop.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionReference(String);

impl TransactionReference {
    /// Generate a fresh reference
    pub fn generate() -> Self {
        Self(format!(
            "TXN-{}",
            Uuid::new_v4().simple().to_string().to_uppercase()
        ))
    }

    /// Wrap an existing reference string
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction kind
///
/// Sign/direction is implied by the kind, never by a negative amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransactionKind {
    /// Wallet funding (deposit credit)
    AddMoney = 1,
    /// Withdrawal to an external account
    Withdraw = 2,
    /// Peer-to-peer transfer leg (debit for the sender, credit for the recipient)
    Transfer = 3,
    /// Marketplace sale proceeds
    Sale = 4,
    /// Affiliate commission
    Commission = 5,
    /// Platform fee
    AdminFee = 6,
}

impl TransactionKind {
    /// Stable code used in audit metadata and logs
    pub fn code(&self) -> &'static str {
        match self {
            TransactionKind::AddMoney => "add_money",
            TransactionKind::Withdraw => "withdraw",
            TransactionKind::Transfer => "transfer",
            TransactionKind::Sale => "sale",
            TransactionKind::Commission => "commission",
            TransactionKind::AdminFee => "admin_fee",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Transaction status
///
/// `Completed` is the single balance-affecting terminal status; `Rejected`
/// is the other terminal. Pending rows never affect balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TransactionStatus {
    /// Awaiting review
    Pending = 1,
    /// Rejected by a reviewer (terminal)
    Rejected = 2,
    /// Money has moved (terminal)
    Completed = 3,
}

impl TransactionStatus {
    /// Check if no further transition is permitted
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Rejected | TransactionStatus::Completed
        )
    }
}

/// A single ledger row
///
/// Immutable once terminal; the only permitted mutation is the
/// `Pending -> {Completed, Rejected}` transition performed by the
/// moderation state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique row ID (UUIDv7 for time-ordering)
    pub id: Uuid,

    /// Owning account
    pub owner: AccountId,

    /// Transaction kind
    pub kind: TransactionKind,

    /// Amount (exact decimal, always > 0)
    pub amount: Decimal,

    /// Currency
    pub currency: Currency,

    /// Status
    pub status: TransactionStatus,

    /// Payment method used, if any
    pub payment_method: Option<MethodId>,

    /// Globally unique reference
    pub reference: TransactionReference,

    /// Human-readable description
    pub description: String,

    /// Audit metadata (`admin_fee`, `net_amount`, `recipient`, ...).
    /// Never consulted by balance computation.
    #[serde(default)]
    pub metadata: HashMap<String, String>,

    /// Reason recorded on rejection
    pub rejection_reason: Option<String>,

    /// Creation timestamp (immutable)
    pub created_at: DateTime<Utc>,

    /// Last update timestamp (monotonic non-decreasing)
    pub updated_at: DateTime<Utc>,

    /// Set exactly once, on transition into `Completed`
    pub completed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Create a new `Pending` transaction with a fresh id and reference
    pub fn new(
        owner: AccountId,
        kind: TransactionKind,
        amount: Decimal,
        currency: Currency,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            owner,
            kind,
            amount,
            currency,
            status: TransactionStatus::Pending,
            payment_method: None,
            reference: TransactionReference::generate(),
            description: description.into(),
            metadata: HashMap::new(),
            rejection_reason: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Finalize at creation time (system-generated legs of a transfer,
    /// deposit credits). Sets `Completed` and stamps `completed_at`.
    pub fn completed(mut self) -> Self {
        self.status = TransactionStatus::Completed;
        self.completed_at = Some(self.created_at);
        self
    }

    /// Attach a metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Attach the payment method
    pub fn with_payment_method(mut self, method: MethodId) -> Self {
        self.payment_method = Some(method);
        self
    }

    /// Check if no further transition is permitted
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Transition into `Completed`, stamping `completed_at` exactly once.
    ///
    /// Callers must have verified the row is `Pending`.
    pub fn mark_completed(&mut self, now: DateTime<Utc>) {
        self.status = TransactionStatus::Completed;
        if self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
        self.touch(now);
    }

    /// Transition into `Rejected`, recording the reason.
    ///
    /// Callers must have verified the row is `Pending`.
    pub fn mark_rejected(&mut self, reason: impl Into<String>, now: DateTime<Utc>) {
        self.status = TransactionStatus::Rejected;
        self.rejection_reason = Some(reason.into());
        self.touch(now);
    }

    /// Advance `updated_at`, keeping it monotonic non-decreasing
    fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.updated_at {
            self.updated_at = now;
        }
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} - {} {}",
            self.owner, self.kind, self.currency, self.amount
        )
    }
}

/// Manual deposit review status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum DepositStatus {
    /// Awaiting review
    Pending = 1,
    /// Accepted; the wallet credit lives in the linked transaction
    Approved = 2,
    /// Rejected by a reviewer
    Rejected = 3,
}

impl DepositStatus {
    /// Check if no further transition is permitted
    pub fn is_terminal(&self) -> bool {
        matches!(self, DepositStatus::Approved | DepositStatus::Rejected)
    }
}

/// Proof-of-payment submission for a manual bank transfer
///
/// Has no ledger effect until approved; approval atomically creates the
/// linked `AddMoney` transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManualDeposit {
    /// Unique row ID (UUIDv7)
    pub id: Uuid,

    /// Depositing account
    pub owner: AccountId,

    /// Claimed amount
    pub amount: Decimal,

    /// Uploaded proof-of-payment reference
    pub evidence: EvidenceRef,

    /// Name of the person who made the bank deposit
    pub depositor_name: String,

    /// Claimed date and time of the bank deposit
    pub deposited_at: DateTime<Utc>,

    /// Review status
    pub status: DepositStatus,

    /// Reviewer notes; rejection reasons land here
    pub admin_notes: String,

    /// Reviewer who settled the submission
    pub reviewed_by: Option<AccountId>,

    /// When the submission was settled
    pub reviewed_at: Option<DateTime<Utc>>,

    /// Submission timestamp
    pub created_at: DateTime<Utc>,

    /// Audit link to the `AddMoney` transaction created on approval
    pub credited_transaction: Option<Uuid>,
}

impl ManualDeposit {
    /// Create a new pending submission
    pub fn new(
        owner: AccountId,
        amount: Decimal,
        evidence: EvidenceRef,
        depositor_name: impl Into<String>,
        deposited_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            owner,
            amount,
            evidence,
            depositor_name: depositor_name.into(),
            deposited_at,
            status: DepositStatus::Pending,
            admin_notes: String::new(),
            reviewed_by: None,
            reviewed_at: None,
            created_at: Utc::now(),
            credited_transaction: None,
        }
    }
}

impl fmt::Display for ManualDeposit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "manual deposit - {} - {}", self.owner, self.amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_currency_from_str() {
        assert_eq!(Currency::from_str("NGN"), Some(Currency::NGN));
        assert_eq!(Currency::from_str("USD"), Some(Currency::USD));
        assert_eq!(Currency::from_str("INVALID"), None);
    }

    #[test]
    fn test_reference_shape() {
        let r = TransactionReference::generate();
        assert!(r.as_str().starts_with("TXN-"));
        assert_eq!(r.as_str().len(), 4 + 32);
        assert_ne!(r, TransactionReference::generate());
    }

    #[test]
    fn test_status_terminal() {
        assert!(!TransactionStatus::Pending.is_terminal());
        assert!(TransactionStatus::Rejected.is_terminal());
        assert!(TransactionStatus::Completed.is_terminal());
    }

    #[test]
    fn test_new_transaction_is_pending() {
        let txn = Transaction::new(
            AccountId::new("amina"),
            TransactionKind::Withdraw,
            dec!(250.00),
            Currency::NGN,
            "Withdrawal request",
        );
        assert_eq!(txn.status, TransactionStatus::Pending);
        assert!(txn.completed_at.is_none());
        assert_eq!(txn.created_at, txn.updated_at);
    }

    #[test]
    fn test_completed_constructor_stamps_once() {
        let txn = Transaction::new(
            AccountId::new("amina"),
            TransactionKind::AddMoney,
            dec!(1000.00),
            Currency::NGN,
            "Deposit credit",
        )
        .completed();
        assert_eq!(txn.status, TransactionStatus::Completed);
        assert_eq!(txn.completed_at, Some(txn.created_at));
    }

    #[test]
    fn test_mark_completed_keeps_updated_at_monotonic() {
        let mut txn = Transaction::new(
            AccountId::new("amina"),
            TransactionKind::Withdraw,
            dec!(10.00),
            Currency::NGN,
            "Withdrawal request",
        );
        let before = txn.updated_at;
        // A clock reading older than the row must not move updated_at back.
        txn.mark_completed(before - chrono::Duration::seconds(5));
        assert_eq!(txn.updated_at, before);
        assert!(txn.completed_at.is_some());
    }

    #[test]
    fn test_mark_rejected_records_reason() {
        let mut txn = Transaction::new(
            AccountId::new("bayo"),
            TransactionKind::Withdraw,
            dec!(10.00),
            Currency::NGN,
            "Withdrawal request",
        );
        txn.mark_rejected("missing bank details", Utc::now());
        assert_eq!(txn.status, TransactionStatus::Rejected);
        assert_eq!(
            txn.rejection_reason.as_deref(),
            Some("missing bank details")
        );
    }
}
