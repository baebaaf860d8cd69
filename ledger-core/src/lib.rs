//! Sokoni Ledger Core
//!
//! Append-mostly wallet ledger with derived balances and moderated
//! transitions.
//!
//! # Architecture
//!
//! - **Derived balances**: balances are never stored; every balance is
//!   recomputed from completed transaction rows
//! - **Single writer**: one logical writer task serializes every write, so
//!   a balance check and the postings it guards commit as one unit
//! - **Atomic batches**: multi-leg postings (transfers, deposit credits)
//!   commit through a single storage batch or not at all
//!
//! # Invariants
//!
//! - `amount > 0` on every row; direction comes from the kind, never from sign
//! - References are globally unique and immutable
//! - Rows are never deleted; terminal rows never transition again
//! - Pending and rejected rows never affect any balance

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod balance;
pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod storage;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use storage::Storage;
pub use types::{
    AccountId, Currency, DepositStatus, EvidenceRef, ManualDeposit, MethodId, Transaction,
    TransactionKind, TransactionReference, TransactionStatus,
};
