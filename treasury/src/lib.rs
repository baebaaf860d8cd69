//! Treasury
//!
//! Wallet operations for the marketplace, on top of `ledger-core`:
//!
//! 1. **Transfers**: three-leg atomic settlement (debit, net credit, fee)
//! 2. **Requests**: pending withdrawals, gateway top-ups and manual deposit
//!    submissions awaiting review
//! 3. **Moderation**: reviewer-facing approve/reject for transactions and
//!    manual deposits
//! 4. **Fees**: percentage charges resolved from a configuration snapshot
//!    and captured into each row's metadata at creation
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use treasury::{Config, MemoryDirectory, Treasury};
//!
//! #[tokio::main]
//! async fn main() -> treasury::Result<()> {
//!     let directory = Arc::new(MemoryDirectory::new());
//!     let treasury = Treasury::new(Config::default(), directory)?;
//!
//!     let balance = treasury.balance_of(&ledger_core::AccountId::new("amina"))?;
//!     println!("balance: {}", balance);
//!
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod directory;
pub mod display;
pub mod engine;
pub mod error;
pub mod fees;
pub mod methods;
pub mod moderation;

// Re-exports
pub use config::{Config, FeeConfig, ManualPaymentConfig};
pub use directory::{AccountDirectory, MemoryDirectory};
pub use engine::{SaleOutcome, TransferOutcome, Treasury};
pub use error::{Error, Result};
pub use fees::{FeeKind, FeeSchedule};
pub use methods::{MethodKind, MethodRegistry, PaymentMethod};
pub use moderation::Moderator;
