//! Account directory seam
//!
//! The accounts subsystem lives outside this core. Operations that accept a
//! username (transfers) resolve it through this trait; everything else works
//! with opaque account ids.

use ledger_core::AccountId;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Resolves usernames to accounts and answers existence checks
pub trait AccountDirectory: Send + Sync {
    /// Resolve a username to its account, if any
    fn resolve(&self, username: &str) -> Option<AccountId>;

    /// Check whether an account exists
    fn exists(&self, account: &AccountId) -> bool;
}

/// In-memory directory for tests and demos
#[derive(Default)]
pub struct MemoryDirectory {
    accounts: RwLock<HashMap<String, AccountId>>,
}

impl MemoryDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a username
    pub fn register(&self, username: impl Into<String>, account: AccountId) {
        self.accounts.write().insert(username.into(), account);
    }
}

impl AccountDirectory for MemoryDirectory {
    fn resolve(&self, username: &str) -> Option<AccountId> {
        self.accounts.read().get(username).cloned()
    }

    fn exists(&self, account: &AccountId) -> bool {
        self.accounts.read().values().any(|a| a == account)
    }
}
