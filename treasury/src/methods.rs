//! Payment method reference data
//!
//! Methods have no lifecycle beyond activation toggling and are never
//! deleted.

use ledger_core::MethodId;
use parking_lot::RwLock;
use std::collections::HashMap;

/// How money reaches the platform through this method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// Automatic gateway (virtual accounts, card processors)
    AutomaticGateway,
    /// Manual bank transfer reviewed by an admin
    ManualBankTransfer,
}

/// A way for users to move money in or out
#[derive(Debug, Clone)]
pub struct PaymentMethod {
    /// Stable identifier
    pub id: MethodId,

    /// Display name
    pub name: String,

    /// Method kind
    pub kind: MethodKind,

    /// Whether the method is currently offered
    pub active: bool,

    /// Instructions shown to the user (manual methods)
    pub instructions: String,
}

impl PaymentMethod {
    /// Create an active method
    pub fn new(
        id: MethodId,
        name: impl Into<String>,
        kind: MethodKind,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            active: true,
            instructions: instructions.into(),
        }
    }
}

/// In-process registry of payment methods
#[derive(Default)]
pub struct MethodRegistry {
    inner: RwLock<HashMap<MethodId, PaymentMethod>>,
}

impl MethodRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a method
    pub fn register(&self, method: PaymentMethod) {
        self.inner.write().insert(method.id.clone(), method);
    }

    /// Toggle a method's active flag. Returns false if the method is unknown.
    pub fn set_active(&self, id: &MethodId, active: bool) -> bool {
        match self.inner.write().get_mut(id) {
            Some(method) => {
                method.active = active;
                true
            }
            None => false,
        }
    }

    /// Look a method up
    pub fn get(&self, id: &MethodId) -> Option<PaymentMethod> {
        self.inner.read().get(id).cloned()
    }

    /// All currently offered methods, sorted by name
    pub fn active_methods(&self) -> Vec<PaymentMethod> {
        let mut methods: Vec<PaymentMethod> = self
            .inner
            .read()
            .values()
            .filter(|m| m.active)
            .cloned()
            .collect();
        methods.sort_by(|a, b| a.name.cmp(&b.name));
        methods
    }
}
