//! Fee policy
//!
//! Resolves percentage-based charges from the configuration snapshot taken
//! at the start of an operation. The resolved percentage and the computed
//! fee are stamped into the transaction's metadata at creation time and are
//! immutable thereafter.

use crate::config::FeeConfig;
use crate::{Error, Result};
use rust_decimal::{Decimal, RoundingStrategy};

/// Charge kinds the platform takes a percentage on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeKind {
    /// Withdrawal fee
    Withdraw,
    /// Transfer fee
    Transfer,
    /// Mentorship commission
    Mentorship,
}

/// Immutable fee snapshot, valid for the operation that took it
#[derive(Debug, Clone, Copy)]
pub struct FeeSchedule {
    withdraw_pct: Decimal,
    transfer_pct: Decimal,
    mentorship_pct: Decimal,
}

impl FeeSchedule {
    /// Build a snapshot from configuration, rejecting unusable percentages
    /// before any ledger write can happen
    pub fn from_config(fees: &FeeConfig) -> Result<Self> {
        for (name, pct) in [
            ("withdraw_pct", fees.withdraw_pct),
            ("transfer_pct", fees.transfer_pct),
            ("mentorship_pct", fees.mentorship_pct),
        ] {
            if pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
                return Err(Error::Configuration(format!(
                    "{} must be between 0 and 100, got {}",
                    name, pct
                )));
            }
        }

        Ok(Self {
            withdraw_pct: fees.withdraw_pct,
            transfer_pct: fees.transfer_pct,
            mentorship_pct: fees.mentorship_pct,
        })
    }

    /// Percentage for a fee kind
    pub fn resolve(&self, kind: FeeKind) -> Decimal {
        match kind {
            FeeKind::Withdraw => self.withdraw_pct,
            FeeKind::Transfer => self.transfer_pct,
            FeeKind::Mentorship => self.mentorship_pct,
        }
    }

    /// Fee charged on `amount`, rounded to minor units
    pub fn fee_for(&self, kind: FeeKind, amount: Decimal) -> Decimal {
        (amount * self.resolve(kind) / Decimal::ONE_HUNDRED)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Fee and net remainder for `amount`
    pub fn split(&self, kind: FeeKind, amount: Decimal) -> (Decimal, Decimal) {
        let fee = self.fee_for(kind, amount);
        (fee, amount - fee)
    }
}
