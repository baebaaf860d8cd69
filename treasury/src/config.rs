//! Configuration for the treasury layer
//!
//! Fee percentages and manual-payment bank details come from the platform's
//! site configuration. They are loaded once into this snapshot and injected
//! into each operation; the percentage in effect is captured into the
//! resulting transaction's metadata, so historical rows stay individually
//! explainable even after the configuration changes.

use ledger_core::Currency;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Treasury configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Ledger data directory
    pub ledger_data_dir: PathBuf,

    /// Currency stamped onto new rows
    pub default_currency: Currency,

    /// System account that collects transfer fees
    pub fee_account: String,

    /// Fee percentages
    pub fees: FeeConfig,

    /// Manual-payment bank details shown to depositors
    pub manual_payment: ManualPaymentConfig,

    /// Display-rate multiplier for USD-denominated rows
    pub display_rate: Decimal,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "treasury".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            ledger_data_dir: PathBuf::from("./data/ledger"),
            default_currency: Currency::NGN,
            fee_account: "platform.fees".to_string(),
            fees: FeeConfig::default(),
            manual_payment: ManualPaymentConfig::default(),
            display_rate: Decimal::ONE,
        }
    }
}

/// Fee percentages, expressed as 0-100
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Withdrawal fee percentage
    pub withdraw_pct: Decimal,

    /// Transfer fee percentage
    pub transfer_pct: Decimal,

    /// Mentorship commission percentage
    pub mentorship_pct: Decimal,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            withdraw_pct: Decimal::ZERO,
            transfer_pct: Decimal::ZERO,
            mentorship_pct: Decimal::ZERO,
        }
    }
}

/// Bank account shown to users making manual deposits
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManualPaymentConfig {
    /// Bank name
    pub bank_name: String,

    /// Account number
    pub account_number: String,

    /// Account name
    pub account_name: String,
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Configuration(format!("Failed to parse config: {}", e)))?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("TREASURY_LEDGER_DATA_DIR") {
            config.ledger_data_dir = PathBuf::from(data_dir);
        }

        if let Ok(account) = std::env::var("TREASURY_FEE_ACCOUNT") {
            config.fee_account = account;
        }

        Ok(config)
    }
}
