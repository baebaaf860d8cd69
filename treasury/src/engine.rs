//! Treasury engine
//!
//! Orchestrates wallet operations on top of the ledger: the transfer
//! protocol, withdrawal and deposit request creation, and marketplace
//! settlement postings. The engine builds the ledger rows; atomicity and
//! balance guarding live in the ledger's single-writer commit path.

use crate::{
    config::Config,
    directory::AccountDirectory,
    fees::{FeeKind, FeeSchedule},
    methods::MethodRegistry,
    Error, Result,
};
use chrono::{DateTime, Utc};
use ledger_core::{
    AccountId, EvidenceRef, Ledger, ManualDeposit, MethodId, Transaction, TransactionKind,
};
use rust_decimal::{Decimal, RoundingStrategy};
use std::sync::Arc;

/// Result of a settled transfer
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    /// Debit leg recorded against the sender
    pub debit: Transaction,

    /// Credit leg recorded for the recipient (net of fee)
    pub credit: Transaction,

    /// Fee leg posted to the platform fee account, when a fee applied
    pub fee: Option<Transaction>,

    /// Fee charged
    pub fee_amount: Decimal,

    /// Amount the recipient received
    pub net_amount: Decimal,
}

/// Result of a recorded marketplace sale
#[derive(Debug, Clone)]
pub struct SaleOutcome {
    /// Sale proceeds credited to the seller
    pub sale: Transaction,

    /// Affiliate commission, when one applied
    pub commission: Option<Transaction>,
}

/// Treasury engine
pub struct Treasury {
    /// Ledger core
    ledger: Arc<Ledger>,

    /// Fee snapshot taken at construction
    fees: FeeSchedule,

    /// Account directory (external accounts subsystem)
    directory: Arc<dyn AccountDirectory>,

    /// Payment method reference data
    methods: MethodRegistry,

    /// System account collecting transfer fees
    fee_account: AccountId,

    /// Configuration
    config: Config,
}

impl Treasury {
    /// Create a new treasury engine, opening the underlying ledger.
    ///
    /// Fails with a configuration error, before any ledger write is
    /// possible, if the fee percentages are unusable.
    pub fn new(config: Config, directory: Arc<dyn AccountDirectory>) -> Result<Self> {
        let fees = FeeSchedule::from_config(&config.fees)?;

        let ledger_config = ledger_core::Config {
            data_dir: config.ledger_data_dir.clone(),
            default_currency: config.default_currency,
            ..Default::default()
        };
        let ledger = Arc::new(Ledger::open(ledger_config)?);

        Ok(Self {
            ledger,
            fees,
            directory,
            methods: MethodRegistry::new(),
            fee_account: AccountId::new(config.fee_account.clone()),
            config,
        })
    }

    /// Underlying ledger
    pub fn ledger(&self) -> Arc<Ledger> {
        self.ledger.clone()
    }

    /// Fee snapshot in effect
    pub fn fee_schedule(&self) -> &FeeSchedule {
        &self.fees
    }

    /// Payment method registry
    pub fn methods(&self) -> &MethodRegistry {
        &self.methods
    }

    /// Bank details shown to users making manual deposits
    pub fn manual_payment_details(&self) -> &crate::config::ManualPaymentConfig {
        &self.config.manual_payment
    }

    // Transfer protocol

    /// Transfer money to another user.
    ///
    /// Creates exactly three ledger rows in one atomic, balance-guarded
    /// unit: the sender's debit of the full amount, the recipient's credit
    /// net of fee, and the fee posting to the platform fee account. Either
    /// all legs settle or none do; concurrent transfers from the same
    /// sender serialize against the balance check.
    pub async fn transfer(
        &self,
        sender: &AccountId,
        recipient_username: &str,
        amount: Decimal,
        description: &str,
    ) -> Result<TransferOutcome> {
        if amount <= Decimal::ZERO {
            return Err(ledger_core::Error::InvalidAmount(format!(
                "transfer amount must be positive, got {}",
                amount
            ))
            .into());
        }

        let recipient = self
            .directory
            .resolve(recipient_username)
            .ok_or_else(|| Error::InvalidRecipient(recipient_username.to_string()))?;
        if recipient == *sender {
            return Err(Error::InvalidRecipient(
                "cannot transfer to yourself".to_string(),
            ));
        }

        let pct = self.fees.resolve(FeeKind::Transfer);
        let (fee, net) = self.fees.split(FeeKind::Transfer, amount);
        if net <= Decimal::ZERO {
            return Err(Error::Configuration(format!(
                "transfer fee of {}% leaves no net amount",
                pct
            )));
        }

        let currency = self.config.default_currency;
        let debit = Transaction::new(
            sender.clone(),
            TransactionKind::Transfer,
            amount,
            currency,
            format!("Transfer to {}: {}", recipient_username, description),
        )
        .with_metadata("recipient", recipient.to_string())
        .with_metadata("admin_fee", fee.to_string())
        .with_metadata("net_amount", net.to_string())
        .with_metadata("fee_pct", pct.to_string())
        .completed();

        let credit = Transaction::new(
            recipient.clone(),
            TransactionKind::Transfer,
            net,
            currency,
            format!("Transfer from {}: {}", sender, description),
        )
        .with_metadata("sender", sender.to_string())
        .with_metadata("original_amount", amount.to_string())
        .with_metadata("admin_fee", fee.to_string())
        .completed();

        let mut legs = vec![debit.clone(), credit];
        if fee > Decimal::ZERO {
            legs.push(
                Transaction::new(
                    self.fee_account.clone(),
                    TransactionKind::AdminFee,
                    fee,
                    currency,
                    format!("Transfer fee for {}", debit.reference),
                )
                .with_metadata("original_reference", debit.reference.to_string())
                .with_metadata("sender", sender.to_string())
                .completed(),
            );
        }

        let mut committed = self.ledger.commit_spend(sender, amount, legs).await?;

        tracing::info!(
            sender = %sender,
            recipient = %recipient,
            %amount,
            %fee,
            "Transfer settled"
        );

        let fee_leg = if committed.len() > 2 { committed.pop() } else { None };
        let credit = committed.pop().expect("credit leg committed");
        let debit = committed.pop().expect("debit leg committed");

        Ok(TransferOutcome {
            debit,
            credit,
            fee: fee_leg,
            fee_amount: fee,
            net_amount: net,
        })
    }

    // Request creation

    /// Request a withdrawal.
    ///
    /// Checks balance sufficiency at request time, stamps the computed fee
    /// into metadata (no fee row until approval) and creates a single
    /// pending row. The balance is re-checked when a reviewer approves.
    pub async fn request_withdrawal(
        &self,
        account: &AccountId,
        amount: Decimal,
        method: Option<&MethodId>,
    ) -> Result<Transaction> {
        if amount <= Decimal::ZERO {
            return Err(ledger_core::Error::InvalidAmount(format!(
                "withdrawal amount must be positive, got {}",
                amount
            ))
            .into());
        }

        let method = self.resolve_method(method)?;

        let available = self.ledger.balance_of(account)?;
        if available < amount {
            return Err(ledger_core::Error::InsufficientBalance {
                available,
                requested: amount,
            }
            .into());
        }

        let pct = self.fees.resolve(FeeKind::Withdraw);
        let fee = self.fees.fee_for(FeeKind::Withdraw, amount);

        let mut txn = Transaction::new(
            account.clone(),
            TransactionKind::Withdraw,
            amount,
            self.config.default_currency,
            "Withdrawal request",
        );
        if fee > Decimal::ZERO {
            txn = txn
                .with_metadata("admin_fee", fee.to_string())
                .with_metadata("fee_pct", pct.to_string());
        }
        if let Some(method) = method {
            txn = txn.with_payment_method(method);
        }

        let txn = self.ledger.submit(txn).await?;

        tracing::info!(account = %account, %amount, reference = %txn.reference, "Withdrawal requested");

        Ok(txn)
    }

    /// Request a wallet top-up through an automatic gateway.
    ///
    /// Creates a pending `AddMoney` row that a reviewer (or a gateway
    /// callback acting as one) finalizes.
    pub async fn request_gateway_deposit(
        &self,
        account: &AccountId,
        amount: Decimal,
        method: Option<&MethodId>,
    ) -> Result<Transaction> {
        if amount <= Decimal::ZERO {
            return Err(ledger_core::Error::InvalidAmount(format!(
                "deposit amount must be positive, got {}",
                amount
            ))
            .into());
        }

        let method = self.resolve_method(method)?;

        let mut txn = Transaction::new(
            account.clone(),
            TransactionKind::AddMoney,
            amount,
            self.config.default_currency,
            "Wallet top-up",
        );
        if let Some(method) = method {
            txn = txn.with_payment_method(method);
        }

        Ok(self.ledger.submit(txn).await?)
    }

    /// Submit proof of a manual bank deposit.
    ///
    /// The submission has no ledger effect until a reviewer approves it.
    pub async fn request_manual_deposit(
        &self,
        account: &AccountId,
        amount: Decimal,
        evidence: EvidenceRef,
        depositor_name: &str,
        deposited_at: DateTime<Utc>,
    ) -> Result<ManualDeposit> {
        let deposit = ManualDeposit::new(
            account.clone(),
            amount,
            evidence,
            depositor_name,
            deposited_at,
        );
        let deposit = self.ledger.submit_deposit(deposit).await?;

        tracing::info!(account = %account, %amount, id = %deposit.id, "Manual deposit submitted");

        Ok(deposit)
    }

    // Marketplace settlement

    /// Record a marketplace sale: proceeds to the seller, plus an affiliate
    /// commission when a referral applies, in one atomic batch.
    pub async fn record_sale(
        &self,
        seller: &AccountId,
        amount: Decimal,
        description: &str,
        commission: Option<(AccountId, Decimal)>,
    ) -> Result<SaleOutcome> {
        if amount <= Decimal::ZERO {
            return Err(ledger_core::Error::InvalidAmount(format!(
                "sale amount must be positive, got {}",
                amount
            ))
            .into());
        }

        let currency = self.config.default_currency;
        let sale = Transaction::new(
            seller.clone(),
            TransactionKind::Sale,
            amount,
            currency,
            description,
        )
        .completed();

        let mut legs = vec![sale.clone()];
        if let Some((affiliate, rate)) = commission {
            if rate < Decimal::ZERO || rate > Decimal::ONE_HUNDRED {
                return Err(Error::Configuration(format!(
                    "commission rate must be between 0 and 100, got {}",
                    rate
                )));
            }
            let commission_amount = (amount * rate / Decimal::ONE_HUNDRED)
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            if commission_amount > Decimal::ZERO {
                legs.push(
                    Transaction::new(
                        affiliate,
                        TransactionKind::Commission,
                        commission_amount,
                        currency,
                        format!("Affiliate commission on {}", sale.reference),
                    )
                    .with_metadata("commission_rate", rate.to_string())
                    .with_metadata("sale_reference", sale.reference.to_string())
                    .completed(),
                );
            }
        }

        let mut committed = self.ledger.commit(legs).await?;
        let commission_leg = if committed.len() > 1 { committed.pop() } else { None };
        let sale = committed.pop().expect("sale leg committed");

        Ok(SaleOutcome {
            sale,
            commission: commission_leg,
        })
    }

    /// Request a mentorship engagement payment.
    ///
    /// Creates a single pending debit for the payer with the mentorship
    /// commission captured into metadata; a reviewer finalizes it like any
    /// other pending row.
    pub async fn request_engagement_payment(
        &self,
        payer: &AccountId,
        provider: &AccountId,
        amount: Decimal,
        description: &str,
    ) -> Result<Transaction> {
        if amount <= Decimal::ZERO {
            return Err(ledger_core::Error::InvalidAmount(format!(
                "engagement amount must be positive, got {}",
                amount
            ))
            .into());
        }
        if !self.directory.exists(provider) {
            return Err(Error::InvalidRecipient(provider.to_string()));
        }
        if provider == payer {
            return Err(Error::InvalidRecipient(
                "cannot engage yourself".to_string(),
            ));
        }

        let pct = self.fees.resolve(FeeKind::Mentorship);
        let (fee, net) = self.fees.split(FeeKind::Mentorship, amount);

        let txn = Transaction::new(
            payer.clone(),
            TransactionKind::Transfer,
            amount,
            self.config.default_currency,
            description,
        )
        .with_metadata("provider", provider.to_string())
        .with_metadata("admin_fee", fee.to_string())
        .with_metadata("net_amount", net.to_string())
        .with_metadata("fee_pct", pct.to_string());

        Ok(self.ledger.submit(txn).await?)
    }

    // Balances

    /// Derived available balance for an account
    pub fn balance_of(&self, account: &AccountId) -> Result<Decimal> {
        Ok(self.ledger.balance_of(account)?)
    }

    /// Derived platform-wide balance
    pub fn platform_balance(&self) -> Result<Decimal> {
        Ok(self.ledger.platform_balance()?)
    }

    fn resolve_method(&self, method: Option<&MethodId>) -> Result<Option<MethodId>> {
        match method {
            None => Ok(None),
            Some(id) => match self.methods.get(id) {
                Some(m) if m.active => Ok(Some(m.id)),
                Some(_) => Err(Error::UnknownMethod(format!("{} is inactive", id))),
                None => Err(Error::UnknownMethod(id.to_string())),
            },
        }
    }

    /// Shut the underlying ledger down.
    ///
    /// Fails if other handles to the ledger are still alive.
    pub async fn shutdown(self) -> Result<()> {
        match Arc::try_unwrap(self.ledger) {
            Ok(ledger) => Ok(ledger.shutdown().await?),
            Err(_) => Err(Error::Other(
                "ledger still shared, cannot shut down".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::MemoryDirectory;
    use rust_decimal_macros::dec;

    fn test_treasury(transfer_pct: Decimal) -> (Treasury, Arc<MemoryDirectory>, tempfile::TempDir) {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.ledger_data_dir = temp_dir.path().to_path_buf();
        config.fees.transfer_pct = transfer_pct;

        let directory = Arc::new(MemoryDirectory::new());
        directory.register("amina", AccountId::new("acct-amina"));
        directory.register("bayo", AccountId::new("acct-bayo"));

        let treasury = Treasury::new(config, directory.clone()).unwrap();
        (treasury, directory, temp_dir)
    }

    async fn seed(treasury: &Treasury, account: &AccountId, amount: Decimal) {
        treasury
            .ledger()
            .submit(
                Transaction::new(
                    account.clone(),
                    TransactionKind::AddMoney,
                    amount,
                    ledger_core::Currency::NGN,
                    "seed credit",
                )
                .completed(),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_transfer_unknown_recipient() {
        let (treasury, _dir, _temp) = test_treasury(Decimal::ZERO);
        let amina = AccountId::new("acct-amina");
        seed(&treasury, &amina, dec!(100.00)).await;

        let result = treasury.transfer(&amina, "ghost", dec!(10.00), "hello").await;
        assert!(matches!(result, Err(Error::InvalidRecipient(_))));
    }

    #[tokio::test]
    async fn test_transfer_to_self_rejected() {
        let (treasury, _dir, _temp) = test_treasury(Decimal::ZERO);
        let amina = AccountId::new("acct-amina");
        seed(&treasury, &amina, dec!(100.00)).await;

        let result = treasury.transfer(&amina, "amina", dec!(10.00), "hello").await;
        assert!(matches!(result, Err(Error::InvalidRecipient(_))));
    }

    #[tokio::test]
    async fn test_fee_free_transfer_has_two_legs() {
        let (treasury, _dir, _temp) = test_treasury(Decimal::ZERO);
        let amina = AccountId::new("acct-amina");
        seed(&treasury, &amina, dec!(100.00)).await;

        let outcome = treasury
            .transfer(&amina, "bayo", dec!(40.00), "lunch")
            .await
            .unwrap();
        assert!(outcome.fee.is_none());
        assert_eq!(outcome.net_amount, dec!(40.00));
        assert_eq!(treasury.balance_of(&amina).unwrap(), dec!(60.00));
        assert_eq!(
            treasury.balance_of(&AccountId::new("acct-bayo")).unwrap(),
            dec!(40.00)
        );
    }

    #[tokio::test]
    async fn test_withdrawal_stamps_fee_metadata_only() {
        let (treasury, _dir, _temp) = {
            let temp_dir = tempfile::tempdir().unwrap();
            let mut config = Config::default();
            config.ledger_data_dir = temp_dir.path().to_path_buf();
            config.fees.withdraw_pct = dec!(2);
            let directory = Arc::new(MemoryDirectory::new());
            (Treasury::new(config, directory.clone()).unwrap(), directory, temp_dir)
        };
        let amina = AccountId::new("acct-amina");
        seed(&treasury, &amina, dec!(500.00)).await;

        let txn = treasury
            .request_withdrawal(&amina, dec!(100.00), None)
            .await
            .unwrap();

        assert_eq!(txn.metadata.get("admin_fee").map(String::as_str), Some("2.00"));
        assert_eq!(txn.metadata.get("fee_pct").map(String::as_str), Some("2"));
        // Fee is an annotation: the pending row is the only new one.
        assert_eq!(treasury.ledger().history(&amina).unwrap().len(), 2);
        assert_eq!(treasury.balance_of(&amina).unwrap(), dec!(500.00));
    }

    #[tokio::test]
    async fn test_withdrawal_requires_known_active_method() {
        let (treasury, _dir, _temp) = test_treasury(Decimal::ZERO);
        let amina = AccountId::new("acct-amina");
        seed(&treasury, &amina, dec!(100.00)).await;

        let unknown = MethodId::new("ghost");
        let result = treasury
            .request_withdrawal(&amina, dec!(10.00), Some(&unknown))
            .await;
        assert!(matches!(result, Err(Error::UnknownMethod(_))));

        treasury.methods().register(crate::methods::PaymentMethod::new(
            MethodId::new("bank"),
            "Bank Transfer",
            crate::methods::MethodKind::ManualBankTransfer,
            "",
        ));
        treasury.methods().set_active(&MethodId::new("bank"), false);
        let inactive = MethodId::new("bank");
        let result = treasury
            .request_withdrawal(&amina, dec!(10.00), Some(&inactive))
            .await;
        assert!(matches!(result, Err(Error::UnknownMethod(_))));
    }

    #[tokio::test]
    async fn test_record_sale_with_commission() {
        let (treasury, _dir, _temp) = test_treasury(Decimal::ZERO);
        let seller = AccountId::new("acct-amina");
        let affiliate = AccountId::new("acct-bayo");

        let outcome = treasury
            .record_sale(
                &seller,
                dec!(200.00),
                "Course purchase",
                Some((affiliate.clone(), dec!(10))),
            )
            .await
            .unwrap();

        let commission = outcome.commission.unwrap();
        assert_eq!(commission.amount, dec!(20.00));
        assert_eq!(
            commission.metadata.get("sale_reference").map(String::as_str),
            Some(outcome.sale.reference.as_str())
        );
        assert_eq!(treasury.balance_of(&seller).unwrap(), dec!(200.00));
        assert_eq!(treasury.balance_of(&affiliate).unwrap(), dec!(20.00));
    }

    #[tokio::test]
    async fn test_engagement_payment_is_pending_with_fee_metadata() {
        let (treasury, _dir, _temp) = {
            let temp_dir = tempfile::tempdir().unwrap();
            let mut config = Config::default();
            config.ledger_data_dir = temp_dir.path().to_path_buf();
            config.fees.mentorship_pct = dec!(10);
            let directory = Arc::new(MemoryDirectory::new());
            directory.register("mentor", AccountId::new("acct-mentor"));
            (Treasury::new(config, directory.clone()).unwrap(), directory, temp_dir)
        };

        let payer = AccountId::new("acct-amina");
        let mentor = AccountId::new("acct-mentor");

        let txn = treasury
            .request_engagement_payment(&payer, &mentor, dec!(300.00), "Mentorship: Rust track")
            .await
            .unwrap();

        assert_eq!(txn.status, ledger_core::TransactionStatus::Pending);
        assert_eq!(txn.metadata.get("admin_fee").map(String::as_str), Some("30.00"));
        assert_eq!(txn.metadata.get("net_amount").map(String::as_str), Some("270.00"));
        assert_eq!(treasury.balance_of(&payer).unwrap(), Decimal::ZERO);
    }
}
