// Treasury demo - walks a wallet through the full money lifecycle:
// manual deposit -> review -> transfer -> withdrawal -> review.

use anyhow::Context;
use ledger_core::{AccountId, EvidenceRef};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::sync::Arc;
use treasury::{Config, MemoryDirectory, Moderator, Treasury};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let data_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./data/treasury-demo"));

    let mut config = Config::default();
    config.ledger_data_dir = data_dir;
    config.fees.transfer_pct = Decimal::new(5, 0); // 5%
    config.fees.withdraw_pct = Decimal::new(2, 0); // 2%

    let directory = Arc::new(MemoryDirectory::new());
    let amina = AccountId::new("acct-amina");
    let bayo = AccountId::new("acct-bayo");
    directory.register("amina", amina.clone());
    directory.register("bayo", bayo.clone());

    let treasury =
        Treasury::new(config, directory).context("failed to open treasury")?;
    let moderator = Moderator::new(treasury.ledger(), AccountId::new("admin"));

    // Amina proves a bank deposit of 1000; an admin reviews and credits it.
    let deposit = treasury
        .request_manual_deposit(
            &amina,
            Decimal::new(100000, 2),
            EvidenceRef::new("deposit_screenshots/amina-1.png"),
            "Amina O.",
            chrono::Utc::now(),
        )
        .await?;
    let (_, credit) = moderator.approve_deposit(deposit.id).await?;
    println!("deposit credited: {} ({})", credit.amount, credit.reference);
    println!("amina balance: {}", treasury.balance_of(&amina)?);

    // Amina sends Bayo 250; the 5% fee goes to the platform account.
    let outcome = treasury
        .transfer(&amina, "bayo", Decimal::new(25000, 2), "rent split")
        .await?;
    println!(
        "transfer settled: {} sent, {} received, {} fee",
        outcome.debit.amount, outcome.net_amount, outcome.fee_amount
    );
    println!("amina balance: {}", treasury.balance_of(&amina)?);
    println!("bayo balance:  {}", treasury.balance_of(&bayo)?);

    // Bayo requests a withdrawal; the fee is stamped into metadata and the
    // row stays pending until the admin approves it.
    let withdrawal = treasury
        .request_withdrawal(&bayo, Decimal::new(10000, 2), None)
        .await?;
    println!(
        "withdrawal requested: {} (pending, fee note {:?})",
        withdrawal.amount,
        withdrawal.metadata.get("admin_fee")
    );
    moderator.approve(withdrawal.id).await?;
    println!("withdrawal approved");
    println!("bayo balance:  {}", treasury.balance_of(&bayo)?);

    println!("platform balance: {}", treasury.platform_balance()?);

    for txn in treasury.ledger().history(&amina)? {
        println!("amina history: {} {} {} [{:?}]", txn.kind, txn.amount, txn.reference, txn.status);
    }

    treasury.shutdown().await.ok();

    Ok(())
}
