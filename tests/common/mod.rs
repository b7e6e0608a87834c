// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use denario::application::BankService;
use denario::domain::{Account, Cents, Country};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(BankService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = BankService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Open an account with a generated IBAN and the given opening balance.
pub async fn open_account(
    service: &BankService,
    first_name: &str,
    last_name: &str,
    country: Country,
    balance_cents: Cents,
) -> Result<Account> {
    Ok(service
        .open_account(
            first_name.to_string(),
            last_name.to_string(),
            country,
            None,
            balance_cents,
        )
        .await?)
}

/// Standard fixture: a funded payer and a receiver, both Polish.
pub async fn payer_and_receiver(
    service: &BankService,
    payer_balance: Cents,
    receiver_balance: Cents,
) -> Result<(Account, Account)> {
    let payer = open_account(service, "John", "Doe", Country::Pl, payer_balance).await?;
    let receiver = open_account(service, "Alice", "Smith", Country::Pl, receiver_balance).await?;
    Ok((payer, receiver))
}
