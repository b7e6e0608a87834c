use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::BankService;
use crate::domain::{Account, TransactionRecord, format_cents};

/// Full-ledger snapshot for export/backup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub accounts: Vec<Account>,
    pub transactions: Vec<TransactionRecord>,
}

/// Exporter for converting ledger data to statement and backup formats.
pub struct Exporter<'a> {
    service: &'a BankService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a BankService) -> Self {
        Self { service }
    }

    /// Export one account's statement to CSV: every ledger record on
    /// that account, in settlement order. Returns the row count.
    pub async fn export_statement_csv<W: Write>(&self, iban: &str, writer: W) -> Result<usize> {
        let account = self.service.get_account(iban).await?;
        let transactions = self.service.list_transactions(Some(&account.iban)).await?;

        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record([
            "id",
            "date",
            "type",
            "first_name",
            "last_name",
            "amount",
            "reference_iban",
        ])?;

        let mut count = 0;
        for record in &transactions {
            csv_writer.write_record([
                record.id.to_string(),
                record.date.to_rfc3339(),
                record.transaction_type.to_string(),
                record.first_name.clone(),
                record.last_name.clone(),
                format_cents(record.amount_cents),
                record.iban.clone(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export all accounts with their balances to CSV.
    pub async fn export_accounts_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let accounts = self.service.list_accounts().await?;

        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(["iban", "first_name", "last_name", "country", "balance"])?;

        let mut count = 0;
        for account in &accounts {
            csv_writer.write_record([
                account.iban.clone(),
                account.first_name.clone(),
                account.last_name.clone(),
                account.country.to_string(),
                format_cents(account.balance_cents),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Export the full ledger as a JSON snapshot.
    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<LedgerSnapshot> {
        let accounts = self.service.list_accounts().await?;
        let transactions = self.service.list_transactions(None).await?;

        let snapshot = LedgerSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            accounts,
            transactions,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}
