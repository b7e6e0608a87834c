mod common;

use anyhow::Result;
use common::{open_account, payer_and_receiver, test_service};
use denario::domain::Country;
use denario::io::{Exporter, LedgerSnapshot};

#[tokio::test]
async fn test_statement_csv_export() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let (payer, receiver) = payer_and_receiver(&service, 100000, 0).await?;
    service.deposit(&payer.iban, 25000, "John", "Doe").await?;
    service
        .transfer(&payer.iban, &receiver.iban, 30000, "John", "Doe")
        .await?;

    let exporter = Exporter::new(&service);
    let mut buffer = Vec::new();
    let count = exporter
        .export_statement_csv(&payer.iban, &mut buffer)
        .await?;
    assert_eq!(count, 2);

    let output = String::from_utf8(buffer)?;
    let mut lines = output.lines();
    assert_eq!(
        lines.next(),
        Some("id,date,type,first_name,last_name,amount,reference_iban")
    );
    assert!(output.contains("DEPOSIT"));
    assert!(output.contains("TRANSFER"));
    assert!(output.contains("300.00"));

    Ok(())
}

#[tokio::test]
async fn test_statement_export_for_missing_account_fails() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let exporter = Exporter::new(&service);
    let mut buffer = Vec::new();
    let result = exporter
        .export_statement_csv("PL12345678901234567890123456", &mut buffer)
        .await;

    assert!(result.is_err());
    Ok(())
}

#[tokio::test]
async fn test_accounts_csv_export() -> Result<()> {
    let (service, _temp) = test_service().await?;

    open_account(&service, "John", "Doe", Country::Pl, 125000).await?;
    open_account(&service, "Alice", "Smith", Country::Gb, 0).await?;

    let exporter = Exporter::new(&service);
    let mut buffer = Vec::new();
    let count = exporter.export_accounts_csv(&mut buffer).await?;
    assert_eq!(count, 2);

    let output = String::from_utf8(buffer)?;
    assert!(output.starts_with("iban,first_name,last_name,country,balance"));
    assert!(output.contains("1250.00"));

    Ok(())
}

#[tokio::test]
async fn test_full_json_snapshot_roundtrips() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let (payer, receiver) = payer_and_receiver(&service, 100000, 0).await?;
    service
        .transfer(&payer.iban, &receiver.iban, 30000, "John", "Doe")
        .await?;

    let exporter = Exporter::new(&service);
    let mut buffer = Vec::new();
    let snapshot = exporter.export_full_json(&mut buffer).await?;

    assert_eq!(snapshot.accounts.len(), 2);
    assert_eq!(snapshot.transactions.len(), 2);

    let parsed: LedgerSnapshot = serde_json::from_slice(&buffer)?;
    assert_eq!(parsed.version, snapshot.version);
    assert_eq!(parsed.accounts.len(), 2);
    assert_eq!(parsed.transactions.len(), 2);

    Ok(())
}
