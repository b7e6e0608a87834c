mod common;

use anyhow::Result;
use common::{open_account, payer_and_receiver, test_service};
use denario::application::BankError;
use denario::domain::{Country, TransactionType};

#[tokio::test]
async fn test_deposit_increases_balance_and_records() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let account = open_account(&service, "John", "Doe", Country::Pl, 50000).await?;

    let settlement = service.deposit(&account.iban, 25000, "John", "Doe").await?;

    assert_eq!(service.balance(&account.iban).await?, 75000);
    assert!(settlement.counterpart.is_none());
    assert!(settlement.transaction.id > 0);
    assert_eq!(
        settlement.transaction.transaction_type,
        TransactionType::Deposit
    );

    let ledger = service.list_transactions(Some(&account.iban)).await?;
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].amount_cents, 25000);
    // Deposits reference the owning account's own IBAN.
    assert_eq!(ledger[0].iban, account.iban);

    Ok(())
}

#[tokio::test]
async fn test_deposit_sums_are_exact() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let account = open_account(&service, "John", "Doe", Country::Pl, 0).await?;

    // Amounts chosen to expose any float rounding; cents arithmetic
    // must stay exact.
    let amounts = [1, 3, 10, 33, 999, 100001, 7];
    for amount in amounts {
        service.deposit(&account.iban, amount, "John", "Doe").await?;
    }

    let expected: i64 = amounts.iter().sum();
    assert_eq!(service.balance(&account.iban).await?, expected);
    assert_eq!(
        service.list_transactions(Some(&account.iban)).await?.len(),
        amounts.len()
    );

    Ok(())
}

#[tokio::test]
async fn test_deposit_to_missing_account() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = service
        .deposit("PL12345678901234567890123456", 100, "John", "Doe")
        .await
        .unwrap_err();

    assert!(matches!(err, BankError::AccountNotFound(_)));
    assert!(service.list_transactions(None).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_withdrawal_debits_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let account = open_account(&service, "John", "Doe", Country::Pl, 50000).await?;

    service.withdraw(&account.iban, 20000, "John", "Doe").await?;

    assert_eq!(service.balance(&account.iban).await?, 30000);

    let ledger = service.list_transactions(Some(&account.iban)).await?;
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger[0].transaction_type, TransactionType::Withdrawal);

    Ok(())
}

#[tokio::test]
async fn test_withdrawal_overdraft_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let account = open_account(&service, "John", "Doe", Country::Pl, 10000).await?;

    let err = service
        .withdraw(&account.iban, 10001, "John", "Doe")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        BankError::InsufficientFunds {
            balance: 10000,
            required: 10001,
            ..
        }
    ));
    assert_eq!(service.balance(&account.iban).await?, 10000);
    assert!(service.list_transactions(Some(&account.iban)).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_transfer_success() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let (payer, receiver) = payer_and_receiver(&service, 100000, 20000).await?;

    let settlement = service
        .transfer(&payer.iban, &receiver.iban, 30000, "John", "Doe")
        .await?;

    assert_eq!(service.balance(&payer.iban).await?, 70000);
    assert_eq!(service.balance(&receiver.iban).await?, 50000);

    // Exactly two records: TRANSFER on the payer, DEPOSIT on the
    // receiver, same amount.
    assert_eq!(
        settlement.transaction.transaction_type,
        TransactionType::Transfer
    );
    let counterpart = settlement.counterpart.expect("transfer yields a counterpart");
    assert_eq!(counterpart.transaction_type, TransactionType::Deposit);
    assert_eq!(counterpart.bank_iban, receiver.iban);
    assert_eq!(counterpart.amount_cents, 30000);

    let all = service.list_transactions(None).await?;
    assert_eq!(all.len(), 2);

    let payer_ledger = service.list_transactions(Some(&payer.iban)).await?;
    assert_eq!(payer_ledger.len(), 1);
    assert_eq!(payer_ledger[0].iban, receiver.iban);

    Ok(())
}

#[tokio::test]
async fn test_transfer_insufficient_funds_leaves_no_trace() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let (payer, receiver) = payer_and_receiver(&service, 10000, 20000).await?;

    let err = service
        .transfer(&payer.iban, &receiver.iban, 30000, "John", "Doe")
        .await
        .unwrap_err();

    assert!(matches!(err, BankError::InsufficientFunds { .. }));
    assert_eq!(service.balance(&payer.iban).await?, 10000);
    assert_eq!(service.balance(&receiver.iban).await?, 20000);
    assert!(service.list_transactions(None).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_transfer_to_missing_destination() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let payer = open_account(&service, "John", "Doe", Country::Pl, 100000).await?;

    let err = service
        .transfer(
            &payer.iban,
            "GB31232222221234567890",
            30000,
            "John",
            "Doe",
        )
        .await
        .unwrap_err();

    assert!(matches!(err, BankError::DestinationNotFound(_)));
    assert_eq!(service.balance(&payer.iban).await?, 100000);
    assert!(service.list_transactions(None).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_transfer_requires_destination() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let payer = open_account(&service, "John", "Doe", Country::Pl, 100000).await?;

    let err = service
        .record(
            &payer.iban,
            TransactionType::Transfer,
            30000,
            "John",
            "Doe",
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(err, BankError::Validation(_)));
    Ok(())
}

#[tokio::test]
async fn test_non_positive_amounts_rejected_before_ledger() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let account = open_account(&service, "John", "Doe", Country::Pl, 10000).await?;

    for amount in [0, -100] {
        for transaction_type in [
            TransactionType::Deposit,
            TransactionType::Withdrawal,
            TransactionType::Transfer,
        ] {
            let err = service
                .record(
                    &account.iban,
                    transaction_type,
                    amount,
                    "John",
                    "Doe",
                    Some(&account.iban),
                )
                .await
                .unwrap_err();
            assert!(matches!(err, BankError::InvalidAmount(_)));
        }
    }

    assert_eq!(service.balance(&account.iban).await?, 10000);
    assert!(service.list_transactions(None).await?.is_empty());

    Ok(())
}

// The receiving side's generated DEPOSIT shows the payer's name with
// first/last swapped, and references the payer's IBAN. Unusual, but
// it is the settlement contract consumers read.
#[tokio::test]
async fn test_counterpart_record_carries_swapped_payer_names() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let (payer, receiver) = payer_and_receiver(&service, 100000, 0).await?;

    service
        .transfer(&payer.iban, &receiver.iban, 30000, "John", "Doe")
        .await?;

    let receiver_ledger = service.list_transactions(Some(&receiver.iban)).await?;
    assert_eq!(receiver_ledger.len(), 1);
    assert_eq!(receiver_ledger[0].first_name, "Doe");
    assert_eq!(receiver_ledger[0].last_name, "John");
    assert_eq!(receiver_ledger[0].iban, payer.iban);

    Ok(())
}

#[tokio::test]
async fn test_counterpart_deposit_does_not_recurse() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let (payer, receiver) = payer_and_receiver(&service, 100000, 0).await?;

    service
        .transfer(&payer.iban, &receiver.iban, 30000, "John", "Doe")
        .await?;

    // One TRANSFER plus one DEPOSIT; a recursing counterpart would
    // have minted more.
    let all = service.list_transactions(None).await?;
    assert_eq!(all.len(), 2);
    assert_eq!(
        all.iter()
            .filter(|t| t.transaction_type == TransactionType::Deposit)
            .count(),
        1
    );

    Ok(())
}

#[tokio::test]
async fn test_account_lifecycle_scenario() -> Result<()> {
    let (service, _temp) = test_service().await?;

    // P created with country PL, balance 1000.00
    let p = open_account(&service, "John", "Doe", Country::Pl, 100000).await?;
    let q = open_account(&service, "Alice", "Smith", Country::Pl, 20000).await?;

    // Deposit 250.00 -> 1250.00
    service.deposit(&p.iban, 25000, "John", "Doe").await?;
    assert_eq!(service.balance(&p.iban).await?, 125000);

    // Transfer 300.00 to Q -> P 950.00, Q 500.00, two records
    service.transfer(&p.iban, &q.iban, 30000, "John", "Doe").await?;
    assert_eq!(service.balance(&p.iban).await?, 95000);
    assert_eq!(service.balance(&q.iban).await?, 50000);
    assert_eq!(service.list_transactions(None).await?.len(), 3);

    // Transfer 2000.00 -> rejected, P stays 950.00
    let err = service
        .transfer(&p.iban, &q.iban, 200000, "John", "Doe")
        .await
        .unwrap_err();
    assert!(matches!(err, BankError::InsufficientFunds { .. }));
    assert_eq!(service.balance(&p.iban).await?, 95000);

    Ok(())
}
