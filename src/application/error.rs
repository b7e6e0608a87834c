use thiserror::Error;

use crate::domain::Cents;

#[derive(Error, Debug)]
pub enum BankError {
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Duplicate IBAN: {0}")]
    DuplicateIban(String),

    #[error("Transfer destination not found: {0}")]
    DestinationNotFound(String),

    #[error("Insufficient funds on {iban}: balance {balance}, required {required}")]
    InsufficientFunds {
        iban: String,
        balance: Cents,
        required: Cents,
    },

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Card not found: {0}")]
    CardNotFound(String),

    #[error("Duplicate card number: {0}")]
    DuplicateCard(String),

    #[error("Card declined: {0}")]
    CardDeclined(String),

    #[error("Order not found: {0}")]
    OrderNotFound(i64),

    #[error("Order {0} is already paid")]
    OrderAlreadyPaid(i64),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}
