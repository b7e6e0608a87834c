use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Cents;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Transfer,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdrawal => "WITHDRAWAL",
            TransactionType::Transfer => "TRANSFER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DEPOSIT" => Some(TransactionType::Deposit),
            "WITHDRAWAL" => Some(TransactionType::Withdrawal),
            "TRANSFER" => Some(TransactionType::Transfer),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One line of an account's ledger. Records are immutable once
/// persisted; the only way they disappear is a cascading account
/// deletion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Sequential id, assigned by the repository on insert.
    pub id: i64,
    /// IBAN of the account this balance line belongs to.
    pub bank_iban: String,
    /// Counterparty name fields as supplied by the caller.
    pub first_name: String,
    pub last_name: String,
    pub transaction_type: TransactionType,
    /// Always positive.
    pub amount_cents: Cents,
    /// Destination IBAN for transfers, reference IBAN otherwise.
    pub iban: String,
    /// Server-assigned creation timestamp.
    pub date: DateTime<Utc>,
}

impl TransactionRecord {
    /// Build a record pending insertion. The id is assigned by the
    /// repository; the date is stamped here.
    pub fn new(
        bank_iban: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        transaction_type: TransactionType,
        amount_cents: Cents,
        iban: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            bank_iban: bank_iban.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
            transaction_type,
            amount_cents,
            iban: iban.into(),
            date: Utc::now(),
        }
    }

    /// The system-generated DEPOSIT that lands on the counterparty's
    /// ledger when this TRANSFER settles.
    ///
    /// The payer's name fields arrive swapped (first <-> last) on the
    /// receiving entry, and the reference IBAN points back at the
    /// payer. Unusual, but external consumers read the receiving side
    /// this way, so both stay as they are.
    pub fn counterpart_deposit(&self) -> Self {
        TransactionRecord::new(
            self.iban.clone(),
            self.last_name.clone(),
            self.first_name.clone(),
            TransactionType::Deposit,
            self.amount_cents,
            self.bank_iban.clone(),
        )
    }

    /// True for transfers, which settle against a second account.
    pub fn is_transfer(&self) -> bool {
        self.transaction_type == TransactionType::Transfer
    }
}
