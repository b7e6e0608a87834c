use serde::{Deserialize, Serialize};

use super::{Cents, iban};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Country {
    /// Poland
    Pl,
    /// Germany
    De,
    /// United Kingdom
    Gb,
}

impl Country {
    pub fn as_str(&self) -> &'static str {
        match self {
            Country::Pl => "PL",
            Country::De => "DE",
            Country::Gb => "GB",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PL" => Some(Country::Pl),
            "DE" => Some(Country::De),
            "GB" => Some(Country::Gb),
            _ => None,
        }
    }

    /// Total IBAN length for accounts issued in this country.
    pub fn iban_length(&self) -> usize {
        match self {
            Country::Pl => 28,
            Country::De => 22,
            Country::Gb => 22,
        }
    }
}

impl std::fmt::Display for Country {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A ledger account, keyed by IBAN.
///
/// The IBAN is the stable identity: external payment callbacks address
/// accounts by IBAN, never by an internal id. Holder names are
/// denormalized onto the account row; there is no separate holder
/// entity in this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub iban: String,
    pub first_name: String,
    pub last_name: String,
    pub country: Country,
    /// Never negative after a successful settlement. Mutated only
    /// through the repository's settlement path.
    pub balance_cents: Cents,
}

impl Account {
    /// Create a new account with a freshly generated IBAN and zero balance.
    pub fn new(first_name: String, last_name: String, country: Country) -> Self {
        Self {
            iban: iban::generate(country),
            first_name,
            last_name,
            country,
            balance_cents: 0,
        }
    }

    /// Use an explicitly supplied IBAN instead of a generated one.
    pub fn with_iban(mut self, iban: impl Into<String>) -> Self {
        self.iban = iban.into();
        self
    }

    /// Seed an opening balance. Opening balances are administrative and
    /// do not produce a ledger record.
    pub fn with_balance(mut self, balance_cents: Cents) -> Self {
        self.balance_cents = balance_cents;
        self
    }

    pub fn holder_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}
