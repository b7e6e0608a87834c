use chrono::{DateTime, Datelike, Months, Utc};
use serde::{Deserialize, Serialize};

use super::iban::random_digits;

pub const CARD_NUMBER_LEN: usize = 16;
pub const CVC_LEN: usize = 3;

/// Card network, resolved once from the leading digit of the card
/// number and stored as a tagged variant from then on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CardNetwork {
    Visa,
    MasterCard,
}

impl CardNetwork {
    /// Display label, as printed on statements.
    pub fn as_str(&self) -> &'static str {
        match self {
            CardNetwork::Visa => "Visa",
            CardNetwork::MasterCard => "Master Card",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Visa" => Some(CardNetwork::Visa),
            "Master Card" => Some(CardNetwork::MasterCard),
            _ => None,
        }
    }

    /// Leading digit of card numbers on this network.
    pub fn leading_digit(&self) -> char {
        match self {
            CardNetwork::Visa => '4',
            CardNetwork::MasterCard => '5',
        }
    }

    pub fn from_leading_digit(digit: char) -> Option<Self> {
        match digit {
            '4' => Some(CardNetwork::Visa),
            '5' => Some(CardNetwork::MasterCard),
            _ => None,
        }
    }
}

impl std::fmt::Display for CardNetwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a set of card fields failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardFieldError {
    BadNumber,
    UnknownNetwork,
    BadCvc,
    BadExpiry,
}

impl std::fmt::Display for CardFieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CardFieldError::BadNumber => {
                write!(f, "card number must be {CARD_NUMBER_LEN} digits")
            }
            CardFieldError::UnknownNetwork => write!(f, "wrong id card"),
            CardFieldError::BadCvc => write!(f, "CVC must be {CVC_LEN} digits"),
            CardFieldError::BadExpiry => write!(f, "expiry must be MM/YYYY"),
        }
    }
}

impl std::error::Error for CardFieldError {}

/// Validate a card number and resolve its network.
pub fn validate_card_number(number: &str) -> Result<CardNetwork, CardFieldError> {
    if number.len() != CARD_NUMBER_LEN || !number.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CardFieldError::BadNumber);
    }
    number
        .chars()
        .next()
        .and_then(CardNetwork::from_leading_digit)
        .ok_or(CardFieldError::UnknownNetwork)
}

pub fn validate_cvc(cvc: &str) -> Result<(), CardFieldError> {
    if cvc.len() != CVC_LEN || !cvc.bytes().all(|b| b.is_ascii_digit()) {
        return Err(CardFieldError::BadCvc);
    }
    Ok(())
}

/// Parse an "MM/YYYY" expiry into (month, year).
pub fn parse_valid_until(s: &str) -> Result<(u32, i32), CardFieldError> {
    let (month_str, year_str) = s.split_once('/').ok_or(CardFieldError::BadExpiry)?;
    if month_str.len() != 2 || year_str.len() != 4 {
        return Err(CardFieldError::BadExpiry);
    }
    let month: u32 = month_str.parse().map_err(|_| CardFieldError::BadExpiry)?;
    let year: i32 = year_str.parse().map_err(|_| CardFieldError::BadExpiry)?;
    if !(1..=12).contains(&month) {
        return Err(CardFieldError::BadExpiry);
    }
    Ok((month, year))
}

/// Default card expiry: 24 months from `now`, normalized to the first
/// day of the expiry month and rendered as "MM/YYYY".
pub fn default_valid_until(now: DateTime<Utc>) -> String {
    let expiry = now
        .date_naive()
        .checked_add_months(Months::new(24))
        .unwrap_or(now.date_naive());
    format!("{:02}/{}", expiry.month(), expiry.year())
}

/// A payment card bound one-to-one to an account per network: an
/// account holds at most one Visa and at most one Master Card.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Card {
    /// Assigned by the repository on insert.
    pub id: i64,
    pub bank_iban: String,
    /// 16 numeric digits, globally unique.
    pub id_card: String,
    /// 3 numeric digits.
    pub cvc: String,
    pub network: CardNetwork,
    /// "MM/YYYY"; the card stays usable through the end of this month.
    pub valid_until: String,
    pub is_valid: bool,
}

impl Card {
    /// Issue a new card administratively: network leading digit plus 15
    /// random digits, random CVC, default expiry. Number collisions are
    /// caught by the store's unique key.
    pub fn issue(bank_iban: impl Into<String>, network: CardNetwork, now: DateTime<Utc>) -> Self {
        let id_card = format!(
            "{}{}",
            network.leading_digit(),
            random_digits(CARD_NUMBER_LEN - 1)
        );
        Self {
            id: 0,
            bank_iban: bank_iban.into(),
            id_card,
            cvc: random_digits(CVC_LEN),
            network,
            valid_until: default_valid_until(now),
            is_valid: true,
        }
    }

    /// True once `now` is past the end of the expiry month.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match parse_valid_until(&self.valid_until) {
            Ok((month, year)) => (year, month) < (now.year(), now.month()),
            // An unparseable expiry never validates as usable.
            Err(_) => true,
        }
    }
}
