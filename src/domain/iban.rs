//! Pseudo-IBAN generation for new accounts.
//!
//! The output is syntactically plausible, not a real IBAN: the two check
//! digits are random and the bank/branch identifier is a fixed literal
//! per country. Uniqueness is enforced by the store's unique key, not
//! here; a collision surfaces as a creation failure and the caller may
//! regenerate.

use rand::Rng;

use super::Country;

// Fixed bank/branch identifiers per country.
const PL_BRANCH: &str = "12345678";
const DE_BRANCH: &str = "87654321";
const GB_BRANCH: &str = "3123222222";

/// Generate a country-specific pseudo-IBAN.
///
/// - PL: PLkk BBBB BBBB MMMM MMMM MMMM MMMM MMMM (28 chars)
/// - DE: DEkk BBBB BBBB MMMM MMMM MM (22 chars)
/// - GB: GBkk BBBB SSSS SSCC CCCC CC (22 chars)
///
/// The digits are uniform over 0-9 from the thread-local RNG; a
/// cryptographically secure source is deliberately not required.
pub fn generate(country: Country) -> String {
    let check = random_digits(2);
    match country {
        Country::Pl => format!("PL{check}{PL_BRANCH}{}", random_digits(16)),
        Country::De => format!("DE{check}{DE_BRANCH}{}", random_digits(10)),
        Country::Gb => format!("GB{check}{GB_BRANCH}{}", random_digits(8)),
    }
}

/// Cheap shape check for explicitly supplied IBANs: two uppercase
/// letters followed by 13 to 30 digits. Real check-digit validation is
/// out of scope for a demo ledger.
pub fn is_well_formed(iban: &str) -> bool {
    let bytes = iban.as_bytes();
    if !(15..=32).contains(&bytes.len()) {
        return false;
    }
    bytes[..2].iter().all(|b| b.is_ascii_uppercase())
        && bytes[2..].iter().all(|b| b.is_ascii_digit())
}

pub(crate) fn random_digits(count: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| char::from(b'0' + rng.gen_range(0..10)))
        .collect()
}
