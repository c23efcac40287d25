//! Recipient normalization

use crate::InputError;

const SUBSCRIBER_DIGITS: usize = 10;

/// Turn a phone number as typed into a provider recipient id: digits only,
/// the last ten of them, behind the country code (no `+`).
pub fn normalize_phone(raw: &str, country_code: &str) -> Result<String, InputError> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() < SUBSCRIBER_DIGITS {
        return Err(InputError::InvalidPhone {
            phone: raw.to_string(),
            digits: digits.len(),
        });
    }
    let subscriber = &digits[digits.len() - SUBSCRIBER_DIGITS..];
    Ok(format!("{}{}", country_code, subscriber))
}
