//! Card detail validation.
//!
//! Checks run in a fixed order and the first failure wins: field presence,
//! Luhn checksum, expiry shape and date, security-code length. Validation
//! error messages never contain the card number or security code.

use chrono::NaiveDate;

use railshop_core::{DomainError, DomainResult};

/// Mod-10 (Luhn) checksum: double every second digit from the right,
/// subtract 9 where the doubling exceeds 9, and require the digit sum to be
/// divisible by 10. Non-digit or empty input is invalid.
pub fn luhn_valid(number: &str) -> bool {
    if number.is_empty() || !number.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    let sum: u32 = number
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let mut digit = u32::from(b - b'0');
            if i % 2 == 1 {
                digit *= 2;
                if digit > 9 {
                    digit -= 9;
                }
            }
            digit
        })
        .sum();

    sum % 10 == 0
}

/// Parse a strictly `YYYY-MM-DD`-shaped expiry date.
pub fn parse_expiry(expiry: &str) -> DomainResult<NaiveDate> {
    let shape_ok = expiry.len() == 10
        && expiry.bytes().enumerate().all(|(i, b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        });
    if !shape_ok {
        return Err(DomainError::validation("expiry date was an invalid format"));
    }

    NaiveDate::parse_from_str(expiry, "%Y-%m-%d")
        .map_err(|_| DomainError::validation(format!("expiry date is not a real date [{expiry}]")))
}

/// Validate the card fields of a create request, with `expiry` already
/// parsed. Used by the store as defence in depth even when the caller has
/// run [`validate_bank_details`] first.
pub fn validate_card_fields(
    card_number: &str,
    expiry: NaiveDate,
    security_code: &str,
    today: NaiveDate,
) -> DomainResult<()> {
    if !luhn_valid(card_number) {
        return Err(DomainError::validation(
            "card number invalid, failed Luhn check",
        ));
    }
    if expiry < today {
        return Err(DomainError::validation(format!("card is expired [{expiry}]")));
    }
    if !(security_code.len() == 3 || security_code.len() == 4) {
        return Err(DomainError::validation(
            "security code was an invalid length",
        ));
    }
    Ok(())
}

/// Full validation of raw (string) card details as entered by a customer.
///
/// `today` is the comparison date for expiry; callers pass the current
/// date from their clock.
pub fn validate_bank_details(
    card_name: &str,
    card_number: &str,
    card_holder_name: &str,
    expiry: &str,
    security_code: &str,
    today: NaiveDate,
) -> DomainResult<()> {
    if card_name.is_empty()
        || card_number.is_empty()
        || card_holder_name.is_empty()
        || expiry.is_empty()
        || security_code.is_empty()
    {
        return Err(DomainError::validation(
            "please enter a valid card number, expiry date and security code",
        ));
    }

    // Checksum before the expiry shape: the first failing check is the one
    // reported.
    if !luhn_valid(card_number) {
        return Err(DomainError::validation(
            "card number invalid, failed Luhn check",
        ));
    }

    let expiry = parse_expiry(expiry)?;
    validate_card_fields(card_number, expiry, security_code, today)
}
