//! `railshop-vault` — stored payment instruments.
//!
//! Card data is validated (Luhn checksum, expiry, security-code shape) and
//! the sensitive fields are encrypted with a caller-supplied symmetric key
//! before anything reaches the store. How that key is provisioned is out of
//! scope; this crate only defines the contract.

pub mod bank_detail;
pub mod crypto;
pub mod validate;

pub use bank_detail::{BankDetail, NewBankDetail};
pub use crypto::{decrypt, encrypt, EncryptionKey};
pub use validate::{luhn_valid, parse_expiry, validate_bank_details, validate_card_fields};
