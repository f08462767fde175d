//! Vault entry: a stored payment instrument.

use chrono::NaiveDate;

use railshop_core::BankDetailId;

/// A payment instrument with its sensitive fields in plaintext.
///
/// Instances only ever exist in memory: the store holds ciphertext for
/// `card_number` and `security_code`, and both are decrypted (or encrypted)
/// at the store boundary. `Debug` masks the sensitive fields so an entry can
/// never leak through logging.
#[derive(Clone, PartialEq, Eq)]
pub struct BankDetail {
    id: Option<BankDetailId>,
    pub card_name: String,
    pub card_holder_name: String,
    card_number: String,
    pub expiry_date: NaiveDate,
    security_code: String,
}

impl BankDetail {
    /// Rehydrate a persisted entry with decrypted sensitive fields.
    pub fn from_parts(
        id: BankDetailId,
        card_name: String,
        card_holder_name: String,
        card_number: String,
        expiry_date: NaiveDate,
        security_code: String,
    ) -> Self {
        Self {
            id: Some(id),
            card_name,
            card_holder_name,
            card_number,
            expiry_date,
            security_code,
        }
    }

    /// Store-assigned id; `None` until the entry has been created.
    pub fn id(&self) -> Option<BankDetailId> {
        self.id
    }

    pub fn card_number(&self) -> &str {
        &self.card_number
    }

    pub fn security_code(&self) -> &str {
        &self.security_code
    }

    /// Last four digits of the card number, for display labels.
    pub fn last_four(&self) -> &str {
        let split = self.card_number.len().saturating_sub(4);
        &self.card_number[split..]
    }
}

impl core::fmt::Debug for BankDetail {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BankDetail")
            .field("id", &self.id)
            .field("card_name", &self.card_name)
            .field("card_holder_name", &self.card_holder_name)
            .field("card_number", &format_args!("****{}", self.last_four()))
            .field("expiry_date", &self.expiry_date)
            .field("security_code", &"***")
            .finish()
    }
}

/// Request to create a vault entry. Sensitive fields are plaintext here and
/// encrypted by the store before the insert; `Debug` masks them.
#[derive(Clone, PartialEq, Eq)]
pub struct NewBankDetail {
    pub card_name: String,
    pub card_holder_name: String,
    pub card_number: String,
    pub expiry_date: NaiveDate,
    pub security_code: String,
}

impl core::fmt::Debug for NewBankDetail {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NewBankDetail")
            .field("card_name", &self.card_name)
            .field("card_holder_name", &self.card_holder_name)
            .field("card_number", &"****")
            .field("expiry_date", &self.expiry_date)
            .field("security_code", &"***")
            .finish()
    }
}
