//! Payment vault store: encrypted at rest, plaintext only in memory.

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use tracing::{instrument, warn};

use railshop_core::{BankDetailId, DomainError, DomainResult};
use railshop_vault::{decrypt, encrypt, validate_card_fields, BankDetail, EncryptionKey, NewBankDetail};

use crate::db::map_sqlx_error;

/// Read/write access to stored payment instruments.
///
/// `card_number` and `security_code` are encrypted with the caller-supplied
/// key before any insert and decrypted after any read; the store only ever
/// holds ciphertext and nothing sensitive is traced.
#[derive(Debug, Clone)]
pub struct VaultStore {
    pool: SqlitePool,
}

impl VaultStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Validate, encrypt and persist a new payment instrument.
    ///
    /// Card fields are re-validated here even when the caller already ran
    /// the full string validation (defence in depth). The returned entity
    /// carries the plaintext fields and the generated id; the stored row
    /// holds ciphertext only.
    #[instrument(skip(self, detail, key), err)]
    pub async fn create(
        &self,
        detail: NewBankDetail,
        key: &EncryptionKey,
    ) -> DomainResult<BankDetail> {
        let today = Utc::now().date_naive();
        validate_card_fields(
            &detail.card_number,
            detail.expiry_date,
            &detail.security_code,
            today,
        )?;

        let encrypted_number = encrypt(&detail.card_number, key)?;
        let encrypted_code = encrypt(&detail.security_code, key)?;

        let result = sqlx::query(
            "INSERT INTO bank_details (card_name, card_holder_name, card_number, expiry_date, security_code)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&detail.card_name)
        .bind(&detail.card_holder_name)
        .bind(&encrypted_number)
        .bind(detail.expiry_date)
        .bind(&encrypted_code)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_bank_detail", e))?;

        let id = BankDetailId::new(result.last_insert_rowid());
        Ok(BankDetail::from_parts(
            id,
            detail.card_name,
            detail.card_holder_name,
            detail.card_number,
            detail.expiry_date,
            detail.security_code,
        ))
    }

    /// Fetch and decrypt one vault entry.
    ///
    /// `NotFound` when no row exists. A decryption failure means the
    /// presented key does not match the record (someone reading a vault
    /// entry that is not theirs) and is surfaced as `WrongKey`, distinct
    /// from `NotFound`, and logged as a security event (id only).
    #[instrument(skip(self, key), fields(bank_detail_id = %id), err)]
    pub async fn fetch_by_id(
        &self,
        id: BankDetailId,
        key: &EncryptionKey,
    ) -> DomainResult<BankDetail> {
        let row = sqlx::query(
            "SELECT id, card_name, card_holder_name, card_number, expiry_date, security_code
             FROM bank_details WHERE id = ?",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("fetch_bank_detail", e))?;

        let row = row.ok_or_else(|| DomainError::not_found(format!("bank detail [{id}]")))?;

        let card_name: String = row
            .try_get("card_name")
            .map_err(|e| map_sqlx_error("bank_detail_row", e))?;
        let card_holder_name: String = row
            .try_get("card_holder_name")
            .map_err(|e| map_sqlx_error("bank_detail_row", e))?;
        let encrypted_number: String = row
            .try_get("card_number")
            .map_err(|e| map_sqlx_error("bank_detail_row", e))?;
        let expiry_date: chrono::NaiveDate = row
            .try_get("expiry_date")
            .map_err(|e| map_sqlx_error("bank_detail_row", e))?;
        let encrypted_code: String = row
            .try_get("security_code")
            .map_err(|e| map_sqlx_error("bank_detail_row", e))?;

        let card_number = self.decrypt_field(id, &encrypted_number, key)?;
        let security_code = self.decrypt_field(id, &encrypted_code, key)?;

        Ok(BankDetail::from_parts(
            id,
            card_name,
            card_holder_name,
            card_number,
            expiry_date,
            security_code,
        ))
    }

    fn decrypt_field(
        &self,
        id: BankDetailId,
        ciphertext: &str,
        key: &EncryptionKey,
    ) -> DomainResult<String> {
        match decrypt(ciphertext, key) {
            Ok(plaintext) => Ok(plaintext),
            Err(DomainError::WrongKey) => {
                warn!(bank_detail_id = %id, "vault entry read with a non-matching key");
                Err(DomainError::WrongKey)
            }
            Err(other) => Err(other),
        }
    }
}
