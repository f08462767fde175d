//! Connection bootstrap, schema and sqlx error mapping.

use core::str::FromStr;

use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;

use railshop_core::{DomainError, DomainResult};

use crate::config::StoreConfig;

/// Logical schema. `bank_details` holds ciphertext in `card_number` and
/// `security_code`; plaintext never reaches this layer.
const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS products (
    code        TEXT PRIMARY KEY,
    name        TEXT NOT NULL,
    stock_level INTEGER NOT NULL CHECK (stock_level >= 0),
    price       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS components (
    code  TEXT PRIMARY KEY REFERENCES products (code),
    brand TEXT NOT NULL,
    era   TEXT NOT NULL,
    gauge TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS locomotives (
    code          TEXT PRIMARY KEY REFERENCES components (code),
    price_bracket TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS controllers (
    code         TEXT PRIMARY KEY REFERENCES components (code),
    control_type TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS tracks (
    code      TEXT PRIMARY KEY REFERENCES components (code),
    curvature TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS boxed_set_contents (
    box_set_code TEXT NOT NULL REFERENCES products (code),
    content_code TEXT NOT NULL REFERENCES products (code),
    quantity     INTEGER NOT NULL CHECK (quantity > 0),
    PRIMARY KEY (box_set_code, content_code)
);

CREATE TABLE IF NOT EXISTS orders (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    customer_id INTEGER NOT NULL,
    order_date  TEXT NOT NULL,
    status      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS order_lines (
    order_id     INTEGER NOT NULL REFERENCES orders (id),
    product_code TEXT NOT NULL REFERENCES products (code),
    quantity     INTEGER NOT NULL CHECK (quantity > 0)
);

CREATE TABLE IF NOT EXISTS bank_details (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    card_name        TEXT NOT NULL,
    card_holder_name TEXT NOT NULL,
    card_number      TEXT NOT NULL,
    expiry_date      TEXT NOT NULL,
    security_code    TEXT NOT NULL
);
"#;

/// Open a pooled connection to the configured database and ensure the
/// schema exists.
pub async fn connect(config: &StoreConfig) -> DomainResult<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&config.database_url)
        .map_err(|e| map_sqlx_error("parse_database_url", e))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .map_err(|e| map_sqlx_error("connect", e))?;

    apply_schema(&pool).await?;
    Ok(pool)
}

/// Create any missing tables. Idempotent.
pub async fn apply_schema(pool: &SqlitePool) -> DomainResult<()> {
    sqlx::raw_sql(SCHEMA)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("apply_schema", e))?;
    Ok(())
}

/// Map sqlx errors into the domain's `Store` variant, tagged with the
/// failing operation.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> DomainError {
    match err {
        sqlx::Error::Database(db_err) => DomainError::store(format!(
            "database error in {operation}: {}",
            db_err.message()
        )),
        sqlx::Error::PoolClosed => {
            DomainError::store(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::RowNotFound => {
            DomainError::store(format!("unexpected row not found in {operation}"))
        }
        _ => DomainError::store(format!("sqlx error in {operation}: {err}")),
    }
}

/// Parse a stored decimal column. SQLite has no decimal type, so prices are
/// persisted as canonical decimal strings; anything unparsable is corrupt.
pub(crate) fn parse_decimal(raw: &str, what: &str) -> DomainResult<Decimal> {
    Decimal::from_str(raw)
        .map_err(|_| DomainError::store(format!("stored {what} is not a valid decimal [{raw}]")))
}

/// Narrow a stored integer column to `u32`; negatives are corrupt data.
pub(crate) fn narrow_count(raw: i64, what: &str) -> DomainResult<u32> {
    u32::try_from(raw)
        .map_err(|_| DomainError::store(format!("stored {what} is out of range [{raw}]")))
}
