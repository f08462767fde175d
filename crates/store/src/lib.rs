//! `railshop-store` — SQLite-backed stores for catalog, orders and the
//! payment vault.
//!
//! Every mutating sequence runs inside one transaction: commit only on full
//! success, rollback on every other exit path. No stock or price is cached
//! in process; totals and stock checks always read the latest committed
//! state.

pub mod catalog;
pub mod config;
pub mod db;
pub mod orders;
pub mod vault;

#[cfg(test)]
mod integration_tests;

pub use catalog::CatalogStore;
pub use config::StoreConfig;
pub use db::{apply_schema, connect};
pub use orders::OrderStore;
pub use vault::VaultStore;
