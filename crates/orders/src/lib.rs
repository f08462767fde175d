//! `railshop-orders` — order domain.
//!
//! An order is a header (customer, date, status) plus the line items it
//! exclusively owns. Cart mutation (merge/remove) is pure; persistence,
//! totals and stock checks live in `railshop-store` because they must see
//! live catalog state.

pub mod order;

pub use order::{Order, OrderLine, OrderStatus};
