//! Catalog product row.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use railshop_core::{ProductCode, ProductKind};

/// A catalog product as stored: code, display name, current stock and price.
///
/// Owned by the catalog store; stock and price are mutated only through
/// explicit update operations, never through this struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub code: ProductCode,
    pub name: String,
    pub stock_level: u32,
    pub price: Decimal,
}

impl Product {
    /// Family tag of this product, derived from its code.
    pub fn kind(&self) -> Option<ProductKind> {
        self.code.kind()
    }

    pub fn is_component(&self) -> bool {
        self.code.is_component()
    }

    pub fn is_boxed_set(&self) -> bool {
        self.code.is_boxed_set()
    }
}
