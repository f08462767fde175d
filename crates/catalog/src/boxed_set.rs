//! Boxed sets: products composed of quantities of other products.

use serde::{Deserialize, Serialize};

use crate::component::Component;
use crate::product::Product;

/// A fully expanded boxed set: its own product row plus two ordered content
/// lists, one for atomic components and one for nested boxed sets.
///
/// A set with no content rows has both lists empty; that is a valid set,
/// not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxedSet {
    pub product: Product,
    pub components: Vec<(Component, u32)>,
    pub boxed_sets: Vec<(BoxedSet, u32)>,
}

impl BoxedSet {
    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.boxed_sets.is_empty()
    }

    /// Total number of direct content lines (components plus nested sets).
    pub fn content_lines(&self) -> usize {
        self.components.len() + self.boxed_sets.len()
    }
}
