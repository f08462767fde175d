//! Order header, line items and the status machine.

use core::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use railshop_catalog::Product;
use railshop_core::{CustomerId, DomainError, OrderId, ProductCode};

/// Order status lifecycle.
///
/// Transitions are forward-only: `Pending → Confirmed → Fulfilled`. The
/// store rejects any update that is not in the allowed-transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Fulfilled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Confirmed => "CONFIRMED",
            Self::Fulfilled => "FULFILLED",
        }
    }

    /// Allowed-transition table. Self-transitions are not allowed; a status
    /// never moves backwards.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Confirmed) | (Self::Confirmed, Self::Fulfilled)
        )
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "CONFIRMED" => Ok(Self::Confirmed),
            "FULFILLED" => Ok(Self::Fulfilled),
            other => Err(DomainError::validation(format!(
                "unknown order status [{other}]"
            ))),
        }
    }
}

/// One order line: a product code and the quantity ordered.
///
/// `product` is a snapshot cached at `add_item` time for display purposes
/// only. Totals and stock checks always re-resolve the code against the
/// catalog; hydrated orders loaded from the store carry no snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_code: ProductCode,
    pub quantity: u32,
    pub product: Option<Product>,
}

/// An order: header fields plus the lines it exclusively owns.
///
/// Lines never outlive the order and are only persisted inside the
/// order-creation transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: Option<OrderId>,
    pub customer_id: CustomerId,
    pub date: NaiveDate,
    pub status: OrderStatus,
    lines: Vec<OrderLine>,
}

impl Order {
    /// A fresh, unpersisted pending order for the given customer.
    pub fn new(customer_id: CustomerId, date: NaiveDate) -> Self {
        Self {
            id: None,
            customer_id,
            date,
            status: OrderStatus::Pending,
            lines: Vec::new(),
        }
    }

    /// Rehydrate a persisted order from its stored parts.
    pub fn from_parts(
        id: OrderId,
        customer_id: CustomerId,
        date: NaiveDate,
        status: OrderStatus,
        lines: Vec<OrderLine>,
    ) -> Self {
        Self {
            id: Some(id),
            customer_id,
            date,
            status,
            lines,
        }
    }

    /// Store-assigned id; `None` until the order has been created.
    pub fn id(&self) -> Option<OrderId> {
        self.id
    }

    /// Record the generated id after a successful creation.
    pub fn assign_id(&mut self, id: OrderId) {
        self.id = Some(id);
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Add `amount` of `product` to the cart.
    ///
    /// Merge semantics: if a line for this product code already exists its
    /// quantity is incremented, so an order never holds duplicate lines for
    /// one product. No stock bound is applied here.
    pub fn add_item(&mut self, product: &Product, amount: u32) {
        for line in &mut self.lines {
            if line.product_code == product.code {
                line.quantity += amount;
                return;
            }
        }

        self.lines.push(OrderLine {
            product_code: product.code.clone(),
            quantity: amount,
            product: Some(product.clone()),
        });
    }

    /// Remove every line for `code`. Removing an absent product is a no-op.
    pub fn remove_item(&mut self, code: &ProductCode) {
        self.lines.retain(|line| &line.product_code != code);
    }
}
