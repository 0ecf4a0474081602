use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shoplab_catalog::UnitPrice;
use shoplab_core::{DomainError, DomainResult, Entity, OrderId, OrderLineId, ProductId};

use crate::cart::{finite_amount, Quantity};

/// Line of a committed order.
///
/// `price` is the unit price frozen at checkout; later catalog edits never
/// reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: OrderLineId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub qty: Quantity,
    pub price: UnitPrice,
}

impl OrderLine {
    pub fn line_total(&self) -> f64 {
        self.price.value() * self.qty.value() as f64
    }
}

/// Committed order (header + lines). Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<OrderLine>,
}

impl Order {
    /// Sum of quantity x price-at-purchase, accumulated in line order.
    pub fn total(&self) -> f64 {
        self.lines.iter().fold(0.0, |acc, line| acc + line.line_total())
    }
}

impl Entity for Order {
    type Id = OrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Order under construction inside a checkout.
///
/// Lines are snapshotted one at a time in cart order while the running total
/// is kept; [`OrderDraft::finish`] refuses to produce an order without lines.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    id: OrderId,
    created_at: DateTime<Utc>,
    lines: Vec<OrderLine>,
    total: f64,
}

impl OrderDraft {
    pub fn new(id: OrderId, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            created_at,
            lines: Vec::new(),
            total: 0.0,
        }
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    /// Snapshot `price` for `product_id` and append the line.
    ///
    /// A line whose total, or the running total it produces, is not a finite
    /// number is refused and the draft is left unchanged.
    pub fn add_line(
        &mut self,
        product_id: ProductId,
        qty: Quantity,
        price: UnitPrice,
    ) -> DomainResult<&OrderLine> {
        let line = OrderLine {
            id: OrderLineId::new(),
            order_id: self.id,
            product_id,
            qty,
            price,
        };
        let line_total = finite_amount(line.line_total(), "line total")?;
        self.total = finite_amount(self.total + line_total, "order total")?;
        self.lines.push(line);
        // Just pushed; the vector is non-empty.
        Ok(&self.lines[self.lines.len() - 1])
    }

    pub fn finish(self) -> DomainResult<Order> {
        if self.lines.is_empty() {
            return Err(DomainError::invariant("an order must have at least one line"));
        }
        Ok(Order {
            id: self.id,
            created_at: self.created_at,
            lines: self.lines,
        })
    }
}
