use serde::{Deserialize, Serialize};

use shoplab_catalog::UnitPrice;
use shoplab_core::{DomainError, DomainResult, ProductId, ValueObject};

/// Quantity of a product on a cart or order line (always >= 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Quantity(i64);

impl Quantity {
    pub fn new(value: i64) -> DomainResult<Self> {
        if value < 1 {
            return Err(DomainError::validation("qty must be >= 1"));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> i64 {
        self.0
    }

    /// Additive merge used when the same product is added again.
    pub fn checked_add(self, other: Quantity) -> DomainResult<Self> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or_else(|| DomainError::validation("qty overflow"))
    }
}

impl ValueObject for Quantity {}

impl TryFrom<i64> for Quantity {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for i64 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

/// One (product, quantity) entry of a cart. At most one per product per cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub qty: Quantity,
}

/// A cart line joined with current catalog data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItemView {
    pub product_id: ProductId,
    pub name: String,
    pub price: UnitPrice,
    pub qty: Quantity,
    pub line_total: f64,
}

impl CartItemView {
    pub fn new(
        product_id: ProductId,
        name: String,
        price: UnitPrice,
        qty: Quantity,
    ) -> DomainResult<Self> {
        let line_total = finite_amount(price.value() * qty.value() as f64, "line total")?;
        Ok(Self {
            product_id,
            name,
            price,
            qty,
            line_total,
        })
    }
}

/// Money amounts must stay representable in JSON; infinity would render as `null`.
pub(crate) fn finite_amount(value: f64, what: &str) -> DomainResult<f64> {
    if !value.is_finite() {
        return Err(DomainError::validation(format!("{what} is out of range")));
    }
    Ok(value)
}

/// Priced view of a cart at current catalog prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub total: f64,
}

impl CartView {
    pub fn from_items(items: Vec<CartItemView>) -> DomainResult<Self> {
        let total = items.iter().fold(0.0, |acc, i| acc + i.line_total);
        let total = finite_amount(total, "cart total")?;
        Ok(Self { items, total })
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_below_one_is_rejected() {
        assert!(Quantity::new(0).is_err());
        assert!(Quantity::new(-3).is_err());
        assert_eq!(Quantity::new(1).unwrap().value(), 1);
    }

    #[test]
    fn quantities_add_up() {
        let q = Quantity::new(2).unwrap().checked_add(Quantity::new(3).unwrap()).unwrap();
        assert_eq!(q.value(), 5);
    }

    #[test]
    fn quantity_add_overflow_is_validation_error() {
        let big = Quantity::new(i64::MAX).unwrap();
        let err = big.checked_add(Quantity::new(1).unwrap()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn cart_view_totals_line_totals() {
        let a = CartItemView::new(
            ProductId::new(),
            "A".into(),
            UnitPrice::new(10.0).unwrap(),
            Quantity::new(2).unwrap(),
        )
        .unwrap();
        let b = CartItemView::new(
            ProductId::new(),
            "B".into(),
            UnitPrice::new(5.5).unwrap(),
            Quantity::new(1).unwrap(),
        )
        .unwrap();
        assert_eq!(a.line_total, 20.0);

        let view = CartView::from_items(vec![a, b]).unwrap();
        assert_eq!(view.total, 25.5);
        assert!(!view.is_empty());
        assert!(CartView::from_items(Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn overflowing_line_total_is_validation_error() {
        let err = CartItemView::new(
            ProductId::new(),
            "Yacht".into(),
            UnitPrice::new(1e300).unwrap(),
            Quantity::new(10_000_000_000).unwrap(),
        )
        .unwrap_err();
        assert_eq!(err, DomainError::validation("line total is out of range"));
    }

    #[test]
    fn overflowing_cart_total_is_validation_error() {
        let item = || {
            CartItemView::new(
                ProductId::new(),
                "Yacht".into(),
                UnitPrice::new(f64::MAX).unwrap(),
                Quantity::new(1).unwrap(),
            )
            .unwrap()
        };
        let err = CartView::from_items(vec![item(), item()]).unwrap_err();
        assert_eq!(err, DomainError::validation("cart total is out of range"));
    }
}
