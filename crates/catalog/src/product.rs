use serde::{Deserialize, Serialize};

use shoplab_core::{DomainError, DomainResult, Entity, ProductId, ValueObject};

/// Unit price of a product.
///
/// Stored and computed as a plain `f64`: no currency-specific rounding is applied
/// beyond native float precision.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct UnitPrice(f64);

impl UnitPrice {
    pub fn new(value: f64) -> DomainResult<Self> {
        if !value.is_finite() {
            return Err(DomainError::validation("price must be a finite number"));
        }
        if value < 0.0 {
            return Err(DomainError::validation("price must be >= 0"));
        }
        Ok(Self(value))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl ValueObject for UnitPrice {}

impl TryFrom<f64> for UnitPrice {
    type Error = DomainError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UnitPrice> for f64 {
    fn from(value: UnitPrice) -> Self {
        value.0
    }
}

/// Validated product fields, used for both create and update.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    name: String,
    price: UnitPrice,
}

impl NewProduct {
    /// Validate raw input: the name is trimmed and must not be empty.
    pub fn new(name: impl AsRef<str>, price: f64) -> DomainResult<Self> {
        let name = name.as_ref().trim();
        if name.is_empty() {
            return Err(DomainError::validation("name must not be empty"));
        }
        Ok(Self {
            name: name.to_string(),
            price: UnitPrice::new(price)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> UnitPrice {
        self.price
    }

    /// Attach an identity, producing the catalog record.
    pub fn into_product(self, id: ProductId) -> Product {
        Product {
            id,
            name: self.name,
            price: self.price,
        }
    }
}

/// Catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: UnitPrice,
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
