use shoplab_core::CartId;

/// Cart a request acts on.
///
/// Inserted by the cart middleware for every cart and checkout route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartContext {
    cart_id: CartId,
}

impl CartContext {
    pub fn new(cart_id: CartId) -> Self {
        Self { cart_id }
    }

    pub fn cart_id(&self) -> &CartId {
        &self.cart_id
    }
}
