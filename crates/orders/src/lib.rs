//! Cart and order domain module.
//!
//! This crate contains the business rules for carts and committed orders,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage).
//! Persisting them atomically is the infra layer's job.

pub mod cart;
pub mod order;

pub use cart::{CartItemView, CartLine, CartView, Quantity};
pub use order::{Order, OrderDraft, OrderLine};
