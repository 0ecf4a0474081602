//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new one; constructors are where validation happens, so a value that
/// exists is a value that is valid.
///
/// ```ignore
/// #[derive(Debug, Clone, Copy, PartialEq)]
/// struct UnitPrice(f64);
///
/// impl ValueObject for UnitPrice {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
