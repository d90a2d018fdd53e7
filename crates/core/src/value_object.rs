//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. `Money` is a value
/// object; an account holding money is an entity.
///
/// ```ignore
/// let a = Money::from_minor(100);
/// let b = Money::from_minor(100);
/// assert_eq!(a, b);  // Equal by value, not identity
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
