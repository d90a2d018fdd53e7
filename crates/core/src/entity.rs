//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// An account is an entity: its balance changes, its identifier never does.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + Ord + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
