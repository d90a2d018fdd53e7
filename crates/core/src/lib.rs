//! `teller-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no locking, no IO).

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use entity::Entity;
pub use error::DomainError;
pub use id::CustomerId;
pub use money::{Money, MoneyTotal};
pub use value_object::ValueObject;
