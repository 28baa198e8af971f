//! `stockwise-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod aggregate;
pub mod entity;
pub mod error;
pub mod id;
pub mod page;
pub mod value_object;

pub use aggregate::{Aggregate, AggregateRoot};
pub use entity::Entity;
pub use error::{DomainError, DomainResult, StockShortfall};
pub use id::{CustomerId, MovementId, OrderId, ProductId, SupplierId, UserId};
pub use page::Page;
pub use value_object::{Money, ValueObject};
