//! Application layer: the stock engine and everything that composes the
//! domain crates (fulfillment, order storage, reports, boundary DTOs,
//! configuration, demo seeding).

pub mod config;
pub mod dto;
pub mod engine;
pub mod fulfillment;
pub mod order_store;
pub mod reports;
pub mod seed;


pub use config::{ConfigError, EngineConfig};
pub use engine::StockEngine;
pub use fulfillment::{FulfillmentCoordinator, NewOrder, OrderItem, StockAdjustment};
pub use order_store::{OrderBook, OrderStore};
pub use reports::Reports;
