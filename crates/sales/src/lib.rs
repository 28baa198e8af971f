//! Sales orders: lines with frozen price snapshots and a closed status
//! state machine.
//!
//! Pure, deterministic domain logic (no IO, no storage). Stock effects are
//! coordinated outside this crate.

pub mod order;

pub use order::{
    CancelOrder, CompleteOrder, Order, OrderCancelled, OrderCommand, OrderCompleted, OrderEvent, OrderLine,
    OrderPlaced, OrderStatus, PlaceOrder, PricedLine, order_total, quantities_by_product,
};
