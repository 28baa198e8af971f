//! Domain events and their post-commit distribution.
//!
//! Events describe facts that have already been committed (a movement was
//! recorded, an order was placed). They are published only after the write
//! that produced them succeeded; the ledger and order store remain the source
//! of truth.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::{EventEnvelope, JsonEnvelope};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
