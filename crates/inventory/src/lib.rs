//! Inventory domain: the movement ledger and the stock projection derived
//! from it.
//!
//! Quantities are never stored on products. The ledger is the source of
//! truth; the projector keeps an incrementally maintained counter per product
//! that can always be rebuilt by replaying the ledger.

pub mod ledger;
pub mod locks;
pub mod movement;
pub mod projector;

pub use ledger::{LedgerTransaction, MovementLedger};
pub use locks::{StockLease, StockLocks};
pub use movement::{ChangeType, InventoryMovement, MovementRecorded, NewMovement};
pub use projector::StockProjector;
