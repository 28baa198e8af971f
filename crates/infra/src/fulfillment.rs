//! Order fulfillment: the only place where orders and stock movements are
//! written together.
//!
//! Every operation follows the same shape:
//!
//! ```text
//! validate input
//!   ↓
//! acquire stock lease (all products, ascending id)
//!   ↓
//! check availability against the projection
//!   ↓
//! order store write lock → stage movements → commit ledger → store order
//!   ↓
//! release locks, publish committed facts
//! ```
//!
//! Publication happens after commit and is best-effort: a failed publish is
//! logged and never undoes the write.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use stockwise_catalog::CatalogStore;
use stockwise_core::{
    Aggregate, AggregateRoot, CustomerId, DomainError, DomainResult, OrderId, ProductId, StockShortfall, UserId,
};
use stockwise_events::{Event, EventBus, JsonEnvelope};
use stockwise_inventory::{ChangeType, MovementLedger, MovementRecorded, NewMovement, StockLease};
use stockwise_sales::{
    CancelOrder, CompleteOrder, Order, OrderCommand, OrderEvent, PlaceOrder, PricedLine, quantities_by_product,
};

use crate::order_store::OrderStore;

pub const STOCK_AGGREGATE: &str = "inventory.stock";
pub const ORDER_AGGREGATE: &str = "sales.order";

/// One requested order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderItem {
    pub product_id: ProductId,
    pub quantity: i64,
}

/// Input for `create_order`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewOrder {
    pub customer_id: Option<CustomerId>,
    pub items: Vec<OrderItem>,
    pub created_by: Option<UserId>,
}

/// Input for `adjust_stock`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockAdjustment {
    pub product_id: ProductId,
    pub change_type: ChangeType,
    /// As entered; the sign is normalized from `change_type` for `in`/`out`.
    pub quantity: i64,
    pub notes: String,
    pub recorded_by: Option<UserId>,
}

fn order_note(order_id: OrderId) -> String {
    format!("Order #{order_id}")
}

fn cancellation_note(order_id: OrderId) -> String {
    format!("Order #{order_id} cancelled")
}

#[derive(Debug)]
pub struct FulfillmentCoordinator<B> {
    catalog: Arc<CatalogStore>,
    ledger: Arc<MovementLedger>,
    orders: Arc<OrderStore>,
    bus: B,
}

impl<B> FulfillmentCoordinator<B>
where
    B: EventBus<JsonEnvelope>,
{
    pub fn new(catalog: Arc<CatalogStore>, ledger: Arc<MovementLedger>, orders: Arc<OrderStore>, bus: B) -> Self {
        Self {
            catalog,
            ledger,
            orders,
            bus,
        }
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }

    /// Place an order and reserve its stock as `out` movements, atomically.
    pub fn create_order(&self, input: NewOrder) -> DomainResult<Order> {
        if input.items.is_empty() {
            return Err(DomainError::validation("order must contain at least one line"));
        }
        if let Some(bad) = input.items.iter().find(|i| i.quantity <= 0) {
            return Err(DomainError::validation(format!(
                "quantity for product {} must be positive",
                bad.product_id
            )));
        }

        let lines = input
            .items
            .iter()
            .map(|item| {
                let product = self.catalog.get_product(item.product_id)?;
                Ok(PricedLine {
                    product_id: product.id,
                    quantity: item.quantity,
                    unit_price_snapshot: product.unit_price,
                })
            })
            .collect::<DomainResult<Vec<_>>>()?;
        if let Some(customer_id) = input.customer_id {
            self.catalog.get_customer(customer_id)?;
        }

        let requested = quantities_by_product(input.items.iter().map(|i| (i.product_id, i.quantity)));
        let lease = self.ledger.lock(requested.iter().map(|(p, _)| *p))?;
        self.ensure_available(&requested)?;

        let order_id = OrderId::new();
        let (order, events) = Order::empty(order_id).execute(&OrderCommand::PlaceOrder(PlaceOrder {
            order_id,
            customer_id: input.customer_id,
            lines,
            created_by: input.created_by,
            occurred_at: Utc::now(),
        }))?;

        let recorded = self.orders.with_write(|book| {
            // The customer may have been deleted since it was resolved above.
            if let Some(customer_id) = order.customer_id() {
                self.catalog.get_customer(customer_id)?;
            }

            let mut tx = self.ledger.begin(&lease)?;
            for line in order.lines() {
                tx.stage(
                    NewMovement::new(line.product_id, ChangeType::Out, -line.quantity, order_note(order_id))
                        .for_order(order_id)
                        .recorded_by(order.created_by()),
                )?;
            }
            book.insert(order.clone())?;
            match tx.commit() {
                Ok(recorded) => Ok(recorded),
                Err(err) => {
                    book.remove(order_id)?;
                    Err(err)
                }
            }
        })?;
        drop(lease);

        tracing::info!(
            order_id = %order_id,
            lines = order.lines().len(),
            total = %order.total_amount(),
            "order created"
        );
        self.publish_order_events(&order, 0, &events);
        self.publish_movements(&recorded);
        Ok(order)
    }

    /// Cancel a pending order, returning its stock with compensating `in` movements.
    pub fn cancel_order(&self, order_id: OrderId) -> DomainResult<Order> {
        let products: Vec<ProductId> = self
            .orders
            .get(order_id)?
            .lines()
            .iter()
            .map(|l| l.product_id)
            .collect();
        let lease = self.ledger.lock(products)?;

        let (order, version_before, events, recorded) = self.orders.with_write(|book| {
            let current = book.require(order_id)?;
            let version_before = current.version();
            let (next, events) = current.execute(&OrderCommand::CancelOrder(CancelOrder {
                order_id,
                occurred_at: Utc::now(),
            }))?;

            let mut tx = self.ledger.begin(&lease)?;
            for line in next.lines() {
                tx.stage(
                    NewMovement::new(line.product_id, ChangeType::In, line.quantity, cancellation_note(order_id))
                        .for_order(order_id)
                        .recorded_by(next.created_by()),
                )?;
            }
            let recorded = tx.commit()?;
            book.replace(next.clone())?;
            Ok((next, version_before, events, recorded))
        })?;
        drop(lease);

        tracing::info!(order_id = %order_id, "order cancelled");
        self.publish_order_events(&order, version_before, &events);
        self.publish_movements(&recorded);
        Ok(order)
    }

    /// Mark a pending order completed. No stock effect.
    pub fn complete_order(&self, order_id: OrderId) -> DomainResult<Order> {
        let (order, version_before, events) = self.orders.with_write(|book| {
            let current = book.require(order_id)?;
            let version_before = current.version();
            let (next, events) = current.execute(&OrderCommand::CompleteOrder(CompleteOrder {
                order_id,
                occurred_at: Utc::now(),
            }))?;
            book.replace(next.clone())?;
            Ok((next, version_before, events))
        })?;

        tracing::info!(order_id = %order_id, "order completed");
        self.publish_order_events(&order, version_before, &events);
        Ok(order)
    }

    /// Manual stock correction.
    pub fn adjust_stock(&self, input: StockAdjustment) -> DomainResult<MovementRecorded> {
        adjustment_delta(&input)?;
        if !self.catalog.contains_product(input.product_id)? {
            return Err(DomainError::not_found("product", input.product_id));
        }

        let lease = self.ledger.lock([input.product_id])?;
        self.adjust_stock_leased(&lease, input)
    }

    /// `adjust_stock` for a caller that already holds a lease on the product.
    pub fn adjust_stock_leased(&self, lease: &StockLease<'_>, input: StockAdjustment) -> DomainResult<MovementRecorded> {
        let delta = adjustment_delta(&input)?;
        if delta < 0 {
            self.ensure_available(&[(input.product_id, -delta)])?;
        }

        let mut tx = self.ledger.begin(lease)?;
        tx.stage(
            NewMovement::new(input.product_id, input.change_type, delta, input.notes).recorded_by(input.recorded_by),
        )?;
        let recorded = single(tx.commit()?)?;

        tracing::info!(
            product_id = %input.product_id,
            change_type = %input.change_type,
            delta,
            on_hand = recorded.on_hand_after,
            "stock adjusted"
        );
        self.publish_movements(std::slice::from_ref(&recorded));
        Ok(recorded)
    }

    /// Bring a product to an absolute quantity with one compensating
    /// `adjustment`. Returns `None` when it is already there.
    pub fn set_stock(
        &self,
        product_id: ProductId,
        target: i64,
        notes: &str,
        recorded_by: Option<UserId>,
    ) -> DomainResult<Option<MovementRecorded>> {
        if target < 0 {
            return Err(DomainError::validation("stock quantity cannot be negative"));
        }
        if notes.trim().is_empty() {
            return Err(DomainError::validation("notes cannot be empty"));
        }

        let lease = self.ledger.lock([product_id])?;
        let on_hand = self.ledger.projector().on_hand(product_id)?;
        let delta = target - on_hand;
        if delta == 0 {
            return Ok(None);
        }

        let mut tx = self.ledger.begin(&lease)?;
        tx.stage(NewMovement::new(product_id, ChangeType::Adjustment, delta, notes).recorded_by(recorded_by))?;
        let recorded = single(tx.commit()?)?;
        drop(lease);

        tracing::info!(product_id = %product_id, from = on_hand, to = target, "stock set");
        self.publish_movements(std::slice::from_ref(&recorded));
        Ok(Some(recorded))
    }

    /// Collect every shortfall before failing. Caller holds the lease.
    fn ensure_available(&self, requested: &[(ProductId, i64)]) -> DomainResult<()> {
        let projector = self.ledger.projector();
        let mut shortfalls = Vec::new();
        for &(product_id, quantity) in requested {
            let available = projector.on_hand(product_id)?;
            if available < quantity {
                shortfalls.push(StockShortfall {
                    product_id,
                    requested: quantity,
                    available,
                });
            }
        }
        if shortfalls.is_empty() {
            Ok(())
        } else {
            tracing::warn!(products = shortfalls.len(), "availability check failed");
            Err(DomainError::InsufficientStock(shortfalls))
        }
    }

    fn publish_order_events(&self, order: &Order, version_before: u64, events: &[OrderEvent]) {
        for (offset, event) in (1u64..).zip(events) {
            self.publish(order.id_typed(), ORDER_AGGREGATE, version_before + offset, event);
        }
    }

    fn publish_movements(&self, recorded: &[MovementRecorded]) {
        for r in recorded {
            self.publish(r.movement.product_id, STOCK_AGGREGATE, r.movement.sequence, r);
        }
    }

    fn publish<Ev>(&self, aggregate_id: impl Into<uuid::Uuid>, aggregate_type: &str, sequence: u64, event: &Ev)
    where
        Ev: Event + Serialize,
    {
        let envelope = match JsonEnvelope::from_event(aggregate_id, aggregate_type, sequence, event) {
            Ok(envelope) => envelope,
            Err(err) => {
                tracing::warn!(event_type = event.event_type(), error = %err, "failed to serialize event");
                return;
            }
        };
        if let Err(err) = self.bus.publish(envelope) {
            tracing::warn!(event_type = event.event_type(), error = ?err, "failed to publish event");
        }
    }
}

/// Notes check plus sign normalization; returns the signed delta.
fn adjustment_delta(input: &StockAdjustment) -> DomainResult<i64> {
    if input.notes.trim().is_empty() {
        return Err(DomainError::validation("notes cannot be empty"));
    }
    input.change_type.signed_delta(input.quantity)
}

fn single(mut recorded: Vec<MovementRecorded>) -> DomainResult<MovementRecorded> {
    recorded
        .pop()
        .ok_or_else(|| DomainError::storage("ledger commit returned no movement"))
}
