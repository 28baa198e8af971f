use std::sync::RwLock;

use stockwise_catalog::{CustomerReferences, EntityTable, ProductReferences};
use stockwise_core::{CustomerId, DomainError, DomainResult, OrderId, Page, ProductId};
use stockwise_sales::{Order, OrderStatus};

/// Orders keyed by id, in placement order.
#[derive(Debug, Default)]
pub struct OrderBook {
    orders: EntityTable<Order>,
}

impl OrderBook {
    pub fn get(&self, order_id: OrderId) -> Option<&Order> {
        self.orders.get(&order_id)
    }

    pub fn require(&self, order_id: OrderId) -> DomainResult<&Order> {
        self.orders.require(&order_id)
    }

    pub fn contains(&self, order_id: OrderId) -> bool {
        self.orders.contains(&order_id)
    }

    pub fn insert(&mut self, order: Order) -> DomainResult<()> {
        self.orders.insert(order)
    }

    pub fn replace(&mut self, order: Order) -> DomainResult<()> {
        self.orders.replace(order)
    }

    pub(crate) fn remove(&mut self, order_id: OrderId) -> DomainResult<Order> {
        self.orders.remove(&order_id)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Order> {
        self.orders.iter()
    }

    pub fn count_with_status(&self, status: OrderStatus) -> usize {
        self.iter().filter(|o| o.status() == status).count()
    }
}

impl CustomerReferences for OrderBook {
    fn customer_referenced(&self, customer_id: CustomerId) -> bool {
        self.iter().any(|o| o.customer_id() == Some(customer_id))
    }
}

impl ProductReferences for OrderBook {
    fn product_referenced(&self, product_id: ProductId) -> bool {
        self.iter().any(|o| o.lines().iter().any(|l| l.product_id == product_id))
    }
}

/// Shared order storage.
///
/// Access goes through closures so callers can run a read-check-write
/// sequence under one lock (e.g. "customer exists, then insert order").
#[derive(Debug, Default)]
pub struct OrderStore {
    book: RwLock<OrderBook>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_read<T>(&self, f: impl FnOnce(&OrderBook) -> DomainResult<T>) -> DomainResult<T> {
        let book = self.book.read().map_err(|_| DomainError::poisoned("order store"))?;
        f(&book)
    }

    pub fn with_write<T>(&self, f: impl FnOnce(&mut OrderBook) -> DomainResult<T>) -> DomainResult<T> {
        let mut book = self.book.write().map_err(|_| DomainError::poisoned("order store"))?;
        f(&mut book)
    }

    pub fn get(&self, order_id: OrderId) -> DomainResult<Order> {
        self.with_read(|book| book.require(order_id).cloned())
    }

    /// Most recent first.
    pub fn list(&self, page: Page) -> DomainResult<Vec<Order>> {
        self.with_read(|book| {
            let newest_first: Vec<&Order> = book.iter().collect();
            Ok(page.apply(newest_first.into_iter().rev()).cloned().collect())
        })
    }

    pub fn len(&self) -> DomainResult<usize> {
        self.with_read(|book| Ok(book.len()))
    }

    pub fn is_empty(&self) -> DomainResult<bool> {
        self.with_read(|book| Ok(book.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stockwise_core::{Aggregate, Money};
    use stockwise_sales::{OrderCommand, PlaceOrder, PricedLine};

    fn order(customer_id: Option<CustomerId>, product_id: ProductId) -> Order {
        let order_id = OrderId::new();
        let (order, _) = Order::empty(order_id)
            .execute(&OrderCommand::PlaceOrder(PlaceOrder {
                order_id,
                customer_id,
                lines: vec![PricedLine {
                    product_id,
                    quantity: 1,
                    unit_price_snapshot: Money::from_minor(100),
                }],
                created_by: None,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        order
    }

    #[test]
    fn list_is_newest_first_and_paged() {
        let store = OrderStore::new();
        let ids: Vec<OrderId> = (0..3)
            .map(|_| {
                let o = order(None, ProductId::new());
                let id = o.id_typed();
                store.with_write(|book| book.insert(o)).unwrap();
                id
            })
            .collect();

        let listed: Vec<OrderId> = store.list(Page::new(0, 2)).unwrap().iter().map(Order::id_typed).collect();
        assert_eq!(listed, vec![ids[2], ids[1]]);
    }

    #[test]
    fn references_are_answered_from_orders() {
        let store = OrderStore::new();
        let customer = CustomerId::new();
        let product = ProductId::new();
        store.with_write(|book| book.insert(order(Some(customer), product))).unwrap();

        store
            .with_read(|book| {
                assert!(book.customer_referenced(customer));
                assert!(!book.customer_referenced(CustomerId::new()));
                assert!(book.product_referenced(product));
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn missing_order_is_not_found() {
        let store = OrderStore::new();
        assert!(matches!(
            store.get(OrderId::new()),
            Err(DomainError::NotFound { entity: "order", .. })
        ));
    }
}
