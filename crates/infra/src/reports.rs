//! Read-side reports: dashboard, movement history, low stock.
//!
//! Reads use the projection directly and take no stock locks.

use std::collections::HashMap;
use std::sync::Arc;

use stockwise_catalog::CatalogStore;
use stockwise_core::{DomainResult, Money, Page, ProductId};
use stockwise_inventory::{InventoryMovement, MovementLedger};
use stockwise_sales::OrderStatus;

use crate::dto::{DashboardStats, MovementView, ProductView};
use crate::order_store::OrderStore;

#[derive(Debug)]
pub struct Reports {
    catalog: Arc<CatalogStore>,
    ledger: Arc<MovementLedger>,
    orders: Arc<OrderStore>,
}

impl Reports {
    pub fn new(catalog: Arc<CatalogStore>, ledger: Arc<MovementLedger>, orders: Arc<OrderStore>) -> Self {
        Self {
            catalog,
            ledger,
            orders,
        }
    }

    pub fn dashboard(&self) -> DomainResult<DashboardStats> {
        let products = self.catalog.all_products()?;
        let counters = self.ledger.projector().snapshot()?;

        let mut low_stock_items = 0;
        let mut stock_values = Vec::with_capacity(products.len());
        for product in &products {
            let on_hand = counters.get(&product.id).copied().unwrap_or(0);
            if product.is_low_stock(on_hand) {
                low_stock_items += 1;
            }
            stock_values.push(product.unit_price.checked_mul(on_hand.max(0))?);
        }

        let (total_orders, pending_orders, revenue) = self.orders.with_read(|book| {
            let completed = book
                .iter()
                .filter(|o| o.status() == OrderStatus::Completed)
                .map(|o| o.total_amount());
            Ok((
                book.len(),
                book.count_with_status(OrderStatus::Pending),
                Money::checked_sum(completed)?,
            ))
        })?;

        Ok(DashboardStats {
            total_products: products.len(),
            low_stock_items,
            total_orders,
            pending_orders,
            total_stock_value: Money::checked_sum(stock_values)?,
            total_revenue: revenue,
        })
    }

    /// Most recent first, with product names attached.
    pub fn movement_history(&self, page: Page) -> DomainResult<Vec<MovementView>> {
        let movements = self.ledger.recent(page)?;
        self.with_names(movements)
    }

    /// One product's history, most recent first.
    pub fn product_history(&self, product_id: ProductId, page: Page) -> DomainResult<Vec<MovementView>> {
        let product = self.catalog.get_product(product_id)?;
        let mut movements = self.ledger.movements_for(product_id)?;
        movements.reverse();
        Ok(page
            .apply(movements.into_iter())
            .map(|m| MovementView::new(m, product.name.clone()))
            .collect())
    }

    pub fn low_stock(&self) -> DomainResult<Vec<ProductView>> {
        Ok(self
            .ledger
            .projector()
            .low_stock_products()?
            .into_iter()
            .map(|(product, on_hand)| ProductView::new(product, on_hand))
            .collect())
    }

    fn with_names(&self, movements: Vec<InventoryMovement>) -> DomainResult<Vec<MovementView>> {
        let mut names: HashMap<ProductId, String> = HashMap::new();
        movements
            .into_iter()
            .map(|m| {
                let name = match names.get(&m.product_id) {
                    Some(name) => name.clone(),
                    None => {
                        let name = self.catalog.get_product(m.product_id)?.name;
                        names.insert(m.product_id, name.clone());
                        name
                    }
                };
                Ok(MovementView::new(m, name))
            })
            .collect()
    }
}
