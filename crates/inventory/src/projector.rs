use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use stockwise_catalog::{CatalogStore, Product};
use stockwise_core::{DomainError, DomainResult, ProductId};

use crate::movement::InventoryMovement;

/// Derived on-hand quantity per product.
///
/// Counters are maintained incrementally by ledger commits (the only writer)
/// and can be rebuilt from scratch by replaying the ledger. Reads take no
/// stock locks.
#[derive(Debug)]
pub struct StockProjector {
    counters: RwLock<HashMap<ProductId, i64>>,
    catalog: Arc<CatalogStore>,
}

impl StockProjector {
    pub fn new(catalog: Arc<CatalogStore>) -> Self {
        Self {
            counters: RwLock::new(HashMap::new()),
            catalog,
        }
    }

    fn read(&self) -> DomainResult<RwLockReadGuard<'_, HashMap<ProductId, i64>>> {
        self.counters.read().map_err(|_| DomainError::poisoned("stock projection"))
    }

    pub(crate) fn write(&self) -> DomainResult<RwLockWriteGuard<'_, HashMap<ProductId, i64>>> {
        self.counters.write().map_err(|_| DomainError::poisoned("stock projection"))
    }

    /// Raw counter; products with no movements are at 0.
    pub(crate) fn counter(&self, product_id: ProductId) -> DomainResult<i64> {
        Ok(self.read()?.get(&product_id).copied().unwrap_or(0))
    }

    /// Current on-hand quantity of a catalog product.
    pub fn on_hand(&self, product_id: ProductId) -> DomainResult<i64> {
        if !self.catalog.contains_product(product_id)? {
            return Err(DomainError::not_found("product", product_id));
        }
        self.counter(product_id)
    }

    /// `on_hand < min_stock_threshold`.
    pub fn is_low_stock(&self, product_id: ProductId) -> DomainResult<bool> {
        let product = self.catalog.get_product(product_id)?;
        Ok(product.is_low_stock(self.counter(product_id)?))
    }

    /// Copy of every counter (products with history only).
    pub fn snapshot(&self) -> DomainResult<HashMap<ProductId, i64>> {
        Ok(self.read()?.clone())
    }

    /// Products below their threshold, in catalog order, with their on-hand.
    pub fn low_stock_products(&self) -> DomainResult<Vec<(Product, i64)>> {
        let products = self.catalog.all_products()?;
        let counters = self.read()?;
        Ok(products
            .into_iter()
            .filter_map(|p| {
                let on_hand = counters.get(&p.id).copied().unwrap_or(0);
                p.is_low_stock(on_hand).then_some((p, on_hand))
            })
            .collect())
    }

    /// Reset every counter and fold `movements` into fresh ones.
    pub(crate) fn rebuild<'m>(&self, movements: impl IntoIterator<Item = &'m InventoryMovement>) -> DomainResult<()> {
        let mut fresh: HashMap<ProductId, i64> = HashMap::new();
        for m in movements {
            let slot = fresh.entry(m.product_id).or_insert(0);
            *slot = slot
                .checked_add(m.quantity)
                .ok_or_else(|| DomainError::storage("on-hand counter overflow during rebuild"))?;
        }

        let mut counters = self.write()?;
        *counters = fresh;
        tracing::info!(products = counters.len(), "stock projection rebuilt");
        Ok(())
    }
}
