use std::sync::Arc;

use stockwise_catalog::{
    CatalogStore, Customer, CustomerReferences, CustomerUpdate, NewCustomer, NewProduct, NewSupplier, ProductFilter,
    ProductReferences, ProductUpdate, Supplier, SupplierUpdate,
};
use stockwise_core::{CustomerId, DomainError, DomainResult, OrderId, Page, ProductId, SupplierId, UserId};
use stockwise_events::{EventBus, InMemoryEventBus, JsonEnvelope, Subscription};
use stockwise_inventory::{ChangeType, MovementLedger, StockProjector};

use crate::config::EngineConfig;
use crate::dto::{
    AdjustStockRequest, CreateOrderRequest, DashboardStats, MovementView, OrderView, ProductView,
};
use crate::fulfillment::{FulfillmentCoordinator, StockAdjustment};
use crate::order_store::{OrderBook, OrderStore};
use crate::reports::Reports;

pub const INITIAL_STOCK_NOTE: &str = "Initial stock";

/// Product references from both the ledger and order lines.
struct ProductRefs<'a> {
    ledger: &'a MovementLedger,
    book: &'a OrderBook,
}

impl ProductReferences for ProductRefs<'_> {
    fn product_referenced(&self, product_id: ProductId) -> bool {
        self.ledger.product_referenced(product_id) || self.book.product_referenced(product_id)
    }
}

/// The engine facade: catalog, inventory, orders and reports behind one
/// handle.
///
/// Every method is synchronous and safe to call from many threads at once.
#[derive(Debug)]
pub struct StockEngine<B> {
    config: EngineConfig,
    catalog: Arc<CatalogStore>,
    ledger: Arc<MovementLedger>,
    orders: Arc<OrderStore>,
    coordinator: FulfillmentCoordinator<B>,
    reports: Reports,
}

impl StockEngine<Arc<InMemoryEventBus<JsonEnvelope>>> {
    /// Engine publishing to a fresh in-process bus.
    pub fn in_memory(config: EngineConfig) -> Self {
        Self::new(config, Arc::new(InMemoryEventBus::new()))
    }
}

impl<B> StockEngine<B>
where
    B: EventBus<JsonEnvelope>,
{
    pub fn new(config: EngineConfig, bus: B) -> Self {
        let catalog = Arc::new(CatalogStore::new(config.default_min_stock));
        let projector = Arc::new(StockProjector::new(catalog.clone()));
        let ledger = Arc::new(MovementLedger::new(catalog.clone(), projector, config.lock_timeout));
        let orders = Arc::new(OrderStore::new());

        tracing::info!(
            lock_timeout_ms = config.lock_timeout.as_millis() as u64,
            default_min_stock = config.default_min_stock,
            "stock engine ready"
        );

        Self {
            coordinator: FulfillmentCoordinator::new(catalog.clone(), ledger.clone(), orders.clone(), bus),
            reports: Reports::new(catalog.clone(), ledger.clone(), orders.clone()),
            config,
            catalog,
            ledger,
            orders,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    pub fn ledger(&self) -> &MovementLedger {
        &self.ledger
    }

    pub fn projector(&self) -> &StockProjector {
        self.ledger.projector()
    }

    pub fn subscribe(&self) -> Subscription<JsonEnvelope> {
        self.coordinator.bus().subscribe()
    }

    /// Caller's window capped at `max_page_limit`; `None` is the first
    /// `page_limit` rows.
    fn page(&self, page: Option<Page>) -> Page {
        self.config.page(page.map(|p| p.skip), page.map(|p| p.limit))
    }

    fn product_view(&self, product_id: ProductId) -> DomainResult<ProductView> {
        let product = self.catalog.get_product(product_id)?;
        let on_hand = self.projector().on_hand(product_id)?;
        Ok(ProductView::new(product, on_hand))
    }

    // -------------------------
    // Products
    // -------------------------

    /// Create a product; a positive `initial_stock` is recorded as an `in`
    /// movement, never written to the product.
    ///
    /// The new id is leased before the row becomes visible, so no other
    /// caller can hold up the initial stock. If recording it still fails the
    /// product is removed again and its SKU is free for a retry.
    pub fn create_product(
        &self,
        input: NewProduct,
        initial_stock: i64,
        user: Option<UserId>,
    ) -> DomainResult<ProductView> {
        if initial_stock < 0 {
            return Err(DomainError::validation("initial stock cannot be negative"));
        }
        let product_id = ProductId::new();
        let lease = self.ledger.lock([product_id])?;
        self.catalog.create_product_with_id(product_id, input)?;

        if initial_stock > 0 {
            let stocked = self.coordinator.adjust_stock_leased(
                &lease,
                StockAdjustment {
                    product_id,
                    change_type: ChangeType::In,
                    quantity: initial_stock,
                    notes: INITIAL_STOCK_NOTE.to_string(),
                    recorded_by: user,
                },
            );
            if let Err(err) = stocked {
                if let Err(undo) = self.delete_product_leased(product_id) {
                    tracing::warn!(product_id = %product_id, error = %undo, "failed to remove product after initial stock failed");
                }
                return Err(err);
            }
        }
        drop(lease);
        self.product_view(product_id)
    }

    pub fn update_product(&self, product_id: ProductId, update: ProductUpdate) -> DomainResult<ProductView> {
        self.catalog.update_product(product_id, update)?;
        self.product_view(product_id)
    }

    /// Delete a product with no stock history and no order lines.
    pub fn delete_product(&self, product_id: ProductId) -> DomainResult<()> {
        // The lease keeps concurrent appends out while references are checked.
        let _lease = self.ledger.lock([product_id])?;
        self.delete_product_leased(product_id)
    }

    /// Caller holds the stock lease for `product_id`.
    fn delete_product_leased(&self, product_id: ProductId) -> DomainResult<()> {
        self.orders.with_read(|book| {
            let refs = ProductRefs {
                ledger: &self.ledger,
                book,
            };
            self.catalog.delete_product(product_id, &refs).map(|_| ())
        })
    }

    pub fn get_product(&self, product_id: ProductId) -> DomainResult<ProductView> {
        self.product_view(product_id)
    }

    pub fn list_products(&self, filter: ProductFilter) -> DomainResult<Vec<ProductView>> {
        let filter = ProductFilter {
            page: Some(self.page(filter.page)),
            ..filter
        };
        let products = self.catalog.list_products(&filter)?;
        let counters = self.projector().snapshot()?;
        Ok(products
            .into_iter()
            .map(|p| {
                let on_hand = counters.get(&p.id).copied().unwrap_or(0);
                ProductView::new(p, on_hand)
            })
            .collect())
    }

    /// "Set stock" from a product form: one compensating adjustment.
    pub fn set_stock(
        &self,
        product_id: ProductId,
        target: i64,
        notes: &str,
        user: Option<UserId>,
    ) -> DomainResult<Option<MovementView>> {
        let recorded = self.coordinator.set_stock(product_id, target, notes, user)?;
        recorded
            .map(|r| {
                let name = self.catalog.get_product(product_id)?.name;
                Ok(MovementView::new(r.movement, name))
            })
            .transpose()
    }

    // -------------------------
    // Suppliers
    // -------------------------

    pub fn create_supplier(&self, input: NewSupplier) -> DomainResult<Supplier> {
        self.catalog.create_supplier(input)
    }

    pub fn update_supplier(&self, supplier_id: SupplierId, update: SupplierUpdate) -> DomainResult<Supplier> {
        self.catalog.update_supplier(supplier_id, update)
    }

    pub fn delete_supplier(&self, supplier_id: SupplierId) -> DomainResult<()> {
        self.catalog.delete_supplier(supplier_id).map(|_| ())
    }

    pub fn get_supplier(&self, supplier_id: SupplierId) -> DomainResult<Supplier> {
        self.catalog.get_supplier(supplier_id)
    }

    pub fn list_suppliers(&self, page: Option<Page>) -> DomainResult<Vec<Supplier>> {
        self.catalog.list_suppliers(self.page(page))
    }

    // -------------------------
    // Customers
    // -------------------------

    pub fn create_customer(&self, input: NewCustomer) -> DomainResult<Customer> {
        self.catalog.create_customer(input)
    }

    pub fn update_customer(&self, customer_id: CustomerId, update: CustomerUpdate) -> DomainResult<Customer> {
        self.catalog.update_customer(customer_id, update)
    }

    /// Delete a customer no order references.
    pub fn delete_customer(&self, customer_id: CustomerId) -> DomainResult<()> {
        // Holding the order store keeps new orders for this customer out.
        self.orders
            .with_write(|book| self.catalog.delete_customer(customer_id, &*book).map(|_| ()))
    }

    pub fn get_customer(&self, customer_id: CustomerId) -> DomainResult<Customer> {
        self.catalog.get_customer(customer_id)
    }

    pub fn list_customers(&self, page: Option<Page>) -> DomainResult<Vec<Customer>> {
        self.catalog.list_customers(self.page(page))
    }

    pub fn customer_has_orders(&self, customer_id: CustomerId) -> DomainResult<bool> {
        self.orders.with_read(|book| Ok(book.customer_referenced(customer_id)))
    }

    // -------------------------
    // Stock & orders
    // -------------------------

    pub fn adjust_stock(&self, request: AdjustStockRequest, user: Option<UserId>) -> DomainResult<MovementView> {
        let recorded = self.coordinator.adjust_stock(request.into_adjustment(user))?;
        let name = self.catalog.get_product(recorded.movement.product_id)?.name;
        Ok(MovementView::new(recorded.movement, name))
    }

    pub fn create_order(&self, request: CreateOrderRequest, user: Option<UserId>) -> DomainResult<OrderView> {
        let order = self.coordinator.create_order(request.into_new_order(user))?;
        OrderView::from_order(&order)
    }

    pub fn cancel_order(&self, order_id: OrderId) -> DomainResult<OrderView> {
        OrderView::from_order(&self.coordinator.cancel_order(order_id)?)
    }

    pub fn complete_order(&self, order_id: OrderId) -> DomainResult<OrderView> {
        OrderView::from_order(&self.coordinator.complete_order(order_id)?)
    }

    pub fn get_order(&self, order_id: OrderId) -> DomainResult<OrderView> {
        OrderView::from_order(&self.orders.get(order_id)?)
    }

    /// Most recent first.
    pub fn list_orders(&self, page: Option<Page>) -> DomainResult<Vec<OrderView>> {
        self.orders
            .list(self.page(page))?
            .iter()
            .map(OrderView::from_order)
            .collect()
    }

    // -------------------------
    // Reports
    // -------------------------

    pub fn movements(&self, page: Option<Page>) -> DomainResult<Vec<MovementView>> {
        self.reports.movement_history(self.page(page))
    }

    pub fn product_movements(&self, product_id: ProductId, page: Option<Page>) -> DomainResult<Vec<MovementView>> {
        self.reports.product_history(product_id, self.page(page))
    }

    pub fn low_stock(&self) -> DomainResult<Vec<ProductView>> {
        self.reports.low_stock()
    }

    pub fn dashboard(&self) -> DomainResult<DashboardStats> {
        self.reports.dashboard()
    }

    /// Rebuild the projection from the ledger and report any drift that
    /// existed beforehand.
    pub fn reconcile(&self) -> DomainResult<Vec<ProductId>> {
        let drifted = self.ledger.projection_drift()?;
        if !drifted.is_empty() {
            tracing::warn!(products = drifted.len(), "stock projection drift detected; rebuilding");
            self.ledger.rebuild_projection()?;
        }
        Ok(drifted)
    }
}
