use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use stockwise_core::{CustomerId, DomainError, DomainResult, ProductId, SupplierId};

use crate::party::{Customer, CustomerUpdate, NewCustomer, NewSupplier, Supplier, SupplierUpdate};
use crate::product::{NewProduct, Product, ProductFilter, ProductUpdate};
use crate::table::EntityTable;

/// Answers whether anything outside the catalog still points at a product
/// (ledger movements, order lines).
pub trait ProductReferences {
    fn product_referenced(&self, product_id: ProductId) -> bool;
}

/// Answers whether any order still points at a customer.
pub trait CustomerReferences {
    fn customer_referenced(&self, customer_id: CustomerId) -> bool;
}

#[derive(Debug, Default)]
struct CatalogState {
    products: EntityTable<Product>,
    skus: HashMap<String, ProductId>,
    suppliers: EntityTable<Supplier>,
    customers: EntityTable<Customer>,
}

impl CatalogState {
    fn ensure_sku_free(&self, sku: &str, owner: Option<ProductId>) -> DomainResult<()> {
        match self.skus.get(sku) {
            Some(existing) if Some(*existing) != owner => {
                Err(DomainError::conflict(format!("sku '{sku}' is already in use")))
            }
            _ => Ok(()),
        }
    }

    fn ensure_supplier(&self, supplier_id: Option<SupplierId>) -> DomainResult<()> {
        if let Some(id) = supplier_id {
            self.suppliers.require(&id)?;
        }
        Ok(())
    }
}

/// In-memory catalog of products, suppliers and customers.
///
/// Deletion policy is referential-integrity rejection: a supplier referenced by
/// a product, a customer referenced by an order, or a product with ledger
/// history cannot be deleted (`Conflict`).
#[derive(Debug)]
pub struct CatalogStore {
    state: RwLock<CatalogState>,
    default_min_stock: u32,
}

impl Default for CatalogStore {
    fn default() -> Self {
        Self::new(10)
    }
}

impl CatalogStore {
    pub fn new(default_min_stock: u32) -> Self {
        Self {
            state: RwLock::new(CatalogState::default()),
            default_min_stock,
        }
    }

    fn read(&self) -> DomainResult<RwLockReadGuard<'_, CatalogState>> {
        self.state.read().map_err(|_| DomainError::poisoned("catalog"))
    }

    fn write(&self) -> DomainResult<RwLockWriteGuard<'_, CatalogState>> {
        self.state.write().map_err(|_| DomainError::poisoned("catalog"))
    }

    // -------------------------
    // Products
    // -------------------------

    pub fn create_product(&self, input: NewProduct) -> DomainResult<Product> {
        self.create_product_with_id(ProductId::new(), input)
    }

    /// Create a product under an id the caller allocated (and may already
    /// hold stock locks for).
    pub fn create_product_with_id(&self, product_id: ProductId, input: NewProduct) -> DomainResult<Product> {
        let product = input.into_product(product_id, self.default_min_stock, Utc::now())?;

        let mut state = self.write()?;
        state.ensure_sku_free(&product.sku, None)?;
        state.ensure_supplier(product.supplier_id)?;
        state.products.insert(product.clone())?;
        state.skus.insert(product.sku.clone(), product.id);

        tracing::info!(product_id = %product.id, sku = %product.sku, "product created");
        Ok(product)
    }

    pub fn update_product(&self, product_id: ProductId, update: ProductUpdate) -> DomainResult<Product> {
        let mut state = self.write()?;
        let current = state.products.require(&product_id)?.clone();
        let next = update.apply_to(&current, Utc::now())?;

        if next.sku != current.sku {
            state.ensure_sku_free(&next.sku, Some(product_id))?;
        }
        if next.supplier_id != current.supplier_id {
            state.ensure_supplier(next.supplier_id)?;
        }

        state.skus.remove(&current.sku);
        state.skus.insert(next.sku.clone(), product_id);
        state.products.replace(next.clone())?;

        tracing::info!(product_id = %product_id, "product updated");
        Ok(next)
    }

    /// Delete a product that nothing references.
    pub fn delete_product(&self, product_id: ProductId, refs: &impl ProductReferences) -> DomainResult<Product> {
        let mut state = self.write()?;
        state.products.require(&product_id)?;
        if refs.product_referenced(product_id) {
            return Err(DomainError::conflict(format!(
                "product {product_id} has stock history and cannot be deleted"
            )));
        }
        let removed = state.products.remove(&product_id)?;
        state.skus.remove(&removed.sku);

        tracing::info!(product_id = %product_id, "product deleted");
        Ok(removed)
    }

    pub fn get_product(&self, product_id: ProductId) -> DomainResult<Product> {
        self.read()?.products.require(&product_id).cloned()
    }

    pub fn contains_product(&self, product_id: ProductId) -> DomainResult<bool> {
        Ok(self.read()?.products.contains(&product_id))
    }

    pub fn find_by_sku(&self, sku: &str) -> DomainResult<Option<Product>> {
        let state = self.read()?;
        Ok(state
            .skus
            .get(sku.trim())
            .and_then(|id| state.products.get(id))
            .cloned())
    }

    pub fn list_products(&self, filter: &ProductFilter) -> DomainResult<Vec<Product>> {
        let state = self.read()?;
        Ok(filter
            .page
            .unwrap_or_default()
            .apply(state.products.iter().filter(|p| filter.matches(p)))
            .cloned()
            .collect())
    }

    /// Every product, in creation order (report scans).
    pub fn all_products(&self) -> DomainResult<Vec<Product>> {
        Ok(self.read()?.products.iter().cloned().collect())
    }

    pub fn product_count(&self) -> DomainResult<usize> {
        Ok(self.read()?.products.len())
    }

    // -------------------------
    // Suppliers
    // -------------------------

    pub fn create_supplier(&self, input: NewSupplier) -> DomainResult<Supplier> {
        let supplier = input.into_supplier(SupplierId::new(), Utc::now())?;
        self.write()?.suppliers.insert(supplier.clone())?;
        tracing::info!(supplier_id = %supplier.id, "supplier created");
        Ok(supplier)
    }

    pub fn update_supplier(&self, supplier_id: SupplierId, update: SupplierUpdate) -> DomainResult<Supplier> {
        let mut state = self.write()?;
        let next = update.apply_to(state.suppliers.require(&supplier_id)?)?;
        state.suppliers.replace(next.clone())?;
        Ok(next)
    }

    pub fn delete_supplier(&self, supplier_id: SupplierId) -> DomainResult<Supplier> {
        let mut state = self.write()?;
        state.suppliers.require(&supplier_id)?;
        let referencing = state
            .products
            .iter()
            .filter(|p| p.supplier_id == Some(supplier_id))
            .count();
        if referencing > 0 {
            return Err(DomainError::conflict(format!(
                "supplier {supplier_id} is referenced by {referencing} product(s)"
            )));
        }
        let removed = state.suppliers.remove(&supplier_id)?;
        tracing::info!(supplier_id = %supplier_id, "supplier deleted");
        Ok(removed)
    }

    pub fn get_supplier(&self, supplier_id: SupplierId) -> DomainResult<Supplier> {
        self.read()?.suppliers.require(&supplier_id).cloned()
    }

    pub fn list_suppliers(&self, page: stockwise_core::Page) -> DomainResult<Vec<Supplier>> {
        Ok(page.apply(self.read()?.suppliers.iter()).cloned().collect())
    }

    // -------------------------
    // Customers
    // -------------------------

    pub fn create_customer(&self, input: NewCustomer) -> DomainResult<Customer> {
        let customer = input.into_customer(CustomerId::new(), Utc::now())?;
        self.write()?.customers.insert(customer.clone())?;
        tracing::info!(customer_id = %customer.id, "customer created");
        Ok(customer)
    }

    pub fn update_customer(&self, customer_id: CustomerId, update: CustomerUpdate) -> DomainResult<Customer> {
        let mut state = self.write()?;
        let next = update.apply_to(state.customers.require(&customer_id)?)?;
        state.customers.replace(next.clone())?;
        Ok(next)
    }

    /// Delete a customer no order references.
    ///
    /// Callers must hold whatever lock keeps `refs` stable (the order store)
    /// for the duration of this call.
    pub fn delete_customer(&self, customer_id: CustomerId, refs: &impl CustomerReferences) -> DomainResult<Customer> {
        let mut state = self.write()?;
        state.customers.require(&customer_id)?;
        if refs.customer_referenced(customer_id) {
            return Err(DomainError::conflict(format!(
                "customer {customer_id} is referenced by existing orders"
            )));
        }
        let removed = state.customers.remove(&customer_id)?;
        tracing::info!(customer_id = %customer_id, "customer deleted");
        Ok(removed)
    }

    pub fn get_customer(&self, customer_id: CustomerId) -> DomainResult<Customer> {
        self.read()?.customers.require(&customer_id).cloned()
    }

    pub fn list_customers(&self, page: stockwise_core::Page) -> DomainResult<Vec<Customer>> {
        Ok(page.apply(self.read()?.customers.iter()).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockwise_core::{Money, Page};

    use crate::party::ContactInfo;

    struct Refs(bool);

    impl ProductReferences for Refs {
        fn product_referenced(&self, _: ProductId) -> bool {
            self.0
        }
    }

    impl CustomerReferences for Refs {
        fn customer_referenced(&self, _: CustomerId) -> bool {
            self.0
        }
    }

    fn product(sku: &str, name: &str, category: Option<&str>) -> NewProduct {
        NewProduct {
            sku: sku.to_string(),
            name: name.to_string(),
            category: category.map(str::to_string),
            unit_price: Money::from_minor(4_500),
            ..NewProduct::default()
        }
    }

    fn supplier(name: &str) -> NewSupplier {
        NewSupplier {
            name: name.to_string(),
            contact_person: None,
            contact: ContactInfo::default(),
        }
    }

    #[test]
    fn sku_must_be_unique() {
        let store = CatalogStore::default();
        store.create_product(product("HUB-1", "USB-C Hub", None)).unwrap();

        let err = store.create_product(product("HUB-1", "Other hub", None)).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(store.product_count().unwrap(), 1);
    }

    #[test]
    fn caller_allocated_id_is_kept_and_cannot_be_reused() {
        let store = CatalogStore::default();
        let id = ProductId::new();
        let created = store.create_product_with_id(id, product("CAB-1", "Cable", None)).unwrap();
        assert_eq!(created.id, id);

        let err = store.create_product_with_id(id, product("CAB-2", "Other cable", None)).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        store.create_product(product("CAB-2", "Other cable", None)).unwrap();
        assert_eq!(store.product_count().unwrap(), 2);
    }

    #[test]
    fn renaming_sku_frees_the_old_one() {
        let store = CatalogStore::default();
        let p = store.create_product(product("OLD", "Cable", None)).unwrap();
        store
            .update_product(
                p.id,
                ProductUpdate {
                    sku: Some("NEW".to_string()),
                    ..ProductUpdate::default()
                },
            )
            .unwrap();

        assert!(store.find_by_sku("OLD").unwrap().is_none());
        assert_eq!(store.find_by_sku("NEW").unwrap().unwrap().id, p.id);
        store.create_product(product("OLD", "Another cable", None)).unwrap();
    }

    #[test]
    fn product_with_unknown_supplier_is_not_found() {
        let store = CatalogStore::default();
        let mut input = product("SW-24", "Cisco 24-Port Switch", None);
        input.supplier_id = Some(SupplierId::new());

        let err = store.create_product(input).unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "supplier", .. }));
    }

    #[test]
    fn referenced_supplier_cannot_be_deleted() {
        let store = CatalogStore::default();
        let s = store.create_supplier(supplier("Furniture World")).unwrap();
        let mut input = product("CHAIR", "Ergonomic Office Chair", Some("Furniture"));
        input.supplier_id = Some(s.id);
        let p = store.create_product(input).unwrap();

        let err = store.delete_supplier(s.id).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        store
            .update_product(
                p.id,
                ProductUpdate {
                    supplier_id: Some(None),
                    ..ProductUpdate::default()
                },
            )
            .unwrap();
        store.delete_supplier(s.id).unwrap();
        assert!(store.get_supplier(s.id).is_err());
    }

    #[test]
    fn referenced_product_and_customer_cannot_be_deleted() {
        let store = CatalogStore::default();
        let p = store.create_product(product("DESK", "Standing Desk", None)).unwrap();
        let c = store
            .create_customer(NewCustomer {
                name: "Hooli".to_string(),
                contact: ContactInfo::default(),
            })
            .unwrap();

        assert!(matches!(store.delete_product(p.id, &Refs(true)), Err(DomainError::Conflict(_))));
        assert!(matches!(store.delete_customer(c.id, &Refs(true)), Err(DomainError::Conflict(_))));

        store.delete_product(p.id, &Refs(false)).unwrap();
        store.delete_customer(c.id, &Refs(false)).unwrap();
        assert!(store.find_by_sku("DESK").unwrap().is_none());
    }

    #[test]
    fn listing_filters_and_paginates() {
        let store = CatalogStore::default();
        store.create_product(product("A", "Dell XPS 15 Laptop", Some("Electronics"))).unwrap();
        store.create_product(product("B", "HDMI Cable 2m", Some("Accessories"))).unwrap();
        store.create_product(product("C", "MacBook Pro M3 Laptop", Some("Electronics"))).unwrap();
        store.create_product(product("D", "Filing Cabinet", Some("Furniture"))).unwrap();

        let laptops = store
            .list_products(&ProductFilter {
                search: Some("laptop".to_string()),
                ..ProductFilter::default()
            })
            .unwrap();
        assert_eq!(laptops.iter().map(|p| p.sku.as_str()).collect::<Vec<_>>(), vec!["A", "C"]);

        let second_electronics = store
            .list_products(&ProductFilter {
                category: Some("Electronics".to_string()),
                page: Some(Page::new(1, 10)),
                ..ProductFilter::default()
            })
            .unwrap();
        assert_eq!(second_electronics.len(), 1);
        assert_eq!(second_electronics[0].sku, "C");
    }
}
