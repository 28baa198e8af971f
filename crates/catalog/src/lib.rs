//! Catalog master data: products, suppliers and customers.
//!
//! Plain keyed storage with SKU uniqueness and referential-integrity checks.
//! Stock quantities are deliberately absent here; they are derived from the
//! inventory ledger.

pub mod party;
pub mod product;
pub mod store;
pub mod table;

pub use party::{ContactInfo, Customer, CustomerUpdate, NewCustomer, NewSupplier, Supplier, SupplierUpdate};
pub use product::{NewProduct, Product, ProductFilter, ProductUpdate};
pub use store::{CatalogStore, CustomerReferences, ProductReferences};
pub use table::EntityTable;
