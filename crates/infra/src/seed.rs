//! Deterministic demo data: suppliers, customers, products with initial
//! stock, and a handful of orders in every status.

use stockwise_catalog::{ContactInfo, NewCustomer, NewProduct, NewSupplier};
use stockwise_core::{DomainResult, Money, ProductId};
use stockwise_events::{EventBus, JsonEnvelope};

use crate::dto::{CreateOrderRequest, OrderItemRequest};
use crate::engine::StockEngine;

const SUPPLIERS: &[(&str, &str, &str, &str)] = &[
    ("TechGiant Wholesale", "sales@techgiant.com", "555-0101", "123 Silicon Blvd, Tech City"),
    ("OfficeDepot Pro", "b2b@officedepotpro.com", "555-0102", "456 Paper St, Business Park"),
    ("Global Components Ltd", "supply@globalcomp.com", "555-0103", "789 Circuit Rd, Industrial Zone"),
    ("Furniture World", "orders@furnitureworld.com", "555-0104", "321 Comfort Ln, Warehouse Dist"),
    ("Network Solutions Inc", "partners@netsol.com", "555-0105", "654 Router Way, Connectivity Hub"),
    ("Retail Fast Distributors", "sales@retailfast.com", "555-0106", "987 Market St, Commerce City"),
];

const CUSTOMERS: &[(&str, &str, &str, &str)] = &[
    ("Acme Corp", "purchasing@acme.com", "555-1111", "100 Acme Way"),
    ("Stark Industries", "tony@stark.com", "555-2222", "Avengers Tower, NY"),
    ("Wayne Enterprises", "bruce@wayne.com", "555-3333", "Gotham City"),
    ("Cyberdyne Systems", "contact@cyberdyne.com", "555-4444", "Future Blvd, CA"),
    ("Massive Dynamic", "info@massivedynamic.com", "555-5555", "Science Park, Boston"),
    ("Initech", "peter@initech.com", "555-6666", "Software Park, TX"),
    ("Hooli", "gavin@hooli.com", "555-7777", "Silicon Valley, CA"),
];

/// (category, name, price in cents)
const PRODUCTS: &[(&str, &str, u64)] = &[
    ("Electronics", "Dell XPS 15 Laptop", 180_000),
    ("Electronics", "MacBook Pro M3", 240_000),
    ("Electronics", "Samsung 32' 4K Monitor", 45_000),
    ("Electronics", "Logitech MX Master 3", 9_900),
    ("Electronics", "Keychron K2 Keyboard", 8_500),
    ("Electronics", "Sony WH-1000XM5 Headphones", 35_000),
    ("Accessories", "USB-C Hub Multiport", 4_500),
    ("Accessories", "HDMI Cable 2m", 1_200),
    ("Accessories", "Laptop Stand Aluminum", 3_500),
    ("Networking", "Ubiquiti UniFi AP", 14_900),
    ("Networking", "Cisco 24-Port Switch", 29_900),
    ("Furniture", "Ergonomic Office Chair", 25_000),
    ("Furniture", "Standing Desk Motorized", 45_000),
    ("Furniture", "Filing Cabinet", 12_000),
    ("Office Supplies", "Printer Paper (Box)", 4_500),
    ("Office Supplies", "Toner Cartridge HP", 8_500),
    ("Office Supplies", "Whiteboard 4x6", 12_000),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub suppliers: usize,
    pub customers: usize,
    pub products: usize,
    pub orders: usize,
    pub product_ids: Vec<ProductId>,
}

fn contact(email: &str, phone: &str, address: &str) -> ContactInfo {
    ContactInfo {
        email: Some(email.to_string()),
        phone: Some(phone.to_string()),
        address: Some(address.to_string()),
    }
}

/// SKU prefix: first three letters of the category, upper-cased.
fn sku(category: &str, index: usize) -> String {
    let prefix: String = category.chars().filter(|c| c.is_alphanumeric()).take(3).collect();
    format!("{}-{}", prefix.to_uppercase(), 1001 + index)
}

/// Populate an empty engine. Quantities and thresholds vary by index so the
/// dashboard shows a mix of healthy and low-stock products.
pub fn seed_demo<B>(engine: &StockEngine<B>) -> DomainResult<SeedSummary>
where
    B: EventBus<JsonEnvelope>,
{
    let mut summary = SeedSummary::default();

    let mut supplier_ids = Vec::with_capacity(SUPPLIERS.len());
    for (name, email, phone, address) in SUPPLIERS {
        let supplier = engine.create_supplier(NewSupplier {
            name: name.to_string(),
            contact_person: None,
            contact: contact(email, phone, address),
        })?;
        supplier_ids.push(supplier.id);
    }
    summary.suppliers = supplier_ids.len();

    let mut customer_ids = Vec::with_capacity(CUSTOMERS.len());
    for (name, email, phone, address) in CUSTOMERS {
        let customer = engine.create_customer(NewCustomer {
            name: name.to_string(),
            contact: contact(email, phone, address),
        })?;
        customer_ids.push(customer.id);
    }
    summary.customers = customer_ids.len();

    for (i, (category, name, price)) in PRODUCTS.iter().enumerate() {
        let initial_stock = ((i * 37) % 101) as i64;
        let product = engine.create_product(
            NewProduct {
                sku: sku(category, i),
                name: name.to_string(),
                category: Some(category.to_string()),
                unit_price: Money::from_minor(*price),
                min_stock_threshold: Some(5 + (i as u32 * 7) % 16),
                supplier_id: supplier_ids.get(i % supplier_ids.len()).copied(),
            },
            initial_stock,
            None,
        )?;
        summary.product_ids.push(product.id);
    }
    summary.products = summary.product_ids.len();

    // Orders only for products with enough stock, cycling through customers.
    let stocked: Vec<ProductId> = summary
        .product_ids
        .iter()
        .copied()
        .filter(|id| engine.projector().on_hand(*id).map(|q| q >= 10).unwrap_or(false))
        .collect();
    for (n, pair) in stocked.chunks(2).enumerate() {
        let items = pair
            .iter()
            .map(|&product_id| OrderItemRequest { product_id, quantity: 1 + (n as i64 % 3) })
            .collect();
        let order = engine.create_order(
            CreateOrderRequest {
                customer_id: customer_ids.get(n % customer_ids.len()).copied(),
                items,
            },
            None,
        )?;
        match n % 3 {
            0 => {
                engine.complete_order(order.id)?;
            }
            1 => {
                engine.cancel_order(order.id)?;
            }
            _ => {}
        }
        summary.orders += 1;
    }

    tracing::info!(
        suppliers = summary.suppliers,
        customers = summary.customers,
        products = summary.products,
        orders = summary.orders,
        "demo data seeded"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use stockwise_core::Page;

    #[test]
    fn sku_uses_category_prefix() {
        assert_eq!(sku("Office Supplies", 0), "OFF-1001");
        assert_eq!(sku("Networking", 9), "NET-1010");
    }

    #[test]
    fn seeding_produces_consistent_state() {
        let engine = StockEngine::in_memory(EngineConfig::default());
        let summary = seed_demo(&engine).unwrap();

        assert_eq!(summary.products, PRODUCTS.len());
        assert!(summary.orders > 0);
        assert!(engine.ledger().projection_drift().unwrap().is_empty());

        let stats = engine.dashboard().unwrap();
        assert_eq!(stats.total_products, PRODUCTS.len());
        assert_eq!(stats.total_orders, summary.orders);
        assert!(stats.low_stock_items > 0);
        assert!(stats.total_revenue.minor() > 0);

        let history = engine.movements(Some(Page::new(0, 1_000))).unwrap();
        assert!(history.iter().any(|m| m.notes == "Initial stock"));
        assert!(history.iter().any(|m| m.notes.ends_with("cancelled")));
    }
}
