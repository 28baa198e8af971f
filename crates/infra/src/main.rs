//! `stockwise-demo`: seed an in-memory engine, run one order through its
//! lifecycle and print the resulting state as JSON.

use anyhow::{Context, Result};

use stockwise_core::Page;
use stockwise_infra::dto::{CreateOrderRequest, ErrorBody, OrderItemRequest};
use stockwise_infra::seed::seed_demo;
use stockwise_infra::{EngineConfig, StockEngine};

fn main() -> Result<()> {
    stockwise_observability::init();

    let config = EngineConfig::from_env().context("invalid STOCKWISE_* configuration")?;
    let engine = StockEngine::in_memory(config);
    let events = engine.subscribe();

    let summary = seed_demo(&engine).context("seeding demo data")?;

    let product_id = *summary
        .product_ids
        .iter()
        .max_by_key(|id| engine.projector().on_hand(**id).unwrap_or(0))
        .context("seed produced no products")?;
    let on_hand = engine.projector().on_hand(product_id)?;

    // One order that fits, then one that asks for more than is left.
    let order = engine.create_order(
        CreateOrderRequest {
            customer_id: None,
            items: vec![OrderItemRequest { product_id, quantity: 1 }],
        },
        None,
    )?;
    println!("{}", serde_json::to_string_pretty(&order)?);

    let too_many = CreateOrderRequest {
        customer_id: None,
        items: vec![OrderItemRequest {
            product_id,
            quantity: on_hand + 1,
        }],
    };
    if let Err(err) = engine.create_order(too_many, None) {
        println!("{}", serde_json::to_string_pretty(&ErrorBody::from(err))?);
    }

    engine.cancel_order(order.id)?;

    println!("{}", serde_json::to_string_pretty(&engine.dashboard()?)?);
    println!("{}", serde_json::to_string_pretty(&engine.movements(Some(Page::new(0, 5)))?)?);
    println!("{}", serde_json::to_string_pretty(&engine.low_stock()?)?);

    let published = events.drain();
    tracing::info!(events = published.len(), "demo finished");
    Ok(())
}
