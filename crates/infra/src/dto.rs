//! Request/response shapes at the engine boundary (serde).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockwise_catalog::Product;
use stockwise_core::{
    CustomerId, DomainError, DomainResult, Money, MovementId, OrderId, ProductId, StockShortfall, SupplierId, UserId,
};
use stockwise_inventory::{ChangeType, InventoryMovement};
use stockwise_sales::{Order, OrderStatus};

use crate::fulfillment::{NewOrder, OrderItem, StockAdjustment};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementView {
    pub id: MovementId,
    pub sequence: u64,
    pub product_id: ProductId,
    pub product_name: String,
    pub change_type: ChangeType,
    pub quantity: i64,
    pub notes: String,
    pub order_id: Option<OrderId>,
    pub recorded_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

impl MovementView {
    pub fn new(movement: InventoryMovement, product_name: impl Into<String>) -> Self {
        Self {
            id: movement.id,
            sequence: movement.sequence,
            product_id: movement.product_id,
            product_name: product_name.into(),
            change_type: movement.change_type,
            quantity: movement.quantity,
            notes: movement.notes,
            order_id: movement.order_id,
            recorded_by: movement.recorded_by,
            created_at: movement.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustStockRequest {
    pub product_id: ProductId,
    pub change_type: ChangeType,
    pub quantity: i64,
    pub notes: String,
}

impl AdjustStockRequest {
    pub fn into_adjustment(self, recorded_by: Option<UserId>) -> StockAdjustment {
        StockAdjustment {
            product_id: self.product_id,
            change_type: self.change_type,
            quantity: self.quantity,
            notes: self.notes,
            recorded_by,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemRequest {
    pub product_id: ProductId,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub customer_id: Option<CustomerId>,
    pub items: Vec<OrderItemRequest>,
}

impl CreateOrderRequest {
    pub fn into_new_order(self, created_by: Option<UserId>) -> NewOrder {
        NewOrder {
            customer_id: self.customer_id,
            items: self
                .items
                .into_iter()
                .map(|i| OrderItem {
                    product_id: i.product_id,
                    quantity: i.quantity,
                })
                .collect(),
            created_by,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineView {
    pub line_no: u32,
    pub product_id: ProductId,
    pub quantity: i64,
    pub unit_price_snapshot: Money,
    pub line_total: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderView {
    pub id: OrderId,
    pub customer_id: Option<CustomerId>,
    pub status: OrderStatus,
    pub total_amount: Money,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub lines: Vec<OrderLineView>,
}

impl OrderView {
    pub fn from_order(order: &Order) -> DomainResult<Self> {
        let lines = order
            .lines()
            .iter()
            .map(|l| {
                Ok(OrderLineView {
                    line_no: l.line_no,
                    product_id: l.product_id,
                    quantity: l.quantity,
                    unit_price_snapshot: l.unit_price_snapshot,
                    line_total: l.line_total()?,
                })
            })
            .collect::<DomainResult<Vec<_>>>()?;

        Ok(Self {
            id: order.id_typed(),
            customer_id: order.customer_id(),
            status: order.status(),
            total_amount: order.total_amount(),
            created_by: order.created_by(),
            created_at: order.created_at(),
            updated_at: order.updated_at(),
            lines,
        })
    }
}

/// Product with its projected stock attached (read-only at the boundary).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductView {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub unit_price: Money,
    pub min_stock_threshold: u32,
    pub supplier_id: Option<SupplierId>,
    pub stock_quantity: i64,
    pub is_low_stock: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProductView {
    pub fn new(product: Product, stock_quantity: i64) -> Self {
        Self {
            is_low_stock: product.is_low_stock(stock_quantity),
            id: product.id,
            sku: product.sku,
            name: product.name,
            category: product.category,
            unit_price: product.unit_price,
            min_stock_threshold: product.min_stock_threshold,
            supplier_id: product.supplier_id,
            stock_quantity,
            created_at: product.created_at,
            updated_at: product.updated_at,
        }
    }
}

/// Dashboard aggregate, recomputed on every request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub total_products: usize,
    pub low_stock_items: usize,
    pub total_orders: usize,
    pub pending_orders: usize,
    /// `Σ unit_price × on_hand` over all products.
    pub total_stock_value: Money,
    /// Sum of completed orders' totals.
    pub total_revenue: Money,
}

/// Error body for any boundary layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortfalls: Option<Vec<StockShortfall>>,
}

impl From<&DomainError> for ErrorBody {
    fn from(err: &DomainError) -> Self {
        let shortfalls = match err {
            DomainError::InsufficientStock(list) => Some(list.clone()),
            _ => None,
        };
        Self {
            error: err.code().to_string(),
            message: err.to_string(),
            shortfalls,
        }
    }
}

impl From<DomainError> for ErrorBody {
    fn from(err: DomainError) -> Self {
        Self::from(&err)
    }
}
