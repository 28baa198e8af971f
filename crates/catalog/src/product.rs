use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockwise_core::{DomainError, DomainResult, Entity, Money, Page, ProductId, SupplierId};

/// Catalog product.
///
/// There is intentionally no stock field: on-hand quantity is a projection of
/// the movement ledger and is attached only at the boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: Money,
    pub min_stock_threshold: u32,
    pub supplier_id: Option<SupplierId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Product {
    type Id = ProductId;

    const KIND: &'static str = "product";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Product {
    /// Low stock means strictly below the configured threshold.
    pub fn is_low_stock(&self, on_hand: i64) -> bool {
        on_hand < i64::from(self.min_stock_threshold)
    }
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub category: Option<String>,
    pub unit_price: Money,
    /// Falls back to the store's default threshold when absent.
    pub min_stock_threshold: Option<u32>,
    pub supplier_id: Option<SupplierId>,
}

impl NewProduct {
    pub(crate) fn into_product(self, id: ProductId, default_threshold: u32, now: DateTime<Utc>) -> DomainResult<Product> {
        Ok(Product {
            id,
            sku: required("sku", &self.sku)?,
            name: required("name", &self.name)?,
            category: optional(self.category),
            unit_price: self.unit_price,
            min_stock_threshold: self.min_stock_threshold.unwrap_or(default_threshold),
            supplier_id: self.supplier_id,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update; `None` keeps the current value.
///
/// `category` and `supplier_id` are doubly optional so callers can clear them
/// with `Some(None)`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductUpdate {
    pub sku: Option<String>,
    pub name: Option<String>,
    pub category: Option<Option<String>>,
    pub unit_price: Option<Money>,
    pub min_stock_threshold: Option<u32>,
    pub supplier_id: Option<Option<SupplierId>>,
}

impl ProductUpdate {
    pub(crate) fn apply_to(self, product: &Product, now: DateTime<Utc>) -> DomainResult<Product> {
        let mut next = product.clone();
        if let Some(sku) = self.sku {
            next.sku = required("sku", &sku)?;
        }
        if let Some(name) = self.name {
            next.name = required("name", &name)?;
        }
        if let Some(category) = self.category {
            next.category = optional(category);
        }
        if let Some(price) = self.unit_price {
            next.unit_price = price;
        }
        if let Some(threshold) = self.min_stock_threshold {
            next.min_stock_threshold = threshold;
        }
        if let Some(supplier_id) = self.supplier_id {
            next.supplier_id = supplier_id;
        }
        next.updated_at = now;
        Ok(next)
    }
}

/// Listing filter: name search, exact category, pagination.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductFilter {
    /// Case-insensitive substring match on the product name.
    pub search: Option<String>,
    pub category: Option<String>,
    /// `None` lets the caller's layer pick its default window.
    pub page: Option<Page>,
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            if !product.name.to_lowercase().contains(&search.trim().to_lowercase()) {
                return false;
            }
        }
        if let Some(category) = self.category.as_deref() {
            if product.category.as_deref() != Some(category) {
                return false;
            }
        }
        true
    }
}

pub(crate) fn required(field: &str, value: &str) -> DomainResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget() -> NewProduct {
        NewProduct {
            sku: " WID-1 ".to_string(),
            name: "Widget".to_string(),
            category: Some("  ".to_string()),
            unit_price: Money::from_minor(1_250),
            min_stock_threshold: None,
            supplier_id: None,
        }
    }

    #[test]
    fn new_product_trims_and_defaults_threshold() {
        let p = widget().into_product(ProductId::new(), 10, Utc::now()).unwrap();
        assert_eq!(p.sku, "WID-1");
        assert_eq!(p.category, None);
        assert_eq!(p.min_stock_threshold, 10);
    }

    #[test]
    fn new_product_rejects_blank_name() {
        let mut input = widget();
        input.name = "   ".to_string();
        let err = input.into_product(ProductId::new(), 10, Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::validation("name cannot be empty"));
    }

    #[test]
    fn low_stock_is_strictly_below_threshold() {
        let mut p = widget().into_product(ProductId::new(), 5, Utc::now()).unwrap();
        assert!(p.is_low_stock(4));
        assert!(!p.is_low_stock(5));
        p.min_stock_threshold = 0;
        assert!(!p.is_low_stock(0));
    }

    #[test]
    fn update_can_clear_supplier_and_keeps_untouched_fields() {
        let mut p = widget().into_product(ProductId::new(), 5, Utc::now()).unwrap();
        p.supplier_id = Some(SupplierId::new());

        let next = ProductUpdate {
            unit_price: Some(Money::from_minor(999)),
            supplier_id: Some(None),
            ..ProductUpdate::default()
        }
        .apply_to(&p, Utc::now())
        .unwrap();

        assert_eq!(next.unit_price, Money::from_minor(999));
        assert_eq!(next.supplier_id, None);
        assert_eq!(next.sku, p.sku);
        assert_eq!(next.created_at, p.created_at);
    }

    #[test]
    fn filter_matches_name_case_insensitively() {
        let p = widget().into_product(ProductId::new(), 5, Utc::now()).unwrap();
        let filter = ProductFilter {
            search: Some("WIDG".to_string()),
            ..ProductFilter::default()
        };
        assert!(filter.matches(&p));

        let filter = ProductFilter {
            category: Some("Electronics".to_string()),
            ..ProductFilter::default()
        };
        assert!(!filter.matches(&p));
    }
}
