use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use chrono::Utc;

use stockwise_catalog::{CatalogStore, ProductReferences};
use stockwise_core::{DomainError, DomainResult, OrderId, Page, ProductId, StockShortfall};

use crate::locks::{StockLease, StockLocks};
use crate::movement::{InventoryMovement, MovementRecorded, NewMovement};
use crate::projector::StockProjector;

#[derive(Debug, Default)]
struct LedgerState {
    entries: Vec<InventoryMovement>,
    /// Indexes into `entries`, per product, in append order.
    by_product: HashMap<ProductId, Vec<usize>>,
}

/// Append-only log of stock movements; the source of truth for quantities.
///
/// Writers must hold a [`StockLease`] from this ledger's lock table covering
/// every product they touch. Each commit updates the [`StockProjector`]
/// while the ledger write lock is still held, so readers never observe a
/// movement without its counter (or the reverse).
#[derive(Debug)]
pub struct MovementLedger {
    locks: StockLocks,
    catalog: Arc<CatalogStore>,
    projector: Arc<StockProjector>,
    state: RwLock<LedgerState>,
}

impl MovementLedger {
    pub fn new(catalog: Arc<CatalogStore>, projector: Arc<StockProjector>, lock_timeout: Duration) -> Self {
        Self {
            locks: StockLocks::new(lock_timeout),
            catalog,
            projector,
            state: RwLock::new(LedgerState::default()),
        }
    }

    fn read(&self) -> DomainResult<RwLockReadGuard<'_, LedgerState>> {
        self.state.read().map_err(|_| DomainError::poisoned("movement ledger"))
    }

    fn write(&self) -> DomainResult<RwLockWriteGuard<'_, LedgerState>> {
        self.state.write().map_err(|_| DomainError::poisoned("movement ledger"))
    }

    pub fn projector(&self) -> &Arc<StockProjector> {
        &self.projector
    }

    /// Acquire exclusive stock access to `products`.
    pub fn lock(&self, products: impl IntoIterator<Item = ProductId>) -> DomainResult<StockLease<'_>> {
        self.locks.acquire(products)
    }

    /// Start an all-or-nothing batch of appends.
    pub fn begin<'a>(&'a self, lease: &'a StockLease<'a>) -> DomainResult<LedgerTransaction<'a>> {
        if !lease.issued_by(&self.locks) {
            return Err(DomainError::invariant("stock lease was issued by a different ledger"));
        }
        Ok(LedgerTransaction {
            ledger: self,
            lease,
            staged: Vec::new(),
            running: HashMap::new(),
        })
    }

    /// Append a single movement.
    pub fn append(&self, lease: &StockLease<'_>, movement: NewMovement) -> DomainResult<InventoryMovement> {
        let mut tx = self.begin(lease)?;
        tx.stage(movement)?;
        tx.commit()?
            .pop()
            .map(|recorded| recorded.movement)
            .ok_or_else(|| DomainError::storage("ledger commit returned no movement"))
    }

    /// Movements of one product, oldest first.
    pub fn movements_for(&self, product_id: ProductId) -> DomainResult<Vec<InventoryMovement>> {
        let state = self.read()?;
        Ok(state
            .by_product
            .get(&product_id)
            .map(|idx| idx.iter().map(|&i| state.entries[i].clone()).collect())
            .unwrap_or_default())
    }

    /// Movements written on behalf of one order, oldest first.
    pub fn movements_for_order(&self, order_id: OrderId) -> DomainResult<Vec<InventoryMovement>> {
        Ok(self
            .read()?
            .entries
            .iter()
            .filter(|m| m.order_id == Some(order_id))
            .cloned()
            .collect())
    }

    /// Most recent movements first.
    pub fn recent(&self, page: Page) -> DomainResult<Vec<InventoryMovement>> {
        let state = self.read()?;
        Ok(page.apply(state.entries.iter().rev()).cloned().collect())
    }

    /// Full scan of the ledger. Reference value for the projected counter.
    pub fn fold_on_hand(&self, product_id: ProductId) -> DomainResult<i64> {
        Ok(self
            .read()?
            .entries
            .iter()
            .filter(|m| m.product_id == product_id)
            .map(|m| m.quantity)
            .sum())
    }

    pub fn has_entries_for(&self, product_id: ProductId) -> DomainResult<bool> {
        Ok(self.read()?.by_product.contains_key(&product_id))
    }

    pub fn len(&self) -> DomainResult<usize> {
        Ok(self.read()?.entries.len())
    }

    pub fn is_empty(&self) -> DomainResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Replay every movement into a fresh projection.
    pub fn rebuild_projection(&self) -> DomainResult<()> {
        let state = self.read()?;
        self.projector.rebuild(state.entries.iter())
    }

    /// Products whose projected counter disagrees with the ledger.
    pub fn projection_drift(&self) -> DomainResult<Vec<ProductId>> {
        let state = self.read()?;
        let counters = self.projector.snapshot()?;

        let mut drifted: Vec<ProductId> = state
            .by_product
            .iter()
            .filter(|(product_id, idx)| {
                let folded: i64 = idx.iter().map(|&i| state.entries[i].quantity).sum();
                counters.get(*product_id).copied().unwrap_or(0) != folded
            })
            .map(|(product_id, _)| *product_id)
            .collect();
        drifted.extend(
            counters
                .iter()
                .filter(|(product_id, qty)| **qty != 0 && !state.by_product.contains_key(*product_id))
                .map(|(product_id, _)| *product_id),
        );
        drifted.sort();
        Ok(drifted)
    }
}

impl ProductReferences for MovementLedger {
    fn product_referenced(&self, product_id: ProductId) -> bool {
        // An unreadable ledger counts as referenced: refuse the delete.
        self.has_entries_for(product_id).unwrap_or(true)
    }
}

/// Staged movements awaiting a single commit.
///
/// Every staged movement is validated immediately against the running
/// on-hand (projected quantity plus what is already staged). Dropping the
/// transaction without calling [`commit`](Self::commit) writes nothing.
#[derive(Debug)]
pub struct LedgerTransaction<'a> {
    ledger: &'a MovementLedger,
    lease: &'a StockLease<'a>,
    staged: Vec<NewMovement>,
    running: HashMap<ProductId, i64>,
}

impl LedgerTransaction<'_> {
    pub fn stage(&mut self, movement: NewMovement) -> DomainResult<&mut Self> {
        movement.validate()?;

        let product_id = movement.product_id;
        if !self.lease.covers(product_id) {
            return Err(DomainError::invariant(format!(
                "stock lease does not cover product {product_id}"
            )));
        }
        if !self.ledger.catalog.contains_product(product_id)? {
            return Err(DomainError::not_found("product", product_id));
        }

        let current = match self.running.get(&product_id) {
            Some(qty) => *qty,
            None => self.ledger.projector.counter(product_id)?,
        };
        let next = current
            .checked_add(movement.quantity)
            .ok_or_else(|| DomainError::validation("quantity out of range"))?;
        if next < 0 {
            return Err(DomainError::InsufficientStock(vec![StockShortfall {
                product_id,
                requested: -movement.quantity,
                available: current,
            }]));
        }

        self.running.insert(product_id, next);
        self.staged.push(movement);
        Ok(self)
    }

    pub fn staged_len(&self) -> usize {
        self.staged.len()
    }

    /// Write every staged movement and update the projection in one step.
    pub fn commit(self) -> DomainResult<Vec<MovementRecorded>> {
        if self.staged.is_empty() {
            return Ok(Vec::new());
        }

        let mut state = self.ledger.write()?;
        let mut counters = self.ledger.projector.write()?;

        // Re-check the final quantities under both locks before touching anything.
        let mut finals: HashMap<ProductId, i64> = HashMap::new();
        for m in &self.staged {
            let slot = finals
                .entry(m.product_id)
                .or_insert_with(|| counters.get(&m.product_id).copied().unwrap_or(0));
            let before = *slot;
            *slot = before
                .checked_add(m.quantity)
                .ok_or_else(|| DomainError::validation("quantity out of range"))?;
            if *slot < 0 {
                return Err(DomainError::InsufficientStock(vec![StockShortfall {
                    product_id: m.product_id,
                    requested: -m.quantity,
                    available: before,
                }]));
            }
        }

        let now = Utc::now();
        let mut recorded = Vec::with_capacity(self.staged.len());
        for m in self.staged {
            let sequence = state.entries.len() as u64 + 1;
            let movement = m.into_movement(sequence, now);

            let counter = counters.entry(movement.product_id).or_insert(0);
            *counter += movement.quantity;
            let on_hand_after = *counter;

            let index = state.entries.len();
            state.by_product.entry(movement.product_id).or_default().push(index);
            state.entries.push(movement.clone());

            tracing::debug!(
                movement_id = %movement.id,
                product_id = %movement.product_id,
                change_type = %movement.change_type,
                quantity = movement.quantity,
                on_hand_after,
                "movement appended"
            );
            recorded.push(MovementRecorded { movement, on_hand_after });
        }

        tracing::info!(movements = recorded.len(), "ledger commit");
        Ok(recorded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use stockwise_catalog::NewProduct;
    use stockwise_core::Money;

    use crate::movement::ChangeType;

    struct Fixture {
        catalog: Arc<CatalogStore>,
        ledger: MovementLedger,
    }

    fn fixture() -> Fixture {
        let catalog = Arc::new(CatalogStore::default());
        let projector = Arc::new(StockProjector::new(catalog.clone()));
        let ledger = MovementLedger::new(catalog.clone(), projector, Duration::from_millis(100));
        Fixture { catalog, ledger }
    }

    fn product(catalog: &CatalogStore, sku: &str) -> ProductId {
        catalog
            .create_product(NewProduct {
                sku: sku.to_string(),
                name: format!("Product {sku}"),
                unit_price: Money::from_minor(1_000),
                ..NewProduct::default()
            })
            .unwrap()
            .id
    }

    #[test]
    fn append_updates_projection_and_sequence() {
        let f = fixture();
        let p = product(&f.catalog, "MON-27");
        let lease = f.ledger.lock([p]).unwrap();

        let first = f
            .ledger
            .append(&lease, NewMovement::new(p, ChangeType::In, 10, "Initial stock"))
            .unwrap();
        let second = f
            .ledger
            .append(&lease, NewMovement::new(p, ChangeType::Out, -3, "Sold at counter"))
            .unwrap();

        assert_eq!((first.sequence, second.sequence), (1, 2));
        assert_eq!(f.ledger.projector().on_hand(p).unwrap(), 7);
        assert_eq!(f.ledger.fold_on_hand(p).unwrap(), 7);
        assert_eq!(
            f.ledger.recent(Page::default()).unwrap().iter().map(|m| m.sequence).collect::<Vec<_>>(),
            vec![2, 1]
        );
    }

    #[test]
    fn append_rejects_invalid_input_without_writing() {
        let f = fixture();
        let p = product(&f.catalog, "KB-01");
        let lease = f.ledger.lock([p]).unwrap();

        for bad in [
            NewMovement::new(p, ChangeType::In, 5, "   "),
            NewMovement::new(p, ChangeType::Adjustment, 0, "zero"),
            NewMovement::new(p, ChangeType::In, -5, "wrong sign"),
        ] {
            assert!(matches!(f.ledger.append(&lease, bad), Err(DomainError::Validation(_))));
        }
        assert!(f.ledger.is_empty().unwrap());
    }

    #[test]
    fn append_for_unknown_product_is_not_found() {
        let f = fixture();
        let ghost = ProductId::new();
        let lease = f.ledger.lock([ghost]).unwrap();

        let err = f
            .ledger
            .append(&lease, NewMovement::new(ghost, ChangeType::In, 1, "restock"))
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "product", .. }));
    }

    #[test]
    fn append_outside_lease_is_rejected() {
        let f = fixture();
        let leased = product(&f.catalog, "A");
        let other = product(&f.catalog, "B");
        let lease = f.ledger.lock([leased]).unwrap();

        let err = f
            .ledger
            .append(&lease, NewMovement::new(other, ChangeType::In, 1, "restock"))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn lease_from_another_ledger_is_rejected() {
        let f = fixture();
        let g = fixture();
        let p = product(&f.catalog, "A");
        let foreign = g.ledger.lock([p]).unwrap();

        assert!(matches!(f.ledger.begin(&foreign), Err(DomainError::InvariantViolation(_))));
    }

    #[test]
    fn transaction_is_all_or_nothing() {
        let f = fixture();
        let a = product(&f.catalog, "A");
        let b = product(&f.catalog, "B");
        let lease = f.ledger.lock([a, b]).unwrap();
        f.ledger.append(&lease, NewMovement::new(a, ChangeType::In, 5, "restock")).unwrap();

        let mut tx = f.ledger.begin(&lease).unwrap();
        tx.stage(NewMovement::new(a, ChangeType::Out, -4, "Order #1")).unwrap();
        let err = tx
            .stage(NewMovement::new(b, ChangeType::Out, -1, "Order #1"))
            .unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock(_)));
        drop(tx);

        assert_eq!(f.ledger.len().unwrap(), 1);
        assert_eq!(f.ledger.projector().on_hand(a).unwrap(), 5);
    }

    #[test]
    fn staging_tracks_running_quantity() {
        let f = fixture();
        let a = product(&f.catalog, "A");
        let lease = f.ledger.lock([a]).unwrap();
        f.ledger.append(&lease, NewMovement::new(a, ChangeType::In, 5, "restock")).unwrap();

        let mut tx = f.ledger.begin(&lease).unwrap();
        tx.stage(NewMovement::new(a, ChangeType::Out, -3, "line 1")).unwrap();
        let err = tx.stage(NewMovement::new(a, ChangeType::Out, -3, "line 2")).unwrap_err();

        assert_eq!(
            err,
            DomainError::InsufficientStock(vec![StockShortfall {
                product_id: a,
                requested: 3,
                available: 2,
            }])
        );
        assert_eq!(tx.staged_len(), 1);
    }

    #[test]
    fn rebuild_restores_a_corrupted_projection() {
        let f = fixture();
        let a = product(&f.catalog, "A");
        let lease = f.ledger.lock([a]).unwrap();
        f.ledger.append(&lease, NewMovement::new(a, ChangeType::In, 8, "restock")).unwrap();

        f.ledger.projector().write().unwrap().insert(a, 999);
        assert_eq!(f.ledger.projection_drift().unwrap(), vec![a]);

        f.ledger.rebuild_projection().unwrap();
        assert!(f.ledger.projection_drift().unwrap().is_empty());
        assert_eq!(f.ledger.projector().on_hand(a).unwrap(), 8);
    }

    #[test]
    fn history_marks_product_as_referenced() {
        let f = fixture();
        let a = product(&f.catalog, "A");
        assert!(!f.ledger.product_referenced(a));

        let lease = f.ledger.lock([a]).unwrap();
        f.ledger.append(&lease, NewMovement::new(a, ChangeType::In, 1, "restock")).unwrap();
        assert!(f.ledger.product_referenced(a));
    }

    proptest! {
        #[test]
        fn projection_always_matches_ledger_fold(deltas in proptest::collection::vec(-20i64..=20, 1..60)) {
            let f = fixture();
            let p = product(&f.catalog, "PROP");
            let lease = f.ledger.lock([p]).unwrap();

            for delta in deltas.into_iter().filter(|d| *d != 0) {
                let change_type = if delta > 0 { ChangeType::In } else { ChangeType::Out };
                let before = f.ledger.projector().on_hand(p).unwrap();
                let result = f.ledger.append(&lease, NewMovement::new(p, change_type, delta, "prop"));

                match result {
                    Ok(_) => prop_assert_eq!(f.ledger.projector().on_hand(p).unwrap(), before + delta),
                    Err(DomainError::InsufficientStock(_)) => {
                        prop_assert!(before + delta < 0);
                        prop_assert_eq!(f.ledger.projector().on_hand(p).unwrap(), before);
                    }
                    Err(other) => prop_assert!(false, "unexpected error: {other}"),
                }

                let on_hand = f.ledger.projector().on_hand(p).unwrap();
                prop_assert!(on_hand >= 0);
                prop_assert_eq!(on_hand, f.ledger.fold_on_hand(p).unwrap());
            }
        }
    }
}
