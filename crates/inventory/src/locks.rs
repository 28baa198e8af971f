//! Per-product mutual exclusion for "check availability, then append".

use std::collections::{BTreeSet, HashSet};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use stockwise_core::{DomainError, DomainResult, ProductId};

/// Lock table keyed by product id.
///
/// A lease covers every product of one operation. All ids are claimed in a
/// single step (in ascending order), so two operations sharing products in
/// opposite order can never deadlock.
#[derive(Debug)]
pub struct StockLocks {
    held: Mutex<HashSet<ProductId>>,
    released: Condvar,
    timeout: Duration,
}

impl StockLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            held: Mutex::new(HashSet::new()),
            released: Condvar::new(),
            timeout,
        }
    }

    /// Claim every product in `products`, waiting up to the configured timeout.
    ///
    /// A timeout is a retryable `Conflict`.
    pub fn acquire(&self, products: impl IntoIterator<Item = ProductId>) -> DomainResult<StockLease<'_>> {
        let products: Vec<ProductId> = products.into_iter().collect::<BTreeSet<_>>().into_iter().collect();

        let held = self.held.lock().map_err(|_| DomainError::poisoned("stock lock table"))?;
        let (mut held, wait) = self
            .released
            .wait_timeout_while(held, self.timeout, |held| products.iter().any(|p| held.contains(p)))
            .map_err(|_| DomainError::poisoned("stock lock table"))?;

        if wait.timed_out() && products.iter().any(|p| held.contains(p)) {
            tracing::warn!(products = products.len(), "timed out waiting for stock locks");
            return Err(DomainError::conflict(
                "products are busy with another stock operation; retry",
            ));
        }

        held.extend(products.iter().copied());
        tracing::debug!(products = ?products, "stock locks acquired");

        Ok(StockLease { locks: self, products })
    }

    /// Number of products currently claimed.
    pub fn held_count(&self) -> usize {
        self.held.lock().map(|h| h.len()).unwrap_or(0)
    }
}

/// Proof that the holder has exclusive stock access to a set of products.
/// Released on drop.
#[derive(Debug)]
pub struct StockLease<'a> {
    locks: &'a StockLocks,
    products: Vec<ProductId>,
}

impl StockLease<'_> {
    pub fn covers(&self, product_id: ProductId) -> bool {
        self.products.binary_search(&product_id).is_ok()
    }

    /// Covered products, ascending.
    pub fn products(&self) -> &[ProductId] {
        &self.products
    }

    pub(crate) fn issued_by(&self, locks: &StockLocks) -> bool {
        core::ptr::eq(self.locks, locks)
    }
}

impl Drop for StockLease<'_> {
    fn drop(&mut self) {
        // Release even if a panicking holder poisoned the table.
        let mut held = match self.locks.held.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for p in &self.products {
            held.remove(p);
        }
        drop(held);
        self.locks.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn lease_is_sorted_and_deduplicated() {
        let locks = StockLocks::new(Duration::from_millis(50));
        let a = ProductId::new();
        let b = ProductId::new();

        let lease = locks.acquire([b, a, b]).unwrap();
        let mut expected = vec![a, b];
        expected.sort();

        assert_eq!(lease.products(), expected.as_slice());
        assert!(lease.covers(a) && lease.covers(b));
        assert!(!lease.covers(ProductId::new()));
        assert_eq!(locks.held_count(), 2);

        drop(lease);
        assert_eq!(locks.held_count(), 0);
    }

    #[test]
    fn overlapping_lease_times_out_as_conflict() {
        let locks = StockLocks::new(Duration::from_millis(20));
        let shared = ProductId::new();
        let _first = locks.acquire([shared]).unwrap();

        let err = locks.acquire([ProductId::new(), shared]).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn disjoint_leases_do_not_block() {
        let locks = StockLocks::new(Duration::from_millis(20));
        let _a = locks.acquire([ProductId::new()]).unwrap();
        assert!(locks.acquire([ProductId::new()]).is_ok());
    }

    #[test]
    fn opposite_order_acquisition_does_not_deadlock() {
        let locks = Arc::new(StockLocks::new(Duration::from_secs(5)));
        let a = ProductId::new();
        let b = ProductId::new();
        let done = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let locks = locks.clone();
                let done = done.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        let order = if i % 2 == 0 { [a, b] } else { [b, a] };
                        let _lease = locks.acquire(order).unwrap();
                    }
                    done.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(done.load(Ordering::SeqCst), 8);
        assert_eq!(locks.held_count(), 0);
    }
}
