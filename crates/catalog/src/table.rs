use std::collections::HashMap;

use stockwise_core::{DomainError, DomainResult, Entity};

/// Keyed table of entities that remembers insertion order.
///
/// Listings iterate in insertion order so pagination is stable.
#[derive(Debug, Clone)]
pub struct EntityTable<T: Entity> {
    rows: HashMap<T::Id, T>,
    order: Vec<T::Id>,
}

impl<T: Entity> Default for EntityTable<T> {
    fn default() -> Self {
        Self {
            rows: HashMap::new(),
            order: Vec::new(),
        }
    }
}

impl<T: Entity> EntityTable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn contains(&self, id: &T::Id) -> bool {
        self.rows.contains_key(id)
    }

    pub fn get(&self, id: &T::Id) -> Option<&T> {
        self.rows.get(id)
    }

    /// Like `get`, but a missing row is a `NotFound` error.
    pub fn require(&self, id: &T::Id) -> DomainResult<&T> {
        self.rows
            .get(id)
            .ok_or_else(|| DomainError::not_found(T::KIND, id))
    }

    /// Insert a new row; an existing id is a conflict.
    pub fn insert(&mut self, row: T) -> DomainResult<()> {
        let id = *row.id();
        if self.rows.contains_key(&id) {
            return Err(DomainError::conflict(format!("{} {id} already exists", T::KIND)));
        }
        self.order.push(id);
        self.rows.insert(id, row);
        Ok(())
    }

    /// Replace an existing row (same id).
    pub fn replace(&mut self, row: T) -> DomainResult<()> {
        let id = *row.id();
        match self.rows.get_mut(&id) {
            Some(slot) => {
                *slot = row;
                Ok(())
            }
            None => Err(DomainError::not_found(T::KIND, id)),
        }
    }

    pub fn remove(&mut self, id: &T::Id) -> DomainResult<T> {
        let row = self
            .rows
            .remove(id)
            .ok_or_else(|| DomainError::not_found(T::KIND, id))?;
        self.order.retain(|existing| existing != id);
        Ok(row)
    }

    /// Iterate rows in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.order.iter().filter_map(|id| self.rows.get(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockwise_core::ProductId;

    #[derive(Debug, Clone, PartialEq)]
    struct Row {
        id: ProductId,
        label: &'static str,
    }

    impl Entity for Row {
        type Id = ProductId;

        const KIND: &'static str = "row";

        fn id(&self) -> &Self::Id {
            &self.id
        }
    }

    #[test]
    fn iteration_follows_insertion_order() {
        let mut table = EntityTable::new();
        for label in ["c", "a", "b"] {
            table.insert(Row { id: ProductId::new(), label }).unwrap();
        }
        let labels: Vec<_> = table.iter().map(|r| r.label).collect();
        assert_eq!(labels, vec!["c", "a", "b"]);
    }

    #[test]
    fn duplicate_insert_is_conflict_and_missing_remove_is_not_found() {
        let mut table = EntityTable::new();
        let row = Row { id: ProductId::new(), label: "x" };
        table.insert(row.clone()).unwrap();

        assert!(matches!(table.insert(row.clone()), Err(DomainError::Conflict(_))));

        table.remove(&row.id).unwrap();
        assert!(table.is_empty());
        assert!(matches!(
            table.remove(&row.id),
            Err(DomainError::NotFound { entity: "row", .. })
        ));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Removing rows never disturbs the relative order of the rest.
            #[test]
            fn removal_preserves_order_of_remaining_rows(
                keep in proptest::collection::vec(any::<bool>(), 1..40)
            ) {
                let mut table = EntityTable::new();
                let ids: Vec<ProductId> = keep.iter().map(|_| ProductId::new()).collect();
                for id in &ids {
                    table.insert(Row { id: *id, label: "r" }).unwrap();
                }
                for (id, kept) in ids.iter().zip(&keep) {
                    if !kept {
                        table.remove(id).unwrap();
                    }
                }

                let expected: Vec<ProductId> = ids
                    .iter()
                    .zip(&keep)
                    .filter(|(_, kept)| **kept)
                    .map(|(id, _)| *id)
                    .collect();
                let listed: Vec<ProductId> = table.iter().map(|r| r.id).collect();
                prop_assert_eq!(table.len(), expected.len());
                prop_assert_eq!(listed, expected);
            }
        }
    }
}
