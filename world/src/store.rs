//! Authoritative storage of every materialized cache.

use std::collections::{btree_map::Entry, BTreeMap, HashSet};

use geocoin_core::{CacheMemento, Cell, Coin, LedgerError, MementoError};

use crate::{
    ledger::Cache,
    memento::{restore as decode_cache, snapshot as encode_cache},
};

/// Mapping from cell to the cache living there.
///
/// The store owns every [`Cache`]; callers only ever borrow them, so a coin can
/// never be copied into two places by accident.
#[derive(Debug, Default)]
pub struct CacheStore {
    caches: BTreeMap<Cell, Cache>,
}

impl CacheStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cache for `cell`, generating it on first visit.
    ///
    /// `generator` runs at most once per cell; revisiting a cell returns the
    /// stored cache untouched so its contents are never re-rolled.
    pub fn get_or_create<F>(&mut self, cell: Cell, generator: F) -> Result<&mut Cache, LedgerError>
    where
        F: FnOnce() -> Vec<Coin>,
    {
        match self.caches.entry(cell) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let cache = Cache::new(cell, generator())?;
                tracing::debug!(%cell, coins = cache.coin_count(), "cache materialized");
                Ok(entry.insert(cache))
            }
        }
    }

    /// Cache stored for `cell`, if any.
    #[must_use]
    pub fn get(&self, cell: Cell) -> Option<&Cache> {
        self.caches.get(&cell)
    }

    /// Mutable cache stored for `cell`, if any.
    pub fn get_mut(&mut self, cell: Cell) -> Option<&mut Cache> {
        self.caches.get_mut(&cell)
    }

    /// Reports whether a cache exists for `cell`.
    #[must_use]
    pub fn contains(&self, cell: Cell) -> bool {
        self.caches.contains_key(&cell)
    }

    /// Serializes the cache for `cell`, or `None` when no cache was ever created there.
    #[must_use]
    pub fn snapshot(&self, cell: Cell) -> Option<CacheMemento> {
        self.caches.get(&cell).map(encode_cache)
    }

    /// Replaces the cache for `cell` with the contents of `memento`.
    ///
    /// The memento is fully decoded and validated before anything is written,
    /// so a corrupt memento leaves the store exactly as it was. Restoring into
    /// an unknown cell creates the cache.
    pub fn restore(&mut self, cell: Cell, memento: &CacheMemento) -> Result<&Cache, MementoError> {
        let cache = decode_cache(memento)?;
        if cache.cell() != cell {
            return Err(MementoError::CellMismatch {
                expected: cell,
                found: cache.cell(),
            });
        }
        if let Some(coin) = self.coin_owned_elsewhere(cell, cache.coins()) {
            return Err(MementoError::DuplicateCoin { coin });
        }

        match self.caches.entry(cell) {
            Entry::Occupied(mut entry) => {
                let _ = entry.insert(cache);
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => Ok(entry.insert(cache)),
        }
    }

    /// Serializes and removes the cache for `cell`.
    pub fn evict(&mut self, cell: Cell) -> Option<CacheMemento> {
        self.caches.remove(&cell).map(|cache| encode_cache(&cache))
    }

    /// Number of stored caches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.caches.len()
    }

    /// Reports whether the store holds no caches.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.caches.is_empty()
    }

    /// Total number of coins across all stored caches.
    #[must_use]
    pub fn coin_count(&self) -> usize {
        self.caches.values().map(Cache::coin_count).sum()
    }

    /// Iterates caches in cell order.
    pub fn iter(&self) -> impl Iterator<Item = &Cache> {
        self.caches.values()
    }

    fn coin_owned_elsewhere(&self, cell: Cell, coins: &[Coin]) -> Option<Coin> {
        if coins.is_empty() {
            return None;
        }
        let incoming: HashSet<Coin> = coins.iter().copied().collect();
        self.caches
            .values()
            .filter(|cache| cache.cell() != cell)
            .flat_map(|cache| cache.coins().iter().copied())
            .find(|coin| incoming.contains(coin))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell as Counter;

    use super::*;
    use crate::ledger::{poke, PlayerHolding};

    fn minted(cell: Cell, count: u32) -> Vec<Coin> {
        (0..count).map(|serial| Coin::new(cell, serial)).collect()
    }

    #[test]
    fn generator_runs_only_on_first_visit() {
        let mut store = CacheStore::new();
        let cell = Cell::new(2, 3);
        let calls = Counter::new(0);

        let first = store
            .get_or_create(cell, || {
                calls.set(calls.get() + 1);
                minted(cell, 3)
            })
            .expect("unique coins")
            .coins()
            .to_vec();
        let second = store
            .get_or_create(cell, || {
                calls.set(calls.get() + 1);
                minted(cell, 50)
            })
            .expect("existing cache")
            .coins()
            .to_vec();

        assert_eq!(calls.get(), 1);
        assert_eq!(first, second);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn snapshot_of_unknown_cell_is_none() {
        let store = CacheStore::new();
        assert!(store.snapshot(Cell::new(0, 0)).is_none());
    }

    #[test]
    fn restore_round_trips_after_mutation() {
        let mut store = CacheStore::new();
        let cell = Cell::new(1, 1);
        let mut holding = PlayerHolding::new();
        let cache = store
            .get_or_create(cell, || minted(cell, 4))
            .expect("unique coins");
        let _ = poke(cache, &mut holding).expect("coins available");
        let before = store.get(cell).expect("cache").coins().to_vec();

        let memento = store.snapshot(cell).expect("cache exists");
        let restored = store.restore(cell, &memento).expect("valid memento");

        assert_eq!(restored.coins(), before.as_slice());
    }

    #[test]
    fn restore_creates_missing_cache() {
        let mut source = CacheStore::new();
        let cell = Cell::new(-5, 2);
        let _ = source
            .get_or_create(cell, || minted(cell, 2))
            .expect("unique coins");
        let memento = source.evict(cell).expect("cache exists");

        let mut target = CacheStore::new();
        let restored = target.restore(cell, &memento).expect("valid memento");

        assert_eq!(restored.coins(), minted(cell, 2).as_slice());
        assert!(source.is_empty());
    }

    #[test]
    fn corrupt_memento_leaves_cache_untouched() {
        let mut store = CacheStore::new();
        let cell = Cell::new(0, 0);
        let _ = store
            .get_or_create(cell, || minted(cell, 5))
            .expect("unique coins");

        let corrupt = CacheMemento::from_encoded(r#"{"i":0,"j":0,"coins":[{"cellI":0}"#);
        assert!(matches!(
            store.restore(cell, &corrupt),
            Err(MementoError::Malformed { .. })
        ));
        assert_eq!(
            store.get(cell).expect("cache").coins(),
            minted(cell, 5).as_slice()
        );
    }

    #[test]
    fn memento_for_another_cell_is_refused() {
        let mut store = CacheStore::new();
        let cell = Cell::new(0, 0);
        let other = Cell::new(0, 1);
        let _ = store.get_or_create(cell, Vec::new).expect("empty cache");
        let _ = store
            .get_or_create(other, || minted(other, 1))
            .expect("unique coins");
        let foreign = store.snapshot(other).expect("cache exists");

        assert_eq!(
            store.restore(cell, &foreign),
            Err(MementoError::CellMismatch {
                expected: cell,
                found: other,
            })
        );
        assert!(store.get(cell).expect("cache").is_empty());
    }

    #[test]
    fn memento_cannot_duplicate_coins_owned_by_another_cache() {
        let mut store = CacheStore::new();
        let home = Cell::new(3, 3);
        let away = Cell::new(4, 4);
        let _ = store
            .get_or_create(home, || minted(home, 2))
            .expect("unique coins");
        let _ = store.get_or_create(away, Vec::new).expect("empty cache");
        let forged = CacheMemento::from_encoded(
            r#"{"i":4,"j":4,"coins":[{"cellI":3,"cellJ":3,"serial":1}]}"#,
        );

        assert_eq!(
            store.restore(away, &forged),
            Err(MementoError::DuplicateCoin {
                coin: Coin::new(home, 1)
            })
        );
        assert_eq!(store.coin_count(), 2);
    }
}
