#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Geocoin.

pub mod grid;
pub mod ledger;
pub mod memento;
pub mod store;

use std::{collections::BTreeMap, rc::Rc};

use geocoin_core::{
    CacheMemento, Cell, Coin, Command, ConfigError, Event, GeoPoint, HoldingMemento,
    LedgerError, MementoError, Residency, WorldConfig, WELCOME_BANNER,
};

pub use grid::CoordinateGrid;
pub use ledger::{Cache, PlayerHolding};
pub use store::CacheStore;

/// Represents the authoritative Geocoin world state.
#[derive(Debug)]
pub struct World {
    banner: &'static str,
    config: WorldConfig,
    grid: CoordinateGrid,
    player_position: GeoPoint,
    player_cell: Rc<Cell>,
    holding: PlayerHolding,
    store: CacheStore,
    archive: BTreeMap<Cell, CacheMemento>,
    visible: Vec<Cell>,
}

impl World {
    /// Creates a world with the player standing on the configured origin.
    pub fn new(config: WorldConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut grid = CoordinateGrid::new(config.origin, config.tile_degrees);
        let player_position = config.origin;
        let player_cell = grid.cell_for(player_position);
        Ok(Self {
            banner: WELCOME_BANNER,
            config,
            grid,
            player_position,
            player_cell,
            holding: PlayerHolding::new(),
            store: CacheStore::new(),
            archive: BTreeMap::new(),
            visible: Vec::new(),
        })
    }

    fn relocate(&mut self, position: GeoPoint, out_events: &mut Vec<Event>) {
        if !(position.lat.is_finite() && position.lng.is_finite()) {
            tracing::warn!(?position, "ignoring non-finite player position");
            return;
        }

        let from = *self.player_cell;
        self.player_position = position;
        self.player_cell = self.grid.cell_for(position);
        let to = *self.player_cell;
        tracing::debug!(%from, %to, "player moved");
        out_events.push(Event::PlayerMoved { from, to });
    }

    fn materialize(&mut self, cell: Cell, coins: Vec<Coin>, out_events: &mut Vec<Event>) {
        if self.archive.contains_key(&cell) || self.store.contains(cell) {
            return;
        }

        match self.store.get_or_create(cell, move || coins) {
            Ok(cache) => out_events.push(Event::CacheMaterialized {
                cell,
                coin_count: count_u32(cache.coin_count()),
            }),
            Err(error) => tracing::error!(%cell, %error, "refusing to materialize cache"),
        }
    }

    fn reveal(&mut self, mut cells: Vec<Cell>, out_events: &mut Vec<Event>) {
        cells.sort_unstable();
        cells.dedup();

        if self.config.residency == Residency::Windowed {
            let leaving: Vec<Cell> = self
                .store
                .iter()
                .map(Cache::cell)
                .filter(|cell| cells.binary_search(cell).is_err())
                .collect();
            for cell in leaving {
                if let Some(memento) = self.store.evict(cell) {
                    tracing::debug!(%cell, "cache archived");
                    let _ = self.archive.insert(cell, memento);
                    out_events.push(Event::CacheArchived { cell });
                }
            }
            for cell in &cells {
                self.ensure_resident(*cell, out_events);
            }
        }

        self.visible = cells.clone();
        out_events.push(Event::WindowRevealed { cells });
    }

    fn ensure_resident(&mut self, cell: Cell, out_events: &mut Vec<Event>) {
        let Some(memento) = self.archive.remove(&cell) else {
            return;
        };
        match self.store.restore(cell, &memento) {
            Ok(_) => {
                tracing::debug!(%cell, "cache restored from archive");
                out_events.push(Event::CacheRestored { cell });
            }
            Err(reason) => {
                tracing::error!(%cell, %reason, "archived memento is corrupt");
                let _ = self.archive.insert(cell, memento);
                out_events.push(Event::RestoreRejected {
                    cell: Some(cell),
                    reason,
                });
            }
        }
    }

    fn poke(&mut self, cell: Cell, out_events: &mut Vec<Event>) {
        self.ensure_resident(cell, out_events);
        let outcome = match self.store.get_mut(cell) {
            Some(cache) => ledger::poke(cache, &mut self.holding),
            None => Err(LedgerError::EmptyCache),
        };
        match outcome {
            Ok(coin) => out_events.push(Event::CoinPoked { cell, coin }),
            Err(reason) => {
                tracing::warn!(%cell, %reason, "poke rejected");
                out_events.push(Event::PokeRejected { cell, reason });
            }
        }
    }

    fn deposit(&mut self, cell: Cell, out_events: &mut Vec<Event>) {
        if self.holding.is_empty() {
            tracing::trace!(%cell, "deposit ignored, nothing held");
            return;
        }

        self.ensure_resident(cell, out_events);
        let created = !self.store.contains(cell);
        let cache = match self.store.get_or_create(cell, Vec::new) {
            Ok(cache) => cache,
            Err(error) => {
                tracing::error!(%cell, %error, "cannot open cache for deposit");
                return;
            }
        };
        if created {
            out_events.push(Event::CacheMaterialized {
                cell,
                coin_count: 0,
            });
        }
        if let Ok(coin) = ledger::deposit(&mut self.holding, cache) {
            out_events.push(Event::CoinDeposited { cell, coin });
        }
    }

    fn restore_cache(&mut self, cell: Cell, memento: &CacheMemento, out_events: &mut Vec<Event>) {
        // The store guards against resident duplicates; held and archived coins
        // live outside it and are checked here.
        let outcome = memento::restore(memento)
            .and_then(|cache| {
                let held = self.holding.coins().iter().copied();
                if let Some(coin) = held
                    .chain(self.archived_coins(Some(cell)))
                    .find(|coin| cache.coins().contains(coin))
                {
                    return Err(MementoError::DuplicateCoin { coin });
                }
                // A memento for another cell is left for the store to refuse.
                if cache.cell() == cell {
                    if let Some(coin) = dropped_coin(&self.coins_at(cell), cache.coins()) {
                        return Err(MementoError::LostCoin { coin });
                    }
                }
                Ok(())
            })
            .and_then(|()| self.store.restore(cell, memento).map(|_| ()));
        match outcome {
            Ok(()) => {
                let _ = self.archive.remove(&cell);
                tracing::debug!(%cell, "cache restored");
                out_events.push(Event::CacheRestored { cell });
            }
            Err(reason) => {
                tracing::error!(%cell, %reason, "refusing corrupt cache memento");
                out_events.push(Event::RestoreRejected {
                    cell: Some(cell),
                    reason,
                });
            }
        }
    }

    fn restore_holding(&mut self, memento: &HoldingMemento, out_events: &mut Vec<Event>) {
        let restored = memento::restore_holding(memento).and_then(|holding| {
            if let Some(coin) = self.cached_coin_among(holding.coins()) {
                return Err(MementoError::DuplicateCoin { coin });
            }
            match dropped_coin(self.holding.coins(), holding.coins()) {
                Some(coin) => Err(MementoError::LostCoin { coin }),
                None => Ok(holding),
            }
        });
        match restored {
            Ok(holding) => {
                self.holding = holding;
                out_events.push(Event::HoldingRestored {
                    coin_count: count_u32(self.holding.len()),
                });
            }
            Err(reason) => {
                tracing::error!(%reason, "refusing corrupt holding memento");
                out_events.push(Event::RestoreRejected { cell: None, reason });
            }
        }
    }

    fn cached_coin_among(&self, coins: &[Coin]) -> Option<Coin> {
        self.store
            .iter()
            .flat_map(|cache| cache.coins().iter().copied())
            .chain(self.archived_coins(None))
            .find(|coin| coins.contains(coin))
    }

    fn coins_at(&self, cell: Cell) -> Vec<Coin> {
        match self.store.get(cell) {
            Some(cache) => cache.coins().to_vec(),
            None => self
                .archive
                .get(&cell)
                .and_then(|memento| memento::restore(memento).ok())
                .map(|cache| cache.coins().to_vec())
                .unwrap_or_default(),
        }
    }

    fn archived_coins(&self, skip: Option<Cell>) -> impl Iterator<Item = Coin> + '_ {
        self.archive
            .iter()
            .filter(move |(cell, _)| Some(**cell) != skip)
            .filter_map(|(_, memento)| memento::restore(memento).ok())
            .flat_map(|cache| cache.coins().to_vec())
    }
}

/// First coin of `current` that `incoming` does not carry over.
fn dropped_coin(current: &[Coin], incoming: &[Coin]) -> Option<Coin> {
    current.iter().copied().find(|coin| !incoming.contains(coin))
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::MovePlayer { direction } => {
            let (di, dj) = direction.tile_delta();
            let step = f64::from(world.config.move_step_tiles) * world.config.tile_degrees;
            let position = world
                .player_position
                .translated(f64::from(di) * step, f64::from(dj) * step);
            world.relocate(position, out_events);
        }
        Command::RelocatePlayer { position } => world.relocate(position, out_events),
        Command::MaterializeCache { cell, coins } => world.materialize(cell, coins, out_events),
        Command::RevealWindow { cells } => world.reveal(cells, out_events),
        Command::Poke { cell } => world.poke(cell, out_events),
        Command::Deposit { cell } => world.deposit(cell, out_events),
        Command::RestoreCache { cell, memento } => world.restore_cache(cell, &memento, out_events),
        Command::RestoreHolding { memento } => world.restore_holding(&memento, out_events),
    }
}

fn count_u32(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::collections::BTreeMap;

    use super::{memento, Cache, World};
    use geocoin_core::{
        CacheMemento, Cell, Coin, GeoPoint, GeoRect, HoldingMemento, WorldConfig,
    };

    /// Retrieves the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(world: &World) -> &'static str {
        world.banner
    }

    /// Provides read-only access to the configuration the world was built with.
    #[must_use]
    pub fn config(world: &World) -> &WorldConfig {
        &world.config
    }

    /// Last reported player position.
    #[must_use]
    pub fn player_position(world: &World) -> GeoPoint {
        world.player_position
    }

    /// Cell the player currently stands in.
    #[must_use]
    pub fn player_cell(world: &World) -> Cell {
        *world.player_cell
    }

    /// Coins carried by the player, most recently collected last.
    #[must_use]
    pub fn holding(world: &World) -> &[Coin] {
        world.holding.coins()
    }

    /// Points shown on the status panel: one per carried coin.
    #[must_use]
    pub fn player_points(world: &World) -> usize {
        world.holding.len()
    }

    /// Projection of the cache stored for `cell`, if it is resident.
    #[must_use]
    pub fn cache(world: &World, cell: Cell) -> Option<CacheView<'_>> {
        world.store.get(cell).map(CacheView::from)
    }

    /// Projections of the caches inside the current window, in cell order.
    #[must_use]
    pub fn visible_caches(world: &World) -> Vec<CacheView<'_>> {
        world
            .visible
            .iter()
            .filter_map(|cell| world.store.get(*cell))
            .map(CacheView::from)
            .collect()
    }

    /// Projections of every resident cache, in cell order.
    #[must_use]
    pub fn resident_caches(world: &World) -> Vec<CacheView<'_>> {
        world.store.iter().map(CacheView::from).collect()
    }

    /// Exposes which cells already own a cache, resident or archived.
    #[must_use]
    pub fn cache_index(world: &World) -> CacheIndexView<'_> {
        CacheIndexView { world }
    }

    /// Geographic rectangle covered by `cell`.
    #[must_use]
    pub fn bounds_for(world: &World, cell: Cell) -> GeoRect {
        world.grid.bounds_for(cell)
    }

    /// Geographic centre of `cell`.
    #[must_use]
    pub fn center_of(world: &World, cell: Cell) -> GeoPoint {
        world.grid.center_of(cell)
    }

    /// Number of cells interned by the world's grid.
    #[must_use]
    pub fn interned_cells(world: &World) -> usize {
        world.grid.interned_len()
    }

    /// Counts every coin in the world by where it currently lives.
    #[must_use]
    pub fn coin_census(world: &World) -> CoinCensus {
        let archived = world
            .archive
            .values()
            .map(|memento| {
                memento::restore(memento).map_or(0, |cache| cache.coin_count())
            })
            .sum();
        CoinCensus {
            resident: world.store.coin_count(),
            archived,
            held: world.holding.len(),
        }
    }

    /// Mementos for every cache ever materialized, resident or archived.
    #[must_use]
    pub fn cache_mementos(world: &World) -> BTreeMap<Cell, CacheMemento> {
        let mut mementos = world.archive.clone();
        for cache in world.store.iter() {
            let _ = mementos.insert(cache.cell(), memento::snapshot(cache));
        }
        mementos
    }

    /// Memento of the coins carried by the player.
    #[must_use]
    pub fn holding_memento(world: &World) -> HoldingMemento {
        memento::snapshot_holding(&world.holding)
    }

    /// Read-only projection of a single cache for presentation.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CacheView<'a> {
        /// Cell hosting the cache.
        pub cell: Cell,
        /// Number of coins in the cache.
        pub coin_count: usize,
        /// Coins in stack order, bottom first.
        pub coins: &'a [Coin],
    }

    impl<'a> From<&'a Cache> for CacheView<'a> {
        fn from(cache: &'a Cache) -> Self {
            Self {
                cell: cache.cell(),
                coin_count: cache.coin_count(),
                coins: cache.coins(),
            }
        }
    }

    /// Read-only view answering whether a cell already owns a cache.
    #[derive(Clone, Copy, Debug)]
    pub struct CacheIndexView<'a> {
        world: &'a World,
    }

    impl CacheIndexView<'_> {
        /// Reports whether a cache was ever created for `cell`.
        #[must_use]
        pub fn contains(&self, cell: Cell) -> bool {
            self.world.store.contains(cell) || self.world.archive.contains_key(&cell)
        }
    }

    /// Breakdown of where the world's coins currently live.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CoinCensus {
        /// Coins inside resident caches.
        pub resident: usize,
        /// Coins inside archived cache mementos.
        pub archived: usize,
        /// Coins carried by the player.
        pub held: usize,
    }

    impl CoinCensus {
        /// Total number of coins in the world.
        #[must_use]
        pub fn total(&self) -> usize {
            self.resident + self.archived + self.held
        }
    }
}
