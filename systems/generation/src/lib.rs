#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic world generation around the player.
//!
//! Whenever the player moves, the system walks the square window of cells
//! around the new position, asks the luck source which of them host a cache,
//! and emits commands that materialize unseen caches and reveal the window.
//! Cells the world already knows are never regenerated.

use geocoin_core::{
    Cell, Coin, Command, Event, WorldConfig, MAX_COINS_LIMIT, MAX_NEIGHBORHOOD_SIZE,
};
use geocoin_system_luck::{Luck, Sha256Luck};
use geocoin_world::query::CacheIndexView;

/// Suffix appended to a cell key when drawing its initial coin count.
pub const INITIAL_VALUE_SUFFIX: &str = "initialValue";

/// Parameters controlling cache placement and size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerationConfig {
    neighborhood_size: u32,
    spawn_probability: f64,
    max_coins: u32,
}

impl GenerationConfig {
    /// Creates a configuration from its raw parameters.
    ///
    /// Window and coin bounds above the limits `WorldConfig::validate` enforces
    /// are clamped to those limits.
    #[must_use]
    pub fn new(neighborhood_size: u32, spawn_probability: f64, max_coins: u32) -> Self {
        Self {
            neighborhood_size: neighborhood_size.min(MAX_NEIGHBORHOOD_SIZE),
            spawn_probability,
            max_coins: max_coins.min(MAX_COINS_LIMIT),
        }
    }

    /// Half-width of the square window around the player.
    #[must_use]
    pub const fn neighborhood_size(&self) -> u32 {
        self.neighborhood_size
    }

    /// Probability that a cell hosts a cache.
    #[must_use]
    pub const fn spawn_probability(&self) -> f64 {
        self.spawn_probability
    }

    /// Exclusive upper bound on a new cache's coin count.
    #[must_use]
    pub const fn max_coins(&self) -> u32 {
        self.max_coins
    }
}

impl From<&WorldConfig> for GenerationConfig {
    fn from(config: &WorldConfig) -> Self {
        Self::new(
            config.neighborhood_size,
            config.spawn_probability,
            config.max_coins,
        )
    }
}

/// Pure system that decides where caches live and what they start with.
#[derive(Debug)]
pub struct WorldGeneration<L = Sha256Luck> {
    config: GenerationConfig,
    luck: L,
}

impl WorldGeneration<Sha256Luck> {
    /// Creates a generator backed by the default SHA-256 luck.
    #[must_use]
    pub fn with_default_luck(config: GenerationConfig) -> Self {
        Self::new(config, Sha256Luck)
    }
}

impl<L: Luck> WorldGeneration<L> {
    /// Creates a generator drawing from the provided luck source.
    #[must_use]
    pub fn new(config: GenerationConfig, luck: L) -> Self {
        Self { config, luck }
    }

    /// Consumes `PlayerMoved` events and emits cache materialization commands.
    ///
    /// Only the latest movement in the batch matters: the window it describes
    /// is the one the player ends up seeing.
    pub fn handle(&self, events: &[Event], index: CacheIndexView<'_>, out: &mut Vec<Command>) {
        let Some(center) = events.iter().rev().find_map(|event| match event {
            Event::PlayerMoved { to, .. } => Some(*to),
            _ => None,
        }) else {
            return;
        };

        let mut visible = Vec::new();
        let mut materialized = 0usize;
        for cell in neighborhood(center, self.config.neighborhood_size) {
            if !self.spawns_cache(cell) {
                continue;
            }
            if !index.contains(cell) {
                out.push(Command::MaterializeCache {
                    cell,
                    coins: self.initial_coins(cell),
                });
                materialized += 1;
            }
            visible.push(cell);
        }

        tracing::debug!(
            %center,
            visible = visible.len(),
            materialized,
            "window generated"
        );
        out.push(Command::RevealWindow { cells: visible });
    }

    /// Reports whether `cell` hosts a cache.
    #[must_use]
    pub fn spawns_cache(&self, cell: Cell) -> bool {
        self.luck.value_for(&cell_key(cell)) < self.config.spawn_probability
    }

    /// Mints the coins a cache in `cell` starts with, serials `0..count`.
    #[must_use]
    pub fn initial_coins(&self, cell: Cell) -> Vec<Coin> {
        let draw = self.luck.value_for(&initial_value_key(cell));
        let count = (draw * f64::from(self.config.max_coins)).floor() as u32;
        (0..count).map(|serial| Coin::new(cell, serial)).collect()
    }
}

/// Luck key deciding whether `cell` hosts a cache.
#[must_use]
pub fn cell_key(cell: Cell) -> String {
    format!("{},{}", cell.i(), cell.j())
}

/// Luck key deciding how many coins a cache in `cell` starts with.
#[must_use]
pub fn initial_value_key(cell: Cell) -> String {
    format!("{},{},{INITIAL_VALUE_SUFFIX}", cell.i(), cell.j())
}

/// Cells within Chebyshev distance `half_width` of `center`, row-major.
///
/// `half_width` is capped at [`MAX_NEIGHBORHOOD_SIZE`].
#[must_use]
pub fn neighborhood(center: Cell, half_width: u32) -> Vec<Cell> {
    let half_width = half_width.min(MAX_NEIGHBORHOOD_SIZE);
    let reach = half_width as i32;
    let side = half_width as usize * 2 + 1;
    let mut cells = Vec::with_capacity(side * side);
    for di in -reach..=reach {
        for dj in -reach..=reach {
            cells.push(center.offset(di, dj));
        }
    }
    cells
}
