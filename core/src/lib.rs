#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Geocoin engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! views, and respond exclusively with new command batches.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Geocoin.";

/// Largest accepted half-width of the generated window.
pub const MAX_NEIGHBORHOOD_SIZE: u32 = 64;

/// Largest accepted bound on a new cache's coin count.
pub const MAX_COINS_LIMIT: u32 = 10_000;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Moves the player one step in the provided direction.
    MovePlayer {
        /// Direction of travel for the step.
        direction: Direction,
    },
    /// Teleports the player to an absolute position reported by a location provider.
    RelocatePlayer {
        /// Geographic position the player now occupies.
        position: GeoPoint,
    },
    /// Requests that a cache be created for the cell unless one is already known.
    MaterializeCache {
        /// Cell that hosts the cache.
        cell: Cell,
        /// Coins the cache starts with when it does not exist yet.
        coins: Vec<Coin>,
    },
    /// Replaces the set of caches currently inside the player's visible window.
    RevealWindow {
        /// Cells hosting caches that are visible after the latest movement.
        cells: Vec<Cell>,
    },
    /// Moves the most recently stored coin of a cache into the player's holding.
    Poke {
        /// Cell hosting the cache being poked.
        cell: Cell,
    },
    /// Moves the most recently collected coin from the player into a cache.
    Deposit {
        /// Cell hosting the cache receiving the coin.
        cell: Cell,
    },
    /// Overwrites the cache stored for a cell with the contents of a memento.
    RestoreCache {
        /// Cell that the memento is applied to.
        cell: Cell,
        /// Encoded cache state.
        memento: CacheMemento,
    },
    /// Replaces the player's holding with the contents of a memento.
    RestoreHolding {
        /// Encoded holding state.
        memento: HoldingMemento,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Announces that the player occupies a (possibly unchanged) cell after moving.
    PlayerMoved {
        /// Cell occupied before the move.
        from: Cell,
        /// Cell occupied after the move.
        to: Cell,
    },
    /// Confirms that a cache was created for the first time.
    CacheMaterialized {
        /// Cell hosting the new cache.
        cell: Cell,
        /// Number of coins the cache started with.
        coin_count: u32,
    },
    /// Reports that a cache left the visible window and was archived as a memento.
    CacheArchived {
        /// Cell hosting the archived cache.
        cell: Cell,
    },
    /// Reports that a cache was rebuilt from a memento.
    CacheRestored {
        /// Cell hosting the restored cache.
        cell: Cell,
    },
    /// Announces the caches that are visible after a window update.
    WindowRevealed {
        /// Cells hosting visible caches.
        cells: Vec<Cell>,
    },
    /// Confirms that a coin moved from a cache into the player's holding.
    CoinPoked {
        /// Cell hosting the cache that gave up the coin.
        cell: Cell,
        /// Coin that changed owner.
        coin: Coin,
    },
    /// Reports that a poke request could not be honoured.
    PokeRejected {
        /// Cell targeted by the poke.
        cell: Cell,
        /// Specific reason the poke failed.
        reason: LedgerError,
    },
    /// Confirms that a coin moved from the player's holding into a cache.
    CoinDeposited {
        /// Cell hosting the cache that received the coin.
        cell: Cell,
        /// Coin that changed owner.
        coin: Coin,
    },
    /// Reports that a memento could not be applied.
    RestoreRejected {
        /// Cell targeted by the restore, if the memento addressed one.
        cell: Option<Cell>,
        /// Specific reason the memento was refused.
        reason: MementoError,
    },
    /// Confirms that the player's holding was replaced from a memento.
    HoldingRestored {
        /// Number of coins held after the restore.
        coin_count: u32,
    },
}

/// Discrete grid coordinates identifying one tile of the playable world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    i: i32,
    j: i32,
}

impl Cell {
    /// Creates a new cell coordinate.
    #[must_use]
    pub const fn new(i: i32, j: i32) -> Self {
        Self { i, j }
    }

    /// Latitude-axis index of the cell.
    #[must_use]
    pub const fn i(&self) -> i32 {
        self.i
    }

    /// Longitude-axis index of the cell.
    #[must_use]
    pub const fn j(&self) -> i32 {
        self.j
    }

    /// Returns the cell displaced by the provided number of rows and columns.
    #[must_use]
    pub const fn offset(self, di: i32, dj: i32) -> Self {
        Self::new(self.i.saturating_add(di), self.j.saturating_add(dj))
    }

    /// Chebyshev distance between two cells, the metric of the square window.
    #[must_use]
    pub fn chebyshev_distance(self, other: Cell) -> u32 {
        self.i.abs_diff(other.i).max(self.j.abs_diff(other.j))
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.i, self.j)
    }
}

/// Uniquely identified token tagged with the cell it was minted in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coin {
    origin: Cell,
    serial: u32,
}

impl Coin {
    /// Creates a coin identity. Serials must be unique per origin cell.
    #[must_use]
    pub const fn new(origin: Cell, serial: u32) -> Self {
        Self { origin, serial }
    }

    /// Cell the coin was generated in.
    #[must_use]
    pub const fn origin(&self) -> Cell {
        self.origin
    }

    /// Serial number of the coin within its origin cell.
    #[must_use]
    pub const fn serial(&self) -> u32 {
        self.serial
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}#{}", self.origin.i, self.origin.j, self.serial)
    }
}

/// Continuous geographic position in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lng: f64,
}

impl GeoPoint {
    /// Creates a new geographic point.
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Returns the point displaced by the provided latitude and longitude deltas.
    #[must_use]
    pub fn translated(self, d_lat: f64, d_lng: f64) -> Self {
        Self::new(self.lat + d_lat, self.lng + d_lng)
    }
}

/// Axis-aligned geographic rectangle. The south and west edges are inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoRect {
    south_west: GeoPoint,
    north_east: GeoPoint,
}

impl GeoRect {
    /// Creates a rectangle from its south-west and north-east corners.
    #[must_use]
    pub const fn new(south_west: GeoPoint, north_east: GeoPoint) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    /// South-west corner of the rectangle.
    #[must_use]
    pub const fn south_west(&self) -> GeoPoint {
        self.south_west
    }

    /// North-east corner of the rectangle.
    #[must_use]
    pub const fn north_east(&self) -> GeoPoint {
        self.north_east
    }

    /// Reports whether the point lies inside the half-open rectangle.
    #[must_use]
    pub fn contains(&self, point: GeoPoint) -> bool {
        point.lat >= self.south_west.lat
            && point.lat < self.north_east.lat
            && point.lng >= self.south_west.lng
            && point.lng < self.north_east.lng
    }
}

/// Cardinal movement directions available to the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Movement toward increasing latitude.
    North,
    /// Movement toward increasing longitude.
    East,
    /// Movement toward decreasing latitude.
    South,
    /// Movement toward decreasing longitude.
    West,
}

impl Direction {
    /// Unit displacement expressed as (latitude tiles, longitude tiles).
    #[must_use]
    pub const fn tile_delta(self) -> (i32, i32) {
        match self {
            Self::North => (1, 0),
            Self::East => (0, 1),
            Self::South => (-1, 0),
            Self::West => (0, -1),
        }
    }
}

/// Policy deciding what happens to caches that leave the visible window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Residency {
    /// Every cache stays in the store for the whole session.
    #[default]
    Resident,
    /// Caches outside the window are archived as mementos and evicted.
    Windowed,
}

/// Tunable parameters of a world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorldConfig {
    /// Geographic point that anchors cell (0, 0) and the player's spawn.
    pub origin: GeoPoint,
    /// Edge length of a square cell in degrees.
    pub tile_degrees: f64,
    /// Half-width of the square window generated around the player.
    pub neighborhood_size: u32,
    /// Probability that a cell hosts a cache.
    pub spawn_probability: f64,
    /// Exclusive upper bound on the number of coins a new cache starts with.
    pub max_coins: u32,
    /// Number of cells covered by one directional step.
    pub move_step_tiles: u32,
    /// Residency policy for caches outside the window.
    pub residency: Residency,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            origin: GeoPoint::new(36.9995, -122.0533),
            tile_degrees: 1e-4,
            neighborhood_size: 8,
            spawn_probability: 0.1,
            max_coins: 100,
            move_step_tiles: 2,
            residency: Residency::Resident,
        }
    }
}

impl WorldConfig {
    /// Checks that the configuration describes a usable world.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tile_degrees.is_finite() && self.tile_degrees > 0.0) {
            return Err(ConfigError::InvalidTileSize(self.tile_degrees));
        }
        if !(0.0..=1.0).contains(&self.spawn_probability) {
            return Err(ConfigError::InvalidSpawnProbability(self.spawn_probability));
        }
        if !(self.origin.lat.is_finite() && self.origin.lng.is_finite()) {
            return Err(ConfigError::InvalidOrigin);
        }
        if self.move_step_tiles == 0 {
            return Err(ConfigError::ZeroMoveStep);
        }
        if self.neighborhood_size > MAX_NEIGHBORHOOD_SIZE {
            return Err(ConfigError::NeighborhoodTooLarge(self.neighborhood_size));
        }
        if self.max_coins > MAX_COINS_LIMIT {
            return Err(ConfigError::TooManyCoins(self.max_coins));
        }
        Ok(())
    }
}

/// Reasons a world configuration may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// Tile size must be a positive finite number of degrees.
    #[error("tile size {0} must be a positive finite number of degrees")]
    InvalidTileSize(f64),
    /// Spawn probability must lie in `[0, 1]`.
    #[error("spawn probability {0} must lie within [0, 1]")]
    InvalidSpawnProbability(f64),
    /// Origin coordinates must be finite.
    #[error("origin coordinates must be finite")]
    InvalidOrigin,
    /// A directional step must cover at least one cell.
    #[error("move step must cover at least one cell")]
    ZeroMoveStep,
    /// The generated window would cover too many cells.
    #[error("neighborhood size {0} exceeds the limit of {}", MAX_NEIGHBORHOOD_SIZE)]
    NeighborhoodTooLarge(u32),
    /// New caches could be minted with too many coins.
    #[error("max coins {0} exceeds the limit of {}", MAX_COINS_LIMIT)]
    TooManyCoins(u32),
}

/// Reasons a coin transfer may be rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum LedgerError {
    /// The cache holds no coins.
    #[error("nothing to take")]
    EmptyCache,
    /// The player holds no coins.
    #[error("no coins held")]
    EmptyHolding,
    /// A coin collection listed the same coin twice.
    #[error("coin {coin} appears twice")]
    DuplicateCoin {
        /// Coin that was listed more than once.
        coin: Coin,
    },
}

/// Reasons a memento may be refused. Every variant indicates corrupt data.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MementoError {
    /// The encoded payload does not follow the memento layout.
    #[error("corrupt memento: {message}")]
    Malformed {
        /// Parser diagnostic describing the failure.
        message: String,
    },
    /// The memento describes a different cell than the one being restored.
    #[error("corrupt memento: expected cell {expected}, found {found}")]
    CellMismatch {
        /// Cell the caller asked to restore.
        expected: Cell,
        /// Cell recorded inside the memento.
        found: Cell,
    },
    /// The memento lists the same coin more than once.
    #[error("corrupt memento: coin {coin} appears twice")]
    DuplicateCoin {
        /// Coin that was listed more than once.
        coin: Coin,
    },
    /// Applying the memento would drop a coin its target currently owns.
    #[error("corrupt memento: coin {coin} would be lost")]
    LostCoin {
        /// Coin missing from the memento.
        coin: Coin,
    },
}

/// Serialized snapshot of a cache, sufficient to rebuild it exactly.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheMemento(String);

impl CacheMemento {
    /// Wraps an encoded memento produced by a persistence layer.
    #[must_use]
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// Encoded representation of the memento.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Serialized snapshot of the coins carried by the player.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HoldingMemento(String);

impl HoldingMemento {
    /// Wraps an encoded memento produced by a persistence layer.
    #[must_use]
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// Encoded representation of the memento.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::{
        Cell, Coin, ConfigError, Direction, GeoPoint, GeoRect, Residency, WorldConfig,
        MAX_COINS_LIMIT, MAX_NEIGHBORHOOD_SIZE,
    };
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn coin_round_trips_through_bincode() {
        assert_round_trip(&Coin::new(Cell::new(-4, 17), 99));
    }

    #[test]
    fn coin_display_names_origin_and_serial() {
        assert_eq!(Coin::new(Cell::new(2, -3), 7).to_string(), "2:-3#7");
        assert_eq!(Cell::new(2, -3).to_string(), "(2, -3)");
    }

    #[test]
    fn chebyshev_distance_matches_expectation() {
        let origin = Cell::new(1, 1);
        assert_eq!(origin.chebyshev_distance(Cell::new(4, -2)), 3);
        assert_eq!(origin.chebyshev_distance(origin), 0);
    }

    #[test]
    fn directions_cover_both_axes() {
        assert_eq!(Direction::North.tile_delta(), (1, 0));
        assert_eq!(Direction::South.tile_delta(), (-1, 0));
        assert_eq!(Direction::East.tile_delta(), (0, 1));
        assert_eq!(Direction::West.tile_delta(), (0, -1));
    }

    #[test]
    fn rect_excludes_north_and_east_edges() {
        let rect = GeoRect::new(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 1.0));
        assert!(rect.contains(GeoPoint::new(0.0, 0.0)));
        assert!(rect.contains(GeoPoint::new(0.5, 0.999)));
        assert!(!rect.contains(GeoPoint::new(1.0, 0.5)));
        assert!(!rect.contains(GeoPoint::new(0.5, 1.0)));
    }

    #[test]
    fn default_config_is_valid() {
        assert_eq!(WorldConfig::default().validate(), Ok(()));
    }

    #[test]
    fn config_rejects_out_of_range_probability() {
        let config = WorldConfig {
            spawn_probability: 1.5,
            ..WorldConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidSpawnProbability(1.5))
        );
    }

    #[test]
    fn config_rejects_degenerate_tiles() {
        let config = WorldConfig {
            tile_degrees: 0.0,
            ..WorldConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::InvalidTileSize(0.0)));
    }

    #[test]
    fn config_bounds_window_and_coin_counts() {
        let wide = WorldConfig {
            neighborhood_size: u32::MAX,
            ..WorldConfig::default()
        };
        assert_eq!(
            wide.validate(),
            Err(ConfigError::NeighborhoodTooLarge(u32::MAX))
        );

        let rich = WorldConfig {
            max_coins: MAX_COINS_LIMIT + 1,
            ..WorldConfig::default()
        };
        assert_eq!(
            rich.validate(),
            Err(ConfigError::TooManyCoins(MAX_COINS_LIMIT + 1))
        );

        let edge = WorldConfig {
            neighborhood_size: MAX_NEIGHBORHOOD_SIZE,
            max_coins: MAX_COINS_LIMIT,
            ..WorldConfig::default()
        };
        assert_eq!(edge.validate(), Ok(()));
    }

    #[test]
    fn residency_defaults_to_resident() {
        assert_eq!(Residency::default(), Residency::Resident);
        assert_eq!(WorldConfig::default().residency, Residency::Resident);
    }
}
