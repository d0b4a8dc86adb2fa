//! Memento codec for caches and the player's holding.
//!
//! The encoded layout is the persisted contract:
//! `{ "i": int, "j": int, "coins": [{ "cellI": int, "cellJ": int, "serial": int }, ...] }`.
//! Persistence layers may store the string anywhere as long as it round-trips
//! byte for byte.

use geocoin_core::{CacheMemento, Cell, Coin, HoldingMemento, LedgerError, MementoError};
use serde::{Deserialize, Serialize};

use crate::ledger::{Cache, PlayerHolding};

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct CacheRecord {
    i: i32,
    j: i32,
    coins: Vec<CoinRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct HoldingRecord {
    coins: Vec<CoinRecord>,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CoinRecord {
    cell_i: i32,
    cell_j: i32,
    serial: u32,
}

impl From<Coin> for CoinRecord {
    fn from(coin: Coin) -> Self {
        Self {
            cell_i: coin.origin().i(),
            cell_j: coin.origin().j(),
            serial: coin.serial(),
        }
    }
}

impl From<CoinRecord> for Coin {
    fn from(record: CoinRecord) -> Self {
        Coin::new(Cell::new(record.cell_i, record.cell_j), record.serial)
    }
}

/// Captures the state of `cache`.
#[must_use]
pub fn snapshot(cache: &Cache) -> CacheMemento {
    let record = CacheRecord {
        i: cache.cell().i(),
        j: cache.cell().j(),
        coins: cache.coins().iter().copied().map(CoinRecord::from).collect(),
    };
    let encoded = serde_json::to_string(&record).expect("cache memento serialization never fails");
    CacheMemento::from_encoded(encoded)
}

/// Rebuilds a cache from a memento.
pub fn restore(memento: &CacheMemento) -> Result<Cache, MementoError> {
    let record: CacheRecord = decode(memento.as_str())?;
    let cell = Cell::new(record.i, record.j);
    let coins = record.coins.into_iter().map(Coin::from).collect();
    Cache::new(cell, coins).map_err(duplicate_to_memento_error)
}

/// Captures the coins carried by the player.
#[must_use]
pub fn snapshot_holding(holding: &PlayerHolding) -> HoldingMemento {
    let record = HoldingRecord {
        coins: holding.coins().iter().copied().map(CoinRecord::from).collect(),
    };
    let encoded =
        serde_json::to_string(&record).expect("holding memento serialization never fails");
    HoldingMemento::from_encoded(encoded)
}

/// Rebuilds the player's holding from a memento.
pub fn restore_holding(memento: &HoldingMemento) -> Result<PlayerHolding, MementoError> {
    let record: HoldingRecord = decode(memento.as_str())?;
    let coins = record.coins.into_iter().map(Coin::from).collect();
    PlayerHolding::from_coins(coins).map_err(duplicate_to_memento_error)
}

fn decode<'a, T: Deserialize<'a>>(encoded: &'a str) -> Result<T, MementoError> {
    serde_json::from_str(encoded).map_err(|error| MementoError::Malformed {
        message: error.to_string(),
    })
}

fn duplicate_to_memento_error(error: LedgerError) -> MementoError {
    match error {
        LedgerError::DuplicateCoin { coin } => MementoError::DuplicateCoin { coin },
        other => MementoError::Malformed {
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_the_documented_layout() {
        let cell = Cell::new(2, -3);
        let cache = Cache::new(cell, vec![Coin::new(cell, 0), Coin::new(Cell::new(5, 1), 7)])
            .expect("unique coins");

        let memento = snapshot(&cache);

        assert_eq!(
            memento.as_str(),
            r#"{"i":2,"j":-3,"coins":[{"cellI":2,"cellJ":-3,"serial":0},{"cellI":5,"cellJ":1,"serial":7}]}"#
        );
    }

    #[test]
    fn restore_preserves_identity_and_order() {
        let cell = Cell::new(0, 1);
        let coins = vec![
            Coin::new(cell, 3),
            Coin::new(Cell::new(8, 8), 0),
            Coin::new(cell, 1),
        ];
        let cache = Cache::new(cell, coins).expect("unique coins");

        let restored = restore(&snapshot(&cache)).expect("valid memento");

        assert_eq!(restored, cache);
    }

    #[test]
    fn accepts_externally_written_mementos() {
        let memento = CacheMemento::from_encoded(
            r#"{ "i": 1, "j": 1, "coins": [ { "cellI": 1, "cellJ": 1, "serial": 4 } ] }"#,
        );
        let cache = restore(&memento).expect("valid memento");
        assert_eq!(cache.coins(), &[Coin::new(Cell::new(1, 1), 4)]);
    }

    #[test]
    fn rejects_truncated_payload() {
        let memento = CacheMemento::from_encoded(r#"{"i":1,"j":1,"coins":[{"cellI":1"#);
        assert!(matches!(
            restore(&memento),
            Err(MementoError::Malformed { .. })
        ));
    }

    #[test]
    fn rejects_negative_serials() {
        let memento =
            CacheMemento::from_encoded(r#"{"i":1,"j":1,"coins":[{"cellI":1,"cellJ":1,"serial":-1}]}"#);
        assert!(matches!(
            restore(&memento),
            Err(MementoError::Malformed { .. })
        ));
    }

    #[test]
    fn rejects_duplicated_coins() {
        let memento = CacheMemento::from_encoded(
            r#"{"i":1,"j":1,"coins":[{"cellI":1,"cellJ":1,"serial":0},{"cellI":1,"cellJ":1,"serial":0}]}"#,
        );
        assert_eq!(
            restore(&memento),
            Err(MementoError::DuplicateCoin {
                coin: Coin::new(Cell::new(1, 1), 0)
            })
        );
    }

    #[test]
    fn holding_round_trips() {
        let coins = vec![Coin::new(Cell::new(1, 2), 0), Coin::new(Cell::new(3, 4), 9)];
        let holding = PlayerHolding::from_coins(coins).expect("unique coins");

        let restored = restore_holding(&snapshot_holding(&holding)).expect("valid memento");

        assert_eq!(restored, holding);
    }
}
