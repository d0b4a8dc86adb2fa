//! Coin ownership: caches, the player's holding, and transfers between them.

use std::collections::HashSet;

use geocoin_core::{Cell, Coin, LedgerError};

/// Mutable contents of one pit.
///
/// Coins form a stack: the most recently deposited coin is the next one poked.
#[derive(Debug, PartialEq, Eq)]
pub struct Cache {
    cell: Cell,
    coins: Vec<Coin>,
}

impl Cache {
    /// Creates a cache, rejecting coin lists that name the same coin twice.
    pub fn new(cell: Cell, coins: Vec<Coin>) -> Result<Self, LedgerError> {
        if let Some(coin) = first_duplicate(&coins) {
            return Err(LedgerError::DuplicateCoin { coin });
        }
        Ok(Self { cell, coins })
    }

    /// Creates a cache without coins.
    #[must_use]
    pub fn empty(cell: Cell) -> Self {
        Self {
            cell,
            coins: Vec::new(),
        }
    }

    /// Cell hosting the cache.
    #[must_use]
    pub const fn cell(&self) -> Cell {
        self.cell
    }

    /// Coins in stack order, bottom first.
    #[must_use]
    pub fn coins(&self) -> &[Coin] {
        &self.coins
    }

    /// Number of coins currently stored.
    #[must_use]
    pub fn coin_count(&self) -> usize {
        self.coins.len()
    }

    /// Reports whether the cache holds no coins.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }
}

/// Coins carried by the player, most recently poked last.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PlayerHolding {
    coins: Vec<Coin>,
}

impl PlayerHolding {
    /// Creates an empty holding.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a holding from coins, rejecting duplicates.
    pub fn from_coins(coins: Vec<Coin>) -> Result<Self, LedgerError> {
        if let Some(coin) = first_duplicate(&coins) {
            return Err(LedgerError::DuplicateCoin { coin });
        }
        Ok(Self { coins })
    }

    /// Coins in the order they were collected.
    #[must_use]
    pub fn coins(&self) -> &[Coin] {
        &self.coins
    }

    /// Number of coins carried.
    #[must_use]
    pub fn len(&self) -> usize {
        self.coins.len()
    }

    /// Reports whether the player carries nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.coins.is_empty()
    }
}

/// Moves the top coin of `cache` onto the player's holding.
pub fn poke(cache: &mut Cache, holding: &mut PlayerHolding) -> Result<Coin, LedgerError> {
    let coin = cache.coins.pop().ok_or(LedgerError::EmptyCache)?;
    holding.coins.push(coin);
    tracing::trace!(cell = %cache.cell, %coin, "coin poked");
    Ok(coin)
}

/// Moves the most recently collected coin from the player into `cache`.
pub fn deposit(holding: &mut PlayerHolding, cache: &mut Cache) -> Result<Coin, LedgerError> {
    let coin = holding.coins.pop().ok_or(LedgerError::EmptyHolding)?;
    cache.coins.push(coin);
    tracing::trace!(cell = %cache.cell, %coin, "coin deposited");
    Ok(coin)
}

fn first_duplicate(coins: &[Coin]) -> Option<Coin> {
    let mut seen = HashSet::with_capacity(coins.len());
    coins.iter().copied().find(|coin| !seen.insert(*coin))
}
