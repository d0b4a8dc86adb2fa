//! Player input sources: scripted action lists and seeded random walks.

use std::str::FromStr;

use anyhow::{bail, Context, Result};
use geocoin_core::Direction;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const DIRECTIONS: [Direction; 4] = [
    Direction::North,
    Direction::East,
    Direction::South,
    Direction::West,
];

/// A single thing the player can do from the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    /// Step in a direction by the configured number of tiles.
    Move(Direction),
    /// Take the top coin from the nearest cache.
    Poke,
    /// Drop the most recently collected coin into the nearest cache.
    Deposit,
}

impl FromStr for Action {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let action = match value.trim().to_ascii_lowercase().as_str() {
            "n" | "north" => Self::Move(Direction::North),
            "e" | "east" => Self::Move(Direction::East),
            "s" | "south" => Self::Move(Direction::South),
            "w" | "west" => Self::Move(Direction::West),
            "p" | "poke" => Self::Poke,
            "d" | "deposit" => Self::Deposit,
            other => bail!("unknown action `{other}`"),
        };
        Ok(action)
    }
}

/// Parses a comma or whitespace separated list of actions.
pub(crate) fn parse_script(script: &str) -> Result<Vec<Action>> {
    script
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .enumerate()
        .map(|(index, token)| {
            token
                .parse::<Action>()
                .with_context(|| format!("invalid script entry #{}", index + 1))
        })
        .collect()
}

/// Produces `steps` actions from a ChaCha stream seeded with `seed`.
///
/// Roughly seven in ten actions are moves, the rest split between pokes and
/// deposits, so a long walk both explores and shuffles coins around.
pub(crate) fn wander(seed: u64, steps: usize) -> Vec<Action> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..steps)
        .map(|_| match rng.gen_range(0..10) {
            0..=6 => Action::Move(DIRECTIONS[rng.gen_range(0..DIRECTIONS.len())]),
            7 | 8 => Action::Poke,
            _ => Action::Deposit,
        })
        .collect()
}
