//! Pumps commands through the world and the generation system.

use anyhow::{Context, Result};
use geocoin_core::{Cell, Command, Event, WorldConfig};
use geocoin_system_generation::{GenerationConfig, WorldGeneration};
use geocoin_world::{self as world, query, World};

/// Headless game loop owning the world and every system that reacts to it.
#[derive(Debug)]
pub(crate) struct Simulation {
    world: World,
    generation: WorldGeneration,
}

impl Simulation {
    /// Builds a world from `config` without placing the player's window yet.
    pub(crate) fn new(config: WorldConfig) -> Result<Self> {
        let generation = WorldGeneration::with_default_luck(GenerationConfig::from(&config));
        let world = World::new(config).context("invalid world configuration")?;
        Ok(Self { world, generation })
    }

    /// Reports the player at the configured origin so the first window is generated.
    pub(crate) fn start(&mut self) -> Vec<Event> {
        let position = query::config(&self.world).origin;
        self.submit(Command::RelocatePlayer { position })
    }

    /// Applies `command` and every follow-up command the systems produce.
    ///
    /// Returns the full event log of the exchange in emission order.
    pub(crate) fn submit(&mut self, command: Command) -> Vec<Event> {
        let mut log = Vec::new();
        let mut pending = vec![command];
        while !pending.is_empty() {
            let mut events = Vec::new();
            for command in pending.drain(..) {
                world::apply(&mut self.world, command, &mut events);
            }
            self.generation
                .handle(&events, query::cache_index(&self.world), &mut pending);
            log.extend(events);
        }
        log
    }

    /// Submits each command in order, concatenating their event logs.
    pub(crate) fn submit_all(&mut self, commands: impl IntoIterator<Item = Command>) -> Vec<Event> {
        commands
            .into_iter()
            .flat_map(|command| self.submit(command))
            .collect()
    }

    /// Read-only access to the world for projections.
    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    /// Cell a poke or deposit from the player's position applies to.
    ///
    /// The nearest visible cache wins; ties resolve in cell order. Without any
    /// visible cache the player's own cell is used.
    pub(crate) fn interaction_target(&self) -> Cell {
        let here = query::player_cell(&self.world);
        query::visible_caches(&self.world)
            .into_iter()
            .map(|view| view.cell)
            .min_by_key(|cell| (cell.chebyshev_distance(here), *cell))
            .unwrap_or(here)
    }
}
