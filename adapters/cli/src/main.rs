#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that drives a headless Geocoin session.

mod driver;
mod input;
mod session_transfer;

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::Parser;
use geocoin_core::{Command, Event, WorldConfig};
use geocoin_world::{query, World};
use tracing_subscriber::EnvFilter;

use driver::Simulation;
use input::Action;
use session_transfer::SessionSnapshot;

/// Walk the coin grid from the terminal.
#[derive(Debug, Parser)]
#[command(name = "geocoin", version)]
struct Cli {
    /// TOML file overriding the default world configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Comma separated actions: n, e, s, w, poke, deposit.
    #[arg(long, conflicts_with = "wander")]
    script: Option<String>,
    /// Number of random actions to take instead of a script.
    #[arg(long)]
    wander: Option<usize>,
    /// Seed for the random walk.
    #[arg(long, default_value_t = 0)]
    seed: u64,
    /// Session file to restore before playing.
    #[arg(long)]
    load: Option<PathBuf>,
    /// Session file to write after playing.
    #[arg(long)]
    save: Option<PathBuf>,
    /// Print every visible cache after the session.
    #[arg(long)]
    verbose: bool,
}

/// Entry point for the Geocoin command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    let mut simulation = Simulation::new(config)?;
    if let Some(path) = &cli.load {
        load_session(&mut simulation, path)?;
    }

    let _ = simulation.start();
    println!("{}", query::welcome_banner(simulation.world()));

    let actions = match (&cli.script, cli.wander) {
        (Some(script), _) => input::parse_script(script)?,
        (None, Some(steps)) => input::wander(cli.seed, steps),
        (None, None) => Vec::new(),
    };
    for action in actions {
        let events = perform(&mut simulation, action);
        for line in events.iter().filter_map(describe) {
            println!("{line}");
        }
    }

    println!("{}", status_line(query::player_points(simulation.world())));
    if cli.verbose {
        println!("{}", location_line(simulation.world()));
        for line in cache_report(simulation.world()) {
            println!("{line}");
        }
    }

    if let Some(path) = &cli.save {
        save_session(simulation.world(), path)?;
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<WorldConfig> {
    let Some(path) = path else {
        return Ok(WorldConfig::default());
    };
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read world config at {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("invalid world config at {}", path.display()))
}

fn parse_config(contents: &str) -> Result<WorldConfig> {
    let config: WorldConfig =
        toml::from_str(contents).context("failed to parse world config toml contents")?;
    if let Err(error) = config.validate() {
        bail!("world config rejected: {error}");
    }
    Ok(config)
}

fn load_session(simulation: &mut Simulation, path: &Path) -> Result<()> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read session file at {}", path.display()))?;
    let commands = SessionSnapshot::decode(&contents)
        .and_then(SessionSnapshot::into_commands)
        .with_context(|| format!("failed to decode session file at {}", path.display()))?;

    let events = simulation.submit_all(commands);
    let rejected: Vec<String> = events
        .iter()
        .filter_map(|event| match event {
            Event::RestoreRejected { reason, .. } => Some(reason.to_string()),
            _ => None,
        })
        .collect();
    if !rejected.is_empty() {
        bail!(
            "session file at {} was refused: {}",
            path.display(),
            rejected.join("; ")
        );
    }

    tracing::info!(
        path = %path.display(),
        caches = query::cache_mementos(simulation.world()).len(),
        held = query::player_points(simulation.world()),
        "session restored"
    );
    Ok(())
}

fn save_session(world: &World, path: &Path) -> Result<()> {
    let encoded = SessionSnapshot::capture(world).encode();
    fs::write(path, encoded + "\n")
        .with_context(|| format!("failed to write session file at {}", path.display()))?;
    tracing::info!(path = %path.display(), "session saved");
    Ok(())
}

fn perform(simulation: &mut Simulation, action: Action) -> Vec<Event> {
    let command = match action {
        Action::Move(direction) => Command::MovePlayer { direction },
        Action::Poke => Command::Poke {
            cell: simulation.interaction_target(),
        },
        Action::Deposit => Command::Deposit {
            cell: simulation.interaction_target(),
        },
    };
    simulation.submit(command)
}

fn describe(event: &Event) -> Option<String> {
    match event {
        Event::PlayerMoved { to, .. } => Some(format!("moved to {to}")),
        Event::WindowRevealed { cells } => Some(format!("{} pits in view", cells.len())),
        Event::CoinPoked { cell, coin } => Some(format!("poked {coin} from {cell}")),
        Event::PokeRejected { cell, reason } => Some(format!("{reason} at {cell}")),
        Event::CoinDeposited { cell, coin } => Some(format!("deposited {coin} into {cell}")),
        _ => None,
    }
}

fn status_line(points: usize) -> String {
    if points == 0 {
        "No points yet...".to_owned()
    } else {
        format!("{points} points accumulated")
    }
}

fn location_line(world: &World) -> String {
    let cell = query::player_cell(world);
    let center = query::center_of(world, cell);
    format!(
        "standing in {cell}, centred on {:.6}, {:.6}",
        center.lat, center.lng
    )
}

fn cache_report(world: &World) -> Vec<String> {
    query::visible_caches(world)
        .into_iter()
        .map(|view| {
            let coins: Vec<String> = view.coins.iter().map(ToString::to_string).collect();
            format!(
                "There is a pit here at \"{},{}\". It has value {}. [{}]",
                view.cell.i(),
                view.cell.j(),
                view.coin_count,
                coins.join(" ")
            )
        })
        .collect()
}
