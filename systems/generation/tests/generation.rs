use geocoin_core::{Cell, Coin, Command, Direction, Event, Residency, WorldConfig};
use geocoin_system_generation::{cell_key, initial_value_key, GenerationConfig, WorldGeneration};
use geocoin_system_luck::value_for;
use geocoin_world::{self as world, query, World};

struct Session {
    world: World,
    generation: WorldGeneration,
    log: Vec<Event>,
}

impl Session {
    fn new(config: WorldConfig) -> Self {
        let generation = WorldGeneration::with_default_luck(GenerationConfig::from(&config));
        let origin = config.origin;
        let world = World::new(config).expect("valid config");
        let mut session = Self {
            world,
            generation,
            log: Vec::new(),
        };
        session.submit(Command::RelocatePlayer { position: origin });
        session
    }

    fn submit(&mut self, command: Command) {
        let mut pending = vec![command];
        while !pending.is_empty() {
            let mut events = Vec::new();
            for command in pending.drain(..) {
                world::apply(&mut self.world, command, &mut events);
            }
            self.generation
                .handle(&events, query::cache_index(&self.world), &mut pending);
            self.log.extend(events);
        }
    }

    fn walk(&mut self, direction: Direction, steps: usize) {
        for _ in 0..steps {
            self.submit(Command::MovePlayer { direction });
        }
    }

    fn caches(&self) -> Vec<(Cell, Vec<Coin>)> {
        query::resident_caches(&self.world)
            .into_iter()
            .map(|view| (view.cell, view.coins.to_vec()))
            .collect()
    }

    fn visible(&self) -> Vec<(Cell, Vec<Coin>)> {
        query::visible_caches(&self.world)
            .into_iter()
            .map(|view| (view.cell, view.coins.to_vec()))
            .collect()
    }
}

#[test]
fn startup_window_matches_luck() {
    let session = Session::new(WorldConfig::default());

    let visible = session.visible();
    assert_eq!(visible.len(), 27);
    let total: usize = visible.iter().map(|(_, coins)| coins.len()).sum();
    assert_eq!(total, 1542);

    for (cell, coins) in &visible {
        assert!(value_for(&cell_key(*cell)) < 0.1);
        let expected = (value_for(&initial_value_key(*cell)) * 100.0).floor() as usize;
        assert_eq!(coins.len(), expected, "coin count drifted for {cell}");
        assert!(cell.chebyshev_distance(Cell::new(0, 0)) <= 8);
    }
}

#[test]
fn fresh_worlds_generate_identical_caches() {
    let mut first = Session::new(WorldConfig::default());
    let mut second = Session::new(WorldConfig::default());

    for session in [&mut first, &mut second] {
        session.walk(Direction::North, 5);
        session.walk(Direction::East, 3);
        session.walk(Direction::South, 9);
    }

    assert_eq!(first.caches(), second.caches());
    assert_eq!(first.log, second.log, "replay diverged between runs");
}

#[test]
fn revisited_caches_keep_their_state() {
    let mut session = Session::new(WorldConfig::default());
    let cell = Cell::new(1, 1);
    for _ in 0..5 {
        session.submit(Command::Poke { cell });
    }
    let before = query::cache(&session.world, cell)
        .expect("cache at (1, 1)")
        .coins
        .to_vec();
    assert_eq!(before.len(), 41);

    session.walk(Direction::East, 20);
    assert!(
        query::visible_caches(&session.world)
            .iter()
            .all(|view| view.cell != cell),
        "cache should be out of view"
    );
    session.walk(Direction::West, 20);

    let after = query::cache(&session.world, cell)
        .expect("cache at (1, 1)")
        .coins
        .to_vec();
    assert_eq!(before, after);
    assert_eq!(query::player_points(&session.world), 5);
    let materialized = session
        .log
        .iter()
        .filter(|event| matches!(event, Event::CacheMaterialized { cell: c, .. } if *c == cell))
        .count();
    assert_eq!(materialized, 1, "cache was regenerated on revisit");
}

#[test]
fn windowed_residency_matches_resident_play() {
    let script = |session: &mut Session| {
        session.submit(Command::Poke {
            cell: Cell::new(1, 1),
        });
        session.submit(Command::Poke {
            cell: Cell::new(1, 1),
        });
        session.walk(Direction::North, 12);
        session.submit(Command::Deposit {
            cell: Cell::new(1, 1),
        });
        session.walk(Direction::South, 12);
    };

    let mut resident = Session::new(WorldConfig::default());
    let mut windowed = Session::new(WorldConfig {
        residency: Residency::Windowed,
        ..WorldConfig::default()
    });
    script(&mut resident);
    script(&mut windowed);

    assert_eq!(resident.visible(), windowed.visible());
    assert_eq!(
        query::coin_census(&resident.world).total(),
        query::coin_census(&windowed.world).total()
    );
    assert!(query::coin_census(&windowed.world).archived > 0);
    assert!(windowed
        .log
        .iter()
        .any(|event| matches!(event, Event::CacheArchived { .. })));
}

#[test]
fn existence_and_quantity_draws_are_independent() {
    let mut spawn = Vec::new();
    let mut quantity = Vec::new();
    for i in -100..100 {
        for j in -100..100 {
            let cell = Cell::new(i, j);
            spawn.push(value_for(&cell_key(cell)));
            quantity.push(value_for(&initial_value_key(cell)));
        }
    }

    let correlation = pearson(&spawn, &quantity);
    assert!(
        correlation.abs() < 0.02,
        "existence correlates with quantity: {correlation}"
    );
}

#[test]
fn coins_survive_a_full_session_mementos_round_trip() {
    let mut session = Session::new(WorldConfig::default());
    session.submit(Command::Poke {
        cell: Cell::new(1, 1),
    });
    session.walk(Direction::West, 3);
    let mementos = query::cache_mementos(&session.world);
    let holding = query::holding_memento(&session.world);

    let mut restored = World::new(WorldConfig::default()).expect("valid config");
    let mut events = Vec::new();
    for (cell, memento) in mementos {
        world::apply(
            &mut restored,
            Command::RestoreCache { cell, memento },
            &mut events,
        );
    }
    world::apply(
        &mut restored,
        Command::RestoreHolding { memento: holding },
        &mut events,
    );

    assert!(events
        .iter()
        .all(|event| !matches!(event, Event::RestoreRejected { .. })));
    assert_eq!(
        query::coin_census(&restored).total(),
        query::coin_census(&session.world).total()
    );
    assert_eq!(query::holding(&restored), query::holding(&session.world));
}

fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;
    let mut covariance = 0.0;
    let mut variance_x = 0.0;
    let mut variance_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        covariance += (x - mean_x) * (y - mean_y);
        variance_x += (x - mean_x) * (x - mean_x);
        variance_y += (y - mean_y) * (y - mean_y);
    }
    covariance / (variance_x.sqrt() * variance_y.sqrt())
}
