//! Suika Merge headless runner
//!
//! Plays a session with a simple autopilot until game over or the tick cap,
//! logging what happens. Pass a settings JSON path as the first argument to
//! override the defaults; set `RUST_LOG=debug` to follow every merge.

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use rand::{Rng, SeedableRng};
    use rand_pcg::Pcg32;

    use suika_merge::sim::{GameEvent, Session, TickInput};
    use suika_merge::{Settings, SimError};

    /// Ten minutes of play at the default rate
    const MAX_TICKS: u64 = 50 * 60 * 10;

    /// Picks a column, steers to it, drops, repeats
    struct Autopilot {
        rng: Pcg32,
        target_x: Option<f32>,
    }

    impl Autopilot {
        fn new(seed: u64) -> Self {
            Self {
                rng: Pcg32::seed_from_u64(seed ^ 0x5eed),
                target_x: None,
            }
        }

        fn input(&mut self, session: &Session) -> TickInput {
            let Some(piece) = session.controller().pending().filter(|p| !p.released()) else {
                return TickInput::default();
            };
            let container = *session.container();
            let radius = session.ladder().radius_of(piece.size).unwrap_or(0.0);
            let target = *self.target_x.get_or_insert_with(|| {
                self.rng
                    .random_range(container.left + radius..=container.right - radius)
            });

            let x = session.controller().aim_x();
            let step = session.settings().steer_speed;
            if (target - x).abs() <= step {
                self.target_x = None;
                TickInput {
                    drop: true,
                    ..Default::default()
                }
            } else {
                TickInput {
                    steer_left: target < x,
                    steer_right: target > x,
                    drop: false,
                }
            }
        }
    }

    fn load_settings() -> Result<Settings, Box<dyn std::error::Error>> {
        match std::env::args().nth(1) {
            Some(path) => {
                let json = std::fs::read_to_string(&path)?;
                let settings = Settings::from_json(&json)?;
                log::info!("Loaded settings from {}", path);
                Ok(settings)
            }
            None => {
                log::info!("Using default settings");
                Ok(Settings::default())
            }
        }
    }

    pub fn run() -> Result<(), Box<dyn std::error::Error>> {
        let settings = load_settings()?;
        let mut autopilot = Autopilot::new(settings.seed);
        let mut session = Session::new(settings)?;

        let mut merges = 0u32;
        let mut largest = 0usize;
        loop {
            let input = autopilot.input(&session);
            let result = session.tick(&input)?;

            for event in &result.events {
                match *event {
                    GameEvent::Merged { size, .. } => {
                        merges += 1;
                        largest = largest.max(size);
                    }
                    GameEvent::PairVanished { size, .. } => {
                        log::info!("Two size-{} pieces vanished", size);
                    }
                    _ => {}
                }
            }

            if result.game_over {
                log::info!(
                    "Game over after {} ticks: {} merges, largest size {}",
                    result.tick,
                    merges,
                    largest
                );
                return Ok(());
            }
            if result.tick >= MAX_TICKS {
                log::info!(
                    "Stopped after {} ticks: {} merges, largest size {}, {} pieces in play",
                    result.tick,
                    merges,
                    largest,
                    result.live_shapes.len()
                );
                return Ok(());
            }
        }
    }

    pub fn report(err: &(dyn std::error::Error + 'static)) {
        match err.downcast_ref::<SimError>() {
            Some(SimError::EngineStepFailure(msg)) => log::error!("Simulation diverged: {}", msg),
            _ => log::error!("{}", err),
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Suika Merge (headless) starting...");

    if let Err(err) = native::run() {
        native::report(err.as_ref());
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The presentation layer drives `Session::tick` directly on the web
}
