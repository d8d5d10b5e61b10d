//! Piece lifecycle
//!
//! A pending piece starts out static at the spawn line where the player can
//! steer it, turns dynamic when dropped, and after a settle delay is handed
//! over to the world as an ordinary piece while a new pending piece spawns.

use glam::Vec2;
use rand::Rng;

use super::body::{BodyDesc, BodyId, BodyKind, Material, Shape, ShapeTag};
use super::ladder::SizeLadder;
use super::state::{Container, GameEvent};
use super::tick::TickInput;
use super::world::World;
use crate::error::SimError;
use crate::settings::Settings;

/// Shared material and density for every piece
#[derive(Debug, Clone, Copy)]
pub struct PieceTemplate {
    pub material: Material,
    pub density: f32,
}

impl PieceTemplate {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            material: settings.piece_material.into(),
            density: settings.piece_density,
        }
    }

    /// Describe a piece of the given size, rejecting sizes off the ladder
    pub fn desc(
        &self,
        ladder: &SizeLadder,
        size: usize,
        position: Vec2,
        kind: BodyKind,
    ) -> Result<BodyDesc, SimError> {
        let radius = ladder.radius_of(size)?;
        Ok(BodyDesc {
            kind,
            position,
            shape: Shape::Circle { radius },
            tag: ShapeTag::Piece { size },
            material: self.material,
            density: self.density,
        })
    }

    /// Add a piece to the world. The world is untouched on error.
    pub fn spawn(
        &self,
        world: &mut World,
        ladder: &SizeLadder,
        size: usize,
        position: Vec2,
        kind: BodyKind,
    ) -> Result<BodyId, SimError> {
        let desc = self.desc(ladder, size, position, kind)?;
        Ok(world.add_body(desc))
    }
}

/// Where the pending piece is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PiecePhase {
    /// Static at the spawn line, follows steering
    Spawned,
    /// Dropped and falling; counts ticks until the next piece
    Released { ticks: u32 },
}

/// The player-controlled piece
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingPiece {
    pub body: BodyId,
    pub size: usize,
    pub phase: PiecePhase,
}

impl PendingPiece {
    pub fn released(&self) -> bool {
        matches!(self.phase, PiecePhase::Released { .. })
    }
}

/// Spawns, steers and releases pending pieces
#[derive(Debug, Clone)]
pub struct PieceController {
    pending: Option<PendingPiece>,
    /// Horizontal aim; persists across pieces
    aim_x: f32,
    spawn_y: f32,
    steer_speed: f32,
    settle_ticks: u32,
    spawn_pool: usize,
    left: f32,
    right: f32,
}

impl PieceController {
    pub fn new(settings: &Settings, container: &Container) -> Self {
        Self {
            pending: None,
            aim_x: settings.scene_width / 2.0,
            spawn_y: settings.spawn_line_y,
            steer_speed: settings.steer_speed,
            settle_ticks: settings.settle_ticks(),
            spawn_pool: settings.spawn_pool,
            left: container.left,
            right: container.right,
        }
    }

    pub fn pending(&self) -> Option<&PendingPiece> {
        self.pending.as_ref()
    }

    pub fn aim_x(&self) -> f32 {
        self.aim_x
    }

    /// Keep a piece of `radius` between the container walls
    pub fn clamp_x(&self, x: f32, radius: f32) -> f32 {
        x.max(self.left + radius).min(self.right - radius)
    }

    /// Spawn a specific size as the new pending piece
    pub fn spawn_pending(
        &mut self,
        world: &mut World,
        ladder: &SizeLadder,
        template: &PieceTemplate,
        size: usize,
    ) -> Result<PendingPiece, SimError> {
        let radius = ladder.radius_of(size)?;
        self.aim_x = self.clamp_x(self.aim_x, radius);
        let position = Vec2::new(self.aim_x, self.spawn_y);
        let body = template.spawn(world, ladder, size, position, BodyKind::Static)?;

        let piece = PendingPiece {
            body,
            size,
            phase: PiecePhase::Spawned,
        };
        self.pending = Some(piece);
        log::debug!("Spawned pending piece {:?} (size {}) at x={:.1}", body, size, self.aim_x);
        Ok(piece)
    }

    /// Spawn a random size from the spawn pool
    pub fn spawn_random<R: Rng>(
        &mut self,
        world: &mut World,
        ladder: &SizeLadder,
        template: &PieceTemplate,
        rng: &mut R,
    ) -> Result<PendingPiece, SimError> {
        let size = rng.random_range(0..ladder.spawn_pool(self.spawn_pool));
        self.spawn_pending(world, ladder, template, size)
    }

    /// Advance the pending piece by one tick
    pub fn update<R: Rng>(
        &mut self,
        input: &TickInput,
        world: &mut World,
        ladder: &SizeLadder,
        template: &PieceTemplate,
        rng: &mut R,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), SimError> {
        // A steerable piece that left the world can't be dropped; replace it
        if let Some(piece) = self.pending {
            if !piece.released() && !world.contains(piece.body) {
                log::warn!("Pending piece {:?} vanished, respawning", piece.body);
                self.pending = None;
            }
        }

        if self.pending.is_none() {
            let piece = self.spawn_random(world, ladder, template, rng)?;
            events.push(GameEvent::PieceSpawned {
                body: piece.body,
                size: piece.size,
            });
        }
        let Some(mut piece) = self.pending else {
            return Ok(());
        };

        let radius = ladder.radius_of(piece.size)?;
        if input.steer_left {
            self.aim_x -= self.steer_speed;
        }
        if input.steer_right {
            self.aim_x += self.steer_speed;
        }
        self.aim_x = self.clamp_x(self.aim_x, radius);

        match piece.phase {
            PiecePhase::Spawned => {
                world.set_position(piece.body, Vec2::new(self.aim_x, self.spawn_y));
                if input.drop {
                    world.convert_to_dynamic(piece.body);
                    piece.phase = PiecePhase::Released { ticks: 0 };
                    events.push(GameEvent::PieceDropped {
                        body: piece.body,
                        size: piece.size,
                    });
                    log::debug!("Dropped piece {:?} at x={:.1}", piece.body, self.aim_x);
                }
            }
            PiecePhase::Released { .. } => {
                if input.drop {
                    log::debug!("Ignoring drop: piece {:?} already released", piece.body);
                }
            }
        }

        if let PiecePhase::Released { ticks } = piece.phase {
            let ticks = ticks + 1;
            if ticks > self.settle_ticks {
                // Piece stays in the world as an ordinary body
                log::debug!("Piece {:?} settled, spawning next", piece.body);
                self.pending = None;
                let next = self.spawn_random(world, ladder, template, rng)?;
                events.push(GameEvent::PieceSpawned {
                    body: next.body,
                    size: next.size,
                });
                return Ok(());
            }
            piece.phase = PiecePhase::Released { ticks };
        }

        self.pending = Some(piece);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    struct Fixture {
        world: World,
        ladder: SizeLadder,
        template: PieceTemplate,
        controller: PieceController,
        rng: Pcg32,
        events: Vec<GameEvent>,
    }

    impl Fixture {
        fn new() -> Self {
            let settings = Settings::default();
            let container = Container::from_settings(&settings);
            Self {
                world: World::new(settings.gravity, settings.substeps, settings.solver_iterations),
                ladder: SizeLadder::classic(),
                template: PieceTemplate::from_settings(&settings),
                controller: PieceController::new(&settings, &container),
                rng: Pcg32::seed_from_u64(7),
                events: Vec::new(),
            }
        }

        fn update(&mut self, input: TickInput) {
            self.controller
                .update(
                    &input,
                    &mut self.world,
                    &self.ladder,
                    &self.template,
                    &mut self.rng,
                    &mut self.events,
                )
                .unwrap();
        }
    }

    fn drop_input() -> TickInput {
        TickInput {
            drop: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_spawns_when_missing() {
        let mut fx = Fixture::new();
        assert!(fx.controller.pending().is_none());

        fx.update(TickInput::default());

        let piece = *fx.controller.pending().unwrap();
        assert_eq!(piece.phase, PiecePhase::Spawned);
        assert!(piece.size < 6);
        let body = fx.world.body(piece.body).unwrap();
        assert_eq!(body.kind, BodyKind::Static);
        assert_eq!(body.position, Vec2::new(640.0, 50.0));
        assert!(matches!(fx.events[0], GameEvent::PieceSpawned { .. }));
    }

    #[test]
    fn test_rejects_size_off_ladder() {
        let mut fx = Fixture::new();
        let result = fx
            .controller
            .spawn_pending(&mut fx.world, &fx.ladder, &fx.template, 10);
        assert!(matches!(result, Err(SimError::InvalidSizeIndex { .. })));
        assert!(fx.world.is_empty());
        assert!(fx.controller.pending().is_none());
    }

    #[test]
    fn test_drop_makes_piece_dynamic() {
        let mut fx = Fixture::new();
        fx.update(TickInput::default());
        fx.update(drop_input());

        let piece = *fx.controller.pending().unwrap();
        assert_eq!(piece.phase, PiecePhase::Released { ticks: 1 });
        let body = fx.world.body(piece.body).unwrap();
        assert_eq!(body.kind, BodyKind::Dynamic);
        assert!(body.mass > 0.0);
    }

    #[test]
    fn test_double_release_is_noop() {
        let mut fx = Fixture::new();
        fx.update(TickInput::default());
        fx.update(drop_input());
        let count = fx.world.len();
        let piece = *fx.controller.pending().unwrap();

        fx.update(drop_input());

        assert_eq!(fx.world.len(), count);
        let again = *fx.controller.pending().unwrap();
        assert_eq!(again.body, piece.body);
        assert_eq!(fx.world.body(piece.body).unwrap().kind, BodyKind::Dynamic);
        let drops = fx
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::PieceDropped { .. }))
            .count();
        assert_eq!(drops, 1);
    }

    #[test]
    fn test_next_piece_after_settle_delay() {
        let mut fx = Fixture::new();
        fx.update(TickInput::default());
        let first = fx.controller.pending().unwrap().body;
        fx.update(drop_input());

        // Drop tick counted as tick 1; the handoff happens past 50
        for _ in 0..49 {
            fx.update(TickInput::default());
        }
        assert_eq!(fx.controller.pending().unwrap().body, first);

        fx.update(TickInput::default());
        let next = *fx.controller.pending().unwrap();
        assert_ne!(next.body, first);
        assert_eq!(next.phase, PiecePhase::Spawned);
        // Old piece is still a live body
        assert!(fx.world.contains(first));
    }

    #[test]
    fn test_vanished_pending_piece_respawns() {
        let mut fx = Fixture::new();
        fx.update(TickInput::default());
        let first = fx.controller.pending().unwrap().body;
        fx.world.remove_body(first);

        fx.update(TickInput::default());

        let next = fx.controller.pending().unwrap();
        assert_ne!(next.body, first);
        assert!(fx.world.contains(next.body));
    }

    proptest! {
        #[test]
        fn prop_pending_piece_stays_inside_walls(
            size in 0usize..10,
            moves in proptest::collection::vec((any::<bool>(), any::<bool>()), 1..300),
        ) {
            let mut fx = Fixture::new();
            let piece = fx
                .controller
                .spawn_pending(&mut fx.world, &fx.ladder, &fx.template, size)
                .unwrap();
            let radius = fx.ladder.radius_of(size).unwrap();

            for (steer_left, steer_right) in moves {
                fx.update(TickInput { steer_left, steer_right, drop: false });
                let x = fx.world.body(piece.body).unwrap().position.x;
                prop_assert!(x >= 340.0 + radius - 1e-3);
                prop_assert!(x <= 940.0 - radius + 1e-3);
            }
        }
    }
}
