//! Session state
//!
//! A [`Session`] owns everything one game needs: the world, the ladder, the
//! piece controller, the merge queue and the RNG. Nothing is global, so any
//! number of sessions can run side by side.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::body::{BodyDesc, BodyId, BodyKind, Material, Shape, ShapeTag};
use super::ladder::SizeLadder;
use super::merge::MergeResolver;
use super::piece::{PieceController, PieceTemplate};
use super::world::World;
use crate::error::SimError;
use crate::settings::Settings;

/// Current phase of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// A piece fell out of the scene; the session no longer advances
    GameOver,
    /// The physics step failed; every further tick errors
    Faulted,
}

/// Things that happened during a tick, for sound and effects hooks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    PieceSpawned {
        body: BodyId,
        size: usize,
    },
    PieceDropped {
        body: BodyId,
        size: usize,
    },
    /// Two pieces became one of the next size
    Merged {
        consumed: [BodyId; 2],
        created: BodyId,
        size: usize,
        position: Vec2,
    },
    /// Two terminal-size pieces disappeared
    PairVanished {
        consumed: [BodyId; 2],
        size: usize,
        position: Vec2,
    },
    GameOver {
        body: BodyId,
    },
}

/// Open-topped box centered in the scene
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Container {
    pub left: f32,
    pub right: f32,
    pub top: f32,
    pub bottom: f32,
}

impl Container {
    pub fn from_settings(settings: &Settings) -> Self {
        let left = (settings.scene_width - settings.container_width) / 2.0;
        let top = (settings.scene_height - settings.container_height) / 2.0;
        Self {
            left,
            right: left + settings.container_width,
            top,
            bottom: top + settings.container_height,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    /// Floor, left wall and right wall
    pub fn walls(&self, radius: f32, material: Material) -> [BodyDesc; 3] {
        let segment = |a: Vec2, b: Vec2| BodyDesc {
            kind: BodyKind::Static,
            position: Vec2::ZERO,
            shape: Shape::Segment { a, b, radius },
            tag: ShapeTag::Wall,
            material,
            density: 0.0,
        };
        let top_left = Vec2::new(self.left, self.top);
        let top_right = Vec2::new(self.right, self.top);
        let bottom_left = Vec2::new(self.left, self.bottom);
        let bottom_right = Vec2::new(self.right, self.bottom);
        [
            segment(bottom_left, bottom_right),
            segment(top_left, bottom_left),
            segment(top_right, bottom_right),
        ]
    }
}

/// Complete state of one game
#[derive(Debug, Clone)]
pub struct Session {
    pub(crate) settings: Settings,
    pub(crate) ladder: SizeLadder,
    pub(crate) world: World,
    pub(crate) container: Container,
    pub(crate) template: PieceTemplate,
    pub(crate) controller: PieceController,
    pub(crate) resolver: MergeResolver,
    pub(crate) rng: Pcg32,
    pub(crate) phase: GamePhase,
    /// Simulation tick counter
    pub(crate) time_ticks: u64,
    /// Events raised outside a tick, flushed with the next tick result
    pub(crate) events: Vec<GameEvent>,
}

impl Session {
    /// Create a session with the container built and a first piece waiting
    pub fn new(settings: Settings) -> Result<Self, SimError> {
        let ladder = settings.size_ladder()?;
        Self::with_ladder(settings, ladder)
    }

    /// Create a session with an explicit size ladder
    pub fn with_ladder(settings: Settings, ladder: SizeLadder) -> Result<Self, SimError> {
        settings.validate_params()?;
        settings.validate_ladder(&ladder)?;

        let container = Container::from_settings(&settings);
        let mut world = World::new(settings.gravity, settings.substeps, settings.solver_iterations);
        for wall in container.walls(settings.wall_radius, settings.wall_material.into()) {
            world.add_body(wall);
        }

        let template = PieceTemplate::from_settings(&settings);
        let mut controller = PieceController::new(&settings, &container);
        let mut rng = Pcg32::seed_from_u64(settings.seed);
        let first = controller.spawn_random(&mut world, &ladder, &template, &mut rng)?;

        log::info!(
            "Session started: scene {}x{}, container {}x{}, {} sizes, seed {}",
            settings.scene_width,
            settings.scene_height,
            settings.container_width,
            settings.container_height,
            ladder.count(),
            settings.seed
        );

        Ok(Self {
            settings,
            ladder,
            world,
            container,
            template,
            controller,
            resolver: MergeResolver::new(),
            rng,
            phase: GamePhase::Playing,
            time_ticks: 0,
            events: vec![GameEvent::PieceSpawned {
                body: first.body,
                size: first.size,
            }],
        })
    }

    /// Start a session from the core parameters, everything else default
    pub fn initialize(
        container_width: f32,
        container_height: f32,
        gravity: Vec2,
        tick_rate: u32,
    ) -> Result<Self, SimError> {
        Self::new(Settings {
            container_width,
            container_height,
            gravity,
            tick_rate,
            ..Default::default()
        })
    }

    /// Drop a free dynamic piece into the world
    pub fn spawn_piece(&mut self, size: usize, position: Vec2) -> Result<BodyId, SimError> {
        self.template
            .spawn(&mut self.world, &self.ladder, size, position, BodyKind::Dynamic)
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn ladder(&self) -> &SizeLadder {
        &self.ladder
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn controller(&self) -> &PieceController {
        &self.controller
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn is_game_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    pub fn time_ticks(&self) -> u64 {
        self.time_ticks
    }

    /// Body currently held by the player, if any
    pub fn pending_body(&self) -> Option<BodyId> {
        self.controller.pending().map(|p| p.body)
    }
}
