//! Session settings
//!
//! Everything a session needs to know up front: scene and container geometry,
//! physics rates, spawn rules and materials. Loaded from JSON by the native
//! runner; every field has a default so partial files are fine.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::SimError;
use crate::sim::ladder::{Color, SizeLadder};

/// Surface material for a group of shapes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialSettings {
    /// Restitution (0 = dead stop, 1 = perfectly bouncy)
    pub elasticity: f32,
    /// Coulomb friction coefficient
    pub friction: f32,
}

impl Default for MaterialSettings {
    fn default() -> Self {
        Self {
            elasticity: PIECE_ELASTICITY,
            friction: PIECE_FRICTION,
        }
    }
}

/// One rung of a custom size ladder
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LadderEntrySettings {
    pub radius: f32,
    pub color: Color,
}

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // === Geometry ===
    /// Scene width (pixels)
    pub scene_width: f32,
    /// Scene height (pixels); game over is measured against this
    pub scene_height: f32,
    /// Container width, centered horizontally in the scene
    pub container_width: f32,
    /// Container height, centered vertically in the scene
    pub container_height: f32,
    /// Thickness radius of the wall segments
    pub wall_radius: f32,

    // === Physics ===
    /// Gravity vector (y grows downward)
    pub gravity: Vec2,
    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Physics sub-steps per tick
    pub substeps: u32,
    /// Contact solver iterations per sub-step
    pub solver_iterations: u32,

    // === Spawning ===
    /// RNG seed for spawn sizes
    pub seed: u64,
    /// Number of smallest sizes eligible to spawn
    pub spawn_pool: usize,
    /// Pending piece steering speed (pixels per tick)
    pub steer_speed: f32,
    /// Pending piece vertical position
    pub spawn_line_y: f32,
    /// Delay after a drop before the next piece appears (seconds)
    pub settle_delay_secs: f32,

    // === Materials ===
    pub piece_material: MaterialSettings,
    /// Area density; piece mass is density * area
    pub piece_density: f32,
    pub wall_material: MaterialSettings,

    /// Custom size ladder; the classic ten-rung ladder is used when absent
    pub ladder: Option<Vec<LadderEntrySettings>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scene_width: SCENE_WIDTH,
            scene_height: SCENE_HEIGHT,
            container_width: CONTAINER_WIDTH,
            container_height: CONTAINER_HEIGHT,
            wall_radius: WALL_RADIUS,

            gravity: Vec2::new(0.0, GRAVITY),
            tick_rate: TICK_RATE,
            substeps: SUBSTEPS,
            solver_iterations: SOLVER_ITERATIONS,

            seed: 0,
            spawn_pool: SPAWN_POOL,
            steer_speed: STEER_SPEED,
            spawn_line_y: SPAWN_LINE_Y,
            settle_delay_secs: SETTLE_DELAY_SECS,

            piece_material: MaterialSettings::default(),
            piece_density: PIECE_DENSITY,
            wall_material: MaterialSettings::default(),

            ladder: None,
        }
    }
}

impl Settings {
    /// Parse settings from JSON and validate them
    pub fn from_json(json: &str) -> Result<Self, SimError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Fixed simulation timestep (seconds)
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }

    /// Ticks a dropped piece ages before the next piece spawns
    pub fn settle_ticks(&self) -> u32 {
        (self.settle_delay_secs * self.tick_rate as f32).round() as u32
    }

    /// Build the size ladder these settings describe
    pub fn size_ladder(&self) -> Result<SizeLadder, SimError> {
        match &self.ladder {
            Some(entries) => {
                SizeLadder::new(entries.iter().map(|e| (e.radius, e.color)).collect())
            }
            None => Ok(SizeLadder::classic()),
        }
    }

    /// Check that the settings describe a playable session
    pub fn validate(&self) -> Result<(), SimError> {
        self.validate_params()?;
        self.validate_ladder(&self.size_ladder()?)
    }

    /// Geometry, rate and material checks; everything but the ladder
    pub fn validate_params(&self) -> Result<(), SimError> {
        let invalid =
            |msg: &str| -> Result<(), SimError> { Err(SimError::InvalidSettings(msg.to_string())) };

        let dims = [
            self.scene_width,
            self.scene_height,
            self.container_width,
            self.container_height,
        ];
        if dims.iter().any(|d| !d.is_finite() || *d <= 0.0) {
            return invalid("scene and container dimensions must be positive");
        }
        if self.container_width > self.scene_width || self.container_height > self.scene_height {
            return invalid("container must fit inside the scene");
        }
        if !self.wall_radius.is_finite() || self.wall_radius <= 0.0 {
            return invalid("wall radius must be positive");
        }
        if !self.gravity.is_finite() {
            return invalid("gravity must be finite");
        }
        if self.tick_rate == 0 || self.substeps == 0 || self.solver_iterations == 0 {
            return invalid("tick rate, substeps and solver iterations must be non-zero");
        }
        if self.spawn_pool == 0 {
            return invalid("spawn pool must contain at least one size");
        }
        if !self.steer_speed.is_finite() || self.steer_speed < 0.0 {
            return invalid("steer speed must be non-negative");
        }
        if !self.settle_delay_secs.is_finite() || self.settle_delay_secs < 0.0 {
            return invalid("settle delay must be non-negative");
        }
        if !self.piece_density.is_finite() || self.piece_density <= 0.0 {
            return invalid("piece density must be positive");
        }
        for material in [&self.piece_material, &self.wall_material] {
            if !(0.0..=1.0).contains(&material.elasticity) {
                return invalid("elasticity must be between 0 and 1");
            }
            if !material.friction.is_finite() || material.friction < 0.0 {
                return invalid("friction must be non-negative");
            }
        }

        Ok(())
    }

    /// Check that every piece of `ladder` fits between the walls
    pub fn validate_ladder(&self, ladder: &SizeLadder) -> Result<(), SimError> {
        let widest = ladder.radius_of(ladder.count() - 1)?;
        if widest * 2.0 > self.container_width {
            return Err(SimError::InvalidSettings(
                "largest piece is wider than the container".to_string(),
            ));
        }
        Ok(())
    }
}
