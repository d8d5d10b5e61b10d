//! Suika Merge - a physics-driven merging game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (rigid bodies, merging, game state)
//! - `settings`: Data-driven session configuration
//! - `error`: Error taxonomy for the simulation core
//!
//! Rendering, input polling and frame pacing live outside this crate; the
//! presentation layer drives [`sim::Session::tick`] and draws the returned
//! shapes.

pub mod error;
pub mod settings;
pub mod sim;

pub use error::SimError;
pub use settings::{LadderEntrySettings, MaterialSettings, Settings};

/// Game configuration constants
pub mod consts {
    /// Scene dimensions (pixels, y grows downward)
    pub const SCENE_WIDTH: f32 = 1280.0;
    pub const SCENE_HEIGHT: f32 = 720.0;

    /// Container dimensions, centered in the scene
    pub const CONTAINER_WIDTH: f32 = 600.0;
    pub const CONTAINER_HEIGHT: f32 = 600.0;
    /// Thickness radius of the container wall segments
    pub const WALL_RADIUS: f32 = 1.0;

    /// Downward gravity (pixels/s²)
    pub const GRAVITY: f32 = 900.0;

    /// Fixed simulation rate (50 Hz)
    pub const TICK_RATE: u32 = 50;
    /// Physics sub-steps per tick
    pub const SUBSTEPS: u32 = 4;
    /// Contact solver iterations per sub-step
    pub const SOLVER_ITERATIONS: u32 = 8;

    /// Pending piece vertical position
    pub const SPAWN_LINE_Y: f32 = 50.0;
    /// Horizontal steering speed (pixels per tick)
    pub const STEER_SPEED: f32 = 5.0;
    /// How many of the smallest sizes may spawn as a new pending piece
    pub const SPAWN_POOL: usize = 6;
    /// Delay between a drop and the next pending piece (seconds)
    pub const SETTLE_DELAY_SECS: f32 = 1.0;

    /// Default piece material
    pub const PIECE_ELASTICITY: f32 = 0.5;
    pub const PIECE_FRICTION: f32 = 0.5;
    /// Area density used to derive piece mass from radius
    pub const PIECE_DENSITY: f32 = 0.001;
}
