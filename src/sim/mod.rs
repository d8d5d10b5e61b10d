//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by body ID)
//! - No rendering or platform dependencies

pub mod body;
pub mod collision;
pub mod ladder;
pub mod merge;
pub mod piece;
pub mod state;
pub mod tick;
pub mod world;

pub use body::{Body, BodyDesc, BodyId, BodyKind, Material, Shape, ShapeTag};
pub use collision::{Contact, body_contact, circle_circle, circle_segment};
pub use ladder::{Color, LadderEntry, SizeLadder};
pub use merge::{MergeRequest, MergeResolver};
pub use piece::{PendingPiece, PieceController, PiecePhase, PieceTemplate};
pub use state::{Container, GameEvent, GamePhase, Session};
pub use tick::{ShapeView, TickInput, TickResult, detect_game_over, tick};
pub use world::{ContactEvent, ContactListener, ShapeInfo, World};
