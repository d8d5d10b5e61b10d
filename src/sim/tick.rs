//! Fixed timestep simulation tick
//!
//! Each tick runs, in order: pending piece update, one physics step, the
//! deferred merge phase, and the game-over scan.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::body::{BodyId, BodyKind, Shape, ShapeTag};
use super::ladder::{Color, SizeLadder};
use super::state::{GameEvent, GamePhase, Session};
use super::world::World;
use crate::error::SimError;

/// Input commands for a single tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickInput {
    /// Steering held this tick
    pub steer_left: bool,
    pub steer_right: bool,
    /// Drop pressed this tick (edge-triggered)
    pub drop: bool,
}

/// One circle for the presentation layer to draw
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapeView {
    pub body: BodyId,
    pub position: Vec2,
    pub radius: f32,
    pub color: Color,
    pub size: usize,
    /// Still held by the player
    pub pending: bool,
}

/// Outcome of a tick
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickResult {
    /// Tick counter after this tick
    pub tick: u64,
    pub live_shapes: Vec<ShapeView>,
    pub game_over: bool,
    /// Size of the piece the player is holding, for previews
    pub pending_size: Option<usize>,
    pub events: Vec<GameEvent>,
}

/// First circle whose top edge has dropped past the bottom of the scene
pub fn detect_game_over(world: &World, scene_height: f32) -> Option<BodyId> {
    world.bodies().find_map(|body| match body.shape {
        Shape::Circle { radius } if body.position.y - radius > scene_height => Some(body.id),
        _ => None,
    })
}

/// Every live piece as a drawable circle
pub fn live_shapes(world: &World, ladder: &SizeLadder, pending: Option<BodyId>) -> Vec<ShapeView> {
    let mut shapes = Vec::new();
    world.for_each_shape(|body| {
        let (Shape::Circle { radius }, ShapeTag::Piece { size }) = (body.shape, body.tag) else {
            return;
        };
        let Ok(color) = ladder.color_of(size) else {
            return;
        };
        shapes.push(ShapeView {
            body: body.id,
            position: body.position,
            radius,
            color,
            size,
            pending: Some(body.id) == pending && body.kind == BodyKind::Static,
        });
    });
    shapes
}

/// Advance the session by one fixed timestep.
///
/// Once the game is over the session stops advancing and every call reports
/// `game_over`. An engine failure faults the session permanently.
pub fn tick(session: &mut Session, input: &TickInput) -> Result<TickResult, SimError> {
    match session.phase {
        GamePhase::Faulted => return Err(SimError::SessionFaulted),
        GamePhase::GameOver => return Ok(snapshot(session)),
        GamePhase::Playing => {}
    }

    session.time_ticks += 1;

    session.controller.update(
        input,
        &mut session.world,
        &session.ladder,
        &session.template,
        &mut session.rng,
        &mut session.events,
    )?;

    let dt = session.settings.dt();
    if let Err(err) = session.world.step(dt, &mut session.resolver) {
        log::error!("Tick {} failed: {}", session.time_ticks, err);
        session.phase = GamePhase::Faulted;
        return Err(err);
    }

    session.resolver.execute(
        &mut session.world,
        &session.ladder,
        &session.template,
        &mut session.events,
    )?;

    if let Some(body) = detect_game_over(&session.world, session.settings.scene_height) {
        log::info!("Game over at tick {}: piece {:?} left the scene", session.time_ticks, body);
        session.phase = GamePhase::GameOver;
        session.events.push(GameEvent::GameOver { body });
    }

    Ok(snapshot(session))
}

/// Build a tick result and flush queued events
fn snapshot(session: &mut Session) -> TickResult {
    let pending = session.controller.pending().filter(|p| !p.released()).copied();
    TickResult {
        tick: session.time_ticks,
        live_shapes: live_shapes(&session.world, &session.ladder, pending.map(|p| p.body)),
        game_over: session.phase == GamePhase::GameOver,
        pending_size: pending.map(|p| p.size),
        events: std::mem::take(&mut session.events),
    }
}

impl Session {
    /// Advance by one tick; see [`tick`]
    pub fn tick(&mut self, input: &TickInput) -> Result<TickResult, SimError> {
        tick(self, input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::Settings;

    fn two_rung_session() -> Session {
        let ladder = SizeLadder::new(vec![
            (10.0, Color::rgb(255, 0, 0)),
            (20.0, Color::rgb(0, 0, 255)),
        ])
        .unwrap();
        Session::with_ladder(Settings::default(), ladder).unwrap()
    }

    /// Free pieces of a given size, ignoring the one the player holds
    fn free_pieces(session: &Session, size: usize) -> Vec<BodyId> {
        let pending = session.pending_body();
        session
            .world()
            .bodies()
            .filter(|b| Some(b.id) != pending && b.tag == ShapeTag::Piece { size })
            .map(|b| b.id)
            .collect()
    }

    #[test]
    fn test_equal_pieces_merge_into_next_size() {
        let mut session = two_rung_session();
        session.spawn_piece(0, Vec2::new(400.0, 500.0)).unwrap();
        session.spawn_piece(0, Vec2::new(400.0, 500.0)).unwrap();

        let result = session.tick(&TickInput::default()).unwrap();

        assert!(free_pieces(&session, 0).is_empty());
        let merged = free_pieces(&session, 1);
        assert_eq!(merged.len(), 1);
        let body = session.world().body(merged[0]).unwrap();
        assert!((body.position.x - 400.0).abs() < 1e-3);
        assert_eq!(body.kind, BodyKind::Dynamic);

        let merges = result
            .events
            .iter()
            .filter(|e| matches!(e, GameEvent::Merged { size: 1, .. }))
            .count();
        assert_eq!(merges, 1);
    }

    #[test]
    fn test_terminal_pieces_vanish() {
        let mut session = two_rung_session();
        session.spawn_piece(1, Vec2::new(400.0, 500.0)).unwrap();
        session.spawn_piece(1, Vec2::new(410.0, 500.0)).unwrap();

        let result = session.tick(&TickInput::default()).unwrap();

        assert!(free_pieces(&session, 0).is_empty());
        assert!(free_pieces(&session, 1).is_empty());
        assert!(result
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::PairVanished { size: 1, .. })));
    }

    #[test]
    fn test_game_over_on_exact_tick() {
        let mut session = Session::new(Settings::default()).unwrap();
        let height = session.settings().scene_height;
        // Outside the container, free-falling toward the bottom of the scene
        let body = session.spawn_piece(0, Vec2::new(100.0, height - 40.0)).unwrap();

        let mut over_at = None;
        for _ in 0..200 {
            let result = session.tick(&TickInput::default()).unwrap();
            let y = session.world().body(body).unwrap().position.y;
            if result.game_over {
                assert!(y - 20.0 > height);
                over_at = Some(result.tick);
                break;
            }
            assert!(y - 20.0 <= height);
        }

        let over_at = over_at.expect("piece should fall out of the scene");
        assert!(session.is_game_over());

        // Monotonic: further ticks don't advance and keep reporting game over
        for _ in 0..5 {
            let result = session.tick(&TickInput { drop: true, ..Default::default() }).unwrap();
            assert!(result.game_over);
            assert_eq!(result.tick, over_at);
        }
    }

    #[test]
    fn test_first_tick_reports_initial_spawn() {
        let mut session = Session::new(Settings::default()).unwrap();
        let result = session.tick(&TickInput::default()).unwrap();

        assert_eq!(result.tick, 1);
        assert!(!result.game_over);
        assert!(result.pending_size.is_some());
        assert!(matches!(result.events[0], GameEvent::PieceSpawned { .. }));
        let pending: Vec<_> = result.live_shapes.iter().filter(|s| s.pending).collect();
        assert_eq!(pending.len(), 1);
    }

    #[test]
    fn test_double_drop_keeps_world_unchanged() {
        let mut session = Session::new(Settings::default()).unwrap();
        let drop = TickInput {
            drop: true,
            ..Default::default()
        };
        session.tick(&drop).unwrap();
        let body = session.pending_body().unwrap();
        let count = session.world().len();

        session.tick(&drop).unwrap();

        assert_eq!(session.world().len(), count);
        assert_eq!(session.pending_body(), Some(body));
        assert_eq!(session.world().body(body).unwrap().kind, BodyKind::Dynamic);
    }

    #[test]
    fn test_dropped_piece_lands_in_container() {
        let mut session = Session::new(Settings::default()).unwrap();
        let drop = TickInput {
            drop: true,
            ..Default::default()
        };
        session.tick(&drop).unwrap();
        let body = session.pending_body().unwrap();

        for _ in 0..200 {
            session.tick(&TickInput::default()).unwrap();
        }

        let piece = session.world().body(body).unwrap();
        let container = *session.container();
        assert!(piece.position.y < container.bottom);
        assert!(piece.position.x > container.left && piece.position.x < container.right);
        // A fresh piece is waiting at the spawn line
        assert_ne!(session.pending_body(), Some(body));
    }

    #[test]
    fn test_determinism() {
        let settings = Settings {
            seed: 99999,
            ..Default::default()
        };
        let mut a = Session::new(settings.clone()).unwrap();
        let mut b = Session::new(settings).unwrap();

        let inputs = [
            TickInput {
                steer_left: true,
                ..Default::default()
            },
            TickInput {
                drop: true,
                ..Default::default()
            },
            TickInput {
                steer_right: true,
                ..Default::default()
            },
            TickInput::default(),
        ];

        for n in 0..300 {
            let input = &inputs[n % inputs.len()];
            let ra = a.tick(input).unwrap();
            let rb = b.tick(input).unwrap();
            assert_eq!(ra.live_shapes, rb.live_shapes);
            assert_eq!(ra.pending_size, rb.pending_size);
        }
    }

    #[test]
    fn test_engine_failure_faults_session() {
        let mut session = Session::new(Settings::default()).unwrap();
        session.world.set_gravity(Vec2::new(0.0, f32::INFINITY));
        session.spawn_piece(0, Vec2::new(500.0, 300.0)).unwrap();

        assert!(matches!(
            session.tick(&TickInput::default()),
            Err(SimError::EngineStepFailure(_))
        ));
        assert_eq!(session.phase(), GamePhase::Faulted);
        assert!(matches!(
            session.tick(&TickInput::default()),
            Err(SimError::SessionFaulted)
        ));
    }
}
