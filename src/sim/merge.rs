//! Merge resolution
//!
//! Contact events only queue merge requests. The queue is applied once the
//! physics step has returned, so bodies are never added or removed while the
//! world is walking its contact list.

use std::collections::HashSet;

use glam::Vec2;

use super::body::{BodyId, BodyKind, ShapeTag};
use super::ladder::SizeLadder;
use super::piece::PieceTemplate;
use super::state::GameEvent;
use super::world::{ContactEvent, ContactListener, World};
use crate::error::SimError;

/// Two same-size pieces that just touched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeRequest {
    pub a: BodyId,
    pub b: BodyId,
    pub size: usize,
}

impl MergeRequest {
    /// Decide whether a contact should merge.
    ///
    /// Walls, static bodies, sustained contacts and mismatched sizes are all
    /// rejected, in that order.
    pub fn qualify(event: &ContactEvent) -> Option<Self> {
        let (ShapeTag::Piece { size: size_a }, ShapeTag::Piece { size: size_b }) =
            (event.a.tag, event.b.tag)
        else {
            return None;
        };
        if event.a.kind == BodyKind::Static || event.b.kind == BodyKind::Static {
            return None;
        }
        if !event.first_contact || size_a != size_b {
            return None;
        }

        let (a, b) = if event.a.body <= event.b.body {
            (event.a.body, event.b.body)
        } else {
            (event.b.body, event.a.body)
        };
        Some(Self { a, b, size: size_a })
    }
}

/// Queues merges during a step and applies them afterwards
#[derive(Debug, Clone, Default)]
pub struct MergeResolver {
    queue: Vec<MergeRequest>,
    /// Unordered pairs already queued this tick
    queued: HashSet<(BodyId, BodyId)>,
}

impl ContactListener for MergeResolver {
    fn on_contact(&mut self, event: &ContactEvent) {
        if let Some(request) = MergeRequest::qualify(event) {
            if self.queued.insert((request.a, request.b)) {
                self.queue.push(request);
            }
        }
    }
}

impl MergeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests waiting for the deferred phase, in arrival order
    pub fn pending(&self) -> &[MergeRequest] {
        &self.queue
    }

    /// Apply every queued merge in FIFO order.
    ///
    /// A request whose pieces are no longer both in the world (one was
    /// consumed by an earlier merge this tick) is dropped.
    pub fn execute(
        &mut self,
        world: &mut World,
        ladder: &SizeLadder,
        template: &PieceTemplate,
        events: &mut Vec<GameEvent>,
    ) -> Result<(), SimError> {
        self.queued.clear();
        for request in std::mem::take(&mut self.queue) {
            // Validate before touching the world
            ladder.entry(request.size)?;

            let (Some(a), Some(b)) = (world.body(request.a), world.body(request.b)) else {
                log::warn!(
                    "Skipping merge of {:?} and {:?}: piece already gone",
                    request.a,
                    request.b
                );
                continue;
            };
            let position = merge_point(a.position, b.position);

            world.remove_body(request.a);
            world.remove_body(request.b);

            let consumed = [request.a, request.b];
            if ladder.is_terminal(request.size) {
                log::debug!("Terminal pair {:?} vanished at {}", consumed, position);
                events.push(GameEvent::PairVanished {
                    consumed,
                    size: request.size,
                    position,
                });
            } else {
                let size = request.size + 1;
                let created = template.spawn(world, ladder, size, position, BodyKind::Dynamic)?;
                log::debug!("Merged {:?} into {:?} (size {}) at {}", consumed, created, size, position);
                events.push(GameEvent::Merged {
                    consumed,
                    created,
                    size,
                    position,
                });
            }
        }
        Ok(())
    }
}

/// Midpoint the merged piece appears at
#[inline]
pub fn merge_point(a: Vec2, b: Vec2) -> Vec2 {
    (a + b) / 2.0
}
