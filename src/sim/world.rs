//! Rigid body world
//!
//! Owns every body, integrates them with a fixed sub-stepped timestep, and
//! reports contacts to a [`ContactListener`] once the step has finished.
//!
//! Listeners only see read-only snapshots of the touching shapes; the world is
//! mutably borrowed for the whole step, so any reaction to a contact has to be
//! queued and applied after `step` returns.

use std::collections::BTreeSet;

use glam::Vec2;

use super::body::{Body, BodyDesc, BodyId, BodyKind, ShapeTag};
use super::collision::{Contact, body_contact};
use crate::error::SimError;

/// Relative normal speed below which contacts don't bounce
const RESTITUTION_THRESHOLD: f32 = 20.0;
/// Penetration tolerated before positional correction kicks in
const PENETRATION_SLOP: f32 = 0.5;
/// Fraction of remaining penetration removed per sub-step
const CORRECTION_PERCENT: f32 = 0.6;

/// Read-only view of one side of a contact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeInfo {
    pub body: BodyId,
    pub kind: BodyKind,
    pub tag: ShapeTag,
    pub position: Vec2,
}

impl ShapeInfo {
    fn of(body: &Body) -> Self {
        Self {
            body: body.id,
            kind: body.kind,
            tag: body.tag,
            position: body.position,
        }
    }
}

/// A touching pair observed during a step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactEvent {
    pub a: ShapeInfo,
    pub b: ShapeInfo,
    /// True only on the step the pair started touching
    pub first_contact: bool,
}

/// Receives contact events after each step
pub trait ContactListener {
    fn on_contact(&mut self, event: &ContactEvent);
}

impl<F: FnMut(&ContactEvent)> ContactListener for F {
    fn on_contact(&mut self, event: &ContactEvent) {
        self(event)
    }
}

/// Ordered pair key, smaller id first
type PairKey = (BodyId, BodyId);

fn pair_key(a: BodyId, b: BodyId) -> PairKey {
    if a <= b { (a, b) } else { (b, a) }
}

/// Borrow two distinct bodies mutably
fn pair_mut(bodies: &mut [Body], i: usize, j: usize) -> (&mut Body, &mut Body) {
    debug_assert_ne!(i, j);
    if i < j {
        let (left, right) = bodies.split_at_mut(j);
        (&mut left[i], &mut right[0])
    } else {
        let (left, right) = bodies.split_at_mut(i);
        (&mut right[0], &mut left[j])
    }
}

/// Contact between bodies at indices `a` and `b`
#[derive(Debug, Clone, Copy)]
struct IndexedContact {
    a: usize,
    b: usize,
    contact: Contact,
}

/// The physics simulation world
#[derive(Debug, Clone)]
pub struct World {
    /// Live bodies, sorted by id
    bodies: Vec<Body>,
    gravity: Vec2,
    substeps: u32,
    solver_iterations: u32,
    /// Pairs touching at the end of the previous step
    touching: BTreeSet<PairKey>,
    next_id: u32,
}

impl World {
    pub fn new(gravity: Vec2, substeps: u32, solver_iterations: u32) -> Self {
        Self {
            bodies: Vec::new(),
            gravity,
            substeps: substeps.max(1),
            solver_iterations: solver_iterations.max(1),
            touching: BTreeSet::new(),
            next_id: 1,
        }
    }

    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.gravity = gravity;
    }

    pub fn gravity(&self) -> Vec2 {
        self.gravity
    }

    /// Add a body and return its identity
    pub fn add_body(&mut self, desc: BodyDesc) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        // Ids only grow, so pushing keeps the list sorted
        self.bodies.push(Body::from_desc(id, desc));
        id
    }

    fn index_of(&self, id: BodyId) -> Option<usize> {
        self.bodies.binary_search_by_key(&id, |b| b.id).ok()
    }

    /// Remove a body. Removing an absent body is a no-op returning `None`.
    pub fn remove_body(&mut self, id: BodyId) -> Option<Body> {
        let index = self.index_of(id)?;
        self.touching.retain(|&(a, b)| a != id && b != id);
        Some(self.bodies.remove(index))
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.index_of(id).map(|i| &self.bodies[i])
    }

    /// Teleport a body. Returns false if the body is gone.
    pub fn set_position(&mut self, id: BodyId, position: Vec2) -> bool {
        match self.index_of(id) {
            Some(i) => {
                self.bodies[i].position = position;
                true
            }
            None => false,
        }
    }

    /// Set a dynamic body's linear velocity. Returns false if the body is gone.
    #[cfg(test)]
    pub(crate) fn set_velocity(&mut self, id: BodyId, velocity: Vec2) -> bool {
        match self.index_of(id) {
            Some(i) if self.bodies[i].kind == BodyKind::Dynamic => {
                self.bodies[i].velocity = velocity;
                true
            }
            _ => false,
        }
    }

    /// Turn a static body into a dynamic one in place.
    ///
    /// The body leaves the world, gets fresh disk mass properties, and is
    /// re-added under the same id at the same position. Returns false if the
    /// body is gone; converting an already dynamic body changes nothing.
    pub fn convert_to_dynamic(&mut self, id: BodyId) -> bool {
        let Some(mut body) = self.remove_body(id) else {
            return false;
        };
        if body.kind != BodyKind::Dynamic {
            body.kind = BodyKind::Dynamic;
            body.velocity = Vec2::ZERO;
            body.angular_velocity = 0.0;
            body.recompute_mass();
        }
        let index = self
            .bodies
            .binary_search_by_key(&id, |b| b.id)
            .unwrap_or_else(|i| i);
        self.bodies.insert(index, body);
        true
    }

    /// All live bodies in id order
    pub fn bodies(&self) -> impl Iterator<Item = &Body> {
        self.bodies.iter()
    }

    /// Visit every live shape in id order
    pub fn for_each_shape<F: FnMut(&Body)>(&self, mut f: F) {
        for body in &self.bodies {
            f(body);
        }
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Bodies overlapping `id`, static ones included
    pub fn query_overlaps(&self, id: BodyId) -> Vec<BodyId> {
        let Some(body) = self.body(id) else {
            return Vec::new();
        };
        self.bodies
            .iter()
            .filter(|other| other.id != id && body_contact(body, other).is_some())
            .map(|other| other.id)
            .collect()
    }

    /// Advance the simulation by `dt` and report contacts to `listener`.
    ///
    /// Each pair touching at any sub-step is reported exactly once, after all
    /// sub-steps have run. A non-finite body state aborts the step before any
    /// event is dispatched.
    pub fn step<L: ContactListener + ?Sized>(
        &mut self,
        dt: f32,
        listener: &mut L,
    ) -> Result<(), SimError> {
        let sub_dt = dt / self.substeps as f32;
        let mut touched: BTreeSet<PairKey> = BTreeSet::new();

        for _ in 0..self.substeps {
            self.integrate_velocities(sub_dt);

            let contacts = self.detect_contacts();
            for c in &contacts {
                touched.insert(pair_key(self.bodies[c.a].id, self.bodies[c.b].id));
            }

            for _ in 0..self.solver_iterations {
                for c in &contacts {
                    self.resolve_velocity(c);
                }
            }
            for c in &contacts {
                self.correct_position(c);
            }

            self.integrate_positions(sub_dt);
        }

        if let Some(bad) = self.bodies.iter().find(|b| !b.is_finite()) {
            log::error!("Body {:?} diverged: pos={} vel={}", bad.id, bad.position, bad.velocity);
            return Err(SimError::EngineStepFailure(format!(
                "body {} has non-finite state",
                bad.id.0
            )));
        }

        log::trace!("Step: {} touching pairs", touched.len());

        for &(a, b) in &touched {
            // Both ids come from this step's body list and nothing was removed
            let (Some(body_a), Some(body_b)) = (self.body(a), self.body(b)) else {
                continue;
            };
            let event = ContactEvent {
                a: ShapeInfo::of(body_a),
                b: ShapeInfo::of(body_b),
                first_contact: !self.touching.contains(&(a, b)),
            };
            listener.on_contact(&event);
        }
        self.touching = touched;

        Ok(())
    }

    /// Apply gravity to dynamic bodies
    fn integrate_velocities(&mut self, dt: f32) {
        let dv = self.gravity * dt;
        for body in &mut self.bodies {
            if body.kind == BodyKind::Dynamic {
                body.velocity += dv;
            }
        }
    }

    fn integrate_positions(&mut self, dt: f32) {
        for body in &mut self.bodies {
            if body.kind == BodyKind::Dynamic {
                body.position += body.velocity * dt;
                body.angle += body.angular_velocity * dt;
            }
        }
    }

    /// Broad phase (sweep and prune on x) followed by the narrow phase
    fn detect_contacts(&self) -> Vec<IndexedContact> {
        let mut boxes: Vec<(Vec2, Vec2, usize)> = self
            .bodies
            .iter()
            .enumerate()
            .map(|(i, b)| {
                let (min, max) = b.shape.aabb(b.position);
                (min, max, i)
            })
            .collect();
        boxes.sort_by(|a, b| a.0.x.total_cmp(&b.0.x).then(a.2.cmp(&b.2)));

        let mut contacts = Vec::new();
        for (n, &(min_a, max_a, ia)) in boxes.iter().enumerate() {
            for &(min_b, max_b, ib) in &boxes[n + 1..] {
                if min_b.x > max_a.x {
                    break;
                }
                if min_b.y > max_a.y || min_a.y > max_b.y {
                    continue;
                }

                let (a, b) = if ia < ib { (ia, ib) } else { (ib, ia) };
                let (body_a, body_b) = (&self.bodies[a], &self.bodies[b]);
                if body_a.is_static() && body_b.is_static() {
                    continue;
                }
                if let Some(contact) = body_contact(body_a, body_b) {
                    contacts.push(IndexedContact { a, b, contact });
                }
            }
        }

        // Stable solve order regardless of sweep order
        contacts.sort_by_key(|c| (c.a, c.b));
        contacts
    }

    /// Normal and friction impulses for one contact
    fn resolve_velocity(&mut self, c: &IndexedContact) {
        let (body_a, body_b) = pair_mut(&mut self.bodies, c.a, c.b);
        let n = c.contact.normal;
        let point = c.contact.point;

        let r_a = point - body_a.position;
        let r_b = point - body_b.position;
        let relative_vel = body_b.velocity_at_point(point) - body_a.velocity_at_point(point);

        let vn = relative_vel.dot(n);
        // Separating
        if vn > 0.0 {
            return;
        }

        let rn_a = r_a.perp_dot(n);
        let rn_b = r_b.perp_dot(n);
        let k = body_a.inv_mass
            + body_b.inv_mass
            + rn_a * rn_a * body_a.inv_moment
            + rn_b * rn_b * body_b.inv_moment;
        if k <= 0.0 {
            return;
        }

        let e = if -vn > RESTITUTION_THRESHOLD {
            (body_a.material.elasticity + body_b.material.elasticity) * 0.5
        } else {
            0.0
        };
        let j = (-(1.0 + e) * vn / k).max(0.0);
        let impulse = n * j;
        body_a.apply_impulse_at_point(-impulse, point);
        body_b.apply_impulse_at_point(impulse, point);

        // Coulomb friction along the tangent
        let relative_vel = body_b.velocity_at_point(point) - body_a.velocity_at_point(point);
        let tangent = (relative_vel - n * relative_vel.dot(n)).normalize_or_zero();
        if tangent == Vec2::ZERO {
            return;
        }
        let rt_a = r_a.perp_dot(tangent);
        let rt_b = r_b.perp_dot(tangent);
        let kt = body_a.inv_mass
            + body_b.inv_mass
            + rt_a * rt_a * body_a.inv_moment
            + rt_b * rt_b * body_b.inv_moment;
        if kt <= 0.0 {
            return;
        }
        // Bounds stay ordered even for a negative or NaN coefficient
        let max_jt = (j * (body_a.material.friction + body_b.material.friction) * 0.5).max(0.0);
        let jt = (-relative_vel.dot(tangent) / kt).clamp(-max_jt, max_jt);
        let friction = tangent * jt;
        body_a.apply_impulse_at_point(-friction, point);
        body_b.apply_impulse_at_point(friction, point);
    }

    /// Push overlapping bodies apart in proportion to their inverse masses
    fn correct_position(&mut self, c: &IndexedContact) {
        let (body_a, body_b) = pair_mut(&mut self.bodies, c.a, c.b);
        let total_inv_mass = body_a.inv_mass + body_b.inv_mass;
        if total_inv_mass <= 0.0 {
            return;
        }
        let depth = (c.contact.depth - PENETRATION_SLOP).max(0.0);
        let correction = c.contact.normal * depth * CORRECTION_PERCENT / total_inv_mass;
        body_a.position -= correction * body_a.inv_mass;
        body_b.position += correction * body_b.inv_mass;
    }
}
