//! Rigid bodies and their collision shapes
//!
//! Every body carries exactly one shape, so a body id doubles as the shape's
//! identity in contact events.

use std::f32::consts::PI;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Stable body identity (never reused within a world)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyId(pub u32);

/// Body simulation kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    /// Immovable, unaffected by gravity or impulses; mass is ignored
    Static,
    /// Integrated each step; mass is always positive
    Dynamic,
}

/// Gameplay role of a body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeTag {
    /// Container geometry; never merges
    Wall,
    /// A game piece of the given ladder size
    Piece { size: usize },
}

impl ShapeTag {
    /// Ladder size for pieces, `None` for walls
    pub fn size(&self) -> Option<usize> {
        match *self {
            ShapeTag::Piece { size } => Some(size),
            ShapeTag::Wall => None,
        }
    }
}

/// Collision geometry in body-local coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Circle { radius: f32 },
    /// Capsule between two local endpoints
    Segment { a: Vec2, b: Vec2, radius: f32 },
}

impl Shape {
    /// World-space bounding box `(min, max)` at a given body position
    pub fn aabb(&self, position: Vec2) -> (Vec2, Vec2) {
        match *self {
            Shape::Circle { radius } => {
                let r = Vec2::splat(radius);
                (position - r, position + r)
            }
            Shape::Segment { a, b, radius } => {
                let r = Vec2::splat(radius);
                let (a, b) = (position + a, position + b);
                (a.min(b) - r, a.max(b) + r)
            }
        }
    }

    /// Mass and moment of inertia for a uniform-density shape.
    ///
    /// Segments only ever back static walls and carry no mass.
    pub fn mass_properties(&self, density: f32) -> (f32, f32) {
        match *self {
            Shape::Circle { radius } => {
                let mass = disk_mass(density, radius);
                (mass, disk_moment(mass, radius))
            }
            Shape::Segment { .. } => (0.0, 0.0),
        }
    }
}

/// Mass of a uniform disk
#[inline]
pub fn disk_mass(density: f32, radius: f32) -> f32 {
    density * PI * radius * radius
}

/// Moment of inertia of a solid disk about its center
#[inline]
pub fn disk_moment(mass: f32, radius: f32) -> f32 {
    mass * radius * radius / 2.0
}

/// Surface response parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub elasticity: f32,
    pub friction: f32,
}

impl From<crate::settings::MaterialSettings> for Material {
    fn from(m: crate::settings::MaterialSettings) -> Self {
        Self {
            elasticity: m.elasticity,
            friction: m.friction,
        }
    }
}

/// Everything needed to add a body to the world
#[derive(Debug, Clone, Copy)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub position: Vec2,
    pub shape: Shape,
    pub tag: ShapeTag,
    pub material: Material,
    /// Area density used for dynamic bodies
    pub density: f32,
}

/// A rigid body owned by the world
#[derive(Debug, Clone)]
pub struct Body {
    pub id: BodyId,
    pub kind: BodyKind,
    pub position: Vec2,
    pub velocity: Vec2,
    pub angle: f32,
    pub angular_velocity: f32,
    /// Zero for static bodies
    pub mass: f32,
    pub inv_mass: f32,
    pub moment: f32,
    pub inv_moment: f32,
    pub density: f32,
    pub shape: Shape,
    pub tag: ShapeTag,
    pub material: Material,
}

impl Body {
    pub(crate) fn from_desc(id: BodyId, desc: BodyDesc) -> Self {
        let mut body = Self {
            id,
            kind: desc.kind,
            position: desc.position,
            velocity: Vec2::ZERO,
            angle: 0.0,
            angular_velocity: 0.0,
            mass: 0.0,
            inv_mass: 0.0,
            moment: 0.0,
            inv_moment: 0.0,
            density: desc.density,
            shape: desc.shape,
            tag: desc.tag,
            material: desc.material,
        };
        body.recompute_mass();
        body
    }

    /// Refresh mass properties from shape and density according to kind
    pub(crate) fn recompute_mass(&mut self) {
        match self.kind {
            BodyKind::Static => {
                self.mass = 0.0;
                self.inv_mass = 0.0;
                self.moment = 0.0;
                self.inv_moment = 0.0;
                self.velocity = Vec2::ZERO;
                self.angular_velocity = 0.0;
            }
            BodyKind::Dynamic => {
                let (mass, moment) = self.shape.mass_properties(self.density);
                debug_assert!(mass > 0.0, "dynamic body {:?} has non-positive mass", self.id);
                self.mass = mass;
                self.inv_mass = if mass > 0.0 { 1.0 / mass } else { 0.0 };
                self.moment = moment;
                self.inv_moment = if moment > 0.0 { 1.0 / moment } else { 0.0 };
            }
        }
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.kind == BodyKind::Static
    }

    /// Radius for circles, `None` for segments
    pub fn radius(&self) -> Option<f32> {
        match self.shape {
            Shape::Circle { radius } => Some(radius),
            Shape::Segment { .. } => None,
        }
    }

    /// Velocity of a world-space point attached to this body
    #[inline]
    pub fn velocity_at_point(&self, point: Vec2) -> Vec2 {
        let r = point - self.position;
        self.velocity + self.angular_velocity * r.perp()
    }

    /// Apply an impulse at a world-space point
    pub fn apply_impulse_at_point(&mut self, impulse: Vec2, point: Vec2) {
        if self.kind == BodyKind::Dynamic {
            let r = point - self.position;
            self.velocity += impulse * self.inv_mass;
            self.angular_velocity += r.perp_dot(impulse) * self.inv_moment;
        }
    }

    /// True when every kinematic quantity is a finite number
    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.velocity.is_finite()
            && self.angle.is_finite()
            && self.angular_velocity.is_finite()
    }
}
