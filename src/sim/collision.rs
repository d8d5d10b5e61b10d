//! Narrow-phase collision detection
//!
//! Pieces are circles and the container is built from capsule segments, so
//! the only pairs that matter are circle/circle and circle/segment.

use glam::Vec2;

use super::body::{Body, Shape};

/// Below this separation two centers are treated as coincident
const DEGENERATE_DIST: f32 = 1e-6;

/// Contact between two shapes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// World-space contact point
    pub point: Vec2,
    /// Unit normal pointing from the first shape toward the second
    pub normal: Vec2,
    /// Overlap depth (positive when penetrating)
    pub depth: f32,
}

impl Contact {
    /// Same contact seen from the other shape
    pub fn flipped(self) -> Self {
        Self {
            normal: -self.normal,
            ..self
        }
    }
}

/// Check overlap between two circles
pub fn circle_circle(pos_a: Vec2, radius_a: f32, pos_b: Vec2, radius_b: f32) -> Option<Contact> {
    let delta = pos_b - pos_a;
    let dist_sq = delta.length_squared();
    let reach = radius_a + radius_b;
    if dist_sq >= reach * reach {
        return None;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > DEGENERATE_DIST {
        delta / dist
    } else {
        // Stacked exactly on top of each other; pick a stable axis
        Vec2::Y
    };

    Some(Contact {
        point: pos_a + normal * radius_a,
        normal,
        depth: reach - dist,
    })
}

/// Closest point to `p` on the segment `a..b`
pub fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= DEGENERATE_DIST {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Check overlap between a circle and a world-space capsule segment.
///
/// The normal points from the circle toward the segment.
pub fn circle_segment(
    center: Vec2,
    radius: f32,
    seg_a: Vec2,
    seg_b: Vec2,
    seg_radius: f32,
) -> Option<Contact> {
    let closest = closest_point_on_segment(center, seg_a, seg_b);
    let delta = closest - center;
    let dist_sq = delta.length_squared();
    let reach = radius + seg_radius;
    if dist_sq >= reach * reach {
        return None;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > DEGENERATE_DIST {
        delta / dist
    } else {
        // Center sits on the segment spine; push along the segment's side normal
        (seg_b - seg_a).perp().normalize_or(Vec2::Y)
    };

    Some(Contact {
        point: center + normal * radius,
        normal,
        depth: reach - dist,
    })
}

/// Contact between two bodies, normal pointing from `a` toward `b`
pub fn body_contact(a: &Body, b: &Body) -> Option<Contact> {
    match (a.shape, b.shape) {
        (Shape::Circle { radius: ra }, Shape::Circle { radius: rb }) => {
            circle_circle(a.position, ra, b.position, rb)
        }
        (Shape::Circle { radius }, Shape::Segment { a: sa, b: sb, radius: sr }) => {
            circle_segment(a.position, radius, b.position + sa, b.position + sb, sr)
        }
        (Shape::Segment { a: sa, b: sb, radius: sr }, Shape::Circle { radius }) => {
            circle_segment(b.position, radius, a.position + sa, a.position + sb, sr)
                .map(Contact::flipped)
        }
        // Container pieces never touch each other
        (Shape::Segment { .. }, Shape::Segment { .. }) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_circle_overlap() {
        let c = circle_circle(Vec2::ZERO, 10.0, Vec2::new(15.0, 0.0), 10.0).unwrap();
        assert!((c.depth - 5.0).abs() < 1e-5);
        assert_eq!(c.normal, Vec2::X);
        assert_eq!(c.point, Vec2::new(10.0, 0.0));
    }

    #[test]
    fn test_circle_circle_separated() {
        assert!(circle_circle(Vec2::ZERO, 10.0, Vec2::new(25.0, 0.0), 10.0).is_none());
        // Exactly touching is not an overlap
        assert!(circle_circle(Vec2::ZERO, 10.0, Vec2::new(20.0, 0.0), 10.0).is_none());
    }

    #[test]
    fn test_coincident_circles_get_stable_normal() {
        let c = circle_circle(Vec2::ONE, 10.0, Vec2::ONE, 10.0).unwrap();
        assert_eq!(c.normal, Vec2::Y);
        assert!((c.depth - 20.0).abs() < 1e-5);
    }

    #[test]
    fn test_circle_resting_on_floor() {
        // Floor along y = 100, circle center just above it (y grows downward)
        let c = circle_segment(
            Vec2::new(50.0, 92.0),
            10.0,
            Vec2::new(0.0, 100.0),
            Vec2::new(200.0, 100.0),
            1.0,
        )
        .unwrap();
        assert!((c.normal - Vec2::Y).length() < 1e-5);
        assert!((c.depth - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_circle_near_segment_end() {
        let closest = closest_point_on_segment(
            Vec2::new(-5.0, 3.0),
            Vec2::ZERO,
            Vec2::new(10.0, 0.0),
        );
        assert_eq!(closest, Vec2::ZERO);
    }
}
