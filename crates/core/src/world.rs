//! Collision world: the spatial query, bounds and transform collaborators
//! the controllers are written against, and an in-memory implementation.
//!
//! Controllers never own geometry. They ask a [`SpatialQuery`] for the
//! nearest hit along a ray and move their own body through
//! [`BodyTransforms`]. [`World`] implements both over a flat list of
//! convex-polygon bodies, which is enough for tiles, slopes and moving
//! platforms.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::geometry::Aabb;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

bitflags::bitflags! {
    /// Collision layers. A query only sees bodies whose layers intersect its mask.
    #[repr(transparent)]
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Layers: u32 {
        const GROUND   = 1 << 0;
        const PLATFORM = 1 << 1;
        const PLAYER   = 1 << 2;
    }
}

bitflags::bitflags! {
    /// Per-surface behavior markers.
    #[repr(transparent)]
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct SurfaceTags: u8 {
        /// Blocks only bodies moving down onto it.
        const ONE_WAY    = 1 << 0;
        /// Walls a falling player may slide down and jump off.
        const WALL_SLIDE = 1 << 1;
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct QueryFilter {
    pub mask: Layers,
    /// Body to ignore, usually the platform currently carrying the caster.
    pub exclude: Option<EntityId>,
}

impl QueryFilter {
    pub fn new(mask: Layers) -> Self {
        Self { mask, exclude: None }
    }

    pub fn excluding(self, entity: Option<EntityId>) -> Self {
        Self { exclude: entity, ..self }
    }

    #[inline]
    fn admits(&self, body: &Body) -> bool {
        self.mask.intersects(body.layers) && self.exclude != Some(body.id)
    }
}

/// Nearest obstruction reported by a ray cast.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayHit {
    /// Distance from the ray origin. `0.0` means the origin was already inside the body.
    pub distance: f32,
    pub point: Vec2,
    pub normal: Vec2,
    pub entity: EntityId,
    pub tags: SurfaceTags,
}

pub trait SpatialQuery {
    /// Nearest hit along `direction` (unit length) within `max_distance`.
    fn cast_ray(&self, origin: Vec2, direction: Vec2, max_distance: f32, filter: &QueryFilter) -> Option<RayHit>;
}

pub trait BodyTransforms {
    /// Current world-space collider bounds.
    fn bounds(&self, entity: EntityId) -> Option<Aabb>;

    fn position(&self, entity: EntityId) -> Option<Vec2>;

    /// Relative move. Unknown entities are ignored.
    fn translate(&mut self, entity: EntityId, delta: Vec2);
}

/// Everything a controller needs from its surroundings in one bound.
pub trait PhysicsWorld: SpatialQuery + BodyTransforms {}

impl<T: SpatialQuery + BodyTransforms + ?Sized> PhysicsWorld for T {}

/// Which way a right-triangle slope rises.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlopeRise {
    /// Low on the left, high on the right.
    Right,
    /// High on the left, low on the right.
    Left,
}

/// Convex polygon in body-local space, counter-clockwise.
#[derive(Clone, Debug, PartialEq)]
pub struct Shape {
    points: Vec<Vec2>,
    local_bounds: Aabb,
}

impl Shape {
    /// Convex polygon from its vertices in either winding. Returns `None`
    /// for fewer than three points or zero area. Convexity is the caller's
    /// responsibility.
    pub fn polygon(mut points: Vec<Vec2>) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }
        let area2: f32 = points
            .iter()
            .zip(points.iter().cycle().skip(1))
            .map(|(a, b)| a.perp_dot(*b))
            .sum();
        if area2.abs() <= f32::EPSILON {
            return None;
        }
        if area2 < 0.0 {
            points.reverse();
        }
        let local_bounds = Aabb::from_points(&points);
        Some(Self { points, local_bounds })
    }

    /// Axis-aligned box with its bottom-left corner at the body origin.
    pub fn rect(size: Vec2) -> Self {
        let size = size.abs();
        let points = vec![
            Vec2::ZERO,
            Vec2::new(size.x, 0.0),
            size,
            Vec2::new(0.0, size.y),
        ];
        Self {
            local_bounds: Aabb::new(Vec2::ZERO, size),
            points,
        }
    }

    /// Right triangle with its bottom-left bounding corner at the body origin.
    pub fn slope(width: f32, height: f32, rise: SlopeRise) -> Self {
        let (w, h) = (width.abs(), height.abs());
        let points = match rise {
            SlopeRise::Right => vec![Vec2::ZERO, Vec2::new(w, 0.0), Vec2::new(w, h)],
            SlopeRise::Left => vec![Vec2::ZERO, Vec2::new(w, 0.0), Vec2::new(0.0, h)],
        };
        Self {
            local_bounds: Aabb::new(Vec2::ZERO, Vec2::new(w, h)),
            points,
        }
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    /// Ray against the polygon placed at `offset`. Returns `(distance, normal)`.
    ///
    /// Clips the ray against each edge's half-plane. An origin strictly
    /// inside the polygon reports distance `0.0` with the normal facing
    /// back along the ray.
    fn cast_ray(&self, offset: Vec2, origin: Vec2, direction: Vec2, max_distance: f32) -> Option<(f32, Vec2)> {
        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;
        let mut enter_normal = Vec2::ZERO;

        let n = self.points.len();
        for i in 0..n {
            let a = self.points[i] + offset;
            let b = self.points[(i + 1) % n] + offset;
            let edge = b - a;
            let normal = Vec2::new(edge.y, -edge.x).normalize_or_zero();

            let denom = normal.dot(direction);
            let dist = normal.dot(a - origin);
            if denom == 0.0 {
                if dist < 0.0 {
                    return None;
                }
                continue;
            }
            let t = dist / denom;
            if denom < 0.0 {
                if t > t_enter {
                    t_enter = t;
                    enter_normal = normal;
                }
            } else if t < t_exit {
                t_exit = t;
            }
            if t_enter > t_exit {
                return None;
            }
        }

        if t_exit < 0.0 || t_enter > max_distance {
            return None;
        }
        if t_enter >= 0.0 {
            return Some((t_enter, enter_normal));
        }
        // Origin behind every entering edge: inside, unless only grazing the boundary.
        if t_exit > 0.0 {
            Some((0.0, -direction))
        } else {
            None
        }
    }
}

#[derive(Clone, Debug)]
pub struct Body {
    pub id: EntityId,
    pub position: Vec2,
    pub shape: Shape,
    pub layers: Layers,
    pub tags: SurfaceTags,
}

impl Body {
    #[inline]
    pub fn bounds(&self) -> Aabb {
        self.shape.local_bounds.translated(self.position)
    }
}

/// Flat list of bodies. Ids are handed out sequentially and never reused.
#[derive(Clone, Debug, Default)]
pub struct World {
    bodies: Vec<Body>,
}

impl World {
    pub fn new() -> Self {
        Self { bodies: Vec::new() }
    }

    pub fn add_body(&mut self, position: Vec2, shape: Shape, layers: Layers, tags: SurfaceTags) -> EntityId {
        let id = EntityId(self.bodies.len() as u32);
        self.bodies.push(Body {
            id,
            position,
            shape,
            layers,
            tags,
        });
        id
    }

    /// Static solid box from its bottom-left corner and size.
    pub fn add_box(&mut self, min: Vec2, size: Vec2) -> EntityId {
        self.add_body(min, Shape::rect(size), Layers::GROUND, SurfaceTags::empty())
    }

    pub fn add_one_way(&mut self, min: Vec2, size: Vec2) -> EntityId {
        self.add_body(min, Shape::rect(size), Layers::GROUND, SurfaceTags::ONE_WAY)
    }

    pub fn add_slope(&mut self, min: Vec2, width: f32, height: f32, rise: SlopeRise) -> EntityId {
        self.add_body(min, Shape::slope(width, height, rise), Layers::GROUND, SurfaceTags::empty())
    }

    pub fn body(&self, id: EntityId) -> Option<&Body> {
        self.bodies.get(id.0 as usize)
    }

    pub fn body_mut(&mut self, id: EntityId) -> Option<&mut Body> {
        self.bodies.get_mut(id.0 as usize)
    }

    pub fn bodies(&self) -> impl Iterator<Item = &Body> {
        self.bodies.iter()
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

impl SpatialQuery for World {
    fn cast_ray(&self, origin: Vec2, direction: Vec2, max_distance: f32, filter: &QueryFilter) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        for body in self.bodies.iter().filter(|b| filter.admits(b)) {
            let Some((distance, normal)) = body.shape.cast_ray(body.position, origin, direction, max_distance) else {
                continue;
            };
            if best.map_or(true, |b| distance < b.distance) {
                best = Some(RayHit {
                    distance,
                    point: origin + direction * distance,
                    normal,
                    entity: body.id,
                    tags: body.tags,
                });
            }
        }
        best
    }
}

impl BodyTransforms for World {
    fn bounds(&self, entity: EntityId) -> Option<Aabb> {
        self.body(entity).map(Body::bounds)
    }

    fn position(&self, entity: EntityId) -> Option<Vec2> {
        self.body(entity).map(|b| b.position)
    }

    fn translate(&mut self, entity: EntityId, delta: Vec2) {
        if let Some(body) = self.body_mut(entity) {
            body.position += delta;
        }
    }
}
