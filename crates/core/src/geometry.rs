//! Collider bounds and the ray origins derived from them.
//!
//! World space is y-up. Every sweep starts by rebuilding a [`RayGeometry`]
//! from the collider's current bounds, since the body may have moved since
//! the last tick.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Inward margin between a collider's bounds and its ray origins.
pub const SKIN_WIDTH: f32 = 0.015;

/// Minimum rays per axis. One ray would leave the spacing undefined.
pub const MIN_RAY_COUNT: usize = 2;

#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub const fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Box from its bottom-left corner and size.
    pub fn from_rect(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self::new(Vec2::new(x, y), Vec2::new(x + w, y + h))
    }

    pub fn from_points(points: &[Vec2]) -> Self {
        let mut min = Vec2::splat(f32::INFINITY);
        let mut max = Vec2::splat(f32::NEG_INFINITY);
        for p in points {
            min = min.min(*p);
            max = max.max(*p);
        }
        if points.is_empty() {
            return Self::default();
        }
        Self { min, max }
    }

    #[inline]
    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    #[inline]
    pub fn translated(&self, delta: Vec2) -> Self {
        Self::new(self.min + delta, self.max + delta)
    }

    /// Shrink by `margin` on every side. A box thinner than `2 * margin`
    /// collapses onto its center line instead of inverting.
    pub fn shrink(&self, margin: f32) -> Self {
        let center = self.center();
        let min = (self.min + Vec2::splat(margin)).min(center);
        let max = (self.max - Vec2::splat(margin)).max(center);
        Self::new(min, max)
    }
}

/// Configured number of parallel rays per sweep axis.
///
/// `horizontal` rays are stacked vertically along the side edges and cast
/// along x; `vertical` rays are spread along the top/bottom edges.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RayCounts {
    pub horizontal: usize,
    pub vertical: usize,
}

impl RayCounts {
    /// Counts below [`MIN_RAY_COUNT`] (including zero and negatives) are raised to it.
    pub fn new(horizontal: i32, vertical: i32) -> Self {
        let clamp = |n: i32| (n.max(0) as usize).max(MIN_RAY_COUNT);
        Self {
            horizontal: clamp(horizontal),
            vertical: clamp(vertical),
        }
    }
}

impl Default for RayCounts {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RayAnchors {
    pub bottom_left: Vec2,
    pub bottom_right: Vec2,
    pub top_left: Vec2,
    pub top_right: Vec2,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    /// Unit vector along this axis, pointing toward `direction` (±1).
    #[inline]
    pub fn unit(self, direction: f32) -> Vec2 {
        match self {
            Axis::Horizontal => Vec2::new(direction, 0.0),
            Axis::Vertical => Vec2::new(0.0, direction),
        }
    }
}

/// Skin-shrunk bounds, corner anchors and per-axis ray spacing, all
/// computed from the same collider bounds.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayGeometry {
    pub bounds: Aabb,
    pub anchors: RayAnchors,
    pub counts: RayCounts,
    pub horizontal_spacing: f32,
    pub vertical_spacing: f32,
}

impl RayGeometry {
    pub fn new(collider: Aabb, counts: RayCounts) -> Self {
        let counts = RayCounts {
            horizontal: counts.horizontal.max(MIN_RAY_COUNT),
            vertical: counts.vertical.max(MIN_RAY_COUNT),
        };
        let bounds = collider.shrink(SKIN_WIDTH);
        let size = bounds.size();

        Self {
            bounds,
            anchors: RayAnchors {
                bottom_left: bounds.min,
                bottom_right: Vec2::new(bounds.max.x, bounds.min.y),
                top_left: Vec2::new(bounds.min.x, bounds.max.y),
                top_right: bounds.max,
            },
            counts,
            horizontal_spacing: size.y / (counts.horizontal - 1) as f32,
            vertical_spacing: size.x / (counts.vertical - 1) as f32,
        }
    }

    #[inline]
    pub fn ray_count(&self, axis: Axis) -> usize {
        match axis {
            Axis::Horizontal => self.counts.horizontal,
            Axis::Vertical => self.counts.vertical,
        }
    }

    /// Origin of ray `index` for a sweep along `axis` toward `direction`.
    ///
    /// Horizontal rays start on the leading side edge, bottom first.
    /// Vertical rays start on the leading top/bottom edge, left first, and
    /// are shifted along x by `offset` (the horizontal motion already
    /// resolved this tick).
    pub fn origin(&self, axis: Axis, direction: f32, index: usize, offset: f32) -> Vec2 {
        let a = &self.anchors;
        match axis {
            Axis::Horizontal => {
                let base = if direction < 0.0 { a.bottom_left } else { a.bottom_right };
                base + Vec2::new(0.0, self.horizontal_spacing * index as f32 + offset)
            }
            Axis::Vertical => {
                let base = if direction < 0.0 { a.bottom_left } else { a.top_left };
                base + Vec2::new(self.vertical_spacing * index as f32 + offset, 0.0)
            }
        }
    }
}
