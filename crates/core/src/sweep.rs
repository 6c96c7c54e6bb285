//! Parallel ray sweeps along one movement axis.

use glam::Vec2;

use crate::geometry::{Axis, RayGeometry, SKIN_WIDTH};
use crate::world::{QueryFilter, RayHit, SpatialQuery};

/// Origins of the parallel rays for one sweep, in ray-index order.
#[derive(Copy, Clone, Debug)]
pub struct RayFan<'a> {
    rays: &'a RayGeometry,
    axis: Axis,
    direction: f32,
    offset: f32,
    next: usize,
}

impl<'a> RayFan<'a> {
    pub fn new(rays: &'a RayGeometry, axis: Axis, direction: f32, offset: f32) -> Self {
        Self {
            rays,
            axis,
            direction,
            offset,
            next: 0,
        }
    }

    /// Unit direction every ray in the fan is cast along.
    pub fn ray_direction(&self) -> Vec2 {
        self.axis.unit(self.direction)
    }
}

impl Iterator for RayFan<'_> {
    type Item = (usize, Vec2);

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.rays.ray_count(self.axis) {
            return None;
        }
        let i = self.next;
        self.next += 1;
        Some((i, self.rays.origin(self.axis, self.direction, i, self.offset)))
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SweepRequest {
    pub axis: Axis,
    /// Intended signed displacement along `axis`.
    pub delta: f32,
    /// Cast direction (±1). Normally the sign of `delta`; set explicitly so a
    /// zero-length horizontal sweep can still probe the facing side.
    pub direction: f32,
    /// Perpendicular shift of every ray origin.
    pub offset: f32,
    /// Keep a ray length of at least `2 * SKIN_WIDTH` so surfaces already in
    /// contact are reported even when barely moving.
    pub probe_contact: bool,
    pub filter: QueryFilter,
}

impl SweepRequest {
    pub fn new(axis: Axis, delta: f32, filter: QueryFilter) -> Self {
        Self {
            axis,
            delta,
            direction: if delta < 0.0 { -1.0 } else { 1.0 },
            offset: 0.0,
            probe_contact: false,
            filter,
        }
    }

    pub fn with_direction(self, direction: f32) -> Self {
        Self { direction, ..self }
    }

    pub fn with_offset(self, offset: f32) -> Self {
        Self { offset, ..self }
    }

    pub fn probing_contact(self) -> Self {
        Self {
            probe_contact: true,
            ..self
        }
    }

    pub fn ray_length(&self) -> f32 {
        let magnitude = self.delta.abs();
        if self.probe_contact && magnitude < SKIN_WIDTH {
            SKIN_WIDTH * 2.0
        } else {
            magnitude + SKIN_WIDTH
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SweepOutcome {
    /// Displacement left after clamping to the nearest accepted hit.
    pub delta: f32,
    pub hit: Option<RayHit>,
    pub ray_index: Option<usize>,
}

/// Distance the body may travel toward a surface hit at `distance`.
#[inline]
pub fn travel_to(distance: f32) -> f32 {
    (distance - SKIN_WIDTH).max(0.0)
}

/// Cast the request's ray fan and clamp its displacement to the nearest
/// obstruction.
///
/// Hits at distance `0.0` (ray starting inside a body) are skipped so a body
/// can move out of an overlap. `accept` sees every other hit and may reject
/// it (one-way surfaces). Each accepted hit shortens the remaining rays to
/// its distance, so a later ray can only report something nearer.
pub fn sweep<Q, F>(query: &Q, rays: &RayGeometry, request: &SweepRequest, mut accept: F) -> SweepOutcome
where
    Q: SpatialQuery + ?Sized,
    F: FnMut(&RayHit) -> bool,
{
    let mut outcome = SweepOutcome {
        delta: request.delta,
        hit: None,
        ray_index: None,
    };
    if request.delta == 0.0 && !request.probe_contact {
        return outcome;
    }

    let fan = RayFan::new(rays, request.axis, request.direction, request.offset);
    let direction = fan.ray_direction();
    let mut ray_length = request.ray_length();

    for (i, origin) in fan {
        let Some(hit) = query.cast_ray(origin, direction, ray_length, &request.filter) else {
            continue;
        };
        if hit.distance == 0.0 || !accept(&hit) {
            continue;
        }
        outcome.delta = travel_to(hit.distance) * request.direction;
        outcome.hit = Some(hit);
        outcome.ray_index = Some(i);
        ray_length = hit.distance;
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Aabb, RayCounts};
    use crate::world::{Layers, World};

    fn approx_eq(a: f32, b: f32) {
        let eps = 1e-5;
        assert!((a - b).abs() <= eps, "expected {b}, got {a}");
    }

    fn unit_box_rays() -> RayGeometry {
        RayGeometry::new(Aabb::from_rect(0.0, 0.0, 1.0, 1.0), RayCounts::default())
    }

    fn solid() -> QueryFilter {
        QueryFilter::new(Layers::GROUND)
    }

    #[test]
    fn unobstructed_sweep_passes_through() {
        let world = World::new();
        let rays = unit_box_rays();
        for delta in [-3.0, -0.001, 0.25, 7.5] {
            let out = sweep(&world, &rays, &SweepRequest::new(Axis::Vertical, delta, solid()), |_| true);
            assert_eq!(out.delta, delta);
            assert!(out.hit.is_none());
        }
    }

    #[test]
    fn clamps_to_nearest_obstruction() {
        let mut world = World::new();
        world.add_box(Vec2::new(-5.0, -2.0), Vec2::new(10.0, 1.5));
        let rays = unit_box_rays();

        let out = sweep(&world, &rays, &SweepRequest::new(Axis::Vertical, -5.0, solid()), |_| true);
        // Ground top at -0.5, ray origins at +skin.
        approx_eq(out.delta, -0.5);
        assert!(out.hit.is_some());
    }

    #[test]
    fn zero_delta_skips_casting() {
        let mut world = World::new();
        world.add_box(Vec2::new(-5.0, -1.0), Vec2::new(10.0, 1.0));
        let rays = unit_box_rays();
        let mut calls = 0;
        let out = sweep(&world, &rays, &SweepRequest::new(Axis::Vertical, 0.0, solid()), |_| {
            calls += 1;
            true
        });
        assert_eq!(calls, 0);
        assert!(out.hit.is_none());
    }

    #[test]
    fn probe_reports_touching_wall() {
        let mut world = World::new();
        world.add_box(Vec2::new(1.0, -1.0), Vec2::new(1.0, 3.0));
        let rays = unit_box_rays();

        let request = SweepRequest::new(Axis::Horizontal, 0.0, solid())
            .with_direction(1.0)
            .probing_contact();
        approx_eq(request.ray_length(), 2.0 * SKIN_WIDTH);
        let out = sweep(&world, &rays, &request, |_| true);
        assert!(out.hit.is_some());
        approx_eq(out.delta, 0.0);
    }

    #[test]
    fn rejected_hits_do_not_clamp() {
        let mut world = World::new();
        world.add_box(Vec2::new(-5.0, -2.0), Vec2::new(10.0, 1.5));
        let rays = unit_box_rays();
        let out = sweep(&world, &rays, &SweepRequest::new(Axis::Vertical, -1.0, solid()), |_| false);
        assert_eq!(out.delta, -1.0);
    }

    #[test]
    fn overlapping_hit_is_ignored() {
        let mut world = World::new();
        // Box fully containing the left half of the ray origins.
        world.add_box(Vec2::new(-1.0, -1.0), Vec2::new(1.5, 3.0));
        let rays = unit_box_rays();
        let out = sweep(&world, &rays, &SweepRequest::new(Axis::Horizontal, -0.5, solid()), |_| true);
        assert_eq!(out.delta, -0.5);
    }
}
