//! Slope handling for the collision resolver.
//!
//! Climbing and descending redistribute the horizontal travel of a move so
//! the body follows the surface: `|dx|` becomes `d·cos θ` and `d·sin θ` is
//! added to (climb) or subtracted from (descend) the vertical travel. The
//! straight-line distance along the surface stays `d`.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::contact::ContactState;
use crate::geometry::{Axis, RayGeometry, SKIN_WIDTH};
use crate::math::{direction_of, surface_angle};
use crate::sweep::travel_to;
use crate::world::{QueryFilter, RayHit, SpatialQuery};

/// Steepest surfaces (degrees from up) a body walks up or down.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlopeLimits {
    pub max_slope_angle: f32,
    pub max_descend_angle: f32,
}

impl Default for SlopeLimits {
    fn default() -> Self {
        Self {
            max_slope_angle: 38.0,
            max_descend_angle: 38.0,
        }
    }
}

/// Redistribute horizontal travel up a slope of `angle` degrees.
///
/// Skipped when the move already rises faster than the climb would (a
/// jump started on the slope keeps its vertical speed).
pub fn climb(delta: &mut Vec2, contact: &mut ContactState, angle: f32, normal: Vec2) {
    let distance = delta.x.abs();
    let rad = angle.to_radians();
    let climb_y = rad.sin() * distance;

    if delta.y <= climb_y {
        delta.y = climb_y;
        delta.x = rad.cos() * distance * delta.x.signum();
        contact.below = true;
        contact.climbing_slope = true;
        contact.slope_angle = angle;
        contact.slope_normal = normal;
    }
}

/// Climb in response to the lowest horizontal ray hitting a walkable slope.
///
/// Switching from a descent restores the unadjusted move first. When the
/// slope is new, the flat run up to its foot is taken out before the climb
/// and put back after, so only the part on the slope is redistributed.
pub fn begin_climb(delta: &mut Vec2, contact: &mut ContactState, hit: &RayHit, angle: f32, direction_x: f32) {
    if contact.descending_slope {
        contact.descending_slope = false;
        *delta = contact.move_amount_old;
    }

    let mut to_slope_start = 0.0;
    if angle != contact.slope_angle_old {
        to_slope_start = travel_to(hit.distance);
        delta.x -= to_slope_start * direction_x;
    }
    climb(delta, contact, angle, hit.normal);
    delta.x += to_slope_start * direction_x;
}

/// Downward pre-pass run before the axis sweeps whenever the move goes down.
///
/// Two short rays under the bottom corners first look for a slope steeper
/// than the climb limit with only one corner supported; if found the body
/// slides off it. Otherwise one unbounded ray under the trailing corner
/// looks for a walkable slope falling away in the direction of travel.
pub fn descend<Q>(query: &Q, rays: &RayGeometry, filter: &QueryFilter, limits: &SlopeLimits, delta: &mut Vec2, contact: &mut ContactState)
where
    Q: SpatialQuery + ?Sized,
{
    let probe = delta.y.abs() + SKIN_WIDTH;
    let hit_left = query.cast_ray(rays.anchors.bottom_left, Vec2::NEG_Y, probe, filter);
    let hit_right = query.cast_ray(rays.anchors.bottom_right, Vec2::NEG_Y, probe, filter);
    if hit_left.is_some() != hit_right.is_some() {
        for hit in hit_left.iter().chain(hit_right.iter()) {
            slide_down_max_slope(hit, limits, delta, contact);
        }
    }
    if contact.sliding_down_slope {
        return;
    }

    let direction_x = direction_of(delta.x);
    let origin = if direction_x < 0.0 { rays.anchors.bottom_right } else { rays.anchors.bottom_left };
    let Some(hit) = query.cast_ray(origin, Vec2::NEG_Y, f32::INFINITY, filter) else {
        return;
    };

    let angle = surface_angle(hit.normal);
    if angle == 0.0 || angle > limits.max_descend_angle {
        return;
    }
    if direction_of(hit.normal.x) != direction_x {
        return;
    }
    let rad = angle.to_radians();
    if hit.distance - SKIN_WIDTH > rad.tan() * delta.x.abs() {
        return;
    }

    let distance = delta.x.abs();
    delta.x = rad.cos() * distance * delta.x.signum();
    delta.y -= rad.sin() * distance;

    contact.slope_angle = angle;
    contact.descending_slope = true;
    contact.below = true;
    contact.slope_normal = hit.normal;
}

/// Push the body sideways off a slope too steep to stand on.
fn slide_down_max_slope(hit: &RayHit, limits: &SlopeLimits, delta: &mut Vec2, contact: &mut ContactState) {
    let angle = surface_angle(hit.normal);
    if angle <= limits.max_slope_angle {
        return;
    }
    delta.x = (delta.y - hit.distance).abs() / angle.to_radians().tan() * hit.normal.x;

    contact.slope_angle = angle;
    contact.sliding_down_slope = true;
    contact.slope_normal = hit.normal;
}

/// After the vertical sweep of a climbing move, look ahead at the new height
/// for a slope of a different grade and stop at its foot.
pub fn transition<Q>(query: &Q, rays: &RayGeometry, filter: &QueryFilter, delta: &mut Vec2, contact: &mut ContactState)
where
    Q: SpatialQuery + ?Sized,
{
    if !contact.climbing_slope {
        return;
    }
    let direction_x = direction_of(delta.x);
    let ray_length = delta.x.abs() + SKIN_WIDTH;
    let origin = rays.origin(Axis::Horizontal, direction_x, 0, delta.y);

    let Some(hit) = query.cast_ray(origin, Vec2::new(direction_x, 0.0), ray_length, filter) else {
        return;
    };
    let angle = surface_angle(hit.normal);
    if angle != contact.slope_angle {
        delta.x = travel_to(hit.distance) * direction_x;
        contact.slope_angle = angle;
        contact.slope_normal = hit.normal;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Aabb, RayCounts};
    use crate::world::{Layers, SlopeRise, World};

    fn approx_eq(a: f32, b: f32) {
        let eps = 1e-4;
        assert!((a - b).abs() <= eps, "expected {b}, got {a}");
    }

    fn normal_for(angle: f32, facing: f32) -> Vec2 {
        let rad = angle.to_radians();
        Vec2::new(facing * rad.sin(), rad.cos())
    }

    #[test]
    fn climb_preserves_travel_distance() {
        for angle in [1.0_f32, 10.0, 22.5, 30.0, 38.0] {
            for dx in [0.1_f32, -0.37, 2.0] {
                let mut delta = Vec2::new(dx, -0.05);
                let mut contact = ContactState::default();
                climb(&mut delta, &mut contact, angle, normal_for(angle, -dx.signum()));

                approx_eq(delta.length(), dx.abs());
                assert_eq!(delta.x.signum(), dx.signum());
                assert!(delta.y > 0.0);
                assert!(contact.climbing_slope && contact.below);
                assert_eq!(contact.slope_angle, angle);
            }
        }
    }

    #[test]
    fn climb_keeps_stronger_jump() {
        let mut delta = Vec2::new(0.1, 0.5);
        let mut contact = ContactState::default();
        climb(&mut delta, &mut contact, 30.0, normal_for(30.0, -1.0));
        assert_eq!(delta, Vec2::new(0.1, 0.5));
        assert!(!contact.climbing_slope);
    }

    fn on_descending_ramp() -> (World, RayGeometry) {
        // 30° ramp falling away to the right, starting at x = 0, top at y = 0.
        let mut world = World::new();
        let run = 4.0;
        let rise = run * 30.0_f32.to_radians().tan();
        world.add_slope(Vec2::new(0.0, -rise), run, rise, SlopeRise::Left);
        // Body whose trailing (left) corner sits just on the ramp surface.
        let collider = Aabb::from_rect(0.5, -0.5 * 30.0_f32.to_radians().tan() + 0.001, 1.0, 1.0);
        (world, RayGeometry::new(collider, RayCounts::default()))
    }

    #[test]
    fn descend_preserves_travel_distance() {
        let (world, rays) = on_descending_ramp();
        let filter = QueryFilter::new(Layers::GROUND);
        let mut delta = Vec2::new(0.2, -0.01);
        let mut contact = ContactState::default();

        descend(&world, &rays, &filter, &SlopeLimits::default(), &mut delta, &mut contact);

        assert!(contact.descending_slope);
        approx_eq(contact.slope_angle, 30.0);
        let slope_part = Vec2::new(delta.x, delta.y + 0.01);
        approx_eq(slope_part.length(), 0.2);
    }

    #[test]
    fn descend_ignores_slope_facing_away() {
        let (world, rays) = on_descending_ramp();
        let filter = QueryFilter::new(Layers::GROUND);
        let mut delta = Vec2::new(-0.2, -0.01);
        let mut contact = ContactState::default();

        descend(&world, &rays, &filter, &SlopeLimits::default(), &mut delta, &mut contact);
        assert!(!contact.descending_slope);
        assert_eq!(delta, Vec2::new(-0.2, -0.01));
    }

    #[test]
    fn flat_ground_never_descends() {
        let mut world = World::new();
        world.add_box(Vec2::new(-5.0, -1.0), Vec2::new(10.0, 1.0));
        let rays = RayGeometry::new(Aabb::from_rect(0.0, 0.0, 1.0, 1.0), RayCounts::default());
        let mut delta = Vec2::new(0.3, -0.1);
        let mut contact = ContactState::default();
        descend(&world, &rays, &QueryFilter::new(Layers::GROUND), &SlopeLimits::default(), &mut delta, &mut contact);
        assert!(!contact.descending_slope && !contact.sliding_down_slope);
        assert_eq!(delta, Vec2::new(0.3, -0.1));
    }

    #[test]
    fn steep_edge_slides_body_off() {
        // 60° face falling away to the right; only the left corner is over it.
        let mut world = World::new();
        world.add_slope(Vec2::new(0.0, -2.0), 2.0 / 60.0_f32.to_radians().tan(), 2.0, SlopeRise::Left);
        let top_at = |x: f32| -x * 60.0_f32.to_radians().tan();
        let collider = Aabb::from_rect(0.3, top_at(0.3 + SKIN_WIDTH) + 0.01, 1.5, 1.0);
        let rays = RayGeometry::new(collider, RayCounts::default());

        let mut delta = Vec2::new(0.0, -0.5);
        let mut contact = ContactState::default();
        descend(&world, &rays, &QueryFilter::new(Layers::GROUND), &SlopeLimits::default(), &mut delta, &mut contact);

        assert!(contact.sliding_down_slope);
        approx_eq(contact.slope_angle, 60.0);
        // Left corner is 0.025 above the face: run = (0.5 + 0.025) / tan 60°, scaled by n.x.
        let rad = 60.0_f32.to_radians();
        approx_eq(delta.x, 0.525 / rad.tan() * rad.sin());
        assert_eq!(delta.y, -0.5);
    }
}
