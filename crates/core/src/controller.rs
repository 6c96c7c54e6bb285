//! Raycast collision resolver for a single moving body.
//!
//! [`MovementController::move_by`] takes the displacement a body wants this
//! tick, clamps it against the world with horizontal and vertical ray
//! sweeps (following slopes and honoring one-way surfaces on the way), and
//! applies what is left to the body's transform.

use glam::Vec2;

use crate::config::ControllerParams;
use crate::contact::ContactState;
use crate::geometry::{Axis, RayGeometry};
use crate::math::{sign, surface_angle};
use crate::schedule::Scheduler;
use crate::slope;
use crate::sweep::{sweep, travel_to, RayFan, SweepRequest};
use crate::world::{EntityId, PhysicsWorld, QueryFilter, SpatialQuery, SurfaceTags};

/// Deferred state changes owned by a controller.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ControllerEvent {
    ResetFallingThroughPlatform,
}

#[derive(Clone, Debug)]
pub struct MovementController {
    entity: EntityId,
    params: ControllerParams,
    contact: ContactState,
    /// Directional input of the current move, consulted for one-way drops.
    input: Vec2,
    now: f64,
    events: Scheduler<ControllerEvent>,
}

impl MovementController {
    pub fn new(entity: EntityId, params: ControllerParams) -> Self {
        Self {
            entity,
            params,
            contact: ContactState::default(),
            input: Vec2::ZERO,
            now: 0.0,
            events: Scheduler::new(),
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn params(&self) -> &ControllerParams {
        &self.params
    }

    /// Snapshot for animation/audio hooks.
    pub fn contact_state(&self) -> ContactState {
        self.contact
    }

    pub fn contact(&self) -> &ContactState {
        &self.contact
    }

    pub fn input(&self) -> Vec2 {
        self.input
    }

    pub fn set_face_direction(&mut self, direction: i8) {
        self.contact.face_direction = if direction < 0 { -1 } else { 1 };
    }

    /// Advance the controller clock and fire any deferred events now due.
    /// Called once per tick before any move.
    pub fn begin_tick(&mut self, now: f64) {
        self.now = now;
        for event in self.events.drain_due(now) {
            match event {
                ControllerEvent::ResetFallingThroughPlatform => {
                    self.contact.falling_through_platform = false;
                    log::debug!("{:?}: one-way surfaces solid again", self.entity);
                }
            }
        }
    }

    /// Move by `delta` (already scaled by dt) with collision handling.
    ///
    /// `input` is the directional input of this tick; holding down past the
    /// configured threshold drops through one-way surfaces. `on_platform`
    /// forces `below` afterwards so a body carried by a platform can still
    /// jump. Returns the displacement actually applied.
    pub fn move_by<W>(&mut self, world: &mut W, delta: Vec2, input: Vec2, on_platform: bool) -> Vec2
    where
        W: PhysicsWorld + ?Sized,
    {
        self.resolve(world, delta, input, on_platform, None)
    }

    /// Move on behalf of `carrier`, ignoring its collider for this move.
    ///
    /// The carrier may not have reached its new position yet, so its
    /// collider must not stop the rider it is pushing.
    pub fn move_carried<W>(&mut self, world: &mut W, delta: Vec2, carrier: EntityId, on_platform: bool) -> Vec2
    where
        W: PhysicsWorld + ?Sized,
    {
        self.resolve(world, delta, Vec2::ZERO, on_platform, Some(carrier))
    }

    fn resolve<W>(&mut self, world: &mut W, mut delta: Vec2, input: Vec2, on_platform: bool, ignore: Option<EntityId>) -> Vec2
    where
        W: PhysicsWorld + ?Sized,
    {
        let Some(bounds) = world.bounds(self.entity) else {
            log::warn!("{:?}: body missing from world, move skipped", self.entity);
            return Vec2::ZERO;
        };
        let rays = RayGeometry::new(bounds, self.params.ray_counts());
        let filter = QueryFilter::new(self.params.collision_mask).excluding(ignore);

        self.contact.reset();
        self.contact.move_amount_old = delta;
        self.input = input;

        if delta.y < 0.0 {
            slope::descend(&*world, &rays, &filter, &self.params.slopes, &mut delta, &mut self.contact);
        }

        // After descend: a slide off a steep face may reverse the move.
        if delta.x != 0.0 {
            self.contact.face_direction = sign(delta.x) as i8;
        }

        self.horizontal_collisions(&*world, &rays, &filter, &mut delta);
        if delta.y != 0.0 {
            self.vertical_collisions(&*world, &rays, &filter, &mut delta);
        }

        world.translate(self.entity, delta);

        if on_platform {
            self.contact.below = true;
        }
        delta
    }

    /// Sweep along the facing direction. Always casts, even for a zero move,
    /// so walls already in contact keep reporting for wall slides.
    fn horizontal_collisions<Q>(&mut self, world: &Q, rays: &RayGeometry, filter: &QueryFilter, delta: &mut Vec2)
    where
        Q: SpatialQuery + ?Sized,
    {
        let direction_x = self.contact.face_direction as f32;
        let max_slope = self.params.slopes.max_slope_angle;
        let mut ray_length = SweepRequest::new(Axis::Horizontal, delta.x, *filter)
            .probing_contact()
            .ray_length();

        let fan = RayFan::new(rays, Axis::Horizontal, direction_x, 0.0);
        let ray_direction = fan.ray_direction();
        for (i, origin) in fan {
            let Some(hit) = world.cast_ray(origin, ray_direction, ray_length, filter) else {
                continue;
            };
            if hit.distance == 0.0 {
                continue;
            }

            let angle = surface_angle(hit.normal);
            if i == 0 && angle <= max_slope {
                slope::begin_climb(delta, &mut self.contact, &hit, angle, direction_x);
            }

            if !self.contact.climbing_slope || angle > max_slope {
                delta.x = travel_to(hit.distance) * direction_x;
                ray_length = hit.distance;

                // Wall met mid-climb: only rise as far as the shortened run allows.
                if self.contact.climbing_slope {
                    delta.y = self.contact.slope_angle.to_radians().tan() * delta.x.abs();
                }

                self.contact.left = direction_x < 0.0;
                self.contact.right = direction_x > 0.0;
                if hit.tags.contains(SurfaceTags::WALL_SLIDE) {
                    self.contact.can_wall_slide = true;
                }
            }
        }
    }

    fn vertical_collisions<Q>(&mut self, world: &Q, rays: &RayGeometry, filter: &QueryFilter, delta: &mut Vec2)
    where
        Q: SpatialQuery + ?Sized,
    {
        let direction_y = if delta.y < 0.0 { -1.0 } else { 1.0 };
        let request = SweepRequest::new(Axis::Vertical, delta.y, *filter).with_offset(delta.x);

        let entity = self.entity;
        let now = self.now;
        let input = self.input;
        let params = &self.params;
        let contact = &mut self.contact;
        let events = &mut self.events;

        let outcome = sweep(world, rays, &request, |hit| {
            if !hit.tags.contains(SurfaceTags::ONE_WAY) {
                return true;
            }
            if direction_y > 0.0 || contact.falling_through_platform {
                return false;
            }
            if input.y < params.fall_through_input {
                contact.falling_through_platform = true;
                events.schedule(now + params.fall_through_delay as f64, ControllerEvent::ResetFallingThroughPlatform);
                log::debug!("{:?}: dropping through one-way {:?}", entity, hit.entity);
                return false;
            }
            true
        });

        if outcome.hit.is_some() {
            delta.y = outcome.delta;

            // Ceiling met mid-climb: only run as far as the lowered rise allows.
            if contact.climbing_slope && contact.slope_angle > 0.0 {
                delta.x = delta.y / contact.slope_angle.to_radians().tan() * sign(delta.x);
            }

            contact.below = direction_y < 0.0;
            contact.above = direction_y > 0.0;
        }

        slope::transition(world, rays, filter, delta, contact);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SKIN_WIDTH;
    use crate::world::{BodyTransforms, Layers, Shape, SlopeRise, World};

    fn approx_eq(a: f32, b: f32) {
        let eps = 1e-4;
        assert!((a - b).abs() <= eps, "expected {b}, got {a}");
    }

    fn spawn(world: &mut World, min: Vec2) -> MovementController {
        let id = world.add_body(min, Shape::rect(Vec2::new(1.0, 2.0)), Layers::PLAYER, SurfaceTags::empty());
        MovementController::new(id, ControllerParams::default())
    }

    #[test]
    fn lands_on_ground_below() {
        let mut world = World::new();
        world.add_box(Vec2::new(-10.0, -1.0), Vec2::new(20.0, 1.0));
        // Ray origins sit 0.5 above the ground.
        let mut c = spawn(&mut world, Vec2::new(0.0, 0.5 - SKIN_WIDTH));

        let applied = c.move_by(&mut world, Vec2::new(0.0, -5.0), Vec2::ZERO, false);

        approx_eq(applied.y, -(0.5 - SKIN_WIDTH));
        let state = c.contact_state();
        assert!(state.below);
        assert!(!state.above);
        assert_eq!(state.slope_angle, 0.0);
        approx_eq(world.bounds(c.entity()).unwrap().min.y, 0.0);
    }

    #[test]
    fn free_fall_is_unchanged() {
        let mut world = World::new();
        let mut c = spawn(&mut world, Vec2::ZERO);
        let delta = Vec2::new(0.3, -0.7);
        assert_eq!(c.move_by(&mut world, delta, Vec2::ZERO, false), delta);
        assert!(!c.contact().below);
    }

    #[test]
    fn wall_stops_horizontal_move_and_sets_side() {
        let mut world = World::new();
        world.add_body(
            Vec2::new(2.0, -5.0),
            Shape::rect(Vec2::new(1.0, 10.0)),
            Layers::GROUND,
            SurfaceTags::WALL_SLIDE,
        );
        let mut c = spawn(&mut world, Vec2::ZERO);

        let applied = c.move_by(&mut world, Vec2::new(3.0, 0.0), Vec2::ZERO, false);
        approx_eq(applied.x, 1.0);
        assert!(c.contact().right && !c.contact().left);
        assert!(c.contact().can_wall_slide);

        // Standing still against the wall still reports contact.
        c.move_by(&mut world, Vec2::ZERO, Vec2::ZERO, false);
        assert!(c.contact().right);
        assert!(c.contact().can_wall_slide);
        assert_eq!(c.contact().face_direction, 1);
    }

    #[test]
    fn face_direction_follows_last_horizontal_move() {
        let mut world = World::new();
        let mut c = spawn(&mut world, Vec2::ZERO);
        c.move_by(&mut world, Vec2::new(-0.1, 0.0), Vec2::ZERO, false);
        assert_eq!(c.contact().face_direction, -1);
        c.move_by(&mut world, Vec2::new(0.0, -0.1), Vec2::ZERO, false);
        assert_eq!(c.contact().face_direction, -1);
    }

    #[test]
    fn ceiling_stops_upward_move() {
        let mut world = World::new();
        world.add_box(Vec2::new(-5.0, 3.0), Vec2::new(10.0, 1.0));
        let mut c = spawn(&mut world, Vec2::ZERO);
        let applied = c.move_by(&mut world, Vec2::new(0.0, 4.0), Vec2::ZERO, false);
        approx_eq(applied.y, 1.0);
        assert!(c.contact().above);
    }

    #[test]
    fn one_way_passes_upward_and_catches_downward() {
        let mut world = World::new();
        world.add_one_way(Vec2::new(-5.0, 2.5), Vec2::new(10.0, 0.5));
        let mut c = spawn(&mut world, Vec2::ZERO);

        let up = c.move_by(&mut world, Vec2::new(0.0, 2.0), Vec2::ZERO, false);
        assert_eq!(up.y, 2.0);
        assert!(!c.contact().above);

        // Now straddling the surface; climb clear of it, then fall onto it.
        c.move_by(&mut world, Vec2::new(0.0, 1.5), Vec2::ZERO, false);
        let down = c.move_by(&mut world, Vec2::new(0.0, -2.0), Vec2::ZERO, false);
        approx_eq(down.y, -0.5);
        assert!(c.contact().below);
    }

    #[test]
    fn holding_down_drops_through_until_reset() {
        let mut world = World::new();
        world.add_one_way(Vec2::new(-5.0, -0.5), Vec2::new(10.0, 0.5));
        let mut c = spawn(&mut world, Vec2::ZERO);
        c.begin_tick(1.0);

        let down = Vec2::new(0.0, -1.0);
        c.move_by(&mut world, Vec2::new(0.0, -0.1), down, false);
        assert!(c.contact().falling_through_platform);
        assert!(!c.contact().below);

        c.begin_tick(1.39);
        assert!(c.contact().falling_through_platform);
        c.begin_tick(1.4);
        assert!(!c.contact().falling_through_platform);
    }

    #[test]
    fn climbs_slope_preserving_distance() {
        let mut world = World::new();
        world.add_box(Vec2::new(-10.0, -1.0), Vec2::new(30.0, 1.0));
        world.add_slope(Vec2::new(2.0, 0.0), 4.0, 4.0 * 30.0_f32.to_radians().tan(), SlopeRise::Right);
        // Bottom-right corner exactly at the slope foot.
        let mut c = spawn(&mut world, Vec2::new(1.0, 0.0));
        c.move_by(&mut world, Vec2::new(0.1, -0.01), Vec2::ZERO, false);
        assert!(c.contact().climbing_slope || c.contact().below);

        // Second step is entirely on the slope (same angle as last tick).
        let applied = c.move_by(&mut world, Vec2::new(0.2, -0.01), Vec2::ZERO, false);
        assert!(c.contact().climbing_slope);
        approx_eq(c.contact().slope_angle, 30.0);
        approx_eq(applied.length(), 0.2);
    }

    #[test]
    fn steep_face_is_a_wall() {
        let mut world = World::new();
        world.add_box(Vec2::new(-10.0, -1.0), Vec2::new(30.0, 1.0));
        world.add_slope(Vec2::new(2.0, 0.0), 1.0, 3.0, SlopeRise::Right);
        let mut c = spawn(&mut world, Vec2::new(0.5, 0.0));
        let applied = c.move_by(&mut world, Vec2::new(1.0, 0.0), Vec2::ZERO, false);
        // Lowest ray meets the face a third of a skin past its foot.
        approx_eq(applied.x, 0.5 + SKIN_WIDTH / 3.0);
        assert!(c.contact().right);
        assert!(!c.contact().climbing_slope);
    }

    #[test]
    fn slides_off_steep_face_while_pushing_into_it() {
        // 60° face falling away to the right; only the left corner is over it.
        let mut world = World::new();
        let rad = 60.0_f32.to_radians();
        world.add_slope(Vec2::new(0.0, -2.0), 2.0 / rad.tan(), 2.0, SlopeRise::Left);
        let top_at = |x: f32| -x * rad.tan();
        let mut c = spawn(&mut world, Vec2::new(0.3, top_at(0.3 + SKIN_WIDTH) + 0.01));

        let applied = c.move_by(&mut world, Vec2::new(-0.05, -0.5), Vec2::new(-1.0, 0.0), false);

        assert!(c.contact().sliding_down_slope);
        assert_eq!(c.contact().face_direction, 1);
        approx_eq(applied.x, 0.525 / rad.tan() * rad.sin());
        assert!(applied.y < -0.4);
        assert!(c.contact().below);
    }

    /// 30° ramp rising right from x = 2, with the body's bottom-right ray
    /// origin one skin above its surface.
    fn on_thirty_degree_ramp(world: &mut World) -> (MovementController, f32) {
        let tan = 30.0_f32.to_radians().tan();
        world.add_slope(Vec2::new(2.0, 0.0), 4.0, 4.0 * tan, SlopeRise::Right);
        let y0 = (3.0 + 1.0 - SKIN_WIDTH - 2.0) * tan;
        (spawn(world, Vec2::new(3.0, y0)), y0)
    }

    #[test]
    fn wall_met_while_climbing_limits_rise_to_run() {
        let mut world = World::new();
        let (mut c, _) = on_thirty_degree_ramp(&mut world);
        world.add_box(Vec2::new(4.5, 0.0), Vec2::new(1.0, 10.0));

        let applied = c.move_by(&mut world, Vec2::new(1.0, -0.01), Vec2::ZERO, false);

        approx_eq(applied.x, 0.5);
        approx_eq(applied.y, 30.0_f32.to_radians().tan() * applied.x);
        assert!(c.contact().right);
        assert!(c.contact().climbing_slope);
    }

    #[test]
    fn ceiling_met_while_climbing_limits_run_to_rise() {
        let mut world = World::new();
        let (mut c, y0) = on_thirty_degree_ramp(&mut world);
        world.add_box(Vec2::new(-10.0, y0 + 2.1), Vec2::new(30.0, 1.0));

        let applied = c.move_by(&mut world, Vec2::new(1.0, -0.01), Vec2::ZERO, false);

        approx_eq(applied.y, 0.1);
        approx_eq(applied.x, 0.1 / 30.0_f32.to_radians().tan());
        assert!(c.contact().above);
        assert!(c.contact().climbing_slope);
    }

    #[test]
    fn steeper_slope_ahead_stops_climb_at_its_foot() {
        let mut world = World::new();
        let (tan20, tan35) = (20.0_f32.to_radians().tan(), 35.0_f32.to_radians().tan());
        let h1 = 4.0 * tan20;
        world.add_slope(Vec2::new(2.0, 0.0), 4.0, h1, SlopeRise::Right);
        let steeper = Shape::polygon(vec![
            Vec2::new(6.0, 0.0),
            Vec2::new(9.0, 0.0),
            Vec2::new(9.0, h1 + 3.0 * tan35),
            Vec2::new(6.0, h1),
        ])
        .unwrap();
        world.add_body(Vec2::ZERO, steeper, Layers::GROUND, SurfaceTags::empty());
        // Right ray column at x = 5.9, one skin above the 20° ramp.
        let y0 = (5.9 - 2.0) * tan20;
        let mut c = spawn(&mut world, Vec2::new(4.9 + SKIN_WIDTH, y0));

        let applied = c.move_by(&mut world, Vec2::new(0.3, -0.01), Vec2::ZERO, false);

        assert!(c.contact().climbing_slope);
        approx_eq(c.contact().slope_angle, 35.0);
        // The look-ahead ray at the climbed height meets the 35° face.
        let origin_y = y0 + SKIN_WIDTH + applied.y;
        let hit_x = 6.0 + (origin_y - h1) / tan35;
        approx_eq(applied.x, hit_x - 5.9 - SKIN_WIDTH);
        assert!(applied.x < 0.3 * 20.0_f32.to_radians().cos());
    }

    #[test]
    fn climb_out_of_valley_restores_undescended_move() {
        let mut world = World::new();
        let (tan20, tan30) = (20.0_f32.to_radians().tan(), 30.0_f32.to_radians().tan());
        world.add_slope(Vec2::ZERO, 4.0, 4.0 * tan20, SlopeRise::Left);
        world.add_slope(Vec2::new(4.0, 0.0), 4.0, 4.0 * tan30, SlopeRise::Right);
        // Trailing corner one skin above the descending ramp, leading corner short of the valley.
        let x0 = 3.005;
        let y0 = (4.0 - (x0 + SKIN_WIDTH)) * tan20;
        let mut c = spawn(&mut world, Vec2::new(x0, y0));

        let applied = c.move_by(&mut world, Vec2::new(1.0, -0.01), Vec2::ZERO, false);

        assert!(c.contact().climbing_slope);
        assert!(!c.contact().descending_slope);
        approx_eq(c.contact().slope_angle, 30.0);
        // The climb spends the full unit of travel, not the descended run.
        let hit_distance = 4.0 + (y0 + SKIN_WIDTH) / tan30 - (x0 + 1.0 - SKIN_WIDTH);
        let to_start = hit_distance - SKIN_WIDTH;
        let on_slope = 1.0 - to_start;
        let rad = 30.0_f32.to_radians();
        approx_eq(applied.x, to_start + on_slope * rad.cos());
        approx_eq(applied.y, on_slope * rad.sin());
    }

    #[test]
    fn on_platform_forces_grounded() {
        let mut world = World::new();
        let mut c = spawn(&mut world, Vec2::ZERO);
        c.move_by(&mut world, Vec2::new(0.0, 0.2), Vec2::ZERO, true);
        assert!(c.contact().below);
    }

    #[test]
    fn carried_move_ignores_carrier() {
        let mut world = World::new();
        let carrier = world.add_body(Vec2::new(-1.0, -1.0), Shape::rect(Vec2::new(5.0, 1.0)), Layers::PLATFORM, SurfaceTags::empty());
        let mut rider = spawn(&mut world, Vec2::new(0.0, 0.1));
        let mut other = spawn(&mut world, Vec2::new(2.0, 0.1));

        let carried = rider.move_carried(&mut world, Vec2::new(0.0, -0.25), carrier, true);
        approx_eq(carried.y, -0.25);
        assert!(rider.contact().below);

        let blocked = other.move_by(&mut world, Vec2::new(0.0, -0.25), Vec2::ZERO, false);
        approx_eq(blocked.y, -0.1);
        assert!(other.contact().below);
    }

    #[test]
    fn missing_body_does_not_move() {
        let mut world = World::new();
        let mut c = MovementController::new(EntityId(42), ControllerParams::default());
        assert_eq!(c.move_by(&mut world, Vec2::ONE, Vec2::ZERO, false), Vec2::ZERO);
    }
}
