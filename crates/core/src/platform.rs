//! Waypoint-following platforms that carry riders.
//!
//! Each tick a platform works out its own displacement along its path,
//! finds the riders its motion affects, and then applies everything in two
//! phases around its own translation:
//!
//! 1. riders lifted by an upward sweep, or resting on top while the
//!    platform moves sideways or down, move first;
//! 2. the platform translates;
//! 3. riders pushed sideways, or pushed down from below, move last.
//!
//! Riders are moved through their own [`MovementController`], so they still
//! collide with the rest of the world, but never with the platform carrying
//! them.

use std::collections::{HashMap, HashSet};

use glam::Vec2;

use crate::config::{PathError, PlatformParams};
use crate::controller::MovementController;
use crate::geometry::{Axis, RayCounts, RayGeometry, SKIN_WIDTH};
use crate::math::{ease, sign};
use crate::schedule::TIME_EPSILON;
use crate::sweep::RayFan;
use crate::world::{EntityId, Layers, PhysicsWorld, QueryFilter, SpatialQuery};

/// World-space waypoints plus traversal state.
#[derive(Clone, Debug, PartialEq)]
pub struct WaypointPath {
    points: Vec<Vec2>,
    cyclic: bool,
    speed: f32,
    wait_time: f32,
    ease_amount: f32,

    from_index: usize,
    travel_fraction: f32,
    next_move_time: f64,
}

impl WaypointPath {
    /// `params.waypoints` are offsets from `origin`, the platform's starting
    /// position; they are fixed in world space here and never follow the
    /// platform afterwards.
    pub fn new(origin: Vec2, params: &PlatformParams) -> Result<Self, PathError> {
        if params.waypoints.is_empty() {
            return Err(PathError::Empty);
        }
        if !params.speed.is_finite() || params.speed < 0.0 {
            return Err(PathError::InvalidSpeed(params.speed));
        }
        Ok(Self {
            points: params.waypoints.iter().map(|w| origin + *w).collect(),
            cyclic: params.cyclic,
            speed: params.speed,
            wait_time: params.wait_time.max(0.0),
            ease_amount: params.ease_amount.clamp(0.0, 2.0),
            from_index: 0,
            travel_fraction: 0.0,
            next_move_time: 0.0,
        })
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn from_index(&self) -> usize {
        self.from_index
    }

    pub fn travel_fraction(&self) -> f32 {
        self.travel_fraction
    }

    pub fn is_waiting(&self, now: f64) -> bool {
        now + TIME_EPSILON < self.next_move_time
    }

    /// Displacement that takes a platform currently at `current` to its
    /// next position on the path.
    pub fn advance(&mut self, current: Vec2, now: f64, dt: f32) -> Vec2 {
        if self.points.len() < 2 || self.is_waiting(now) {
            return Vec2::ZERO;
        }

        self.from_index %= self.points.len();
        let to_index = (self.from_index + 1) % self.points.len();
        let from = self.points[self.from_index];
        let to = self.points[to_index];

        let distance = from.distance(to);
        self.travel_fraction = if distance > f32::EPSILON {
            (self.travel_fraction + dt * self.speed / distance).clamp(0.0, 1.0)
        } else {
            1.0
        };
        let next = from.lerp(to, ease(self.travel_fraction, self.ease_amount));

        if self.travel_fraction >= 1.0 {
            self.travel_fraction = 0.0;
            self.from_index += 1;
            log::debug!("waypoint {} reached at {:?}", to_index, to);

            if !self.cyclic && self.from_index >= self.points.len() - 1 {
                self.from_index = 0;
                self.points.reverse();
                log::debug!("path reversed");
            }
            self.next_move_time = now + self.wait_time as f64;
        }

        next - current
    }
}

/// A displacement a platform owes one of its riders this tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PendingRiderMovement {
    pub rider: EntityId,
    pub displacement: Vec2,
    /// Counts as grounded after the move.
    pub on_platform: bool,
    /// Applied before the platform translates rather than after.
    pub before_platform: bool,
}

/// Index of a movement controller inside a [`RiderDirectory`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ControllerHandle(pub usize);

/// Where platforms find the movement controllers of the bodies they carry.
pub trait RiderDirectory {
    fn lookup(&self, entity: EntityId) -> Option<ControllerHandle>;
    fn controller_mut(&mut self, handle: ControllerHandle) -> Option<&mut MovementController>;
}

impl RiderDirectory for [MovementController] {
    fn lookup(&self, entity: EntityId) -> Option<ControllerHandle> {
        self.iter().position(|c| c.entity() == entity).map(ControllerHandle)
    }

    fn controller_mut(&mut self, handle: ControllerHandle) -> Option<&mut MovementController> {
        self.get_mut(handle.0)
    }
}

/// Rider id to controller handle, filled on first contact and never evicted.
/// A rider without a controller is remembered as `None` so it is looked up
/// only once.
#[derive(Clone, Debug, Default)]
pub struct RiderCache {
    entries: HashMap<EntityId, Option<ControllerHandle>>,
}

impl RiderCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve<D>(&mut self, rider: EntityId, directory: &D) -> Option<ControllerHandle>
    where
        D: RiderDirectory + ?Sized,
    {
        *self.entries.entry(rider).or_insert_with(|| {
            let handle = directory.lookup(rider);
            match handle {
                Some(h) => log::debug!("rider {:?} registered as {:?}", rider, h),
                None => log::warn!("rider {:?} has no movement controller; it will not be carried", rider),
            }
            handle
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, rider: EntityId) -> bool {
        self.entries.contains_key(&rider)
    }
}

/// What one platform tick did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlatformTick {
    pub displacement: Vec2,
    pub riders: Vec<PendingRiderMovement>,
}

#[derive(Clone, Debug)]
pub struct PlatformController {
    entity: EntityId,
    path: WaypointPath,
    counts: RayCounts,
    passenger_mask: Layers,
    cache: RiderCache,
}

impl PlatformController {
    pub fn new(entity: EntityId, origin: Vec2, params: &PlatformParams) -> Result<Self, PathError> {
        let path = WaypointPath::new(origin, params)?;
        Ok(Self::with_path(entity, path, params))
    }

    pub fn with_path(entity: EntityId, path: WaypointPath, params: &PlatformParams) -> Self {
        Self {
            entity,
            path,
            counts: params.ray_counts(),
            passenger_mask: params.passenger_mask,
            cache: RiderCache::new(),
        }
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn path(&self) -> &WaypointPath {
        &self.path
    }

    pub fn rider_cache(&self) -> &RiderCache {
        &self.cache
    }

    /// Advance along the path and carry riders. Riders are looked up in
    /// `riders`; `now` is the tick start time used for the wait timer.
    pub fn tick<W, D>(&mut self, world: &mut W, riders: &mut D, now: f64, dt: f32) -> PlatformTick
    where
        W: PhysicsWorld + ?Sized,
        D: RiderDirectory + ?Sized,
    {
        let (Some(bounds), Some(position)) = (world.bounds(self.entity), world.position(self.entity)) else {
            log::warn!("platform {:?} missing from world, tick skipped", self.entity);
            return PlatformTick::default();
        };
        let rays = RayGeometry::new(bounds, self.counts);

        let velocity = self.path.advance(position, now, dt);
        let pending = self.calculate_rider_movement(&*world, &rays, velocity);

        self.move_riders(world, riders, &pending, true);
        world.translate(self.entity, velocity);
        self.move_riders(world, riders, &pending, false);

        PlatformTick {
            displacement: velocity,
            riders: pending,
        }
    }

    /// Riders affected by a platform move of `velocity`, each at most once.
    pub fn calculate_rider_movement<Q>(&self, query: &Q, rays: &RayGeometry, velocity: Vec2) -> Vec<PendingRiderMovement>
    where
        Q: SpatialQuery + ?Sized,
    {
        let filter = QueryFilter::new(self.passenger_mask).excluding(Some(self.entity));
        let mut moved = HashSet::new();
        let mut pending = Vec::new();

        let direction_x = sign(velocity.x);
        let direction_y = sign(velocity.y);

        if velocity.y != 0.0 {
            let fan = RayFan::new(rays, Axis::Vertical, direction_y, 0.0);
            let ray_direction = fan.ray_direction();
            let ray_length = velocity.y.abs() + SKIN_WIDTH;
            for (_, origin) in fan {
                let Some(hit) = query.cast_ray(origin, ray_direction, ray_length, &filter) else {
                    continue;
                };
                if !moved.insert(hit.entity) {
                    continue;
                }
                let lifting = direction_y > 0.0;
                pending.push(PendingRiderMovement {
                    rider: hit.entity,
                    displacement: Vec2::new(
                        if lifting { velocity.x } else { 0.0 },
                        velocity.y - (hit.distance - SKIN_WIDTH) * direction_y,
                    ),
                    on_platform: lifting,
                    before_platform: lifting,
                });
            }
        }

        if velocity.x != 0.0 {
            let fan = RayFan::new(rays, Axis::Horizontal, direction_x, 0.0);
            let ray_direction = fan.ray_direction();
            let ray_length = velocity.x.abs() + SKIN_WIDTH;
            for (_, origin) in fan {
                let Some(hit) = query.cast_ray(origin, ray_direction, ray_length, &filter) else {
                    continue;
                };
                if !moved.insert(hit.entity) {
                    continue;
                }
                // The small downward push makes the rider run its vertical sweep.
                pending.push(PendingRiderMovement {
                    rider: hit.entity,
                    displacement: Vec2::new(velocity.x - (hit.distance - SKIN_WIDTH) * direction_x, -SKIN_WIDTH),
                    on_platform: false,
                    before_platform: false,
                });
            }
        }

        // Riders resting on top of a platform moving sideways or down.
        if (velocity.y == 0.0 && velocity.x != 0.0) || direction_y < 0.0 {
            let fan = RayFan::new(rays, Axis::Vertical, 1.0, 0.0);
            let ray_direction = fan.ray_direction();
            for (_, origin) in fan {
                let Some(hit) = query.cast_ray(origin, ray_direction, SKIN_WIDTH * 2.0, &filter) else {
                    continue;
                };
                if !moved.insert(hit.entity) {
                    continue;
                }
                pending.push(PendingRiderMovement {
                    rider: hit.entity,
                    displacement: velocity,
                    on_platform: true,
                    before_platform: true,
                });
            }
        }

        pending
    }

    fn move_riders<W, D>(&mut self, world: &mut W, riders: &mut D, pending: &[PendingRiderMovement], before_platform: bool)
    where
        W: PhysicsWorld + ?Sized,
        D: RiderDirectory + ?Sized,
    {
        for movement in pending.iter().filter(|m| m.before_platform == before_platform) {
            let Some(handle) = self.cache.resolve(movement.rider, &*riders) else {
                continue;
            };
            let Some(controller) = riders.controller_mut(handle) else {
                log::warn!("stale handle {:?} for rider {:?}", handle, movement.rider);
                continue;
            };
            controller.move_carried(world, movement.displacement, self.entity, movement.on_platform);
        }
    }
}
