//! Input-driven locomotion on top of a [`MovementController`].

use std::fmt;

use glam::Vec2;

use crate::config::{ControllerParams, JumpKinematics, PlayerParams};
use crate::contact::ContactState;
use crate::controller::MovementController;
use crate::input::InputFrame;
use crate::math::{direction_of, smooth_damp};
use crate::world::{EntityId, PhysicsWorld};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MovementState {
    Grounded,
    Airborne,
    WallSliding,
}

impl MovementState {
    pub fn as_str(self) -> &'static str {
        match self {
            MovementState::Grounded => "grounded",
            MovementState::Airborne => "airborne",
            MovementState::WallSliding => "wall_sliding",
        }
    }
}

impl fmt::Display for MovementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Things that happened during one tick, for animation and audio hooks.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TickEvents {
    pub jumped: bool,
    pub wall_jumped: bool,
    pub landed: bool,
    pub bonked: bool,
}

impl TickEvents {
    pub fn any(&self) -> bool {
        self.jumped || self.wall_jumped || self.landed || self.bonked
    }
}

#[derive(Clone, Debug)]
pub struct Player {
    params: PlayerParams,
    kinematics: JumpKinematics,
    controller: MovementController,

    velocity: Vec2,
    velocity_x_smoothing: f32,
    time_to_wall_unstick: f32,
    wall_sliding: bool,
    wall_dir_x: i8,
    directional_input: Vec2,
    /// A held jump that actually launched; only its release cuts the jump.
    jumping: bool,
    pending: TickEvents,
}

impl Player {
    pub fn new(entity: EntityId, params: PlayerParams, controller: ControllerParams) -> Self {
        let kinematics = params.kinematics();
        Self {
            params,
            kinematics,
            controller: MovementController::new(entity, controller),
            velocity: Vec2::ZERO,
            velocity_x_smoothing: 0.0,
            time_to_wall_unstick: 0.0,
            wall_sliding: false,
            wall_dir_x: 1,
            directional_input: Vec2::ZERO,
            jumping: false,
            pending: TickEvents::default(),
        }
    }

    pub fn entity(&self) -> EntityId {
        self.controller.entity()
    }

    pub fn params(&self) -> &PlayerParams {
        &self.params
    }

    /// Replace the tunables; gravity and jump speeds are derived again.
    pub fn set_params(&mut self, params: PlayerParams) {
        self.kinematics = params.kinematics();
        self.params = params;
    }

    pub fn kinematics(&self) -> JumpKinematics {
        self.kinematics
    }

    pub fn controller(&self) -> &MovementController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut MovementController {
        &mut self.controller
    }

    pub fn contact_state(&self) -> ContactState {
        self.controller.contact_state()
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: Vec2) {
        self.velocity = velocity;
    }

    pub fn is_wall_sliding(&self) -> bool {
        self.wall_sliding
    }

    pub fn state(&self) -> MovementState {
        if self.wall_sliding {
            MovementState::WallSliding
        } else if self.controller.contact().below {
            MovementState::Grounded
        } else {
            MovementState::Airborne
        }
    }

    pub fn set_directional_input(&mut self, input: Vec2) {
        self.directional_input = input;
    }

    /// Feed one tick of host input. While jump is held and no jump is under
    /// way, a jump is tried every tick, so a press made in the air fires on
    /// landing. Letting go after a launched jump cuts it to the minimum height.
    pub fn apply_input(&mut self, frame: &InputFrame) {
        self.set_directional_input(frame.direction);

        if frame.jump_held {
            if !self.jumping {
                self.jumping = self.on_jump_input_down();
            }
        } else if self.jumping {
            self.jumping = false;
            self.on_jump_input_up();
        }
    }

    /// Returns whether a jump was launched.
    pub fn on_jump_input_down(&mut self) -> bool {
        let contact = *self.controller.contact();

        if self.wall_sliding {
            let wall = self.wall_dir_x as f32;
            let input_x = self.directional_input.x;
            let impulse = if input_x.abs() < 0.2 {
                self.params.wall_jump_off
            } else if wall == direction_of(input_x) {
                self.params.wall_jump_climb
            } else {
                self.params.wall_leap
            };
            self.velocity = Vec2::new(-wall * impulse.x, impulse.y);
            self.pending.wall_jumped = true;
            log::trace!("{:?}: wall jump {:?}", self.entity(), self.velocity);
            return true;
        }

        if !contact.below {
            return false;
        }

        if contact.sliding_down_slope {
            // Only away from the slope or straight up.
            let input_x = self.directional_input.x;
            if input_x.abs() < 0.1 || direction_of(input_x) != -direction_of(contact.slope_normal.x) {
                self.velocity = contact.slope_normal * self.kinematics.max_jump_velocity;
                self.pending.jumped = true;
                return true;
            }
            return false;
        }

        self.velocity.y = self.kinematics.max_jump_velocity;
        self.pending.jumped = true;
        true
    }

    pub fn on_jump_input_up(&mut self) {
        if self.velocity.y > self.kinematics.min_jump_velocity {
            self.velocity.y = self.kinematics.min_jump_velocity;
        }
    }

    /// One fixed step of locomotion: velocity, wall slide, collide, then
    /// settle vertical velocity against whatever was hit.
    pub fn tick<W>(&mut self, world: &mut W, dt: f32) -> TickEvents
    where
        W: PhysicsWorld + ?Sized,
    {
        let was_grounded = self.controller.contact().below;

        self.calculate_velocity(dt);
        self.handle_wall_sliding(dt);

        self.controller
            .move_by(world, self.velocity * dt, self.directional_input, false);

        let contact = *self.controller.contact();
        if contact.above || contact.below {
            if contact.sliding_down_slope {
                self.velocity.y += contact.slope_normal.y * -self.kinematics.gravity * dt;
            } else {
                self.velocity.y = 0.0;
            }
        }

        let mut events = std::mem::take(&mut self.pending);
        events.landed = contact.below && !was_grounded;
        events.bonked = contact.above;
        events
    }

    fn calculate_velocity(&mut self, dt: f32) {
        let target_x = self.directional_input.x * self.params.move_speed;
        let smooth_time = if self.controller.contact().below {
            self.params.acceleration_time_grounded
        } else {
            self.params.acceleration_time_airborne
        };
        self.velocity.x = smooth_damp(self.velocity.x, target_x, &mut self.velocity_x_smoothing, smooth_time, dt);
        self.velocity.y += self.kinematics.gravity * dt;
    }

    fn handle_wall_sliding(&mut self, dt: f32) {
        let contact = *self.controller.contact();
        self.wall_dir_x = contact.wall_direction();
        self.wall_sliding = false;

        if !(contact.touching_wall() && !contact.below && self.velocity.y < 0.0 && contact.can_wall_slide) {
            return;
        }
        self.wall_sliding = true;
        self.velocity.y = self.velocity.y.max(-self.params.wall_slide_speed_max);

        if self.time_to_wall_unstick > 0.0 {
            self.velocity.x = 0.0;
            self.velocity_x_smoothing = 0.0;

            // Neutral input counts as pushing right.
            if self.wall_dir_x as f32 != direction_of(self.directional_input.x) {
                self.time_to_wall_unstick -= dt;
            } else {
                self.time_to_wall_unstick = self.params.wall_stick_time;
            }
        } else {
            self.time_to_wall_unstick = self.params.wall_stick_time;
        }
    }
}
