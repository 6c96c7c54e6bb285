//! Raycast kinematic collision engine for 2D platformers.
//!
//! Bodies are axis-aligned boxes moved through a world of convex polygons
//! by discrete ray sweeps. [`controller::MovementController`] resolves one
//! body's move (slopes, one-way surfaces, wall contact),
//! [`player::Player`] turns input into moves, and
//! [`platform::PlatformController`] drives waypoint platforms that carry
//! riders. [`simulation::Simulation`] runs all of it one fixed tick at a
//! time.

pub mod config;
pub mod contact;
pub mod controller;
pub mod geometry;
pub mod input;
pub mod math;
pub mod platform;
pub mod player;
pub mod schedule;
pub mod simulation;
pub mod slope;
pub mod sweep;
pub mod world;

pub const HZ: f32 = 60.0;
pub const DT: f32 = 1.0 / HZ;

pub use config::{ControllerParams, PlatformParams, PlayerParams, Scenario, ScenarioError};
pub use contact::ContactState;
pub use controller::MovementController;
pub use geometry::{Aabb, SKIN_WIDTH};
pub use input::{Buttons, InputFrame};
pub use platform::{PlatformController, RiderDirectory, WaypointPath};
pub use player::{MovementState, Player, TickEvents};
pub use simulation::{GameContext, Simulation};
pub use world::{EntityId, Layers, SurfaceTags, World};
