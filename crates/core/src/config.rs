//! Tunable parameters and scenario files.
//!
//! Every parameter struct deserializes with `#[serde(default)]`, so a TOML
//! table only has to name the values it changes.

use std::path::{Path, PathBuf};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::RayCounts;
use crate::input::Buttons;
use crate::slope::SlopeLimits;
use crate::world::{Layers, Shape, SlopeRise, SurfaceTags};

/// Collision resolver settings for one body.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerParams {
    /// Raised to 2 when lower.
    pub horizontal_ray_count: i32,
    pub vertical_ray_count: i32,
    #[serde(flatten)]
    pub slopes: SlopeLimits,
    /// Vertical input must be below this to drop through a one-way surface.
    pub fall_through_input: f32,
    /// Seconds before one-way surfaces block again after dropping through.
    pub fall_through_delay: f32,
    pub collision_mask: Layers,
}

impl Default for ControllerParams {
    fn default() -> Self {
        Self {
            horizontal_ray_count: 4,
            vertical_ray_count: 4,
            slopes: SlopeLimits::default(),
            fall_through_input: -0.6,
            fall_through_delay: 0.4,
            collision_mask: Layers::GROUND | Layers::PLATFORM,
        }
    }
}

impl ControllerParams {
    pub fn ray_counts(&self) -> RayCounts {
        RayCounts::new(self.horizontal_ray_count, self.vertical_ray_count)
    }
}

/// Player locomotion. Distances in world units, times in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerParams {
    pub move_speed: f32,
    pub max_jump_height: f32,
    pub min_jump_height: f32,
    pub time_to_jump_apex: f32,
    pub acceleration_time_airborne: f32,
    pub acceleration_time_grounded: f32,

    /// Wall jump with input toward the wall.
    pub wall_jump_climb: Vec2,
    /// Wall jump with neutral input.
    pub wall_jump_off: Vec2,
    /// Wall jump with input away from the wall.
    pub wall_leap: Vec2,
    pub wall_slide_speed_max: f32,
    /// Seconds input must point away from the wall before the player lets go.
    pub wall_stick_time: f32,
}

impl Default for PlayerParams {
    fn default() -> Self {
        Self {
            move_speed: 6.5,
            max_jump_height: 3.0,
            min_jump_height: 1.0,
            time_to_jump_apex: 0.4,
            acceleration_time_airborne: 0.08,
            acceleration_time_grounded: 0.02,

            wall_jump_climb: Vec2::new(7.5, 16.0),
            wall_jump_off: Vec2::new(8.5, 7.0),
            wall_leap: Vec2::new(18.0, 17.0),
            wall_slide_speed_max: 2.2,
            wall_stick_time: 0.15,
        }
    }
}

/// Gravity and jump speeds derived from [`PlayerParams`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct JumpKinematics {
    /// Negative (down).
    pub gravity: f32,
    pub max_jump_velocity: f32,
    pub min_jump_velocity: f32,
}

impl PlayerParams {
    pub fn kinematics(&self) -> JumpKinematics {
        let apex = self.time_to_jump_apex.max(1e-3);
        let gravity = -2.0 * self.max_jump_height / (apex * apex);
        JumpKinematics {
            gravity,
            max_jump_velocity: gravity.abs() * apex,
            min_jump_velocity: (2.0 * gravity.abs() * self.min_jump_height.max(0.0)).sqrt(),
        }
    }
}

/// Waypoint-following platform.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformParams {
    /// Offsets from the platform's starting position.
    pub waypoints: Vec<Vec2>,
    /// World units per second.
    pub speed: f32,
    /// Loop back to the first waypoint instead of reversing at the last.
    pub cyclic: bool,
    /// Pause at each waypoint, seconds.
    pub wait_time: f32,
    /// 0 = linear; clamped to [0, 2].
    pub ease_amount: f32,
    pub horizontal_ray_count: i32,
    pub vertical_ray_count: i32,
    pub passenger_mask: Layers,
}

impl Default for PlatformParams {
    fn default() -> Self {
        Self {
            waypoints: vec![Vec2::ZERO],
            speed: 2.0,
            cyclic: false,
            wait_time: 0.0,
            ease_amount: 0.0,
            horizontal_ray_count: 4,
            vertical_ray_count: 4,
            passenger_mask: Layers::PLAYER,
        }
    }
}

impl PlatformParams {
    pub fn ray_counts(&self) -> RayCounts {
        RayCounts::new(self.horizontal_ray_count, self.vertical_ray_count)
    }
}

#[derive(Debug, Error)]
pub enum PathError {
    #[error("waypoint path has no waypoints")]
    Empty,
    #[error("platform speed must be finite and non-negative, got {0}")]
    InvalidSpeed(f32),
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read scenario {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid scenario toml: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("body #{index}: {reason}")]
    InvalidBody { index: usize, reason: &'static str },

    #[error("platform #{index}: {source}")]
    InvalidPlatform {
        index: usize,
        #[source]
        source: PathError,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyKind {
    Box,
    Slope,
    Polygon,
}

/// One static body in a scenario file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BodySpec {
    pub kind: BodyKind,
    /// Bottom-left corner for boxes and slopes, origin for polygons.
    #[serde(default)]
    pub position: Vec2,
    #[serde(default)]
    pub size: Option<Vec2>,
    #[serde(default)]
    pub rise: Option<SlopeRise>,
    #[serde(default)]
    pub points: Option<Vec<Vec2>>,
    #[serde(default)]
    pub one_way: bool,
    #[serde(default)]
    pub wall_slide: bool,
}

impl BodySpec {
    pub fn shape(&self, index: usize) -> Result<Shape, ScenarioError> {
        let invalid = |reason| ScenarioError::InvalidBody { index, reason };
        match self.kind {
            BodyKind::Box => {
                let size = self.size.ok_or_else(|| invalid("box needs `size`"))?;
                Ok(Shape::rect(size))
            }
            BodyKind::Slope => {
                let size = self.size.ok_or_else(|| invalid("slope needs `size`"))?;
                let rise = self.rise.unwrap_or(SlopeRise::Right);
                Ok(Shape::slope(size.x, size.y, rise))
            }
            BodyKind::Polygon => {
                let points = self.points.clone().ok_or_else(|| invalid("polygon needs `points`"))?;
                Shape::polygon(points).ok_or_else(|| invalid("polygon needs 3+ points with non-zero area"))
            }
        }
    }

    pub fn tags(&self) -> SurfaceTags {
        let mut tags = SurfaceTags::empty();
        tags.set(SurfaceTags::ONE_WAY, self.one_way);
        tags.set(SurfaceTags::WALL_SLIDE, self.wall_slide);
        tags
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerSpec {
    /// Bottom-left corner of the collider.
    pub position: Vec2,
    #[serde(default = "default_player_size")]
    pub size: Vec2,
    #[serde(default)]
    pub params: PlayerParams,
    #[serde(default)]
    pub controller: ControllerParams,
}

fn default_player_size() -> Vec2 {
    Vec2::new(1.0, 2.0)
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlatformSpec {
    pub position: Vec2,
    pub size: Vec2,
    #[serde(flatten)]
    pub params: PlatformParams,
}

/// A level plus a scripted input sequence, as read by the `replay` tool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default = "default_dt")]
    pub dt: f32,
    #[serde(default, rename = "body")]
    pub bodies: Vec<BodySpec>,
    #[serde(default)]
    pub player: Option<PlayerSpec>,
    #[serde(default, rename = "platform")]
    pub platforms: Vec<PlatformSpec>,
    /// Button bitmask per tick (see [`Buttons`]).
    #[serde(default)]
    pub inputs: Vec<u8>,
}

fn default_dt() -> f32 {
    crate::DT
}

impl Scenario {
    pub fn from_file(path: &Path) -> Result<Self, ScenarioError> {
        let content = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(src: &str) -> Result<Self, ScenarioError> {
        Ok(toml::from_str(src)?)
    }

    pub fn input_frames(&self) -> Vec<Buttons> {
        self.inputs.iter().map(|bits| Buttons::from_bits_truncate(*bits)).collect()
    }
}
