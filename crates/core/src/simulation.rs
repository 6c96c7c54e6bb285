//! Fixed-step driver tying the world, players and platforms together.

use glam::Vec2;

use crate::config::{ControllerParams, PathError, PlatformParams, PlayerParams, Scenario, ScenarioError};
use crate::controller::MovementController;
use crate::input::{Buttons, InputFrame};
use crate::platform::{ControllerHandle, PlatformController, RiderDirectory, WaypointPath};
use crate::player::{Player, TickEvents};
use crate::world::{EntityId, Layers, Shape, SurfaceTags, World};

/// Host state the engine has to respect but does not own.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct GameContext {
    pub paused: bool,
    pub dialogue_open: bool,
}

impl GameContext {
    /// While frozen no time passes and input is dropped.
    pub fn is_frozen(&self) -> bool {
        self.paused || self.dialogue_open
    }
}

impl RiderDirectory for [Player] {
    fn lookup(&self, entity: EntityId) -> Option<ControllerHandle> {
        self.iter().position(|p| p.entity() == entity).map(ControllerHandle)
    }

    fn controller_mut(&mut self, handle: ControllerHandle) -> Option<&mut MovementController> {
        self.get_mut(handle.0).map(Player::controller_mut)
    }
}

#[derive(Clone, Debug)]
pub struct Simulation {
    world: World,
    players: Vec<Player>,
    platforms: Vec<PlatformController>,
    previous_buttons: Vec<Buttons>,
    tick: u64,
    dt: f32,
}

impl Simulation {
    pub fn new(world: World, dt: f32) -> Self {
        Self {
            world,
            players: Vec::new(),
            platforms: Vec::new(),
            previous_buttons: Vec::new(),
            tick: 0,
            dt,
        }
    }

    pub fn from_scenario(scenario: &Scenario) -> Result<Self, ScenarioError> {
        let mut world = World::new();
        for (index, body) in scenario.bodies.iter().enumerate() {
            let shape = body.shape(index)?;
            world.add_body(body.position, shape, Layers::GROUND, body.tags());
        }

        let mut sim = Self::new(world, scenario.dt);
        for (index, spec) in scenario.platforms.iter().enumerate() {
            sim.add_platform(spec.position, spec.size, &spec.params)
                .map_err(|source| ScenarioError::InvalidPlatform { index, source })?;
        }
        if let Some(spec) = &scenario.player {
            sim.add_player(spec.position, spec.size, spec.params.clone(), spec.controller.clone());
        }

        log::info!(
            "scenario loaded: {} bodies, {} platforms, {} players, dt {}",
            scenario.bodies.len(),
            sim.platforms.len(),
            sim.players.len(),
            sim.dt
        );
        Ok(sim)
    }

    /// Spawn a player with its collider's bottom-left corner at `position`.
    /// Returns the player index used by [`Simulation::step`] inputs.
    pub fn add_player(&mut self, position: Vec2, size: Vec2, params: PlayerParams, controller: ControllerParams) -> usize {
        let entity = self.world.add_body(position, Shape::rect(size), Layers::PLAYER, SurfaceTags::empty());
        self.players.push(Player::new(entity, params, controller));
        self.previous_buttons.push(Buttons::empty());
        self.players.len() - 1
    }

    /// Solid moving box. Waypoints are offsets from `position`.
    pub fn add_platform(&mut self, position: Vec2, size: Vec2, params: &PlatformParams) -> Result<usize, PathError> {
        // Built before the body so a bad path leaves the world untouched.
        let path = WaypointPath::new(position, params)?;
        let entity = self.world.add_body(position, Shape::rect(size), Layers::PLATFORM, SurfaceTags::empty());
        self.platforms.push(PlatformController::with_path(entity, path, params));
        Ok(self.platforms.len() - 1)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn player(&self, index: usize) -> Option<&Player> {
        self.players.get(index)
    }

    pub fn player_mut(&mut self, index: usize) -> Option<&mut Player> {
        self.players.get_mut(index)
    }

    pub fn platforms(&self) -> &[PlatformController] {
        &self.platforms
    }

    /// Position of a body's origin (bottom-left corner for boxes).
    pub fn position(&self, entity: EntityId) -> Option<Vec2> {
        self.world.body(entity).map(|b| b.position)
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Simulated time at the start of the next tick.
    pub fn now(&self) -> f64 {
        self.tick as f64 * self.dt as f64
    }

    /// Run one fixed tick. `inputs[i]` drives player `i`; missing entries
    /// count as no buttons. Platforms (and the riders they carry) move
    /// before any player runs its own locomotion.
    pub fn step(&mut self, ctx: &GameContext, inputs: &[Buttons]) -> Vec<TickEvents> {
        if ctx.is_frozen() {
            return vec![TickEvents::default(); self.players.len()];
        }

        let now = self.now();
        for player in &mut self.players {
            player.controller_mut().begin_tick(now);
        }

        for platform in &mut self.platforms {
            platform.tick(&mut self.world, self.players.as_mut_slice(), now, self.dt);
        }

        let mut events = Vec::with_capacity(self.players.len());
        for (i, player) in self.players.iter_mut().enumerate() {
            let buttons = inputs.get(i).copied().unwrap_or_default();
            player.apply_input(&InputFrame::new(buttons, self.previous_buttons[i]));
            self.previous_buttons[i] = buttons;

            let ev = player.tick(&mut self.world, self.dt);
            if ev.any() {
                log::trace!("tick {} player {}: {:?}", self.tick, i, ev);
            }
            events.push(ev);
        }

        self.tick += 1;
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DT;

    fn approx_eq(a: f32, b: f32) {
        let eps = 1e-4;
        assert!((a - b).abs() <= eps, "expected {b}, got {a}");
    }

    fn flat() -> Simulation {
        let mut world = World::new();
        world.add_box(Vec2::new(-50.0, -1.0), Vec2::new(100.0, 1.0));
        let mut sim = Simulation::new(world, DT);
        sim.add_player(Vec2::new(0.0, 3.0), Vec2::new(1.0, 2.0), PlayerParams::default(), ControllerParams::default());
        sim
    }

    #[test]
    fn frozen_context_stops_time() {
        let mut sim = flat();
        let start = sim.players()[0].entity();
        let before = sim.position(start);

        let frozen = GameContext {
            paused: true,
            ..GameContext::default()
        };
        for _ in 0..10 {
            sim.step(&frozen, &[Buttons::RIGHT]);
        }
        assert_eq!(sim.tick_count(), 0);
        assert_eq!(sim.position(start), before);

        let dialogue = GameContext {
            dialogue_open: true,
            ..GameContext::default()
        };
        assert!(dialogue.is_frozen());
        sim.step(&GameContext::default(), &[]);
        assert_eq!(sim.tick_count(), 1);
    }

    #[test]
    fn falls_lands_and_walks() {
        let mut sim = flat();
        let ctx = GameContext::default();
        let mut landed = 0;
        for _ in 0..90 {
            landed += sim.step(&ctx, &[]).iter().filter(|e| e.landed).count();
        }
        assert_eq!(landed, 1);
        let id = sim.players()[0].entity();
        approx_eq(sim.position(id).unwrap().y, 0.0);

        for _ in 0..30 {
            sim.step(&ctx, &[Buttons::RIGHT]);
        }
        assert!(sim.position(id).unwrap().x > 1.0);
        approx_eq(sim.position(id).unwrap().y, 0.0);
    }

    #[test]
    fn jump_fires_once_per_press() {
        let mut sim = flat();
        let ctx = GameContext::default();
        for _ in 0..90 {
            sim.step(&ctx, &[]);
        }
        let mut jumps = 0;
        for _ in 0..20 {
            jumps += sim.step(&ctx, &[Buttons::JUMP]).iter().filter(|e| e.jumped).count();
        }
        assert_eq!(jumps, 1);
    }

    #[test]
    fn bad_platform_leaves_world_untouched() {
        let mut sim = flat();
        let bodies = sim.world().len();
        let params = PlatformParams {
            waypoints: Vec::new(),
            ..PlatformParams::default()
        };
        assert!(sim.add_platform(Vec2::ZERO, Vec2::ONE, &params).is_err());
        assert_eq!(sim.world().len(), bodies);
    }
}
