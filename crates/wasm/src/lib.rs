use glam::Vec2;
use wasm_bindgen::prelude::*;

use platcast_core::world::Body;
use platcast_core::{
    Buttons, ControllerParams, GameContext, Layers, PlatformParams, PlayerParams, Simulation, World, DT,
};

/// Browser handle around a single-player [`Simulation`].
#[wasm_bindgen]
pub struct Core {
    sim: Simulation,
    spawn: Vec2,
    size: Vec2,
    params: PlayerParams,
    platforms: Vec<(Vec2, Vec2, PlatformParams)>,
    paused: bool,
}

#[wasm_bindgen]
impl Core {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Core {
        let mut core = Core {
            sim: Simulation::new(World::new(), DT),
            spawn: Vec2::new(0.0, 0.0),
            size: Vec2::new(1.0, 2.0),
            params: PlayerParams::default(),
            platforms: Vec::new(),
            paused: false,
        };
        core.set_world(vec![-20.0, -1.0, 40.0, 1.0].into_boxed_slice());
        core
    }

    /// Respawn the player; the world and platforms are rebuilt as well.
    pub fn reset(&mut self, x: f32, y: f32, w: f32, h: f32) {
        self.spawn = Vec2::new(x, y);
        self.size = Vec2::new(w, h);
        let statics = self
            .sim
            .world()
            .bodies()
            .filter(|b| b.layers.contains(Layers::GROUND))
            .cloned()
            .collect();
        self.rebuild(statics);
    }

    /// Packed rects: [x,y,w,h, x,y,w,h, ...]
    pub fn set_world(&mut self, rects: Box<[f32]>) {
        let mut world = World::new();
        for c in rects.chunks_exact(4) {
            world.add_box(Vec2::new(c[0], c[1]), Vec2::new(c[2], c[3]));
        }
        self.rebuild(world.bodies().cloned().collect());
    }

    /// Packed waypoint offsets: [x0,y0, x1,y1, ...]. Returns false if the
    /// path is rejected.
    pub fn add_platform(&mut self, x: f32, y: f32, w: f32, h: f32, waypoints: Box<[f32]>, speed: f32, wait_time: f32) -> bool {
        let params = PlatformParams {
            waypoints: waypoints.chunks_exact(2).map(|c| Vec2::new(c[0], c[1])).collect(),
            speed,
            wait_time,
            ..PlatformParams::default()
        };
        let (pos, size) = (Vec2::new(x, y), Vec2::new(w, h));
        if self.sim.add_platform(pos, size, &params).is_err() {
            return false;
        }
        self.platforms.push((pos, size, params));
        true
    }

    /// Partial player params as JSON; fields left out keep their values.
    pub fn set_params_json(&mut self, json: &str) -> Result<(), JsValue> {
        let mut value = serde_json::to_value(&self.params).map_err(|e| JsValue::from_str(&e.to_string()))?;
        let patch: serde_json::Value = serde_json::from_str(json).map_err(|e| JsValue::from_str(&e.to_string()))?;
        if let (Some(base), Some(patch)) = (value.as_object_mut(), patch.as_object()) {
            for (k, v) in patch {
                base.insert(k.clone(), v.clone());
            }
        }
        self.params = serde_json::from_value(value).map_err(|e| JsValue::from_str(&e.to_string()))?;
        if let Some(player) = self.sim.player_mut(0) {
            player.set_params(self.params.clone());
        }
        Ok(())
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Step once and return state+events as a JS object.
    pub fn step(&mut self, input_bits: u8) -> Result<JsValue, JsValue> {
        let ctx = GameContext {
            paused: self.paused,
            ..GameContext::default()
        };
        let ev = self
            .sim
            .step(&ctx, &[Buttons::from_bits_truncate(input_bits)])
            .first()
            .copied()
            .unwrap_or_default();

        let Some(player) = self.sim.player(0) else {
            return Err(JsValue::from_str("no player"));
        };
        let pos = self.sim.position(player.entity()).unwrap_or_default();
        let v = player.velocity();
        let c = player.contact_state();

        let obj = js_sys::Object::new();
        let set = |k: &str, v: JsValue| js_sys::Reflect::set(&obj, &JsValue::from_str(k), &v).map(|_| ());
        set("x", JsValue::from_f64(pos.x as f64))?;
        set("y", JsValue::from_f64(pos.y as f64))?;
        set("vx", JsValue::from_f64(v.x as f64))?;
        set("vy", JsValue::from_f64(v.y as f64))?;
        set("state", JsValue::from_str(player.state().as_str()))?;
        set("grounded", JsValue::from_bool(c.below))?;
        set("jumped", JsValue::from_bool(ev.jumped || ev.wall_jumped))?;
        set("landed", JsValue::from_bool(ev.landed))?;
        set("bonked", JsValue::from_bool(ev.bonked))?;

        Ok(JsValue::from(obj))
    }
}

impl Core {
    fn rebuild(&mut self, statics: Vec<Body>) {
        let mut world = World::new();
        for body in statics {
            world.add_body(body.position, body.shape, body.layers, body.tags);
        }
        let mut sim = Simulation::new(world, DT);
        for (pos, size, params) in &self.platforms {
            if let Err(e) = sim.add_platform(*pos, *size, params) {
                log::warn!("platform at {pos} dropped on rebuild: {e}");
            }
        }
        sim.add_player(self.spawn, self.size, self.params.clone(), ControllerParams::default());
        self.sim = sim;
    }
}

impl Default for Core {
    fn default() -> Self {
        Self::new()
    }
}
