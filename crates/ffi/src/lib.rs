//! C ABI over [`Simulation`] for native game hosts.
//!
//! The host owns an opaque `*mut Simulation` from `platcast_create` until it
//! hands it back to `platcast_free`. Every other call tolerates a null
//! handle by doing nothing.

use glam::Vec2;
use platcast_core::world::SlopeRise;
use platcast_core::{
    Buttons, ControllerParams, GameContext, PlatformParams, PlayerParams, Simulation, SurfaceTags, TickEvents, World,
};

#[repr(C)]
#[derive(Copy, Clone, Debug, Default)]
pub struct Vec2C {
    pub x: f32,
    pub y: f32,
}

impl From<Vec2> for Vec2C {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default)]
pub struct Contact {
    pub above: u8,
    pub below: u8,
    pub left: u8,
    pub right: u8,
    pub climbing_slope: u8,
    pub descending_slope: u8,
    pub sliding_down_slope: u8,
    pub falling_through_platform: u8,
    pub face_direction: i8,
    pub slope_angle: f32,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, Default)]
pub struct Events {
    pub jumped: u8,
    pub wall_jumped: u8,
    pub landed: u8,
    pub bonked: u8,
}

impl From<TickEvents> for Events {
    fn from(ev: TickEvents) -> Self {
        Self {
            jumped: ev.jumped as u8,
            wall_jumped: ev.wall_jumped as u8,
            landed: ev.landed as u8,
            bonked: ev.bonked as u8,
        }
    }
}

fn sim_mut<'a>(sim: *mut Simulation) -> Option<&'a mut Simulation> {
    unsafe { sim.as_mut() }
}

#[no_mangle]
pub extern "C" fn platcast_create(dt: f32) -> *mut Simulation {
    let dt = if dt > 0.0 { dt } else { platcast_core::DT };
    Box::into_raw(Box::new(Simulation::new(World::new(), dt)))
}

#[no_mangle]
pub extern "C" fn platcast_free(sim: *mut Simulation) {
    if !sim.is_null() {
        drop(unsafe { Box::from_raw(sim) });
    }
}

/// Solid static box. Returns its entity id, or `u32::MAX` on a null handle.
#[no_mangle]
pub extern "C" fn platcast_add_box(sim: *mut Simulation, x: f32, y: f32, w: f32, h: f32, wall_slide: u8) -> u32 {
    let Some(sim) = sim_mut(sim) else { return u32::MAX };
    let id = sim.world_mut().add_box(Vec2::new(x, y), Vec2::new(w, h));
    if wall_slide != 0 {
        if let Some(body) = sim.world_mut().body_mut(id) {
            body.tags |= SurfaceTags::WALL_SLIDE;
        }
    }
    id.0
}

#[no_mangle]
pub extern "C" fn platcast_add_one_way(sim: *mut Simulation, x: f32, y: f32, w: f32, h: f32) -> u32 {
    let Some(sim) = sim_mut(sim) else { return u32::MAX };
    sim.world_mut().add_one_way(Vec2::new(x, y), Vec2::new(w, h)).0
}

/// `rises_right != 0`: low on the left, high on the right.
#[no_mangle]
pub extern "C" fn platcast_add_slope(sim: *mut Simulation, x: f32, y: f32, w: f32, h: f32, rises_right: u8) -> u32 {
    let Some(sim) = sim_mut(sim) else { return u32::MAX };
    let rise = if rises_right != 0 { SlopeRise::Right } else { SlopeRise::Left };
    sim.world_mut().add_slope(Vec2::new(x, y), w, h, rise).0
}

/// Player with default tuning. Returns the player index.
#[no_mangle]
pub extern "C" fn platcast_add_player(sim: *mut Simulation, x: f32, y: f32, w: f32, h: f32) -> u32 {
    let Some(sim) = sim_mut(sim) else { return u32::MAX };
    sim.add_player(Vec2::new(x, y), Vec2::new(w, h), PlayerParams::default(), ControllerParams::default()) as u32
}

/// Platform following `waypoint_len` offsets packed as `[x0, y0, x1, y1, ...]`.
/// Returns the platform index, or `u32::MAX` if the path is rejected.
#[no_mangle]
pub extern "C" fn platcast_add_platform(
    sim: *mut Simulation,
    x: f32,
    y: f32,
    w: f32,
    h: f32,
    waypoints: *const f32,
    waypoint_len: usize,
    speed: f32,
    wait_time: f32,
    ease_amount: f32,
    cyclic: u8,
) -> u32 {
    let Some(sim) = sim_mut(sim) else { return u32::MAX };
    let packed: &[f32] = if waypoints.is_null() {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(waypoints, waypoint_len * 2) }
    };
    let params = PlatformParams {
        waypoints: packed.chunks_exact(2).map(|c| Vec2::new(c[0], c[1])).collect(),
        speed,
        wait_time,
        ease_amount,
        cyclic: cyclic != 0,
        ..PlatformParams::default()
    };
    match sim.add_platform(Vec2::new(x, y), Vec2::new(w, h), &params) {
        Ok(index) => index as u32,
        Err(e) => {
            log::warn!("platform rejected: {e}");
            u32::MAX
        }
    }
}

/// Advance one tick. `input_bits[i]` drives player `i`.
/// Fills `out_events` (one per player, up to `events_len`) when non-null.
#[no_mangle]
pub extern "C" fn platcast_step(
    sim: *mut Simulation,
    input_bits: *const u8,
    input_len: usize,
    paused: u8,
    out_events: *mut Events,
    events_len: usize,
) {
    let Some(sim) = sim_mut(sim) else { return };
    let inputs: Vec<Buttons> = if input_bits.is_null() {
        Vec::new()
    } else {
        unsafe { std::slice::from_raw_parts(input_bits, input_len) }
            .iter()
            .map(|b| Buttons::from_bits_truncate(*b))
            .collect()
    };
    let ctx = GameContext {
        paused: paused != 0,
        ..GameContext::default()
    };

    let events = sim.step(&ctx, &inputs);
    if out_events.is_null() {
        return;
    }
    let out = unsafe { std::slice::from_raw_parts_mut(out_events, events_len) };
    for (slot, ev) in out.iter_mut().zip(events) {
        *slot = ev.into();
    }
}

/// Bottom-left corner of player `index`; zero if it does not exist.
#[no_mangle]
pub extern "C" fn platcast_player_position(sim: *mut Simulation, index: u32) -> Vec2C {
    let Some(sim) = sim_mut(sim) else { return Vec2C::default() };
    sim.player(index as usize)
        .and_then(|p| sim.position(p.entity()))
        .map(Vec2C::from)
        .unwrap_or_default()
}

#[no_mangle]
pub extern "C" fn platcast_player_velocity(sim: *mut Simulation, index: u32) -> Vec2C {
    let Some(sim) = sim_mut(sim) else { return Vec2C::default() };
    sim.player(index as usize)
        .map(|p| Vec2C::from(p.velocity()))
        .unwrap_or_default()
}

#[no_mangle]
pub extern "C" fn platcast_player_contact(sim: *mut Simulation, index: u32) -> Contact {
    let Some(sim) = sim_mut(sim) else { return Contact::default() };
    let Some(player) = sim.player(index as usize) else { return Contact::default() };
    let c = player.contact_state();
    Contact {
        above: c.above as u8,
        below: c.below as u8,
        left: c.left as u8,
        right: c.right as u8,
        climbing_slope: c.climbing_slope as u8,
        descending_slope: c.descending_slope as u8,
        sliding_down_slope: c.sliding_down_slope as u8,
        falling_through_platform: c.falling_through_platform as u8,
        face_direction: c.face_direction,
        slope_angle: c.slope_angle,
    }
}
