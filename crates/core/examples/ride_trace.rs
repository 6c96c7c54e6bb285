use glam::Vec2;
use platcast_core::{
    Buttons, ControllerParams, GameContext, PlatformParams, PlayerParams, Simulation, World, DT,
};

fn main() {
    let mut world = World::new();
    world.add_box(Vec2::new(-10.0, -1.0), Vec2::new(40.0, 1.0));
    world.add_one_way(Vec2::new(12.0, 4.0), Vec2::new(4.0, 0.25));

    let mut sim = Simulation::new(world, DT);
    let lift = PlatformParams {
        waypoints: vec![Vec2::ZERO, Vec2::new(0.0, 4.0)],
        speed: 2.0,
        wait_time: 0.5,
        ease_amount: 1.0,
        ..PlatformParams::default()
    };
    if let Err(e) = sim.add_platform(Vec2::new(4.0, 0.0), Vec2::new(3.0, 0.5), &lift) {
        eprintln!("ride_trace: {e}");
        return;
    }
    sim.add_player(Vec2::new(0.0, 0.0), Vec2::new(1.0, 2.0), PlayerParams::default(), ControllerParams::default());

    let ctx = GameContext::default();
    let mut jumped: u32 = 0;
    let mut landed: u32 = 0;
    let mut bonked: u32 = 0;

    for frame in 0..360 {
        let mut buttons = Buttons::empty();
        if frame < 40 {
            buttons |= Buttons::RIGHT;
        }
        if frame == 20 {
            buttons |= Buttons::JUMP;
        }

        for ev in sim.step(&ctx, &[buttons]) {
            jumped += ev.jumped as u32;
            landed += ev.landed as u32;
            bonked += ev.bonked as u32;
        }
    }

    let player = &sim.players()[0];
    let pos = sim.position(player.entity()).unwrap_or_default();
    let v = player.velocity();
    println!(
        "{{\"x\":{},\"y\":{},\"vx\":{},\"vy\":{},\"state\":\"{}\",\"jumped\":{},\"landed\":{},\"bonked\":{}}}",
        pos.x,
        pos.y,
        v.x,
        v.y,
        player.state(),
        jumped,
        landed,
        bonked
    );
}
