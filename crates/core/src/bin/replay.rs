use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use platcast_core::{Buttons, GameContext, Scenario, Simulation};

/// Replay a scenario's scripted input and print a per-tick CSV trace of
/// the first player.
#[derive(Parser, Debug)]
#[command(name = "replay", version)]
struct Args {
    /// Scenario file (TOML).
    scenario: PathBuf,

    /// Ticks to run. Defaults to the length of the input script.
    #[arg(long)]
    ticks: Option<usize>,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let scenario = match Scenario::from_file(&args.scenario) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("replay: {e}");
            return ExitCode::FAILURE;
        }
    };
    let mut sim = match Simulation::from_scenario(&scenario) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("replay: {e}");
            return ExitCode::FAILURE;
        }
    };
    if sim.players().is_empty() {
        eprintln!("replay: scenario has no [player]");
        return ExitCode::FAILURE;
    }

    let inputs = scenario.input_frames();
    let ticks = args.ticks.unwrap_or(inputs.len());
    let ctx = GameContext::default();

    println!("tick,x,y,vx,vy,state,below,left,right");
    for tick in 0..ticks {
        let buttons = inputs.get(tick).copied().unwrap_or_else(Buttons::empty);
        sim.step(&ctx, &[buttons]);

        let player = &sim.players()[0];
        let pos = sim.position(player.entity()).unwrap_or_default();
        let v = player.velocity();
        let c = player.contact_state();
        println!(
            "{},{},{},{},{},{},{},{},{}",
            tick,
            pos.x,
            pos.y,
            v.x,
            v.y,
            player.state(),
            c.below as u8,
            c.left as u8,
            c.right as u8
        );
    }
    ExitCode::SUCCESS
}
