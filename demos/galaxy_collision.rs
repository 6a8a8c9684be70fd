// demos/galaxy_collision.rs
//
// Runs the four-galaxy collision headless and reports progress.
// RUST_LOG=debug shows per-step tree sizes.

use std::time::Instant;

use log::info;
use starwell::particles::{GalaxyCollisionScene, NBodySimulation};
use starwell::utils::{SimulationConstants, SimulationError};

fn main() -> Result<(), SimulationError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let steps: usize = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(100);

    let mut sim = NBodySimulation::new(SimulationConstants::default())?;
    let count = sim.load_scene(GalaxyCollisionScene::default())?;
    info!("Simulating {} bodies for {} steps", count, steps);

    let start = Instant::now();
    for step in 0..steps {
        let nodes = sim.step()?;
        if step % 10 == 0 {
            let spread = sim
                .pool()
                .positions()
                .iter()
                .map(|p| p.norm())
                .fold(0.0f32, f32::max);
            info!("step {:>4}: {:>6} nodes, outermost body at {:.1}", step, nodes, spread);
        }
    }

    println!("Elapsed: {:?}", start.elapsed());
    println!("First body: {:?}", sim.bodies()[0].position(sim.pool())?);
    Ok(())
}
