//! Hopper discharge runner.
//!
//! Usage: `coneflow <config_file> [<aperture_diameter> <particle_radius>
//! <grav_acc> <material_density> <output_dir>]` with either no overrides
//! or all five.

use std::env;
use std::process::ExitCode;

use log::{error, info};

use talus::config::{CliArgs, SimulationParams};
use talus::engine::KinematicEngine;
use talus::scenarios::coneflow::{self, ConeflowParams};
use talus::Error;

fn show_usage(name: &str) {
    println!(
        "usage: {name} <config_file> [<aperture_diameter> <particle_radius> <grav_acc> \
         <material_density> <output_dir>]"
    );
    println!("must have either 1 or {} arguments", CliArgs::NUM_ARGS_FULL - 1);
}

fn main() -> ExitCode {
    env_logger::init();
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("coneflow");

    if args.len() != 2 && args.len() != CliArgs::NUM_ARGS_FULL {
        show_usage(program);
        return ExitCode::from(1);
    }

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(Error::Configuration(msg)) => {
            println!("{msg}");
            show_usage(program);
            ExitCode::from(1)
        }
        Err(e) => {
            error!("{e}");
            ExitCode::from(1)
        }
    }
}

fn run(args: &[String]) -> talus::Result<()> {
    let cli = CliArgs::parse(args)?;
    let mut params = SimulationParams::from_json_file(&cli.config_file)?;
    let mut cone_params = ConeflowParams::default();

    if let Some(overrides) = &cli.overrides {
        params.apply_overrides(overrides);
        params.validate()?;
        cone_params.aperture_diameter = overrides.aperture_diameter;
        info!(
            "overrides: aperture {} cm, radius {} cm, gravity {} cm/s^2, density {} g/cm^3, output {}",
            overrides.aperture_diameter,
            overrides.sphere_radius,
            overrides.grav_acc,
            overrides.sphere_density,
            overrides.output_dir.display()
        );
    }

    let engine = KinematicEngine::from_params(&params);
    let mut scenario = coneflow::build(engine, params, &cone_params)?;
    let summary = scenario.driver.run()?;
    info!(
        "finished after {} steps: {} frames rendered, t = {:.4} s",
        summary.steps_taken, summary.frames_rendered, summary.final_time
    );
    Ok(())
}
