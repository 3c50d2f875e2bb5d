//! Simulation parameters and command-line handling.
//!
//! Parameters are loaded once from a JSON file, optionally patched by the
//! CLI override set, validated, and then handed to the driver by value.
//! Nothing mutates them after the finalize transition.

use std::fs;
use std::path::{Path, PathBuf};

use nalgebra::{vector, Vector3};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Force conversion from CGS (dyne) to SI (Newton) for logged values.
pub const F_CGS_TO_SI: f64 = 1.0e-5;
/// Mass conversion from CGS (gram) to SI (kilogram) for logged values.
pub const M_CGS_TO_SI: f64 = 1.0e-3;

/// What a per-frame snapshot contains.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Positions only.
    Csv,
    /// Positions and velocities.
    CsvWithVelocity,
    /// No snapshot files; the frame counter still advances.
    None,
}

/// Immutable description of one simulation run.
///
/// Distances are centimeters, masses grams, forces dynes (CGS). The domain
/// is an axis-aligned box of full extents `box_x/box_y/box_z` centered at
/// the origin.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationParams {
    pub sphere_radius: f64,
    pub sphere_density: f64,

    pub box_x: f64,
    pub box_y: f64,
    pub box_z: f64,

    // Normal contact stiffness/damping per material pair.
    pub kn_s2s: f64,
    pub kn_s2w: f64,
    pub kn_s2m: f64,
    pub gn_s2s: f64,
    pub gn_s2w: f64,
    pub gn_s2m: f64,

    // Tangential contact stiffness/damping per material pair.
    pub kt_s2s: f64,
    pub kt_s2w: f64,
    pub kt_s2m: f64,
    pub gt_s2s: f64,
    pub gt_s2w: f64,
    pub gt_s2m: f64,

    pub static_friction_s2s: f64,
    pub static_friction_s2w: f64,

    pub cohesion_ratio: f64,
    pub adhesion_ratio_s2w: f64,

    pub grav_x: f64,
    pub grav_y: f64,
    pub grav_z: f64,

    /// Fixed integration step, seconds.
    pub step_size: f64,
    /// Total simulated duration, seconds.
    pub time_end: f64,
    /// How many fine-grained capture ticks make one rendered frame.
    pub captures_per_frame: u32,

    pub output_dir: PathBuf,
    pub write_mode: WriteMode,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            sphere_radius: 1.0,
            sphere_density: 2.5,
            box_x: 400.0,
            box_y: 100.0,
            box_z: 50.0,
            kn_s2s: 1.0e8,
            kn_s2w: 1.0e8,
            kn_s2m: 1.0e8,
            gn_s2s: 1.0e4,
            gn_s2w: 1.0e4,
            gn_s2m: 1.0e4,
            kt_s2s: 3.0e7,
            kt_s2w: 3.0e7,
            kt_s2m: 3.0e7,
            gt_s2s: 500.0,
            gt_s2w: 500.0,
            gt_s2m: 500.0,
            static_friction_s2s: 0.5,
            static_friction_s2w: 0.5,
            cohesion_ratio: 0.0,
            adhesion_ratio_s2w: 0.0,
            grav_x: 0.0,
            grav_y: 0.0,
            grav_z: -980.0,
            step_size: 2.0e-5,
            time_end: 5.0,
            captures_per_frame: 4,
            output_dir: PathBuf::from("results"),
            write_mode: WriteMode::Csv,
        }
    }
}

impl SimulationParams {
    /// Load and validate parameters from a JSON file.
    ///
    /// Any read, parse, or validation failure is a [`Error::Configuration`]
    /// so the caller can map it to a usage message.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        let params: Self = serde_json::from_str(&text).map_err(|e| {
            Error::Configuration(format!("cannot parse {}: {e}", path.display()))
        })?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.sphere_radius > 0.0) || !self.sphere_radius.is_finite() {
            return Err(Error::Configuration(
                "sphere_radius must be finite and > 0".to_string(),
            ));
        }
        if !(self.sphere_density > 0.0) || !self.sphere_density.is_finite() {
            return Err(Error::Configuration(
                "sphere_density must be finite and > 0".to_string(),
            ));
        }
        if [self.box_x, self.box_y, self.box_z]
            .iter()
            .any(|&l| !(l > 0.0) || !l.is_finite())
        {
            return Err(Error::Configuration(
                "box extents must be finite and > 0".to_string(),
            ));
        }
        if !(self.step_size > 0.0) || !self.step_size.is_finite() {
            return Err(Error::Configuration(
                "step_size must be finite and > 0".to_string(),
            ));
        }
        if !(self.time_end >= 0.0) || !self.time_end.is_finite() {
            return Err(Error::Configuration(
                "time_end must be finite and >= 0".to_string(),
            ));
        }
        if self.captures_per_frame < 1 {
            return Err(Error::Configuration(
                "captures_per_frame must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn gravity(&self) -> Vector3<f64> {
        vector![self.grav_x, self.grav_y, self.grav_z]
    }

    /// Mass of a single sphere.
    pub fn sphere_mass(&self) -> f64 {
        4.0 / 3.0 * std::f64::consts::PI
            * self.sphere_density
            * self.sphere_radius.powi(3)
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        self.sphere_radius = overrides.sphere_radius;
        self.grav_z = -overrides.grav_acc.abs();
        self.sphere_density = overrides.sphere_density;
        self.output_dir = overrides.output_dir.clone();
    }
}

/// The full CLI override set. Either all five are given or none.
#[derive(Clone, Debug)]
pub struct Overrides {
    pub aperture_diameter: f64,
    pub sphere_radius: f64,
    pub grav_acc: f64,
    pub sphere_density: f64,
    pub output_dir: PathBuf,
}

/// Parsed command line: `program <config_file> [<aperture_diameter>
/// <particle_radius> <grav_acc> <material_density> <output_dir>]`.
#[derive(Clone, Debug)]
pub struct CliArgs {
    pub config_file: PathBuf,
    pub overrides: Option<Overrides>,
}

impl CliArgs {
    /// Argument count (including the program name) of the full override form.
    pub const NUM_ARGS_FULL: usize = 7;

    pub fn parse(args: &[String]) -> Result<Self> {
        if args.len() != 2 && args.len() != Self::NUM_ARGS_FULL {
            return Err(Error::Configuration(format!(
                "expected 1 or {} arguments, got {}",
                Self::NUM_ARGS_FULL - 1,
                args.len().saturating_sub(1)
            )));
        }
        let config_file = PathBuf::from(&args[1]);
        let overrides = if args.len() == Self::NUM_ARGS_FULL {
            Some(Overrides {
                aperture_diameter: parse_f64(&args[2], "aperture diameter")?,
                sphere_radius: parse_f64(&args[3], "particle radius")?,
                grav_acc: parse_f64(&args[4], "gravitational acceleration")?,
                sphere_density: parse_f64(&args[5], "material density")?,
                output_dir: PathBuf::from(&args[6]),
            })
        } else {
            None
        };
        Ok(Self {
            config_file,
            overrides,
        })
    }
}

fn parse_f64(text: &str, what: &str) -> Result<f64> {
    text.parse::<f64>()
        .map_err(|_| Error::Configuration(format!("invalid {what}: {text:?}")))
}
