//! Settling onto a step-shaped mesh obstacle.
//!
//! A box of material is dropped onto a rigid step mesh whose pose is
//! prescribed every iteration, the shape of a co-simulation loop where an
//! outer integrator moves the obstacle and reads back contact loads.

use std::path::PathBuf;

use log::info;
use nalgebra::{point, vector, Isometry3, Vector3};

use crate::config::SimulationParams;
use crate::driver::{RunSummary, SimulationDriver};
use crate::engine::GranularEngine;
use crate::error::Result;
use crate::mesh::MeshSoupEntry;
use crate::output::{write_mesh_layout, MeshLayoutRow};
use crate::sampling::{Footprint, HcpSampler, LayeredFill};

pub const MESH_LAYOUT_FILE: &str = "mesh_step_meshes.csv";

#[derive(Clone, Debug)]
pub struct MeshStepParams {
    /// Step geometry to load; scaled to half the domain footprint.
    pub mesh_file: PathBuf,
    pub step_height: f64,
    pub step_mass: f64,
    /// Fill spacing margin as a fraction of the particle radius.
    pub fill_margin: f64,
}

impl Default for MeshStepParams {
    fn default() -> Self {
        Self {
            mesh_file: PathBuf::from("meshes/step.obj"),
            step_height: 5.0,
            step_mass: 1.0,
            fill_margin: 0.2,
        }
    }
}

pub struct MeshStepScenario<E: GranularEngine> {
    pub driver: SimulationDriver<E>,
    /// Prescribed pose of the step, constant over the run.
    pub mesh_pose: Isometry3<f64>,
}

/// Build and finalize the step scenario.
pub fn build<E: GranularEngine>(
    engine: E,
    params: SimulationParams,
    ms: &MeshStepParams,
) -> Result<MeshStepScenario<E>> {
    let radius = params.sphere_radius;
    let epsilon = ms.fill_margin * radius;
    let spacing = 2.0 * radius + epsilon;
    let (box_x, box_y, box_z) = (params.box_x, params.box_y, params.box_z);
    let output_dir = params.output_dir.clone();

    let mut driver = SimulationDriver::new(engine, params)?;

    let entry = MeshSoupEntry::scaled(
        ms.mesh_file.clone(),
        vector![box_x / 2.0, box_y / 2.0, ms.step_height],
        ms.step_mass,
    );
    driver.load_meshes(vec![entry])?;

    let fill = LayeredFill {
        bottom: -box_z / 2.0 + ms.step_height + 2.0 * spacing,
        top: box_z / 2.0 - radius - epsilon,
        layer_spacing: spacing,
        footprint: Footprint::Rect {
            half_x: box_x / 2.0 - radius - epsilon,
            half_y: box_y / 2.0 - radius - epsilon,
        },
    };
    let mut sampler = HcpSampler::new(spacing);
    let points = fill.generate(&mut sampler);
    info!("created {} spheres above the step", points.len());
    driver.set_particles(&points)?;

    // Catch plane at the bottom so the settled bed weight is observable.
    driver.create_bc_plane(
        point![0.0, 0.0, -box_z / 2.0 + 2.0 * radius],
        Vector3::z(),
        true,
    )?;

    let mesh_pose = Isometry3::translation(0.0, 0.0, -box_z / 2.0 + 2.0 * radius);
    write_mesh_layout(
        &output_dir.join(MESH_LAYOUT_FILE),
        &[MeshLayoutRow::axis_aligned(
            &driver.meshes().entries()[0].file.to_string_lossy(),
            point![
                mesh_pose.translation.x,
                mesh_pose.translation.y,
                mesh_pose.translation.z
            ],
            vector![box_x / 2.0, box_y / 2.0, ms.step_height],
        )],
    )?;

    driver.initialize()?;
    Ok(MeshStepScenario { driver, mesh_pose })
}

impl<E: GranularEngine> MeshStepScenario<E> {
    /// Run to completion, re-prescribing the step pose every iteration.
    pub fn run(&mut self) -> Result<RunSummary> {
        let pose = self.mesh_pose;
        self.driver.run_with_hook(move |meshes, engine, _time| {
            meshes.apply_motion(engine, 0, pose, Vector3::zeros(), Vector3::zeros())
        })
    }
}
