//! Hopper discharge: material settles inside a cone, then the plate
//! closing the aperture is removed and the column drains onto a tracked
//! plane at the bottom of the domain.

use log::info;

use nalgebra::{point, vector, Point3, Vector3};

use crate::boundary::BoundaryHandle;
use crate::config::{SimulationParams, M_CGS_TO_SI};
use crate::driver::SimulationDriver;
use crate::engine::GranularEngine;
use crate::error::Result;
use crate::output::{write_mesh_layout, MeshLayoutRow};
use crate::sampling::{Footprint, LayeredFill, PoissonDiscSampler};

/// Name of the visualization layout file written into the output directory.
pub const MESH_LAYOUT_FILE: &str = "coneflow_meshes.csv";

/// Geometry knobs of the hopper setup. Everything is derived from the
/// domain extents except the aperture, which the CLI can sweep.
#[derive(Clone, Debug)]
pub struct ConeflowParams {
    /// Diameter of the cone opening.
    pub aperture_diameter: f64,
    /// Sampler spacing as a multiple of the particle radius.
    pub fill_padding: f64,
    /// Clearance kept at the top of the fill volume.
    pub fill_gap: f64,
    /// Cone surface slope.
    pub cone_slope: f64,
    /// Simulated time after which the aperture plate is removed.
    pub t_remove_plane: f64,
    pub sampler_seed: u64,
    pub cone_mesh_name: String,
    pub cylinder_mesh_name: String,
}

impl Default for ConeflowParams {
    fn default() -> Self {
        Self {
            aperture_diameter: 16.0,
            fill_padding: 2.02,
            fill_gap: 1.0,
            cone_slope: 1.0,
            t_remove_plane: 0.5,
            sampler_seed: 42,
            cone_mesh_name: "meshes/gran_zcone.obj".to_string(),
            cylinder_mesh_name: "meshes/gran_cylinder.obj".to_string(),
        }
    }
}

/// A fully configured hopper run plus the handles a caller may want to
/// inspect afterwards.
pub struct ConeflowScenario<E: GranularEngine> {
    pub driver: SimulationDriver<E>,
    /// Plate closing the aperture until `t_remove_plane`.
    pub cone_plane: BoundaryHandle,
    /// Force-tracked catch plane at the bottom of the domain.
    pub bottom_plane: BoundaryHandle,
}

/// Build and finalize the hopper scenario. The returned driver is in the
/// finalized state, ready to run.
pub fn build<E: GranularEngine>(
    engine: E,
    params: SimulationParams,
    cf: &ConeflowParams,
) -> Result<ConeflowScenario<E>> {
    let radius = params.sphere_radius;
    let box_z = params.box_z;
    let sphere_mass = params.sphere_mass();
    let output_dir = params.output_dir.clone();

    // Cone tip sits below the center of the domain.
    let cone_tip: Point3<f64> = point![0.0, 0.0, -2.0 - box_z / 6.0];
    let cone_offset = cf.aperture_diameter / 2.0;

    let fill_width = box_z / 3.0;
    let fill_height = fill_width;
    let fill_top = box_z / 2.0 - cf.fill_gap;
    let fill_bottom = fill_top - fill_height;
    let cyl_radius = fill_width + 8.0;

    let mut driver = SimulationDriver::new(engine, params)?;

    let fill = LayeredFill {
        bottom: fill_bottom + cf.fill_gap,
        top: fill_top,
        layer_spacing: cf.fill_padding * radius,
        footprint: Footprint::Disc { radius: fill_width },
    };
    let mut sampler = PoissonDiscSampler::new(cf.fill_padding * radius, cf.sampler_seed);
    let points = fill.generate(&mut sampler);
    info!(
        "filled {} layers between z = {} and z = {}: {} spheres, total mass {:.4} kg",
        fill.layer_count(),
        fill.bottom,
        fill.top,
        points.len(),
        points.len() as f64 * sphere_mass * M_CGS_TO_SI
    );
    driver.set_particles(&points)?;

    // Funnel surface and the outer containment cylinder.
    driver.create_bc_cone_z(
        cone_tip,
        cf.cone_slope,
        box_z,
        cone_tip.z + cone_offset,
        false,
    )?;
    driver.create_bc_cylinder_z(point![0.0, 0.0, 0.0], cyl_radius, false)?;

    // Plate closing the aperture; removed once the fill has settled.
    let plane_center: Point3<f64> = point![
        0.0,
        0.0,
        cone_tip.z + 2.0 * cf.cone_slope + cf.cone_slope * cone_offset
    ];
    let cone_plane = driver.create_bc_plane(plane_center, Vector3::z(), false)?;
    driver.schedule_disable(cone_plane, cf.t_remove_plane)?;

    // Catch plane near the bottom of the domain, force-tracked so the
    // discharged mass can be weighed over time.
    let bottom_plane = driver.create_bc_plane(
        point![0.0, 0.0, -box_z / 2.0 + 2.0],
        Vector3::z(),
        true,
    )?;

    let cone_top: Point3<f64> = point![0.0, 0.0, cone_tip.z + fill_width + 8.0];
    write_mesh_layout(
        &output_dir.join(MESH_LAYOUT_FILE),
        &[
            MeshLayoutRow::axis_aligned(&cf.cone_mesh_name, cone_top, vector![1.0, 1.0, 1.0]),
            MeshLayoutRow::axis_aligned(
                &cf.cylinder_mesh_name,
                point![0.0, 0.0, 0.0],
                vector![cyl_radius, cyl_radius, box_z / 2.0],
            ),
        ],
    )?;

    driver.initialize()?;
    Ok(ConeflowScenario {
        driver,
        cone_plane,
        bottom_plane,
    })
}
