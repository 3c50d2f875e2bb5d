//! The opaque stepping-backend surface.
//!
//! Everything the driver needs from a granular physics engine fits in one
//! narrow trait: geometry registration before the finalize transition, one
//! blocking advance per step afterwards, and read-only queries in between.
//! Backends may parallelize or substep internally; none of that is
//! observable here.

pub use kinematic::KinematicEngine;

mod kinematic;

use nalgebra::{Isometry3, Point3, Vector3};

use crate::error::Result;
use crate::mesh::MeshSoupEntry;

/// Engine-assigned boundary-condition identifier.
pub type BcId = usize;

pub trait GranularEngine {
    /// Hand the engine its initial particle positions. Called before
    /// [`GranularEngine::initialize`]; the engine owns the particles
    /// afterwards.
    fn set_particles(&mut self, positions: &[Point3<f64>]);

    fn create_bc_plane(
        &mut self,
        point: Point3<f64>,
        normal: Vector3<f64>,
        track_forces: bool,
    ) -> BcId;

    fn create_bc_cylinder_z(
        &mut self,
        center: Point3<f64>,
        radius: f64,
        track_forces: bool,
    ) -> BcId;

    fn create_bc_cone_z(
        &mut self,
        tip: Point3<f64>,
        slope: f64,
        hmax: f64,
        hmin: f64,
        track_forces: bool,
    ) -> BcId;

    /// Stop a boundary from interacting with particles. One-way.
    fn disable_bc(&mut self, id: BcId);

    /// Accumulated reaction force on a boundary over the last step, or
    /// `None` when the boundary does not track forces. `None` signals
    /// "no data", not a fatal condition.
    fn bc_reaction_force(&self, id: BcId) -> Option<Vector3<f64>>;

    fn load_meshes(&mut self, entries: &[MeshSoupEntry]) -> Result<()>;

    /// Prescribe the pose and velocities of one mesh soup for the next step.
    fn apply_mesh_motion(
        &mut self,
        index: usize,
        pose: Isometry3<f64>,
        linear_velocity: Vector3<f64>,
        angular_velocity: Vector3<f64>,
    );

    /// Contact force and torque the particles exert on a mesh soup. Only
    /// meaningful once at least one step has completed.
    fn mesh_contact_force_torque(&self, index: usize) -> (Vector3<f64>, Vector3<f64>);

    /// Allocate run-time state. Irreversible; no geometry may be added
    /// afterwards. The driver guarantees this is called exactly once.
    fn initialize(&mut self);

    /// Advance the simulation by `dt`, blocking until the step completes.
    fn advance(&mut self, dt: f64);

    /// Number of completed advances since initialization.
    fn steps_completed(&self) -> u64;

    fn particle_positions(&self) -> Vec<Point3<f64>>;

    fn particle_velocities(&self) -> Vec<Vector3<f64>>;
}
