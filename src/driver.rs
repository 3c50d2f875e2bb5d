//! The time-stepping driver and its state machine.
//!
//! A driver owns one engine plus the bookkeeping around it and walks the
//! states `Configuring -> Finalized -> Running -> Done`. Geometry goes in
//! while `Configuring`; [`SimulationDriver::initialize`] is the
//! irreversible finalize transition; [`SimulationDriver::run_with_hook`]
//! then executes the fixed-step loop to completion.
//!
//! Each iteration is strictly sequenced: scheduled boundary removals,
//! the per-step hook (mesh motion), tracked reaction-force queries, one
//! blocking advance, then capture/frame accounting and snapshot output.
//! Force values read in iteration `i` therefore always reflect the state
//! at the end of iteration `i - 1`.

use log::{info, warn};
use nalgebra::{Isometry3, Point3, Vector3};

use crate::boundary::{BcShape, BoundaryHandle, BoundaryRegistry};
use crate::config::{SimulationParams, F_CGS_TO_SI};
use crate::engine::GranularEngine;
use crate::error::{Error, Result};
use crate::mesh::{MeshMotionController, MeshSoupEntry};
use crate::output::SnapshotWriter;

/// Driver lifecycle states.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DriverState {
    Configuring,
    Finalized,
    Running,
    Done,
}

/// Fixed-step simulated time.
///
/// Time is derived from the step counter instead of accumulated, so the
/// number of advances is exact: a run takes `floor(time_end / step_size)`
/// steps and the final partial step past `time_end` is never taken.
#[derive(Copy, Clone, Debug)]
pub struct SimulationClock {
    step_size: f64,
    steps_taken: u64,
    planned_steps: u64,
}

impl SimulationClock {
    pub fn new(step_size: f64, time_end: f64) -> Self {
        let planned_steps = if step_size > 0.0 && time_end > 0.0 {
            (time_end / step_size).floor() as u64
        } else {
            0
        };
        Self {
            step_size,
            steps_taken: 0,
            planned_steps,
        }
    }

    pub fn time(&self) -> f64 {
        self.steps_taken as f64 * self.step_size
    }

    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    pub fn planned_steps(&self) -> u64 {
        self.planned_steps
    }

    pub fn is_exhausted(&self) -> bool {
        self.steps_taken >= self.planned_steps
    }

    fn tick(&mut self) {
        self.steps_taken += 1;
    }
}

#[derive(Clone, Debug)]
struct ScheduledDisable {
    handle: BoundaryHandle,
    at_time: f64,
    fired: bool,
}

/// What a completed run did.
#[derive(Copy, Clone, Debug)]
pub struct RunSummary {
    pub steps_taken: u64,
    pub frames_rendered: u64,
    pub final_time: f64,
}

/// Owns the engine, registries, clock, and output cadence for one run.
pub struct SimulationDriver<E: GranularEngine> {
    engine: E,
    params: SimulationParams,
    boundaries: BoundaryRegistry,
    meshes: MeshMotionController,
    schedule: Vec<ScheduledDisable>,
    clock: SimulationClock,
    capture_count: u64,
    frame_count: u64,
    writer: SnapshotWriter,
    state: DriverState,
}

impl<E: GranularEngine> SimulationDriver<E> {
    /// Validates the parameters and creates the output directory up front;
    /// an unwritable directory fails here, before any stepping.
    pub fn new(engine: E, params: SimulationParams) -> Result<Self> {
        params.validate()?;
        let writer = SnapshotWriter::new(&params.output_dir, params.write_mode)?;
        let clock = SimulationClock::new(params.step_size, params.time_end);
        Ok(Self {
            engine,
            boundaries: BoundaryRegistry::new(),
            meshes: MeshMotionController::new(),
            schedule: Vec::new(),
            clock,
            capture_count: 0,
            frame_count: 0,
            writer,
            params,
            state: DriverState::Configuring,
        })
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn params(&self) -> &SimulationParams {
        &self.params
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn boundaries(&self) -> &BoundaryRegistry {
        &self.boundaries
    }

    pub fn meshes(&self) -> &MeshMotionController {
        &self.meshes
    }

    /// Hand the initial particle set to the engine.
    pub fn set_particles(&mut self, positions: &[Point3<f64>]) -> Result<()> {
        self.require_state(DriverState::Configuring, "set particles")?;
        self.engine.set_particles(positions);
        info!("registered {} particles", positions.len());
        Ok(())
    }

    pub fn create_bc_plane(
        &mut self,
        point: Point3<f64>,
        normal: Vector3<f64>,
        track_forces: bool,
    ) -> Result<BoundaryHandle> {
        self.require_state(DriverState::Configuring, "create a plane boundary")?;
        if !(normal.norm() > 0.0) {
            return Err(Error::Precondition(
                "plane normal must be non-zero".to_string(),
            ));
        }
        let normal = normal.normalize();
        let engine_id = self.engine.create_bc_plane(point, normal, track_forces);
        Ok(self
            .boundaries
            .register(BcShape::Plane { point, normal }, engine_id, track_forces))
    }

    pub fn create_bc_cylinder_z(
        &mut self,
        center: Point3<f64>,
        radius: f64,
        track_forces: bool,
    ) -> Result<BoundaryHandle> {
        self.require_state(DriverState::Configuring, "create a cylinder boundary")?;
        if !(radius > 0.0) {
            return Err(Error::Precondition(
                "cylinder radius must be > 0".to_string(),
            ));
        }
        let engine_id = self.engine.create_bc_cylinder_z(center, radius, track_forces);
        Ok(self
            .boundaries
            .register(BcShape::CylinderZ { center, radius }, engine_id, track_forces))
    }

    pub fn create_bc_cone_z(
        &mut self,
        tip: Point3<f64>,
        slope: f64,
        hmax: f64,
        hmin: f64,
        track_forces: bool,
    ) -> Result<BoundaryHandle> {
        self.require_state(DriverState::Configuring, "create a cone boundary")?;
        if !(slope > 0.0) {
            return Err(Error::Precondition("cone slope must be > 0".to_string()));
        }
        let engine_id = self
            .engine
            .create_bc_cone_z(tip, slope, hmax, hmin, track_forces);
        Ok(self.boundaries.register(
            BcShape::ConeZ {
                tip,
                slope,
                hmax,
                hmin,
            },
            engine_id,
            track_forces,
        ))
    }

    /// Bulk-load the mesh soups. Exactly once, before finalize.
    pub fn load_meshes(&mut self, entries: Vec<MeshSoupEntry>) -> Result<()> {
        self.require_state(DriverState::Configuring, "load meshes")?;
        self.meshes.load(&mut self.engine, entries)
    }

    /// Arrange for `handle` to be disabled on the first iteration whose
    /// simulated time strictly exceeds `at_time`. One-shot; never refires.
    pub fn schedule_disable(&mut self, handle: BoundaryHandle, at_time: f64) -> Result<()> {
        if self.state != DriverState::Configuring && self.state != DriverState::Finalized {
            return Err(Error::Precondition(
                "disables can only be scheduled before the run starts".to_string(),
            ));
        }
        // Validates the handle.
        self.boundaries.is_enabled(handle)?;
        self.schedule.push(ScheduledDisable {
            handle,
            at_time,
            fired: false,
        });
        Ok(())
    }

    /// Immediately disable a boundary. Idempotent.
    pub fn disable_boundary(&mut self, handle: BoundaryHandle) -> Result<()> {
        if self.boundaries.disable(handle)? {
            let engine_id = self.boundaries.engine_id(handle)?;
            self.engine.disable_bc(engine_id);
            info!(
                "disabled boundary {} ({:?})",
                handle.index(),
                self.boundaries.shape(handle)?
            );
        }
        Ok(())
    }

    /// Reaction force on a tracked boundary, `Ok(None)` when the boundary
    /// does not track forces. An unknown handle is a precondition violation.
    pub fn bc_reaction_force(&self, handle: BoundaryHandle) -> Result<Option<Vector3<f64>>> {
        let engine_id = self.boundaries.engine_id(handle)?;
        if !self.boundaries.is_tracked(handle)? {
            return Ok(None);
        }
        Ok(self.engine.bc_reaction_force(engine_id))
    }

    pub fn apply_mesh_motion(
        &mut self,
        index: usize,
        pose: Isometry3<f64>,
        linear_velocity: Vector3<f64>,
        angular_velocity: Vector3<f64>,
    ) -> Result<()> {
        if self.state == DriverState::Configuring {
            return Err(Error::Precondition(
                "mesh motion requires an initialized simulation".to_string(),
            ));
        }
        self.meshes
            .apply_motion(&mut self.engine, index, pose, linear_velocity, angular_velocity)
    }

    pub fn mesh_contact_force_torque(&self, index: usize) -> Result<(Vector3<f64>, Vector3<f64>)> {
        self.meshes.contact_force_torque(&self.engine, index)
    }

    /// The finalize transition. Irreversible: the engine allocates its
    /// run-time state and no geometry may be added afterwards.
    pub fn initialize(&mut self) -> Result<()> {
        self.require_state(DriverState::Configuring, "initialize")?;
        self.engine.initialize();
        self.state = DriverState::Finalized;
        info!(
            "initialized: {} steps of {} s planned, {} boundaries, {} meshes",
            self.clock.planned_steps(),
            self.clock.step_size(),
            self.boundaries.len(),
            self.meshes.len()
        );
        Ok(())
    }

    /// Run to completion with no per-step hook.
    pub fn run(&mut self) -> Result<RunSummary> {
        self.run_with_hook(|_, _, _| Ok(()))
    }

    /// Run to completion. The hook fires once per iteration before the
    /// advance and is where co-simulation scenarios prescribe mesh motion.
    pub fn run_with_hook<F>(&mut self, mut hook: F) -> Result<RunSummary>
    where
        F: FnMut(&mut MeshMotionController, &mut E, f64) -> Result<()>,
    {
        self.require_state(DriverState::Finalized, "run")?;
        self.state = DriverState::Running;

        while !self.clock.is_exhausted() {
            let now = self.clock.time();

            // One-shot timed boundary removals, strict comparison: a
            // boundary scheduled at t goes away on the first iteration
            // with time > t, not at t exactly.
            for slot in 0..self.schedule.len() {
                if !self.schedule[slot].fired && now > self.schedule[slot].at_time {
                    self.schedule[slot].fired = true;
                    let handle = self.schedule[slot].handle;
                    if self.boundaries.disable(handle)? {
                        let engine_id = self.boundaries.engine_id(handle)?;
                        self.engine.disable_bc(engine_id);
                        info!("t = {now:.6}: removed boundary {}", handle.index());
                    }
                }
            }

            hook(&mut self.meshes, &mut self.engine, now)?;

            for (handle, engine_id) in self.boundaries.tracked_enabled() {
                match self.engine.bc_reaction_force(engine_id) {
                    Some(force) => info!(
                        "t = {now:.6}: boundary {} reaction force = ({:.6e}, {:.6e}, {:.6e}) N",
                        handle.index(),
                        force.x * F_CGS_TO_SI,
                        force.y * F_CGS_TO_SI,
                        force.z * F_CGS_TO_SI,
                    ),
                    None => warn!(
                        "t = {now:.6}: reaction force query failed for boundary {}",
                        handle.index()
                    ),
                }
            }

            self.engine.advance(self.clock.step_size());
            self.clock.tick();

            self.capture_count += 1;
            if self.capture_count % u64::from(self.params.captures_per_frame) == 0 {
                self.render_frame()?;
            }
        }

        self.state = DriverState::Done;
        Ok(RunSummary {
            steps_taken: self.clock.steps_taken(),
            frames_rendered: self.frame_count,
            final_time: self.clock.time(),
        })
    }

    fn render_frame(&mut self) -> Result<()> {
        let positions = self.engine.particle_positions();
        let velocities = self.engine.particle_velocities();
        if let Some(path) = self
            .writer
            .write_snapshot(self.frame_count, &positions, &velocities)?
        {
            info!("rendered frame {} to {}", self.frame_count, path.display());
        }
        self.frame_count += 1;
        Ok(())
    }

    fn require_state(&self, expected: DriverState, what: &str) -> Result<()> {
        if self.state != expected {
            return Err(Error::Precondition(format!(
                "cannot {what} in state {:?} (expected {expected:?})",
                self.state
            )));
        }
        Ok(())
    }
}
