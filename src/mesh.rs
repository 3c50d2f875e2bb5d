//! Mesh-soup bookkeeping and motion forwarding.
//!
//! Mesh soups are bulk-loaded exactly once before the finalize transition;
//! afterwards the controller only forwards prescribed poses to the engine
//! and reads back contact loads. The geometry itself is engine-owned.

use std::path::PathBuf;

use nalgebra::{Isometry3, Matrix3, Vector3};

use crate::engine::GranularEngine;
use crate::error::{Error, Result};

/// One mesh soup: file reference, rotation/scale, translation, and mass.
#[derive(Clone, Debug)]
pub struct MeshSoupEntry {
    pub file: PathBuf,
    pub rotscale: Matrix3<f64>,
    pub translation: Vector3<f64>,
    pub mass: f64,
}

impl MeshSoupEntry {
    /// Entry with a pure diagonal scaling and no translation.
    pub fn scaled(file: PathBuf, scale: Vector3<f64>, mass: f64) -> Self {
        Self {
            file,
            rotscale: Matrix3::from_diagonal(&scale),
            translation: Vector3::zeros(),
            mass,
        }
    }
}

/// Tracks the fixed mesh-soup collection and validates per-frame calls.
#[derive(Default)]
pub struct MeshMotionController {
    entries: Vec<MeshSoupEntry>,
    loaded: bool,
}

impl MeshMotionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[MeshSoupEntry] {
        &self.entries
    }

    /// Bulk-load the mesh collection. Callable exactly once; every file must
    /// resolve on disk before anything is handed to the engine.
    pub fn load(
        &mut self,
        engine: &mut dyn GranularEngine,
        entries: Vec<MeshSoupEntry>,
    ) -> Result<()> {
        if self.loaded {
            return Err(Error::Precondition(
                "mesh soups were already loaded".to_string(),
            ));
        }
        for entry in &entries {
            if !entry.file.exists() {
                return Err(Error::MeshLoad {
                    path: entry.file.clone(),
                });
            }
        }
        engine.load_meshes(&entries)?;
        self.entries = entries;
        self.loaded = true;
        Ok(())
    }

    /// Prescribe pose and velocities of one mesh for the upcoming step.
    pub fn apply_motion(
        &mut self,
        engine: &mut dyn GranularEngine,
        index: usize,
        pose: Isometry3<f64>,
        linear_velocity: Vector3<f64>,
        angular_velocity: Vector3<f64>,
    ) -> Result<()> {
        self.check_index(index)?;
        engine.apply_mesh_motion(index, pose, linear_velocity, angular_velocity);
        Ok(())
    }

    /// Contact force and torque the particles exert on one mesh. Undefined
    /// until the engine has completed at least one step.
    pub fn contact_force_torque(
        &self,
        engine: &dyn GranularEngine,
        index: usize,
    ) -> Result<(Vector3<f64>, Vector3<f64>)> {
        self.check_index(index)?;
        if engine.steps_completed() == 0 {
            return Err(Error::Precondition(
                "mesh contact forces are undefined before the first step".to_string(),
            ));
        }
        Ok(engine.mesh_contact_force_torque(index))
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.entries.len() {
            return Err(Error::Precondition(format!(
                "mesh index {index} out of range ({} loaded)",
                self.entries.len()
            )));
        }
        Ok(())
    }
}
