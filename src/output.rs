//! File output: per-frame particle snapshots and the one-shot mesh layout.

use std::fs;
use std::path::{Path, PathBuf};

use nalgebra::{Point3, Vector3};

use crate::config::WriteMode;
use crate::error::Result;

/// Writes one CSV snapshot per rendered frame into a fixed directory.
pub struct SnapshotWriter {
    dir: PathBuf,
    mode: WriteMode,
}

impl SnapshotWriter {
    /// Creates the output directory if absent. An unwritable directory is a
    /// fatal error surfaced immediately, before any stepping happens.
    pub fn new(dir: &Path, mode: WriteMode) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
            mode,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn mode(&self) -> WriteMode {
        self.mode
    }

    /// Write the snapshot for `frame`, named `step{frame:06}.csv`. Returns
    /// the path written, or `None` when output is turned off.
    pub fn write_snapshot(
        &self,
        frame: u64,
        positions: &[Point3<f64>],
        velocities: &[Vector3<f64>],
    ) -> Result<Option<PathBuf>> {
        if self.mode == WriteMode::None {
            return Ok(None);
        }
        let path = self.dir.join(format!("step{frame:06}.csv"));
        let mut writer = csv::Writer::from_path(&path)?;

        match self.mode {
            WriteMode::Csv => {
                writer.write_record(["x", "y", "z"])?;
                for p in positions {
                    writer.write_record([p.x.to_string(), p.y.to_string(), p.z.to_string()])?;
                }
            }
            WriteMode::CsvWithVelocity => {
                writer.write_record(["x", "y", "z", "vx", "vy", "vz"])?;
                for (p, v) in positions.iter().zip(velocities) {
                    writer.write_record([
                        p.x.to_string(),
                        p.y.to_string(),
                        p.z.to_string(),
                        v.x.to_string(),
                        v.y.to_string(),
                        v.z.to_string(),
                    ])?;
                }
            }
            WriteMode::None => unreachable!(),
        }

        writer.flush()?;
        Ok(Some(path))
    }
}

/// One row of the mesh layout file: where a visualizer should place a mesh.
#[derive(Clone, Debug)]
pub struct MeshLayoutRow {
    pub mesh_name: String,
    pub position: Point3<f64>,
    pub basis: [Vector3<f64>; 3],
    pub scale: Vector3<f64>,
}

impl MeshLayoutRow {
    /// Row with the world axes as basis vectors.
    pub fn axis_aligned(mesh_name: &str, position: Point3<f64>, scale: Vector3<f64>) -> Self {
        Self {
            mesh_name: mesh_name.to_string(),
            position,
            basis: [Vector3::x(), Vector3::y(), Vector3::z()],
            scale,
        }
    }
}

/// Write the mesh layout description: mesh name, position, three basis
/// vectors, and the scale triple, one row per mesh.
pub fn write_mesh_layout(path: &Path, rows: &[MeshLayoutRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "mesh_name", "dx", "dy", "dz", "x1", "x2", "x3", "y1", "y2", "y3", "z1", "z2", "z3",
        "sx", "sy", "sz",
    ])?;
    for row in rows {
        let mut record = vec![row.mesh_name.clone()];
        record.extend(row.position.iter().map(|c| c.to_string()));
        for basis in &row.basis {
            record.extend(basis.iter().map(|c| c.to_string()));
        }
        record.extend(row.scale.iter().map(|c| c.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
