//! Boundary-condition bookkeeping.
//!
//! The registry owns lifecycle state only; the geometry itself lives inside
//! the engine once registered. Handles are arena indices, never pointers.

use nalgebra::{Point3, Vector3};

use crate::engine::BcId;
use crate::error::{Error, Result};

/// Opaque identifier for a registered boundary condition.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BoundaryHandle(pub(crate) usize);

impl BoundaryHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Analytic boundary shapes supported by the driver.
#[derive(Copy, Clone, Debug)]
pub enum BcShape {
    Plane {
        point: Point3<f64>,
        normal: Vector3<f64>,
    },
    CylinderZ {
        center: Point3<f64>,
        radius: f64,
    },
    /// Cone opening upward along +Z from `tip`, active for heights in
    /// `[hmin, hmax]`. The surface radius at height `z` is
    /// `slope * (z - tip.z)`.
    ConeZ {
        tip: Point3<f64>,
        slope: f64,
        hmax: f64,
        hmin: f64,
    },
}

#[derive(Clone, Debug)]
struct BoundaryRecord {
    shape: BcShape,
    engine_id: BcId,
    tracked: bool,
    enabled: bool,
}

/// Arena of boundary-condition records.
#[derive(Default)]
pub struct BoundaryRegistry {
    records: Vec<BoundaryRecord>,
}

impl BoundaryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn register(&mut self, shape: BcShape, engine_id: BcId, tracked: bool) -> BoundaryHandle {
        self.records.push(BoundaryRecord {
            shape,
            engine_id,
            tracked,
            enabled: true,
        });
        BoundaryHandle(self.records.len() - 1)
    }

    /// Mark a boundary disabled. Returns `Ok(true)` when this call performed
    /// the transition and `Ok(false)` when the boundary was already disabled;
    /// disabling twice is not an error. There is no re-enable path.
    pub fn disable(&mut self, handle: BoundaryHandle) -> Result<bool> {
        let record = self.record_mut(handle)?;
        let newly = record.enabled;
        record.enabled = false;
        Ok(newly)
    }

    pub fn is_enabled(&self, handle: BoundaryHandle) -> Result<bool> {
        Ok(self.record(handle)?.enabled)
    }

    pub fn is_tracked(&self, handle: BoundaryHandle) -> Result<bool> {
        Ok(self.record(handle)?.tracked)
    }

    pub fn engine_id(&self, handle: BoundaryHandle) -> Result<BcId> {
        Ok(self.record(handle)?.engine_id)
    }

    pub fn shape(&self, handle: BoundaryHandle) -> Result<BcShape> {
        Ok(self.record(handle)?.shape)
    }

    /// Handle and engine id of every force-tracked boundary still enabled.
    pub fn tracked_enabled(&self) -> Vec<(BoundaryHandle, BcId)> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.tracked && r.enabled)
            .map(|(i, r)| (BoundaryHandle(i), r.engine_id))
            .collect()
    }

    fn record(&self, handle: BoundaryHandle) -> Result<&BoundaryRecord> {
        self.records.get(handle.0).ok_or_else(|| {
            Error::Precondition(format!("boundary handle {} out of range", handle.0))
        })
    }

    fn record_mut(&mut self, handle: BoundaryHandle) -> Result<&mut BoundaryRecord> {
        self.records.get_mut(handle.0).ok_or_else(|| {
            Error::Precondition(format!("boundary handle {} out of range", handle.0))
        })
    }
}
