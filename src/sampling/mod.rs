//! Initial particle placement.
//!
//! A fill volume is populated one horizontal layer at a time, bottom to
//! top. Each layer is sampled independently in the XY plane by a
//! [`LayerSampler`]; layer ordering is stable but the order of points
//! within a layer is sampler-defined.

pub use hcp::HcpSampler;
pub use poisson_disc::PoissonDiscSampler;

mod hcp;
mod poisson_disc;

use nalgebra::{point, Point3};

/// Horizontal cross-section of a fill volume, centered at the origin.
#[derive(Copy, Clone, Debug)]
pub enum Footprint {
    Rect { half_x: f64, half_y: f64 },
    Disc { radius: f64 },
}

impl Footprint {
    pub fn contains(&self, x: f64, y: f64) -> bool {
        match *self {
            Footprint::Rect { half_x, half_y } => x.abs() <= half_x && y.abs() <= half_y,
            Footprint::Disc { radius } => x * x + y * y <= radius * radius,
        }
    }

    /// Half-extents of the bounding rectangle.
    pub fn half_extents(&self) -> (f64, f64) {
        match *self {
            Footprint::Rect { half_x, half_y } => (half_x, half_y),
            Footprint::Disc { radius } => (radius, radius),
        }
    }
}

/// Produces one layer of non-overlapping XY sample points.
pub trait LayerSampler {
    /// Minimum distance guaranteed between any two samples of one layer.
    fn min_spacing(&self) -> f64;

    fn sample_layer(&mut self, footprint: Footprint) -> Vec<[f64; 2]>;
}

/// Layered fill plan: `[bottom, top)` along Z over a fixed footprint.
#[derive(Copy, Clone, Debug)]
pub struct LayeredFill {
    pub bottom: f64,
    pub top: f64,
    pub layer_spacing: f64,
    pub footprint: Footprint,
}

impl LayeredFill {
    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }

    /// Number of layers that will be generated. A non-positive height
    /// yields zero layers rather than an error.
    pub fn layer_count(&self) -> usize {
        let h = self.height();
        if h <= 0.0 || !(self.layer_spacing > 0.0) {
            0
        } else {
            (h / self.layer_spacing).ceil() as usize
        }
    }

    /// Generate all candidate positions, bottom layer first.
    pub fn generate(&self, sampler: &mut dyn LayerSampler) -> Vec<Point3<f64>> {
        let mut points = Vec::new();
        for layer in 0..self.layer_count() {
            let z = self.bottom + layer as f64 * self.layer_spacing;
            log::debug!("sampling fill layer {layer} at z = {z}");
            for s in sampler.sample_layer(self.footprint) {
                points.push(point![s[0], s[1], z]);
            }
        }
        points
    }
}
