use super::{Footprint, LayerSampler};

/// Hexagonal close-packed layer sampler.
///
/// Rows are `spacing * sqrt(3) / 2` apart with odd rows shifted by half a
/// spacing, so every point is exactly `spacing` away from its six nearest
/// neighbors. Fully deterministic.
pub struct HcpSampler {
    spacing: f64,
}

impl HcpSampler {
    pub fn new(spacing: f64) -> Self {
        Self { spacing }
    }
}

impl LayerSampler for HcpSampler {
    fn min_spacing(&self) -> f64 {
        self.spacing
    }

    fn sample_layer(&mut self, footprint: Footprint) -> Vec<[f64; 2]> {
        let d = self.spacing;
        let (half_x, half_y) = footprint.half_extents();
        if !(d > 0.0) || !(half_x > 0.0) || !(half_y > 0.0) {
            return Vec::new();
        }

        let row_step = d * 3.0f64.sqrt() / 2.0;
        let mut points = Vec::new();
        let mut row = 0u64;
        loop {
            let y = -half_y + row as f64 * row_step;
            if y > half_y {
                break;
            }
            let x_start = if row % 2 == 1 { -half_x + d / 2.0 } else { -half_x };
            let mut col = 0u64;
            loop {
                let x = x_start + col as f64 * d;
                if x > half_x {
                    break;
                }
                if footprint.contains(x, y) {
                    points.push([x, y]);
                }
                col += 1;
            }
            row += 1;
        }
        points
    }
}
