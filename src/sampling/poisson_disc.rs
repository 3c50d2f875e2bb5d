use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;
use rstar::RTree;

use super::{Footprint, LayerSampler};

/// Candidates generated around an accepted point before it is retired.
const CANDIDATES_PER_POINT: usize = 30;

/// Blue-noise layer sampler (Bridson's algorithm).
///
/// Grows a point set from a random seed point; every accepted point is at
/// least `spacing` away from all others. The RNG is deterministic, so a
/// given (spacing, seed) pair always produces the same layers in the same
/// order across runs.
pub struct PoissonDiscSampler {
    spacing: f64,
    rng: Pcg64Mcg,
}

impl PoissonDiscSampler {
    pub fn new(spacing: f64, seed: u64) -> Self {
        Self {
            spacing,
            rng: Pcg64Mcg::seed_from_u64(seed),
        }
    }
}

impl LayerSampler for PoissonDiscSampler {
    fn min_spacing(&self) -> f64 {
        self.spacing
    }

    fn sample_layer(&mut self, footprint: Footprint) -> Vec<[f64; 2]> {
        let r = self.spacing;
        let (half_x, half_y) = footprint.half_extents();
        if !(r > 0.0) || !(half_x > 0.0) || !(half_y > 0.0) {
            return Vec::new();
        }

        let mut accepted: Vec<[f64; 2]> = Vec::new();
        let mut tree: RTree<[f64; 2]> = RTree::new();
        // Indices into `accepted` that may still spawn neighbors.
        let mut active: Vec<usize> = Vec::new();

        // Every footprint contains the origin, so this terminates.
        let first = loop {
            let x = self.rng.random_range(-half_x..=half_x);
            let y = self.rng.random_range(-half_y..=half_y);
            if footprint.contains(x, y) {
                break [x, y];
            }
        };
        tree.insert(first);
        active.push(0);
        accepted.push(first);

        while !active.is_empty() {
            let slot = self.rng.random_range(0..active.len());
            let base = accepted[active[slot]];
            let mut spawned = false;

            for _ in 0..CANDIDATES_PER_POINT {
                let angle = self.rng.random_range(0.0..std::f64::consts::TAU);
                let dist = self.rng.random_range(r..2.0 * r);
                let cand = [base[0] + dist * angle.cos(), base[1] + dist * angle.sin()];
                if !footprint.contains(cand[0], cand[1]) {
                    continue;
                }
                if tree.locate_within_distance(cand, r * r).next().is_some() {
                    continue;
                }
                tree.insert(cand);
                active.push(accepted.len());
                accepted.push(cand);
                spawned = true;
                break;
            }

            if !spawned {
                active.swap_remove(slot);
            }
        }

        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_spacing_yields_no_samples() {
        let mut sampler = PoissonDiscSampler::new(0.0, 1);
        assert!(sampler
            .sample_layer(Footprint::Disc { radius: 2.0 })
            .is_empty());
    }

    #[test]
    fn all_samples_land_inside_the_footprint() {
        let mut sampler = PoissonDiscSampler::new(0.4, 5);
        let layer = sampler.sample_layer(Footprint::Rect {
            half_x: 2.0,
            half_y: 1.0,
        });
        assert!(!layer.is_empty());
        for p in &layer {
            assert!(p[0].abs() <= 2.0 && p[1].abs() <= 1.0);
        }
    }

    #[test]
    fn coverage_is_dense_enough_to_be_useful() {
        // A 12x12 square at spacing 1 fits at most ~144 disjoint discs; a
        // maximal sample should land well above a sparse scatter.
        let mut sampler = PoissonDiscSampler::new(1.0, 11);
        let layer = sampler.sample_layer(Footprint::Rect {
            half_x: 6.0,
            half_y: 6.0,
        });
        assert!(layer.len() > 80, "only {} samples", layer.len());
    }
}
