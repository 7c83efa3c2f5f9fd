use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{GeometryError, Result};
use crate::math::Point3;
use crate::registry::SurfaceRegistry;
use crate::rule::HeadRule;

/// Volume estimates of a set of regions.
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeEstimate {
    /// Estimated volume of each region, in input order.
    pub per_region: Vec<f64>,
    /// Estimated volume of the union of all regions.
    pub union: f64,
}

impl VolumeEstimate {
    /// Sum of the individual volumes minus the union: the doubly counted
    /// volume.
    #[must_use]
    pub fn overlap(&self) -> f64 {
        self.per_region.iter().sum::<f64>() - self.union
    }
}

/// Estimates region volumes by uniform sampling of an axis-aligned box.
///
/// Sampling is seeded, so repeated runs give identical estimates.
pub struct SampleVolume {
    min: Point3,
    max: Point3,
    samples: usize,
    seed: u64,
}

impl SampleVolume {
    /// Creates a new `SampleVolume` query over the box `[min, max]`.
    #[must_use]
    pub fn new(min: Point3, max: Point3) -> Self {
        Self {
            min,
            max,
            samples: 100_000,
            seed: 0,
        }
    }

    #[must_use]
    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Executes the query.
    ///
    /// # Errors
    ///
    /// Returns an error if the box is empty, no samples are requested, or a
    /// region refers to an unregistered surface.
    #[allow(clippy::cast_precision_loss)]
    pub fn execute(
        &self,
        regions: &[&HeadRule],
        surfaces: &SurfaceRegistry,
    ) -> Result<VolumeEstimate> {
        let extent = self.max - self.min;
        if extent.iter().any(|&e| e <= 0.0) || self.samples == 0 {
            return Err(GeometryError::Degenerate("empty sampling box".into()).into());
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut hits = vec![0_usize; regions.len()];
        let mut union_hits = 0_usize;
        for _ in 0..self.samples {
            let p = Point3::new(
                rng.gen_range(self.min.x..self.max.x),
                rng.gen_range(self.min.y..self.max.y),
                rng.gen_range(self.min.z..self.max.z),
            );
            let mut any = false;
            for (count, region) in hits.iter_mut().zip(regions) {
                if region.is_valid(&p, surfaces)? {
                    *count += 1;
                    any = true;
                }
            }
            if any {
                union_hits += 1;
            }
        }

        let cell = extent.x * extent.y * extent.z / self.samples as f64;
        Ok(VolumeEstimate {
            per_region: hits.iter().map(|&h| h as f64 * cell).collect(),
            union: union_hits as f64 * cell,
        })
    }
}
