//! Probed bed-height samples

use super::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dimensions of the probing grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridShape {
    /// Number of columns (distinct X positions)
    pub width: usize,
    /// Number of rows (distinct Y positions)
    pub height: usize,
}

impl GridShape {
    /// Create a grid shape
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Number of samples a grid of this shape holds, `None` on overflow
    pub fn sample_count(&self) -> Option<usize> {
        self.width.checked_mul(self.height)
    }
}

impl Default for GridShape {
    fn default() -> Self {
        Self::new(3, 3)
    }
}

impl fmt::Display for GridShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// The probed bed-height sample set
///
/// Each sample is the `(x, y)` position that was probed and the `z` height
/// measured there. `z_probe_offset` is the probe offset that was configured
/// when the samples were taken.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LevelingData {
    /// Probe offset in effect while probing
    #[serde(default)]
    pub z_probe_offset: f64,
    /// Probed positions and heights
    pub samples: Vec<Vector3>,
}

impl LevelingData {
    /// Create leveling data from samples, probed with a zero probe offset
    pub fn new(samples: Vec<Vector3>) -> Self {
        Self {
            z_probe_offset: 0.0,
            samples,
        }
    }

    /// Set the probe offset in effect while probing
    pub fn with_probe_offset(mut self, z_probe_offset: f64) -> Self {
        self.z_probe_offset = z_probe_offset;
        self
    }

    /// Evenly spaced grid covering `min..=max` with every height set to `z`
    ///
    /// Samples are ordered row by row, starting at `min`.
    pub fn flat(shape: GridShape, min: (f64, f64), max: (f64, f64), z: f64) -> Self {
        Self::from_fn(shape, min, max, |_, _| z)
    }

    /// Evenly spaced grid covering `min..=max` with heights from `height(x, y)`
    pub fn from_fn(
        shape: GridShape,
        min: (f64, f64),
        max: (f64, f64),
        height: impl Fn(f64, f64) -> f64,
    ) -> Self {
        let step = |lo: f64, hi: f64, n: usize, i: usize| {
            if n < 2 {
                lo
            } else {
                lo + (hi - lo) * i as f64 / (n - 1) as f64
            }
        };

        let mut samples = Vec::with_capacity(shape.sample_count().unwrap_or(0));
        for row in 0..shape.height {
            let y = step(min.1, max.1, shape.height, row);
            for col in 0..shape.width {
                let x = step(min.0, max.0, shape.width, col);
                samples.push(Vector3::new(x, y, height(x, y)));
            }
        }
        Self::new(samples)
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when no samples were recorded
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// True when `other` holds exactly the same samples in the same order
    pub fn samples_are_same(&self, other: &[Vector3]) -> bool {
        self.samples.len() == other.len()
            && self.samples.iter().zip(other).all(|(a, b)| {
                a.x.to_bits() == b.x.to_bits()
                    && a.y.to_bits() == b.y.to_bits()
                    && a.z.to_bits() == b.z.to_bits()
            })
    }
}
