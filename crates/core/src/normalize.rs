//! Z-score normalization captured at load time and its reversal applied to
//! the assembled output. Both directions are pure: same input, same output.

use anyhow::{bail, Result};
use ndarray::{Array2, Array3, ArrayView3, Axis};

/// Floor for standard deviations so constant regions do not divide by zero.
const STD_EPSILON: f32 = 1e-6;

/// Mean/std captured when the input volume was normalized. Used to reverse
/// the z-score after stitching: `x * std + mean`.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizationParams {
    /// One mean/std for the whole volume.
    Global { mean: f32, std: f32 },
    /// Per-pixel mean/std taken over the temporal axis.
    PerPixel { mean: Array2<f32>, std: Array2<f32> },
}

impl NormalizationParams {
    /// Identity parameters: normalize and denormalize are both no-ops.
    pub fn identity() -> Self {
        Self::Global {
            mean: 0.0,
            std: 1.0,
        }
    }

    /// Volume-wide mean and standard deviation.
    pub fn global(volume: ArrayView3<'_, f32>) -> Self {
        let count = volume.len() as f32;
        let mean = volume.sum() / count;
        let var = volume.mapv(|v| (v - mean) * (v - mean)).sum() / count;
        Self::Global {
            mean,
            std: var.sqrt().max(STD_EPSILON),
        }
    }

    /// Per-pixel mean and standard deviation over the temporal axis, the way
    /// the noisy stack is normalized at load time.
    pub fn per_pixel(volume: ArrayView3<'_, f32>) -> Self {
        let frames = volume.dim().0 as f32;
        let mean = volume.sum_axis(Axis(0)) / frames;
        let mut var = Array2::<f32>::zeros(mean.dim());
        for frame in volume.outer_iter() {
            var += &(&frame - &mean).mapv(|v| v * v);
        }
        var /= frames;
        Self::PerPixel {
            mean,
            std: var.mapv(|v| v.sqrt().max(STD_EPSILON)),
        }
    }

    fn check_plane(&self, volume: &ArrayView3<'_, f32>) -> Result<()> {
        if let Self::PerPixel { mean, .. } = self {
            let (_, height, width) = volume.dim();
            if mean.dim() != (height, width) {
                bail!(
                    "per-pixel normalization plane {:?} does not match volume plane ({height}, {width})",
                    mean.dim()
                );
            }
        }
        Ok(())
    }

    /// Forward z-score: `(x - mean) / std`.
    pub fn normalize(&self, volume: ArrayView3<'_, f32>) -> Result<Array3<f32>> {
        self.check_plane(&volume)?;
        match self {
            Self::Global { mean, std } => Ok(volume.mapv(|v| (v - mean) / std)),
            Self::PerPixel { mean, std } => {
                let mut out = volume.to_owned();
                for mut frame in out.outer_iter_mut() {
                    frame -= mean;
                    frame /= std;
                }
                Ok(out)
            }
        }
    }

    /// Reverse the z-score: `x * std + mean`. Applied once, after stitching.
    pub fn denormalize(&self, volume: ArrayView3<'_, f32>) -> Result<Array3<f32>> {
        self.check_plane(&volume)?;
        match self {
            Self::Global { mean, std } => Ok(volume.mapv(|v| v * std + mean)),
            Self::PerPixel { mean, std } => {
                let mut out = volume.to_owned();
                for mut frame in out.outer_iter_mut() {
                    frame *= std;
                    frame += mean;
                }
                Ok(out)
            }
        }
    }
}
