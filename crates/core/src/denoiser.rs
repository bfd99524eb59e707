//! Seam to the inference collaborator.

use anyhow::Result;
use ndarray::{Array4, ArrayView4};

/// A model that denoises a batch of 3D patches.
///
/// Input and output are `(batch, frames, height, width)`; implementations
/// must return one output patch per input patch with identical extents, and
/// must be callable repeatedly with no shared state between calls. Only the
/// center frame of each output patch is kept by the stitcher.
pub trait PatchDenoiser {
    fn denoise(&mut self, batch: ArrayView4<'_, f32>) -> Result<Array4<f32>>;
}

/// Returns its input unchanged. Useful for wiring and coverage tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct IdentityDenoiser;

impl PatchDenoiser for IdentityDenoiser {
    fn denoise(&mut self, batch: ArrayView4<'_, f32>) -> Result<Array4<f32>> {
        Ok(batch.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array4;

    #[test]
    fn test_identity_preserves_batch() {
        let batch = Array4::from_shape_fn((2, 3, 4, 4), |(b, t, r, c)| {
            (b * 100 + t * 10 + r + c) as f32
        });
        let mut denoiser = IdentityDenoiser;
        let out = denoiser.denoise(batch.view()).unwrap();
        assert_eq!(out, batch);
    }
}
