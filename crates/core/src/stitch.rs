//! Output assembly: each denoised patch's authoritative center-frame
//! sub-region is written into a NaN-initialized buffer. Destination regions
//! of distinct placements are disjoint by construction, so writes commute
//! and patches may arrive in any order and any batch grouping.

use ndarray::{s, Array3, ArrayView3};
use tracing::warn;

use crate::coords::PlacementRecord;
use crate::error::StitchError;
use crate::types::{PatchShape, VolumeShape};

/// Voxels never written by any placement, discovered when sentinels are
/// resolved. Expected to be non-empty only for un-centerable boundary frames
/// under `BoundaryExtension::None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CoverageReport {
    pub uncovered_voxels: usize,
    /// Frames containing at least one uncovered voxel.
    pub uncovered_frames: Vec<usize>,
}

impl CoverageReport {
    pub fn is_complete(&self) -> bool {
        self.uncovered_voxels == 0
    }
}

/// Owns the output buffer during stitching. No other component writes to it.
pub struct Stitcher {
    output: Array3<f32>,
    patch: PatchShape,
}

impl Stitcher {
    /// Allocate a sentinel-filled buffer matching the (possibly extended)
    /// input volume shape.
    pub fn new(volume: VolumeShape, patch: PatchShape) -> Self {
        Self {
            output: Array3::from_elem(volume, f32::NAN),
            patch,
        }
    }

    /// Copy the authoritative sub-region of one denoised patch's center
    /// frame into the output at its absolute coordinates.
    pub fn write(
        &mut self,
        record: &PlacementRecord,
        denoised: ArrayView3<'_, f32>,
    ) -> Result<(), StitchError> {
        let expected = (self.patch.frames, self.patch.height, self.patch.width);
        if denoised.dim() != expected {
            return Err(StitchError::ShapeMismatch {
                expected: vec![expected.0, expected.1, expected.2],
                got: denoised.shape().to_vec(),
            });
        }

        let center = record.stack_start_s + self.patch.center();
        let source = denoised.slice(s![
            self.patch.center(),
            record.patch_start_h..record.patch_end_h,
            record.patch_start_w..record.patch_end_w
        ]);
        self.output
            .slice_mut(s![
                center,
                record.stack_start_h..record.stack_end_h,
                record.stack_start_w..record.stack_end_w
            ])
            .assign(&source);
        Ok(())
    }

    /// Hand the assembled buffer downstream. Sentinels are still present;
    /// resolve them with [`resolve_sentinels`] after any trimming.
    pub fn into_volume(self) -> Array3<f32> {
        self.output
    }
}

/// Replace leftover sentinel voxels with zero and report where they were.
/// The external consumer never sees a NaN.
pub fn resolve_sentinels(volume: &mut Array3<f32>) -> CoverageReport {
    let mut report = CoverageReport::default();
    for (frame_idx, mut frame) in volume.outer_iter_mut().enumerate() {
        let mut missing = 0;
        for voxel in frame.iter_mut() {
            if voxel.is_nan() {
                *voxel = 0.0;
                missing += 1;
            }
        }
        if missing > 0 {
            report.uncovered_voxels += missing;
            report.uncovered_frames.push(frame_idx);
        }
    }
    if !report.is_complete() {
        warn!(
            uncovered_voxels = report.uncovered_voxels,
            uncovered_frames = ?report.uncovered_frames,
            "stitched output has uncovered voxels; reported as zero"
        );
    }
    report
}
