//! Temporal boundary extension: synthetic frames prepended/appended so the
//! first and last frames of a volume can be the centered frame of some patch.

use anyhow::Result;
use ndarray::{concatenate, s, Array3, ArrayView3, Axis};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::StitchError;

/// How to make boundary frames eligible as patch centers.
///
/// `Repeat` and `Mirror` process the true boundary frames as if they were
/// interior frames with duplicated/reflected context. This is a workaround,
/// not the ideal solution; both modes emit a warning when applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryExtension {
    /// No extension. The first and last `patch.frames / 2` frames are never
    /// denoised and come back as zeros, reported in the coverage report.
    #[default]
    None,
    /// Prepend copies of the first frame and append copies of the last.
    Repeat,
    /// Prepend a reflection of the leading frames (excluding frame 0) and
    /// append a reflection of the trailing frames (excluding the last).
    Mirror,
}

impl BoundaryExtension {
    /// Frames added at each end of the temporal axis for a given patch depth.
    pub fn pad(&self, patch_frames: usize) -> usize {
        match self {
            Self::None => 0,
            Self::Repeat | Self::Mirror => patch_frames / 2,
        }
    }

    /// Extend the volume along the temporal axis. The result has
    /// `frames + 2 * pad(patch_frames)` frames.
    pub fn extend(
        &self,
        volume: ArrayView3<'_, f32>,
        patch_frames: usize,
    ) -> Result<Array3<f32>> {
        let pad = self.pad(patch_frames);
        if pad == 0 {
            return Ok(volume.to_owned());
        }

        warn!(
            mode = ?self,
            pad,
            "first and last frames will be processed with synthetic context; \
             results near the temporal boundary are approximate"
        );

        let frames = volume.dim().0;
        match self {
            Self::None => unreachable!("pad is zero for None"),
            Self::Repeat => {
                let first = volume.slice(s![0..1, .., ..]);
                let last = volume.slice(s![frames - 1..frames, .., ..]);
                let mut parts = Vec::with_capacity(2 * pad + 1);
                for _ in 0..pad {
                    parts.push(first);
                }
                parts.push(volume);
                for _ in 0..pad {
                    parts.push(last);
                }
                Ok(concatenate(Axis(0), &parts)?)
            }
            Self::Mirror => {
                if frames < pad + 1 {
                    return Err(StitchError::MirrorTooShort {
                        needed: pad + 1,
                        got: frames,
                    }
                    .into());
                }
                let head = volume.slice(s![1..=pad; -1, .., ..]);
                let tail = volume.slice(s![frames - 1 - pad..frames - 1; -1, .., ..]);
                Ok(concatenate(Axis(0), &[head, volume, tail])?)
            }
        }
    }

    /// Trim the frames added by [`extend`](Self::extend) off an assembled
    /// output, restoring the original frame count.
    pub fn trim(&self, volume: Array3<f32>, patch_frames: usize) -> Array3<f32> {
        let pad = self.pad(patch_frames);
        if pad == 0 {
            return volume;
        }
        let frames = volume.dim().0;
        volume.slice(s![pad..frames - pad, .., ..]).to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array3;

    /// Volume whose every voxel encodes its frame index.
    fn frame_indexed(frames: usize) -> Array3<f32> {
        Array3::from_shape_fn((frames, 2, 2), |(t, _, _)| t as f32)
    }

    #[test]
    fn test_none_is_a_no_op() {
        let volume = frame_indexed(10);
        let extended = BoundaryExtension::None.extend(volume.view(), 5).unwrap();
        assert_eq!(extended, volume);
        assert_eq!(BoundaryExtension::None.pad(5), 0);
    }

    #[test]
    fn test_repeat_duplicates_edge_frames() {
        let volume = frame_indexed(10);
        let extended = BoundaryExtension::Repeat.extend(volume.view(), 5).unwrap();
        assert_eq!(extended.dim(), (14, 2, 2));
        // Two copies of frame 0, then the volume, then two copies of frame 9.
        assert_eq!(extended[[0, 0, 0]], 0.0);
        assert_eq!(extended[[1, 0, 0]], 0.0);
        assert_eq!(extended[[2, 0, 0]], 0.0);
        assert_eq!(extended[[11, 0, 0]], 9.0);
        assert_eq!(extended[[12, 0, 0]], 9.0);
        assert_eq!(extended[[13, 0, 0]], 9.0);
    }

    #[test]
    fn test_mirror_reflects_interior_frames() {
        let volume = frame_indexed(10);
        let extended = BoundaryExtension::Mirror.extend(volume.view(), 5).unwrap();
        assert_eq!(extended.dim(), (14, 2, 2));
        // Prepended block is frames [1, 2] reversed; appended is [7, 8] reversed.
        assert_eq!(extended[[0, 0, 0]], 2.0);
        assert_eq!(extended[[1, 0, 0]], 1.0);
        assert_eq!(extended[[2, 0, 0]], 0.0);
        assert_eq!(extended[[11, 0, 0]], 9.0);
        assert_eq!(extended[[12, 0, 0]], 8.0);
        assert_eq!(extended[[13, 0, 0]], 7.0);
    }

    #[test]
    fn test_mirror_rejects_too_short_volume() {
        let volume = frame_indexed(2);
        let err = BoundaryExtension::Mirror
            .extend(volume.view(), 5)
            .unwrap_err();
        let err = err.downcast::<StitchError>().unwrap();
        assert!(matches!(
            err,
            StitchError::MirrorTooShort { needed: 3, got: 2 }
        ));
    }

    #[test]
    fn test_trim_restores_original_frame_count() {
        let volume = frame_indexed(10);
        for mode in [BoundaryExtension::Repeat, BoundaryExtension::Mirror] {
            let extended = mode.extend(volume.view(), 5).unwrap();
            let trimmed = mode.trim(extended, 5);
            assert_eq!(trimmed, volume);
        }
    }

    #[test]
    fn test_serde_lowercase_names() {
        #[derive(serde::Deserialize)]
        struct Probe {
            mode: BoundaryExtension,
        }
        let probe: Probe = toml::from_str("mode = \"mirror\"").unwrap();
        assert_eq!(probe.mode, BoundaryExtension::Mirror);
        let probe: Probe = toml::from_str("mode = \"none\"").unwrap();
        assert_eq!(probe.mode, BoundaryExtension::None);
    }
}
