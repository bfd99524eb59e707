//! Stitched-denoising configuration: patch geometry, batching, and the
//! temporal boundary extension mode.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::boundary::BoundaryExtension;
use crate::error::StitchError;
use crate::types::{PatchInterval, PatchShape, VolumeShape};

pub const DEFAULT_PATCH_SHAPE: [usize; 3] = [61, 64, 64];
pub const DEFAULT_PATCH_INTERVAL: [usize; 3] = [1, 32, 32];
pub const DEFAULT_BATCH_SIZE: usize = 16;

/// Configuration surface exposed to the caller. Axis order is
/// (frame, row, column) throughout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StitchConfig {
    pub patch_shape: [usize; 3],
    pub patch_interval: [usize; 3],
    /// Patches per inference call. Lower it if memory is exceeded.
    pub batch_size: usize,
    pub boundary_extension: BoundaryExtension,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            patch_shape: DEFAULT_PATCH_SHAPE,
            patch_interval: DEFAULT_PATCH_INTERVAL,
            batch_size: DEFAULT_BATCH_SIZE,
            boundary_extension: BoundaryExtension::default(),
        }
    }
}

impl StitchConfig {
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let raw = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, raw)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    pub fn patch_shape(&self) -> PatchShape {
        self.patch_shape.into()
    }

    pub fn patch_interval(&self) -> PatchInterval {
        self.patch_interval.into()
    }

    /// Reject geometry the tiling cannot satisfy, before any processing
    /// starts. Boundary extension can cover a too-short temporal axis but
    /// never the spatial axes.
    pub fn validate(&self, volume: VolumeShape) -> Result<(), StitchError> {
        let patch = self.patch_shape();
        let interval = self.patch_interval();
        let (frames, height, width) = volume;

        if patch.frames == 0
            || patch.height == 0
            || patch.width == 0
            || interval.frames == 0
            || interval.height == 0
            || interval.width == 0
        {
            return Err(StitchError::ZeroExtent);
        }
        if self.batch_size == 0 {
            return Err(StitchError::ZeroBatchSize);
        }

        if patch.height > height {
            return Err(StitchError::PatchExceedsVolume {
                axis: "row",
                patch: patch.height,
                volume: height,
            });
        }
        if patch.width > width {
            return Err(StitchError::PatchExceedsVolume {
                axis: "column",
                patch: patch.width,
                volume: width,
            });
        }
        if interval.height > patch.height {
            return Err(StitchError::IntervalExceedsPatch {
                axis: "row",
                interval: interval.height,
                patch: patch.height,
            });
        }
        if interval.width > patch.width {
            return Err(StitchError::IntervalExceedsPatch {
                axis: "column",
                interval: interval.width,
                patch: patch.width,
            });
        }

        let pad = self.boundary_extension.pad(patch.frames);
        if patch.frames > frames + 2 * pad {
            return Err(StitchError::PatchExceedsVolume {
                axis: "frame",
                patch: patch.frames,
                volume: frames,
            });
        }
        if self.boundary_extension == BoundaryExtension::Mirror && frames < pad + 1 {
            return Err(StitchError::MirrorTooShort {
                needed: pad + 1,
                got: frames,
            });
        }

        Ok(())
    }
}
