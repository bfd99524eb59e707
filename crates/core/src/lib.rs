//! Patch-tiling and stitching engine for volumetric denoising.
//!
//! Decomposes a (frame, row, column) volume into overlapping 3D patches,
//! runs each batch through a [`PatchDenoiser`], and reassembles a seam-free
//! full-resolution volume from the per-patch outputs. Only the center frame
//! of each patch is trusted; neighboring frames are context.

pub mod backend;
pub mod boundary;
pub mod config;
pub mod coords;
pub mod denoiser;
pub mod error;
pub mod logging;
pub mod normalize;
pub mod pipeline;
pub mod stitch;
pub mod types;

pub use boundary::BoundaryExtension;
pub use config::StitchConfig;
pub use coords::{extract_patch, PlacementGrid, PlacementRecord};
pub use denoiser::{IdentityDenoiser, PatchDenoiser};
pub use error::StitchError;
pub use normalize::NormalizationParams;
pub use pipeline::{denoise_volume, run_stitched, DenoiseOutput};
pub use stitch::{resolve_sentinels, CoverageReport, Stitcher};
pub use types::{PatchInterval, PatchShape, VolumeShape};
