use thiserror::Error;

/// Fatal errors raised before or during stitched denoising.
///
/// Coverage gaps are not errors: they are expected under
/// `BoundaryExtension::None` and are reported through
/// [`crate::stitch::CoverageReport`] instead.
#[derive(Debug, Error)]
pub enum StitchError {
    /// Patch geometry cannot fit the volume, even after boundary extension.
    /// Only the temporal axis can be extended; spatial axes never are.
    #[error("patch {axis} extent {patch} exceeds volume {axis} extent {volume} and boundary extension cannot cover it")]
    PatchExceedsVolume {
        axis: &'static str,
        patch: usize,
        volume: usize,
    },

    /// A spatial stride larger than the patch would leave uncovered strips.
    #[error("patch interval {interval} exceeds patch extent {patch} on the {axis} axis; tiling would leave gaps")]
    IntervalExceedsPatch {
        axis: &'static str,
        interval: usize,
        patch: usize,
    },

    /// Mirror extension reflects interior frames, so it needs more of them
    /// than the requested pad.
    #[error("mirror extension needs at least {needed} frames, volume has {got}")]
    MirrorTooShort { needed: usize, got: usize },

    #[error("patch shape and interval must be positive on every axis")]
    ZeroExtent,

    #[error("batch size must be positive")]
    ZeroBatchSize,

    /// The inference collaborator returned an array inconsistent with the
    /// request. Never silently truncated or padded.
    #[error("denoised output shape {got:?} does not match requested shape {expected:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_axis() {
        let err = StitchError::PatchExceedsVolume {
            axis: "row",
            patch: 64,
            volume: 32,
        };
        let msg = err.to_string();
        assert!(msg.contains("row"));
        assert!(msg.contains("64"));
        assert!(msg.contains("32"));
    }

    #[test]
    fn test_shape_mismatch_reports_both_shapes() {
        let err = StitchError::ShapeMismatch {
            expected: vec![4, 5, 64, 64],
            got: vec![4, 5, 64, 63],
        };
        let msg = err.to_string();
        assert!(msg.contains("[4, 5, 64, 64]"));
        assert!(msg.contains("[4, 5, 64, 63]"));
    }
}
