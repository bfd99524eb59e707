//! Placement geometry: partitions a volume into overlapping patches and
//! assigns each one the sub-region of the output plane it is authoritative
//! for. The authoritative regions of all placements sharing a temporal
//! center tile the (row, column) plane exactly — no gaps, no overlaps.

use ndarray::{s, Array3, ArrayView3};

use crate::error::StitchError;
use crate::types::{PatchInterval, PatchShape, VolumeShape};

/// Where one patch sits in the volume and which part of its output survives
/// stitching.
///
/// `stack_*` coordinates are absolute (volume frame); `patch_*` coordinates
/// are local to the patch. Both describe the same half-open region, so
/// `stack_end_h - stack_start_h == patch_end_h - patch_start_h` and the
/// width analogue hold for every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacementRecord {
    /// First frame of the patch window. The trusted output frame is
    /// `stack_start_s + patch.center()`.
    pub stack_start_s: usize,
    pub stack_start_h: usize,
    pub stack_end_h: usize,
    pub stack_start_w: usize,
    pub stack_end_w: usize,
    pub patch_start_h: usize,
    pub patch_end_h: usize,
    pub patch_start_w: usize,
    pub patch_end_w: usize,
}

impl PlacementRecord {
    /// Absolute origin (frame, row, column) of the patch window.
    pub fn origin(&self) -> (usize, usize, usize) {
        (
            self.stack_start_s,
            self.stack_start_h - self.patch_start_h,
            self.stack_start_w - self.patch_start_w,
        )
    }
}

/// One window along a single axis plus the half-open authoritative span
/// inside it, in absolute coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AxisWindow {
    start: usize,
    auth_start: usize,
    auth_end: usize,
}

/// Window starts along one axis: stride until the next window would overrun
/// the boundary, then one final start clamped so the window ends at the axis
/// edge. The clamped window overlaps its predecessor instead of leaving a
/// ragged uncovered strip.
fn axis_starts(len: usize, patch: usize, interval: usize) -> Vec<usize> {
    debug_assert!(patch >= 1 && patch <= len && interval >= 1);
    let mut starts = Vec::new();
    let mut start = 0;
    while start + patch <= len {
        starts.push(start);
        start += interval;
    }
    if let Some(&last) = starts.last() {
        if last + patch < len {
            starts.push(len - patch);
        }
    }
    starts
}

/// Assign each window its authoritative span. The boundary between two
/// neighbors is the midpoint of their overlap; the first span starts at 0
/// and the last ends at the axis length. Each span begins exactly where the
/// previous one ended, so the spans are disjoint and cover `[0, len)`.
fn axis_windows(len: usize, patch: usize, interval: usize) -> Vec<AxisWindow> {
    let starts = axis_starts(len, patch, interval);
    let count = starts.len();
    let mut windows = Vec::with_capacity(count);
    let mut auth_start = 0;
    for (i, &start) in starts.iter().enumerate() {
        let auth_end = if i + 1 == count {
            len
        } else {
            (starts[i + 1] + start + patch) / 2
        };
        windows.push(AxisWindow {
            start,
            auth_start,
            auth_end,
        });
        auth_start = auth_end;
    }
    windows
}

/// Lazy, finite, restartable sequence of [`PlacementRecord`]s covering a
/// volume: one record per (temporal start, row window, column window).
///
/// Construction precomputes the per-axis windows; records themselves are
/// produced on demand by [`PlacementGrid::iter`] and the grid can be
/// iterated any number of times.
#[derive(Debug, Clone)]
pub struct PlacementGrid {
    temporal_starts: Vec<usize>,
    rows: Vec<AxisWindow>,
    cols: Vec<AxisWindow>,
}

impl PlacementGrid {
    pub fn new(
        volume: VolumeShape,
        patch: PatchShape,
        interval: PatchInterval,
    ) -> Result<Self, StitchError> {
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
        if patch.frames > frames {
            return Err(StitchError::PatchExceedsVolume {
                axis: "frame",
                patch: patch.frames,
                volume: frames,
            });
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

        let mut temporal_starts = Vec::new();
        let mut start = 0;
        while start + patch.frames <= frames {
            temporal_starts.push(start);
            start += interval.frames;
        }

        Ok(Self {
            temporal_starts,
            rows: axis_windows(height, patch.height, interval.height),
            cols: axis_windows(width, patch.width, interval.width),
        })
    }

    /// Total number of placements.
    pub fn len(&self) -> usize {
        self.temporal_starts.len() * self.rows.len() * self.cols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Frame indices that are the temporal center of some patch.
    pub fn covered_centers(&self, patch: PatchShape) -> Vec<usize> {
        self.temporal_starts
            .iter()
            .map(|&start| start + patch.center())
            .collect()
    }

    pub fn iter(&self) -> PlacementIter<'_> {
        PlacementIter { grid: self, next: 0 }
    }
}

impl<'a> IntoIterator for &'a PlacementGrid {
    type Item = PlacementRecord;
    type IntoIter = PlacementIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct PlacementIter<'a> {
    grid: &'a PlacementGrid,
    next: usize,
}

impl Iterator for PlacementIter<'_> {
    type Item = PlacementRecord;

    fn next(&mut self) -> Option<PlacementRecord> {
        if self.next >= self.grid.len() {
            return None;
        }
        let cols = self.grid.cols.len();
        let rows = self.grid.rows.len();
        let col = &self.grid.cols[self.next % cols];
        let row = &self.grid.rows[(self.next / cols) % rows];
        let temporal_start = self.grid.temporal_starts[self.next / (cols * rows)];
        self.next += 1;

        Some(PlacementRecord {
            stack_start_s: temporal_start,
            stack_start_h: row.auth_start,
            stack_end_h: row.auth_end,
            stack_start_w: col.auth_start,
            stack_end_w: col.auth_end,
            patch_start_h: row.auth_start - row.start,
            patch_end_h: row.auth_end - row.start,
            patch_start_w: col.auth_start - col.start,
            patch_end_w: col.auth_end - col.start,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.grid.len() - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for PlacementIter<'_> {}

/// Slice the patch for one placement out of the volume. Extraction bounds
/// are guaranteed in-range by the grid's boundary clamping, so no padding
/// is needed here.
pub fn extract_patch(
    volume: ArrayView3<'_, f32>,
    record: &PlacementRecord,
    patch: PatchShape,
) -> Array3<f32> {
    let (frame, row, col) = record.origin();
    volume
        .slice(s![
            frame..frame + patch.frames,
            row..row + patch.height,
            col..col + patch.width
        ])
        .to_owned()
}
