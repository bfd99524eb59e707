/// Shape of a (frame, row, column) volume, as returned by `Array3::dim`.
pub type VolumeShape = (usize, usize, usize);

/// Extent of a patch along (frame, row, column).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchShape {
    pub frames: usize,
    pub height: usize,
    pub width: usize,
}

impl PatchShape {
    /// Temporal offset of the trusted center frame within a patch.
    /// Neighboring frames are context; only the centered output frame is kept.
    pub fn center(&self) -> usize {
        self.frames / 2
    }
}

impl From<[usize; 3]> for PatchShape {
    fn from(v: [usize; 3]) -> Self {
        Self {
            frames: v[0],
            height: v[1],
            width: v[2],
        }
    }
}

/// Stride between consecutive patch windows along (frame, row, column).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchInterval {
    pub frames: usize,
    pub height: usize,
    pub width: usize,
}

impl From<[usize; 3]> for PatchInterval {
    fn from(v: [usize; 3]) -> Self {
        Self {
            frames: v[0],
            height: v[1],
            width: v[2],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_frame_offset() {
        let patch = PatchShape::from([61, 64, 64]);
        assert_eq!(patch.center(), 30);

        let patch = PatchShape::from([5, 64, 64]);
        assert_eq!(patch.center(), 2);

        let patch = PatchShape::from([1, 8, 8]);
        assert_eq!(patch.center(), 0);
    }

    #[test]
    fn test_from_array() {
        let interval = PatchInterval::from([1, 32, 32]);
        assert_eq!(interval.frames, 1);
        assert_eq!(interval.height, 32);
        assert_eq!(interval.width, 32);
    }
}
