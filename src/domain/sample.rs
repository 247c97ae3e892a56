// ============================================================
// Layer 3 — Sample and Image Shape
// ============================================================
// RoadSample points at the files of one training or testing
// example. ImageShape is the fixed resolution every image is
// resized to before it reaches the network.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Total downsampling factor of the VGG16 backbone (five 2x2 pools).
pub const BACKBONE_STRIDE: usize = 32;

/// One example on disk. Testing images have no ground truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadSample {
    pub image:        PathBuf,
    pub ground_truth: Option<PathBuf>,
}

impl RoadSample {
    pub fn new(image: impl Into<PathBuf>, ground_truth: Option<PathBuf>) -> Self {
        Self { image: image.into(), ground_truth }
    }

    /// File name of the source image, used to name inference outputs.
    pub fn file_name(&self) -> String {
        self.image
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown.png")
            .to_string()
    }
}

/// Network input resolution, height first like the tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageShape {
    pub height: usize,
    pub width:  usize,
}

impl ImageShape {
    pub fn new(height: usize, width: usize) -> Self {
        Self { height, width }
    }

    pub fn pixel_count(&self) -> usize {
        self.height * self.width
    }

    /// The decoder adds stride-8, stride-16 and stride-32 maps together,
    /// so both dimensions must be multiples of the backbone stride.
    pub fn validate_for_fcn(&self) -> Result<()> {
        if self.height == 0 || self.width == 0 {
            bail!("image shape {}x{} has a zero dimension", self.height, self.width);
        }
        if self.height % BACKBONE_STRIDE != 0 || self.width % BACKBONE_STRIDE != 0 {
            bail!(
                "image shape {}x{} must be divisible by {} in both dimensions",
                self.height,
                self.width,
                BACKBONE_STRIDE
            );
        }
        Ok(())
    }
}

impl Default for ImageShape {
    fn default() -> Self {
        Self::new(160, 576)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kitti_shape_is_valid() {
        assert!(ImageShape::default().validate_for_fcn().is_ok());
        assert_eq!(ImageShape::default().pixel_count(), 160 * 576);
    }

    #[test]
    fn test_rejects_shape_not_divisible_by_stride() {
        assert!(ImageShape::new(160, 570).validate_for_fcn().is_err());
        assert!(ImageShape::new(100, 576).validate_for_fcn().is_err());
    }

    #[test]
    fn test_rejects_zero_dimension() {
        assert!(ImageShape::new(0, 64).validate_for_fcn().is_err());
    }

    #[test]
    fn test_file_name_from_path() {
        let s = RoadSample::new("data/data_road/testing/image_2/um_000003.png", None);
        assert_eq!(s.file_name(), "um_000003.png");
    }
}
