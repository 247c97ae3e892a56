// ============================================================
// Layer 4 — Image Preprocessor
// ============================================================
// Turns files on disk into fixed-size buffers the batcher can
// stack into tensors.
//
//   RGB image    → resize (bilinear) → HWC u8
//   ground truth → resize (nearest)  → per-pixel class labels
//   HWC u8       → CHW f32 normalised with ImageNet mean/std
//
// Ground truth uses nearest-neighbour resizing so the
// background colour survives exactly; bilinear filtering
// would invent blended colours along class borders.
//
// Reference: image crate documentation

use anyhow::{anyhow, Result};
use image::imageops::FilterType;
use std::path::Path;

use crate::domain::mask::{labels_from_ground_truth, DEFAULT_BACKGROUND};
use crate::domain::sample::ImageShape;

/// Per-channel ImageNet statistics (RGB order) the backbone was trained with.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const IMAGENET_STD: [f32; 3]  = [0.229, 0.224, 0.225];

#[derive(Debug, Clone, Copy)]
pub struct Preprocessor {
    shape: ImageShape,
}

impl Preprocessor {
    pub fn new(shape: ImageShape) -> Self {
        Self { shape }
    }

    pub fn shape(&self) -> ImageShape {
        self.shape
    }

    /// Load an RGB image resized to the network shape (HWC bytes).
    pub fn load_rgb(&self, path: &Path) -> Result<Vec<u8>> {
        self.load_resized(path, FilterType::Triangle)
    }

    /// Load a ground-truth image and decode it into class labels.
    pub fn load_labels(&self, path: &Path) -> Result<Vec<u8>> {
        let rgb = self.load_resized(path, FilterType::Nearest)?;
        Ok(labels_from_ground_truth(&rgb, DEFAULT_BACKGROUND))
    }

    fn load_resized(&self, path: &Path, filter: FilterType) -> Result<Vec<u8>> {
        let img = image::open(path)
            .map_err(|e| anyhow!("failed to open image '{}': {e}", path.display()))?;
        let rgb = img
            .resize_exact(self.shape.width as u32, self.shape.height as u32, filter)
            .to_rgb8();
        Ok(rgb.into_raw())
    }
}

/// Convert HWC RGB bytes into normalised CHW floats.
pub fn normalize_chw(rgb: &[u8], shape: ImageShape) -> Vec<f32> {
    let pixels = shape.pixel_count();
    let mut out = vec![0.0f32; pixels * 3];
    for (i, px) in rgb.chunks_exact(3).take(pixels).enumerate() {
        for c in 0..3 {
            out[c * pixels + i] = (px[c] as f32 / 255.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
        }
    }
    out
}
