use anyhow::{bail, Result};
use burn::data::dataset::Dataset;

use crate::data::preprocessor::Preprocessor;
use crate::domain::sample::{ImageShape, RoadSample};

/// One decoded training example at network resolution.
/// `rgb` is HWC bytes, `labels` holds one class index per pixel.
#[derive(Debug, Clone)]
pub struct RoadItem {
    pub rgb:    Vec<u8>,
    pub labels: Vec<u8>,
    pub height: usize,
    pub width:  usize,
}

impl RoadItem {
    pub fn shape(&self) -> ImageShape {
        ImageShape::new(self.height, self.width)
    }

    /// Left-right mirrored copy of this example.
    pub fn mirrored(&self) -> Self {
        Self {
            rgb:    mirror_rows(&self.rgb, self.width, 3),
            labels: mirror_rows(&self.labels, self.width, 1),
            height: self.height,
            width:  self.width,
        }
    }
}

fn mirror_rows(buf: &[u8], width: usize, channels: usize) -> Vec<u8> {
    let row_len = width * channels;
    let mut out = Vec::with_capacity(buf.len());
    for row in buf.chunks_exact(row_len) {
        for px in row.chunks_exact(channels).rev() {
            out.extend_from_slice(px);
        }
    }
    out
}

/// In-memory road dataset. With mirroring enabled, index `n + i`
/// returns the mirrored copy of item `i`.
pub struct RoadDataset {
    items:  Vec<RoadItem>,
    mirror: bool,
}

impl RoadDataset {
    pub fn new(items: Vec<RoadItem>) -> Self {
        Self { items, mirror: false }
    }

    pub fn with_mirroring(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    /// Decode every sample. Samples must carry ground truth.
    pub fn load(samples: &[RoadSample], preprocessor: &Preprocessor) -> Result<Self> {
        let shape = preprocessor.shape();
        let mut items = Vec::with_capacity(samples.len());
        for sample in samples {
            let Some(gt) = &sample.ground_truth else {
                bail!("sample '{}' has no ground truth", sample.image.display());
            };
            items.push(RoadItem {
                rgb:    preprocessor.load_rgb(&sample.image)?,
                labels: preprocessor.load_labels(gt)?,
                height: shape.height,
                width:  shape.width,
            });
        }
        tracing::debug!("Decoded {} samples at {}x{}", items.len(), shape.height, shape.width);
        Ok(Self::new(items))
    }

    pub fn sample_count(&self) -> usize {
        self.items.len()
    }
}

impl Dataset<RoadItem> for RoadDataset {
    fn get(&self, index: usize) -> Option<RoadItem> {
        let n = self.items.len();
        if index < n {
            self.items.get(index).cloned()
        } else if self.mirror {
            self.items.get(index - n).map(RoadItem::mirrored)
        } else {
            None
        }
    }

    fn len(&self) -> usize {
        if self.mirror {
            self.items.len() * 2
        } else {
            self.items.len()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item() -> RoadItem {
        RoadItem {
            rgb:    vec![1, 1, 1, 2, 2, 2, 3, 3, 3, 4, 4, 4],
            labels: vec![0, 1, 1, 0],
            height: 2,
            width:  2,
        }
    }

    #[test]
    fn test_mirror_reverses_each_row() {
        let m = item().mirrored();
        assert_eq!(m.rgb, vec![2, 2, 2, 1, 1, 1, 4, 4, 4, 3, 3, 3]);
        assert_eq!(m.labels, vec![1, 0, 0, 1]);
    }

    #[test]
    fn test_mirroring_doubles_length() {
        let ds = RoadDataset::new(vec![item()]).with_mirroring(true);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(1).unwrap().labels, vec![1, 0, 0, 1]);
        assert!(ds.get(2).is_none());
    }

    #[test]
    fn test_plain_dataset() {
        let ds = RoadDataset::new(vec![item()]);
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.sample_count(), 1);
        assert!(ds.get(1).is_none());
    }

    #[test]
    fn test_load_requires_ground_truth() {
        let p = Preprocessor::new(ImageShape::new(32, 32));
        let samples = vec![RoadSample::new("a.png", None)];
        assert!(RoadDataset::load(&samples, &p).is_err());
    }
}
