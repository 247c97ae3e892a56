// ============================================================
// Layer 4 — Road Batcher
// ============================================================
// Implements Burn's Batcher trait to convert a Vec<RoadItem>
// into tensors.
//
//   Input:  N RoadItems, each H x W pixels
//   Output: images [N, 3, H, W] float (normalised, channels first)
//           labels [N, H, W]    int   (class index per pixel)
//
// Every item in a dataset has the same resolution because the
// preprocessor resizes on load, so the flat buffers can be
// concatenated and reshaped directly.
//
// Reference: Burn Book §4 (Batcher)

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::dataset::RoadItem;
use crate::data::preprocessor::normalize_chw;

#[derive(Debug, Clone)]
pub struct RoadBatch<B: Backend> {
    /// Shape: [batch_size, 3, height, width]
    pub images: Tensor<B, 4>,
    /// Shape: [batch_size, height, width]
    pub labels: Tensor<B, 3, Int>,
}

#[derive(Clone, Debug, Default)]
pub struct RoadBatcher;

impl<B: Backend> Batcher<B, RoadItem, RoadBatch<B>> for RoadBatcher {
    fn batch(&self, items: Vec<RoadItem>, device: &B::Device) -> RoadBatch<B> {
        let batch_size = items.len();
        let (height, width) = items
            .first()
            .map(|item| (item.height, item.width))
            .unwrap_or((0, 0));

        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|item| normalize_chw(&item.rgb, item.shape()))
            .collect();

        let labels: Vec<i64> = items
            .iter()
            .flat_map(|item| item.labels.iter().map(|&l| l as i64))
            .collect();

        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [batch_size, 3, height, width]).convert::<B::FloatElem>(),
            device,
        );
        let labels = Tensor::<B, 3, Int>::from_data(
            TensorData::new(labels, [batch_size, height, width]).convert::<B::IntElem>(),
            device,
        );

        RoadBatch { images, labels }
    }
}
