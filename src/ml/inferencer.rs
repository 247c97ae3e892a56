// ============================================================
// Layer 5 — Inferencer
// ============================================================
use anyhow::{anyhow, bail, Result};
use burn::prelude::*;

use crate::data::preprocessor::normalize_chw;
use crate::domain::sample::ImageShape;
use crate::domain::traits::RoadSegmenter;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::{road_probabilities, FcnModel};

pub struct Inferencer<B: Backend> {
    model:  FcnModel<B>,
    shape:  ImageShape,
    device: B::Device,
}

impl<B: Backend> Inferencer<B> {
    pub fn new(model: FcnModel<B>, shape: ImageShape, device: B::Device) -> Self {
        Self { model, shape, device }
    }

    /// Rebuild the architecture from the saved configs and load the
    /// latest weights.
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager, device: B::Device) -> Result<Self> {
        let train_cfg = ckpt_manager.load_config()?;
        let model_cfg = ckpt_manager.load_model_config()?;
        let model     = ckpt_manager.load_model(model_cfg.init::<B>(&device), &device)?;
        tracing::info!("Model loaded from checkpoint");
        Ok(Self::new(model, train_cfg.image_shape(), device))
    }

    pub fn shape(&self) -> ImageShape {
        self.shape
    }
}

impl<B: Backend> RoadSegmenter for Inferencer<B> {
    fn road_probabilities(&self, rgb: &[u8]) -> Result<Vec<f32>> {
        let ImageShape { height, width } = self.shape;
        if rgb.len() != self.shape.pixel_count() * 3 {
            bail!(
                "expected {}x{} RGB input ({} bytes), got {} bytes",
                height,
                width,
                self.shape.pixel_count() * 3,
                rgb.len()
            );
        }

        let pixels = normalize_chw(rgb, self.shape);
        let images = Tensor::<B, 4>::from_data(
            TensorData::new(pixels, [1, 3, height, width]).convert::<B::FloatElem>(),
            &self.device,
        );

        let probs = road_probabilities(self.model.forward(images));
        tracing::debug!("Segmented {}x{} image", height, width);

        probs
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("cannot read probabilities: {e:?}"))
    }
}
