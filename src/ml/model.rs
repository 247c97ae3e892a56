use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig, ConvTranspose2d, ConvTranspose2dConfig},
        loss::CrossEntropyLossConfig,
        Initializer,
    },
    prelude::*,
    tensor::activation::softmax,
};

use crate::domain::ROAD_CLASS;
use crate::ml::encoder::{EncoderFeatures, Vgg16Config, Vgg16Encoder};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct FcnConfig {
    pub encoder:     Vgg16Config,
    #[config(default = 2)]
    pub num_classes: usize,
    /// Standard deviation of the normal initializer for every decoder layer.
    #[config(default = 0.01)]
    pub init_std:    f64,
}

impl FcnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> FcnModel<B> {
        FcnModel {
            encoder: self.encoder.init(device),
            decoder: self.init_decoder(device),
        }
    }

    pub fn init_decoder<B: Backend>(&self, device: &B::Device) -> FcnDecoder<B> {
        let n = self.num_classes;
        let init = Initializer::Normal { mean: 0.0, std: self.init_std };

        let score = |channels: usize| {
            Conv2dConfig::new([channels, n], [1, 1])
                .with_initializer(init.clone())
                .init(device)
        };
        // "same" transposed convolutions: output = input * stride
        let upsample = |kernel: usize, stride: usize| {
            ConvTranspose2dConfig::new([n, n], [kernel, kernel])
                .with_stride([stride, stride])
                .with_padding([(kernel - stride) / 2, (kernel - stride) / 2])
                .with_initializer(init.clone())
                .init(device)
        };

        FcnDecoder {
            score_fc7:   score(self.encoder.fc_width),
            up2_fc7:     upsample(4, 2),
            score_pool4: score(self.encoder.pool4_channels()),
            up2_fuse:    upsample(4, 2),
            score_pool3: score(self.encoder.pool3_channels()),
            up8_fuse:    upsample(16, 8),
        }
    }
}

/// FCN-8s skip path:
///
/// ```text
/// fc7 ─ 1x1 ─ up x2 ─┐
///                    + ─ up x2 ─┐
/// pool4 ─ 1x1 ───────┘          + ─ up x8 ─ logits
/// pool3 ─ 1x1 ──────────────────┘
/// ```
#[derive(Module, Debug)]
pub struct FcnDecoder<B: Backend> {
    pub score_fc7:   Conv2d<B>,
    pub up2_fc7:     ConvTranspose2d<B>,
    pub score_pool4: Conv2d<B>,
    pub up2_fuse:    ConvTranspose2d<B>,
    pub score_pool3: Conv2d<B>,
    pub up8_fuse:    ConvTranspose2d<B>,
}

impl<B: Backend> FcnDecoder<B> {
    pub fn forward(&self, features: EncoderFeatures<B>) -> Tensor<B, 4> {
        let x = self.up2_fc7.forward(self.score_fc7.forward(features.fc7));
        let x = self.up2_fuse.forward(x + self.score_pool4.forward(features.pool4));
        self.up8_fuse.forward(x + self.score_pool3.forward(features.pool3))
    }

    /// Σ ||w||² / 2 over every decoder kernel (biases excluded).
    pub fn l2_penalty(&self) -> Tensor<B, 1> {
        let sq = |w: Tensor<B, 4>| (w.clone() * w).sum();
        (sq(self.score_fc7.weight.val())
            + sq(self.up2_fc7.weight.val())
            + sq(self.score_pool4.weight.val())
            + sq(self.up2_fuse.weight.val())
            + sq(self.score_pool3.weight.val())
            + sq(self.up8_fuse.weight.val()))
            / 2.0
    }
}

#[derive(Module, Debug)]
pub struct FcnModel<B: Backend> {
    pub encoder: Vgg16Encoder<B>,
    pub decoder: FcnDecoder<B>,
}

impl<B: Backend> FcnModel<B> {
    /// images: [batch, 3, H, W] → logits: [batch, num_classes, H, W]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        self.decoder.forward(self.encoder.forward(images))
    }

    /// Mean pixel cross-entropy plus `l2_scale` times the decoder weight penalty.
    pub fn forward_loss(
        &self,
        images:   Tensor<B, 4>,
        labels:   Tensor<B, 3, Int>,
        l2_scale: f64,
    ) -> (Tensor<B, 1>, Tensor<B, 4>) {
        let logits = self.forward(images);
        let mut loss = pixel_cross_entropy(logits.clone(), labels);
        if l2_scale > 0.0 {
            loss = loss + self.decoder.l2_penalty() * l2_scale;
        }
        (loss, logits)
    }

    /// Stop gradients from reaching the pretrained backbone.
    pub fn freeze_encoder(mut self) -> Self {
        self.encoder = self.encoder.no_grad();
        self
    }
}

/// logits [B, C, H, W], labels [B, H, W] → mean softmax cross-entropy
/// over every pixel of the batch.
pub fn pixel_cross_entropy<B: Backend>(logits: Tensor<B, 4>, labels: Tensor<B, 3, Int>) -> Tensor<B, 1> {
    let [batch, classes, height, width] = logits.dims();
    let pixels = batch * height * width;

    let logits  = logits.permute([0, 2, 3, 1]).reshape([pixels, classes]);
    let targets = labels.reshape([pixels]);

    CrossEntropyLossConfig::new()
        .init(&logits.device())
        .forward(logits, targets)
}

/// logits [B, C, H, W] → predicted class per pixel [B, H, W]
pub fn predicted_classes<B: Backend>(logits: Tensor<B, 4>) -> Tensor<B, 3, Int> {
    let [batch, _, height, width] = logits.dims();
    logits.argmax(1).reshape([batch, height, width])
}

/// logits [B, C, H, W] → road probability per pixel [B, H, W]
pub fn road_probabilities<B: Backend>(logits: Tensor<B, 4>) -> Tensor<B, 3> {
    let [batch, _, height, width] = logits.dims();
    let road = ROAD_CLASS as usize;
    softmax(logits, 1)
        .slice([0..batch, road..road + 1, 0..height, 0..width])
        .reshape([batch, height, width])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};

    type TestBackend = NdArray<f32>;

    fn tiny_config() -> FcnConfig {
        FcnConfig::new(
            Vgg16Config::new()
                .with_block_widths([2, 2, 4, 4, 4])
                .with_fc_width(4)
                .with_fc6_kernel(3),
        )
    }

    #[test]
    fn test_logits_match_input_resolution() {
        let device = NdArrayDevice::default();
        let model  = tiny_config().init::<TestBackend>(&device);
        let images = Tensor::<TestBackend, 4>::zeros([2, 3, 32, 64], &device);
        assert_eq!(model.forward(images).dims(), [2, 2, 32, 64]);
    }

    #[test]
    fn test_uniform_logits_give_ln2_loss() {
        let device = NdArrayDevice::default();
        let logits = Tensor::<TestBackend, 4>::zeros([1, 2, 2, 2], &device);
        let labels = Tensor::<TestBackend, 3, Int>::from_ints([[[0, 1], [1, 1]]], &device);
        let loss: f64 = pixel_cross_entropy(logits, labels).into_scalar().elem::<f64>();
        assert!((loss - std::f64::consts::LN_2).abs() < 1e-5);
    }

    #[test]
    fn test_confident_correct_logits_give_small_loss() {
        let device = NdArrayDevice::default();
        // class 1 everywhere with a large margin
        let logits = Tensor::<TestBackend, 4>::from_floats([[[[0.0, 0.0]], [[20.0, 20.0]]]], &device);
        let labels = Tensor::<TestBackend, 3, Int>::from_ints([[[1, 1]]], &device);
        let loss: f64 = pixel_cross_entropy(logits, labels).into_scalar().elem::<f64>();
        assert!(loss < 1e-6);
    }

    #[test]
    fn test_road_probability_and_prediction() {
        let device = NdArrayDevice::default();
        // pixel 0 favours road, pixel 1 favours background
        let logits = Tensor::<TestBackend, 4>::from_floats([[[[0.0, 5.0]], [[3.0, 0.0]]]], &device);

        let probs: Vec<f32> = road_probabilities(logits.clone()).into_data().to_vec::<f32>().unwrap();
        assert!(probs[0] > 0.95);
        assert!(probs[1] < 0.01);

        let classes = predicted_classes(logits);
        assert_eq!(classes.dims(), [1, 1, 2]);
        let labels: Vec<i64> = classes.into_data().convert::<i64>().to_vec::<i64>().unwrap();
        assert_eq!(labels, vec![1, 0]);
    }

    #[test]
    fn test_l2_penalty_adds_to_loss() {
        let device = NdArrayDevice::default();
        let model  = tiny_config().init::<TestBackend>(&device);
        let images = Tensor::<TestBackend, 4>::zeros([1, 3, 32, 32], &device);
        let labels = Tensor::<TestBackend, 3, Int>::zeros([1, 32, 32], &device);

        let (plain, _) = model.forward_loss(images.clone(), labels.clone(), 0.0);
        let (reg, _)   = model.forward_loss(images, labels, 10.0);
        let plain: f64 = plain.into_scalar().elem::<f64>();
        let reg: f64   = reg.into_scalar().elem::<f64>();
        assert!(reg > plain);
    }

    #[test]
    fn test_loss_backward_reaches_decoder() {
        type AdBackend = Autodiff<TestBackend>;
        let device = NdArrayDevice::default();
        let model  = tiny_config().init::<AdBackend>(&device);
        let images = Tensor::<AdBackend, 4>::ones([1, 3, 32, 32], &device);
        let labels = Tensor::<AdBackend, 3, Int>::ones([1, 32, 32], &device);

        let (loss, _) = model.forward_loss(images, labels, 1e-3);
        let grads = loss.backward();
        assert!(model.decoder.up8_fuse.weight.val().grad(&grads).is_some());
    }
}
