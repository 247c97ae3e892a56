use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Dropout, DropoutConfig, PaddingConfig2d, Relu,
    },
    prelude::*,
};

/// Number of 3x3 convolutions in each of the five VGG16 blocks.
const CONVS_PER_BLOCK: [usize; 5] = [2, 2, 3, 3, 3];

/// VGG16 backbone with its classifier turned convolutional (fc6/fc7).
///
/// The defaults reproduce the published network. Smaller widths are
/// only useful for tests; a pretrained record only loads into a model
/// built with the same widths.
#[derive(Config, Debug)]
pub struct Vgg16Config {
    #[config(default = "[64, 128, 256, 512, 512]")]
    pub block_widths: [usize; 5],
    #[config(default = 4096)]
    pub fc_width: usize,
    #[config(default = 7)]
    pub fc6_kernel: usize,
    /// Applied after fc6 and fc7 (keep probability 0.5).
    #[config(default = 0.5)]
    pub dropout: f64,
}

impl Vgg16Config {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Vgg16Encoder<B> {
        let mut in_channels = 3;
        let blocks = CONVS_PER_BLOCK
            .iter()
            .zip(self.block_widths)
            .map(|(&convs, width)| {
                let block = VggBlock {
                    convs: (0..convs)
                        .map(|i| {
                            let input = if i == 0 { in_channels } else { width };
                            Conv2dConfig::new([input, width], [3, 3])
                                .with_padding(PaddingConfig2d::Explicit(1, 1))
                                .init(device)
                        })
                        .collect(),
                    pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
                    activation: Relu::new(),
                };
                in_channels = width;
                block
            })
            .collect();

        let pad = self.fc6_kernel / 2;
        Vgg16Encoder {
            blocks,
            fc6: Conv2dConfig::new([in_channels, self.fc_width], [self.fc6_kernel, self.fc6_kernel])
                .with_padding(PaddingConfig2d::Explicit(pad, pad))
                .init(device),
            fc7: Conv2dConfig::new([self.fc_width, self.fc_width], [1, 1]).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            activation: Relu::new(),
        }
    }

    pub fn pool3_channels(&self) -> usize {
        self.block_widths[2]
    }

    pub fn pool4_channels(&self) -> usize {
        self.block_widths[3]
    }
}

#[derive(Module, Debug)]
pub struct VggBlock<B: Backend> {
    convs:      Vec<Conv2d<B>>,
    pool:       MaxPool2d,
    activation: Relu,
}

impl<B: Backend> VggBlock<B> {
    fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self
            .convs
            .iter()
            .fold(x, |x, conv| self.activation.forward(conv.forward(x)));
        self.pool.forward(x)
    }
}

#[derive(Module, Debug)]
pub struct Vgg16Encoder<B: Backend> {
    blocks:     Vec<VggBlock<B>>,
    fc6:        Conv2d<B>,
    fc7:        Conv2d<B>,
    dropout:    Dropout,
    activation: Relu,
}

/// Feature maps tapped by the FCN decoder.
pub struct EncoderFeatures<B: Backend> {
    /// Output of block 3, stride 8.
    pub pool3: Tensor<B, 4>,
    /// Output of block 4, stride 16.
    pub pool4: Tensor<B, 4>,
    /// Output of fc7, stride 32.
    pub fc7:   Tensor<B, 4>,
}

impl<B: Backend> Vgg16Encoder<B> {
    /// images: [batch, 3, H, W]
    pub fn forward(&self, images: Tensor<B, 4>) -> EncoderFeatures<B> {
        let mut x = images;
        let mut pool3 = None;
        let mut pool4 = None;
        for (i, block) in self.blocks.iter().enumerate() {
            x = block.forward(x);
            match i {
                2 => pool3 = Some(x.clone()),
                3 => pool4 = Some(x.clone()),
                _ => {}
            }
        }

        let x = self.dropout.forward(self.activation.forward(self.fc6.forward(x.clone())));
        let fc7 = self.dropout.forward(self.activation.forward(self.fc7.forward(x)));

        // The block list always holds five entries when built through Vgg16Config.
        let pool3 = pool3.unwrap_or_else(|| fc7.clone());
        let pool4 = pool4.unwrap_or_else(|| fc7.clone());
        EncoderFeatures { pool3, pool4, fc7 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{ndarray::NdArrayDevice, NdArray};

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_feature_strides() {
        let device = NdArrayDevice::default();
        let cfg = Vgg16Config::new()
            .with_block_widths([2, 2, 4, 6, 6])
            .with_fc_width(8);
        let encoder = cfg.init::<TestBackend>(&device);

        let images = Tensor::<TestBackend, 4>::zeros([1, 3, 64, 96], &device);
        let f = encoder.forward(images);

        assert_eq!(f.pool3.dims(), [1, 4, 8, 12]);
        assert_eq!(f.pool4.dims(), [1, 6, 4, 6]);
        assert_eq!(f.fc7.dims(), [1, 8, 2, 3]);
    }
}
