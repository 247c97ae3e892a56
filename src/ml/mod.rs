// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All network, loss and optimisation code lives here.
//
//   encoder.rs    — VGG16 backbone with fc6/fc7 as convolutions,
//                   exposing the pool3, pool4 and fc7 feature maps
//
//   model.rs      — FCN-8s decoder (1x1 score layers, transposed
//                   convolution upsampling, skip additions),
//                   pixel-wise softmax cross-entropy, decoder L2
//
//   trainer.rs    — Epoch / minibatch loop with Adam, validation,
//                   metrics and checkpoints
//
//   inferencer.rs — Loads a checkpoint and returns per-pixel road
//                   probabilities
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)
//            Long, Shelhamer & Darrell (2015) Fully Convolutional
//            Networks for Semantic Segmentation

/// Pretrained VGG16 backbone
pub mod encoder;

/// FCN-8s decoder and loss
pub mod model;

/// Training loop with validation and checkpointing
pub mod trainer;

/// Checkpoint-backed road segmenter
pub mod inferencer;
