// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch / minibatch loop with Adam, validation and checkpoints.
//
//   - Training runs on the autodiff backend B
//   - model.valid() gives the model on B::InnerBackend, where
//     dropout is inactive; validation batches use that backend
//   - argmax(1) keeps the class dim, predicted_classes() drops it
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use anyhow::{anyhow, Result};
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::path::Path;

use crate::application::train_use_case::TrainConfig;
use crate::data::{
    batcher::{RoadBatch, RoadBatcher},
    dataset::{RoadDataset, RoadItem},
};
use crate::domain::score::SegmentationScore;
use crate::infra::checkpoint::{load_backbone, CheckpointManager};
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::model::{pixel_cross_entropy, predicted_classes, FcnConfig, FcnModel};

/// What a finished run looked like.
#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub history:       Vec<EpochMetrics>,
    pub best_val_loss: f64,
}

impl TrainingReport {
    pub fn last(&self) -> Option<&EpochMetrics> {
        self.history.last()
    }
}

pub fn run_training<B: AutodiffBackend>(
    cfg:           &TrainConfig,
    model_cfg:     &FcnConfig,
    train_dataset: RoadDataset,
    val_dataset:   RoadDataset,
    ckpt_manager:  &CheckpointManager,
    metrics:       &MetricsLogger,
    device:        B::Device,
) -> Result<TrainingReport> {
    // ── Build model ───────────────────────────────────────────────────────────
    let mut model: FcnModel<B> = model_cfg.init(&device);
    if cfg.from_scratch {
        tracing::warn!("Training without a pretrained backbone");
    } else {
        model.encoder = load_backbone(model.encoder, Path::new(&cfg.backbone), &device)?;
    }
    if cfg.freeze_backbone {
        model = model.freeze_encoder();
        tracing::info!("Backbone frozen; only the decoder is trained");
    }
    tracing::info!(
        "Model ready: {} classes, fc width {}",
        model_cfg.num_classes,
        model_cfg.encoder.fc_width
    );

    let mut optim = AdamConfig::new().with_epsilon(1e-8).init();

    // ── Data loaders ──────────────────────────────────────────────────────────
    let has_validation = val_dataset.sample_count() > 0;

    let train_loader = DataLoaderBuilder::<B, RoadItem, RoadBatch<B>>::new(RoadBatcher)
        .batch_size(cfg.batch_size)
        .shuffle(cfg.seed)
        .num_workers(cfg.num_workers)
        .set_device(device.clone())
        .build(train_dataset);

    let val_loader =
        DataLoaderBuilder::<B::InnerBackend, RoadItem, RoadBatch<B::InnerBackend>>::new(RoadBatcher)
            .batch_size(cfg.batch_size)
            .num_workers(cfg.num_workers)
            .set_device(device.clone())
            .build(val_dataset);

    let mut history       = Vec::with_capacity(cfg.epochs);
    let mut best_val_loss = f64::INFINITY;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {
        let mut loss_sum = 0.0f64;
        let mut batches  = 0usize;
        let mut min_loss = f64::INFINITY;

        for batch in train_loader.iter() {
            let (loss, _) = model.forward_loss(batch.images, batch.labels, cfg.l2_scale);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            loss_sum += loss_val;
            batches  += 1;
            if loss_val < min_loss {
                min_loss = loss_val;
                tracing::info!("epoch {}, loss: {:.3}", epoch, loss_val);
            }

            let grads = GradientsParams::from_grads(loss.backward(), &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let train_loss = if batches > 0 { loss_sum / batches as f64 } else { f64::NAN };

        // ── Validation ────────────────────────────────────────────────────────
        let (val_loss, score) = if has_validation {
            let model_valid = model.valid();
            let mut val_loss = PixelWeightedMean::default();
            let mut score = SegmentationScore::new();

            for batch in val_loader.iter() {
                let pixels = batch.labels.dims().iter().product::<usize>();
                let logits = model_valid.forward(batch.images);
                let loss = pixel_cross_entropy(logits.clone(), batch.labels.clone())
                    .into_scalar()
                    .elem::<f64>();
                val_loss.add(loss, pixels);

                let predicted = int_values(predicted_classes(logits))?;
                let target    = int_values(batch.labels)?;
                score.accumulate(&predicted, &target);
            }
            (val_loss.mean(), score)
        } else {
            (f64::NAN, SegmentationScore::new())
        };

        let row = EpochMetrics {
            epoch,
            train_loss,
            min_batch_loss: min_loss,
            val_loss,
            pixel_acc: score.pixel_accuracy(),
            road_iou: score.road_iou(),
        };
        metrics.log(&row)?;

        if row.is_improvement(best_val_loss) {
            best_val_loss = row.val_loss;
        }

        if has_validation {
            println!(
                "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | pixel_acc={:.1}% | road_iou={:.3}",
                epoch, cfg.epochs, train_loss, val_loss,
                row.pixel_acc * 100.0, row.road_iou,
            );
        } else {
            println!(
                "Epoch {:>3}/{} | train_loss={:.4} | min_batch_loss={:.4}",
                epoch, cfg.epochs, train_loss, min_loss,
            );
        }

        if epoch % cfg.checkpoint_every == 0 || epoch == cfg.epochs {
            ckpt_manager.save_model(&model, epoch)?;
            tracing::info!("Checkpoint saved for epoch {}", epoch);
        }

        history.push(row);
    }

    tracing::info!("Training complete!");
    Ok(TrainingReport { history, best_val_loss })
}

/// Mean of per-batch mean losses, each weighted by its pixel count so a
/// short final batch counts only for the pixels it holds.
#[derive(Debug, Default, Clone, Copy)]
struct PixelWeightedMean {
    sum:    f64,
    pixels: usize,
}

impl PixelWeightedMean {
    fn add(&mut self, batch_mean: f64, pixels: usize) {
        self.sum    += batch_mean * pixels as f64;
        self.pixels += pixels;
    }

    /// NaN when nothing was added.
    fn mean(&self) -> f64 {
        if self.pixels == 0 { f64::NAN } else { self.sum / self.pixels as f64 }
    }
}

fn int_values<B: Backend, const D: usize>(tensor: Tensor<B, D, Int>) -> Result<Vec<i64>> {
    tensor
        .into_data()
        .convert::<i64>()
        .to_vec::<i64>()
        .map_err(|e| anyhow!("cannot read tensor values: {e:?}"))
}
