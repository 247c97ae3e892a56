// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the configuration                (Layer 3 - domain)
//   Step 2: Pair KITTI images with ground truth       (Layer 4 - data)
//   Step 3: Split train/validation                    (Layer 4 - data)
//   Step 4: Resize, normalise and label images        (Layer 4 - data)
//   Step 5: Reset the run, save configs               (Layer 6 - infra)
//   Step 6: Run training loop                         (Layer 5 - ml)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)

use anyhow::{bail, Result};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::data::{
    dataset::RoadDataset,
    loader::{KittiRoadLoader, Split},
    preprocessor::Preprocessor,
    splitter::split_train_val,
};
use crate::domain::{sample::ImageShape, traits::SampleSource};
use crate::infra::{
    checkpoint::{record_file, CheckpointManager},
    metrics::MetricsLogger,
};
use crate::ml::{
    encoder::Vgg16Config,
    model::FcnConfig,
    trainer::{run_training, TrainingReport},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All hyperparameters for a training run.
// Saved next to the checkpoints so inference can recover the input
// resolution the model was trained at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub data_dir:         String,
    pub checkpoint_dir:   String,
    /// Burn record of the pretrained VGG16 encoder.
    pub backbone:         String,
    pub from_scratch:     bool,
    pub freeze_backbone:  bool,
    pub epochs:           usize,
    pub batch_size:       usize,
    pub lr:               f64,
    pub dropout:          f64,
    pub num_classes:      usize,
    pub image_height:     usize,
    pub image_width:      usize,
    pub val_fraction:     f64,
    pub seed:             u64,
    pub l2_scale:         f64,
    pub mirror:           bool,
    pub num_workers:      usize,
    pub checkpoint_every: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_dir:         "data".to_string(),
            checkpoint_dir:   "checkpoints".to_string(),
            backbone:         "data/vgg/vgg16".to_string(),
            from_scratch:     false,
            freeze_backbone:  false,
            epochs:           50,
            batch_size:       5,
            lr:               5e-4,
            dropout:          0.5,
            num_classes:      2,
            image_height:     160,
            image_width:      576,
            val_fraction:     0.1,
            seed:             42,
            l2_scale:         0.0,
            mirror:           false,
            num_workers:      2,
            checkpoint_every: 10,
        }
    }
}

impl TrainConfig {
    pub fn image_shape(&self) -> ImageShape {
        ImageShape::new(self.image_height, self.image_width)
    }

    pub fn model_config(&self) -> FcnConfig {
        FcnConfig::new(Vgg16Config::new().with_dropout(self.dropout))
            .with_num_classes(self.num_classes)
    }

    /// Reject settings the network or the loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.image_shape().validate_for_fcn()?;
        if self.num_classes < 2 {
            bail!("num_classes must be at least 2, got {}", self.num_classes);
        }
        if !(0.0..=1.0).contains(&self.dropout) {
            bail!("dropout must be in [0, 1], got {}", self.dropout);
        }
        if self.batch_size == 0 {
            bail!("batch_size must be at least 1");
        }
        if self.checkpoint_every == 0 {
            bail!("checkpoint_every must be at least 1");
        }
        if !(0.0..1.0).contains(&self.val_fraction) {
            bail!("val_fraction must be in [0, 1), got {}", self.val_fraction);
        }
        Ok(())
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute<B: AutodiffBackend>(&self, device: B::Device) -> Result<TrainingReport> {
        let cfg = &self.config;

        // ── Step 1: Validate before touching any file ─────────────────────────
        cfg.validate()?;
        if !cfg.from_scratch {
            let record = record_file(Path::new(&cfg.backbone));
            if !record.is_file() {
                bail!(
                    "Pretrained backbone '{}' not found (pass --from-scratch to train without it)",
                    record.display()
                );
            }
        }

        // ── Steps 2-4: Samples, split and datasets ────────────────────────────
        let (train_dataset, val_dataset) = self.prepare_datasets()?;

        // ── Step 5: Reset the run and save configs for inference ─────────────
        // Weights of an earlier run must not be paired with the new configs.
        let model_cfg    = cfg.model_config();
        let ckpt_manager = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt_manager.begin_run()?;
        ckpt_manager.save_config(cfg)?;
        ckpt_manager.save_model_config(&model_cfg)?;
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;

        // ── Step 6: Run training loop (Layer 5) ───────────────────────────────
        run_training::<B>(
            cfg,
            &model_cfg,
            train_dataset,
            val_dataset,
            &ckpt_manager,
            &metrics,
            device,
        )
    }

    /// Load paired samples, split them and decode both halves into datasets.
    /// Mirroring only applies to the training half.
    pub fn prepare_datasets(&self) -> Result<(RoadDataset, RoadDataset)> {
        let cfg = &self.config;

        tracing::info!("Loading KITTI road samples from '{}'", cfg.data_dir);
        let samples = KittiRoadLoader::new(&cfg.data_dir, Split::Training).load_all()?;
        if samples.is_empty() {
            bail!("No training samples with ground truth found under '{}'", cfg.data_dir);
        }
        tracing::info!("Found {} training samples", samples.len());

        let (train_samples, val_samples) =
            split_train_val(samples, 1.0 - cfg.val_fraction, cfg.seed);
        if train_samples.is_empty() {
            bail!("Validation split left no training samples");
        }
        tracing::info!(
            "Split: {} train, {} validation",
            train_samples.len(),
            val_samples.len()
        );

        let preprocessor  = Preprocessor::new(cfg.image_shape());
        let train_dataset = RoadDataset::load(&train_samples, &preprocessor)?.with_mirroring(cfg.mirror);
        let val_dataset   = RoadDataset::load(&val_samples, &preprocessor)?;
        Ok((train_dataset, val_dataset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};
    use burn::data::dataset::Dataset;
    use image::{Rgb, RgbImage};
    use std::path::PathBuf;

    type TrainBackend = Autodiff<NdArray<f32>>;

    /// KITTI-style tree with `n` paired 64x32 training images.
    fn kitti_fixture(n: usize) -> tempfile::TempDir {
        let tmp  = tempfile::tempdir().unwrap();
        let road = tmp.path().join("data_road/training");
        std::fs::create_dir_all(road.join("image_2")).unwrap();
        std::fs::create_dir_all(road.join("gt_image_2")).unwrap();
        for i in 0..n {
            let mut img = RgbImage::from_pixel(64, 32, Rgb([90, 90, 90]));
            img.put_pixel(0, 0, Rgb([250, 10, 10]));
            img.save(road.join(format!("um_{i:06}.png"))).unwrap();

            let mut gt = RgbImage::from_pixel(64, 32, Rgb([255, 0, 0]));
            gt.put_pixel(0, 31, Rgb([255, 0, 255]));
            gt.save(road.join(format!("gt_image_2/um_road_{i:06}.png"))).unwrap();
        }
        tmp
    }

    fn fixture_config(root: &Path) -> TrainConfig {
        TrainConfig {
            data_dir: root.to_string_lossy().into_owned(),
            checkpoint_dir: root.join("ckpt").to_string_lossy().into_owned(),
            image_height: 32,
            image_width: 64,
            val_fraction: 0.0,
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        let cfg = TrainConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.image_shape(), ImageShape::new(160, 576));
        assert_eq!(cfg.model_config().num_classes, 2);
    }

    #[test]
    fn test_rejects_bad_shape() {
        let cfg = TrainConfig { image_width: 570, ..TrainConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_single_class() {
        let cfg = TrainConfig { num_classes: 1, ..TrainConfig::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_dropout_outside_unit_range() {
        for dropout in [1.5, -0.1] {
            let cfg = TrainConfig { dropout, ..TrainConfig::default() };
            assert!(cfg.validate().is_err());
        }
        let cfg = TrainConfig { dropout: 1.0, ..TrainConfig::default() };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_l2_penalty_is_opt_in() {
        assert_eq!(TrainConfig::default().l2_scale, 0.0);
    }

    #[test]
    fn test_model_config_carries_dropout() {
        let cfg = TrainConfig { dropout: 0.2, num_classes: 3, ..TrainConfig::default() };
        let model_cfg = cfg.model_config();
        assert_eq!(model_cfg.encoder.dropout, 0.2);
        assert_eq!(model_cfg.num_classes, 3);
    }

    #[test]
    fn test_empty_training_set_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("data_road/training/image_2")).unwrap();
        std::fs::create_dir_all(tmp.path().join("data_road/training/gt_image_2")).unwrap();

        let cfg = TrainConfig {
            data_dir: tmp.path().to_string_lossy().into_owned(),
            checkpoint_dir: tmp.path().join("ckpt").to_string_lossy().into_owned(),
            from_scratch: true,
            ..TrainConfig::default()
        };
        let result = TrainUseCase::new(cfg)
            .execute::<Autodiff<NdArray<f32>>>(NdArrayDevice::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_config_fails_before_loading() {
        let cfg = TrainConfig {
            data_dir: "/nonexistent".to_string(),
            image_height: 100,
            ..TrainConfig::default()
        };
        let err = TrainUseCase::new(cfg)
            .execute::<Autodiff<NdArray<f32>>>(NdArrayDevice::default())
            .unwrap_err();
        assert!(err.to_string().contains("32"));
    }

    #[test]
    fn test_missing_backbone_leaves_previous_run_intact() {
        let tmp = kitti_fixture(2);
        let cfg = TrainConfig {
            backbone: tmp.path().join("vgg/absent").to_string_lossy().into_owned(),
            num_classes: 3,
            ..fixture_config(tmp.path())
        };

        let ckpt_dir = PathBuf::from(&cfg.checkpoint_dir);
        let previous = CheckpointManager::new(&ckpt_dir).unwrap();
        previous.save_model_config(&cfg.model_config().with_num_classes(2)).unwrap();
        std::fs::write(ckpt_dir.join("latest_epoch.json"), "50").unwrap();

        let err = TrainUseCase::new(cfg)
            .execute::<TrainBackend>(NdArrayDevice::default())
            .unwrap_err();
        assert!(err.to_string().contains("--from-scratch"));

        assert_eq!(previous.load_model_config().unwrap().num_classes, 2);
        assert!(ckpt_dir.join("latest_epoch.json").exists());
    }

    #[test]
    fn test_prepare_mirrors_training_half_only() {
        let tmp = kitti_fixture(3);

        let plain = TrainUseCase::new(fixture_config(tmp.path()));
        let (train, val) = plain.prepare_datasets().unwrap();
        assert_eq!(train.len(), 3);
        assert_eq!(val.len(), 0);

        let mirrored = TrainUseCase::new(TrainConfig { mirror: true, ..fixture_config(tmp.path()) });
        let (train, val) = mirrored.prepare_datasets().unwrap();
        assert_eq!(train.len(), 6);
        assert_eq!(train.sample_count(), 3);
        assert_eq!(val.len(), 0);

        let original = train.get(0).unwrap();
        let flipped  = train.get(3).unwrap();
        assert_eq!(flipped.rgb, original.mirrored().rgb);
        assert_eq!(flipped.labels, original.mirrored().labels);
        assert_ne!(flipped.rgb, original.rgb);
    }
}
