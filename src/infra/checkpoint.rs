// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder,
// and loads the pretrained VGG16 backbone.
//
// Layout of the checkpoint directory:
//
//   checkpoints/
//     model_epoch_1.mpk.gz   ← full FCN weights after epoch 1
//     ...
//     latest_epoch.json      ← number of the newest saved epoch
//     train_config.json      ← TrainConfig (image shape, classes, ...)
//     model_config.json      ← FcnConfig (layer widths)
//
// The two config files let the inferencer rebuild the exact
// architecture before loading weights into it.
//
// Recorder paths are given WITHOUT extension; CompactRecorder
// appends ".mpk.gz" itself.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use anyhow::{anyhow, bail, Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::encoder::Vgg16Encoder;
use crate::ml::model::{FcnConfig, FcnModel};

pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Create a manager rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    /// Open an existing checkpoint directory without creating it.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if !dir.is_dir() {
            bail!("Checkpoint directory '{}' does not exist", dir.display());
        }
        Ok(Self { dir })
    }

    /// Forget the previous run's weights so its `latest_epoch.json` can no
    /// longer pair old weights with freshly written configs.
    pub fn begin_run(&self) -> Result<()> {
        let latest_path = self.dir.join("latest_epoch.json");
        if latest_path.exists() {
            fs::remove_file(&latest_path)
                .with_context(|| format!("Cannot remove '{}'", latest_path.display()))?;
            tracing::info!("Cleared previous run pointer in '{}'", self.dir.display());
        }
        Ok(())
    }

    /// Write `model_epoch_{epoch}.mpk.gz` and point `latest_epoch.json` at it.
    pub fn save_model<B: Backend>(&self, model: &FcnModel<B>, epoch: usize) -> Result<()> {
        let path = self.dir.join(format!("model_epoch_{epoch}"));

        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .map_err(|e| anyhow!("Failed to save checkpoint to '{}': {e}", path.display()))?;

        let latest_path = self.dir.join("latest_epoch.json");
        fs::write(&latest_path, serde_json::to_string(&epoch)?)
            .with_context(|| format!("Failed to write '{}'", latest_path.display()))?;

        tracing::debug!("Saved checkpoint: epoch {}", epoch);
        Ok(())
    }

    /// Load the latest saved weights into `model`.
    pub fn load_model<B: Backend>(&self, model: FcnModel<B>, device: &B::Device) -> Result<FcnModel<B>> {
        let epoch = self.latest_epoch()?;
        let path  = self.dir.join(format!("model_epoch_{epoch}"));

        tracing::info!("Loading checkpoint from epoch {}", epoch);

        let record = CompactRecorder::new().load(path.clone(), device).map_err(|e| {
            anyhow!("Cannot load checkpoint '{}': {e}. Have you trained the model first?", path.display())
        })?;

        Ok(model.load_record(record))
    }

    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        fs::write(&path, serde_json::to_string_pretty(cfg)?)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Make sure you have run 'train' before 'infer'.",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save_model_config(&self, cfg: &FcnConfig) -> Result<()> {
        let path = self.dir.join("model_config.json");
        cfg.save(&path)
            .with_context(|| format!("Cannot write model config to '{}'", path.display()))
    }

    pub fn load_model_config(&self) -> Result<FcnConfig> {
        let path = self.dir.join("model_config.json");
        FcnConfig::load(&path)
            .map_err(|e| anyhow!("Cannot read model config from '{}': {e}", path.display()))
    }

    fn latest_epoch(&self) -> Result<usize> {
        let path = self.dir.join("latest_epoch.json");
        let s = fs::read_to_string(&path)
            .with_context(|| format!("Cannot find '{}'. Have you run 'train' first?", path.display()))?;
        Ok(serde_json::from_str::<usize>(&s)?)
    }
}

/// File `CompactRecorder` reads for a record path given without extension.
pub fn record_file(path: &Path) -> PathBuf {
    path.with_extension("mpk.gz")
}

/// Load pretrained VGG16 weights (a burn record, path without extension).
///
/// The record must have been produced for an encoder with the same
/// widths; loading fails otherwise.
pub fn load_backbone<B: Backend>(
    encoder: Vgg16Encoder<B>,
    path:    &Path,
    device:  &B::Device,
) -> Result<Vgg16Encoder<B>> {
    let record = CompactRecorder::new()
        .load(path.to_path_buf(), device)
        .map_err(|e| anyhow!("Cannot load pretrained backbone '{}': {e}", path.display()))?;
    tracing::info!("Loaded pretrained backbone from '{}'", path.display());
    Ok(encoder.load_record(record))
}
