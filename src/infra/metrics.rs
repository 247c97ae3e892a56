// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per training epoch; each run starts a new file.
//
// Columns:
//   - epoch:          epoch number (starts at 1)
//   - train_loss:     mean training loss over all minibatches
//   - min_batch_loss: lowest single-minibatch loss of the epoch
//   - val_loss:       mean validation cross-entropy (NaN without validation)
//   - pixel_acc:      fraction of validation pixels classified correctly
//   - road_iou:       intersection-over-union of the road class
//
// Output file: checkpoints/metrics.csv
//
// Example:
//   epoch,train_loss,min_batch_loss,val_loss,pixel_acc,road_iou
//   1,0.683100,0.521900,0.498200,0.801300,0.512000
//   2,0.402500,0.301100,0.351800,0.893100,0.704200

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

const HEADER: &str = "epoch,train_loss,min_batch_loss,val_loss,pixel_acc,road_iou";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    pub epoch:          usize,
    pub train_loss:     f64,
    pub min_batch_loss: f64,
    pub val_loss:       f64,
    pub pixel_acc:      f64,
    pub road_iou:       f64,
}

impl EpochMetrics {
    /// True when this epoch's validation loss beats `best_val_loss`.
    /// A NaN validation loss is never an improvement.
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss < best_val_loss
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Start `dir/metrics.csv` afresh with just the header, so every
    /// training run gets its own history.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "{HEADER}")?;
        tracing::debug!("Started metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{:.6}",
            m.epoch, m.train_loss, m.min_batch_loss, m.val_loss, m.pixel_acc, m.road_iou,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, val_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.val_loss,
        );
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
