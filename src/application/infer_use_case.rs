// ============================================================
// Layer 2 — InferUseCase
// ============================================================
// Segments every KITTI testing image with a trained checkpoint:
//
//   Step 1: Rebuild the model from the checkpoint     (Layer 5 - ml)
//   Step 2: List testing images                       (Layer 4 - data)
//   Step 3: Resize, segment, threshold, overlay       (Layer 3/4)
//   Step 4: Write one PNG per image                   (Layer 6 - infra)

use anyhow::{Context, Result};
use burn::prelude::Backend;
use std::path::PathBuf;

use crate::data::{
    loader::{DatasetReport, KittiRoadLoader, Split},
    preprocessor::Preprocessor,
};
use crate::domain::{
    mask::{overlay_mask, road_mask, OVERLAY_ALPHA, OVERLAY_COLOUR},
    sample::RoadSample,
    traits::{RoadSegmenter, SampleSource},
};
use crate::infra::{checkpoint::CheckpointManager, sample_writer::SampleWriter};
use crate::ml::inferencer::Inferencer;

#[derive(Debug, Clone)]
pub struct InferConfig {
    pub data_dir:       String,
    pub checkpoint_dir: String,
    pub runs_dir:       String,
    pub threshold:      f32,
}

impl Default for InferConfig {
    fn default() -> Self {
        Self {
            data_dir:       "data".to_string(),
            checkpoint_dir: "checkpoints".to_string(),
            runs_dir:       "runs".to_string(),
            threshold:      0.5,
        }
    }
}

pub struct InferUseCase {
    config: InferConfig,
}

impl InferUseCase {
    pub fn new(config: InferConfig) -> Self {
        Self { config }
    }

    /// Returns the run directory holding the overlays.
    pub fn execute<B: Backend>(&self, device: B::Device) -> Result<PathBuf> {
        let cfg = &self.config;

        let missing = || format!("No trained model in '{}'; run `train` first", cfg.checkpoint_dir);
        let ckpt_manager = CheckpointManager::open(&cfg.checkpoint_dir).with_context(missing)?;
        let inferencer   = Inferencer::<B>::from_checkpoint(&ckpt_manager, device).with_context(missing)?;

        let samples = KittiRoadLoader::new(&cfg.data_dir, Split::Testing).load_all()?;
        tracing::info!("Segmenting {} testing images", samples.len());

        let preprocessor = Preprocessor::new(inferencer.shape());
        let writer       = SampleWriter::create(&cfg.runs_dir)?;
        segment_all(&inferencer, &preprocessor, &samples, cfg.threshold, &writer)?;

        tracing::info!("Overlays written to '{}'", writer.run_dir().display());
        Ok(writer.run_dir().to_path_buf())
    }
}

fn segment_all(
    segmenter:    &impl RoadSegmenter,
    preprocessor: &Preprocessor,
    samples:      &[RoadSample],
    threshold:    f32,
    writer:       &SampleWriter,
) -> Result<usize> {
    for sample in samples {
        let mut rgb = preprocessor.load_rgb(&sample.image)?;
        let probs   = segmenter.road_probabilities(&rgb)?;
        let mask    = road_mask(&probs, threshold);
        overlay_mask(&mut rgb, &mask, OVERLAY_COLOUR, OVERLAY_ALPHA);
        writer.write(&sample.file_name(), rgb, preprocessor.shape())?;
    }
    Ok(samples.len())
}

/// Count what is on disk for the `check-data` command.
pub fn check_dataset(data_dir: &str) -> Result<DatasetReport> {
    let report = DatasetReport::collect(data_dir)?;
    if !report.is_complete_kitti() {
        tracing::warn!("Dataset under '{}' differs from the KITTI road release", data_dir);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::ImageShape;
    use image::{Rgb, RgbImage};

    /// Calls everything in the top half road.
    struct TopHalf;

    impl RoadSegmenter for TopHalf {
        fn road_probabilities(&self, rgb: &[u8]) -> Result<Vec<f32>> {
            let n = rgb.len() / 3;
            Ok((0..n).map(|i| if i < n / 2 { 0.9 } else { 0.1 }).collect())
        }
    }

    #[test]
    fn test_overlays_written_per_image() {
        let tmp  = tempfile::tempdir().unwrap();
        let path = tmp.path().join("um_000007.png");
        RgbImage::from_pixel(8, 4, Rgb([0, 0, 0])).save(&path).unwrap();

        let preprocessor = Preprocessor::new(ImageShape::new(2, 4));
        let writer       = SampleWriter::create_named(tmp.path(), "run").unwrap();
        let samples      = vec![RoadSample::new(&path, None)];

        let written = segment_all(&TopHalf, &preprocessor, &samples, 0.5, &writer).unwrap();
        assert_eq!(written, 1);

        let out = image::open(tmp.path().join("run/um_000007.png")).unwrap().to_rgb8();
        assert_eq!(out.dimensions(), (4, 2));
        assert!(out.get_pixel(0, 0).0[1] > 100);
        assert_eq!(out.get_pixel(0, 1).0, [0, 0, 0]);
    }

    #[test]
    fn test_infer_without_checkpoint_fails() {
        use burn::backend::{ndarray::NdArrayDevice, NdArray};

        let tmp = tempfile::tempdir().unwrap();
        let cfg = InferConfig {
            data_dir: tmp.path().to_string_lossy().into_owned(),
            checkpoint_dir: tmp.path().join("ckpt").to_string_lossy().into_owned(),
            runs_dir: tmp.path().join("runs").to_string_lossy().into_owned(),
            ..InferConfig::default()
        };
        let err = InferUseCase::new(cfg)
            .execute::<NdArray<f32>>(NdArrayDevice::default())
            .unwrap_err();
        assert!(err.to_string().contains("run `train` first"));
        assert!(!tmp.path().join("ckpt").exists());
    }

    #[test]
    fn test_infer_with_empty_checkpoint_dir_fails() {
        use burn::backend::{ndarray::NdArrayDevice, NdArray};

        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("ckpt")).unwrap();
        let cfg = InferConfig {
            data_dir: tmp.path().to_string_lossy().into_owned(),
            checkpoint_dir: tmp.path().join("ckpt").to_string_lossy().into_owned(),
            runs_dir: tmp.path().join("runs").to_string_lossy().into_owned(),
            ..InferConfig::default()
        };
        assert!(InferUseCase::new(cfg).execute::<NdArray<f32>>(NdArrayDevice::default()).is_err());
        assert!(!tmp.path().join("runs").exists());
    }

    #[test]
    fn test_check_dataset_counts_empty_release() {
        let tmp = tempfile::tempdir().unwrap();
        for dir in ["training/image_2", "training/gt_image_2", "testing/image_2"] {
            std::fs::create_dir_all(tmp.path().join("data_road").join(dir)).unwrap();
        }
        let report = check_dataset(&tmp.path().to_string_lossy()).unwrap();
        assert_eq!(report.training_images, 0);
        assert!(!report.is_complete_kitti());
    }
}
