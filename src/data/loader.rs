// ============================================================
// Layer 4 — KITTI Road Loader
// ============================================================
// Enumerates samples from the KITTI road benchmark layout:
//
//   <data_dir>/data_road/
//     training/
//       image_2/     um_000000.png, umm_000000.png, uu_000000.png, ...
//       gt_image_2/  um_road_000000.png, um_lane_000000.png, ...
//     testing/
//       image_2/     um_000000.png, ...
//
// Ground truth is matched to its image by removing the
// "_road" infix: um_road_000012.png → um_000012.png.
// Lane annotations ("_lane_") are not used.

use anyhow::{bail, Context, Result};
use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use crate::domain::sample::RoadSample;
use crate::domain::traits::SampleSource;

/// Image counts of the official KITTI road release.
pub const KITTI_TRAINING_IMAGES: usize = 289;
pub const KITTI_TESTING_IMAGES: usize = 290;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Split {
    Training,
    Testing,
}

impl Split {
    fn dir_name(self) -> &'static str {
        match self {
            Split::Training => "training",
            Split::Testing => "testing",
        }
    }
}

pub struct KittiRoadLoader {
    split_dir: PathBuf,
    split:     Split,
}

impl KittiRoadLoader {
    pub fn new(data_dir: impl AsRef<Path>, split: Split) -> Self {
        let split_dir = data_dir.as_ref().join("data_road").join(split.dir_name());
        Self { split_dir, split }
    }

    pub fn image_dir(&self) -> PathBuf {
        self.split_dir.join("image_2")
    }

    pub fn ground_truth_dir(&self) -> PathBuf {
        self.split_dir.join("gt_image_2")
    }

    fn ground_truth_by_image_name(&self) -> Result<HashMap<String, PathBuf>> {
        let mut map = HashMap::new();
        for path in list_pngs(&self.ground_truth_dir())? {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(image_name) = image_name_for_ground_truth(name) {
                map.insert(image_name, path);
            }
        }
        Ok(map)
    }
}

impl SampleSource for KittiRoadLoader {
    fn load_all(&self) -> Result<Vec<RoadSample>> {
        let images = list_pngs(&self.image_dir())?;

        let samples = match self.split {
            Split::Testing => images
                .into_iter()
                .map(|image| RoadSample::new(image, None))
                .collect(),
            Split::Training => {
                let mut gt = self.ground_truth_by_image_name()?;
                let mut samples = Vec::with_capacity(images.len());
                for image in images {
                    let name = image
                        .file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or_default()
                        .to_string();
                    match gt.remove(&name) {
                        Some(truth) => samples.push(RoadSample::new(image, Some(truth))),
                        None => tracing::warn!(
                            "No road ground truth for '{}', skipping",
                            image.display()
                        ),
                    }
                }
                for orphan in gt.values() {
                    tracing::warn!("Ground truth '{}' has no matching image", orphan.display());
                }
                samples
            }
        };

        tracing::debug!(
            "Found {} {} samples under '{}'",
            samples.len(),
            self.split.dir_name(),
            self.split_dir.display()
        );
        Ok(samples)
    }
}

/// `um_road_000012.png` → `um_000012.png`; anything else → None.
pub fn image_name_for_ground_truth(gt_name: &str) -> Option<String> {
    let (category, rest) = gt_name.split_once("_road_")?;
    if category.is_empty() || rest.is_empty() {
        return None;
    }
    Some(format!("{category}_{rest}"))
}

/// Sorted list of `.png` files in `dir`.
fn list_pngs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Expected directory '{}' does not exist", dir.display());
    }
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("Cannot read directory '{}'", dir.display()))?
    {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) == Some("png") {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

// ─── Dataset Report ───────────────────────────────────────────────────────────
/// Summary produced by the `check-data` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetReport {
    pub training_images: usize,
    pub paired_samples:  usize,
    pub testing_images:  usize,
}

impl DatasetReport {
    pub fn collect(data_dir: impl AsRef<Path>) -> Result<Self> {
        let train = KittiRoadLoader::new(&data_dir, Split::Training);
        let test  = KittiRoadLoader::new(&data_dir, Split::Testing);

        let training_images = list_pngs(&train.image_dir())?.len();
        let paired_samples  = train.load_all()?.len();
        let testing_images  = test.load_all()?.len();

        Ok(Self { training_images, paired_samples, testing_images })
    }

    /// True when the counts match the official KITTI road release.
    pub fn is_complete_kitti(&self) -> bool {
        self.training_images == KITTI_TRAINING_IMAGES
            && self.paired_samples == KITTI_TRAINING_IMAGES
            && self.testing_images == KITTI_TESTING_IMAGES
    }
}
