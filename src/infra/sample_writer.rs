// ============================================================
// Layer 6 — Inference Sample Writer
// ============================================================
// Writes road overlays for a batch of test images into a fresh
// run directory named after the current Unix time:
//
//   runs/
//     1760870400/
//       um_000000.png
//       um_000001.png
//       ...

use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use std::{
    fs,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use crate::domain::sample::ImageShape;

pub struct SampleWriter {
    run_dir: PathBuf,
}

impl SampleWriter {
    /// Create `<runs_dir>/<unix seconds>/`.
    pub fn create(runs_dir: impl AsRef<Path>) -> Result<Self> {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self::create_named(runs_dir, &stamp.to_string())
    }

    pub fn create_named(runs_dir: impl AsRef<Path>, name: &str) -> Result<Self> {
        let run_dir = runs_dir.as_ref().join(name);
        fs::create_dir_all(&run_dir)
            .with_context(|| format!("Cannot create run directory '{}'", run_dir.display()))?;
        Ok(Self { run_dir })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    /// Save an HWC RGB buffer as `<run_dir>/<file_name>`.
    pub fn write(&self, file_name: &str, rgb: Vec<u8>, shape: ImageShape) -> Result<PathBuf> {
        let img = RgbImage::from_raw(shape.width as u32, shape.height as u32, rgb).ok_or_else(|| {
            anyhow!("buffer for '{file_name}' does not match {}x{}", shape.height, shape.width)
        })?;
        let path = self.run_dir.join(file_name);
        img.save(&path)
            .map_err(|e| anyhow!("failed to write '{}': {e}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_png_into_run_dir() {
        let tmp    = tempfile::tempdir().unwrap();
        let writer = SampleWriter::create_named(tmp.path(), "run").unwrap();
        let path   = writer
            .write("um_000000.png", vec![0, 255, 0, 0, 255, 0], ImageShape::new(1, 2))
            .unwrap();

        assert_eq!(path, tmp.path().join("run/um_000000.png"));
        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (2, 1));
        assert_eq!(img.get_pixel(1, 0).0, [0, 255, 0]);
    }

    #[test]
    fn test_rejects_wrong_buffer_size() {
        let tmp    = tempfile::tempdir().unwrap();
        let writer = SampleWriter::create_named(tmp.path(), "run").unwrap();
        assert!(writer.write("x.png", vec![0; 5], ImageShape::new(1, 2)).is_err());
    }
}
