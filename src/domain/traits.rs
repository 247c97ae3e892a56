// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer talks to data sources and to the
// trained network through these traits, so neither the KITTI
// directory layout nor the burn backend leaks into it.
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::sample::RoadSample;

// ─── SampleSource ─────────────────────────────────────────────────────────────
/// Anything that can enumerate road samples on disk.
///
/// Implementations:
///   - KittiRoadLoader → `data_road/{training,testing}` layout
pub trait SampleSource {
    /// List every sample, sorted by image path.
    fn load_all(&self) -> Result<Vec<RoadSample>>;
}

// ─── RoadSegmenter ────────────────────────────────────────────────────────────
/// Anything that can score every pixel of an image as road.
///
/// Implementations:
///   - Inferencer → the trained FCN on any burn backend
pub trait RoadSegmenter {
    /// `rgb` is an HWC buffer already resized to the network shape.
    /// Returns one road probability per pixel, row-major.
    fn road_probabilities(&self, rgb: &[u8]) -> Result<Vec<f32>>;
}
