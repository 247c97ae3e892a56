// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything from KITTI road PNGs on disk to tensor batches.
//
//   data_road/ PNG files
//       │
//       ▼
//   KittiRoadLoader   → pairs images with road ground truth
//       │
//       ▼
//   split_train_val   → seeded shuffle + train/validation split
//       │
//       ▼
//   Preprocessor      → resize, decode labels
//       │
//       ▼
//   RoadDataset       → implements Burn's Dataset trait
//       │
//       ▼
//   RoadBatcher       → stacks items into image/label tensors
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop
//
// Reference: Burn Book §4 (Datasets and Dataloaders)

/// Enumerates KITTI road samples and pairs ground truth
pub mod loader;

/// Resizes images and decodes ground-truth colours into labels
pub mod preprocessor;

/// Implements Burn's Dataset trait for decoded road images
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Shuffles and splits samples into train/validation sets
pub mod splitter;
