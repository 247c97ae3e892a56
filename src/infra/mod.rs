// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// File-system concerns shared by the training and inference
// workflows:
//
//   checkpoint.rs    — Saving and loading model weights
//                      (Burn CompactRecorder), the pretrained
//                      backbone, and the JSON configs needed to
//                      rebuild the model for inference.
//
//   metrics.rs       — Per-epoch loss / accuracy / IoU rows
//                      appended to a CSV file.
//
//   sample_writer.rs — Road overlay PNGs for test images,
//                      one timestamped directory per run.
//
// Reference: Rust Book §9 (Error Handling with anyhow)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint and backbone loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// Inference overlay writer
pub mod sample_writer;
