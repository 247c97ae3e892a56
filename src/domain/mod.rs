// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust structs, functions and traits describing the
// road segmentation problem.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, functions and traits
//
// Everything here works on flat pixel buffers:
//   - RGB images are row-major HWC `[u8]` (3 bytes per pixel)
//   - label maps are row-major `[u8]` (one class index per pixel)
//   - probability maps are row-major `[f32]`
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// Image geometry and on-disk sample descriptors
pub mod sample;

// Ground-truth decoding, thresholding and overlay blending
pub mod mask;

// Pixel accuracy and road IoU accumulation
pub mod score;

// Core abstractions (traits) that other layers implement
pub mod traits;

/// Class index of the background (non-road) class.
pub const BACKGROUND_CLASS: u8 = 0;

/// Class index of the road class.
pub const ROAD_CLASS: u8 = 1;
