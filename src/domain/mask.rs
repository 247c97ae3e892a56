// ============================================================
// Layer 3 — Masks
// ============================================================
// Conversions between colour-coded ground truth, per-pixel
// class labels, road probabilities and the visual overlay
// written for inference samples.
//
// KITTI road ground truth is an RGB image where the
// background colour marks "not road". Every pixel that is
// NOT exactly the background colour becomes the road class.

use super::{BACKGROUND_CLASS, ROAD_CLASS};

/// Background colour of KITTI road ground-truth images.
pub const DEFAULT_BACKGROUND: [u8; 3] = [255, 0, 0];

/// Colour painted over pixels predicted as road.
pub const OVERLAY_COLOUR: [u8; 3] = [0, 255, 0];

/// Overlay opacity out of 255.
pub const OVERLAY_ALPHA: u8 = 127;

/// Decode an HWC RGB ground-truth buffer into one class index per pixel.
pub fn labels_from_ground_truth(rgb: &[u8], background: [u8; 3]) -> Vec<u8> {
    rgb.chunks_exact(3)
        .map(|px| {
            if px == background {
                BACKGROUND_CLASS
            } else {
                ROAD_CLASS
            }
        })
        .collect()
}

/// Pixels whose road probability is strictly above `threshold`.
pub fn road_mask(probs: &[f32], threshold: f32) -> Vec<bool> {
    probs.iter().map(|&p| p > threshold).collect()
}

/// Alpha-blend `colour` into every masked pixel of an HWC RGB buffer.
///
/// `mask` holds one entry per pixel; extra bytes in `rgb` past
/// `mask.len() * 3` are left untouched.
pub fn overlay_mask(rgb: &mut [u8], mask: &[bool], colour: [u8; 3], alpha: u8) {
    let a = alpha as u32;
    for (px, &on) in rgb.chunks_exact_mut(3).zip(mask) {
        if !on {
            continue;
        }
        for (c, &target) in px.iter_mut().zip(colour.iter()) {
            *c = ((*c as u32 * (255 - a) + target as u32 * a) / 255) as u8;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_colour_is_class_zero() {
        let gt = [255, 0, 0, 255, 0, 255, 0, 0, 0];
        assert_eq!(labels_from_ground_truth(&gt, DEFAULT_BACKGROUND), vec![0, 1, 1]);
    }

    #[test]
    fn test_custom_background() {
        let gt = [0, 0, 0, 255, 0, 0];
        assert_eq!(labels_from_ground_truth(&gt, [0, 0, 0]), vec![0, 1]);
    }

    #[test]
    fn test_threshold_is_strict() {
        assert_eq!(road_mask(&[0.2, 0.5, 0.51], 0.5), vec![false, false, true]);
    }

    #[test]
    fn test_overlay_only_touches_masked_pixels() {
        let mut rgb = vec![100, 100, 100, 100, 100, 100];
        overlay_mask(&mut rgb, &[true, false], OVERLAY_COLOUR, OVERLAY_ALPHA);
        // 100 * 128 / 255 = 50, (100 * 128 + 255 * 127) / 255 = 177
        assert_eq!(&rgb[..3], &[50, 177, 50]);
        assert_eq!(&rgb[3..], &[100, 100, 100]);
    }

    #[test]
    fn test_full_alpha_replaces_colour() {
        let mut rgb = vec![10, 20, 30];
        overlay_mask(&mut rgb, &[true], [1, 2, 3], 255);
        assert_eq!(rgb, vec![1, 2, 3]);
    }
}
