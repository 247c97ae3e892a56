// ============================================================
// Layer 3 — Segmentation Score
// ============================================================
// Accumulates pixel-level agreement between predicted and
// ground-truth class maps across many batches.
//
//   pixel_accuracy = correct / total
//   road_iou       = |pred ∩ truth| / |pred ∪ truth|   (road class only)

use super::ROAD_CLASS;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentationScore {
    pub correct:      u64,
    pub total:        u64,
    pub intersection: u64,
    pub union:        u64,
}

impl SegmentationScore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one batch of flattened predictions and targets.
    /// Only the common prefix is scored if the lengths differ.
    pub fn accumulate(&mut self, predicted: &[i64], target: &[i64]) {
        let road = ROAD_CLASS as i64;
        for (&p, &t) in predicted.iter().zip(target) {
            self.total += 1;
            if p == t {
                self.correct += 1;
            }
            let (p_road, t_road) = (p == road, t == road);
            if p_road && t_road {
                self.intersection += 1;
            }
            if p_road || t_road {
                self.union += 1;
            }
        }
    }

    pub fn pixel_accuracy(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }

    pub fn road_iou(&self) -> f64 {
        if self.union == 0 {
            0.0
        } else {
            self.intersection as f64 / self.union as f64
        }
    }
}
