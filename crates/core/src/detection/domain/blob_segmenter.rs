use crate::detection::domain::detection_config::ThresholdPolicy;
use crate::imaging::contours::external_bounding_rects;
use crate::imaging::median::median_3x3;
use crate::imaging::morphology::{dilate_n, StructuringElement};
use crate::imaging::threshold::{adaptive_mean, binarize, invert, otsu_level};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::GrayGrid;

/// Offset subtracted from the local mean by the adaptive policy.
pub const ADAPTIVE_OFFSET: f64 = 2.0;

/// Smallest neighbourhood the adaptive policy will use.
pub const MIN_ADAPTIVE_BLOCK: usize = 11;

/// Turns a residual grid into candidate boxes.
pub struct BlobSegmenter {
    policy: ThresholdPolicy,
    invert: bool,
    remove_hot_pixels: bool,
    dilate_iterations: usize,
    adaptive_block: usize,
    bridge: StructuringElement,
}

impl BlobSegmenter {
    pub fn new(
        policy: ThresholdPolicy,
        invert: bool,
        remove_hot_pixels: bool,
        dilate_iterations: usize,
        kernel_size: usize,
    ) -> Self {
        Self {
            policy,
            invert,
            remove_hot_pixels,
            dilate_iterations,
            adaptive_block: adaptive_block_size(kernel_size),
            bridge: StructuringElement::ellipse(3),
        }
    }

    /// Binary mask of the residual: values are 0 or 255 only.
    pub fn mask(&self, residual: &GrayGrid) -> GrayGrid {
        let mut mask = match self.policy {
            ThresholdPolicy::Fixed { value } => binarize(residual, value.clamp(1, 254) as u8),
            ThresholdPolicy::Adaptive => adaptive_mean(residual, self.adaptive_block, ADAPTIVE_OFFSET),
            ThresholdPolicy::Otsu => binarize(residual, otsu_level(residual)),
        };
        if self.invert {
            mask = invert(&mask);
        }
        // Runs on the mask, not the residual: it targets isolated mask pixels.
        if self.remove_hot_pixels {
            mask = median_3x3(&mask);
        }
        if self.dilate_iterations > 0 {
            mask = dilate_n(&mask, &self.bridge, self.dilate_iterations);
        }
        mask
    }

    /// Bounding boxes of the outer components of the mask, in discovery order.
    pub fn segment(&self, residual: &GrayGrid) -> Vec<BoundingBox> {
        external_bounding_rects(&self.mask(residual))
    }
}

/// `3 * kernel_size`, forced odd, at least 11.
pub fn adaptive_block_size(kernel_size: usize) -> usize {
    ((kernel_size * 3) | 1).max(MIN_ADAPTIVE_BLOCK)
}
