use crate::detection::domain::background_suppressor::BackgroundSuppressor;
use crate::detection::domain::blob_segmenter::BlobSegmenter;
use crate::detection::domain::candidate_filter::CandidateFilter;
use crate::detection::domain::detection_config::DetectionConfig;
use crate::detection::domain::light_detector::LightDetector;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Point-light detector built on a morphological top-hat.
///
/// `intensity → gamma/equalize → blur → top-hat → threshold → components → filter`
pub struct TopHatLightDetector {
    suppressor: BackgroundSuppressor,
    segmenter: BlobSegmenter,
    filter: CandidateFilter,
}

impl TopHatLightDetector {
    pub fn new(config: &DetectionConfig) -> Self {
        let cfg = config.sanitized();
        Self {
            suppressor: BackgroundSuppressor::new(cfg.gamma, cfg.equalize, cfg.kernel_size),
            segmenter: BlobSegmenter::new(
                cfg.threshold,
                cfg.invert,
                cfg.remove_hot_pixels,
                cfg.dilate_iterations,
                cfg.kernel_size,
            ),
            filter: CandidateFilter {
                min_area: cfg.min_area,
                max_area: cfg.max_area,
                min_brightness: cfg.min_brightness,
                aspect_ratio_max: cfg.aspect_ratio_max,
            },
        }
    }
}

impl LightDetector for TopHatLightDetector {
    fn detect(&self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(Vec::new());
        }
        let suppressed = self.suppressor.suppress(&frame.to_intensity());
        let candidates = self.segmenter.segment(&suppressed.residual);
        let boxes = self.filter.apply(&candidates, &suppressed.remapped);
        log::debug!(
            "frame {} ({}): {} candidates, {} lights",
            frame.index(),
            frame.name(),
            candidates.len(),
            boxes.len()
        );
        Ok(boxes)
    }
}
