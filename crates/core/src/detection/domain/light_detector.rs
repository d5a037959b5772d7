use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Domain interface for per-frame light detection.
///
/// Implementations are stateless across frames, so one detector can be
/// shared by several worker threads. The returned boxes are in canonical
/// (top, left) order.
pub trait LightDetector: Send + Sync {
    fn detect(&self, frame: &Frame) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>>;
}
