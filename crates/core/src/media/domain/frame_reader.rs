use std::path::Path;

use crate::shared::batch_metadata::BatchMetadata;
use crate::shared::frame::Frame;

/// Reads a batch of still frames from some source.
///
/// Frames are yielded in batch order; a frame's index is its position in the
/// batch listing. A frame that cannot be decoded is yielded as an `Err` so
/// the caller can skip it and carry on with the rest of the batch.
pub trait FrameReader: Send {
    /// Scans the source and returns what it found.
    fn open(&mut self, source: &Path) -> Result<BatchMetadata, Box<dyn std::error::Error>>;

    /// Returns an iterator over the frames found by `open`.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_>;

    /// Releases any resources held by the reader.
    fn close(&mut self);
}
