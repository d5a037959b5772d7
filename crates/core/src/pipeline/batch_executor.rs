use std::sync::Arc;

use crate::detection::domain::light_detector::LightDetector;
use crate::media::domain::frame_reader::FrameReader;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Receives each detected frame, in reading order, on the calling thread.
pub type FrameSink<'a> =
    dyn FnMut(Frame, Vec<BoundingBox>) -> Result<(), Box<dyn std::error::Error>> + 'a;

/// Counts from one batch run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub processed: usize,
    pub skipped: usize,
}

/// Abstracts how the read → detect → sink loop over a batch is executed.
///
/// Frames that fail to decode are logged and skipped. A detector or sink
/// error aborts the run. The sink always sees frames in reading order.
pub trait BatchExecutor: Send {
    fn execute(
        &self,
        reader: &mut dyn FrameReader,
        detector: Arc<dyn LightDetector>,
        sink: &mut FrameSink<'_>,
    ) -> Result<BatchOutcome, Box<dyn std::error::Error>>;
}

/// Runs everything on the calling thread.
pub struct SequentialBatchExecutor;

impl SequentialBatchExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SequentialBatchExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl BatchExecutor for SequentialBatchExecutor {
    fn execute(
        &self,
        reader: &mut dyn FrameReader,
        detector: Arc<dyn LightDetector>,
        sink: &mut FrameSink<'_>,
    ) -> Result<BatchOutcome, Box<dyn std::error::Error>> {
        let mut outcome = BatchOutcome::default();
        for frame_result in reader.frames() {
            let frame = match frame_result {
                Ok(frame) => frame,
                Err(e) => {
                    log::warn!("Skipping unreadable frame: {e}");
                    outcome.skipped += 1;
                    continue;
                }
            };
            let boxes = detector.detect(&frame)?;
            sink(frame, boxes)?;
            outcome.processed += 1;
        }
        Ok(outcome)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::path::Path;

    use super::*;
    use crate::shared::batch_metadata::BatchMetadata;

    // --- Stubs ---

    /// Yields prepared frames; `None` entries become read errors.
    pub struct StubFrameReader {
        pub frames: Vec<Option<Frame>>,
    }

    impl StubFrameReader {
        pub fn new(frames: Vec<Option<Frame>>) -> Self {
            Self { frames }
        }
    }

    impl FrameReader for StubFrameReader {
        fn open(&mut self, _source: &Path) -> Result<BatchMetadata, Box<dyn std::error::Error>> {
            Ok(BatchMetadata {
                total_frames: self.frames.len(),
                names: self
                    .frames
                    .iter()
                    .flatten()
                    .map(|f| f.name().to_string())
                    .collect(),
                source_dir: None,
            })
        }

        fn frames(
            &mut self,
        ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
            Box::new(std::mem::take(&mut self.frames).into_iter().map(|f| {
                f.ok_or_else(|| -> Box<dyn std::error::Error> { "corrupt frame".into() })
            }))
        }

        fn close(&mut self) {
            self.frames.clear();
        }
    }

    /// Reports one box whose x is the frame index.
    pub struct IndexDetector;

    impl LightDetector for IndexDetector {
        fn detect(
            &self,
            frame: &Frame,
        ) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
            Ok(vec![BoundingBox::new(frame.index() as i32, 0, 1, 1)])
        }
    }

    /// Fails on the frame with the given index.
    pub struct FailingDetector {
        pub fail_at: usize,
    }

    impl LightDetector for FailingDetector {
        fn detect(
            &self,
            frame: &Frame,
        ) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
            if frame.index() == self.fail_at {
                return Err("detector exploded".into());
            }
            Ok(Vec::new())
        }
    }

    pub fn make_frame(index: usize) -> Frame {
        Frame::new(vec![0; 4 * 4 * 3], 4, 4, 3, index).with_name(format!("{index:04}.png"))
    }
}
