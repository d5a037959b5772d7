use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread::ScopedJoinHandle;

use crate::detection::domain::light_detector::LightDetector;
use crate::media::domain::frame_reader::FrameReader;
use crate::pipeline::batch_executor::{BatchExecutor, BatchOutcome, FrameSink};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

const DEFAULT_CHANNEL_CAPACITY: usize = 8;

type SendError = Box<dyn std::error::Error + Send + Sync>;

enum Detected {
    Lights(Frame, Vec<BoundingBox>),
    Unreadable(SendError),
    Failed(SendError),
}

/// Executes a batch with one reader thread and a pool of detector threads.
///
/// Layout: `reader → detect × N → main [reorder → sink]`
///
/// Detection runs out of order across workers; the main thread buffers
/// results by sequence number so the sink sees frames in reading order.
pub struct ThreadedBatchExecutor {
    workers: usize,
    channel_capacity: usize,
}

impl ThreadedBatchExecutor {
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// One worker per available core.
    pub fn with_available_parallelism() -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self::new(workers)
    }

    pub fn workers(&self) -> usize {
        self.workers
    }
}

impl Default for ThreadedBatchExecutor {
    fn default() -> Self {
        Self::with_available_parallelism()
    }
}

impl BatchExecutor for ThreadedBatchExecutor {
    fn execute(
        &self,
        reader: &mut dyn FrameReader,
        detector: Arc<dyn LightDetector>,
        sink: &mut FrameSink<'_>,
    ) -> Result<BatchOutcome, Box<dyn std::error::Error>> {
        let cap = self.channel_capacity;

        std::thread::scope(|scope| {
            let (frame_tx, frame_rx) =
                crossbeam_channel::bounded::<(usize, Result<Frame, SendError>)>(cap);
            let (detected_tx, detected_rx) = crossbeam_channel::bounded::<(usize, Detected)>(cap);

            let reader_handle = scope.spawn(move || {
                for (seq, frame_result) in reader.frames().enumerate() {
                    let mapped = frame_result.map_err(|e| -> SendError { e.to_string().into() });
                    if frame_tx.send((seq, mapped)).is_err() {
                        break;
                    }
                }
            });

            let detect_handles: Vec<ScopedJoinHandle<'_, ()>> = (0..self.workers)
                .map(|_| {
                    let frame_rx = frame_rx.clone();
                    let detected_tx = detected_tx.clone();
                    let detector = Arc::clone(&detector);
                    scope.spawn(move || {
                        for (seq, frame_result) in frame_rx {
                            let detected = match frame_result {
                                Ok(frame) => match detector.detect(&frame) {
                                    Ok(boxes) => Detected::Lights(frame, boxes),
                                    Err(e) => Detected::Failed(e.to_string().into()),
                                },
                                Err(e) => Detected::Unreadable(e),
                            };
                            if detected_tx.send((seq, detected)).is_err() {
                                break;
                            }
                        }
                    })
                })
                .collect();
            drop(frame_rx);
            drop(detected_tx);

            let main_result = run_main_loop(detected_rx, sink);

            join_threads(reader_handle, detect_handles, main_result)
        })
    }
}

/// Reorders detector output and feeds the sink. Returning early drops the
/// receiver, which unwinds the worker and reader threads.
fn run_main_loop(
    detected_rx: crossbeam_channel::Receiver<(usize, Detected)>,
    sink: &mut FrameSink<'_>,
) -> Result<BatchOutcome, Box<dyn std::error::Error>> {
    let mut pending: BTreeMap<usize, Detected> = BTreeMap::new();
    let mut next_seq = 0;
    let mut outcome = BatchOutcome::default();

    for (seq, detected) in detected_rx {
        pending.insert(seq, detected);

        while let Some(detected) = pending.remove(&next_seq) {
            next_seq += 1;
            match detected {
                Detected::Lights(frame, boxes) => {
                    sink(frame, boxes)?;
                    outcome.processed += 1;
                }
                Detected::Unreadable(e) => {
                    log::warn!("Skipping unreadable frame: {e}");
                    outcome.skipped += 1;
                }
                Detected::Failed(e) => return Err(e.to_string().into()),
            }
        }
    }

    Ok(outcome)
}

fn join_threads(
    reader_handle: ScopedJoinHandle<'_, ()>,
    detect_handles: Vec<ScopedJoinHandle<'_, ()>>,
    main_result: Result<BatchOutcome, Box<dyn std::error::Error>>,
) -> Result<BatchOutcome, Box<dyn std::error::Error>> {
    reader_handle
        .join()
        .map_err(|_| "Reader thread panicked")?;

    for handle in detect_handles {
        handle.join().map_err(|_| "Detector thread panicked")?;
    }

    main_result
}
