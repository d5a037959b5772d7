use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::detection::domain::candidate_filter::{crop_box, grow_boxes};
use crate::detection::domain::detection_config::DetectionConfig;
use crate::detection::domain::light_detector::LightDetector;
use crate::imaging::draw::draw_rectangle;
use crate::media::domain::frame_reader::FrameReader;
use crate::media::domain::image_writer::ImageWriter;
use crate::media::domain::report_store::{FrameReport, ReportStore};
use crate::pipeline::batch_executor::BatchExecutor;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::{ANNOTATED_SUFFIX, BOX_COLOR, CROPPED_SUFFIX};
use crate::shared::frame::Frame;

/// Where the detection stage writes its per-frame outputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetectionOutputs {
    pub annotated_dir: PathBuf,
    pub cropped_dir: PathBuf,
    pub report_path: PathBuf,
}

/// What a detection run produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionRun {
    /// One entry per readable frame, in reading order.
    pub reports: Vec<FrameReport>,
    /// Dimensions of the first readable frame.
    pub frame_size: Option<(u32, u32)>,
    pub skipped: usize,
}

impl DetectionRun {
    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Box lists in frame order, ready for accumulation.
    pub fn detection_sets(&self) -> impl Iterator<Item = &[BoundingBox]> {
        self.reports.iter().map(|r| r.boxes.as_slice())
    }

    pub fn total_lights(&self) -> usize {
        self.reports.iter().map(|r| r.detections).sum()
    }
}

/// Batch detection: read → detect → annotate + crop → write, then save the report.
pub struct DetectLightsUseCase {
    reader: Box<dyn FrameReader>,
    detector: Arc<dyn LightDetector>,
    executor: Box<dyn BatchExecutor>,
    image_writer: Box<dyn ImageWriter>,
    report_store: Box<dyn ReportStore>,
    logger: Box<dyn PipelineLogger>,
    config: DetectionConfig,
}

impl DetectLightsUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        reader: Box<dyn FrameReader>,
        detector: Arc<dyn LightDetector>,
        executor: Box<dyn BatchExecutor>,
        image_writer: Box<dyn ImageWriter>,
        report_store: Box<dyn ReportStore>,
        logger: Box<dyn PipelineLogger>,
        config: &DetectionConfig,
    ) -> Self {
        Self {
            reader,
            detector,
            executor,
            image_writer,
            report_store,
            logger,
            config: config.sanitized(),
        }
    }

    /// Processes every frame in `input_dir`.
    ///
    /// An empty directory, or one where no frame decodes, is not an error:
    /// it logs and returns an empty run without writing anything.
    pub fn execute(
        &mut self,
        input_dir: &Path,
        outputs: &DetectionOutputs,
    ) -> Result<DetectionRun, Box<dyn std::error::Error>> {
        let metadata = self.reader.open(input_dir)?;
        if metadata.is_empty() {
            self.logger.info(&format!(
                "No *.{} frames found in {}",
                self.config.extension,
                input_dir.display()
            ));
            self.reader.close();
            return Ok(DetectionRun::default());
        }

        let total = metadata.total_frames;
        let mut reports: Vec<FrameReport> = Vec::with_capacity(total);
        let mut frame_size = None;
        let mut seen = 0;

        let config = &self.config;
        let image_writer = &*self.image_writer;
        let logger = &mut self.logger;

        let outcome = self.executor.execute(
            &mut *self.reader,
            Arc::clone(&self.detector),
            &mut |frame, boxes| {
                let write_start = Instant::now();
                frame_size.get_or_insert((frame.width(), frame.height()));
                let report = annotate_and_crop(&frame, boxes, config, image_writer, outputs)?;
                logger.timing("write", write_start.elapsed().as_secs_f64() * 1000.0);
                logger.metric("lights_per_frame", report.detections as f64);
                reports.push(report);
                seen += 1;
                logger.progress("detect", seen, total);
                Ok(())
            },
        );
        self.reader.close();
        let outcome = outcome?;

        if reports.is_empty() {
            self.logger.info(&format!(
                "No readable frames in {} ({} skipped)",
                input_dir.display(),
                outcome.skipped
            ));
            return Ok(DetectionRun {
                skipped: outcome.skipped,
                ..Default::default()
            });
        }

        self.report_store.save(&outputs.report_path, &reports)?;
        self.logger.info(&format!(
            "Detected lights in {} frames ({} skipped); report at {}",
            outcome.processed,
            outcome.skipped,
            outputs.report_path.display()
        ));

        Ok(DetectionRun {
            reports,
            frame_size,
            skipped: outcome.skipped,
        })
    }
}

/// File stem for a frame's outputs; falls back to the index for unnamed frames.
fn output_stem(frame: &Frame) -> String {
    Path::new(frame.name())
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| format!("frame_{:05}", frame.index()))
}

fn annotate_and_crop(
    frame: &Frame,
    boxes: Vec<BoundingBox>,
    config: &DetectionConfig,
    image_writer: &dyn ImageWriter,
    outputs: &DetectionOutputs,
) -> Result<FrameReport, Box<dyn std::error::Error>> {
    let (w, h) = (frame.width(), frame.height());
    let grown = grow_boxes(&boxes, config.box_grow, w, h);

    let mut annotated = frame.clone();
    for b in &grown {
        draw_rectangle(&mut annotated, b, BOX_COLOR, config.rect_thickness);
    }

    let crop = crop_box(&grown, config.padding, w, h);
    let cropped = frame.crop(&crop);

    // Report paths are bare names relative to the output directories.
    let stem = output_stem(frame);
    let annotated_name = format!("{stem}{ANNOTATED_SUFFIX}");
    let cropped_name = format!("{stem}{CROPPED_SUFFIX}");
    image_writer.write(&outputs.annotated_dir.join(&annotated_name), &annotated)?;
    image_writer.write(&outputs.cropped_dir.join(&cropped_name), &cropped)?;

    Ok(FrameReport {
        file: frame.name().to_string(),
        detections: boxes.len(),
        boxes,
        crop_box: Some(crop),
        annotated_out: annotated_name,
        cropped_out: cropped_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::domain::report_store::ReportError;
    use crate::pipeline::batch_executor::test_support::{make_frame, StubFrameReader};
    use crate::pipeline::batch_executor::SequentialBatchExecutor;
    use crate::pipeline::infrastructure::threaded_batch_executor::ThreadedBatchExecutor;
    use crate::pipeline::pipeline_logger::NullPipelineLogger;
    use std::sync::Mutex;

    // --- Stubs ---

    struct StubImageWriter {
        written: Arc<Mutex<Vec<(PathBuf, Frame)>>>,
    }

    impl ImageWriter for StubImageWriter {
        fn write(
            &self,
            path: &Path,
            frame: &Frame,
        ) -> Result<(), Box<dyn std::error::Error>> {
            self.written
                .lock()
                .unwrap()
                .push((path.to_path_buf(), frame.clone()));
            Ok(())
        }
    }

    struct StubReportStore {
        saved: Arc<Mutex<Vec<(PathBuf, Vec<FrameReport>)>>>,
    }

    impl ReportStore for StubReportStore {
        fn save(&self, path: &Path, reports: &[FrameReport]) -> Result<(), ReportError> {
            self.saved
                .lock()
                .unwrap()
                .push((path.to_path_buf(), reports.to_vec()));
            Ok(())
        }

        fn load(&self, _path: &Path) -> Result<Vec<FrameReport>, ReportError> {
            Ok(self.saved.lock().unwrap().last().map(|(_, r)| r.clone()).unwrap_or_default())
        }
    }

    /// Reports the same boxes for every frame.
    struct FixedDetector {
        boxes: Vec<BoundingBox>,
    }

    impl LightDetector for FixedDetector {
        fn detect(
            &self,
            _frame: &Frame,
        ) -> Result<Vec<BoundingBox>, Box<dyn std::error::Error>> {
            Ok(self.boxes.clone())
        }
    }

    // --- Helpers ---

    struct Harness {
        written: Arc<Mutex<Vec<(PathBuf, Frame)>>>,
        saved: Arc<Mutex<Vec<(PathBuf, Vec<FrameReport>)>>>,
        use_case: DetectLightsUseCase,
    }

    fn harness(
        frames: Vec<Option<Frame>>,
        boxes: Vec<BoundingBox>,
        executor: Box<dyn BatchExecutor>,
        config: DetectionConfig,
    ) -> Harness {
        let written = Arc::new(Mutex::new(Vec::new()));
        let saved = Arc::new(Mutex::new(Vec::new()));
        let use_case = DetectLightsUseCase::new(
            Box::new(StubFrameReader::new(frames)),
            Arc::new(FixedDetector { boxes }),
            executor,
            Box::new(StubImageWriter {
                written: written.clone(),
            }),
            Box::new(StubReportStore {
                saved: saved.clone(),
            }),
            Box::new(NullPipelineLogger),
            &config,
        );
        Harness {
            written,
            saved,
            use_case,
        }
    }

    fn outputs() -> DetectionOutputs {
        DetectionOutputs {
            annotated_dir: PathBuf::from("/out/annotated"),
            cropped_dir: PathBuf::from("/out/cropped"),
            report_path: PathBuf::from("/out/detection_report.json"),
        }
    }

    fn sized_frame(index: usize, w: u32, h: u32) -> Frame {
        Frame::new(vec![0; (w * h * 3) as usize], w, h, 3, index)
            .with_name(format!("{index:04}.png"))
    }

    // --- Tests ---

    #[test]
    fn test_writes_annotated_and_cropped_per_frame() {
        let frames = (0..3).map(|i| Some(sized_frame(i, 200, 100))).collect();
        let mut h = harness(
            frames,
            vec![BoundingBox::new(50, 40, 4, 4)],
            Box::new(SequentialBatchExecutor::new()),
            DetectionConfig::default(),
        );

        let run = h.use_case.execute(Path::new("/in"), &outputs()).unwrap();

        assert_eq!(run.reports.len(), 3);
        assert_eq!(run.frame_size, Some((200, 100)));
        let written = h.written.lock().unwrap();
        let paths: Vec<_> = written.iter().map(|(p, _)| p.clone()).collect();
        assert_eq!(paths.len(), 6);
        assert!(paths.contains(&PathBuf::from("/out/annotated/0000_ann.png")));
        assert!(paths.contains(&PathBuf::from("/out/cropped/0002_crop.png")));
    }

    #[test]
    fn test_report_holds_raw_boxes_and_crop() {
        let boxes = vec![BoundingBox::new(50, 40, 4, 4), BoundingBox::new(120, 40, 6, 6)];
        let mut h = harness(
            vec![Some(sized_frame(0, 200, 100))],
            boxes.clone(),
            Box::new(SequentialBatchExecutor::new()),
            DetectionConfig::default(),
        );

        let run = h.use_case.execute(Path::new("/in"), &outputs()).unwrap();

        let report = &run.reports[0];
        assert_eq!(report.file, "0000.png");
        assert_eq!(report.detections, 2);
        assert_eq!(report.boxes, boxes);
        // grown by 20, union, then padded by 30 and clipped
        assert_eq!(report.crop_box, Some(BoundingBox::new(0, 0, 176, 96)));
        assert_eq!(report.annotated_out, "0000_ann.png");
        assert_eq!(report.cropped_out, "0000_crop.png");

        let saved = h.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].0, PathBuf::from("/out/detection_report.json"));
        assert_eq!(saved[0].1, run.reports);
    }

    #[test]
    fn test_crop_matches_crop_box_dimensions() {
        let mut h = harness(
            vec![Some(sized_frame(0, 300, 200))],
            vec![BoundingBox::new(140, 90, 10, 10)],
            Box::new(SequentialBatchExecutor::new()),
            DetectionConfig::default(),
        );
        let run = h.use_case.execute(Path::new("/in"), &outputs()).unwrap();

        let crop = run.reports[0].crop_box.unwrap();
        assert_eq!(crop, BoundingBox::new(90, 40, 110, 110));
        let written = h.written.lock().unwrap();
        let (_, cropped) = written
            .iter()
            .find(|(p, _)| p.ends_with("0000_crop.png"))
            .unwrap();
        assert_eq!((cropped.width(), cropped.height()), (110, 110));
    }

    #[test]
    fn test_no_detections_crops_whole_frame() {
        let mut h = harness(
            vec![Some(sized_frame(0, 64, 48))],
            Vec::new(),
            Box::new(SequentialBatchExecutor::new()),
            DetectionConfig::default(),
        );
        let run = h.use_case.execute(Path::new("/in"), &outputs()).unwrap();
        assert_eq!(run.reports[0].detections, 0);
        assert_eq!(run.reports[0].crop_box, Some(BoundingBox::new(0, 0, 64, 48)));
    }

    #[test]
    fn test_annotation_draws_grown_box_in_red() {
        let config = DetectionConfig {
            box_grow: 2,
            rect_thickness: 1,
            ..Default::default()
        };
        let mut h = harness(
            vec![Some(sized_frame(0, 40, 40))],
            vec![BoundingBox::new(10, 10, 4, 4)],
            Box::new(SequentialBatchExecutor::new()),
            config,
        );
        h.use_case.execute(Path::new("/in"), &outputs()).unwrap();

        let written = h.written.lock().unwrap();
        let (_, annotated) = written
            .iter()
            .find(|(p, _)| p.ends_with("0000_ann.png"))
            .unwrap();
        let px = |x: usize, y: usize| {
            let i = (y * 40 + x) * 3;
            [annotated.data()[i], annotated.data()[i + 1], annotated.data()[i + 2]]
        };
        assert_eq!(px(8, 8), BOX_COLOR);
        assert_eq!(px(15, 15), BOX_COLOR);
        assert_eq!(px(11, 11), [0, 0, 0]);
        assert_eq!(px(7, 7), [0, 0, 0]);
    }

    #[test]
    fn test_empty_batch_writes_nothing() {
        let mut h = harness(
            Vec::new(),
            Vec::new(),
            Box::new(SequentialBatchExecutor::new()),
            DetectionConfig::default(),
        );
        let run = h.use_case.execute(Path::new("/in"), &outputs()).unwrap();

        assert!(run.is_empty());
        assert!(h.written.lock().unwrap().is_empty());
        assert!(h.saved.lock().unwrap().is_empty());
    }

    #[test]
    fn test_all_frames_unreadable_writes_nothing() {
        let mut h = harness(
            vec![None, None],
            Vec::new(),
            Box::new(SequentialBatchExecutor::new()),
            DetectionConfig::default(),
        );
        let run = h.use_case.execute(Path::new("/in"), &outputs()).unwrap();

        assert!(run.is_empty());
        assert_eq!(run.skipped, 2);
        assert!(h.saved.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unreadable_frame_omitted_from_report() {
        let frames = vec![Some(make_frame(0)), None, Some(make_frame(2))];
        let mut h = harness(
            frames,
            Vec::new(),
            Box::new(SequentialBatchExecutor::new()),
            DetectionConfig::default(),
        );
        let run = h.use_case.execute(Path::new("/in"), &outputs()).unwrap();

        let files: Vec<_> = run.reports.iter().map(|r| r.file.as_str()).collect();
        assert_eq!(files, vec!["0000.png", "0002.png"]);
        assert_eq!(run.skipped, 1);
    }

    #[test]
    fn test_threaded_executor_keeps_report_order() {
        let frames = (0..16).map(|i| Some(make_frame(i))).collect();
        let mut h = harness(
            frames,
            vec![BoundingBox::new(1, 1, 1, 1)],
            Box::new(ThreadedBatchExecutor::new(4)),
            DetectionConfig::default(),
        );
        let run = h.use_case.execute(Path::new("/in"), &outputs()).unwrap();

        let files: Vec<String> = run.reports.iter().map(|r| r.file.clone()).collect();
        let expected: Vec<String> = (0..16).map(|i| format!("{i:04}.png")).collect();
        assert_eq!(files, expected);
        assert_eq!(run.total_lights(), 16);
    }

    #[test]
    fn test_unnamed_frame_uses_index_stem() {
        let frame = Frame::new(vec![0; 12], 2, 2, 3, 7);
        assert_eq!(output_stem(&frame), "frame_00007");
        assert_eq!(output_stem(&make_frame(3)), "0003");
    }
}
