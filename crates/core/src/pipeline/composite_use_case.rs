use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::density::domain::accumulation_surface::AccumulationSurface;
use crate::density::domain::composite::{overlay, FrameStack};
use crate::density::domain::contrast_normalizer::{ContrastNormalizer, NormalizedDensityMap};
use crate::density::domain::heatmap_config::HeatmapConfig;
use crate::imaging::colormap::colorize;
use crate::media::domain::frame_reader::FrameReader;
use crate::media::domain::image_writer::ImageWriter;
use crate::media::domain::report_store::{FrameReport, ReportStore};
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::{OUT_DENSITY, OUT_HEATMAP, OUT_MAX, OUT_MEAN, OUT_OVERLAY};
use crate::shared::frame::Frame;

/// What a composite run produced.
#[derive(Clone, Debug, Default)]
pub struct CompositeRun {
    pub frames_used: usize,
    /// Every image written, in write order.
    pub written: Vec<PathBuf>,
    /// Normalized density map, when the heatmap was requested.
    pub density: Option<NormalizedDensityMap>,
    /// JET-colorized density map, when the heatmap was requested.
    pub heatmap: Option<Frame>,
}

impl CompositeRun {
    pub fn is_empty(&self) -> bool {
        self.frames_used == 0
    }
}

/// Whole-batch composites over the annotated frames plus the detection heatmap.
pub struct CompositeUseCase {
    reader: Box<dyn FrameReader>,
    image_writer: Box<dyn ImageWriter>,
    report_store: Box<dyn ReportStore>,
    logger: Box<dyn PipelineLogger>,
    config: HeatmapConfig,
    workers: usize,
}

impl CompositeUseCase {
    pub fn new(
        reader: Box<dyn FrameReader>,
        image_writer: Box<dyn ImageWriter>,
        report_store: Box<dyn ReportStore>,
        logger: Box<dyn PipelineLogger>,
        config: &HeatmapConfig,
        workers: usize,
    ) -> Self {
        Self {
            reader,
            image_writer,
            report_store,
            logger,
            config: config.sanitized(),
            workers: workers.max(1),
        }
    }

    /// Loads the detection report from `report_path`, then composites.
    ///
    /// The report is only read when the heatmap is enabled.
    pub fn execute(
        &mut self,
        annotated_dir: &Path,
        report_path: &Path,
        out_dir: &Path,
    ) -> Result<CompositeRun, Box<dyn std::error::Error>> {
        let reports = if self.config.make_heatmap {
            self.report_store.load(report_path)?
        } else {
            Vec::new()
        };
        self.execute_with_reports(annotated_dir, &reports, out_dir)
    }

    /// Composites the frames in `annotated_dir` using in-memory reports.
    ///
    /// An empty or unreadable directory logs and returns an empty run.
    pub fn execute_with_reports(
        &mut self,
        annotated_dir: &Path,
        reports: &[FrameReport],
        out_dir: &Path,
    ) -> Result<CompositeRun, Box<dyn std::error::Error>> {
        let Some(stack) = self.stack_frames(annotated_dir)? else {
            self.logger
                .info(&format!("No annotated images found in {}", annotated_dir.display()));
            return Ok(CompositeRun::default());
        };

        let mut run = CompositeRun {
            frames_used: stack.len(),
            ..Default::default()
        };

        let mean = self.config.make_mean_stack.then(|| stack.mean());
        if self.config.make_max_projection {
            self.write(out_dir.join(OUT_MAX), &stack.max(), &mut run)?;
        }
        if let Some(mean) = &mean {
            self.write(out_dir.join(OUT_MEAN), mean, &mut run)?;
        }

        if self.config.make_heatmap {
            let first = stack.first();
            let start = Instant::now();
            let detections: Vec<Vec<BoundingBox>> =
                reports.iter().map(|r| r.boxes.clone()).collect();
            let surface = AccumulationSurface::accumulate_parallel(
                first.width(),
                first.height(),
                &detections,
                self.workers,
            );
            self.logger
                .timing("accumulate", start.elapsed().as_secs_f64() * 1000.0);
            if surface.is_empty() {
                self.logger.info("No detections to accumulate; heatmap is flat");
            }

            let density = ContrastNormalizer::new(
                self.config.low_percentile,
                self.config.high_percentile,
            )
            .normalize(&surface);
            let heat = colorize(density.grid());

            self.write(out_dir.join(OUT_DENSITY), &Frame::from_gray(density.grid(), 0), &mut run)?;
            self.write(out_dir.join(OUT_HEATMAP), &heat, &mut run)?;

            let base = mean.unwrap_or_else(|| first.clone());
            let blended = overlay(&base, &heat, self.config.overlay_alpha)?;
            self.write(out_dir.join(OUT_OVERLAY), &blended, &mut run)?;

            run.density = Some(density);
            run.heatmap = Some(heat);
        }

        self.logger.info(&format!(
            "Composited {} frames into {}",
            run.frames_used,
            out_dir.display()
        ));
        Ok(run)
    }

    /// Folds every readable frame into a stack, or `None` if there were none.
    fn stack_frames(
        &mut self,
        dir: &Path,
    ) -> Result<Option<FrameStack>, Box<dyn std::error::Error>> {
        let metadata = self.reader.open(dir)?;
        let total = metadata.total_frames;
        let mut stack: Option<FrameStack> = None;

        for (i, frame_result) in self.reader.frames().enumerate() {
            match frame_result {
                Ok(frame) => match stack.as_mut() {
                    Some(s) => {
                        s.push(&frame);
                    }
                    None => stack = Some(FrameStack::new(frame)),
                },
                Err(e) => log::warn!("Skipping unreadable image: {e}"),
            }
            self.logger.progress("composite", i + 1, total);
        }
        self.reader.close();
        Ok(stack)
    }

    fn write(
        &self,
        path: PathBuf,
        frame: &Frame,
        run: &mut CompositeRun,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.image_writer.write(&path, frame)?;
        log::debug!("Wrote {}", path.display());
        run.written.push(path);
        Ok(())
    }
}
