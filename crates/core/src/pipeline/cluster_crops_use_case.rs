use std::path::{Path, PathBuf};

use crate::density::domain::cluster_config::ClusterConfig;
use crate::density::domain::cluster_segmenter::{ClusterRegion, ClusterSegmenter};
use crate::imaging::draw::draw_rectangle;
use crate::imaging::resize::scale_crop;
use crate::media::domain::image_writer::ImageWriter;
use crate::media::infrastructure::image_dir_reader::read_frame;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::constants::{BOX_COLOR, CLUSTER_RECT_THICKNESS};
use crate::shared::frame::Frame;
use crate::shared::GrayGrid;

/// File name of the `index`-th (1-based) cluster crop.
pub fn cluster_file_name(index: usize) -> String {
    format!("cluster_{index:03}.png")
}

/// One cluster and the crop written for it.
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterCrop {
    pub region: ClusterRegion,
    pub path: PathBuf,
    pub size: (u32, u32),
}

/// Segments a density heatmap into clusters and writes an enlarged crop of each.
pub struct ClusterCropsUseCase {
    image_writer: Box<dyn ImageWriter>,
    logger: Box<dyn PipelineLogger>,
    segmenter: ClusterSegmenter,
    config: ClusterConfig,
}

impl ClusterCropsUseCase {
    pub fn new(
        image_writer: Box<dyn ImageWriter>,
        logger: Box<dyn PipelineLogger>,
        config: &ClusterConfig,
    ) -> Self {
        Self {
            image_writer,
            logger,
            segmenter: ClusterSegmenter::new(config),
            config: config.sanitized(),
        }
    }

    /// Reads a heatmap image from disk and segments its luma.
    pub fn execute(
        &mut self,
        heatmap_path: &Path,
        out_dir: &Path,
        debug_path: &Path,
    ) -> Result<Vec<ClusterCrop>, Box<dyn std::error::Error>> {
        let heatmap = read_frame(heatmap_path, 0)?;
        let density = heatmap.to_intensity();
        self.execute_on(&heatmap, &density, out_dir, debug_path)
    }

    /// Segments `density` and crops the matching areas of `heatmap`.
    ///
    /// Both must share dimensions. The debug image is `heatmap` with every
    /// padded cluster outlined, written even when nothing was found.
    pub fn execute_on(
        &mut self,
        heatmap: &Frame,
        density: &GrayGrid,
        out_dir: &Path,
        debug_path: &Path,
    ) -> Result<Vec<ClusterCrop>, Box<dyn std::error::Error>> {
        let (rows, cols) = density.dim();
        if (cols as u32, rows as u32) != (heatmap.width(), heatmap.height()) {
            return Err(format!(
                "Density map is {cols}x{rows} but heatmap is {}x{}",
                heatmap.width(),
                heatmap.height()
            )
            .into());
        }

        let regions = self.segmenter.segment(density);
        let mut debug = heatmap.clone();
        let mut crops = Vec::with_capacity(regions.len());

        for (i, region) in regions.iter().enumerate() {
            let cropped = heatmap.crop(&region.bounds);
            let scaled = scale_crop(
                &cropped,
                self.config.scale_factor,
                self.config.max_output_long,
            )?;
            let path = out_dir.join(cluster_file_name(i + 1));
            self.image_writer.write(&path, &scaled)?;
            draw_rectangle(&mut debug, &region.bounds, BOX_COLOR, CLUSTER_RECT_THICKNESS);

            crops.push(ClusterCrop {
                region: *region,
                path,
                size: (scaled.width(), scaled.height()),
            });
            self.logger.progress("clusters", i + 1, regions.len());
        }

        self.image_writer.write(debug_path, &debug)?;
        self.logger.metric("clusters", crops.len() as f64);
        self.logger.info(&format!(
            "Saved {} cluster crops to {}; debug at {}",
            crops.len(),
            out_dir.display(),
            debug_path.display()
        ));
        Ok(crops)
    }
}
