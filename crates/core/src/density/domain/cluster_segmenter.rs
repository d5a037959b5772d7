use crate::density::domain::cluster_config::{ClusterConfig, ClusterThreshold};
use crate::imaging::contours::external_bounding_rects;
use crate::imaging::gaussian::blur_kernel;
use crate::imaging::morphology::{close, open, StructuringElement};
use crate::imaging::threshold::{binarize, otsu_level, percentile_level};
use crate::shared::bounding_box::BoundingBox;
use crate::shared::GrayGrid;

/// A zone of repeated activity on the density map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClusterRegion {
    /// Padded rectangle used for cropping and display.
    pub bounds: BoundingBox,
    /// Tight rectangle of the connected component on the density map.
    pub source: BoundingBox,
}

/// Re-thresholds a density map and extracts cluster regions.
pub struct ClusterSegmenter {
    config: ClusterConfig,
}

impl ClusterSegmenter {
    pub fn new(config: &ClusterConfig) -> Self {
        Self {
            config: config.sanitized(),
        }
    }

    /// Binary mask after the optional blur, thresholding and open/close.
    pub fn mask(&self, density: &GrayGrid) -> GrayGrid {
        let cfg = &self.config;
        let smoothed = if cfg.blur >= 3 {
            blur_kernel(density, cfg.blur)
        } else {
            density.clone()
        };
        let level = match cfg.threshold {
            ClusterThreshold::Percentile { percentile } => percentile_level(&smoothed, percentile),
            ClusterThreshold::Otsu => otsu_level(&smoothed),
            ClusterThreshold::Fixed { value } => value.clamp(0, 255) as u8,
        };
        let mut mask = binarize(&smoothed, level);
        if cfg.open_size >= 3 {
            mask = open(&mask, &StructuringElement::ellipse(cfg.open_size));
        }
        if cfg.close_size >= 3 {
            mask = close(&mask, &StructuringElement::ellipse(cfg.close_size));
        }
        mask
    }

    /// Cluster regions in canonical order of their padded bounds.
    pub fn segment(&self, density: &GrayGrid) -> Vec<ClusterRegion> {
        let (height, width) = density.dim();
        let (width, height) = (width as u32, height as u32);
        let cfg = &self.config;

        let mut regions: Vec<ClusterRegion> = external_bounding_rects(&self.mask(density))
            .into_iter()
            .filter(|b| (cfg.min_area..=cfg.max_area).contains(&b.area()))
            .map(|source| ClusterRegion {
                bounds: source.grown(cfg.padding, width, height),
                source,
            })
            .collect();
        regions.sort_by_key(|r| (r.bounds.y, r.bounds.x, r.source.y, r.source.x));
        log::debug!("{} cluster regions", regions.len());
        regions
    }
}
