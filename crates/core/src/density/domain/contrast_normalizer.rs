use ndarray::Array2;

use crate::density::domain::accumulation_surface::AccumulationSurface;
use crate::imaging::median::median_3x3;
use crate::imaging::stats::percentile;
use crate::shared::GrayGrid;

/// Span given to the rescale when both percentile bounds coincide.
pub const DEGENERATE_SPAN: f64 = 1e-6;

/// Displayable 8-bit density map derived from an [`AccumulationSurface`].
///
/// Only produced by [`ContrastNormalizer::normalize`]; regenerate it from the
/// surface rather than editing it.
#[derive(Clone, Debug, PartialEq)]
pub struct NormalizedDensityMap {
    grid: GrayGrid,
}

impl NormalizedDensityMap {
    pub fn grid(&self) -> &GrayGrid {
        &self.grid
    }

    pub fn into_grid(self) -> GrayGrid {
        self.grid
    }

    pub fn width(&self) -> u32 {
        self.grid.ncols() as u32
    }

    pub fn height(&self) -> u32 {
        self.grid.nrows() as u32
    }
}

/// Percentile-robust, square-root-compressed rescale of a density surface.
///
/// Percentiles are taken over covered cells only, so large never-detected
/// areas do not drag the bounds to zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContrastNormalizer {
    low_percentile: f64,
    high_percentile: f64,
}

impl ContrastNormalizer {
    pub fn new(low_percentile: f64, high_percentile: f64) -> Self {
        Self {
            low_percentile,
            high_percentile,
        }
    }

    /// `(lo, hi)` rescale bounds, or `None` when nothing was ever detected.
    ///
    /// When the percentiles coincide `hi` becomes `lo + DEGENERATE_SPAN`, so
    /// cells at `lo` go dark and anything above it saturates. If every
    /// covered cell holds the same count the range is anchored at zero
    /// instead, keeping covered cells at full intensity.
    pub fn bounds(&self, surface: &AccumulationSurface) -> Option<(f64, f64)> {
        let nonzero = surface.nonzero_values();
        let lo = percentile(&nonzero, self.low_percentile)?;
        let hi = percentile(&nonzero, self.high_percentile)?;
        if hi > lo {
            return Some((lo, hi));
        }
        let max = nonzero.iter().copied().fold(lo, f64::max);
        let min = nonzero.iter().copied().fold(lo, f64::min);
        if max <= min {
            return Some((0.0, lo.max(DEGENERATE_SPAN)));
        }
        Some((lo, lo + DEGENERATE_SPAN))
    }

    /// clip → rescale → sqrt → ×255 → round → 3×3 median.
    pub fn normalize(&self, surface: &AccumulationSurface) -> NormalizedDensityMap {
        let Some((lo, hi)) = self.bounds(surface) else {
            return NormalizedDensityMap {
                grid: Array2::zeros(surface.counts().dim()),
            };
        };
        log::debug!("density bounds: lo={lo:.3} hi={hi:.3}");
        let span = hi - lo;
        let scaled = surface.counts().mapv(|v| {
            let unit = ((v as f64).clamp(lo, hi) - lo) / span;
            (unit.sqrt() * 255.0).round().clamp(0.0, 255.0) as u8
        });
        NormalizedDensityMap {
            grid: median_3x3(&scaled),
        }
    }
}

impl Default for ContrastNormalizer {
    fn default() -> Self {
        Self::new(1.0, 99.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::bounding_box::BoundingBox;
    use approx::assert_relative_eq;

    fn surface(width: u32, height: u32, boxes: &[BoundingBox]) -> AccumulationSurface {
        let mut s = AccumulationSurface::new(width, height);
        s.add_detections(boxes);
        s
    }

    #[test]
    fn test_all_zero_surface_stays_zero() {
        let map = ContrastNormalizer::default().normalize(&AccumulationSurface::new(20, 10));
        assert_eq!(map.grid().dim(), (10, 20));
        assert!(map.grid().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_equal_counts_give_single_nonzero_level() {
        let s = surface(40, 40, &[BoundingBox::new(5, 5, 10, 10), BoundingBox::new(25, 25, 6, 6)]);
        let map = ContrastNormalizer::default().normalize(&s);
        let mut levels: Vec<u8> = map.grid().iter().copied().filter(|&v| v > 0).collect();
        levels.sort_unstable();
        levels.dedup();
        assert_eq!(levels, vec![255]);
        assert_eq!(map.grid()[[10, 10]], 255);
        assert_eq!(map.grid()[[0, 0]], 0);
    }

    #[test]
    fn test_bounds_use_covered_cells_only() {
        let s = surface(100, 100, &[
            BoundingBox::new(0, 0, 10, 10),
            BoundingBox::new(0, 0, 10, 10),
            BoundingBox::new(50, 50, 10, 10),
        ]);
        let (lo, hi) = ContrastNormalizer::default().bounds(&s).unwrap();
        assert_relative_eq!(lo, 1.0);
        assert_relative_eq!(hi, 2.0);
    }

    #[test]
    fn test_sqrt_compression() {
        // Counts 1..=5 in columns of width 3; percentiles 0/100 give lo=1, hi=5.
        let mut s = AccumulationSurface::new(15, 9);
        for k in 0..5 {
            for _ in 0..=k {
                s.add_box(&BoundingBox::new(k * 3, 0, 3, 9));
            }
        }
        let map = ContrastNormalizer::new(0.0, 100.0).normalize(&s);
        // Column centres avoid the median's mixing at column seams.
        let expected = [0.0f64, 0.25, 0.5, 0.75, 1.0].map(|u| (u.sqrt() * 255.0).round() as u8);
        for (k, &e) in expected.iter().enumerate() {
            assert_eq!(map.grid()[[4, k * 3 + 1]], e);
        }
    }

    #[test]
    fn test_hot_outliers_clipped() {
        let mut s = surface(50, 50, &[BoundingBox::new(0, 0, 40, 40)]);
        for _ in 0..100 {
            s.add_box(&BoundingBox::new(45, 45, 3, 3));
        }
        let normalizer = ContrastNormalizer::new(1.0, 99.0);
        // 1600 cells at 1 and 9 cells at 100: both percentiles land on 1.
        let (lo, hi) = normalizer.bounds(&s).unwrap();
        assert_relative_eq!(lo, 1.0);
        assert_relative_eq!(hi, 1.0 + DEGENERATE_SPAN);

        let map = normalizer.normalize(&s);
        assert_eq!(map.grid()[[20, 20]], 0);
        assert_eq!(map.grid()[[46, 46]], 255);
    }

    #[test]
    fn test_uniform_counts_anchor_at_zero() {
        let s = surface(30, 30, &[BoundingBox::new(5, 5, 10, 10), BoundingBox::new(5, 5, 10, 10)]);
        let (lo, hi) = ContrastNormalizer::default().bounds(&s).unwrap();
        assert_relative_eq!(lo, 0.0);
        assert_relative_eq!(hi, 2.0);
    }

    #[test]
    fn test_single_speckle_removed() {
        let s = surface(10, 10, &[BoundingBox::new(4, 4, 1, 1)]);
        let map = ContrastNormalizer::default().normalize(&s);
        assert!(map.grid().iter().all(|&v| v == 0));
    }
}
