//! Binarization of 8-bit grids. Every mask produced here holds only 0 and 255.

use ndarray::Array2;

use crate::imaging::stats::{histogram, percentile};
use crate::shared::GrayGrid;

pub const FOREGROUND: u8 = 255;
pub const BACKGROUND: u8 = 0;

/// Marks pixels strictly brighter than `level` as foreground.
pub fn binarize(grid: &GrayGrid, level: u8) -> GrayGrid {
    grid.mapv(|v| if v > level { FOREGROUND } else { BACKGROUND })
}

pub fn invert(mask: &GrayGrid) -> GrayGrid {
    mask.mapv(|v| 255 - v)
}

/// Global level maximizing the between-class variance of the histogram.
///
/// A grid with a single distinct value has no meaningful split; its value is
/// returned so that binarizing with it yields an empty mask.
pub fn otsu_level(grid: &GrayGrid) -> u8 {
    let hist = histogram(grid.iter());
    let total = grid.len() as f64;
    let Some(min_value) = hist.iter().position(|&c| c > 0) else {
        return 0;
    };

    let sum_all: f64 = hist.iter().enumerate().map(|(i, &c)| i as f64 * c as f64).sum();
    let mut sum_bg = 0.0;
    let mut weight_bg = 0.0;
    let mut best_variance = 0.0;
    let mut best_level = min_value as u8;

    for (level, &count) in hist.iter().enumerate() {
        weight_bg += count as f64;
        if weight_bg == 0.0 {
            continue;
        }
        let weight_fg = total - weight_bg;
        if weight_fg == 0.0 {
            break;
        }
        sum_bg += level as f64 * count as f64;
        let mean_bg = sum_bg / weight_bg;
        let mean_fg = (sum_all - sum_bg) / weight_fg;
        let variance = weight_bg * weight_fg * (mean_bg - mean_fg).powi(2);
        if variance > best_variance {
            best_variance = variance;
            best_level = level as u8;
        }
    }
    best_level
}

/// Per-pixel threshold against the mean of a `block_size` window.
///
/// A pixel is foreground when it exceeds `local_mean - offset`. Windows are
/// truncated at the borders. `block_size` is forced odd and at least 3.
pub fn adaptive_mean(grid: &GrayGrid, block_size: usize, offset: f64) -> GrayGrid {
    let (height, width) = grid.dim();
    let radius = (block_size.max(3) | 1) / 2;

    // Summed-area table with a zero guard row and column.
    let mut integral = Array2::<u64>::zeros((height + 1, width + 1));
    for y in 0..height {
        let mut row_sum = 0u64;
        for x in 0..width {
            row_sum += grid[[y, x]] as u64;
            integral[[y + 1, x + 1]] = integral[[y, x + 1]] + row_sum;
        }
    }

    Array2::from_shape_fn((height, width), |(y, x)| {
        let y0 = y.saturating_sub(radius);
        let x0 = x.saturating_sub(radius);
        let y1 = (y + radius + 1).min(height);
        let x1 = (x + radius + 1).min(width);
        let sum = integral[[y1, x1]] + integral[[y0, x0]] - integral[[y0, x1]] - integral[[y1, x0]];
        let count = ((y1 - y0) * (x1 - x0)) as f64;
        let mean = sum as f64 / count;
        if grid[[y, x]] as f64 > mean - offset {
            FOREGROUND
        } else {
            BACKGROUND
        }
    })
}

/// The `p`-th percentile of all pixel values, truncated to an integer level.
pub fn percentile_level(grid: &GrayGrid, p: f64) -> u8 {
    let values: Vec<f64> = grid.iter().map(|&v| v as f64).collect();
    percentile(&values, p).map_or(0, |v| v.clamp(0.0, 255.0) as u8)
}
