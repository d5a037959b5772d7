use ndarray::Array2;

use crate::shared::GrayGrid;

/// Sigma implied by a kernel size when no sigma is given.
pub fn sigma_for_kernel_size(kernel_size: usize) -> f64 {
    0.3 * ((kernel_size as f64 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Smallest odd kernel size covering +/- 3 sigma.
pub fn kernel_size_for_sigma(sigma: f64) -> usize {
    ((sigma * 6.0 + 1.0).round() as usize) | 1
}

/// Normalized 1D Gaussian kernel. `kernel_size` must be odd and >= 1.
pub fn gaussian_kernel_1d(kernel_size: usize, sigma: f64) -> Vec<f32> {
    debug_assert!(kernel_size >= 1 && kernel_size % 2 == 1);
    let half = (kernel_size / 2) as f64;
    let weights: Vec<f64> = (0..kernel_size)
        .map(|i| {
            let x = i as f64 - half;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.iter().map(|&w| (w / sum) as f32).collect()
}

/// Mirrors `i` into `0..n` without repeating the edge sample (`dcb|abcd|cba`).
fn reflect_101(i: isize, n: usize) -> usize {
    let last = n as isize - 1;
    if last <= 0 {
        return 0;
    }
    let mut i = i;
    while i < 0 || i > last {
        i = if i < 0 { -i } else { 2 * last - i };
    }
    i as usize
}

/// Separable Gaussian blur with reflect-101 borders.
pub fn blur(grid: &GrayGrid, kernel: &[f32]) -> GrayGrid {
    let (height, width) = grid.dim();
    if kernel.len() <= 1 || width == 0 || height == 0 {
        return grid.clone();
    }
    let half = (kernel.len() / 2) as isize;

    let horizontal = Array2::from_shape_fn((height, width), |(y, x)| {
        kernel
            .iter()
            .enumerate()
            .map(|(k, &w)| {
                let sx = reflect_101(x as isize + k as isize - half, width);
                grid[[y, sx]] as f32 * w
            })
            .sum::<f32>()
    });

    Array2::from_shape_fn((height, width), |(y, x)| {
        let sum: f32 = kernel
            .iter()
            .enumerate()
            .map(|(k, &w)| {
                let sy = reflect_101(y as isize + k as isize - half, height);
                horizontal[[sy, x]] * w
            })
            .sum();
        sum.round().clamp(0.0, 255.0) as u8
    })
}

/// Blur with a kernel derived from `sigma`.
pub fn blur_sigma(grid: &GrayGrid, sigma: f64) -> GrayGrid {
    let size = kernel_size_for_sigma(sigma);
    blur(grid, &gaussian_kernel_1d(size, sigma))
}

/// Blur with a `kernel_size` x `kernel_size` window and its implied sigma.
pub fn blur_kernel(grid: &GrayGrid, kernel_size: usize) -> GrayGrid {
    let size = kernel_size | 1;
    blur(grid, &gaussian_kernel_1d(size, sigma_for_kernel_size(size)))
}
