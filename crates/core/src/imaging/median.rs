use ndarray::Array2;

use crate::shared::GrayGrid;

/// 3x3 median filter with replicated borders.
///
/// On a binary mask this removes isolated foreground pixels while leaving
/// blobs of three or more pixels across intact.
pub fn median_3x3(grid: &GrayGrid) -> GrayGrid {
    let (height, width) = grid.dim();
    if height == 0 || width == 0 {
        return grid.clone();
    }
    let max_y = height as isize - 1;
    let max_x = width as isize - 1;
    Array2::from_shape_fn((height, width), |(y, x)| {
        let mut window = [0u8; 9];
        let mut n = 0;
        for dy in -1..=1isize {
            for dx in -1..=1isize {
                let sy = (y as isize + dy).clamp(0, max_y) as usize;
                let sx = (x as isize + dx).clamp(0, max_x) as usize;
                window[n] = grid[[sy, sx]];
                n += 1;
            }
        }
        window.sort_unstable();
        window[4]
    })
}
