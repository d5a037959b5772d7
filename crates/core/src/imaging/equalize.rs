use ndarray::Array2;

use crate::shared::GrayGrid;

pub const DEFAULT_TILE_GRID: usize = 8;
pub const DEFAULT_CLIP_LIMIT: f64 = 2.0;

/// Contrast-limited adaptive histogram equalization.
///
/// The grid is split into `tile_grid` x `tile_grid` tiles, each tile gets a
/// clipped-histogram lookup table, and every pixel is mapped through a
/// bilinear blend of the four nearest tile tables. `clip_limit` is relative
/// to the mean bin height of a tile.
pub fn equalize_tiles(grid: &GrayGrid, tile_grid: usize, clip_limit: f64) -> GrayGrid {
    let (height, width) = grid.dim();
    if height == 0 || width == 0 {
        return grid.clone();
    }
    let tile_grid = tile_grid.max(1);
    let tile_w = width.div_ceil(tile_grid).max(1);
    let tile_h = height.div_ceil(tile_grid).max(1);
    let tiles_x = width.div_ceil(tile_w);
    let tiles_y = height.div_ceil(tile_h);

    let mut luts = vec![[0u8; 256]; tiles_x * tiles_y];
    for ty in 0..tiles_y {
        for tx in 0..tiles_x {
            let y0 = ty * tile_h;
            let x0 = tx * tile_w;
            let y1 = (y0 + tile_h).min(height);
            let x1 = (x0 + tile_w).min(width);
            let mut hist = [0u64; 256];
            for y in y0..y1 {
                for x in x0..x1 {
                    hist[grid[[y, x]] as usize] += 1;
                }
            }
            let area = ((y1 - y0) * (x1 - x0)) as u64;
            luts[ty * tiles_x + tx] = clipped_lut(&mut hist, area, clip_limit);
        }
    }

    Array2::from_shape_fn((height, width), |(y, x)| {
        let (ty0, ty1, wy) = neighbours(y, tile_h, tiles_y);
        let (tx0, tx1, wx) = neighbours(x, tile_w, tiles_x);
        let v = grid[[y, x]] as usize;
        let top = luts[ty0 * tiles_x + tx0][v] as f64 * (1.0 - wx)
            + luts[ty0 * tiles_x + tx1][v] as f64 * wx;
        let bottom = luts[ty1 * tiles_x + tx0][v] as f64 * (1.0 - wx)
            + luts[ty1 * tiles_x + tx1][v] as f64 * wx;
        (top * (1.0 - wy) + bottom * wy).round().clamp(0.0, 255.0) as u8
    })
}

fn clipped_lut(hist: &mut [u64; 256], area: u64, clip_limit: f64) -> [u8; 256] {
    if clip_limit > 0.0 {
        let limit = ((clip_limit * area as f64 / 256.0) as u64).max(1);
        let mut excess = 0u64;
        for bin in hist.iter_mut() {
            if *bin > limit {
                excess += *bin - limit;
                *bin = limit;
            }
        }
        let share = excess / 256;
        let remainder = (excess % 256) as usize;
        for (i, bin) in hist.iter_mut().enumerate() {
            *bin += share + u64::from(i < remainder);
        }
    }

    let mut lut = [0u8; 256];
    let mut cdf = 0u64;
    for (i, &count) in hist.iter().enumerate() {
        cdf += count;
        lut[i] = ((cdf as f64 * 255.0 / area as f64).round()).min(255.0) as u8;
    }
    lut
}

/// Two tile indices bracketing `pos` along one axis and the weight of the second.
fn neighbours(pos: usize, tile: usize, tiles: usize) -> (usize, usize, f64) {
    let f = (pos as f64 + 0.5) / tile as f64 - 0.5;
    if f <= 0.0 {
        return (0, 0, 0.0);
    }
    let i0 = (f.floor() as usize).min(tiles - 1);
    let i1 = (i0 + 1).min(tiles - 1);
    let w = if i1 == i0 { 0.0 } else { f - i0 as f64 };
    (i0, i1, w)
}
