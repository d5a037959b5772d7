//! Grey-level morphology with flat structuring elements.
//!
//! Pixels of the element that fall outside the image are ignored, so borders
//! neither erode nor dilate artificially.

use ndarray::Array2;

use crate::shared::GrayGrid;

/// A flat structuring element stored as `(dy, dx)` offsets from its anchor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructuringElement {
    offsets: Vec<(isize, isize)>,
}

impl StructuringElement {
    /// Ellipse inscribed in a `size` x `size` square, anchored at its center.
    ///
    /// Rows are filled symmetrically around the center column; a 3x3 ellipse
    /// is a cross.
    pub fn ellipse(size: usize) -> Self {
        let size = size.max(1);
        let r = (size / 2) as isize;
        let c = r;
        let inv_r2 = if r > 0 { 1.0 / (r * r) as f64 } else { 0.0 };
        let mut offsets = Vec::new();
        for i in 0..size as isize {
            let dy = i - r;
            if dy.abs() > r {
                continue;
            }
            let dx = (c as f64 * (((r * r - dy * dy) as f64) * inv_r2).sqrt()).round() as isize;
            let j1 = (c - dx).max(0);
            let j2 = (c + dx + 1).min(size as isize);
            for j in j1..j2 {
                offsets.push((dy, j - c));
            }
        }
        Self { offsets }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn offsets(&self) -> &[(isize, isize)] {
        &self.offsets
    }
}

fn reduce(grid: &GrayGrid, element: &StructuringElement, init: u8, pick: fn(u8, u8) -> u8) -> GrayGrid {
    let (height, width) = grid.dim();
    Array2::from_shape_fn((height, width), |(y, x)| {
        let mut acc = init;
        let mut touched = false;
        for &(dy, dx) in element.offsets() {
            let sy = y as isize + dy;
            let sx = x as isize + dx;
            if sy < 0 || sx < 0 || sy >= height as isize || sx >= width as isize {
                continue;
            }
            acc = pick(acc, grid[[sy as usize, sx as usize]]);
            touched = true;
        }
        if touched {
            acc
        } else {
            grid[[y, x]]
        }
    })
}

pub fn erode(grid: &GrayGrid, element: &StructuringElement) -> GrayGrid {
    reduce(grid, element, u8::MAX, u8::min)
}

pub fn dilate(grid: &GrayGrid, element: &StructuringElement) -> GrayGrid {
    reduce(grid, element, u8::MIN, u8::max)
}

pub fn dilate_n(grid: &GrayGrid, element: &StructuringElement, iterations: usize) -> GrayGrid {
    let mut out = grid.clone();
    for _ in 0..iterations {
        out = dilate(&out, element);
    }
    out
}

/// Erosion followed by dilation: removes bright features smaller than the element.
pub fn open(grid: &GrayGrid, element: &StructuringElement) -> GrayGrid {
    dilate(&erode(grid, element), element)
}

/// Dilation followed by erosion: fills dark gaps smaller than the element.
pub fn close(grid: &GrayGrid, element: &StructuringElement) -> GrayGrid {
    erode(&dilate(grid, element), element)
}

/// `grid - open(grid)`: keeps only bright features narrower than the element.
pub fn white_top_hat(grid: &GrayGrid, element: &StructuringElement) -> GrayGrid {
    let opened = open(grid, element);
    let mut residual = grid.clone();
    residual.zip_mut_with(&opened, |r, &o| *r = r.saturating_sub(o));
    residual
}
