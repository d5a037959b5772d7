use ndarray::{s, Array2};

use crate::shared::bounding_box::BoundingBox;

/// Per-cell count of detection boxes covering that cell across a batch.
///
/// Every box contributes exactly 1.0 to each cell of its clipped rectangle,
/// so the surface is a pure superposition: the order boxes are added in does
/// not change the result.
#[derive(Clone, Debug, PartialEq)]
pub struct AccumulationSurface {
    counts: Array2<f32>,
}

impl AccumulationSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            counts: Array2::zeros((height as usize, width as usize)),
        }
    }

    /// Builds a surface from every frame's detection set.
    pub fn from_detections<'a>(
        width: u32,
        height: u32,
        detections: impl IntoIterator<Item = &'a [BoundingBox]>,
    ) -> Self {
        let mut surface = Self::new(width, height);
        for boxes in detections {
            surface.add_detections(boxes);
        }
        surface
    }

    /// Splits the detection sets into `workers` chunks, accumulates each on
    /// its own thread and merges the partial surfaces.
    pub fn accumulate_parallel(
        width: u32,
        height: u32,
        detections: &[Vec<BoundingBox>],
        workers: usize,
    ) -> Self {
        let workers = workers.max(1);
        if workers == 1 || detections.len() < 2 {
            return Self::from_detections(width, height, detections.iter().map(Vec::as_slice));
        }
        let chunk = detections.len().div_ceil(workers);
        std::thread::scope(|scope| {
            let handles: Vec<_> = detections
                .chunks(chunk)
                .map(|part| {
                    scope.spawn(move || {
                        Self::from_detections(width, height, part.iter().map(Vec::as_slice))
                    })
                })
                .collect();

            let mut total = Self::new(width, height);
            for handle in handles {
                match handle.join() {
                    Ok(partial) => total.merge(&partial),
                    Err(payload) => std::panic::resume_unwind(payload),
                }
            }
            total
        })
    }

    pub fn width(&self) -> u32 {
        self.counts.ncols() as u32
    }

    pub fn height(&self) -> u32 {
        self.counts.nrows() as u32
    }

    /// Adds 1.0 inside the box's intersection with the surface.
    ///
    /// Boxes entirely outside contribute nothing.
    pub fn add_box(&mut self, b: &BoundingBox) {
        let Some(c) = b.clipped(self.width(), self.height()) else {
            return;
        };
        let (x, y) = (c.x as usize, c.y as usize);
        self.counts
            .slice_mut(s![y..y + c.h as usize, x..x + c.w as usize])
            .mapv_inplace(|v| v + 1.0);
    }

    pub fn add_detections(&mut self, boxes: &[BoundingBox]) {
        for b in boxes {
            self.add_box(b);
        }
    }

    /// Elementwise sum with another surface of the same extent.
    ///
    /// Surfaces of a different extent are ignored with a warning.
    pub fn merge(&mut self, other: &AccumulationSurface) {
        if self.counts.dim() != other.counts.dim() {
            log::warn!(
                "Cannot merge {}x{} surface into {}x{}",
                other.width(),
                other.height(),
                self.width(),
                self.height()
            );
            return;
        }
        self.counts += &other.counts;
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.counts
            .get((y as usize, x as usize))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn counts(&self) -> &Array2<f32> {
        &self.counts
    }

    /// Values of every covered cell, in row-major order.
    pub fn nonzero_values(&self) -> Vec<f64> {
        self.counts
            .iter()
            .filter(|&&v| v > 0.0)
            .map(|&v| v as f64)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.iter().all(|&v| v == 0.0)
    }
}
