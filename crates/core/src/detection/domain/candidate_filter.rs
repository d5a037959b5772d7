use crate::shared::bounding_box::BoundingBox;
use crate::shared::GrayGrid;

/// Rejects candidate boxes by size, shape and brightness.
///
/// Decisions are made on the tight candidate box; growing for display or
/// cropping happens afterwards through [`grow_boxes`].
#[derive(Clone, Debug, PartialEq)]
pub struct CandidateFilter {
    pub min_area: i64,
    pub max_area: i64,
    pub min_brightness: u32,
    pub aspect_ratio_max: f64,
}

impl CandidateFilter {
    /// Boxes that pass every test, in canonical (top, left) order.
    ///
    /// `intensity` is the pre-residual grid that brightness is measured on.
    pub fn apply(&self, candidates: &[BoundingBox], intensity: &GrayGrid) -> Vec<BoundingBox> {
        let (height, width) = intensity.dim();
        let mut kept: Vec<BoundingBox> = candidates
            .iter()
            .filter_map(|b| b.clipped(width as u32, height as u32))
            .filter(|b| self.accepts_shape(b))
            .filter(|b| mean_intensity(intensity, b).floor() >= self.min_brightness as f64)
            .collect();
        BoundingBox::sort_canonical(&mut kept);
        kept
    }

    /// Area within `[min_area, max_area]` and aspect ratio at most the maximum.
    pub fn accepts_shape(&self, b: &BoundingBox) -> bool {
        let area = b.area();
        area >= self.min_area && area <= self.max_area && b.aspect_ratio() <= self.aspect_ratio_max
    }
}

/// Mean of `grid` inside `rect`, which must already lie within the grid.
pub fn mean_intensity(grid: &GrayGrid, rect: &BoundingBox) -> f64 {
    let (y0, x0) = (rect.y as usize, rect.x as usize);
    let view = grid.slice(ndarray::s![y0..y0 + rect.h as usize, x0..x0 + rect.w as usize]);
    if view.is_empty() {
        return 0.0;
    }
    view.iter().map(|&v| v as u64).sum::<u64>() as f64 / view.len() as f64
}

/// Grows every box by `margin` on each side, clipped to a `width` x `height` image.
pub fn grow_boxes(boxes: &[BoundingBox], margin: i32, width: u32, height: u32) -> Vec<BoundingBox> {
    boxes.iter().map(|b| b.grown(margin, width, height)).collect()
}

/// Union of the grown boxes padded by `padding`, clipped to the image.
///
/// With nothing detected the crop is the whole image.
pub fn crop_box(grown: &[BoundingBox], padding: i32, width: u32, height: u32) -> BoundingBox {
    match BoundingBox::union(grown) {
        Some(u) => u.grown(padding, width, height),
        None => BoundingBox::new(0, 0, width as i32, height as i32),
    }
}
