use image::GrayImage;
use imageproc::contours::{find_contours, BorderType};

use crate::shared::bounding_box::BoundingBox;
use crate::shared::GrayGrid;

/// Bounding rectangles of the outermost 8-connected foreground components.
///
/// Borders are traced with Suzuki–Abe following; components nested inside a
/// hole of another component are skipped. The result is in discovery order,
/// so callers that need determinism must sort it.
pub fn external_bounding_rects(mask: &GrayGrid) -> Vec<BoundingBox> {
    let (height, width) = mask.dim();
    if height == 0 || width == 0 {
        return Vec::new();
    }
    let Some(image) = GrayImage::from_raw(width as u32, height as u32, mask.iter().copied().collect())
    else {
        return Vec::new();
    };

    find_contours::<i32>(&image)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .filter_map(|c| {
            let first = c.points.first()?;
            let (mut x1, mut y1, mut x2, mut y2) = (first.x, first.y, first.x, first.y);
            for p in &c.points {
                x1 = x1.min(p.x);
                y1 = y1.min(p.y);
                x2 = x2.max(p.x);
                y2 = y2.max(p.y);
            }
            Some(BoundingBox::new(x1, y1, x2 - x1 + 1, y2 - y1 + 1))
        })
        .collect()
}
