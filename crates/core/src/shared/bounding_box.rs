use serde::{Deserialize, Serialize};

/// Axis-aligned integer rectangle `(x, y, w, h)` in pixel coordinates.
///
/// Used for raw detections, grown/padded detections, crop rectangles and
/// cluster regions alike. Serializes as `{"x":..,"y":..,"w":..,"h":..}`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl BoundingBox {
    pub const fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    /// Edges saturate so out-of-range boxes from a report cannot overflow.
    pub fn right(&self) -> i32 {
        self.x.saturating_add(self.w)
    }

    pub fn bottom(&self) -> i32 {
        self.y.saturating_add(self.h)
    }

    pub fn area(&self) -> i64 {
        self.w as i64 * self.h as i64
    }

    /// Long side over short side; the short side is floored at 1.
    pub fn aspect_ratio(&self) -> f64 {
        let long = self.w.max(self.h);
        let short = self.w.min(self.h).max(1);
        long as f64 / short as f64
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    /// Intersection with a `width` x `height` image, or `None` when empty.
    pub fn clipped(&self, width: u32, height: u32) -> Option<BoundingBox> {
        let x1 = self.x.max(0);
        let y1 = self.y.max(0);
        let x2 = self.right().min(width as i32);
        let y2 = self.bottom().min(height as i32);
        (x1 < x2 && y1 < y2).then(|| BoundingBox::new(x1, y1, x2 - x1, y2 - y1))
    }

    /// Expands every side by `margin` pixels, clipping the result to bounds.
    pub fn grown(&self, margin: i32, width: u32, height: u32) -> BoundingBox {
        let x1 = self.x.saturating_sub(margin).max(0);
        let y1 = self.y.saturating_sub(margin).max(0);
        let x2 = self.right().saturating_add(margin).min(width as i32);
        let y2 = self.bottom().saturating_add(margin).min(height as i32);
        BoundingBox::new(x1, y1, x2.saturating_sub(x1), y2.saturating_sub(y1))
    }

    /// Smallest rectangle enclosing every box, or `None` for an empty slice.
    pub fn union(boxes: &[BoundingBox]) -> Option<BoundingBox> {
        let first = boxes.first()?;
        let (mut x1, mut y1, mut x2, mut y2) = (first.x, first.y, first.right(), first.bottom());
        for b in &boxes[1..] {
            x1 = x1.min(b.x);
            y1 = y1.min(b.y);
            x2 = x2.max(b.right());
            y2 = y2.max(b.bottom());
        }
        Some(BoundingBox::new(x1, y1, x2.saturating_sub(x1), y2.saturating_sub(y1)))
    }

    /// Sorts into detection order: top edge, then left edge.
    ///
    /// Width and height break remaining ties so the order never depends on
    /// the order contours were discovered in.
    pub fn sort_canonical(boxes: &mut [BoundingBox]) {
        boxes.sort_by_key(|b| (b.y, b.x, b.w, b.h));
    }

    pub fn is_canonically_ordered(boxes: &[BoundingBox]) -> bool {
        boxes.windows(2).all(|p| (p[0].y, p[0].x) <= (p[1].y, p[1].x))
    }
}
