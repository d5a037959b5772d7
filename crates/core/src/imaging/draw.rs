use crate::shared::bounding_box::BoundingBox;
use crate::shared::frame::Frame;

/// Draws a hollow rectangle whose outer edge is `rect`, `thickness` pixels wide.
///
/// Parts outside the frame are clipped. On frames with fewer than three
/// channels only the leading components of `color` are used.
pub fn draw_rectangle(frame: &mut Frame, rect: &BoundingBox, color: [u8; 3], thickness: u32) {
    let Some(r) = rect.clipped(frame.width(), frame.height()) else {
        return;
    };
    let t = thickness.max(1) as i32;
    let width = frame.width() as usize;
    let channels = frame.channels() as usize;
    let painted = channels.min(3);
    let data = frame.data_mut();

    for y in r.y..r.bottom() {
        for x in r.x..r.right() {
            let on_border = x < rect.x + t
                || x >= rect.right() - t
                || y < rect.y + t
                || y >= rect.bottom() - t;
            if !on_border {
                continue;
            }
            let offset = (y as usize * width + x as usize) * channels;
            data[offset..offset + painted].copy_from_slice(&color[..painted]);
        }
    }
}
