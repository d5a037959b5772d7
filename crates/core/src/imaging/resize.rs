use image::imageops::FilterType;
use image::DynamicImage;

use crate::shared::frame::Frame;

/// Wraps frame bytes in an `image` buffer matching its channel count.
///
/// Returns `None` for channel layouts other than 1, 3 or 4 or when the data
/// length does not match the dimensions.
pub fn to_dynamic_image(frame: &Frame) -> Option<DynamicImage> {
    let (w, h, data) = (frame.width(), frame.height(), frame.data().to_vec());
    match frame.channels() {
        1 => image::GrayImage::from_raw(w, h, data).map(DynamicImage::ImageLuma8),
        3 => image::RgbImage::from_raw(w, h, data).map(DynamicImage::ImageRgb8),
        4 => image::RgbaImage::from_raw(w, h, data).map(DynamicImage::ImageRgba8),
        _ => None,
    }
}

/// Converts back to a frame with the same channel layout as `like`.
fn from_dynamic_image(img: DynamicImage, like: &Frame) -> Frame {
    let (w, h) = (img.width(), img.height());
    let (data, channels) = match like.channels() {
        1 => (img.into_luma8().into_raw(), 1),
        4 => (img.into_rgba8().into_raw(), 4),
        _ => (img.into_rgb8().into_raw(), 3),
    };
    Frame::new(data, w, h, channels, like.index()).with_name(like.name())
}

/// Dimensions after scaling by `scale` (truncated, at least 1) and then
/// fitting the long side within `max_long` while keeping the aspect ratio.
pub fn scaled_dimensions(width: u32, height: u32, scale: f64, max_long: u32) -> (u32, u32) {
    let up_w = ((width as f64 * scale) as u32).max(1);
    let up_h = ((height as f64 * scale) as u32).max(1);
    let max_long = max_long.max(1);
    if up_w.max(up_h) <= max_long {
        return (up_w, up_h);
    }
    if up_h >= up_w {
        let w = (up_w as f64 * (max_long as f64 / up_h as f64)) as u32;
        (w.max(1), max_long)
    } else {
        let h = (up_h as f64 * (max_long as f64 / up_w as f64)) as u32;
        (max_long, h.max(1))
    }
}

/// Upscales a crop by `scale` with a cubic filter, then shrinks it with a
/// triangle filter if its long side exceeds `max_long`.
pub fn scale_crop(frame: &Frame, scale: f64, max_long: u32) -> Result<Frame, Box<dyn std::error::Error>> {
    let img = to_dynamic_image(frame).ok_or_else(|| {
        format!(
            "Cannot scale {}x{} frame with {} channels",
            frame.width(),
            frame.height(),
            frame.channels()
        )
    })?;
    let up_w = ((frame.width() as f64 * scale) as u32).max(1);
    let up_h = ((frame.height() as f64 * scale) as u32).max(1);
    let mut out = img.resize_exact(up_w, up_h, FilterType::CatmullRom);

    let (w, h) = scaled_dimensions(frame.width(), frame.height(), scale, max_long);
    if (w, h) != (up_w, up_h) {
        out = out.resize_exact(w, h, FilterType::Triangle);
    }
    Ok(from_dynamic_image(out, frame))
}
