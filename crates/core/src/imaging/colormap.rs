use crate::shared::frame::Frame;
use crate::shared::GrayGrid;

/// JET colormap: dark blue at 0 through cyan, yellow, to dark red at 255.
pub fn jet(value: u8) -> [u8; 3] {
    let x = value as f64 / 255.0;
    let channel = |center: f64| ((1.5 - (4.0 * x - center).abs()).clamp(0.0, 1.0) * 255.0).round() as u8;
    [channel(3.0), channel(2.0), channel(1.0)]
}

/// Maps every cell through [`jet`], producing an RGB frame.
pub fn colorize(grid: &GrayGrid) -> Frame {
    let lut: Vec<[u8; 3]> = (0..=255u8).map(jet).collect();
    let (h, w) = grid.dim();
    let data = grid.iter().flat_map(|&v| lut[v as usize]).collect();
    Frame::new(data, w as u32, h as u32, 3, 0)
}
