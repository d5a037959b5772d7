use ndarray::{Array2, ArrayView3};

use crate::shared::bounding_box::BoundingBox;
use crate::shared::GrayGrid;

// Fixed-point BT.601 luma weights (R, G, B), scaled by 2^14.
const LUMA_R: u32 = 4899;
const LUMA_G: u32 = 9617;
const LUMA_B: u32 = 1868;
const LUMA_SHIFT: u32 = 14;

/// A still image from a batch: interleaved bytes in row-major order.
///
/// `index` is the ordinal position within the batch and `name` the source
/// file name (empty for synthesized frames). Format conversion happens at
/// I/O boundaries only.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
    name: String,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
            name: String::new(),
        }
    }

    /// Wraps a single-channel grid as a one-channel frame.
    pub fn from_gray(grid: &GrayGrid, index: usize) -> Self {
        let (h, w) = grid.dim();
        Self::new(grid.iter().copied().collect(), w as u32, h as u32, 1, index)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn same_size(&self, other: &Frame) -> bool {
        self.width == other.width && self.height == other.height
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    /// Converts to a single-channel intensity grid.
    ///
    /// Three- and four-channel frames are treated as RGB(A) and reduced with
    /// BT.601 luma weights; alpha is ignored. Other layouts use channel 0.
    pub fn to_intensity(&self) -> GrayGrid {
        let h = self.height as usize;
        let w = self.width as usize;
        let c = self.channels as usize;
        if c == 0 {
            return Array2::zeros((h, w));
        }
        Array2::from_shape_fn((h, w), |(y, x)| {
            let px = &self.data[(y * w + x) * c..(y * w + x) * c + c];
            if c >= 3 {
                let luma = px[0] as u32 * LUMA_R + px[1] as u32 * LUMA_G + px[2] as u32 * LUMA_B;
                ((luma + (1 << (LUMA_SHIFT - 1))) >> LUMA_SHIFT).min(255) as u8
            } else {
                px[0]
            }
        })
    }

    /// Copies out the part of the frame covered by `rect`, clipped to bounds.
    ///
    /// A rectangle entirely outside the frame yields a copy of the whole frame.
    pub fn crop(&self, rect: &BoundingBox) -> Frame {
        let Some(r) = rect.clipped(self.width, self.height) else {
            return self.clone();
        };
        let c = self.channels as usize;
        let stride = self.width as usize * c;
        let row_len = r.w as usize * c;
        let mut data = Vec::with_capacity(r.h as usize * row_len);
        for row in r.y as usize..(r.y + r.h) as usize {
            let start = row * stride + r.x as usize * c;
            data.extend_from_slice(&self.data[start..start + row_len]);
        }
        Frame::new(data, r.w as u32, r.h as u32, self.channels, self.index)
            .with_name(self.name.clone())
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn rgb_frame(width: u32, height: u32, rgb: [u8; 3]) -> Frame {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take((width * height * 3) as usize)
            .collect();
        Frame::new(data, width, height, 3, 0)
    }

    #[test]
    fn test_construction_and_accessors() {
        let frame = Frame::new(vec![0u8; 12], 2, 2, 3, 5).with_name("night_0005.png");
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.name(), "night_0005.png");
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        Frame::new(vec![0u8; 10], 2, 2, 3, 0);
    }

    #[test]
    fn test_as_ndarray_shape() {
        let frame = Frame::new(vec![0u8; 24], 4, 2, 3, 0);
        assert_eq!(frame.as_ndarray().shape(), &[2, 4, 3]);
    }

    #[test]
    fn test_intensity_of_white_and_black() {
        assert!(rgb_frame(3, 2, [255, 255, 255]).to_intensity().iter().all(|&v| v == 255));
        assert!(rgb_frame(3, 2, [0, 0, 0]).to_intensity().iter().all(|&v| v == 0));
    }

    #[test]
    fn test_intensity_weights_green_heaviest() {
        let r = rgb_frame(1, 1, [200, 0, 0]).to_intensity()[[0, 0]];
        let g = rgb_frame(1, 1, [0, 200, 0]).to_intensity()[[0, 0]];
        let b = rgb_frame(1, 1, [0, 0, 200]).to_intensity()[[0, 0]];
        assert_eq!(r, 60);
        assert_eq!(g, 117);
        assert_eq!(b, 23);
    }

    #[test]
    fn test_gray_frame_roundtrip() {
        let grid = array![[1u8, 2, 3], [4, 5, 6]];
        let frame = Frame::from_gray(&grid, 7);
        assert_eq!(frame.channels(), 1);
        assert_eq!(frame.width(), 3);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.to_intensity(), grid);
    }

    #[test]
    fn test_crop_copies_rows() {
        let grid = Array2::from_shape_fn((4, 5), |(y, x)| (y * 10 + x) as u8);
        let frame = Frame::from_gray(&grid, 0);
        let crop = frame.crop(&BoundingBox::new(1, 2, 3, 2));
        assert_eq!(crop.width(), 3);
        assert_eq!(crop.height(), 2);
        assert_eq!(crop.data(), &[21, 22, 23, 31, 32, 33]);
    }

    #[test]
    fn test_crop_is_clipped_to_bounds() {
        let frame = rgb_frame(10, 10, [1, 2, 3]);
        let crop = frame.crop(&BoundingBox::new(-5, 8, 8, 8));
        assert_eq!((crop.width(), crop.height()), (3, 2));
    }

    #[test]
    fn test_crop_outside_returns_whole_frame() {
        let frame = rgb_frame(4, 4, [9, 9, 9]);
        let crop = frame.crop(&BoundingBox::new(50, 50, 3, 3));
        assert_eq!(crop, frame);
    }
}
