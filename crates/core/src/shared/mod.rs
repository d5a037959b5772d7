pub mod batch_metadata;
pub mod bounding_box;
pub mod constants;
pub mod frame;

/// Single-channel 8-bit image indexed `[[row, col]]`.
pub type GrayGrid = ndarray::Array2<u8>;
