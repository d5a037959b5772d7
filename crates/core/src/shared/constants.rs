/// Extensions accepted when scanning a directory of annotated frames.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Extension of raw input frames unless overridden.
pub const DEFAULT_FRAME_EXTENSION: &str = "png";

pub const ANNOTATED_SUFFIX: &str = "_ann.png";
pub const CROPPED_SUFFIX: &str = "_crop.png";

pub const OUT_MAX: &str = "composite_max.png";
pub const OUT_MEAN: &str = "composite_mean.png";
pub const OUT_HEATMAP: &str = "composite_heatmap.png";
pub const OUT_DENSITY: &str = "composite_density.png";
pub const OUT_OVERLAY: &str = "composite_overlay.png";
pub const OUT_CLUSTER_BOXES: &str = "heatmap_boxes.png";

/// Pure red in RGB order.
pub const BOX_COLOR: [u8; 3] = [255, 0, 0];

/// Outline thickness of cluster rectangles on the debug heatmap.
pub const CLUSTER_RECT_THICKNESS: u32 = 2;
