//! Numeric image primitives on [`GrayGrid`](crate::shared::GrayGrid), plus
//! the few frame-level helpers used when rendering outputs.

pub mod colormap;
pub mod contours;
pub mod draw;
pub mod equalize;
pub mod gaussian;
pub mod median;
pub mod morphology;
pub mod resize;
pub mod stats;
pub mod threshold;
