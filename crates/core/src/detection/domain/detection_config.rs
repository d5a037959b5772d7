use serde::{Deserialize, Serialize};

/// How the background-suppressed residual is binarized.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ThresholdPolicy {
    /// Compare every pixel against a constant, clamped to `[1, 254]`.
    Fixed { value: i32 },
    /// Compare every pixel against the mean of its neighbourhood.
    Adaptive,
    /// Single global level chosen by Otsu's method.
    Otsu,
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        ThresholdPolicy::Fixed { value: 20 }
    }
}

/// Tunables for per-frame light detection and its derived crops.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub gamma: f64,
    pub equalize: bool,
    pub kernel_size: usize,
    pub threshold: ThresholdPolicy,
    pub invert: bool,
    pub remove_hot_pixels: bool,
    pub dilate_iterations: usize,
    pub min_area: i64,
    pub max_area: i64,
    pub min_brightness: u32,
    pub aspect_ratio_max: f64,
    pub box_grow: i32,
    pub padding: i32,
    pub rect_thickness: u32,
    pub extension: String,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            gamma: 1.4,
            equalize: false,
            kernel_size: 9,
            threshold: ThresholdPolicy::default(),
            invert: false,
            remove_hot_pixels: true,
            dilate_iterations: 0,
            min_area: 12,
            max_area: 20_000,
            min_brightness: 12,
            aspect_ratio_max: 10.0,
            box_grow: 20,
            padding: 30,
            rect_thickness: 3,
            extension: crate::shared::constants::DEFAULT_FRAME_EXTENSION.to_string(),
        }
    }
}

impl DetectionConfig {
    /// Returns a copy with every out-of-range value pulled to the nearest valid one.
    pub fn sanitized(&self) -> Self {
        let min_area = self.min_area.max(0);
        let threshold = match self.threshold {
            ThresholdPolicy::Fixed { value } => ThresholdPolicy::Fixed {
                value: value.clamp(1, 254),
            },
            other => other,
        };
        let extension = self.extension.trim().trim_start_matches('.').to_lowercase();
        Self {
            gamma: if self.gamma.is_finite() { self.gamma } else { 1.0 },
            equalize: self.equalize,
            kernel_size: self.kernel_size.max(3) | 1,
            threshold,
            invert: self.invert,
            remove_hot_pixels: self.remove_hot_pixels,
            dilate_iterations: self.dilate_iterations,
            min_area,
            max_area: self.max_area.max(min_area),
            min_brightness: self.min_brightness.min(255),
            aspect_ratio_max: if self.aspect_ratio_max.is_nan() {
                1.0
            } else {
                self.aspect_ratio_max.max(1.0)
            },
            box_grow: self.box_grow.max(0),
            padding: self.padding.max(0),
            rect_thickness: self.rect_thickness.max(1),
            extension: if extension.is_empty() {
                crate::shared::constants::DEFAULT_FRAME_EXTENSION.to_string()
            } else {
                extension
            },
        }
    }
}
