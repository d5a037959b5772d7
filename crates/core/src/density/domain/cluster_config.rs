use serde::{Deserialize, Serialize};

/// How the density map is binarized before clusters are extracted.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ClusterThreshold {
    /// Keep cells above the given percentile of the whole map.
    Percentile { percentile: f64 },
    Otsu,
    Fixed { value: i32 },
}

impl Default for ClusterThreshold {
    fn default() -> Self {
        ClusterThreshold::Percentile { percentile: 92.0 }
    }
}

/// Tunables for cluster extraction and cluster crop output.
///
/// `blur`, `open_size` and `close_size` are kernel diameters; anything below
/// 3 disables that step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    pub threshold: ClusterThreshold,
    pub blur: usize,
    pub open_size: usize,
    pub close_size: usize,
    pub min_area: i64,
    pub max_area: i64,
    pub padding: i32,
    pub scale_factor: f64,
    pub max_output_long: u32,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            threshold: ClusterThreshold::default(),
            blur: 3,
            open_size: 3,
            close_size: 5,
            min_area: 80,
            max_area: 10_000_000,
            padding: 24,
            scale_factor: 3.0,
            max_output_long: 1024,
        }
    }
}

impl ClusterConfig {
    pub fn sanitized(&self) -> Self {
        let threshold = match self.threshold {
            ClusterThreshold::Percentile { percentile } => ClusterThreshold::Percentile {
                percentile: if percentile.is_nan() {
                    0.0
                } else {
                    percentile.clamp(0.0, 100.0)
                },
            },
            ClusterThreshold::Fixed { value } => ClusterThreshold::Fixed {
                value: value.clamp(0, 255),
            },
            ClusterThreshold::Otsu => ClusterThreshold::Otsu,
        };
        let min_area = self.min_area.max(0);
        Self {
            threshold,
            blur: kernel_or_disabled(self.blur),
            open_size: kernel_or_disabled(self.open_size),
            close_size: kernel_or_disabled(self.close_size),
            min_area,
            max_area: self.max_area.max(min_area),
            padding: self.padding.max(0),
            scale_factor: if self.scale_factor.is_finite() && self.scale_factor > 0.0 {
                self.scale_factor
            } else {
                1.0
            },
            max_output_long: self.max_output_long.max(1),
        }
    }
}

/// 0 for sizes below 3, otherwise the size rounded up to odd.
fn kernel_or_disabled(size: usize) -> usize {
    if size < 3 {
        0
    } else {
        size | 1
    }
}
