use serde::{Deserialize, Serialize};

/// Settings for turning detections into composites and a density heatmap.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeatmapConfig {
    /// Percentile of the covered cells mapped to 0.
    pub low_percentile: f64,
    /// Percentile of the covered cells mapped to 255.
    pub high_percentile: f64,
    /// Weight of the colorized heatmap in the overlay.
    pub overlay_alpha: f64,
    pub make_max_projection: bool,
    pub make_mean_stack: bool,
    pub make_heatmap: bool,
}

impl Default for HeatmapConfig {
    fn default() -> Self {
        Self {
            low_percentile: 1.0,
            high_percentile: 99.0,
            overlay_alpha: 0.6,
            make_max_projection: true,
            make_mean_stack: true,
            make_heatmap: true,
        }
    }
}

impl HeatmapConfig {
    pub fn sanitized(&self) -> Self {
        let clamp_pct = |p: f64| if p.is_nan() { 0.0 } else { p.clamp(0.0, 100.0) };
        let low = clamp_pct(self.low_percentile);
        let high = clamp_pct(self.high_percentile).max(low);
        Self {
            low_percentile: low,
            high_percentile: high,
            overlay_alpha: if self.overlay_alpha.is_nan() {
                0.0
            } else {
                self.overlay_alpha.clamp(0.0, 1.0)
            },
            ..self.clone()
        }
    }
}
