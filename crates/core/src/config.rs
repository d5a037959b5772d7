use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::density::domain::cluster_config::ClusterConfig;
use crate::density::domain::heatmap_config::HeatmapConfig;
use crate::detection::domain::detection_config::DetectionConfig;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Every tunable of a run, grouped by stage.
///
/// Loaded from JSON; sections and fields that are absent keep their defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightmapConfig {
    pub detection: DetectionConfig,
    pub heatmap: HeatmapConfig,
    pub cluster: ClusterConfig,
}

impl LightmapConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Clamps every section to valid values.
    pub fn sanitized(&self) -> Self {
        Self {
            detection: self.detection.sanitized(),
            heatmap: self.heatmap.sanitized(),
            cluster: self.cluster.sanitized(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::density::domain::cluster_config::ClusterThreshold;
    use crate::detection::domain::detection_config::ThresholdPolicy;

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(LightmapConfig::from_json("{}").unwrap(), LightmapConfig::default());
    }

    #[test]
    fn test_partial_sections_override_only_named_fields() {
        let cfg = LightmapConfig::from_json(
            r#"{
                "detection": {"kernel_size": 15, "threshold": {"mode": "adaptive"}},
                "cluster": {"threshold": {"mode": "otsu"}, "min_area": 10}
            }"#,
        )
        .unwrap();
        assert_eq!(cfg.detection.kernel_size, 15);
        assert_eq!(cfg.detection.threshold, ThresholdPolicy::Adaptive);
        assert_eq!(cfg.detection.min_area, 12);
        assert_eq!(cfg.cluster.threshold, ClusterThreshold::Otsu);
        assert_eq!(cfg.cluster.min_area, 10);
        assert_eq!(cfg.heatmap, HeatmapConfig::default());
    }

    #[test]
    fn test_to_json_round_trips() {
        let cfg = LightmapConfig::default();
        assert_eq!(LightmapConfig::from_json(&cfg.to_json()).unwrap(), cfg);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lightmap.json");
        std::fs::write(&path, r#"{"heatmap": {"overlay_alpha": 0.3}}"#).unwrap();
        let cfg = LightmapConfig::load(&path).unwrap();
        assert_eq!(cfg.heatmap.overlay_alpha, 0.3);
    }

    #[test]
    fn test_load_errors_name_the_file() {
        let err = LightmapConfig::load(Path::new("/nonexistent/lightmap.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("lightmap.json"));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"detection": {"gamma": "high"}}"#).unwrap();
        assert!(matches!(LightmapConfig::load(&path), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_sanitized_clamps_each_section() {
        let mut cfg = LightmapConfig::default();
        cfg.detection.kernel_size = 2;
        cfg.heatmap.overlay_alpha = 4.0;
        cfg.cluster.open_size = 2;
        let s = cfg.sanitized();
        assert_eq!(s.detection.kernel_size, 3);
        assert_eq!(s.heatmap.overlay_alpha, 1.0);
        assert_eq!(s.cluster.open_size, 0);
    }
}
