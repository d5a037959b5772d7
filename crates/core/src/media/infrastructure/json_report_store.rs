use std::path::Path;

use crate::media::domain::report_store::{FrameReport, ReportError, ReportStore};

/// Stores the report as a pretty-printed JSON array.
pub struct JsonReportStore;

impl JsonReportStore {
    pub fn new() -> Self {
        Self
    }
}

impl Default for JsonReportStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportStore for JsonReportStore {
    fn save(&self, path: &Path, reports: &[FrameReport]) -> Result<(), ReportError> {
        let write_err = |source| ReportError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let json = serde_json::to_string_pretty(reports)
            .map_err(|e| write_err(std::io::Error::other(e)))?;
        std::fs::write(path, json).map_err(write_err)
    }

    fn load(&self, path: &Path) -> Result<Vec<FrameReport>, ReportError> {
        let text = std::fs::read_to_string(path).map_err(|source| ReportError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ReportError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::bounding_box::BoundingBox;

    fn sample() -> Vec<FrameReport> {
        vec![
            FrameReport {
                file: "0001.png".into(),
                detections: 2,
                boxes: vec![BoundingBox::new(10, 10, 5, 5), BoundingBox::new(50, 12, 4, 4)],
                crop_box: Some(BoundingBox::new(0, 0, 104, 66)),
                annotated_out: "0001_ann.png".into(),
                cropped_out: "0001_crop.png".into(),
            },
            FrameReport {
                file: "0002.png".into(),
                crop_box: Some(BoundingBox::new(0, 0, 640, 480)),
                annotated_out: "0002_ann.png".into(),
                cropped_out: "0002_crop.png".into(),
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("detection_report.json");
        let store = JsonReportStore::new();
        store.save(&path, &sample()).unwrap();
        assert_eq!(store.load(&path).unwrap(), sample());
    }

    #[test]
    fn test_saved_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.json");
        JsonReportStore::new().save(&path, &sample()[..1]).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let first = &value[0];
        assert_eq!(first["file"], "0001.png");
        assert_eq!(first["detections"], 2);
        assert_eq!(first["boxes"][1]["x"], 50);
        assert_eq!(first["crop_box"]["w"], 104);
        assert_eq!(first["annotated_out"], "0001_ann.png");
    }

    #[test]
    fn test_load_tolerates_missing_boxes_and_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.json");
        std::fs::write(
            &path,
            r#"[{"file": "a.png", "extra": true}, {"file": "b.png", "boxes": [{"x":1,"y":2,"w":3,"h":4}]}]"#,
        )
        .unwrap();
        let reports = JsonReportStore::new().load(&path).unwrap();
        assert!(reports[0].boxes.is_empty());
        assert_eq!(reports[1].boxes, vec![BoundingBox::new(1, 2, 3, 4)]);
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = JsonReportStore::new()
            .load(Path::new("/nonexistent/report.json"))
            .unwrap_err();
        assert!(matches!(err, ReportError::Read { .. }));
        assert!(err.to_string().contains("/nonexistent/report.json"));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            JsonReportStore::new().load(&path),
            Err(ReportError::Parse { .. })
        ));
    }
}
