use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::bounding_box::BoundingBox;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("cannot read report {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed report {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("cannot write report {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One frame's entry in the detection report.
///
/// Unknown fields are ignored on load and a missing `boxes` list reads as
/// empty, so hand-edited or older reports still accumulate.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub file: String,
    #[serde(default)]
    pub detections: usize,
    #[serde(default)]
    pub boxes: Vec<BoundingBox>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop_box: Option<BoundingBox>,
    #[serde(default)]
    pub annotated_out: String,
    #[serde(default)]
    pub cropped_out: String,
}

/// Persists the per-frame detection report.
pub trait ReportStore: Send {
    fn save(&self, path: &Path, reports: &[FrameReport]) -> Result<(), ReportError>;

    fn load(&self, path: &Path) -> Result<Vec<FrameReport>, ReportError>;
}
