use std::path::PathBuf;

/// What a frame reader found when it opened a batch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchMetadata {
    /// Number of candidate frame files; unreadable ones are still counted.
    pub total_frames: usize,
    /// Frame file names in read order.
    pub names: Vec<String>,
    pub source_dir: Option<PathBuf>,
}

impl BatchMetadata {
    pub fn is_empty(&self) -> bool {
        self.total_frames == 0
    }
}
