use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::media::domain::frame_reader::FrameReader;
use crate::shared::batch_metadata::BatchMetadata;
use crate::shared::frame::Frame;

#[derive(Error, Debug)]
pub enum FrameReadError {
    #[error("cannot list {}: {source}", path.display())]
    ListDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot decode {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("reader used before open")]
    NotOpened,
}

/// Reads every image with an accepted extension from one directory.
///
/// Files are read in file-name order and converted to 8-bit RGB. Matching is
/// case-insensitive on the extension; subdirectories are not descended into.
pub struct ImageDirReader {
    extensions: Vec<String>,
    paths: Option<Vec<PathBuf>>,
}

impl ImageDirReader {
    pub fn new<S: AsRef<str>>(extensions: &[S]) -> Self {
        Self {
            extensions: extensions
                .iter()
                .map(|e| e.as_ref().trim_start_matches('.').to_lowercase())
                .collect(),
            paths: None,
        }
    }

    /// Reader for a single extension such as `"png"`.
    pub fn with_extension(extension: &str) -> Self {
        Self::new(&[extension])
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
    }

    /// Sorted list of matching files in `dir`.
    pub fn list(&self, dir: &Path) -> Result<Vec<PathBuf>, FrameReadError> {
        let entries = std::fs::read_dir(dir).map_err(|source| FrameReadError::ListDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut paths: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file() && self.accepts(p))
            .collect();
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(paths)
    }
}

/// Decodes one image file into an RGB frame named after the file.
pub fn read_frame(path: &Path, index: usize) -> Result<Frame, FrameReadError> {
    let img = image::open(path)
        .map_err(|source| FrameReadError::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .into_rgb8();
    let (width, height) = img.dimensions();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Frame::new(img.into_raw(), width, height, 3, index).with_name(name))
}

impl FrameReader for ImageDirReader {
    fn open(&mut self, source: &Path) -> Result<BatchMetadata, Box<dyn std::error::Error>> {
        let paths = self.list(source)?;
        let names = paths
            .iter()
            .filter_map(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .collect();
        let metadata = BatchMetadata {
            total_frames: paths.len(),
            names,
            source_dir: Some(source.to_path_buf()),
        };
        self.paths = Some(paths);
        Ok(metadata)
    }

    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<Frame, Box<dyn std::error::Error>>> + '_> {
        let Some(paths) = self.paths.as_ref() else {
            return Box::new(std::iter::once(Err(FrameReadError::NotOpened.into())));
        };
        Box::new(
            paths
                .iter()
                .enumerate()
                .map(|(i, p)| read_frame(p, i).map_err(Into::into)),
        )
    }

    fn close(&mut self) {
        self.paths = None;
    }
}
