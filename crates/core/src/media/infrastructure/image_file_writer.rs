use std::path::Path;

use crate::imaging::resize::to_dynamic_image;
use crate::media::domain::image_writer::ImageWriter;
use crate::shared::frame::Frame;

/// Writes a single frame to an image file using the `image` crate.
///
/// The format follows the path's extension. Gray, RGB and RGBA frames are
/// supported.
pub struct ImageFileWriter;

impl ImageFileWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageWriter for ImageFileWriter {
    fn write(
        &self,
        path: &Path,
        frame: &Frame,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let img = to_dynamic_image(frame).ok_or_else(|| {
            format!(
                "Cannot write {}x{} frame with {} channels to {}",
                frame.width(),
                frame.height(),
                frame.channels(),
                path.display()
            )
        })?;

        img.save(path)?;
        Ok(())
    }
}
