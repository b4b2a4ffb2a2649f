use super::MediaFormat;
use crate::error::{Error, Result};
use image::RgbImage;
use std::path::Path;

/// Encode a single frame to `path` in the given still-image format.
pub fn write_image(frame: &RgbImage, path: &Path, format: MediaFormat) -> Result<()> {
    let format = match format {
        MediaFormat::Jpeg => image::ImageFormat::Jpeg,
        MediaFormat::Png => image::ImageFormat::Png,
        other => {
            return Err(Error::EncodeFailure(format!(
                "{other:?} is not a still-image format"
            )))
        }
    };

    frame
        .save_with_format(path, format)
        .map_err(|e| Error::EncodeFailure(format!("cannot write {}: {e}", path.display())))
}
