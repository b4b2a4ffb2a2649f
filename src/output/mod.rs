mod still;
mod video;

pub use still::write_image;
pub use video::FfmpegWriter;

use crate::error::{Error, Result};
use image::RgbImage;
use std::path::Path;

/// Output media format, selected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFormat {
    Jpeg,
    Png,
    Mp4,
    Avi,
}

impl MediaFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| {
                Error::EncodeFailure(format!("no file extension on {}", path.display()))
            })?;

        match ext.as_str() {
            "jpg" | "jpeg" => Ok(MediaFormat::Jpeg),
            "png" => Ok(MediaFormat::Png),
            "mp4" => Ok(MediaFormat::Mp4),
            "avi" => Ok(MediaFormat::Avi),
            other => Err(Error::EncodeFailure(format!(
                "unsupported output format: .{other}"
            ))),
        }
    }

    pub fn is_image(self) -> bool {
        matches!(self, MediaFormat::Jpeg | MediaFormat::Png)
    }

    pub fn is_video(self) -> bool {
        matches!(self, MediaFormat::Mp4 | MediaFormat::Avi)
    }
}

/// Trait for video-file destinations
pub trait VideoSink {
    /// Append one frame to the output
    fn append(&mut self, frame: &RgbImage) -> Result<()>;

    /// Flush and close the output. Safe to call more than once.
    fn finish(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_maps_to_format() {
        assert_eq!(
            MediaFormat::from_path(Path::new("shot.jpg")).unwrap(),
            MediaFormat::Jpeg
        );
        assert_eq!(
            MediaFormat::from_path(Path::new("shot.JPEG")).unwrap(),
            MediaFormat::Jpeg
        );
        assert_eq!(
            MediaFormat::from_path(Path::new("shot.png")).unwrap(),
            MediaFormat::Png
        );
        assert_eq!(
            MediaFormat::from_path(Path::new("clip.mp4")).unwrap(),
            MediaFormat::Mp4
        );
        assert_eq!(
            MediaFormat::from_path(Path::new("clip.AVI")).unwrap(),
            MediaFormat::Avi
        );
    }

    #[test]
    fn unknown_or_missing_extension_fails() {
        assert!(matches!(
            MediaFormat::from_path(Path::new("shot.tiff")),
            Err(Error::EncodeFailure(_))
        ));
        assert!(matches!(
            MediaFormat::from_path(Path::new("shot")),
            Err(Error::EncodeFailure(_))
        ));
    }

    #[test]
    fn image_and_video_classes_are_disjoint() {
        for format in [
            MediaFormat::Jpeg,
            MediaFormat::Png,
            MediaFormat::Mp4,
            MediaFormat::Avi,
        ] {
            assert_ne!(format.is_image(), format.is_video());
        }
    }
}
