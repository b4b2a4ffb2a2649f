mod scan;
mod webcam;

pub use scan::{list_cameras, CameraEntry};
pub use webcam::WebcamCapture;

use crate::error::Result;
use image::RgbImage;
use std::fmt;

/// Trait for camera capture sources
pub trait CaptureSource {
    /// Capture a single frame
    fn capture_frame(&mut self) -> Result<RgbImage>;

    /// Get the resolution of captured frames
    fn resolution(&self) -> (u32, u32);

    /// Effective frame rate the device is delivering
    fn frame_rate(&self) -> f64;

    /// Release the underlying device. Safe to call more than once.
    fn close(&mut self);
}

/// What to do when the device cannot honor the requested format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatPolicy {
    /// Keep the device's effective format and surface a warning.
    Fallback,
    /// Refuse to capture with a format other than the requested one.
    Strict,
}

/// The device stayed open but is not delivering exactly the requested
/// format. Returned from `open` so callers decide how loudly to surface it.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatMismatch {
    pub requested_width: Option<u32>,
    pub requested_height: Option<u32>,
    pub requested_fps: Option<f64>,
    pub actual_width: u32,
    pub actual_height: u32,
    pub actual_fps: u32,
}

impl fmt::Display for FormatMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "requested ")?;
        match (self.requested_width, self.requested_height) {
            (Some(w), Some(h)) => write!(f, "{w}x{h}")?,
            (Some(w), None) => write!(f, "width {w}")?,
            (None, Some(h)) => write!(f, "height {h}")?,
            (None, None) => write!(f, "device resolution")?,
        }
        if let Some(fps) = self.requested_fps {
            write!(f, " @ {fps} fps")?;
        }
        write!(
            f,
            ", device delivers {}x{} @ {} fps",
            self.actual_width, self.actual_height, self.actual_fps
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_message_names_both_formats() {
        let mismatch = FormatMismatch {
            requested_width: Some(1920),
            requested_height: Some(1080),
            requested_fps: Some(30.0),
            actual_width: 1280,
            actual_height: 720,
            actual_fps: 30,
        };
        assert_eq!(
            mismatch.to_string(),
            "requested 1920x1080 @ 30 fps, device delivers 1280x720 @ 30 fps"
        );
    }

    #[test]
    fn mismatch_message_with_partial_request() {
        let mismatch = FormatMismatch {
            requested_width: Some(640),
            requested_height: None,
            requested_fps: None,
            actual_width: 320,
            actual_height: 240,
            actual_fps: 15,
        };
        assert_eq!(
            mismatch.to_string(),
            "requested width 640, device delivers 320x240 @ 15 fps"
        );
    }
}
