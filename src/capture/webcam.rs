use super::{CaptureSource, FormatMismatch, FormatPolicy};
use crate::device::DeviceSpec;
use crate::error::{Error, Result};
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{
    CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
};
use nokhwa::Camera;

const FALLBACK_WIDTH: u32 = 1280;
const FALLBACK_HEIGHT: u32 = 720;
const FALLBACK_FPS: u32 = 30;

pub struct WebcamCapture {
    camera: Option<Camera>,
    width: u32,
    height: u32,
    fps: f64,
}

impl WebcamCapture {
    /// Open the camera described by `spec` and best-effort apply its
    /// resolution/fps. A format the device cannot honor is returned as a
    /// `FormatMismatch` warning under `FormatPolicy::Fallback`, or turned
    /// into `DeviceUnavailable` under `FormatPolicy::Strict`.
    pub fn open(
        spec: &DeviceSpec,
        policy: FormatPolicy,
    ) -> Result<(Self, Option<FormatMismatch>)> {
        tracing::info!("Opening {spec}");

        let index = CameraIndex::Index(spec.index);
        let requested = if spec.requests_format() {
            // Most cameras support MJPEG at their advertised formats; the
            // driver picks the nearest match to the requested one.
            let target = CameraFormat::new(
                Resolution::new(
                    spec.width.unwrap_or(FALLBACK_WIDTH),
                    spec.height.unwrap_or(FALLBACK_HEIGHT),
                ),
                FrameFormat::MJPEG,
                spec.fps.map(|f| f.round() as u32).unwrap_or(FALLBACK_FPS),
            );
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(target))
        } else {
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution)
        };

        let mut camera = match spec.backend {
            Some(backend) => Camera::with_backend(index, requested, backend.to_api()),
            None => Camera::new(index, requested),
        }
        .map_err(|e| Error::DeviceUnavailable(format!("cannot open {spec}: {e}")))?;

        camera
            .open_stream()
            .map_err(|e| Error::DeviceUnavailable(format!("cannot start {spec}: {e}")))?;

        let resolution = camera.resolution();
        let actual_fps = camera.frame_rate();
        let mismatch = format_mismatch(spec, resolution.width(), resolution.height(), actual_fps);

        if policy == FormatPolicy::Strict {
            if let Some(mismatch) = &mismatch {
                let _ = camera.stop_stream();
                return Err(Error::DeviceUnavailable(format!("{spec}: {mismatch}")));
            }
        }

        // Warmup read; some drivers deliver a stale first frame.
        let _ = camera.frame();

        tracing::info!(
            "Camera open at {}x{} @ {} fps",
            resolution.width(),
            resolution.height(),
            actual_fps
        );

        let fps = if actual_fps > 0 {
            f64::from(actual_fps)
        } else {
            spec.fps.unwrap_or(f64::from(FALLBACK_FPS))
        };

        Ok((
            Self {
                camera: Some(camera),
                width: resolution.width(),
                height: resolution.height(),
                fps,
            },
            mismatch,
        ))
    }
}

fn format_mismatch(
    spec: &DeviceSpec,
    actual_width: u32,
    actual_height: u32,
    actual_fps: u32,
) -> Option<FormatMismatch> {
    let width_off = spec.width.is_some_and(|w| w != actual_width);
    let height_off = spec.height.is_some_and(|h| h != actual_height);
    let fps_off = spec
        .fps
        .is_some_and(|f| actual_fps > 0 && f.round() as u32 != actual_fps);
    if width_off || height_off || fps_off {
        Some(FormatMismatch {
            requested_width: spec.width,
            requested_height: spec.height,
            requested_fps: spec.fps,
            actual_width,
            actual_height,
            actual_fps,
        })
    } else {
        None
    }
}

impl CaptureSource for WebcamCapture {
    fn capture_frame(&mut self) -> Result<RgbImage> {
        let camera = self
            .camera
            .as_mut()
            .ok_or_else(|| Error::ReadFailure("capture session is closed".into()))?;

        let frame = camera
            .frame()
            .map_err(|e| Error::ReadFailure(format!("frame read failed: {e}")))?;

        frame
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::ReadFailure(format!("frame decode failed: {e}")))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn frame_rate(&self) -> f64 {
        self.fps
    }

    fn close(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                tracing::warn!("Error stopping camera stream: {e}");
            }
            tracing::debug!("Capture session released");
        }
    }
}

impl Drop for WebcamCapture {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceSpec;

    #[test]
    fn no_mismatch_when_nothing_requested() {
        let spec = DeviceSpec::parse("0").unwrap();
        assert!(format_mismatch(&spec, 1920, 1080, 30).is_none());
    }

    #[test]
    fn mismatch_only_compares_requested_fields() {
        let spec = DeviceSpec::parse("0,CAP_ANY,1920,1080").unwrap();
        assert!(format_mismatch(&spec, 1920, 1080, 5).is_none());

        let mismatch = format_mismatch(&spec, 1280, 720, 30).unwrap();
        assert_eq!(mismatch.requested_width, Some(1920));
        assert_eq!(mismatch.actual_width, 1280);
    }

    #[test]
    fn unknown_device_rate_is_not_a_mismatch() {
        // Drivers that report 0 fps give us nothing to compare against.
        let spec = DeviceSpec::parse("0,CAP_ANY,640,480,30").unwrap();
        assert!(format_mismatch(&spec, 640, 480, 0).is_none());
    }
}
