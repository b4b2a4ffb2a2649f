use crate::capture::{CaptureSource, FormatPolicy, WebcamCapture};
use crate::device::DeviceSpec;
use crate::error::{Error, Result};
use crate::output::{self, FfmpegWriter, MediaFormat, VideoSink};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Capture one frame from the camera described by `spec` and encode it to
/// `output_path`.
pub fn capture_image(spec: &DeviceSpec, output_path: &Path, policy: FormatPolicy) -> Result<()> {
    let format = MediaFormat::from_path(output_path)?;
    if !format.is_image() {
        return Err(Error::EncodeFailure(format!(
            "{} is not a still-image path",
            output_path.display()
        )));
    }

    let (mut capture, warning) = WebcamCapture::open(spec, policy)?;
    if let Some(warning) = warning {
        tracing::warn!("{warning}");
    }

    let frame = capture.capture_frame();
    capture.close();
    let frame = frame?;

    tracing::info!("Captured {} x {} image", frame.width(), frame.height());
    output::write_image(&frame, output_path, format)?;
    tracing::debug!("Wrote {}", output_path.display());
    Ok(())
}

/// Record from the camera described by `spec` into `output_path` until
/// `duration` elapses or `stop` is raised. Returns the number of frames
/// written.
pub fn capture_video(
    spec: &DeviceSpec,
    output_path: &Path,
    duration: Duration,
    policy: FormatPolicy,
    stop: &AtomicBool,
) -> Result<u64> {
    let format = MediaFormat::from_path(output_path)?;
    if !format.is_video() {
        return Err(Error::EncodeFailure(format!(
            "{} is not a video path",
            output_path.display()
        )));
    }

    let (mut capture, warning) = WebcamCapture::open(spec, policy)?;
    if let Some(warning) = warning {
        tracing::warn!("{warning}");
    }

    // The writer is configured with the session's effective format, not the
    // requested one.
    let (width, height) = capture.resolution();
    let fps = capture.frame_rate();
    let mut writer = match FfmpegWriter::create(output_path, format, width, height, fps) {
        Ok(writer) => writer,
        Err(e) => {
            capture.close();
            return Err(e);
        }
    };

    tracing::info!(
        "Recording {}x{} @ {:.1} fps for {:.1}s to {}",
        width,
        height,
        fps,
        duration.as_secs_f64(),
        output_path.display()
    );

    let frames = record(&mut capture, &mut writer, duration, stop)?;
    tracing::info!("Recorded {frames} frames to {}", output_path.display());
    Ok(frames)
}

/// Drive the read/append loop, then release the sink before the session on
/// every exit path.
pub fn record<C, S>(
    capture: &mut C,
    sink: &mut S,
    duration: Duration,
    stop: &AtomicBool,
) -> Result<u64>
where
    C: CaptureSource,
    S: VideoSink,
{
    let frames = record_loop(capture, sink, duration, stop);
    let finished = sink.finish();
    capture.close();
    let frames = frames?;
    finished?;
    Ok(frames)
}

fn record_loop<C, S>(
    capture: &mut C,
    sink: &mut S,
    duration: Duration,
    stop: &AtomicBool,
) -> Result<u64>
where
    C: CaptureSource,
    S: VideoSink,
{
    record_loop_with_clock(capture, sink, duration, stop, Instant::now)
}

// The clock is injectable so the frame-count-vs-duration property can be
// checked without wall-clock sleeps.
fn record_loop_with_clock<C, S>(
    capture: &mut C,
    sink: &mut S,
    duration: Duration,
    stop: &AtomicBool,
    mut clock: impl FnMut() -> Instant,
) -> Result<u64>
where
    C: CaptureSource,
    S: VideoSink,
{
    let deadline = clock() + duration;
    let mut frames = 0u64;

    while clock() < deadline {
        if stop.load(Ordering::Relaxed) {
            tracing::info!("Interrupted after {frames} frames");
            break;
        }
        let frame = capture.capture_frame()?;
        sink.append(&frame)?;
        frames += 1;
    }

    Ok(frames)
}
