use super::{MediaFormat, VideoSink};
use crate::error::{Error, Result};
use image::RgbImage;
use std::io::Write;
use std::path::Path;
use std::process::{Child, Command, Stdio};

/// Video-file writer backed by an ffmpeg child process.
///
/// Raw RGB24 frames are piped to ffmpeg's stdin; ffmpeg handles encoding and
/// container muxing. `finish` closes the pipe, waits for the process, and is
/// idempotent.
pub struct FfmpegWriter {
    child: Option<Child>,
    width: u32,
    height: u32,
}

impl FfmpegWriter {
    pub fn create(
        path: &Path,
        format: MediaFormat,
        width: u32,
        height: u32,
        fps: f64,
    ) -> Result<Self> {
        let args = ffmpeg_args(format, width, height, fps, path)?;
        tracing::debug!("Launching ffmpeg {}", args.join(" "));

        let child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::EncodeFailure(format!("cannot launch ffmpeg: {e}")))?;

        tracing::info!(
            "Video writer open: {} ({}x{} @ {:.1} fps)",
            path.display(),
            width,
            height,
            fps
        );

        Ok(Self {
            child: Some(child),
            width,
            height,
        })
    }
}

fn ffmpeg_args(
    format: MediaFormat,
    width: u32,
    height: u32,
    fps: f64,
    path: &Path,
) -> Result<Vec<String>> {
    let codec: &[&str] = match format {
        MediaFormat::Mp4 => &["-c:v", "libx264", "-pix_fmt", "yuv420p"],
        MediaFormat::Avi => &["-c:v", "mjpeg", "-q:v", "3"],
        other => {
            return Err(Error::EncodeFailure(format!(
                "{other:?} is not a video container"
            )))
        }
    };

    let mut args: Vec<String> = [
        "-hide_banner",
        "-loglevel",
        "error",
        "-y",
        "-f",
        "rawvideo",
        "-pixel_format",
        "rgb24",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    args.push("-video_size".into());
    args.push(format!("{width}x{height}"));
    args.push("-framerate".into());
    args.push(format!("{fps}"));
    args.push("-i".into());
    args.push("-".into());
    args.extend(codec.iter().map(|s| s.to_string()));
    args.push(path.to_string_lossy().into_owned());
    Ok(args)
}

impl VideoSink for FfmpegWriter {
    fn append(&mut self, frame: &RgbImage) -> Result<()> {
        let child = self
            .child
            .as_mut()
            .ok_or_else(|| Error::EncodeFailure("video writer already finished".into()))?;
        let stdin = child
            .stdin
            .as_mut()
            .ok_or_else(|| Error::EncodeFailure("ffmpeg stdin is gone".into()))?;

        // Resize if the device delivered a frame that doesn't match the
        // writer's configured dimensions.
        let resized;
        let data: &[u8] = if frame.dimensions() == (self.width, self.height) {
            frame.as_raw()
        } else {
            resized = image::imageops::resize(
                frame,
                self.width,
                self.height,
                image::imageops::FilterType::Lanczos3,
            );
            resized.as_raw()
        };

        stdin
            .write_all(data)
            .map_err(|e| Error::EncodeFailure(format!("ffmpeg pipe write failed: {e}")))
    }

    fn finish(&mut self) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        // Closing stdin is what tells ffmpeg to flush and finalize the
        // container.
        drop(child.stdin.take());
        let status = child
            .wait()
            .map_err(|e| Error::EncodeFailure(format!("ffmpeg did not exit: {e}")))?;
        if !status.success() {
            return Err(Error::EncodeFailure(format!("ffmpeg exited with {status}")));
        }

        tracing::debug!("Video writer closed");
        Ok(())
    }
}

impl Drop for FfmpegWriter {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            drop(child.stdin.take());
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mp4_args_request_h264_yuv420p() {
        let args = ffmpeg_args(MediaFormat::Mp4, 1280, 720, 30.0, Path::new("clip.mp4")).unwrap();
        assert!(args.windows(2).any(|w| w == ["-c:v", "libx264"]));
        assert!(args.windows(2).any(|w| w == ["-pix_fmt", "yuv420p"]));
        assert!(args.windows(2).any(|w| w == ["-video_size", "1280x720"]));
        assert!(args.windows(2).any(|w| w == ["-framerate", "30"]));
        assert_eq!(args.last().map(String::as_str), Some("clip.mp4"));
    }

    #[test]
    fn avi_args_request_mjpeg() {
        let args = ffmpeg_args(MediaFormat::Avi, 640, 480, 15.0, Path::new("clip.avi")).unwrap();
        assert!(args.windows(2).any(|w| w == ["-c:v", "mjpeg"]));
    }

    #[test]
    fn image_format_is_not_a_container() {
        assert!(matches!(
            ffmpeg_args(MediaFormat::Png, 640, 480, 15.0, Path::new("x.png")),
            Err(Error::EncodeFailure(_))
        ));
    }

    #[test]
    fn input_is_raw_rgb_on_stdin() {
        let args = ffmpeg_args(MediaFormat::Mp4, 320, 240, 24.0, Path::new("c.mp4")).unwrap();
        assert!(args.windows(2).any(|w| w == ["-f", "rawvideo"]));
        assert!(args.windows(2).any(|w| w == ["-pixel_format", "rgb24"]));
        assert!(args.windows(2).any(|w| w == ["-i", "-"]));
    }
}
