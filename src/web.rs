use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::capture::{self, FormatPolicy};
use crate::device::{Backend, DeviceSpec};
use crate::error::Error;
use crate::ops;
use crate::temp::TempManager;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const SWEEP_MAX_AGE: Duration = Duration::from_secs(600);

const DEFAULT_VIDEO_SECS: f64 = 15.0;
const MIN_VIDEO_SECS: f64 = 1.0;
const MAX_VIDEO_SECS: f64 = 60.0;

/// Shared application state, constructed explicitly and handed to the
/// router. The mutex keeps at most one capture in flight.
pub struct AppState {
    temp: Arc<TempManager>,
    capture_lock: Mutex<()>,
}

/// Run the web front end until Ctrl-C.
pub async fn serve(host: &str, port: u16) -> anyhow::Result<()> {
    let temp = Arc::new(TempManager::new()?);
    temp.spawn_sweeper(SWEEP_INTERVAL, SWEEP_MAX_AGE);

    let state = Arc::new(AppState {
        temp,
        capture_lock: Mutex::new(()),
    });

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Web front end listening on http://{addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/cameras", get(api_cameras))
        .route("/api/image", post(api_image))
        .route("/api/video", post(api_video))
        .with_state(state)
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("Shutting down web front end");
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn api_cameras() -> Response {
    match tokio::task::spawn_blocking(|| capture::list_cameras(Backend::Any)).await {
        Ok(Ok(entries)) => Json(entries).into_response(),
        Ok(Err(e)) => error_response(&e),
        Err(e) => {
            (StatusCode::INTERNAL_SERVER_ERROR, format!("scan task failed: {e}")).into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct CaptureParams {
    #[serde(default)]
    device: String,
    duration: Option<f64>,
}

async fn api_image(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CaptureParams>,
) -> Response {
    let spec = match DeviceSpec::parse(&params.device) {
        Ok(spec) => spec,
        Err(e) => return error_response(&e),
    };

    let _guard = state.capture_lock.lock().await;
    let path = state.temp.request_path(".jpg");
    let result = tokio::task::spawn_blocking(move || {
        ops::capture_image(&spec, &path, FormatPolicy::Fallback).map(|()| path)
    })
    .await;

    respond_with_media(result, "image/jpeg").await
}

async fn api_video(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CaptureParams>,
) -> Response {
    let spec = match DeviceSpec::parse(&params.device) {
        Ok(spec) => spec,
        Err(e) => return error_response(&e),
    };
    let duration = Duration::from_secs_f64(clamp_duration(params.duration));

    let _guard = state.capture_lock.lock().await;
    let path = state.temp.request_path(".mp4");
    let result = tokio::task::spawn_blocking(move || {
        let stop = AtomicBool::new(false);
        ops::capture_video(&spec, &path, duration, FormatPolicy::Fallback, &stop).map(|_| path)
    })
    .await;

    respond_with_media(result, "video/mp4").await
}

fn clamp_duration(requested: Option<f64>) -> f64 {
    requested
        .filter(|d| d.is_finite())
        .unwrap_or(DEFAULT_VIDEO_SECS)
        .clamp(MIN_VIDEO_SECS, MAX_VIDEO_SECS)
}

async fn respond_with_media(
    result: Result<Result<PathBuf, Error>, tokio::task::JoinError>,
    content_type: &'static str,
) -> Response {
    match result {
        Ok(Ok(path)) => match tokio::fs::read(&path).await {
            Ok(bytes) => ([(header::CONTENT_TYPE, content_type)], bytes).into_response(),
            Err(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("cannot read captured file: {e}"),
            )
                .into_response(),
        },
        Ok(Err(e)) => error_response(&e),
        Err(e) => {
            (StatusCode::INTERNAL_SERVER_ERROR, format!("capture task failed: {e}"))
                .into_response()
        }
    }
}

fn error_response(error: &Error) -> Response {
    (status_for(error), error.to_string()).into_response()
}

fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::InvalidConfiguration(_) => StatusCode::BAD_REQUEST,
        Error::DeviceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        Error::ReadFailure(_) | Error::EncodeFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head>
<meta charset="utf-8">
<title>camgrab</title>
<style>
  body { font-family: sans-serif; max-width: 60rem; margin: 2rem auto; }
  .row { display: flex; gap: 1rem; align-items: end; margin-bottom: 1rem; }
  img, video { max-width: 100%; }
  label { display: block; font-size: 0.8rem; }
</style>
</head>
<body>
<h2>Camera Capture</h2>
<div class="row">
  <div style="flex:3">
    <label for="device">Device spec (index[,backend[,width,height[,fps]]])</label>
    <select id="device" style="width:100%"></select>
  </div>
  <div style="flex:1">
    <label for="duration">Video length (seconds)</label>
    <input id="duration" type="number" value="15" min="1" max="60">
  </div>
  <button onclick="captureImage()">Capture Image</button>
  <button onclick="captureVideo()">Capture Video</button>
</div>
<p id="status"></p>
<div class="row">
  <img id="image" hidden>
  <video id="video" controls autoplay hidden></video>
</div>
<script>
async function loadCameras() {
  const select = document.getElementById('device');
  try {
    const cameras = await (await fetch('/api/cameras')).json();
    for (const cam of cameras) {
      const option = document.createElement('option');
      option.value = cam.index;
      option.textContent = `${cam.index}: ${cam.name}`;
      select.appendChild(option);
    }
  } catch (e) {
    setStatus('Camera scan failed: ' + e);
  }
  if (!select.options.length) {
    const option = document.createElement('option');
    option.value = '0';
    option.textContent = '0: default camera';
    select.appendChild(option);
  }
}
function setStatus(text) { document.getElementById('status').textContent = text; }
async function capture(kind) {
  const device = encodeURIComponent(document.getElementById('device').value);
  const duration = document.getElementById('duration').value;
  setStatus('Capturing ' + kind + '...');
  const response = await fetch(`/api/${kind}?device=${device}&duration=${duration}`, { method: 'POST' });
  if (!response.ok) {
    setStatus(await response.text());
    return null;
  }
  setStatus('');
  return URL.createObjectURL(await response.blob());
}
async function captureImage() {
  const url = await capture('image');
  if (!url) return;
  const image = document.getElementById('image');
  image.src = url;
  image.hidden = false;
  document.getElementById('video').hidden = true;
}
async function captureVideo() {
  const url = await capture('video');
  if (!url) return;
  const video = document.getElementById('video');
  video.src = url;
  video.hidden = false;
  document.getElementById('image').hidden = true;
}
loadCameras();
</script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_is_clamped_to_ui_bounds() {
        assert_eq!(clamp_duration(None), 15.0);
        assert_eq!(clamp_duration(Some(30.0)), 30.0);
        assert_eq!(clamp_duration(Some(0.0)), 1.0);
        assert_eq!(clamp_duration(Some(600.0)), 60.0);
        assert_eq!(clamp_duration(Some(f64::NAN)), 15.0);
    }

    #[test]
    fn error_kinds_map_to_http_statuses() {
        assert_eq!(
            status_for(&Error::InvalidConfiguration("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&Error::DeviceUnavailable("x".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&Error::ReadFailure("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&Error::EncodeFailure("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn index_page_has_capture_controls() {
        assert!(INDEX_HTML.contains("Capture Image"));
        assert!(INDEX_HTML.contains("Capture Video"));
        assert!(INDEX_HTML.contains("/api/cameras"));
    }
}
