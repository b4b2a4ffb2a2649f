use crate::error::{Error, Result};
use nokhwa::utils::ApiBackend;
use std::fmt;
use std::str::FromStr;

/// Platform capture backend, named after the OpenCV-style constants users
/// pass on the command line (`CAP_DSHOW`, `CAP_V4L2`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Any,
    DirectShow,
    MediaFoundation,
    Video4Linux,
    AvFoundation,
    GStreamer,
}

impl Backend {
    /// Map onto the nokhwa backend table. DirectShow devices are reachable
    /// through Media Foundation on every Windows build nokhwa supports.
    pub fn to_api(self) -> ApiBackend {
        match self {
            Backend::Any => ApiBackend::Auto,
            Backend::DirectShow | Backend::MediaFoundation => ApiBackend::MediaFoundation,
            Backend::Video4Linux => ApiBackend::Video4Linux,
            Backend::AvFoundation => ApiBackend::AVFoundation,
            Backend::GStreamer => ApiBackend::GStreamer,
        }
    }
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "CAP_ANY" => Ok(Backend::Any),
            "CAP_DSHOW" => Ok(Backend::DirectShow),
            "CAP_MSMF" => Ok(Backend::MediaFoundation),
            "CAP_V4L" | "CAP_V4L2" => Ok(Backend::Video4Linux),
            "CAP_AVFOUNDATION" => Ok(Backend::AvFoundation),
            "CAP_GSTREAMER" => Ok(Backend::GStreamer),
            other => Err(Error::InvalidConfiguration(format!(
                "unknown capture backend: {other}"
            ))),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Backend::Any => "CAP_ANY",
            Backend::DirectShow => "CAP_DSHOW",
            Backend::MediaFoundation => "CAP_MSMF",
            Backend::Video4Linux => "CAP_V4L2",
            Backend::AvFoundation => "CAP_AVFOUNDATION",
            Backend::GStreamer => "CAP_GSTREAMER",
        };
        f.write_str(name)
    }
}

/// Parsed device specifier: `index[,backend[,width,height[,fps]]]`.
///
/// Only the index is always present; unset fields leave the camera at its
/// own defaults. Immutable once parsed.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSpec {
    pub index: u32,
    pub backend: Option<Backend>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<f64>,
}

impl Default for DeviceSpec {
    fn default() -> Self {
        Self {
            index: 0,
            backend: None,
            width: None,
            height: None,
            fps: None,
        }
    }
}

impl DeviceSpec {
    /// Parse a comma-separated device-spec string. An empty string selects
    /// device 0 with all other fields unset.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Self::default());
        }

        let tokens: Vec<&str> = s.split(',').map(str::trim).collect();
        if tokens.len() > 5 {
            return Err(Error::InvalidConfiguration(format!(
                "device spec has {} fields, at most 5 allowed: {s}",
                tokens.len()
            )));
        }

        let index = tokens[0].parse::<u32>().map_err(|_| {
            Error::InvalidConfiguration(format!("bad device index: {:?}", tokens[0]))
        })?;
        let backend = tokens.get(1).map(|t| t.parse::<Backend>()).transpose()?;
        let width = tokens
            .get(2)
            .map(|t| parse_positive_u32(t, "width"))
            .transpose()?;
        let height = tokens
            .get(3)
            .map(|t| parse_positive_u32(t, "height"))
            .transpose()?;
        let fps = tokens
            .get(4)
            .map(|t| parse_positive_f64(t, "fps"))
            .transpose()?;

        Ok(Self {
            index,
            backend,
            width,
            height,
            fps,
        })
    }

    /// True when the spec asks for any explicit format parameter.
    pub fn requests_format(&self) -> bool {
        self.width.is_some() || self.height.is_some() || self.fps.is_some()
    }
}

impl fmt::Display for DeviceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} camera {}",
            self.backend.unwrap_or(Backend::Any),
            self.index
        )?;
        if let (Some(w), Some(h)) = (self.width, self.height) {
            write!(f, " - {w} x {h}")?;
        }
        if let Some(fps) = self.fps {
            write!(f, " - {fps} fps")?;
        }
        Ok(())
    }
}

fn parse_positive_u32(token: &str, field: &str) -> Result<u32> {
    let value = token
        .parse::<u32>()
        .map_err(|_| Error::InvalidConfiguration(format!("bad {field}: {token:?}")))?;
    if value == 0 {
        return Err(Error::InvalidConfiguration(format!(
            "{field} must be positive: {token:?}"
        )));
    }
    Ok(value)
}

fn parse_positive_f64(token: &str, field: &str) -> Result<f64> {
    let value = token
        .parse::<f64>()
        .map_err(|_| Error::InvalidConfiguration(format!("bad {field}: {token:?}")))?;
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::InvalidConfiguration(format!(
            "{field} must be positive: {token:?}"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_yields_defaults() {
        let spec = DeviceSpec::parse("").unwrap();
        assert_eq!(spec, DeviceSpec::default());
        assert_eq!(spec.index, 0);
        assert!(spec.backend.is_none());
        assert!(!spec.requests_format());
    }

    #[test]
    fn full_spec_parses_every_field() {
        let spec = DeviceSpec::parse("0,CAP_DSHOW,1920,1080,30.0").unwrap();
        assert_eq!(spec.index, 0);
        assert_eq!(spec.backend, Some(Backend::DirectShow));
        assert_eq!(spec.width, Some(1920));
        assert_eq!(spec.height, Some(1080));
        assert_eq!(spec.fps, Some(30.0));
    }

    #[test]
    fn trailing_fields_stay_unset() {
        let spec = DeviceSpec::parse("2").unwrap();
        assert_eq!(spec.index, 2);
        assert!(spec.backend.is_none());

        let spec = DeviceSpec::parse("1,CAP_ANY").unwrap();
        assert_eq!(spec.index, 1);
        assert_eq!(spec.backend, Some(Backend::Any));
        assert!(spec.width.is_none());

        let spec = DeviceSpec::parse("1,CAP_V4L2,640").unwrap();
        assert_eq!(spec.width, Some(640));
        assert!(spec.height.is_none());
        assert!(spec.fps.is_none());

        let spec = DeviceSpec::parse("1,CAP_V4L2,640,480").unwrap();
        assert_eq!(spec.height, Some(480));
        assert!(spec.fps.is_none());
    }

    #[test]
    fn non_numeric_index_is_rejected() {
        assert!(matches!(
            DeviceSpec::parse("abc"),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn unknown_backend_is_rejected() {
        assert!(matches!(
            DeviceSpec::parse("0,CAP_BOGUS"),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn malformed_numeric_tokens_are_rejected() {
        assert!(DeviceSpec::parse("0,CAP_ANY,wide,480").is_err());
        assert!(DeviceSpec::parse("0,CAP_ANY,640,tall").is_err());
        assert!(DeviceSpec::parse("0,CAP_ANY,640,480,fast").is_err());
        // Negative numbers never parse as u32, zero is explicitly rejected.
        assert!(DeviceSpec::parse("0,CAP_ANY,-640,480").is_err());
        assert!(DeviceSpec::parse("0,CAP_ANY,0,480").is_err());
        assert!(DeviceSpec::parse("0,CAP_ANY,640,480,0").is_err());
    }

    #[test]
    fn too_many_fields_are_rejected() {
        assert!(DeviceSpec::parse("0,CAP_ANY,640,480,30,extra").is_err());
    }

    #[test]
    fn backend_aliases() {
        assert_eq!("CAP_V4L".parse::<Backend>().unwrap(), Backend::Video4Linux);
        assert_eq!(
            "CAP_MSMF".parse::<Backend>().unwrap(),
            Backend::MediaFoundation
        );
    }

    #[test]
    fn display_matches_original_shape() {
        let spec = DeviceSpec::parse("0,CAP_V4L2,1920,1080,30").unwrap();
        assert_eq!(format!("{spec}"), "CAP_V4L2 camera 0 - 1920 x 1080 - 30 fps");
    }
}
