use crate::device::Backend;
use crate::error::{Error, Result};
use serde::Serialize;

/// One attached capture device, as reported by the platform backend.
#[derive(Debug, Clone, Serialize)]
pub struct CameraEntry {
    pub index: String,
    pub name: String,
    pub description: String,
}

/// Enumerate cameras reachable through `backend`.
pub fn list_cameras(backend: Backend) -> Result<Vec<CameraEntry>> {
    tracing::debug!("Scanning cameras with {backend} backend");
    let devices = nokhwa::query(backend.to_api())
        .map_err(|e| Error::DeviceUnavailable(format!("camera enumeration failed: {e}")))?;

    Ok(devices
        .iter()
        .map(|info| CameraEntry {
            index: info.index().to_string(),
            name: info.human_name().to_string(),
            description: info.description().to_string(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_serialize_for_the_cameras_api() {
        let entry = CameraEntry {
            index: "0".into(),
            name: "Integrated Webcam".into(),
            description: "usb-0000:00:14.0-5".into(),
        };

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["index"], "0");
        assert_eq!(value["name"], "Integrated Webcam");
        assert_eq!(value["description"], "usb-0000:00:14.0-5");
    }
}
