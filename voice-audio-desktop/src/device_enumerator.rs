//! Input device enumeration via cpal.
//!
//! Lists capture endpoints of the default host with names, default flag and
//! a transport guess. cpal exposes no transport property, so the transport
//! is inferred from the device name.

use cpal::traits::{DeviceTrait, HostTrait};

use voice_audio_core::models::error::VoiceAudioError;
use voice_audio_core::models::media::{DeviceInfo, DeviceTransport};

/// Audio device enumerator over a cpal host.
pub struct DeviceEnumerator {
    host: cpal::Host,
}

impl DeviceEnumerator {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// List input (microphone) devices.
    pub fn list_capture_devices(&self) -> Result<Vec<DeviceInfo>, VoiceAudioError> {
        let default_name = self.default_capture_device_name();
        let devices = self
            .host
            .input_devices()
            .map_err(|e| VoiceAudioError::Unknown(format!("input_devices failed: {}", e)))?;

        let mut infos = Vec::new();
        for (i, device) in devices.enumerate() {
            let name = device.name().unwrap_or_else(|_| format!("Device {}", i));
            let is_default = default_name.as_deref() == Some(name.as_str());
            infos.push(device_info(name, is_default));
        }
        Ok(infos)
    }

    /// Name of the host's default input device.
    pub fn default_capture_device_name(&self) -> Option<String> {
        self.host.default_input_device().and_then(|d| d.name().ok())
    }

    /// Default input device, or the first one whose name matches `name`.
    pub fn find_input_device(&self, name: Option<&str>) -> Result<cpal::Device, VoiceAudioError> {
        let Some(name) = name else {
            return self
                .host
                .default_input_device()
                .ok_or(VoiceAudioError::DeviceUnavailable);
        };
        self.host
            .input_devices()
            .map_err(|e| VoiceAudioError::Unknown(format!("input_devices failed: {}", e)))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or(VoiceAudioError::DeviceUnavailable)
    }

    /// Default output device, or the first one whose name matches `name`.
    pub fn find_output_device(&self, name: Option<&str>) -> Result<cpal::Device, VoiceAudioError> {
        let Some(name) = name else {
            return self
                .host
                .default_output_device()
                .ok_or(VoiceAudioError::DeviceUnavailable);
        };
        self.host
            .output_devices()
            .map_err(|e| VoiceAudioError::Unknown(format!("output_devices failed: {}", e)))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or(VoiceAudioError::DeviceUnavailable)
    }
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn device_info(name: String, is_default: bool) -> DeviceInfo {
    DeviceInfo {
        id: name.clone(),
        transport: transport_from_name(&name),
        name,
        is_default,
    }
}

/// Guess how a device is attached from its display name.
///
/// Bluetooth headsets in hands-free mode capture at 8/16 kHz mono, which
/// hurts pitch detection; hosts can warn on [`DeviceTransport::Bluetooth`].
pub fn transport_from_name(name: &str) -> DeviceTransport {
    let lower = name.to_lowercase();
    if lower.contains("bluetooth") || lower.contains("bthenum") || lower.contains("airpods") || lower.contains("hands-free") {
        DeviceTransport::Bluetooth
    } else if lower.contains("usb") {
        DeviceTransport::Usb
    } else if lower.contains("virtual") || lower.contains("blackhole") || lower.contains("loopback") || lower.contains("monitor of") {
        DeviceTransport::Virtual
    } else if lower.contains("built-in") || lower.contains("internal") || lower.contains("macbook") {
        DeviceTransport::BuiltIn
    } else {
        DeviceTransport::Unknown
    }
}
