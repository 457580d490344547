use crate::models::config::CaptureConstraints;
use crate::models::error::VoiceAudioError;
use crate::models::media::{DeviceInfo, MediaStream};

/// Platform source of microphone streams.
///
/// Implemented by:
/// - `CpalMicrophone` (desktop)
/// - `MockMicrophone` (tests)
pub trait MicrophoneProvider: Send + Sync {
    /// Whether an input device is present at all.
    fn is_available(&self) -> bool;

    /// Open a new stream honoring `constraints`.
    ///
    /// Fails with [`VoiceAudioError::PermissionDenied`] when the user refused
    /// access and [`VoiceAudioError::DeviceUnavailable`] when no device can
    /// be opened.
    fn open_stream(&self, constraints: &CaptureConstraints) -> Result<MediaStream, VoiceAudioError>;

    /// The device streams are opened on.
    fn device_info(&self) -> Option<DeviceInfo>;
}
