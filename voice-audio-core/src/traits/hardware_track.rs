use crate::models::error::VoiceAudioError;

/// One hardware capture track of a microphone stream.
///
/// Holding a live track keeps the device's input path open; on phones that
/// routes output to the quiet earpiece. Tracks must be stopped explicitly.
pub trait HardwareTrack: Send + Sync {
    /// Human-readable device label.
    fn label(&self) -> String;

    fn is_live(&self) -> bool;

    /// Stop the track and release the device.
    ///
    /// Returns [`VoiceAudioError::TeardownRace`] when the track was already
    /// stopped. Must not return before the device is released.
    fn stop(&self) -> Result<(), VoiceAudioError>;
}
