use thiserror::Error;

/// Errors surfaced by the voice audio core.
///
/// None of these are fatal: every failure degrades to a reduced-functionality
/// state (no pitch feedback, no recording) rather than tearing the engine down.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VoiceAudioError {
    /// The user refused microphone access.
    #[error("microphone permission denied")]
    PermissionDenied,

    /// No microphone present, or the hardware is busy.
    #[error("audio device not available")]
    DeviceUnavailable,

    /// The encoder rejected the capture or could not finalize it.
    #[error("encoder failure: {0}")]
    EncoderFailure(String),

    /// An operation hit a stream, track or tap that was already released.
    /// Treated as a benign no-op wherever it is observed.
    #[error("resource already released: {0}")]
    TeardownRace(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    /// The pitch loop is already scheduled; a second loop is never started.
    #[error("pitch monitor already running")]
    MonitorAlreadyRunning,

    #[error("a recording is already in progress")]
    RecordingInProgress,

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl VoiceAudioError {
    /// Whether this error is an "already stopped" condition that teardown
    /// paths swallow.
    pub fn is_teardown_race(&self) -> bool {
        matches!(self, Self::TeardownRace(_))
    }

    /// Whether the microphone was refused by the user or the hardware, as
    /// opposed to a fault in the capture setup.
    pub fn is_acquisition_failure(&self) -> bool {
        matches!(self, Self::PermissionDenied | Self::DeviceUnavailable)
    }
}
