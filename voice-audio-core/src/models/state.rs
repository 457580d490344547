use serde::{Deserialize, Serialize};

/// Microphone permission as seen by the UI collaborator.
///
/// A denial is kept as persistent state (not a one-shot error) so the UI can
/// offer a retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    #[default]
    Pending,
    Granted,
    Denied,
}

/// Run state of the shared audio-processing context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextState {
    Suspended,
    Running,
}

/// Recording session state. At most one capture runs at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    #[default]
    Idle,
    Capturing,
}

/// Lifecycle coordinator state machine.
///
/// ```text
///              startup ok                  recording start
///  Inactive ─────────────→ Monitoring ───────────────────────→ Recording { monitoring: true }
///     ↑  │                    │   ↑                                    │
///     │  │ recording start    │   │ playback closed (resume + acquire) │ playback opened
///     │  ↓                    ↓   │                                    ↓
///  Recording { monitoring: false }   SuspendedForPlayback { resume_monitoring, recording }
/// ```
///
/// Every transition is a pure function returning the next state; the
/// coordinator performs the side effects and then applies the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum LifecycleState {
    /// No monitoring stream and no exclusive playback.
    #[default]
    Inactive,
    /// Monitoring stream live, pitch monitor running, no recording.
    Monitoring,
    /// A recording captures on its own stream; `monitoring` tells whether
    /// the independent monitoring stream is live too.
    Recording { monitoring: bool },
    /// Monitoring fully torn down so the device can play loudly.
    #[serde(rename_all = "camelCase")]
    SuspendedForPlayback {
        resume_monitoring: bool,
        recording: bool,
    },
}

impl LifecycleState {
    pub fn is_monitoring(&self) -> bool {
        matches!(self, Self::Monitoring | Self::Recording { monitoring: true })
    }

    pub fn is_recording(&self) -> bool {
        matches!(
            self,
            Self::Recording { .. } | Self::SuspendedForPlayback { recording: true, .. }
        )
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self, Self::SuspendedForPlayback { .. })
    }

    /// The monitoring stream and pitch loop came up.
    pub fn on_monitoring_started(self) -> Self {
        match self {
            Self::Inactive | Self::Monitoring => Self::Monitoring,
            Self::Recording { .. } => Self::Recording { monitoring: true },
            suspended @ Self::SuspendedForPlayback { .. } => suspended,
        }
    }

    /// The monitoring stream went away without a playback window
    /// (failed re-acquisition, shutdown).
    pub fn on_monitoring_lost(self) -> Self {
        match self {
            Self::Inactive | Self::Monitoring => Self::Inactive,
            Self::Recording { .. } => Self::Recording { monitoring: false },
            Self::SuspendedForPlayback { recording, .. } => Self::SuspendedForPlayback {
                resume_monitoring: false,
                recording,
            },
        }
    }

    /// An exclusive-output surface opened.
    pub fn on_playback_opened(self) -> Self {
        match self {
            suspended @ Self::SuspendedForPlayback { .. } => suspended,
            other => Self::SuspendedForPlayback {
                resume_monitoring: other.is_monitoring(),
                recording: other.is_recording(),
            },
        }
    }

    /// The exclusive-output surface closed. Monitoring is not live yet; the
    /// coordinator re-acquires and then applies `on_monitoring_started`.
    pub fn on_playback_closed(self) -> Self {
        match self {
            Self::SuspendedForPlayback { recording: true, .. } => {
                Self::Recording { monitoring: false }
            }
            Self::SuspendedForPlayback { recording: false, .. } => Self::Inactive,
            other => other,
        }
    }

    pub fn on_recording_started(self) -> Self {
        match self {
            Self::Inactive => Self::Recording { monitoring: false },
            Self::Monitoring => Self::Recording { monitoring: true },
            recording @ Self::Recording { .. } => recording,
            Self::SuspendedForPlayback {
                resume_monitoring, ..
            } => Self::SuspendedForPlayback {
                resume_monitoring,
                recording: true,
            },
        }
    }

    pub fn on_recording_stopped(self) -> Self {
        match self {
            Self::Recording { monitoring: true } => Self::Monitoring,
            Self::Recording { monitoring: false } => Self::Inactive,
            Self::SuspendedForPlayback {
                resume_monitoring, ..
            } => Self::SuspendedForPlayback {
                resume_monitoring,
                recording: false,
            },
            other => other,
        }
    }

    /// Whether closing playback from this state should re-run the monitoring
    /// startup sequence.
    pub fn should_resume_monitoring(&self) -> bool {
        matches!(
            self,
            Self::SuspendedForPlayback {
                resume_monitoring: true,
                ..
            }
        )
    }
}
