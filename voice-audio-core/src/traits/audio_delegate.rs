use crate::models::error::VoiceAudioError;
use crate::models::recording::RecordingInfo;
use crate::models::state::{LifecycleState, PermissionState};

/// Event delegate for engine notifications.
///
/// Methods may be called from background threads (recording completion runs
/// on its own thread). Implementations should marshal to the UI thread if
/// needed.
pub trait AudioDelegate: Send + Sync {
    fn on_state_changed(&self, state: &LifecycleState);

    fn on_permission_changed(&self, permission: PermissionState);

    /// Non-fatal failures: denied acquisition, encoder failure.
    fn on_error(&self, error: &VoiceAudioError);

    /// A finished recording was added to the collection.
    fn on_recording_ready(&self, recording: &RecordingInfo);
}
