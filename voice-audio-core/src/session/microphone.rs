use std::sync::Arc;

use crate::models::config::CaptureConstraints;
use crate::models::error::VoiceAudioError;
use crate::models::media::MediaStream;
use crate::models::state::PermissionState;
use crate::traits::microphone_provider::MicrophoneProvider;

/// Holder of at most one microphone stream.
///
/// The only place hardware tracks get started or stopped.
pub struct MicrophoneSession {
    name: &'static str,
    provider: Arc<dyn MicrophoneProvider>,
    stream: Option<MediaStream>,
    permission: PermissionState,
}

impl MicrophoneSession {
    pub fn new(name: &'static str, provider: Arc<dyn MicrophoneProvider>) -> Self {
        Self {
            name,
            provider,
            stream: None,
            permission: PermissionState::Pending,
        }
    }

    /// Open a fresh stream, releasing any held one first.
    ///
    /// Any failure leaves the session without a stream and the permission
    /// `Denied`.
    pub fn acquire(&mut self, constraints: &CaptureConstraints) -> Result<(), VoiceAudioError> {
        self.release();

        match self.provider.open_stream(constraints) {
            Ok(stream) => {
                log::info!(
                    "[{}] Microphone acquired ({} track(s), {} Hz)",
                    self.name,
                    stream.tracks().len(),
                    stream.sample_rate()
                );
                self.stream = Some(stream);
                self.permission = PermissionState::Granted;
                Ok(())
            }
            Err(e) => {
                if e.is_acquisition_failure() {
                    log::warn!("[{}] Microphone unavailable: {}", self.name, e);
                } else {
                    log::error!("[{}] Microphone acquisition failed: {}", self.name, e);
                }
                self.permission = PermissionState::Denied;
                Err(e)
            }
        }
    }

    /// Stop every track of the held stream and drop it. No-op without one.
    pub fn release(&mut self) {
        if let Some(stream) = self.stream.take() {
            stream.stop_all_tracks();
            log::info!("[{}] Microphone released", self.name);
        }
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    pub fn stream(&self) -> Option<&MediaStream> {
        self.stream.as_ref()
    }

    pub fn permission(&self) -> PermissionState {
        self.permission
    }

    pub fn live_track_count(&self) -> usize {
        self.stream.as_ref().map_or(0, MediaStream::live_track_count)
    }
}

impl Drop for MicrophoneSession {
    fn drop(&mut self) {
        self.release();
    }
}
