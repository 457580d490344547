use std::sync::mpsc::Receiver;
use std::sync::{Arc, Weak};
use std::thread;

use parking_lot::Mutex;

use crate::models::config::{CaptureConstraints, EncoderConfig};
use crate::models::error::VoiceAudioError;
use crate::models::recording::{RecordingArtifact, RecordingId};
use crate::models::state::{PermissionState, RecordingState};
use crate::session::device_context::DeviceContext;
use crate::session::microphone::MicrophoneSession;
use crate::storage::library::RecordingLibrary;
use crate::traits::audio_delegate::AudioDelegate;
use crate::traits::encoder::{EncoderJob, EncoderOutcome, EncoderService};
use crate::traits::microphone_provider::MicrophoneProvider;
use crate::traits::playback_store::PlaybackStore;

/// Voice recording on its own microphone stream.
///
/// ```text
/// [own MicrophoneSession] → [CaptureInput] → [EncoderJob] ─ stop / time limit ─→ channel
///                                                                                  │
///                                                    completion thread ←───────────┘
///                                                           │
///                                                [RecordingLibrary] + delegate
/// ```
///
/// The monitoring stream is never used: recording re-acquires with the
/// recording constraints every time, independent of monitoring. A job that
/// reaches its time limit is stopped from a `recording-time-limit` thread
/// through the same path as [`RecordingSession::stop`].
pub struct RecordingSession {
    shared: Arc<Capture>,
    constraints: CaptureConstraints,
    encoder_config: EncoderConfig,
    encoder: Arc<dyn EncoderService>,
}

/// State reachable from the time-limit and completion threads.
struct Capture {
    microphone: Mutex<MicrophoneSession>,
    job: Mutex<Option<Box<dyn EncoderJob>>>,
    playback: Arc<dyn PlaybackStore>,
    library: Mutex<RecordingLibrary>,
    delegate: Mutex<Option<Arc<dyn AudioDelegate>>>,
    completions: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl RecordingSession {
    pub fn new(
        provider: Arc<dyn MicrophoneProvider>,
        constraints: CaptureConstraints,
        encoder_config: EncoderConfig,
        encoder: Arc<dyn EncoderService>,
        playback: Arc<dyn PlaybackStore>,
    ) -> Self {
        Self {
            shared: Arc::new(Capture {
                microphone: Mutex::new(MicrophoneSession::new("recording", provider)),
                job: Mutex::new(None),
                playback,
                library: Mutex::new(RecordingLibrary::new()),
                delegate: Mutex::new(None),
                completions: Mutex::new(Vec::new()),
            }),
            constraints,
            encoder_config,
            encoder,
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn AudioDelegate>) {
        *self.shared.delegate.lock() = Some(delegate);
    }

    pub fn state(&self) -> RecordingState {
        if self.shared.job.lock().is_some() {
            RecordingState::Capturing
        } else {
            RecordingState::Idle
        }
    }

    /// Permission outcome of the last recording acquisition.
    pub fn permission(&self) -> PermissionState {
        self.shared.microphone.lock().permission()
    }

    pub fn live_track_count(&self) -> usize {
        self.shared.microphone.lock().live_track_count()
    }

    /// Acquire a fresh stream and start an encoder job on it.
    pub fn start(&mut self, device: &mut DeviceContext) -> Result<(), VoiceAudioError> {
        let mut slot = self.shared.job.lock();
        if slot.is_some() {
            return Err(VoiceAudioError::RecordingInProgress);
        }

        let mut microphone = self.shared.microphone.lock();
        microphone.acquire(&self.constraints)?;
        let started = microphone
            .stream()
            .ok_or(VoiceAudioError::DeviceUnavailable)
            .and_then(|stream| device.create_capture_input(stream))
            .and_then(|input| self.encoder.start(input, &self.encoder_config));
        let mut job = match started {
            Ok(job) => job,
            Err(e) => {
                log::error!("Failed to start recording: {}", e);
                microphone.release();
                return Err(e);
            }
        };
        drop(microphone);

        let weak = Arc::downgrade(&self.shared);
        job.on_time_limit(Box::new(move || stop_at_time_limit(weak)));
        *slot = Some(job);
        log::info!("Recording started");
        Ok(())
    }

    /// Release the recording stream, then finish the encoder job. The
    /// artifact is added in the background once encoding completes. No-op
    /// when idle.
    pub fn stop(&mut self) {
        self.shared.finish_capture();
    }

    /// Block until every finished recording has been added or reported.
    pub fn wait_for_pending(&mut self) {
        self.shared.wait_for_pending();
    }

    /// Revoke and remove a recording. Unknown ids are ignored.
    pub fn delete(&self, id: RecordingId) -> bool {
        self.shared
            .library
            .lock()
            .remove(id, self.shared.playback.as_ref())
    }

    pub fn recordings(&self) -> Vec<RecordingArtifact> {
        self.shared.library.lock().list().to_vec()
    }

    pub fn last_recording(&self) -> Option<RecordingArtifact> {
        self.shared.library.lock().last().cloned()
    }

    pub fn get(&self, id: RecordingId) -> Option<RecordingArtifact> {
        self.shared.library.lock().get(id).cloned()
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        self.stop();
        self.wait_for_pending();
    }
}

impl Capture {
    /// The stop path shared by explicit stops and the time limit.
    ///
    /// The job slot stays locked until the completion thread is tracked, so
    /// an `Idle` state always has its outcome pending or applied.
    fn finish_capture(self: &Arc<Self>) {
        let mut slot = self.job.lock();
        let Some(job) = slot.take() else {
            return;
        };

        // Tracks go first so the device is free before encoding starts.
        self.microphone.lock().release();
        let outcome = job.finish();
        log::info!("Recording stopped, encoding");

        let shared = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("recording-completion".into())
            .spawn(move || shared.handle_outcome(outcome));
        match spawned {
            Ok(handle) => self.track(handle),
            Err(e) => self.report(VoiceAudioError::EncoderFailure(format!(
                "failed to spawn completion thread: {}",
                e
            ))),
        }
    }

    fn track(&self, handle: thread::JoinHandle<()>) {
        let mut completions = self.completions.lock();
        completions.retain(|pending| !pending.is_finished());
        completions.push(handle);
    }

    fn wait_for_pending(&self) {
        // A time-limit stop can queue a completion while earlier ones join.
        loop {
            let handles: Vec<_> = self.completions.lock().drain(..).collect();
            if handles.is_empty() {
                return;
            }
            for handle in handles {
                if handle.join().is_err() {
                    log::error!("Recording completion thread panicked");
                }
            }
        }
    }

    /// Apply the encoder's single terminal outcome. Failures never touch the
    /// library.
    fn handle_outcome(&self, outcome: Receiver<EncoderOutcome>) {
        let result = outcome.recv().unwrap_or_else(|_| {
            Err(VoiceAudioError::EncoderFailure(
                "encoder dropped without a result".into(),
            ))
        });

        match result {
            Ok(encoded) => {
                let artifact = self.library.lock().add(encoded, self.playback.as_ref());
                let delegate = self.delegate.lock().clone();
                if let Some(delegate) = delegate {
                    delegate.on_recording_ready(&artifact.info());
                }
            }
            Err(e) => {
                let error = match e {
                    VoiceAudioError::EncoderFailure(_) => e,
                    other => VoiceAudioError::EncoderFailure(other.to_string()),
                };
                self.report(error);
            }
        }
    }

    fn report(&self, error: VoiceAudioError) {
        log::error!("Recording failed: {}", error);
        let delegate = self.delegate.lock().clone();
        if let Some(delegate) = delegate {
            delegate.on_error(&error);
        }
    }
}

/// Runs on the encoder's capture thread, which `finish` joins, so the stop
/// happens on a thread of its own.
fn stop_at_time_limit(capture: Weak<Capture>) {
    let Some(shared) = capture.upgrade() else {
        return;
    };
    let stopper = Arc::clone(&shared);
    let spawned = thread::Builder::new()
        .name("recording-time-limit".into())
        .spawn(move || stopper.finish_capture());
    match spawned {
        Ok(handle) => shared.track(handle),
        Err(e) => shared.report(VoiceAudioError::EncoderFailure(format!(
            "failed to spawn time-limit thread: {}",
            e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::state::ContextState;
    use crate::storage::playback::InMemoryPlaybackStore;
    use crate::storage::wav_encoder::WavEncoderService;
    use crate::testing::{DelegateEvent, MockContextFactory, MockEncoder, MockMicrophone, RecordingDelegate};
    use std::time::{Duration, Instant};

    struct Fixture {
        mic: Arc<MockMicrophone>,
        encoder: Arc<MockEncoder>,
        store: Arc<InMemoryPlaybackStore>,
        delegate: Arc<RecordingDelegate>,
        device: DeviceContext,
        session: RecordingSession,
    }

    fn fixture() -> Fixture {
        let mic = Arc::new(MockMicrophone::new(8_000));
        let encoder = Arc::new(MockEncoder::new());
        let store = Arc::new(InMemoryPlaybackStore::new());
        let delegate = Arc::new(RecordingDelegate::default());
        let mut session = RecordingSession::new(
            mic.clone(),
            CaptureConstraints::default(),
            EncoderConfig::default(),
            encoder.clone(),
            store.clone(),
        );
        session.set_delegate(delegate.clone());
        let device = DeviceContext::new(Arc::new(MockContextFactory::new(ContextState::Running)));
        Fixture {
            mic,
            encoder,
            store,
            delegate,
            device,
            session,
        }
    }

    #[test]
    fn start_uses_permissive_constraints_and_encoder_config() {
        let mut f = fixture();
        f.session.start(&mut f.device).unwrap();

        assert_eq!(f.session.state(), RecordingState::Capturing);
        assert_eq!(f.mic.last_constraints(), Some(CaptureConstraints::default()));
        assert_eq!(f.encoder.last_config(), Some(EncoderConfig::default()));
        assert_eq!(f.session.live_track_count(), 1);
    }

    #[test]
    fn second_start_is_rejected() {
        let mut f = fixture();
        f.session.start(&mut f.device).unwrap();
        assert_eq!(
            f.session.start(&mut f.device).unwrap_err(),
            VoiceAudioError::RecordingInProgress
        );
        assert_eq!(f.encoder.started(), 1);
        assert_eq!(f.mic.live_tracks(), 1);
    }

    #[test]
    fn stop_releases_tracks_and_adds_artifact() {
        let mut f = fixture();
        f.session.start(&mut f.device).unwrap();
        f.mic.last_feed().unwrap().push(&[0.1; 80]);

        f.session.stop();
        assert_eq!(f.session.state(), RecordingState::Idle);
        assert_eq!(f.mic.live_tracks(), 0);

        f.session.wait_for_pending();
        let recordings = f.session.recordings();
        assert_eq!(recordings.len(), 1);
        let last = f.session.last_recording().unwrap();
        assert_eq!(last.id, recordings[0].id);
        assert_eq!(last.mime_type(), "audio/wav");
        assert!((last.duration_secs - 0.01).abs() < 1e-9);
        assert!(f.store.resolve(&last.playable).is_some());
        assert!(matches!(
            f.delegate.events().last(),
            Some(DelegateEvent::RecordingReady(info)) if info.id == last.id
        ));
    }

    #[test]
    fn stop_when_idle_is_noop() {
        let mut f = fixture();
        f.session.stop();
        f.session.wait_for_pending();
        assert!(f.session.recordings().is_empty());
        assert!(f.delegate.events().is_empty());
    }

    #[test]
    fn encoder_failure_leaves_collection_untouched() {
        let mut f = fixture();
        f.session.start(&mut f.device).unwrap();
        f.session.stop();
        f.session.wait_for_pending();
        assert_eq!(f.session.recordings().len(), 1);

        f.encoder.set_failure(Some(VoiceAudioError::EncoderFailure("disk full".into())));
        f.session.start(&mut f.device).unwrap();
        f.session.stop();
        f.session.wait_for_pending();

        assert_eq!(f.session.recordings().len(), 1);
        assert_eq!(
            f.delegate.errors(),
            vec![VoiceAudioError::EncoderFailure("disk full".into())]
        );
        assert!(f.session.last_recording().is_some());
    }

    #[test]
    fn denied_microphone_fails_start() {
        let mut f = fixture();
        f.mic.set_failure(Some(VoiceAudioError::PermissionDenied));

        let err = f.session.start(&mut f.device).unwrap_err();
        assert_eq!(err, VoiceAudioError::PermissionDenied);
        assert_eq!(f.session.state(), RecordingState::Idle);
        assert_eq!(f.encoder.started(), 0);
    }

    #[test]
    fn delete_revokes_and_clears_marker() {
        let mut f = fixture();
        f.session.start(&mut f.device).unwrap();
        f.session.stop();
        f.session.wait_for_pending();
        let last = f.session.last_recording().unwrap();

        assert!(!f.session.delete(RecordingId(0)));
        assert!(f.session.delete(last.id));
        assert!(f.session.recordings().is_empty());
        assert!(f.session.last_recording().is_none());
        assert!(f.store.resolve(&last.playable).is_none());
        assert!(!f.session.delete(last.id));
    }

    #[test]
    fn time_limit_ends_capture_and_keeps_artifact() {
        let mic = Arc::new(MockMicrophone::new(100));
        let store = Arc::new(InMemoryPlaybackStore::new());
        let delegate = Arc::new(RecordingDelegate::default());
        let config = EncoderConfig {
            time_limit_secs: 1,
            ..Default::default()
        };
        let mut session = RecordingSession::new(
            mic.clone(),
            CaptureConstraints::default(),
            config,
            Arc::new(WavEncoderService::new(Duration::from_millis(5))),
            store.clone(),
        );
        session.set_delegate(delegate.clone());
        let mut device = DeviceContext::new(Arc::new(MockContextFactory::new(ContextState::Running)));

        session.start(&mut device).unwrap();
        mic.last_feed().unwrap().push(&[0.1; 300]);

        let deadline = Instant::now() + Duration::from_secs(2);
        while session.state() == RecordingState::Capturing && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(session.state(), RecordingState::Idle);
        assert_eq!(mic.live_tracks(), 0);
        assert_eq!(session.live_track_count(), 0);

        session.wait_for_pending();
        let recordings = session.recordings();
        assert_eq!(recordings.len(), 1);
        assert!((recordings[0].duration_secs - 1.0).abs() < 1e-9);
        assert!(store.resolve(&recordings[0].playable).is_some());
        assert!(matches!(
            delegate.events().last(),
            Some(DelegateEvent::RecordingReady(info)) if info.id == recordings[0].id
        ));

        // a late stop from the host finds nothing to do
        session.stop();
        session.wait_for_pending();
        assert_eq!(session.recordings().len(), 1);
        assert!(delegate.errors().is_empty());
    }
}
