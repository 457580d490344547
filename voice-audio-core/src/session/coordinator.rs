use std::sync::Arc;
use std::thread;

use crate::models::config::VoiceAudioConfig;
use crate::models::error::VoiceAudioError;
use crate::models::state::{LifecycleState, PermissionState, RecordingState};
use crate::processing::pitch::{PitchDetector, PitchSample};
use crate::session::device_context::DeviceContext;
use crate::session::microphone::MicrophoneSession;
use crate::session::pitch_monitor::{PitchMonitor, TapToken};
use crate::session::recording::RecordingSession;
use crate::traits::audio_delegate::AudioDelegate;

/// Sequences the monitoring microphone around recordings and playback
/// windows.
///
/// The only caller of acquire/release on the monitoring stream. Side effects
/// run first; the pure [`LifecycleState`] transition is applied after.
pub struct LifecycleCoordinator {
    config: VoiceAudioConfig,
    microphone: MicrophoneSession,
    monitor: PitchMonitor,
    token: Option<TapToken>,
    recording: RecordingSession,
    state: LifecycleState,
    delegate: Option<Arc<dyn AudioDelegate>>,
    initialized: bool,
}

impl LifecycleCoordinator {
    pub fn new(
        config: VoiceAudioConfig,
        microphone: MicrophoneSession,
        monitor: PitchMonitor,
        recording: RecordingSession,
    ) -> Self {
        Self {
            config,
            microphone,
            monitor,
            token: None,
            recording,
            state: LifecycleState::Inactive,
            delegate: None,
            initialized: false,
        }
    }

    /// Pitch detector configured from `config`.
    pub fn detector_for(config: &VoiceAudioConfig) -> PitchDetector {
        PitchDetector::new(config.noise_floor, config.voice_band_hz.clone())
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn AudioDelegate>) {
        self.recording.set_delegate(Arc::clone(&delegate));
        self.delegate = Some(delegate);
    }

    /// Current lifecycle state. A recording that ended at its time limit is
    /// already reflected here, before the next mutating call records it.
    pub fn state(&self) -> LifecycleState {
        if self.recording_ended() {
            self.state.on_recording_stopped()
        } else {
            self.state
        }
    }

    pub fn permission(&self) -> PermissionState {
        self.microphone.permission()
    }

    pub fn pitch(&self) -> PitchSample {
        self.monitor.latest()
    }

    pub fn is_mic_active(&self) -> bool {
        self.microphone.is_active()
    }

    pub fn is_monitor_running(&self) -> bool {
        self.monitor.is_running()
    }

    /// Whether startup ever ran.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Live hardware tracks held by monitoring and recording together.
    pub fn live_track_count(&self) -> usize {
        self.microphone.live_track_count() + self.recording.live_track_count()
    }

    pub fn recording(&self) -> &RecordingSession {
        &self.recording
    }

    pub fn recording_mut(&mut self) -> &mut RecordingSession {
        &mut self.recording
    }

    /// Bring up monitoring: running context, raw stream, analysis tap, pitch
    /// loop. A no-op while monitoring is live. While suspended for playback
    /// the start is deferred until playback closes.
    pub fn startup(&mut self, device: &mut DeviceContext) -> Result<(), VoiceAudioError> {
        self.sync_recording();
        self.initialized = true;
        if self.microphone.is_active() && self.monitor.is_running() {
            log::debug!("Monitoring already live");
            return Ok(());
        }
        if let LifecycleState::SuspendedForPlayback { recording, .. } = self.state {
            log::debug!("Monitoring deferred until playback closes");
            self.set_state(LifecycleState::SuspendedForPlayback {
                resume_monitoring: true,
                recording,
            });
            return Ok(());
        }

        device.ensure_running()?;

        let previous = self.microphone.permission();
        let acquired = self.microphone.acquire(&self.config.monitoring_constraints);
        self.notify_permission(previous);
        if let Err(e) = acquired {
            self.notify_error(&e);
            self.teardown_monitoring();
            self.set_state(self.state.on_monitoring_lost());
            return Err(e);
        }

        if let Err(e) = self.start_monitor(device) {
            log::error!("Pitch monitor failed to start: {}", e);
            self.teardown_monitoring();
            self.set_state(self.state.on_monitoring_lost());
            return Err(e);
        }

        self.set_state(self.state.on_monitoring_started());
        log::info!("Monitoring started");
        Ok(())
    }

    fn start_monitor(&mut self, device: &mut DeviceContext) -> Result<(), VoiceAudioError> {
        let stream = self
            .microphone
            .stream()
            .ok_or(VoiceAudioError::DeviceUnavailable)?;
        let tap = device.create_analysis_tap(
            stream,
            self.config.fft_size,
            self.config.analysis_smoothing,
        )?;
        let token = TapToken::new();
        self.monitor.start(tap, token.clone())?;
        self.token = Some(token);
        Ok(())
    }

    /// Invalidate the tap, stop the loop, release the stream.
    fn teardown_monitoring(&mut self) {
        if let Some(token) = self.token.take() {
            token.invalidate();
        }
        self.monitor.stop();
        self.microphone.release();
    }

    /// Fully release monitoring so the device can route output to the
    /// loudspeaker, then wait for the hardware to settle.
    ///
    /// Blocks the calling thread for `settle_delay` before returning.
    pub fn enter_playback(&mut self) {
        self.sync_recording();
        if self.state.is_suspended() {
            return;
        }
        let next = self.state.on_playback_opened();
        self.teardown_monitoring();
        log::info!("Monitoring suspended for playback");
        if !self.config.settle_delay.is_zero() {
            thread::sleep(self.config.settle_delay);
        }
        self.set_state(next);
    }

    /// Restore monitoring iff it was live when playback opened and no stream
    /// is held now.
    pub fn leave_playback(&mut self, device: &mut DeviceContext) -> Result<(), VoiceAudioError> {
        self.sync_recording();
        if !self.state.is_suspended() {
            return Ok(());
        }
        let resume = self.state.should_resume_monitoring();
        self.set_state(self.state.on_playback_closed());

        if resume && !self.microphone.is_active() {
            log::info!("Restoring monitoring after playback");
            return self.startup(device);
        }
        Ok(())
    }

    /// Start a recording on its own stream. Failure leaves the state as it
    /// was.
    pub fn start_recording(&mut self, device: &mut DeviceContext) -> Result<(), VoiceAudioError> {
        self.sync_recording();
        if let Err(e) = self.recording.start(device) {
            self.notify_error(&e);
            return Err(e);
        }
        self.set_state(self.state.on_recording_started());
        Ok(())
    }

    pub fn stop_recording(&mut self) {
        self.sync_recording();
        if self.recording.state() == RecordingState::Idle {
            return;
        }
        self.recording.stop();
        self.set_state(self.state.on_recording_stopped());
    }

    /// Cancel the pitch loop, stop every held track and any recording. The
    /// audio context stays open.
    pub fn shutdown(&mut self) {
        self.teardown_monitoring();
        self.recording.stop();
        self.set_state(LifecycleState::Inactive);
        log::info!("Voice audio shut down");
    }

    /// The recording stopped itself while the lifecycle still counts it.
    fn recording_ended(&self) -> bool {
        self.state.is_recording() && self.recording.state() == RecordingState::Idle
    }

    /// Apply the stop transition for a recording that ended at its time
    /// limit.
    fn sync_recording(&mut self) {
        if self.recording_ended() {
            log::info!("Recording ended on its own");
            self.set_state(self.state.on_recording_stopped());
        }
    }

    fn set_state(&mut self, next: LifecycleState) {
        if next == self.state {
            return;
        }
        log::debug!("Lifecycle {:?} -> {:?}", self.state, next);
        self.state = next;
        if let Some(delegate) = &self.delegate {
            delegate.on_state_changed(&next);
        }
    }

    fn notify_permission(&self, previous: PermissionState) {
        let current = self.microphone.permission();
        if current == previous {
            return;
        }
        if let Some(delegate) = &self.delegate {
            delegate.on_permission_changed(current);
        }
    }

    fn notify_error(&self, error: &VoiceAudioError) {
        if let Some(delegate) = &self.delegate {
            delegate.on_error(error);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::models::state::ContextState;
    use crate::session::frame_scheduler::ManualFrameScheduler;
    use crate::storage::playback::InMemoryPlaybackStore;
    use crate::storage::wav_encoder::WavEncoderService;
    use crate::traits::encoder::EncoderService;
    use crate::testing::{DelegateEvent, MockContextFactory, MockEncoder, MockMicrophone, RecordingDelegate};
    use crate::traits::frame_scheduler::FrameScheduler;

    struct Fixture {
        mic: Arc<MockMicrophone>,
        scheduler: Arc<ManualFrameScheduler>,
        delegate: Arc<RecordingDelegate>,
        device: DeviceContext,
        coordinator: LifecycleCoordinator,
    }

    fn fixture() -> Fixture {
        let config = VoiceAudioConfig {
            settle_delay: Duration::ZERO,
            ..Default::default()
        };
        fixture_with(config, 48_000, Arc::new(MockEncoder::new()))
    }

    fn fixture_with(config: VoiceAudioConfig, mic_rate: u32, encoder: Arc<dyn EncoderService>) -> Fixture {
        let mic = Arc::new(MockMicrophone::new(mic_rate));
        let scheduler = Arc::new(ManualFrameScheduler::new());
        let delegate = Arc::new(RecordingDelegate::default());

        let microphone = MicrophoneSession::new("monitoring", mic.clone());
        let frames: Arc<dyn FrameScheduler> = scheduler.clone();
        let monitor = PitchMonitor::new(frames, LifecycleCoordinator::detector_for(&config));
        let recording = RecordingSession::new(
            mic.clone(),
            config.recording_constraints,
            config.encoder.clone(),
            encoder,
            Arc::new(InMemoryPlaybackStore::new()),
        );
        let mut coordinator = LifecycleCoordinator::new(config, microphone, monitor, recording);
        coordinator.set_delegate(delegate.clone());

        Fixture {
            mic,
            scheduler,
            delegate,
            device: DeviceContext::new(Arc::new(MockContextFactory::new(ContextState::Suspended))),
            coordinator,
        }
    }

    #[test]
    fn startup_monitors_with_raw_constraints() {
        let mut f = fixture();
        f.coordinator.startup(&mut f.device).unwrap();

        assert_eq!(f.coordinator.state(), LifecycleState::Monitoring);
        assert_eq!(f.coordinator.permission(), PermissionState::Granted);
        assert!(f.coordinator.is_monitor_running());
        assert_eq!(f.mic.last_constraints().map(|c| c.echo_cancellation), Some(false));
        assert_eq!(f.device.state(), Some(ContextState::Running));
        assert_eq!(f.scheduler.pending_count(), 1);
        assert_eq!(
            f.delegate.events(),
            vec![
                DelegateEvent::Permission(PermissionState::Granted),
                DelegateEvent::State(LifecycleState::Monitoring),
            ]
        );
    }

    #[test]
    fn repeated_startup_is_noop() {
        let mut f = fixture();
        f.coordinator.startup(&mut f.device).unwrap();
        f.coordinator.startup(&mut f.device).unwrap();

        assert_eq!(f.mic.opened(), 1);
        assert_eq!(f.scheduler.pending_count(), 1);
    }

    #[test]
    fn denied_startup_degrades() {
        let mut f = fixture();
        f.mic.set_failure(Some(VoiceAudioError::PermissionDenied));

        let err = f.coordinator.startup(&mut f.device).unwrap_err();
        assert_eq!(err, VoiceAudioError::PermissionDenied);
        assert_eq!(f.coordinator.state(), LifecycleState::Inactive);
        assert_eq!(f.coordinator.permission(), PermissionState::Denied);
        assert_eq!(f.scheduler.pending_count(), 0);
        assert_eq!(f.coordinator.pitch(), PitchSample::NoPitch);
        assert_eq!(f.delegate.errors(), vec![VoiceAudioError::PermissionDenied]);
    }

    #[test]
    fn playback_releases_everything() {
        let mut f = fixture();
        f.coordinator.startup(&mut f.device).unwrap();

        f.coordinator.enter_playback();
        assert!(f.coordinator.state().is_suspended());
        assert_eq!(f.mic.live_tracks(), 0);
        assert_eq!(f.scheduler.pending_count(), 0);
        assert!(!f.coordinator.is_mic_active());

        // a frame fired after teardown must not tick
        f.scheduler.fire_frame();
        assert_eq!(f.coordinator.pitch(), PitchSample::NoPitch);
    }

    #[test]
    fn closing_playback_restores_monitoring() {
        let mut f = fixture();
        f.coordinator.startup(&mut f.device).unwrap();
        f.coordinator.enter_playback();
        f.coordinator.leave_playback(&mut f.device).unwrap();

        assert_eq!(f.coordinator.state(), LifecycleState::Monitoring);
        assert_eq!(f.mic.live_tracks(), 1);
        assert_eq!(f.mic.opened(), 2);
        assert_eq!(f.scheduler.pending_count(), 1);
    }

    #[test]
    fn closing_playback_without_prior_monitoring_stays_inactive() {
        let mut f = fixture();
        f.coordinator.enter_playback();
        f.coordinator.leave_playback(&mut f.device).unwrap();

        assert_eq!(f.coordinator.state(), LifecycleState::Inactive);
        assert_eq!(f.mic.opened(), 0);
    }

    #[test]
    fn startup_while_suspended_is_deferred() {
        let mut f = fixture();
        f.coordinator.enter_playback();
        f.coordinator.startup(&mut f.device).unwrap();
        assert_eq!(f.mic.opened(), 0);

        f.coordinator.leave_playback(&mut f.device).unwrap();
        assert_eq!(f.coordinator.state(), LifecycleState::Monitoring);
        assert_eq!(f.mic.opened(), 1);
    }

    #[test]
    fn recording_runs_on_its_own_stream() {
        let mut f = fixture();
        f.coordinator.startup(&mut f.device).unwrap();
        f.coordinator.start_recording(&mut f.device).unwrap();

        assert_eq!(f.coordinator.state(), LifecycleState::Recording { monitoring: true });
        assert_eq!(f.mic.live_tracks(), 2);
        assert_eq!(f.coordinator.live_track_count(), 2);

        f.coordinator.stop_recording();
        assert_eq!(f.coordinator.state(), LifecycleState::Monitoring);
        assert_eq!(f.mic.live_tracks(), 1);
    }

    #[test]
    fn recording_survives_playback_window() {
        let mut f = fixture();
        f.coordinator.startup(&mut f.device).unwrap();
        f.coordinator.start_recording(&mut f.device).unwrap();

        f.coordinator.enter_playback();
        assert_eq!(
            f.coordinator.recording().state(),
            RecordingState::Capturing
        );
        assert_eq!(f.mic.live_tracks(), 1);

        f.coordinator.leave_playback(&mut f.device).unwrap();
        assert_eq!(f.coordinator.state(), LifecycleState::Recording { monitoring: true });

        f.coordinator.stop_recording();
        f.coordinator.recording_mut().wait_for_pending();
        assert_eq!(f.coordinator.recording().recordings().len(), 1);
    }

    #[test]
    fn failed_recording_keeps_state() {
        let mut f = fixture();
        f.coordinator.startup(&mut f.device).unwrap();
        f.mic.set_failure(Some(VoiceAudioError::DeviceUnavailable));

        let err = f.coordinator.start_recording(&mut f.device).unwrap_err();
        assert_eq!(err, VoiceAudioError::DeviceUnavailable);
        assert_eq!(f.coordinator.state(), LifecycleState::Monitoring);
        assert_eq!(f.coordinator.permission(), PermissionState::Granted);
        assert!(f.coordinator.is_monitor_running());
    }

    #[test]
    fn shutdown_releases_all_tracks() {
        let mut f = fixture();
        f.coordinator.startup(&mut f.device).unwrap();
        f.coordinator.start_recording(&mut f.device).unwrap();

        f.coordinator.shutdown();
        assert_eq!(f.coordinator.state(), LifecycleState::Inactive);
        assert_eq!(f.mic.live_tracks(), 0);
        assert_eq!(f.scheduler.pending_count(), 0);
        assert_eq!(f.device.state(), Some(ContextState::Running));
    }

    #[test]
    fn recording_at_time_limit_returns_to_monitoring() {
        let mut config = VoiceAudioConfig {
            settle_delay: Duration::ZERO,
            ..Default::default()
        };
        config.encoder.time_limit_secs = 1;
        let mut f = fixture_with(config, 100, Arc::new(WavEncoderService::new(Duration::from_millis(5))));
        f.coordinator.startup(&mut f.device).unwrap();
        f.coordinator.start_recording(&mut f.device).unwrap();
        assert_eq!(f.mic.live_tracks(), 2);

        f.mic.last_feed().unwrap().push(&[0.1; 300]);
        let deadline = Instant::now() + Duration::from_secs(2);
        while f.coordinator.recording().state() != RecordingState::Idle && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(f.coordinator.state(), LifecycleState::Monitoring);
        assert_eq!(f.coordinator.live_track_count(), 1);
        assert_eq!(f.mic.live_tracks(), 1);

        // the next call records the transition and the host's stop is a no-op
        f.coordinator.stop_recording();
        let back_to_monitoring = f
            .delegate
            .events()
            .iter()
            .filter(|e| matches!(e, DelegateEvent::State(LifecycleState::Monitoring)))
            .count();
        assert_eq!(back_to_monitoring, 2);
        f.coordinator.recording_mut().wait_for_pending();
        let recordings = f.coordinator.recording().recordings();
        assert_eq!(recordings.len(), 1);
        assert!((recordings[0].duration_secs - 1.0).abs() < 1e-9);

        f.coordinator.start_recording(&mut f.device).unwrap();
        assert_eq!(f.coordinator.state(), LifecycleState::Recording { monitoring: true });
        f.coordinator.stop_recording();
    }
}
