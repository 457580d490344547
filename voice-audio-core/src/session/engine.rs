use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::models::config::VoiceAudioConfig;
use crate::models::drone::{DroneParameters, Note, NoteDirection, Waveform};
use crate::models::error::VoiceAudioError;
use crate::models::recording::{RecordingArtifact, RecordingId, RecordingInfo};
use crate::models::state::{ContextState, LifecycleState, PermissionState, RecordingState};
use crate::processing::pitch::PitchSample;
use crate::session::coordinator::LifecycleCoordinator;
use crate::session::device_context::DeviceContext;
use crate::session::drone_engine::DroneEngine;
use crate::session::microphone::MicrophoneSession;
use crate::session::pitch_monitor::PitchMonitor;
use crate::session::recording::RecordingSession;
use crate::storage::download;
use crate::storage::playback::InMemoryPlaybackStore;
use crate::storage::wav_encoder::WavEncoderService;
use crate::traits::audio_context::ContextFactory;
use crate::traits::audio_delegate::AudioDelegate;
use crate::traits::encoder::EncoderService;
use crate::traits::frame_scheduler::FrameScheduler;
use crate::traits::microphone_provider::MicrophoneProvider;
use crate::traits::playback_store::PlaybackStore;

/// Platform collaborators the engine is built on.
#[derive(Clone)]
pub struct PlatformServices {
    pub microphone: Arc<dyn MicrophoneProvider>,
    pub contexts: Arc<dyn ContextFactory>,
    pub frames: Arc<dyn FrameScheduler>,
    pub encoder: Arc<dyn EncoderService>,
    pub playback: Arc<dyn PlaybackStore>,
}

impl PlatformServices {
    /// Services with the built-in WAV encoder and in-memory playback store.
    pub fn new(
        microphone: Arc<dyn MicrophoneProvider>,
        contexts: Arc<dyn ContextFactory>,
        frames: Arc<dyn FrameScheduler>,
    ) -> Self {
        Self {
            microphone,
            contexts,
            frames,
            encoder: Arc::new(WavEncoderService::default()),
            playback: Arc::new(InMemoryPlaybackStore::new()),
        }
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn EncoderService>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_playback(mut self, playback: Arc<dyn PlaybackStore>) -> Self {
        self.playback = playback;
        self
    }
}

/// Read-only state surface for a UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceAudioSnapshot {
    pub is_drone_playing: bool,
    pub selected_note: Note,
    pub current_pitch: Option<u32>,
    pub mic_permission: PermissionState,
    pub audio_initialized: bool,
    pub mic_active: bool,
    pub is_recording: bool,
    pub recordings: Vec<RecordingInfo>,
    pub last_recording: Option<RecordingInfo>,
    pub volume_pct: u16,
    pub waveform: Waveform,
    pub soften_highs: bool,
    pub phone_boost: bool,
    pub context_state: Option<ContextState>,
    pub lifecycle: LifecycleState,
}

/// Voice practice audio engine: pitch monitoring, a reference drone and
/// voice recording over one shared audio context.
///
/// All operations run on the owner's thread; background work (pitch ticks,
/// encoding, device I/O) happens on named threads.
pub struct VoiceAudioEngine {
    config: VoiceAudioConfig,
    device: DeviceContext,
    coordinator: LifecycleCoordinator,
    drone: DroneEngine,
    params: DroneParameters,
    shut_down: bool,
}

impl VoiceAudioEngine {
    pub fn new(config: VoiceAudioConfig, services: PlatformServices) -> Result<Self, VoiceAudioError> {
        config.validate().map_err(VoiceAudioError::ConfigurationFailed)?;

        let microphone = MicrophoneSession::new("monitoring", Arc::clone(&services.microphone));
        let monitor = PitchMonitor::new(
            Arc::clone(&services.frames),
            LifecycleCoordinator::detector_for(&config),
        );
        let recording = RecordingSession::new(
            Arc::clone(&services.microphone),
            config.recording_constraints,
            config.encoder.clone(),
            Arc::clone(&services.encoder),
            Arc::clone(&services.playback),
        );

        let params = DroneParameters {
            phone_boost: config.default_phone_boost,
            ..DroneParameters::default()
        };

        Ok(Self {
            device: DeviceContext::new(Arc::clone(&services.contexts)),
            coordinator: LifecycleCoordinator::new(config.clone(), microphone, monitor, recording),
            drone: DroneEngine::new(config.base_gain),
            params,
            config,
            shut_down: false,
        })
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn AudioDelegate>) {
        self.coordinator.set_delegate(delegate);
    }

    pub fn config(&self) -> &VoiceAudioConfig {
        &self.config
    }

    // --- Microphone ---

    /// Start pitch monitoring.
    pub fn startup(&mut self) -> Result<(), VoiceAudioError> {
        self.shut_down = false;
        self.coordinator.startup(&mut self.device)
    }

    /// Initialize on first use, then make sure the context runs. Hosts call
    /// this from a user gesture.
    pub fn activate_microphone(&mut self) -> Result<(), VoiceAudioError> {
        if !self.coordinator.is_initialized() {
            self.startup()?;
        }
        self.device.ensure_running().map(|_| ())
    }

    /// Resume the context if the platform suspended it.
    pub fn resume_context(&mut self) -> Result<(), VoiceAudioError> {
        match self.device.state() {
            Some(ContextState::Suspended) => self.device.ensure_running().map(|_| ()),
            _ => Ok(()),
        }
    }

    /// A recording is about to play back: release monitoring so output is
    /// routed to the loudspeaker. Blocks for `settle_delay` while the
    /// hardware switches over.
    pub fn open_playback(&mut self) {
        self.coordinator.enter_playback();
    }

    pub fn close_playback(&mut self) -> Result<(), VoiceAudioError> {
        self.coordinator.leave_playback(&mut self.device)
    }

    // --- Drone ---

    pub fn start_drone(&mut self) -> Result<(), VoiceAudioError> {
        self.drone.start(&mut self.device, &self.params)
    }

    pub fn stop_drone(&mut self) {
        self.drone.stop();
    }

    /// Step the selected note, clamped to the available range. A playing
    /// drone is retuned in place.
    pub fn adjust_note(&mut self, direction: NoteDirection) -> Note {
        self.set_note(self.params.note.step(direction));
        self.params.note
    }

    pub fn set_note(&mut self, note: Note) {
        self.params.note = note;
        self.drone.retune(note);
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.params.waveform = waveform;
        self.drone.update_live(&self.params);
    }

    /// Clamped to 0–200 %.
    pub fn set_volume_pct(&mut self, volume_pct: u16) {
        self.params = self.params.with_volume_pct(volume_pct);
        self.drone.update_live(&self.params);
    }

    pub fn set_soften_highs(&mut self, soften_highs: bool) {
        self.params.soften_highs = soften_highs;
        self.drone.update_live(&self.params);
    }

    pub fn set_phone_boost(&mut self, phone_boost: bool) {
        self.params.phone_boost = phone_boost;
        self.drone.update_live(&self.params);
    }

    pub fn parameters(&self) -> DroneParameters {
        self.params
    }

    pub fn is_drone_playing(&self) -> bool {
        self.drone.is_playing()
    }

    // --- Recording ---

    pub fn start_recording(&mut self) -> Result<(), VoiceAudioError> {
        self.coordinator.start_recording(&mut self.device)
    }

    pub fn stop_recording(&mut self) {
        self.coordinator.stop_recording();
    }

    /// Block until stopped recordings finished encoding.
    pub fn wait_for_recordings(&mut self) {
        self.coordinator.recording_mut().wait_for_pending();
    }

    pub fn delete_recording(&mut self, id: RecordingId) -> bool {
        self.coordinator.recording().delete(id)
    }

    pub fn recordings(&self) -> Vec<RecordingArtifact> {
        self.coordinator.recording().recordings()
    }

    pub fn last_recording(&self) -> Option<RecordingArtifact> {
        self.coordinator.recording().last_recording()
    }

    pub fn download_filename(&self, artifact: &RecordingArtifact) -> String {
        artifact.download_filename()
    }

    /// Write `artifact` and its metadata sidecar into `dir`.
    pub fn save_download(&self, artifact: &RecordingArtifact, dir: &Path) -> Result<PathBuf, VoiceAudioError> {
        download::save_download(artifact, dir)
    }

    // --- State ---

    pub fn state(&self) -> LifecycleState {
        self.coordinator.state()
    }

    pub fn permission(&self) -> PermissionState {
        self.coordinator.permission()
    }

    pub fn pitch(&self) -> PitchSample {
        self.coordinator.pitch()
    }

    pub fn is_recording(&self) -> bool {
        self.coordinator.recording().state() == RecordingState::Capturing
    }

    /// Live hardware tracks across monitoring and recording.
    pub fn live_track_count(&self) -> usize {
        self.coordinator.live_track_count()
    }

    pub fn snapshot(&self) -> VoiceAudioSnapshot {
        let recording = self.coordinator.recording();
        VoiceAudioSnapshot {
            is_drone_playing: self.drone.is_playing(),
            selected_note: self.params.note,
            current_pitch: self.coordinator.pitch().hz(),
            mic_permission: self.coordinator.permission(),
            audio_initialized: self.coordinator.is_initialized(),
            mic_active: self.coordinator.is_mic_active(),
            is_recording: self.is_recording(),
            recordings: recording.recordings().iter().map(RecordingArtifact::info).collect(),
            last_recording: recording.last_recording().map(|r| r.info()),
            volume_pct: self.params.volume_pct,
            waveform: self.params.waveform,
            soften_highs: self.params.soften_highs,
            phone_boost: self.params.phone_boost,
            context_state: self.device.state(),
            lifecycle: self.coordinator.state(),
        }
    }

    /// Stop the drone, the pitch loop, every held track and any recording.
    /// The audio context stays open for a later startup.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.drone.stop();
        self.coordinator.shutdown();
    }
}

impl Drop for VoiceAudioEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
