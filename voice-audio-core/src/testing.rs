//! Mock platform services for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::config::{CaptureConstraints, EncoderConfig, EncodingFormat};
use crate::models::error::VoiceAudioError;
use crate::models::media::{CaptureInput, DeviceInfo, DeviceTransport, MediaStream, SampleFeed};
use crate::models::recording::{EncodedAudio, RecordingInfo};
use crate::models::state::{ContextState, LifecycleState, PermissionState};
use crate::processing::drone_graph::SharedDroneGraph;
use crate::processing::wav_format;
use crate::traits::audio_context::{AudioContextBackend, ContextFactory, OutputConnection};
use crate::traits::audio_delegate::AudioDelegate;
use crate::traits::encoder::{EncoderJob, EncoderOutcome, EncoderService};
use crate::traits::hardware_track::HardwareTrack;
use crate::traits::microphone_provider::MicrophoneProvider;

struct TrackInner {
    label: String,
    live: AtomicBool,
    stop_calls: AtomicUsize,
}

/// Hardware track whose clones share state, so tests can observe a track
/// after handing it to a stream.
#[derive(Clone)]
pub struct MockTrack {
    inner: Arc<TrackInner>,
}

impl MockTrack {
    pub fn new(label: &str) -> Self {
        Self {
            inner: Arc::new(TrackInner {
                label: label.to_string(),
                live: AtomicBool::new(true),
                stop_calls: AtomicUsize::new(0),
            }),
        }
    }

    pub fn stop_calls(&self) -> usize {
        self.inner.stop_calls.load(Ordering::SeqCst)
    }
}

impl HardwareTrack for MockTrack {
    fn label(&self) -> String {
        self.inner.label.clone()
    }

    fn is_live(&self) -> bool {
        self.inner.live.load(Ordering::SeqCst)
    }

    fn stop(&self) -> Result<(), VoiceAudioError> {
        self.inner.stop_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.live.swap(false, Ordering::SeqCst) {
            Ok(())
        } else {
            Err(VoiceAudioError::TeardownRace(format!("track '{}' already stopped", self.inner.label)))
        }
    }
}

/// Microphone that hands out mock tracks and remembers every stream it opened.
pub struct MockMicrophone {
    sample_rate: u32,
    failure: Mutex<Option<VoiceAudioError>>,
    tracks: Mutex<Vec<MockTrack>>,
    feeds: Mutex<Vec<SampleFeed>>,
    constraints: Mutex<Vec<CaptureConstraints>>,
}

impl MockMicrophone {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            failure: Mutex::new(None),
            tracks: Mutex::new(Vec::new()),
            feeds: Mutex::new(Vec::new()),
            constraints: Mutex::new(Vec::new()),
        }
    }

    /// Every subsequent open fails with `error` until cleared with `None`.
    pub fn set_failure(&self, error: Option<VoiceAudioError>) {
        *self.failure.lock() = error;
    }

    pub fn opened(&self) -> usize {
        self.tracks.lock().len()
    }

    /// Live tracks across every stream this microphone ever opened.
    pub fn live_tracks(&self) -> usize {
        self.tracks.lock().iter().filter(|t| t.is_live()).count()
    }

    pub fn last_constraints(&self) -> Option<CaptureConstraints> {
        self.constraints.lock().last().copied()
    }

    pub fn last_feed(&self) -> Option<SampleFeed> {
        self.feeds.lock().last().cloned()
    }
}

impl MicrophoneProvider for MockMicrophone {
    fn is_available(&self) -> bool {
        true
    }

    fn open_stream(&self, constraints: &CaptureConstraints) -> Result<MediaStream, VoiceAudioError> {
        self.constraints.lock().push(*constraints);
        if let Some(error) = self.failure.lock().clone() {
            return Err(error);
        }
        let track = MockTrack::new("Mock Microphone");
        let feed = SampleFeed::new(self.sample_rate);
        self.tracks.lock().push(track.clone());
        self.feeds.lock().push(feed.clone());
        Ok(MediaStream::new(vec![Box::new(track)], feed))
    }

    fn device_info(&self) -> Option<DeviceInfo> {
        Some(DeviceInfo {
            id: "mock".into(),
            name: "Mock Microphone".into(),
            is_default: true,
            transport: DeviceTransport::Virtual,
        })
    }
}

pub struct MockConnection {
    connected: Arc<AtomicBool>,
}

impl OutputConnection for MockConnection {
    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

/// Context with a manually advanced clock and a record of connected graphs.
pub struct MockContext {
    sample_rate: u32,
    state: Mutex<ContextState>,
    time: Mutex<f64>,
    resumes: AtomicUsize,
    outputs: Mutex<Vec<(SharedDroneGraph, Arc<AtomicBool>)>>,
}

impl MockContext {
    pub fn new(sample_rate: u32, state: ContextState) -> Self {
        Self {
            sample_rate,
            state: Mutex::new(state),
            time: Mutex::new(0.0),
            resumes: AtomicUsize::new(0),
            outputs: Mutex::new(Vec::new()),
        }
    }

    pub fn suspend(&self) {
        *self.state.lock() = ContextState::Suspended;
    }

    pub fn advance(&self, secs: f64) {
        *self.time.lock() += secs;
    }

    pub fn resume_count(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }

    pub fn connected_count(&self) -> usize {
        self.outputs
            .lock()
            .iter()
            .filter(|(_, connected)| connected.load(Ordering::SeqCst))
            .count()
    }

    pub fn connections_made(&self) -> usize {
        self.outputs.lock().len()
    }
}

impl AudioContextBackend for MockContext {
    fn state(&self) -> ContextState {
        *self.state.lock()
    }

    fn resume(&self) -> Result<(), VoiceAudioError> {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        *self.state.lock() = ContextState::Running;
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        *self.time.lock()
    }

    fn connect_output(&self, graph: SharedDroneGraph) -> Result<Box<dyn OutputConnection>, VoiceAudioError> {
        let connected = Arc::new(AtomicBool::new(true));
        self.outputs.lock().push((graph, Arc::clone(&connected)));
        Ok(Box::new(MockConnection { connected }))
    }
}

/// Factory creating one shared [`MockContext`] per call.
pub struct MockContextFactory {
    initial_state: ContextState,
    created: Mutex<Vec<Arc<MockContext>>>,
}

impl MockContextFactory {
    pub fn new(initial_state: ContextState) -> Self {
        Self {
            initial_state,
            created: Mutex::new(Vec::new()),
        }
    }

    pub fn created(&self) -> usize {
        self.created.lock().len()
    }

    pub fn last(&self) -> Option<Arc<MockContext>> {
        self.created.lock().last().cloned()
    }
}

impl ContextFactory for MockContextFactory {
    fn create_context(&self) -> Result<Arc<dyn AudioContextBackend>, VoiceAudioError> {
        let context = Arc::new(MockContext::new(48_000, self.initial_state));
        self.created.lock().push(Arc::clone(&context));
        Ok(context)
    }
}

/// Encoder that resolves immediately on finish, either with the pulled
/// samples encoded as WAV or with a configured failure.
pub struct MockEncoder {
    failure: Mutex<Option<VoiceAudioError>>,
    started: AtomicUsize,
    configs: Mutex<Vec<EncoderConfig>>,
}

impl MockEncoder {
    pub fn new() -> Self {
        Self {
            failure: Mutex::new(None),
            started: AtomicUsize::new(0),
            configs: Mutex::new(Vec::new()),
        }
    }

    pub fn set_failure(&self, error: Option<VoiceAudioError>) {
        *self.failure.lock() = error;
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub fn last_config(&self) -> Option<EncoderConfig> {
        self.configs.lock().last().cloned()
    }
}

impl EncoderService for MockEncoder {
    fn start(&self, input: CaptureInput, config: &EncoderConfig) -> Result<Box<dyn EncoderJob>, VoiceAudioError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.configs.lock().push(config.clone());
        Ok(Box::new(MockJob {
            input,
            channels: config.channels,
            failure: self.failure.lock().clone(),
        }))
    }
}

struct MockJob {
    input: CaptureInput,
    channels: u16,
    failure: Option<VoiceAudioError>,
}

impl EncoderJob for MockJob {
    fn finish(self: Box<Self>) -> Receiver<EncoderOutcome> {
        let (tx, rx) = mpsc::channel();
        let outcome = match self.failure {
            Some(error) => Err(error),
            None => {
                let samples = self.input.pull();
                let sample_rate = self.input.sample_rate();
                Ok(EncodedAudio {
                    bytes: wav_format::encode_wav(&samples, sample_rate, self.channels),
                    format: EncodingFormat::Wav,
                    duration_secs: wav_format::duration_secs(samples.len(), sample_rate),
                })
            }
        };
        let _ = tx.send(outcome);
        rx
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DelegateEvent {
    State(LifecycleState),
    Permission(PermissionState),
    Error(VoiceAudioError),
    RecordingReady(RecordingInfo),
}

/// Delegate that records every notification.
#[derive(Default)]
pub struct RecordingDelegate {
    events: Mutex<Vec<DelegateEvent>>,
}

impl RecordingDelegate {
    pub fn events(&self) -> Vec<DelegateEvent> {
        self.events.lock().clone()
    }

    pub fn errors(&self) -> Vec<VoiceAudioError> {
        self.events
            .lock()
            .iter()
            .filter_map(|event| match event {
                DelegateEvent::Error(error) => Some(error.clone()),
                _ => None,
            })
            .collect()
    }
}

impl AudioDelegate for RecordingDelegate {
    fn on_state_changed(&self, state: &LifecycleState) {
        self.events.lock().push(DelegateEvent::State(*state));
    }

    fn on_permission_changed(&self, permission: PermissionState) {
        self.events.lock().push(DelegateEvent::Permission(permission));
    }

    fn on_error(&self, error: &VoiceAudioError) {
        self.events.lock().push(DelegateEvent::Error(error.clone()));
    }

    fn on_recording_ready(&self, recording: &RecordingInfo) {
        self.events.lock().push(DelegateEvent::RecordingReady(recording.clone()));
    }
}
