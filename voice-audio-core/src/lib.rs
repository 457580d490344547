//! # voice-audio-core
//!
//! Platform-agnostic audio core for a voice practice app.
//!
//! Provides microphone lifecycle coordination, real-time pitch monitoring,
//! a reference-tone drone, and voice recording to WAV. Platform backends
//! (cpal on desktop, mocks in tests) implement the `MicrophoneProvider` and
//! `ContextFactory` traits and plug into the `VoiceAudioEngine`.
//!
//! ## Architecture
//!
//! ```text
//! voice-audio-core (this crate)
//! ├── traits/       ← MicrophoneProvider, AudioContextBackend, FrameScheduler, EncoderService, AudioDelegate
//! ├── models/       ← VoiceAudioError, LifecycleState, VoiceAudioConfig, DroneParameters, RecordingArtifact
//! ├── processing/   ← SpectrumTap, PitchDetector, oscillator/biquad/compressor drone graph, RingBuffer, WAV
//! ├── session/      ← VoiceAudioEngine, LifecycleCoordinator, PitchMonitor, DroneEngine, RecordingSession
//! └── storage/      ← WavEncoderService, RecordingLibrary, playback references, downloads
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

#[cfg(test)]
mod testing;

// Re-export key types at crate root for convenience.
pub use models::config::{CaptureConstraints, EncoderConfig, EncodingFormat, VoiceAudioConfig};
pub use models::drone::{DroneParameters, Note, NoteDirection, Waveform};
pub use models::error::VoiceAudioError;
pub use models::media::{CaptureInput, DeviceInfo, DeviceTransport, MediaStream, SampleFeed};
pub use models::recording::{EncodedAudio, PlayableReference, RecordingArtifact, RecordingId, RecordingInfo};
pub use models::state::{ContextState, LifecycleState, PermissionState, RecordingState};
pub use processing::drone_graph::{DroneGraph, SharedDroneGraph};
pub use processing::pitch::{PitchDetector, PitchSample};
pub use processing::ring_buffer::RingBuffer;
pub use session::engine::{PlatformServices, VoiceAudioEngine, VoiceAudioSnapshot};
pub use session::frame_scheduler::{ManualFrameScheduler, ThreadFrameScheduler};
pub use storage::playback::InMemoryPlaybackStore;
pub use storage::wav_encoder::WavEncoderService;
pub use traits::audio_context::{AudioContextBackend, ContextFactory, OutputConnection};
pub use traits::audio_delegate::AudioDelegate;
pub use traits::frame_scheduler::{FrameCallback, FrameHandle, FrameScheduler};
pub use traits::hardware_track::HardwareTrack;
pub use traits::microphone_provider::MicrophoneProvider;
