//! # voice-audio-desktop
//!
//! cpal desktop backend for voice-audio-core.
//!
//! Provides:
//! - `CpalMicrophone`: microphone streams on a per-stream capture thread
//! - `CpalContextFactory`: output context mixing drone graphs into the default output
//! - `DeviceEnumerator`: input device enumeration
//! - `LogDelegate`: delegate forwarding engine events to `log`
//!
//! ## Usage
//! ```ignore
//! use voice_audio_core::{VoiceAudioConfig, VoiceAudioEngine};
//! use voice_audio_desktop::desktop_services;
//!
//! let config = VoiceAudioConfig::default();
//! let services = desktop_services(&config, None)?;
//! let mut engine = VoiceAudioEngine::new(config, services)?;
//! engine.startup()?;
//! ```

pub mod cpal_context;
pub mod cpal_mic;
pub mod device_enumerator;

use std::sync::Arc;

use voice_audio_core::models::config::VoiceAudioConfig;
use voice_audio_core::models::error::VoiceAudioError;
use voice_audio_core::models::recording::RecordingInfo;
use voice_audio_core::models::state::{LifecycleState, PermissionState};
use voice_audio_core::session::engine::PlatformServices;
use voice_audio_core::session::frame_scheduler::ThreadFrameScheduler;
use voice_audio_core::traits::audio_delegate::AudioDelegate;

pub use cpal_context::{CpalContext, CpalContextFactory};
pub use cpal_mic::CpalMicrophone;
pub use device_enumerator::DeviceEnumerator;

/// Platform services on the default cpal host, optionally pinned to a named
/// input device. Frames tick at `config.frame_interval`.
pub fn desktop_services(
    config: &VoiceAudioConfig,
    input_device: Option<&str>,
) -> Result<PlatformServices, VoiceAudioError> {
    let microphone = match input_device {
        Some(name) => CpalMicrophone::with_device(name),
        None => CpalMicrophone::default_device(),
    };
    let frames = ThreadFrameScheduler::start(config.frame_interval)?;
    Ok(PlatformServices::new(
        Arc::new(microphone),
        Arc::new(CpalContextFactory::new()),
        Arc::new(frames),
    ))
}

/// AudioDelegate that forwards engine events to the log.
#[derive(Debug, Default)]
pub struct LogDelegate;

impl AudioDelegate for LogDelegate {
    fn on_state_changed(&self, state: &LifecycleState) {
        log::info!("State: {:?}", state);
    }

    fn on_permission_changed(&self, permission: PermissionState) {
        match permission {
            PermissionState::Denied => log::warn!("Microphone access denied"),
            other => log::info!("Microphone permission: {:?}", other),
        }
    }

    fn on_error(&self, error: &VoiceAudioError) {
        log::error!("{}", error);
    }

    fn on_recording_ready(&self, recording: &RecordingInfo) {
        log::info!(
            "Recording {} ready ({}, {})",
            recording.id,
            recording.mime_type,
            recording.playable_reference
        );
    }
}
