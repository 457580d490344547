//! cpal microphone provider.
//!
//! Each opened stream runs on its own capture thread. cpal streams are not
//! `Send` on every host, so the thread builds the stream, owns it and drops
//! it when the track is stopped. Samples are converted to `f32`, downmixed
//! to mono and pushed into the stream's [`SampleFeed`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use parking_lot::Mutex;

use voice_audio_core::models::config::CaptureConstraints;
use voice_audio_core::models::error::VoiceAudioError;
use voice_audio_core::models::media::{DeviceInfo, MediaStream, SampleFeed};
use voice_audio_core::traits::hardware_track::HardwareTrack;
use voice_audio_core::traits::microphone_provider::MicrophoneProvider;

use crate::device_enumerator::{device_info, DeviceEnumerator};

const PARK_INTERVAL: Duration = Duration::from_millis(100);

type StartupResult = Result<(SampleFeed, String), VoiceAudioError>;

/// Microphone capture through the default cpal host.
pub struct CpalMicrophone {
    device_name: Option<String>,
}

impl CpalMicrophone {
    /// Capture from the host's default input device.
    pub fn default_device() -> Self {
        Self { device_name: None }
    }

    /// Capture from the input device with this display name.
    pub fn with_device(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
        }
    }
}

impl MicrophoneProvider for CpalMicrophone {
    fn is_available(&self) -> bool {
        DeviceEnumerator::new()
            .find_input_device(self.device_name.as_deref())
            .is_ok()
    }

    fn open_stream(&self, constraints: &CaptureConstraints) -> Result<MediaStream, VoiceAudioError> {
        // cpal delivers the device's signal as-is; processing toggles are
        // left to the OS input settings.
        log::debug!("Opening cpal input stream (requested {:?})", constraints);

        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = mpsc::sync_channel::<StartupResult>(1);
        let thread_running = Arc::clone(&running);
        let device_name = self.device_name.clone();

        let handle = thread::Builder::new()
            .name("cpal-mic-capture".into())
            .spawn(move || capture_thread(device_name, thread_running, ready_tx))
            .map_err(|e| VoiceAudioError::Unknown(format!("failed to spawn mic thread: {}", e)))?;

        let startup = ready_rx.recv().unwrap_or_else(|_| {
            Err(VoiceAudioError::Unknown(
                "capture thread exited during startup".into(),
            ))
        });
        let (feed, label) = match startup {
            Ok(started) => started,
            Err(e) => {
                running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                return Err(e);
            }
        };

        log::info!("Microphone stream open: {} ({} Hz)", label, feed.sample_rate());
        let track = CpalTrack::new(label, running, handle);
        Ok(MediaStream::new(vec![Box::new(track)], feed))
    }

    fn device_info(&self) -> Option<DeviceInfo> {
        let enumerator = DeviceEnumerator::new();
        let device = enumerator
            .find_input_device(self.device_name.as_deref())
            .ok()?;
        let name = device.name().ok()?;
        let is_default = enumerator.default_capture_device_name().as_deref() == Some(name.as_str());
        Some(device_info(name, is_default))
    }
}

/// One live cpal input stream, held open by its capture thread.
pub struct CpalTrack {
    label: String,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl CpalTrack {
    fn new(label: String, running: Arc<AtomicBool>, handle: thread::JoinHandle<()>) -> Self {
        Self {
            label,
            running,
            handle: Mutex::new(Some(handle)),
        }
    }
}

impl HardwareTrack for CpalTrack {
    fn label(&self) -> String {
        self.label.clone()
    }

    fn is_live(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn stop(&self) -> Result<(), VoiceAudioError> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(VoiceAudioError::TeardownRace(format!(
                "track '{}' already stopped",
                self.label
            )));
        }
        // Joining guarantees the stream is dropped and the device released.
        if let Some(handle) = self.handle.lock().take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                log::error!("Capture thread for '{}' panicked", self.label);
            }
        }
        log::debug!("Track '{}' stopped", self.label);
        Ok(())
    }
}

impl Drop for CpalTrack {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn capture_thread(device_name: Option<String>, running: Arc<AtomicBool>, ready: mpsc::SyncSender<StartupResult>) {
    let (stream, feed, label) = match open_input(device_name.as_deref()) {
        Ok(opened) => opened,
        Err(e) => {
            log::error!("Failed to open microphone: {}", e);
            running.store(false, Ordering::SeqCst);
            let _ = ready.send(Err(e));
            return;
        }
    };
    if ready.send(Ok((feed, label))).is_err() {
        return;
    }

    hold_until_stopped(&running);
    drop(stream);
}

fn hold_until_stopped(running: &AtomicBool) {
    while running.load(Ordering::SeqCst) {
        thread::park_timeout(PARK_INTERVAL);
    }
}

fn open_input(device_name: Option<&str>) -> Result<(cpal::Stream, SampleFeed, String), VoiceAudioError> {
    let device = DeviceEnumerator::new().find_input_device(device_name)?;
    let label = device.name().unwrap_or_else(|_| "Microphone".into());
    let supported = device.default_input_config().map_err(|e| match e {
        cpal::DefaultStreamConfigError::DeviceNotAvailable => VoiceAudioError::DeviceUnavailable,
        other => map_backend_message(other.to_string()),
    })?;

    let channels = supported.channels() as usize;
    let feed = SampleFeed::new(supported.sample_rate().0);
    let config = supported.config();

    let stream = match supported.sample_format() {
        SampleFormat::F32 => build_input::<f32>(&device, &config, channels, feed.clone()),
        SampleFormat::I16 => build_input::<i16>(&device, &config, channels, feed.clone()),
        SampleFormat::U16 => build_input::<u16>(&device, &config, channels, feed.clone()),
        SampleFormat::I32 => build_input::<i32>(&device, &config, channels, feed.clone()),
        other => {
            return Err(VoiceAudioError::ConfigurationFailed(format!(
                "unsupported sample format: {:?}",
                other
            )))
        }
    }?;

    stream.play().map_err(|e| match e {
        cpal::PlayStreamError::DeviceNotAvailable => VoiceAudioError::DeviceUnavailable,
        other => map_backend_message(other.to_string()),
    })?;
    Ok((stream, feed, label))
}

fn build_input<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    feed: SampleFeed,
) -> Result<cpal::Stream, VoiceAudioError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let mut mono = Vec::new();
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                downmix_into(data, channels, &mut mono);
                feed.push(&mono);
            },
            |err| log::error!("Microphone stream error: {}", err),
            None,
        )
        .map_err(|e| match e {
            cpal::BuildStreamError::DeviceNotAvailable => VoiceAudioError::DeviceUnavailable,
            other => map_backend_message(other.to_string()),
        })
}

/// Average each interleaved frame of `data` into `out`, reusing its
/// allocation. A trailing partial frame is dropped.
fn downmix_into<T>(data: &[T], channels: usize, out: &mut Vec<f32>)
where
    T: Sample,
    f32: FromSample<T>,
{
    let channels = channels.max(1);
    let scale = 1.0 / channels as f32;
    out.clear();
    out.extend(
        data.chunks_exact(channels)
            .map(|frame| frame.iter().map(|s| s.to_sample::<f32>()).sum::<f32>() * scale),
    );
}

/// Hosts report a refused microphone as a backend-specific error.
fn map_backend_message(message: String) -> VoiceAudioError {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not authorized") {
        VoiceAudioError::PermissionDenied
    } else {
        VoiceAudioError::ConfigurationFailed(message)
    }
}
