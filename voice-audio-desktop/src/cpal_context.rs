//! cpal output context.
//!
//! A dedicated output thread owns the cpal output stream. Its callback mixes
//! every connected drone graph into each frame and advances the context
//! clock by the frames rendered. While suspended the callback writes silence
//! and the clock stands still.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample};
use parking_lot::Mutex;

use voice_audio_core::models::error::VoiceAudioError;
use voice_audio_core::models::state::ContextState;
use voice_audio_core::processing::drone_graph::SharedDroneGraph;
use voice_audio_core::traits::audio_context::{AudioContextBackend, ContextFactory, OutputConnection};

use crate::device_enumerator::DeviceEnumerator;

const PARK_INTERVAL: Duration = Duration::from_millis(100);

/// Opens a [`CpalContext`] on the default (or a named) output device.
#[derive(Debug, Clone, Default)]
pub struct CpalContextFactory {
    device_name: Option<String>,
}

impl CpalContextFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(name: impl Into<String>) -> Self {
        Self {
            device_name: Some(name.into()),
        }
    }
}

impl ContextFactory for CpalContextFactory {
    fn create_context(&self) -> Result<Arc<dyn AudioContextBackend>, VoiceAudioError> {
        Ok(Arc::new(CpalContext::open(self.device_name.clone())?))
    }
}

/// Buffers owned by the output callback and reused across calls.
#[derive(Default)]
struct MixScratch {
    mix: Vec<f32>,
    voice: Vec<f32>,
}

/// State shared between the context handle and the output callback.
struct Mixer {
    graphs: Mutex<Vec<(u64, SharedDroneGraph)>>,
    next_id: AtomicU64,
    suspended: AtomicBool,
    frames: AtomicU64,
}

impl Mixer {
    fn new() -> Self {
        Self {
            graphs: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            suspended: AtomicBool::new(false),
            frames: AtomicU64::new(0),
        }
    }

    fn connect(self: &Arc<Self>, graph: SharedDroneGraph) -> CpalConnection {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.graphs.lock().push((id, graph));
        CpalConnection {
            id,
            mixer: Arc::clone(self),
            connected: AtomicBool::new(true),
        }
    }

    fn connected_count(&self) -> usize {
        self.graphs.lock().len()
    }

    /// Fill one interleaved output buffer. Each graph renders a block into
    /// `scratch` and is summed into the mix.
    fn render<T>(&self, data: &mut [T], channels: usize, scratch: &mut MixScratch)
    where
        T: SizedSample + FromSample<f32>,
    {
        if self.suspended.load(Ordering::SeqCst) {
            data.fill(T::EQUILIBRIUM);
            return;
        }

        let channels = channels.max(1);
        let frames = data.len().div_ceil(channels);
        scratch.mix.clear();
        scratch.mix.resize(frames, 0.0);
        scratch.voice.resize(frames, 0.0);

        for (_, graph) in self.graphs.lock().iter() {
            let voice = &mut scratch.voice[..frames];
            graph.lock().render(voice);
            for (mixed, sample) in scratch.mix.iter_mut().zip(voice.iter()) {
                *mixed += sample;
            }
        }
        for (frame, mixed) in data.chunks_mut(channels).zip(&scratch.mix) {
            frame.fill(T::from_sample(mixed.clamp(-1.0, 1.0)));
        }
        self.frames
            .fetch_add((data.len() / channels) as u64, Ordering::SeqCst);
    }
}

/// Link of one drone graph to the output mix.
pub struct CpalConnection {
    id: u64,
    mixer: Arc<Mixer>,
    connected: AtomicBool,
}

impl OutputConnection for CpalConnection {
    fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            self.mixer.graphs.lock().retain(|(id, _)| *id != self.id);
        }
    }
}

/// Audio context backed by a cpal output stream.
///
/// Starts in the running state; desktop hosts need no user gesture to
/// produce sound.
pub struct CpalContext {
    mixer: Arc<Mixer>,
    sample_rate: u32,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl CpalContext {
    pub fn open(device_name: Option<String>) -> Result<Self, VoiceAudioError> {
        let mixer = Arc::new(Mixer::new());
        let running = Arc::new(AtomicBool::new(true));
        let (ready_tx, ready_rx) = mpsc::sync_channel::<Result<u32, VoiceAudioError>>(1);

        let thread_mixer = Arc::clone(&mixer);
        let thread_running = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("cpal-output".into())
            .spawn(move || output_thread(device_name, thread_mixer, thread_running, ready_tx))
            .map_err(|e| VoiceAudioError::Unknown(format!("failed to spawn output thread: {}", e)))?;

        let startup = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(VoiceAudioError::Unknown("output thread exited during startup".into())));
        match startup {
            Ok(sample_rate) => Ok(Self {
                mixer,
                sample_rate,
                running,
                handle: Mutex::new(Some(handle)),
            }),
            Err(e) => {
                running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(e)
            }
        }
    }

    /// Silence output and freeze the clock until [`AudioContextBackend::resume`].
    pub fn suspend(&self) {
        self.mixer.suspended.store(true, Ordering::SeqCst);
        log::debug!("Output context suspended");
    }

    pub fn connected_count(&self) -> usize {
        self.mixer.connected_count()
    }
}

impl AudioContextBackend for CpalContext {
    fn state(&self) -> ContextState {
        if self.mixer.suspended.load(Ordering::SeqCst) {
            ContextState::Suspended
        } else {
            ContextState::Running
        }
    }

    fn resume(&self) -> Result<(), VoiceAudioError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(VoiceAudioError::DeviceUnavailable);
        }
        self.mixer.suspended.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn current_time(&self) -> f64 {
        self.mixer.frames.load(Ordering::SeqCst) as f64 / self.sample_rate as f64
    }

    fn connect_output(&self, graph: SharedDroneGraph) -> Result<Box<dyn OutputConnection>, VoiceAudioError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(VoiceAudioError::DeviceUnavailable);
        }
        Ok(Box::new(self.mixer.connect(graph)))
    }
}

impl Drop for CpalContext {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.lock().take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }
}

fn output_thread(
    device_name: Option<String>,
    mixer: Arc<Mixer>,
    running: Arc<AtomicBool>,
    ready: mpsc::SyncSender<Result<u32, VoiceAudioError>>,
) {
    let (stream, sample_rate) = match open_output(device_name.as_deref(), &mixer) {
        Ok(opened) => opened,
        Err(e) => {
            log::error!("Failed to open output device: {}", e);
            let _ = ready.send(Err(e));
            return;
        }
    };
    if ready.send(Ok(sample_rate)).is_err() {
        return;
    }

    while running.load(Ordering::SeqCst) {
        thread::park_timeout(PARK_INTERVAL);
    }
    drop(stream);
    log::debug!("Output stream closed");
}

fn open_output(device_name: Option<&str>, mixer: &Arc<Mixer>) -> Result<(cpal::Stream, u32), VoiceAudioError> {
    let device = DeviceEnumerator::new().find_output_device(device_name)?;
    let supported = device
        .default_output_config()
        .map_err(|e| VoiceAudioError::ConfigurationFailed(format!("no output config: {}", e)))?;

    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels() as usize;
    let config = supported.config();

    let stream = match supported.sample_format() {
        SampleFormat::F32 => build_output::<f32>(&device, &config, channels, mixer),
        SampleFormat::I16 => build_output::<i16>(&device, &config, channels, mixer),
        SampleFormat::U16 => build_output::<u16>(&device, &config, channels, mixer),
        SampleFormat::I32 => build_output::<i32>(&device, &config, channels, mixer),
        other => {
            return Err(VoiceAudioError::ConfigurationFailed(format!(
                "unsupported sample format: {:?}",
                other
            )))
        }
    }?;
    stream
        .play()
        .map_err(|e| VoiceAudioError::ConfigurationFailed(format!("failed to start output: {}", e)))?;

    log::info!(
        "Output context open: {} ({} Hz, {} ch)",
        device.name().unwrap_or_default(),
        sample_rate,
        channels
    );
    Ok((stream, sample_rate))
}

fn build_output<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    mixer: &Arc<Mixer>,
) -> Result<cpal::Stream, VoiceAudioError>
where
    T: SizedSample + FromSample<f32>,
{
    let mixer = Arc::clone(mixer);
    let mut scratch = MixScratch::default();
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| mixer.render(data, channels, &mut scratch),
            |err| log::error!("Output stream error: {}", err),
            None,
        )
        .map_err(|e| match e {
            cpal::BuildStreamError::DeviceNotAvailable => VoiceAudioError::DeviceUnavailable,
            other => VoiceAudioError::ConfigurationFailed(format!("failed to build output stream: {}", other)),
        })
}
