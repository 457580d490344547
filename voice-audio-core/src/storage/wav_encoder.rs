use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::config::{EncoderConfig, EncodingFormat};
use crate::models::error::VoiceAudioError;
use crate::models::media::CaptureInput;
use crate::models::recording::EncodedAudio;
use crate::processing::wav_format;
use crate::traits::encoder::{EncoderJob, EncoderOutcome, EncoderService, TimeLimitCallback};

/// Buffers captured samples while recording and writes one 16-bit PCM WAV
/// after stop.
#[derive(Debug, Clone)]
pub struct WavEncoderService {
    poll_interval: Duration,
}

impl WavEncoderService {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }
}

impl Default for WavEncoderService {
    fn default() -> Self {
        Self::new(Duration::from_millis(50))
    }
}

impl EncoderService for WavEncoderService {
    fn start(&self, input: CaptureInput, config: &EncoderConfig) -> Result<Box<dyn EncoderJob>, VoiceAudioError> {
        config.validate().map_err(VoiceAudioError::ConfigurationFailed)?;

        let sample_rate = input.sample_rate();
        let max_samples = sample_rate as usize * config.time_limit_secs as usize;
        let running = Arc::new(AtomicBool::new(true));
        let limit = Arc::new(TimeLimit::default());

        let capture_running = Arc::clone(&running);
        let capture_limit = Arc::clone(&limit);
        let poll_interval = self.poll_interval;
        let capture = thread::Builder::new()
            .name("wav-encoder-capture".into())
            .spawn(move || {
                let mut captured = Vec::new();
                while capture_running.load(Ordering::SeqCst) {
                    thread::sleep(poll_interval);
                    if append_capped(&mut captured, input.pull(), max_samples) {
                        log::info!("Recording reached the time limit");
                        capture_limit.reach();
                        return captured;
                    }
                }
                // Samples delivered between the last poll and stop.
                append_capped(&mut captured, input.pull(), max_samples);
                captured
            })
            .map_err(|e| VoiceAudioError::EncoderFailure(format!("failed to spawn capture thread: {}", e)))?;

        log::debug!(
            "WAV encoder started: {} Hz, {} channel(s), limit {}s",
            sample_rate,
            config.channels,
            config.time_limit_secs
        );

        Ok(Box::new(WavEncoderJob {
            running,
            limit,
            capture: Some(capture),
            sample_rate,
            channels: config.channels,
        }))
    }
}

/// Appends up to the cap. Returns whether the cap is reached.
fn append_capped(captured: &mut Vec<f32>, samples: Vec<f32>, max_samples: usize) -> bool {
    let room = max_samples.saturating_sub(captured.len());
    if samples.len() > room {
        captured.extend_from_slice(&samples[..room]);
    } else {
        captured.extend(samples);
    }
    captured.len() >= max_samples
}

/// Time-limit signal shared by a job and its capture thread.
#[derive(Default)]
struct TimeLimit {
    reached: AtomicBool,
    callback: Mutex<Option<TimeLimitCallback>>,
}

impl TimeLimit {
    fn reach(&self) {
        self.reached.store(true, Ordering::SeqCst);
        self.fire();
    }

    fn register(&self, callback: TimeLimitCallback) {
        *self.callback.lock() = Some(callback);
        if self.reached.load(Ordering::SeqCst) {
            self.fire();
        }
    }

    fn fire(&self) {
        let callback = self.callback.lock().take();
        if let Some(callback) = callback {
            callback();
        }
    }
}

struct WavEncoderJob {
    running: Arc<AtomicBool>,
    limit: Arc<TimeLimit>,
    capture: Option<thread::JoinHandle<Vec<f32>>>,
    sample_rate: u32,
    channels: u16,
}

impl EncoderJob for WavEncoderJob {
    fn finish(mut self: Box<Self>) -> Receiver<EncoderOutcome> {
        let (tx, rx) = mpsc::channel();
        self.running.store(false, Ordering::SeqCst);

        let Some(capture) = self.capture.take() else {
            let _ = tx.send(Err(VoiceAudioError::EncoderFailure("job already finished".into())));
            return rx;
        };
        let (sample_rate, channels) = (self.sample_rate, self.channels);

        let encode_tx = tx.clone();
        let spawned = thread::Builder::new()
            .name("wav-encoder".into())
            .spawn(move || {
                let outcome = match capture.join() {
                    Ok(samples) => {
                        let bytes = wav_format::encode_wav(&samples, sample_rate, channels);
                        log::debug!("Encoded {} samples into {} bytes", samples.len(), bytes.len());
                        Ok(EncodedAudio {
                            bytes,
                            format: EncodingFormat::Wav,
                            duration_secs: wav_format::duration_secs(samples.len(), sample_rate),
                        })
                    }
                    Err(_) => Err(VoiceAudioError::EncoderFailure("capture thread panicked".into())),
                };
                let _ = encode_tx.send(outcome);
            });

        if let Err(e) = spawned {
            let _ = tx.send(Err(VoiceAudioError::EncoderFailure(format!(
                "failed to spawn encoder thread: {}",
                e
            ))));
        }
        rx
    }

    fn on_time_limit(&mut self, callback: TimeLimitCallback) {
        self.limit.register(callback);
    }
}

impl Drop for WavEncoderJob {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}
