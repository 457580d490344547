use std::sync::mpsc::Receiver;

use crate::models::config::EncoderConfig;
use crate::models::error::VoiceAudioError;
use crate::models::media::CaptureInput;
use crate::models::recording::EncodedAudio;

/// Terminal outcome of an encoder job. Exactly one is delivered.
pub type EncoderOutcome = Result<EncodedAudio, VoiceAudioError>;

/// Runs once when a job stops capturing at its time limit.
pub type TimeLimitCallback = Box<dyn FnOnce() + Send>;

/// Produces encoder jobs for recordings.
pub trait EncoderService: Send + Sync {
    /// Start capturing from `input`. Capture runs until the job is finished.
    fn start(&self, input: CaptureInput, config: &EncoderConfig) -> Result<Box<dyn EncoderJob>, VoiceAudioError>;
}

/// A running capture-and-encode job.
pub trait EncoderJob: Send {
    /// Stop capturing and begin encoding. The outcome arrives on the returned
    /// channel once encoding completes or fails.
    fn finish(self: Box<Self>) -> Receiver<EncoderOutcome>;

    /// Register `callback` for the moment capture reaches the configured
    /// time limit. Runs at most once, possibly before this returns when the
    /// limit was already reached. The job still has to be finished.
    fn on_time_limit(&mut self, _callback: TimeLimitCallback) {}
}
