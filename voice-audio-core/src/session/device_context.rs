use std::sync::Arc;

use crate::models::error::VoiceAudioError;
use crate::models::media::{CaptureInput, MediaStream};
use crate::models::state::ContextState;
use crate::processing::spectrum::SpectrumTap;
use crate::traits::analysis_tap::AnalysisTap;
use crate::traits::audio_context::{AudioContextBackend, ContextFactory};

/// Owner of the single audio context shared by monitoring, the drone and
/// recording.
///
/// The context is created lazily and never closed: closing it would drop the
/// device's output route, so it only ever gets resumed.
pub struct DeviceContext {
    factory: Arc<dyn ContextFactory>,
    context: Option<Arc<dyn AudioContextBackend>>,
}

impl DeviceContext {
    pub fn new(factory: Arc<dyn ContextFactory>) -> Self {
        Self {
            factory,
            context: None,
        }
    }

    /// Create the context if needed and resume it if suspended. Idempotent.
    pub fn ensure_running(&mut self) -> Result<Arc<dyn AudioContextBackend>, VoiceAudioError> {
        let context = self.get_or_create()?;
        if context.state() == ContextState::Suspended {
            log::debug!("Resuming suspended audio context");
            context.resume()?;
        }
        Ok(context)
    }

    /// The context, if it was created.
    pub fn context(&self) -> Option<Arc<dyn AudioContextBackend>> {
        self.context.clone()
    }

    pub fn state(&self) -> Option<ContextState> {
        self.context.as_ref().map(|context| context.state())
    }

    /// Source node the recording encoder pulls from.
    pub fn create_capture_input(&mut self, stream: &MediaStream) -> Result<CaptureInput, VoiceAudioError> {
        self.get_or_create()?;
        Ok(CaptureInput::new(stream.feed().clone()))
    }

    /// Frequency analyser over `stream`. Only valid while the stream is live.
    pub fn create_analysis_tap(
        &mut self,
        stream: &MediaStream,
        fft_size: usize,
        smoothing: f32,
    ) -> Result<Box<dyn AnalysisTap>, VoiceAudioError> {
        self.get_or_create()?;
        let tap = SpectrumTap::new(stream.feed().clone(), fft_size).with_smoothing(smoothing);
        Ok(Box::new(tap))
    }

    fn get_or_create(&mut self) -> Result<Arc<dyn AudioContextBackend>, VoiceAudioError> {
        if let Some(context) = &self.context {
            return Ok(Arc::clone(context));
        }
        let context = self.factory.create_context()?;
        log::info!(
            "Audio context created ({} Hz, {:?})",
            context.sample_rate(),
            context.state()
        );
        self.context = Some(Arc::clone(&context));
        Ok(context)
    }
}
