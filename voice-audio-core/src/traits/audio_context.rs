use std::sync::Arc;

use crate::models::error::VoiceAudioError;
use crate::models::state::ContextState;
use crate::processing::drone_graph::SharedDroneGraph;

/// The platform's audio-processing context: an output clock plus the
/// destination drone subgraphs render into.
///
/// One instance lives for the whole session. It is never closed, only
/// suspended by the platform and resumed by the device context.
pub trait AudioContextBackend: Send + Sync {
    fn state(&self) -> ContextState;

    /// Resume a suspended context. No-op when running.
    fn resume(&self) -> Result<(), VoiceAudioError>;

    /// Output sample rate in Hz.
    fn sample_rate(&self) -> u32;

    /// Seconds of audio rendered since the context was created.
    fn current_time(&self) -> f64;

    /// Route `graph` to the output. Rendering continues until the returned
    /// connection is disconnected.
    fn connect_output(&self, graph: SharedDroneGraph) -> Result<Box<dyn OutputConnection>, VoiceAudioError>;
}

/// A graph's link to the context destination.
pub trait OutputConnection: Send + Sync {
    /// Stop rendering the graph. Idempotent.
    fn disconnect(&self);
}

/// Creates the audio context on first use.
pub trait ContextFactory: Send + Sync {
    fn create_context(&self) -> Result<Arc<dyn AudioContextBackend>, VoiceAudioError>;
}
