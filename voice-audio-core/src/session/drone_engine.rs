use std::sync::Arc;

use crate::models::drone::{DroneParameters, Note};
use crate::models::error::VoiceAudioError;
use crate::processing::drone_graph::{DroneGraph, SharedDroneGraph};
use crate::session::device_context::DeviceContext;
use crate::traits::audio_context::OutputConnection;

struct ActiveDrone {
    graph: SharedDroneGraph,
    connection: Box<dyn OutputConnection>,
}

/// Reference tone: builds the drone subgraph on start and tears it down on
/// stop. Never touches the microphone.
pub struct DroneEngine {
    base_gain: f32,
    active: Option<ActiveDrone>,
}

impl DroneEngine {
    pub fn new(base_gain: f32) -> Self {
        Self {
            base_gain,
            active: None,
        }
    }

    /// Build and connect the subgraph. When already playing, the parameters
    /// are applied to the existing subgraph instead.
    pub fn start(&mut self, device: &mut DeviceContext, params: &DroneParameters) -> Result<(), VoiceAudioError> {
        if self.active.is_some() {
            self.update_live(params);
            return Ok(());
        }

        let context = device.ensure_running()?;
        let graph = DroneGraph::new(params, self.base_gain, context.sample_rate(), context.current_time()).shared();
        let connection = context.connect_output(Arc::clone(&graph))?;

        log::info!(
            "Drone started: {} ({:.2} Hz, {:?}, {}%)",
            params.note,
            params.note.frequency(),
            params.waveform,
            params.volume_pct
        );
        self.active = Some(ActiveDrone { graph, connection });
        Ok(())
    }

    /// Disconnect and drop the subgraph. No-op when silent.
    pub fn stop(&mut self) {
        if let Some(drone) = self.active.take() {
            drone.connection.disconnect();
            log::info!("Drone stopped");
        }
    }

    /// Push new parameters into a playing subgraph without restarting it.
    pub fn update_live(&mut self, params: &DroneParameters) {
        if let Some(drone) = &self.active {
            drone.graph.lock().apply(params, self.base_gain);
            log::debug!("Drone parameters updated: {:?}", params);
        }
    }

    pub fn retune(&mut self, note: Note) {
        if let Some(drone) = &self.active {
            drone.graph.lock().retune(note);
            log::debug!("Drone retuned to {}", note);
        }
    }

    pub fn is_playing(&self) -> bool {
        self.active.is_some()
    }

    /// Context time the running oscillator started at.
    pub fn oscillator_start_time(&self) -> Option<f64> {
        self.active
            .as_ref()
            .map(|drone| drone.graph.lock().oscillator().start_time())
    }

    pub fn graph(&self) -> Option<SharedDroneGraph> {
        self.active.as_ref().map(|drone| Arc::clone(&drone.graph))
    }
}

impl Drop for DroneEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::drone::{CompressorSettings, Waveform};
    use crate::models::state::ContextState;
    use crate::processing::biquad::FilterKind;
    use crate::testing::MockContextFactory;
    use crate::traits::audio_context::AudioContextBackend;

    fn setup() -> (Arc<MockContextFactory>, DeviceContext, DroneEngine) {
        let factory = Arc::new(MockContextFactory::new(ContextState::Suspended));
        let device = DeviceContext::new(factory.clone());
        (factory, device, DroneEngine::new(0.2))
    }

    #[test]
    fn start_connects_and_resumes_context() {
        let (factory, mut device, mut drone) = setup();
        drone.start(&mut device, &DroneParameters::default()).unwrap();

        let context = factory.last().unwrap();
        assert!(drone.is_playing());
        assert_eq!(context.connected_count(), 1);
        assert_eq!(context.state(), ContextState::Running);
    }

    #[test]
    fn stop_disconnects() {
        let (factory, mut device, mut drone) = setup();
        drone.start(&mut device, &DroneParameters::default()).unwrap();
        drone.stop();
        drone.stop();

        assert!(!drone.is_playing());
        assert_eq!(factory.last().unwrap().connected_count(), 0);
        assert!(drone.oscillator_start_time().is_none());
    }

    #[test]
    fn live_update_keeps_oscillator() {
        let (factory, mut device, mut drone) = setup();
        let context = {
            device.ensure_running().unwrap();
            factory.last().unwrap()
        };
        context.advance(2.5);
        drone.start(&mut device, &DroneParameters::default()).unwrap();
        context.advance(1.0);

        let params = DroneParameters {
            waveform: Waveform::Sawtooth,
            phone_boost: true,
            ..DroneParameters::default()
        }
        .with_volume_pct(180);
        drone.update_live(&params);

        assert_eq!(drone.oscillator_start_time(), Some(2.5));
        let graph = drone.graph().unwrap();
        let graph = graph.lock();
        assert_eq!(graph.oscillator().waveform(), Waveform::Sawtooth);
        assert_eq!(graph.compressor().settings(), CompressorSettings::BOOST);
        assert!((graph.gain() - 0.36).abs() < 1e-6);
        assert_eq!(context.connections_made(), 1);
    }

    #[test]
    fn live_tone_toggles_retune_filters() {
        let (factory, mut device, mut drone) = setup();
        device.ensure_running().unwrap();
        let context = factory.last().unwrap();
        context.advance(0.75);
        drone.start(&mut device, &DroneParameters::default()).unwrap();
        context.advance(3.0);

        let boosted = DroneParameters {
            soften_highs: false,
            phone_boost: true,
            ..DroneParameters::default()
        };
        drone.update_live(&boosted);
        {
            let graph = drone.graph().unwrap();
            let graph = graph.lock();
            assert_eq!(
                graph.shelf().kind(),
                FilterKind::Highshelf {
                    frequency_hz: 2500.0,
                    gain_db: 3.0
                }
            );
            assert_eq!(
                graph.lowpass().kind(),
                FilterKind::Lowpass {
                    cutoff_hz: 18_000.0,
                    q: 0.7
                }
            );
            assert_eq!(graph.oscillator().start_time(), 0.75);
        }

        drone.update_live(&DroneParameters::default());
        let graph = drone.graph().unwrap();
        let graph = graph.lock();
        assert_eq!(
            graph.shelf().kind(),
            FilterKind::Highshelf {
                frequency_hz: 2500.0,
                gain_db: 0.0
            }
        );
        assert_eq!(
            graph.lowpass().kind(),
            FilterKind::Lowpass {
                cutoff_hz: 2400.0,
                q: 0.7
            }
        );
        assert!(graph.compressor().is_bypassed());
        assert_eq!(graph.oscillator().start_time(), 0.75);
        assert_eq!(drone.oscillator_start_time(), Some(0.75));
        assert_eq!(context.connections_made(), 1);
    }

    #[test]
    fn start_while_playing_applies_parameters() {
        let (factory, mut device, mut drone) = setup();
        drone.start(&mut device, &DroneParameters::default()).unwrap();

        let params = DroneParameters {
            note: Note::A3,
            ..DroneParameters::default()
        };
        drone.start(&mut device, &params).unwrap();

        assert_eq!(factory.last().unwrap().connections_made(), 1);
        let graph = drone.graph().unwrap();
        assert_eq!(graph.lock().oscillator().frequency_hz(), 220.0);
    }

    #[test]
    fn retune_changes_frequency_only() {
        let (_factory, mut device, mut drone) = setup();
        drone.start(&mut device, &DroneParameters::default()).unwrap();
        drone.retune(Note::E4);

        let graph = drone.graph().unwrap();
        let graph = graph.lock();
        assert_eq!(graph.oscillator().frequency_hz(), 329.63);
        assert_eq!(graph.oscillator().waveform(), Waveform::Sine);
    }

    #[test]
    fn update_while_silent_is_noop() {
        let (factory, _device, mut drone) = setup();
        drone.update_live(&DroneParameters::default());
        drone.retune(Note::G4);
        assert!(!drone.is_playing());
        assert_eq!(factory.created(), 0);
    }
}
