use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::drone::{DroneParameters, Note, LOWPASS_Q, SHELF_FREQUENCY_HZ};
use crate::processing::biquad::{Biquad, FilterKind};
use crate::processing::compressor::DynamicsCompressor;
use crate::processing::oscillator::Oscillator;

/// Graph shared between the drone engine (which edits it) and the output
/// backend (which renders it).
pub type SharedDroneGraph = Arc<Mutex<DroneGraph>>;

/// Oscillator → lowpass → high-shelf → compressor → gain.
#[derive(Debug, Clone)]
pub struct DroneGraph {
    oscillator: Oscillator,
    lowpass: Biquad,
    shelf: Biquad,
    compressor: DynamicsCompressor,
    gain: f32,
    sample_rate: f32,
}

impl DroneGraph {
    pub fn new(params: &DroneParameters, base_gain: f32, sample_rate: u32, start_time: f64) -> Self {
        let sample_rate = sample_rate as f32;
        Self {
            oscillator: Oscillator::new(params.waveform, params.note.frequency(), start_time),
            lowpass: Biquad::new(lowpass_kind(params), sample_rate),
            shelf: Biquad::new(shelf_kind(params), sample_rate),
            compressor: DynamicsCompressor::new(params.compressor(), sample_rate),
            gain: params.output_gain(base_gain),
            sample_rate,
        }
    }

    pub fn shared(self) -> SharedDroneGraph {
        Arc::new(Mutex::new(self))
    }

    /// Update every stage in place. The oscillator keeps running.
    pub fn apply(&mut self, params: &DroneParameters, base_gain: f32) {
        self.oscillator.set_frequency(params.note.frequency());
        self.oscillator.set_waveform(params.waveform);
        self.lowpass.set_kind(lowpass_kind(params));
        self.shelf.set_kind(shelf_kind(params));
        self.compressor.configure(params.compressor());
        self.gain = params.output_gain(base_gain);
    }

    pub fn retune(&mut self, note: Note) {
        self.oscillator.set_frequency(note.frequency());
    }

    pub fn oscillator(&self) -> &Oscillator {
        &self.oscillator
    }

    pub fn lowpass(&self) -> &Biquad {
        &self.lowpass
    }

    pub fn shelf(&self) -> &Biquad {
        &self.shelf
    }

    pub fn compressor(&self) -> &DynamicsCompressor {
        &self.compressor
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn next_sample(&mut self) -> f32 {
        let x = self.oscillator.next_sample(self.sample_rate);
        let x = self.lowpass.process(x);
        let x = self.shelf.process(x);
        let x = self.compressor.process(x);
        x * self.gain
    }

    /// Fill `out` with consecutive mono samples.
    pub fn render(&mut self, out: &mut [f32]) {
        for sample in out.iter_mut() {
            *sample = self.next_sample();
        }
    }
}

fn lowpass_kind(params: &DroneParameters) -> FilterKind {
    FilterKind::Lowpass {
        cutoff_hz: params.lowpass_cutoff_hz(),
        q: LOWPASS_Q,
    }
}

fn shelf_kind(params: &DroneParameters) -> FilterKind {
    FilterKind::Highshelf {
        frequency_hz: SHELF_FREQUENCY_HZ,
        gain_db: params.shelf_gain_db(),
    }
}
