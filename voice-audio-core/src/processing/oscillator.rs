use std::f32::consts::TAU;

use crate::models::drone::Waveform;

/// Phase-accumulator oscillator.
///
/// Frequency and waveform can change between render calls without resetting
/// the phase, so retuning a playing drone does not click.
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    frequency_hz: f32,
    phase: f32,
    start_time: f64,
}

impl Oscillator {
    /// `start_time` is the context time, in seconds, the oscillator started at.
    pub fn new(waveform: Waveform, frequency_hz: f32, start_time: f64) -> Self {
        Self {
            waveform,
            frequency_hz,
            phase: 0.0,
            start_time,
        }
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn frequency_hz(&self) -> f32 {
        self.frequency_hz
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    pub fn set_frequency(&mut self, frequency_hz: f32) {
        self.frequency_hz = frequency_hz;
    }

    pub fn set_waveform(&mut self, waveform: Waveform) {
        self.waveform = waveform;
    }

    /// Next sample in [-1, 1].
    pub fn next_sample(&mut self, sample_rate: f32) -> f32 {
        let value = shape(self.waveform, self.phase);
        self.phase += self.frequency_hz / sample_rate;
        self.phase -= self.phase.floor();
        value
    }
}

/// Waveform value at `phase` in [0, 1).
fn shape(waveform: Waveform, phase: f32) -> f32 {
    match waveform {
        Waveform::Sine => (TAU * phase).sin(),
        Waveform::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Sawtooth => 2.0 * phase - 1.0,
        Waveform::Triangle => {
            if phase < 0.25 {
                4.0 * phase
            } else if phase < 0.75 {
                2.0 - 4.0 * phase
            } else {
                4.0 * phase - 4.0
            }
        }
    }
}
