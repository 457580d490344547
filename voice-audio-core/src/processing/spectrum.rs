//! FFT analysis tap over a microphone sample feed.
//!
//! Produces byte magnitudes the way a browser analyser node does: Blackman
//! window, magnitude normalized by the transform size, exponential smoothing
//! across frames, then decibels mapped linearly onto 0–255.

use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::models::media::SampleFeed;
use crate::traits::analysis_tap::AnalysisTap;

pub const DEFAULT_SMOOTHING: f32 = 0.8;
pub const MIN_DECIBELS: f32 = -100.0;
pub const MAX_DECIBELS: f32 = -30.0;

pub struct SpectrumTap {
    feed: SampleFeed,
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    smoothing: f32,
    scratch: Vec<Complex<f32>>,
}

impl SpectrumTap {
    pub fn new(feed: SampleFeed, fft_size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        Self {
            feed,
            fft,
            fft_size,
            window: blackman_window(fft_size),
            smoothed: vec![0.0; fft_size / 2],
            smoothing: DEFAULT_SMOOTHING,
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
        }
    }

    /// Time constant between 0 (no smoothing) and 1 (frozen).
    pub fn with_smoothing(mut self, smoothing: f32) -> Self {
        self.smoothing = smoothing.clamp(0.0, 1.0);
        self
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Run one analysis frame over the newest window of the feed.
    fn analyze(&mut self) {
        let recent = self.feed.latest(self.fft_size);
        // Not enough audio yet: the missing head of the window is silence.
        let pad = self.fft_size - recent.len();

        for (i, slot) in self.scratch.iter_mut().enumerate() {
            let sample = if i < pad { 0.0 } else { recent[i - pad] };
            *slot = Complex::new(sample * self.window[i], 0.0);
        }
        self.fft.process(&mut self.scratch);

        let scale = 1.0 / self.fft_size as f32;
        let tau = self.smoothing;
        for (bin, smoothed) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.scratch[bin].norm() * scale;
            let next = tau * *smoothed + (1.0 - tau) * magnitude;
            *smoothed = if next.is_finite() { next } else { 0.0 };
        }
    }
}

impl AnalysisTap for SpectrumTap {
    fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    fn sample_rate(&self) -> u32 {
        self.feed.sample_rate()
    }

    fn fill_byte_frequency_data(&mut self, out: &mut [u8]) {
        self.analyze();
        for (byte, &magnitude) in out.iter_mut().zip(self.smoothed.iter()) {
            *byte = magnitude_to_byte(magnitude);
        }
    }
}

fn blackman_window(size: usize) -> Vec<f32> {
    let (a0, a1, a2) = (0.42, 0.5, 0.08);
    (0..size)
        .map(|i| {
            let x = i as f32 / size as f32;
            a0 - a1 * (2.0 * PI * x).cos() + a2 * (4.0 * PI * x).cos()
        })
        .collect()
}

fn magnitude_to_byte(magnitude: f32) -> u8 {
    if magnitude <= 0.0 {
        return 0;
    }
    let db = 20.0 * magnitude.log10();
    let scaled = 255.0 * (db - MIN_DECIBELS) / (MAX_DECIBELS - MIN_DECIBELS);
    scaled.clamp(0.0, 255.0) as u8
}
