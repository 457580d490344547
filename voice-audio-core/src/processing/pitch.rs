use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Latest pitch reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "hz")]
pub enum PitchSample {
    #[default]
    NoPitch,
    Hz(u32),
}

impl PitchSample {
    pub fn hz(&self) -> Option<u32> {
        match self {
            Self::Hz(hz) => Some(*hz),
            Self::NoPitch => None,
        }
    }
}

impl fmt::Display for PitchSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoPitch => f.write_str("--"),
            Self::Hz(hz) => write!(f, "{} Hz", hz),
        }
    }
}

/// Dominant-bin pitch estimator.
///
/// Picks the first bin holding the maximum magnitude. A reading requires the
/// magnitude to be strictly above the noise floor and the rounded frequency
/// to fall inside the voice band.
#[derive(Debug, Clone)]
pub struct PitchDetector {
    noise_floor: u8,
    band: RangeInclusive<f64>,
}

impl PitchDetector {
    pub fn new(noise_floor: u8, band: RangeInclusive<f64>) -> Self {
        Self { noise_floor, band }
    }

    pub fn estimate(&self, bins: &[u8], sample_rate: u32) -> PitchSample {
        let Some((index, magnitude)) = first_max(bins) else {
            return PitchSample::NoPitch;
        };
        if magnitude <= self.noise_floor {
            return PitchSample::NoPitch;
        }

        let nyquist = sample_rate as f64 / 2.0;
        let frequency = (index as f64 * nyquist / bins.len() as f64).round();
        if self.band.contains(&frequency) {
            PitchSample::Hz(frequency as u32)
        } else {
            PitchSample::NoPitch
        }
    }
}

impl Default for PitchDetector {
    fn default() -> Self {
        Self::new(50, 80.0..=500.0)
    }
}

fn first_max(bins: &[u8]) -> Option<(usize, u8)> {
    let mut best: Option<(usize, u8)> = None;
    for (index, &value) in bins.iter().enumerate() {
        match best {
            Some((_, max)) if value <= max => {}
            _ => best = Some((index, value)),
        }
    }
    best
}
