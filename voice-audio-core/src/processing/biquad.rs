//! Second-order IIR filters using the RBJ audio-EQ cookbook formulas.

use std::f32::consts::{PI, SQRT_2};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterKind {
    Lowpass { cutoff_hz: f32, q: f32 },
    /// Shelf slope is fixed at 1.
    Highshelf { frequency_hz: f32, gain_db: f32 },
}

/// Normalized coefficients (a0 = 1).
#[derive(Debug, Clone, Copy, PartialEq)]
struct Coefficients {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl Coefficients {
    const IDENTITY: Coefficients = Coefficients {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    fn design(kind: FilterKind, sample_rate: f32) -> Self {
        let nyquist = sample_rate / 2.0;
        match kind {
            FilterKind::Lowpass { cutoff_hz, q } => {
                if cutoff_hz >= nyquist {
                    return Self::IDENTITY;
                }
                let w0 = 2.0 * PI * cutoff_hz.max(1.0) / sample_rate;
                let (sin, cos) = w0.sin_cos();
                let alpha = sin / (2.0 * q.max(1e-4));

                let a0 = 1.0 + alpha;
                Self {
                    b0: (1.0 - cos) / 2.0 / a0,
                    b1: (1.0 - cos) / a0,
                    b2: (1.0 - cos) / 2.0 / a0,
                    a1: -2.0 * cos / a0,
                    a2: (1.0 - alpha) / a0,
                }
            }
            FilterKind::Highshelf {
                frequency_hz,
                gain_db,
            } => {
                if gain_db == 0.0 {
                    return Self::IDENTITY;
                }
                let a = 10f32.powf(gain_db / 40.0);
                let w0 = 2.0 * PI * frequency_hz.clamp(1.0, nyquist * 0.999) / sample_rate;
                let (sin, cos) = w0.sin_cos();
                let alpha = sin / 2.0 * SQRT_2;
                let two_sqrt_a_alpha = 2.0 * a.sqrt() * alpha;

                let a0 = (a + 1.0) - (a - 1.0) * cos + two_sqrt_a_alpha;
                Self {
                    b0: a * ((a + 1.0) + (a - 1.0) * cos + two_sqrt_a_alpha) / a0,
                    b1: -2.0 * a * ((a - 1.0) + (a + 1.0) * cos) / a0,
                    b2: a * ((a + 1.0) + (a - 1.0) * cos - two_sqrt_a_alpha) / a0,
                    a1: 2.0 * ((a - 1.0) - (a + 1.0) * cos) / a0,
                    a2: ((a + 1.0) - (a - 1.0) * cos - two_sqrt_a_alpha) / a0,
                }
            }
        }
    }
}

/// Biquad filter in transposed direct form II.
///
/// Retuning replaces the coefficients but keeps the delay state, so a
/// playing drone can change its filter settings without restarting.
#[derive(Debug, Clone)]
pub struct Biquad {
    kind: FilterKind,
    sample_rate: f32,
    coefficients: Coefficients,
    z1: f32,
    z2: f32,
}

impl Biquad {
    pub fn new(kind: FilterKind, sample_rate: f32) -> Self {
        Self {
            kind,
            sample_rate,
            coefficients: Coefficients::design(kind, sample_rate),
            z1: 0.0,
            z2: 0.0,
        }
    }

    pub fn lowpass(cutoff_hz: f32, q: f32, sample_rate: f32) -> Self {
        Self::new(FilterKind::Lowpass { cutoff_hz, q }, sample_rate)
    }

    pub fn highshelf(frequency_hz: f32, gain_db: f32, sample_rate: f32) -> Self {
        Self::new(
            FilterKind::Highshelf {
                frequency_hz,
                gain_db,
            },
            sample_rate,
        )
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    pub fn set_kind(&mut self, kind: FilterKind) {
        if kind != self.kind {
            self.kind = kind;
            self.coefficients = Coefficients::design(kind, self.sample_rate);
        }
    }

    pub fn process(&mut self, x: f32) -> f32 {
        let c = &self.coefficients;
        let y = c.b0 * x + self.z1;
        self.z1 = c.b1 * x - c.a1 * y + self.z2;
        self.z2 = c.b2 * x - c.a2 * y;
        y
    }

    pub fn reset(&mut self) {
        self.z1 = 0.0;
        self.z2 = 0.0;
    }
}
