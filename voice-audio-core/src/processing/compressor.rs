use crate::models::drone::CompressorSettings;

/// Exponent applied to the full-scale gain reduction to derive make-up gain.
const MAKEUP_EXPONENT: f32 = 0.6;

/// Feed-forward soft-knee dynamics compressor.
///
/// Gain reduction is computed per sample from the static curve, smoothed
/// with separate attack and release time constants, and followed by an
/// automatic make-up gain so compressed material comes out louder.
#[derive(Debug, Clone)]
pub struct DynamicsCompressor {
    settings: CompressorSettings,
    sample_rate: f32,
    attack_coeff: f32,
    release_coeff: f32,
    makeup_db: f32,
    reduction_db: f32,
}

impl DynamicsCompressor {
    pub fn new(settings: CompressorSettings, sample_rate: f32) -> Self {
        let mut compressor = Self {
            settings,
            sample_rate,
            attack_coeff: 0.0,
            release_coeff: 0.0,
            makeup_db: 0.0,
            reduction_db: 0.0,
        };
        compressor.configure(settings);
        compressor
    }

    pub fn settings(&self) -> CompressorSettings {
        self.settings
    }

    /// Apply new settings; the current envelope is kept.
    pub fn configure(&mut self, settings: CompressorSettings) {
        self.settings = settings;
        self.attack_coeff = time_coefficient(settings.attack_secs, self.sample_rate);
        self.release_coeff = time_coefficient(settings.release_secs, self.sample_rate);
        self.makeup_db = if self.is_bypassed() {
            0.0
        } else {
            -MAKEUP_EXPONENT * static_reduction_db(0.0, &settings)
        };
    }

    pub fn is_bypassed(&self) -> bool {
        self.settings.ratio <= 1.0
    }

    /// Current smoothed gain reduction in dB (zero or negative).
    pub fn reduction_db(&self) -> f32 {
        self.reduction_db
    }

    pub fn process(&mut self, x: f32) -> f32 {
        if self.is_bypassed() {
            self.reduction_db = 0.0;
            return x;
        }

        let magnitude = x.abs();
        let target = if magnitude > 0.0 {
            static_reduction_db(20.0 * magnitude.log10(), &self.settings)
        } else {
            0.0
        };

        let coeff = if target < self.reduction_db {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.reduction_db = target + coeff * (self.reduction_db - target);

        x * db_to_gain(self.reduction_db + self.makeup_db)
    }
}

/// Gain change the static soft-knee curve applies at `level_db`.
fn static_reduction_db(level_db: f32, settings: &CompressorSettings) -> f32 {
    let threshold = settings.threshold_db;
    let knee = settings.knee_db;
    let slope = 1.0 / settings.ratio - 1.0;
    let over = level_db - threshold;

    if 2.0 * over < -knee {
        0.0
    } else if knee > 0.0 && 2.0 * over.abs() <= knee {
        slope * (over + knee / 2.0).powi(2) / (2.0 * knee)
    } else {
        slope * over
    }
}

fn time_coefficient(secs: f32, sample_rate: f32) -> f32 {
    if secs <= 0.0 {
        return 0.0;
    }
    (-1.0 / (secs * sample_rate)).exp()
}

fn db_to_gain(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}
