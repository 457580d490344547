use std::ops::RangeInclusive;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::processing::spectrum::DEFAULT_SMOOTHING;

/// Hardware capture constraints handed to the microphone provider.
///
/// Each processing stage can be toggled independently. `Default` is the
/// permissive browser-style default used for recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl CaptureConstraints {
    /// Unprocessed capture. Pitch monitoring needs the raw signal.
    pub fn raw() -> Self {
        Self {
            echo_cancellation: false,
            noise_suppression: false,
            auto_gain_control: false,
        }
    }
}

impl Default for CaptureConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

/// Container format produced by the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingFormat {
    #[default]
    Wav,
}

impl EncodingFormat {
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Wav => "audio/wav",
        }
    }

    /// File extension and encoding tag.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Wav => "wav",
        }
    }
}

/// Configuration handed to the encoder collaborator.
///
/// Serializes as `{"format":"wav","channels":2,"timeLimitSeconds":300,"encodeAfterStop":true}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncoderConfig {
    pub format: EncodingFormat,
    /// Output channel count. The mono capture is duplicated into each channel.
    pub channels: u16,
    /// Hard cap on captured audio; samples past the cap are dropped.
    #[serde(rename = "timeLimitSeconds")]
    pub time_limit_secs: u32,
    /// Buffer raw samples during capture and encode once after stop.
    pub encode_after_stop: bool,
}

impl EncoderConfig {
    pub fn validate(&self) -> Result<(), String> {
        if ![1, 2].contains(&self.channels) {
            return Err(format!("unsupported channel count: {}", self.channels));
        }
        if self.time_limit_secs == 0 {
            return Err("time limit must be positive".into());
        }
        if !self.encode_after_stop {
            return Err("only encode-after-stop is supported".into());
        }
        Ok(())
    }

    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(self.time_limit_secs as u64)
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            format: EncodingFormat::Wav,
            channels: 2,
            time_limit_secs: 300,
            encode_after_stop: true,
        }
    }
}

/// Configuration for the voice audio engine.
#[derive(Debug, Clone)]
pub struct VoiceAudioConfig {
    /// Constraints for the pitch-monitoring stream (default: raw).
    pub monitoring_constraints: CaptureConstraints,

    /// Constraints for the recording stream (default: permissive).
    pub recording_constraints: CaptureConstraints,

    /// Analysis transform window in samples (default: 2048, giving 1024 bins).
    pub fft_size: usize,

    /// Frame-to-frame smoothing of the analysis spectrum, 0 to 1 (default: 0.8).
    pub analysis_smoothing: f32,

    /// Byte magnitude a bin must exceed to count as a pitch (default: 50).
    pub noise_floor: u8,

    /// Accepted fundamental range in Hz (default: 80–500).
    pub voice_band_hz: RangeInclusive<f64>,

    /// Wait after releasing the microphone before treating the hardware as
    /// free (default: 200 ms).
    pub settle_delay: Duration,

    /// Tick interval of the thread-driven frame scheduler (default: ~60 Hz).
    pub frame_interval: Duration,

    /// Drone output level at 100 % volume (default: 0.2).
    pub base_gain: f32,

    /// Initial phone-boost setting. Hosts on small-speaker devices enable it.
    pub default_phone_boost: bool,

    pub encoder: EncoderConfig,
}

impl VoiceAudioConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.fft_size < 32 || !self.fft_size.is_power_of_two() {
            return Err(format!("unsupported fft size: {}", self.fft_size));
        }
        if !(0.0..=1.0).contains(&self.analysis_smoothing) {
            return Err(format!("analysis smoothing out of range: {}", self.analysis_smoothing));
        }
        let (low, high) = (*self.voice_band_hz.start(), *self.voice_band_hz.end());
        if !(low > 0.0 && low < high) {
            return Err(format!("invalid voice band: {}..={}", low, high));
        }
        if self.base_gain <= 0.0 || self.base_gain.is_nan() {
            return Err(format!("base gain must be positive: {}", self.base_gain));
        }
        if self.frame_interval.is_zero() {
            return Err("frame interval must be positive".into());
        }
        self.encoder.validate()
    }

    /// Number of frequency bins the analysis tap exposes.
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }
}

impl Default for VoiceAudioConfig {
    fn default() -> Self {
        Self {
            monitoring_constraints: CaptureConstraints::raw(),
            recording_constraints: CaptureConstraints::default(),
            fft_size: 2048,
            analysis_smoothing: DEFAULT_SMOOTHING,
            noise_floor: 50,
            voice_band_hz: 80.0..=500.0,
            settle_delay: Duration::from_millis(200),
            frame_interval: Duration::from_micros(16_667),
            base_gain: 0.2,
            default_phone_boost: false,
            encoder: EncoderConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let config = VoiceAudioConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.frequency_bin_count(), 1024);
        assert_eq!(config.settle_delay, Duration::from_millis(200));
    }

    #[test]
    fn rejects_smoothing_outside_unit_range() {
        let config = VoiceAudioConfig {
            analysis_smoothing: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_bad_fft_size() {
        let config = VoiceAudioConfig {
            fft_size: 1000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_inverted_band() {
        let config = VoiceAudioConfig {
            voice_band_hz: 500.0..=80.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn encoder_config_wire_shape() {
        let json = serde_json::to_value(EncoderConfig::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "format": "wav",
                "channels": 2,
                "timeLimitSeconds": 300,
                "encodeAfterStop": true
            })
        );
    }

    #[test]
    fn constraints_wire_shape() {
        let json = serde_json::to_value(CaptureConstraints::raw()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "echoCancellation": false,
                "noiseSuppression": false,
                "autoGainControl": false
            })
        );
        assert!(CaptureConstraints::default().echo_cancellation);
    }

    #[test]
    fn encoder_rejects_zero_time_limit() {
        let config = EncoderConfig {
            time_limit_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
