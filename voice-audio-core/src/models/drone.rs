use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Reference pitches the drone can sound, ordered low to high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Note {
    A3,
    B3,
    C4,
    #[serde(rename = "C#4")]
    CSharp4,
    D4,
    #[serde(rename = "D#4")]
    DSharp4,
    E4,
    F4,
    #[serde(rename = "F#4")]
    FSharp4,
    G4,
}

/// Direction for stepping through [`Note::ALL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteDirection {
    Up,
    Down,
}

impl Note {
    pub const ALL: [Note; 10] = [
        Note::A3,
        Note::B3,
        Note::C4,
        Note::CSharp4,
        Note::D4,
        Note::DSharp4,
        Note::E4,
        Note::F4,
        Note::FSharp4,
        Note::G4,
    ];

    /// Fixed frequency in Hz.
    pub fn frequency(&self) -> f32 {
        match self {
            Note::A3 => 220.00,
            Note::B3 => 246.94,
            Note::C4 => 261.63,
            Note::CSharp4 => 277.18,
            Note::D4 => 293.66,
            Note::DSharp4 => 311.13,
            Note::E4 => 329.63,
            Note::F4 => 349.23,
            Note::FSharp4 => 369.99,
            Note::G4 => 392.00,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Note::A3 => "A3",
            Note::B3 => "B3",
            Note::C4 => "C4",
            Note::CSharp4 => "C#4",
            Note::D4 => "D4",
            Note::DSharp4 => "D#4",
            Note::E4 => "E4",
            Note::F4 => "F4",
            Note::FSharp4 => "F#4",
            Note::G4 => "G4",
        }
    }

    fn index(&self) -> usize {
        Self::ALL
            .iter()
            .position(|note| note == self)
            .unwrap_or_default()
    }

    /// One step in `direction`, clamped at both ends of the sequence.
    pub fn step(self, direction: NoteDirection) -> Note {
        let index = self.index();
        let next = match direction {
            NoteDirection::Up => (index + 1).min(Self::ALL.len() - 1),
            NoteDirection::Down => index.saturating_sub(1),
        };
        Self::ALL[next]
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Note {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|note| note.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown note: {}", s))
    }
}

/// Oscillator shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Sine,
    Triangle,
    Sawtooth,
    Square,
}

impl FromStr for Waveform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sine" => Ok(Self::Sine),
            "triangle" => Ok(Self::Triangle),
            "sawtooth" => Ok(Self::Sawtooth),
            "square" => Ok(Self::Square),
            other => Err(format!("unknown waveform: {}", other)),
        }
    }
}

pub const MAX_VOLUME_PCT: u16 = 200;

const LOWPASS_SOFTENED_HZ: f32 = 2400.0;
const LOWPASS_OPEN_HZ: f32 = 18000.0;
pub const LOWPASS_Q: f32 = 0.7;
pub const SHELF_FREQUENCY_HZ: f32 = 2500.0;
const SHELF_BOOST_DB: f32 = 3.0;

/// Dynamics settings for the drone compressor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressorSettings {
    pub threshold_db: f32,
    pub knee_db: f32,
    pub ratio: f32,
    pub attack_secs: f32,
    pub release_secs: f32,
}

impl CompressorSettings {
    /// Loudness preset for small speakers.
    pub const BOOST: CompressorSettings = CompressorSettings {
        threshold_db: -26.0,
        knee_db: 9.0,
        ratio: 3.0,
        attack_secs: 0.003,
        release_secs: 0.25,
    };

    /// Neutral settings; the compressor passes audio through unchanged.
    pub const BYPASS: CompressorSettings = CompressorSettings {
        threshold_db: 0.0,
        knee_db: 0.0,
        ratio: 1.0,
        attack_secs: 0.003,
        release_secs: 0.25,
    };
}

/// User-facing drone parameters. Mutable at any time; a playing drone picks
/// up changes in place.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DroneParameters {
    pub note: Note,
    pub waveform: Waveform,
    /// Output level, 0–200 %.
    pub volume_pct: u16,
    /// Lowpass the oscillator to take the metallic edge off.
    pub soften_highs: bool,
    /// High-shelf lift plus compression for small speakers.
    pub phone_boost: bool,
}

impl DroneParameters {
    pub fn with_volume_pct(mut self, volume_pct: u16) -> Self {
        self.volume_pct = volume_pct.min(MAX_VOLUME_PCT);
        self
    }

    pub fn lowpass_cutoff_hz(&self) -> f32 {
        if self.soften_highs {
            LOWPASS_SOFTENED_HZ
        } else {
            LOWPASS_OPEN_HZ
        }
    }

    pub fn shelf_gain_db(&self) -> f32 {
        if self.phone_boost {
            SHELF_BOOST_DB
        } else {
            0.0
        }
    }

    pub fn compressor(&self) -> CompressorSettings {
        if self.phone_boost {
            CompressorSettings::BOOST
        } else {
            CompressorSettings::BYPASS
        }
    }

    pub fn output_gain(&self, base_gain: f32) -> f32 {
        base_gain * (self.volume_pct.min(MAX_VOLUME_PCT) as f32 / 100.0)
    }
}

impl Default for DroneParameters {
    fn default() -> Self {
        Self {
            note: Note::C4,
            waveform: Waveform::Sine,
            volume_pct: 100,
            soften_highs: true,
            phone_boost: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn step_up_clamps_at_top() {
        assert_eq!(Note::G4.step(NoteDirection::Up), Note::G4);
        assert_eq!(Note::FSharp4.step(NoteDirection::Up), Note::G4);
    }

    #[test]
    fn step_down_clamps_at_bottom() {
        assert_eq!(Note::A3.step(NoteDirection::Down), Note::A3);
        assert_eq!(Note::B3.step(NoteDirection::Down), Note::A3);
    }

    #[test]
    fn sequence_is_ascending() {
        for pair in Note::ALL.windows(2) {
            assert!(pair[0].frequency() < pair[1].frequency());
        }
    }

    #[test]
    fn parse_note_names() {
        assert_eq!("C#4".parse::<Note>().unwrap(), Note::CSharp4);
        assert_eq!("a3".parse::<Note>().unwrap(), Note::A3);
        assert!("H2".parse::<Note>().is_err());
        assert_eq!(
            serde_json::to_string(&Note::FSharp4).unwrap(),
            "\"F#4\""
        );
    }

    #[test]
    fn stage_policy() {
        let mut params = DroneParameters::default();
        assert_relative_eq!(params.lowpass_cutoff_hz(), 2400.0);
        assert_relative_eq!(params.shelf_gain_db(), 0.0);
        assert_eq!(params.compressor(), CompressorSettings::BYPASS);

        params.soften_highs = false;
        params.phone_boost = true;
        assert_relative_eq!(params.lowpass_cutoff_hz(), 18000.0);
        assert_relative_eq!(params.shelf_gain_db(), 3.0);
        assert_eq!(params.compressor(), CompressorSettings::BOOST);
    }

    #[test]
    fn output_gain_scales_base() {
        let params = DroneParameters::default().with_volume_pct(150);
        assert_relative_eq!(params.output_gain(0.2), 0.3, epsilon = 1e-6);

        let clamped = DroneParameters::default().with_volume_pct(500);
        assert_eq!(clamped.volume_pct, 200);
        assert_relative_eq!(clamped.output_gain(0.2), 0.4, epsilon = 1e-6);
    }
}
