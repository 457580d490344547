//! RIFF/WAV encoding of captured microphone audio.

pub const WAV_HEADER_SIZE: usize = 44;

/// Bit depth of every WAV this crate writes.
pub const PCM_BIT_DEPTH: u16 = 16;

/// Build the 44-byte header of a PCM WAV file.
///
/// ```text
/// [0-3]    "RIFF"       [4-7]    36 + data_size
/// [8-11]   "WAVE"       [12-15]  "fmt "
/// [16-19]  16           [20-21]  1 (PCM)
/// [22-23]  channels     [24-27]  sample_rate
/// [28-31]  byte_rate    [32-33]  block_align
/// [34-35]  bit_depth    [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn wav_header(sample_rate: u32, bit_depth: u16, channels: u16, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let block_align = channels * bit_depth / 8;
    let byte_rate = sample_rate * block_align as u32;

    let mut header = [0u8; WAV_HEADER_SIZE];
    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&(36 + data_size).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bit_depth.to_le_bytes());

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());
    header
}

/// Clamp to [-1, 1] and scale to little-endian signed 16-bit.
pub fn pcm16_bytes(sample: f32) -> [u8; 2] {
    let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
    value.to_le_bytes()
}

/// Encode mono samples as a complete 16-bit PCM WAV, duplicating each sample
/// into `channels` interleaved channels.
pub fn encode_wav(mono: &[f32], sample_rate: u32, channels: u16) -> Vec<u8> {
    let channels = channels.max(1);
    let data_size = mono.len() * channels as usize * 2;

    let mut out = Vec::with_capacity(WAV_HEADER_SIZE + data_size);
    out.extend_from_slice(&wav_header(sample_rate, PCM_BIT_DEPTH, channels, data_size as u32));
    for &sample in mono {
        let bytes = pcm16_bytes(sample);
        for _ in 0..channels {
            out.extend_from_slice(&bytes);
        }
    }
    out
}

/// Playback length of `frames` frames.
pub fn duration_secs(frames: usize, sample_rate: u32) -> f64 {
    if sample_rate == 0 {
        return 0.0;
    }
    frames as f64 / sample_rate as f64
}
