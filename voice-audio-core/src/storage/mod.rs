pub mod download;
pub mod library;
pub mod playback;
pub mod wav_encoder;
