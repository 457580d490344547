pub mod biquad;
pub mod compressor;
pub mod drone_graph;
pub mod oscillator;
pub mod pitch;
pub mod ring_buffer;
pub mod spectrum;
pub mod wav_format;
