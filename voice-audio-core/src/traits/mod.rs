pub mod analysis_tap;
pub mod audio_context;
pub mod audio_delegate;
pub mod encoder;
pub mod frame_scheduler;
pub mod hardware_track;
pub mod microphone_provider;
pub mod playback_store;
