pub mod coordinator;
pub mod device_context;
pub mod drone_engine;
pub mod engine;
pub mod frame_scheduler;
pub mod microphone;
pub mod pitch_monitor;
pub mod recording;
