pub mod config;
pub mod drone;
pub mod error;
pub mod media;
pub mod recording;
pub mod state;
