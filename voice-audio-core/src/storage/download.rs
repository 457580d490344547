use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::VoiceAudioError;
use crate::models::recording::{RecordingArtifact, RecordingMetadata};

/// Write a recording into `dir` under its download filename, with a
/// `.metadata.json` sidecar next to it. Returns the audio file path.
pub fn save_download(artifact: &RecordingArtifact, dir: &Path) -> Result<PathBuf, VoiceAudioError> {
    fs::create_dir_all(dir)
        .map_err(|e| VoiceAudioError::StorageError(format!("failed to create {}: {}", dir.display(), e)))?;

    let path = dir.join(artifact.download_filename());
    fs::write(&path, &artifact.payload)
        .map_err(|e| VoiceAudioError::StorageError(format!("failed to write recording: {}", e)))?;

    write_metadata(&RecordingMetadata::from(artifact), &path)?;
    log::info!("Saved recording {} to {}", artifact.id, path.display());
    Ok(path)
}

/// Write recording metadata to `{recording_path}.metadata.json`.
pub fn write_metadata(metadata: &RecordingMetadata, recording_path: &Path) -> Result<(), VoiceAudioError> {
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| VoiceAudioError::StorageError(format!("failed to serialize metadata: {}", e)))?;
    fs::write(metadata_path(recording_path), json)
        .map_err(|e| VoiceAudioError::StorageError(format!("failed to write metadata: {}", e)))
}

pub fn read_metadata(recording_path: &Path) -> Result<RecordingMetadata, VoiceAudioError> {
    let json = fs::read_to_string(metadata_path(recording_path))
        .map_err(|e| VoiceAudioError::StorageError(format!("failed to read metadata: {}", e)))?;
    serde_json::from_str(&json)
        .map_err(|e| VoiceAudioError::StorageError(format!("failed to parse metadata: {}", e)))
}

fn metadata_path(recording_path: &Path) -> PathBuf {
    recording_path.with_extension("metadata.json")
}
