use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::config::EncodingFormat;

/// Identity of a recording: its creation time in milliseconds since the
/// Unix epoch, bumped when two recordings land in the same millisecond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordingId(pub i64);

impl fmt::Display for RecordingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle through which a UI can play an encoded payload (the analogue of an
/// object URL). Must be revoked through the issuing playback store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayableReference(pub String);

impl PlayableReference {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayableReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Terminal output of an encoder job.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedAudio {
    pub bytes: Vec<u8>,
    pub format: EncodingFormat,
    pub duration_secs: f64,
}

/// A finished recording. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingArtifact {
    pub id: RecordingId,
    pub created_at: DateTime<Local>,
    pub payload: Arc<[u8]>,
    pub playable: PlayableReference,
    pub format: EncodingFormat,
    pub duration_secs: f64,
    /// SHA-256 of the payload, lowercase hex.
    pub checksum: String,
}

impl RecordingArtifact {
    pub fn new(
        id: RecordingId,
        created_at: DateTime<Local>,
        payload: Arc<[u8]>,
        format: EncodingFormat,
        duration_secs: f64,
        playable: PlayableReference,
    ) -> Self {
        let checksum = payload_checksum(&payload);
        Self {
            id,
            created_at,
            payload,
            playable,
            format,
            duration_secs,
            checksum,
        }
    }

    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn encoding(&self) -> &'static str {
        self.format.extension()
    }

    /// Name a download of this recording is saved under.
    pub fn download_filename(&self) -> String {
        format!("voice-recording-{}.{}", self.id, self.encoding())
    }

    /// The shape handed to the UI collaborator.
    pub fn info(&self) -> RecordingInfo {
        RecordingInfo {
            id: self.id,
            timestamp: self.created_at.to_rfc3339(),
            playable_reference: self.playable.clone(),
            mime_type: self.mime_type().to_string(),
            encoding: self.encoding().to_string(),
        }
    }
}

/// Serializable view of a recording for the UI collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingInfo {
    pub id: RecordingId,
    pub timestamp: String,
    pub playable_reference: PlayableReference,
    pub mime_type: String,
    pub encoding: String,
}

/// Metadata written next to a downloaded recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingMetadata {
    pub id: RecordingId,
    pub created_at: String,
    pub duration_secs: f64,
    pub mime_type: String,
    pub encoding: String,
    pub size_bytes: u64,
    pub checksum: String,
}

impl From<&RecordingArtifact> for RecordingMetadata {
    fn from(artifact: &RecordingArtifact) -> Self {
        Self {
            id: artifact.id,
            created_at: artifact.created_at.to_rfc3339(),
            duration_secs: artifact.duration_secs,
            mime_type: artifact.mime_type().to_string(),
            encoding: artifact.encoding().to_string(),
            size_bytes: artifact.payload.len() as u64,
            checksum: artifact.checksum.clone(),
        }
    }
}

pub fn payload_checksum(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(id: i64) -> RecordingArtifact {
        RecordingArtifact::new(
            RecordingId(id),
            Local::now(),
            Arc::from(vec![1u8, 2, 3]),
            EncodingFormat::Wav,
            0.5,
            PlayableReference("blob:test".into()),
        )
    }

    #[test]
    fn download_filename_uses_id_and_encoding() {
        assert_eq!(
            artifact(1_700_000_000_000).download_filename(),
            "voice-recording-1700000000000.wav"
        );
    }

    #[test]
    fn info_wire_shape() {
        let info = artifact(42).info();
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["id"], 42);
        assert_eq!(json["playableReference"], "blob:test");
        assert_eq!(json["mimeType"], "audio/wav");
        assert_eq!(json["encoding"], "wav");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn checksum_is_sha256_hex() {
        let recording = artifact(7);
        assert_eq!(recording.checksum.len(), 64);
        assert_eq!(
            payload_checksum(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
