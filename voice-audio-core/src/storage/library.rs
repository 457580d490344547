use std::sync::Arc;

use chrono::Local;

use crate::models::recording::{EncodedAudio, RecordingArtifact, RecordingId};
use crate::traits::playback_store::PlaybackStore;

/// In-memory collection of finished recordings, oldest first.
#[derive(Debug, Default)]
pub struct RecordingLibrary {
    recordings: Vec<RecordingArtifact>,
    last: Option<RecordingId>,
    last_issued: i64,
}

impl RecordingLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the payload for playback, append the artifact and mark it as
    /// the most recent recording.
    pub fn add(&mut self, encoded: EncodedAudio, store: &dyn PlaybackStore) -> RecordingArtifact {
        let created_at = Local::now();
        let id = self.issue_id(created_at.timestamp_millis());

        let payload: Arc<[u8]> = Arc::from(encoded.bytes);
        let playable = store.register(Arc::clone(&payload), encoded.format.mime_type());
        let artifact = RecordingArtifact::new(
            id,
            created_at,
            payload,
            encoded.format,
            encoded.duration_secs,
            playable,
        );

        log::info!(
            "Recording {} ready ({} bytes, {:.2}s)",
            artifact.id,
            artifact.payload.len(),
            artifact.duration_secs
        );
        self.recordings.push(artifact.clone());
        self.last = Some(id);
        artifact
    }

    /// Revoke and remove a recording. Unknown ids are ignored.
    pub fn remove(&mut self, id: RecordingId, store: &dyn PlaybackStore) -> bool {
        let Some(index) = self.recordings.iter().position(|r| r.id == id) else {
            log::debug!("Delete of unknown recording {} ignored", id);
            return false;
        };

        let removed = self.recordings.remove(index);
        if !store.revoke(&removed.playable) {
            log::warn!("Playable reference {} was already revoked", removed.playable);
        }
        if self.last == Some(id) {
            self.last = None;
        }
        true
    }

    pub fn get(&self, id: RecordingId) -> Option<&RecordingArtifact> {
        self.recordings.iter().find(|r| r.id == id)
    }

    pub fn list(&self) -> &[RecordingArtifact] {
        &self.recordings
    }

    pub fn last(&self) -> Option<&RecordingArtifact> {
        self.last.and_then(|id| self.get(id))
    }

    pub fn len(&self) -> usize {
        self.recordings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recordings.is_empty()
    }

    /// Millisecond timestamps, bumped past the previous id on collision.
    fn issue_id(&mut self, now_millis: i64) -> RecordingId {
        let id = now_millis.max(self.last_issued + 1);
        self.last_issued = id;
        RecordingId(id)
    }
}
