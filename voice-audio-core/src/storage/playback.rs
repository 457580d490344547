use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::recording::PlayableReference;
use crate::traits::playback_store::PlaybackStore;

/// Process-local playback store handing out `blob:<uuid>` references.
#[derive(Debug, Default)]
pub struct InMemoryPlaybackStore {
    entries: Mutex<HashMap<PlayableReference, (Arc<[u8]>, String)>>,
}

impl InMemoryPlaybackStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn mime_type(&self, reference: &PlayableReference) -> Option<String> {
        self.entries
            .lock()
            .get(reference)
            .map(|(_, mime)| mime.clone())
    }
}

impl PlaybackStore for InMemoryPlaybackStore {
    fn register(&self, payload: Arc<[u8]>, mime_type: &str) -> PlayableReference {
        let reference = PlayableReference(format!("blob:{}", Uuid::new_v4()));
        self.entries
            .lock()
            .insert(reference.clone(), (payload, mime_type.to_string()));
        reference
    }

    fn resolve(&self, reference: &PlayableReference) -> Option<Arc<[u8]>> {
        self.entries
            .lock()
            .get(reference)
            .map(|(payload, _)| Arc::clone(payload))
    }

    fn revoke(&self, reference: &PlayableReference) -> bool {
        self.entries.lock().remove(reference).is_some()
    }
}
