use std::sync::Arc;

use crate::models::recording::PlayableReference;

/// Issues playable references for encoded payloads.
pub trait PlaybackStore: Send + Sync {
    fn register(&self, payload: Arc<[u8]>, mime_type: &str) -> PlayableReference;

    /// Payload behind a reference, if still registered.
    fn resolve(&self, reference: &PlayableReference) -> Option<Arc<[u8]>>;

    /// Release a reference. Returns whether it was registered.
    fn revoke(&self, reference: &PlayableReference) -> bool;
}
