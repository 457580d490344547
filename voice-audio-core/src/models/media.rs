use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::processing::ring_buffer::RingBuffer;
use crate::traits::hardware_track::HardwareTrack;

/// Seconds of audio a sample feed keeps before dropping the oldest samples.
pub const FEED_CAPACITY_SECS: usize = 5;

/// How the device is attached to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceTransport {
    BuiltIn,
    Bluetooth,
    Usb,
    Virtual,
    Unknown,
}

/// An input device available for capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub is_default: bool,
    pub transport: DeviceTransport,
}

/// Live mono samples of one microphone stream.
///
/// Clones share the same buffer. The capture backend pushes, the analysis tap
/// peeks at the newest window, a recording capture input drains.
#[derive(Debug, Clone)]
pub struct SampleFeed {
    buffer: Arc<Mutex<RingBuffer>>,
    sample_rate: u32,
}

impl SampleFeed {
    pub fn new(sample_rate: u32) -> Self {
        let capacity = sample_rate as usize * FEED_CAPACITY_SECS;
        Self {
            buffer: Arc::new(Mutex::new(RingBuffer::new(capacity))),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn push(&self, samples: &[f32]) {
        self.buffer.lock().write(samples);
    }

    /// Newest `count` samples without consuming them.
    pub fn latest(&self, count: usize) -> Vec<f32> {
        self.buffer.lock().latest(count)
    }

    /// Take every buffered sample.
    pub fn drain(&self) -> Vec<f32> {
        let mut buffer = self.buffer.lock();
        let available = buffer.count();
        buffer.read(available)
    }

    pub fn len(&self) -> usize {
        self.buffer.lock().count()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.lock().is_empty()
    }

    pub fn clear(&self) {
        self.buffer.lock().reset();
    }
}

/// A live microphone stream: its hardware tracks plus the feed they write to.
pub struct MediaStream {
    id: Uuid,
    tracks: Vec<Box<dyn HardwareTrack>>,
    feed: SampleFeed,
}

impl MediaStream {
    pub fn new(tracks: Vec<Box<dyn HardwareTrack>>, feed: SampleFeed) -> Self {
        Self {
            id: Uuid::new_v4(),
            tracks,
            feed,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn feed(&self) -> &SampleFeed {
        &self.feed
    }

    pub fn sample_rate(&self) -> u32 {
        self.feed.sample_rate()
    }

    pub fn tracks(&self) -> &[Box<dyn HardwareTrack>] {
        &self.tracks
    }

    pub fn live_track_count(&self) -> usize {
        self.tracks.iter().filter(|track| track.is_live()).count()
    }

    /// Stop every track. Tracks that were already stopped are skipped with a
    /// warning; the stream is dead afterwards either way.
    pub fn stop_all_tracks(&self) {
        for track in &self.tracks {
            match track.stop() {
                Ok(()) => log::debug!("Stopped track '{}' of stream {}", track.label(), self.id),
                Err(e) if e.is_teardown_race() => {
                    log::warn!("Track '{}' already stopped: {}", track.label(), e);
                }
                Err(e) => log::error!("Failed to stop track '{}': {}", track.label(), e),
            }
        }
    }
}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaStream")
            .field("id", &self.id)
            .field("tracks", &self.tracks.len())
            .field("live", &self.live_track_count())
            .field("sample_rate", &self.feed.sample_rate())
            .finish()
    }
}

/// Source node a recording encoder pulls samples from.
#[derive(Debug, Clone)]
pub struct CaptureInput {
    feed: SampleFeed,
}

impl CaptureInput {
    pub fn new(feed: SampleFeed) -> Self {
        Self { feed }
    }

    pub fn sample_rate(&self) -> u32 {
        self.feed.sample_rate()
    }

    /// Take every sample captured since the last pull.
    pub fn pull(&self) -> Vec<f32> {
        self.feed.drain()
    }
}
