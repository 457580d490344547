/// Circular buffer of mono audio samples.
///
/// Not synchronized on its own; share it as `Arc<parking_lot::Mutex<RingBuffer>>`
/// (see [`SampleFeed`](crate::models::media::SampleFeed)).
///
/// Overflow drops the oldest samples.
#[derive(Debug)]
pub struct RingBuffer {
    buffer: Vec<f32>,
    write_index: usize,
    read_index: usize,
    available: usize,
    capacity: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: vec![0.0; capacity],
            write_index: 0,
            read_index: 0,
            available: 0,
            capacity,
        }
    }

    /// Append samples, evicting the oldest on overflow.
    ///
    /// When `samples` alone exceeds the capacity only its tail is kept.
    pub fn write(&mut self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }

        let samples = if samples.len() > self.capacity {
            &samples[samples.len() - self.capacity..]
        } else {
            samples
        };

        let overflow = (self.available + samples.len()).saturating_sub(self.capacity);
        if overflow > 0 {
            self.read_index = (self.read_index + overflow) % self.capacity;
            self.available -= overflow;
        }

        for &sample in samples {
            self.buffer[self.write_index] = sample;
            self.write_index = (self.write_index + 1) % self.capacity;
        }
        self.available += samples.len();
    }

    /// Remove and return up to `count` of the oldest samples.
    pub fn read(&mut self, count: usize) -> Vec<f32> {
        let to_read = count.min(self.available);
        if to_read == 0 {
            return Vec::new();
        }

        let result = self.copy_from(self.read_index, to_read);
        self.read_index = (self.read_index + to_read) % self.capacity;
        self.available -= to_read;
        result
    }

    /// Copy of the newest `count` samples, oldest first, without consuming
    /// anything. Shorter than `count` while the buffer is filling up.
    pub fn latest(&self, count: usize) -> Vec<f32> {
        let to_copy = count.min(self.available);
        if to_copy == 0 {
            return Vec::new();
        }
        let start = (self.write_index + self.capacity - to_copy) % self.capacity;
        self.copy_from(start, to_copy)
    }

    fn copy_from(&self, start: usize, count: usize) -> Vec<f32> {
        (0..count)
            .map(|i| self.buffer[(start + i) % self.capacity])
            .collect()
    }

    pub fn count(&self) -> usize {
        self.available
    }

    pub fn is_empty(&self) -> bool {
        self.available == 0
    }

    pub fn reset(&mut self) {
        self.write_index = 0;
        self.read_index = 0;
        self.available = 0;
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
