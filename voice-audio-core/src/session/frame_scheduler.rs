use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::error::VoiceAudioError;
use crate::traits::frame_scheduler::{FrameCallback, FrameHandle, FrameScheduler};

/// Pending frame requests in request order.
#[derive(Default)]
struct FrameQueue {
    next_id: u64,
    pending: Vec<(FrameHandle, FrameCallback)>,
}

impl FrameQueue {
    fn push(&mut self, callback: FrameCallback) -> FrameHandle {
        self.next_id += 1;
        let handle = FrameHandle(self.next_id);
        self.pending.push((handle, callback));
        handle
    }

    fn cancel(&mut self, handle: FrameHandle) {
        self.pending.retain(|(h, _)| *h != handle);
    }

    fn take_all(&mut self) -> Vec<(FrameHandle, FrameCallback)> {
        std::mem::take(&mut self.pending)
    }
}

/// Runs one batch of callbacks. The queue lock is released first, so
/// callbacks may request or cancel frames.
fn run_frame(queue: &Mutex<FrameQueue>) -> usize {
    let due = queue.lock().take_all();
    let count = due.len();
    for (_, callback) in due {
        callback();
    }
    count
}

/// Frame scheduler driven by the host: nothing runs until
/// [`fire_frame`](Self::fire_frame) is called, typically from the host's
/// own render loop.
#[derive(Default)]
pub struct ManualFrameScheduler {
    queue: Mutex<FrameQueue>,
}

impl ManualFrameScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run every callback requested before this call. Requests made by those
    /// callbacks wait for the next frame. Returns how many ran.
    pub fn fire_frame(&self) -> usize {
        run_frame(&self.queue)
    }

    pub fn pending_count(&self) -> usize {
        self.queue.lock().pending.len()
    }
}

impl FrameScheduler for ManualFrameScheduler {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        self.queue.lock().push(callback)
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        self.queue.lock().cancel(handle);
    }
}

/// Frame scheduler ticking on a dedicated thread at a fixed interval.
pub struct ThreadFrameScheduler {
    queue: Arc<Mutex<FrameQueue>>,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl ThreadFrameScheduler {
    pub fn start(interval: Duration) -> Result<Self, VoiceAudioError> {
        let queue = Arc::new(Mutex::new(FrameQueue::default()));
        let running = Arc::new(AtomicBool::new(true));

        let thread_queue = Arc::clone(&queue);
        let thread_running = Arc::clone(&running);
        let handle = thread::Builder::new()
            .name("frame-scheduler".into())
            .spawn(move || {
                while thread_running.load(Ordering::SeqCst) {
                    thread::sleep(interval);
                    run_frame(&thread_queue);
                }
            })
            .map_err(|e| VoiceAudioError::Unknown(format!("failed to spawn frame thread: {}", e)))?;

        log::debug!("Frame scheduler started ({:?} interval)", interval);
        Ok(Self {
            queue,
            running,
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Stop ticking and join the thread. Pending requests are dropped.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let Some(handle) = self.handle.lock().take() else {
            return;
        };
        // The last owner can be dropped from inside a callback.
        if handle.thread().id() == thread::current().id() {
            return;
        }
        if handle.join().is_err() {
            log::error!("Frame scheduler thread panicked");
        }
        self.queue.lock().take_all();
    }
}

impl FrameScheduler for ThreadFrameScheduler {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle {
        self.queue.lock().push(callback)
    }

    fn cancel_frame(&self, handle: FrameHandle) {
        self.queue.lock().cancel(handle);
    }
}

impl Drop for ThreadFrameScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
