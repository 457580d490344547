use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::error::VoiceAudioError;
use crate::processing::pitch::{PitchDetector, PitchSample};
use crate::traits::analysis_tap::AnalysisTap;
use crate::traits::frame_scheduler::{FrameHandle, FrameScheduler};

/// Capability tying a pitch loop to the lifetime of its analysis tap.
///
/// Whoever tears down the tap's stream invalidates the token first; a loop
/// holding an invalid token stops at its next tick.
#[derive(Debug, Clone)]
pub struct TapToken(Arc<AtomicBool>);

impl TapToken {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_valid(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn invalidate(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl Default for TapToken {
    fn default() -> Self {
        Self::new()
    }
}

/// State one running loop shares with its scheduled frames.
struct PitchLoop {
    tap: Mutex<Box<dyn AnalysisTap>>,
    bins: Mutex<Vec<u8>>,
    detector: PitchDetector,
    token: TapToken,
    scheduler: Arc<dyn FrameScheduler>,
    /// Next scheduled frame. Ticks and `stop` both run under this lock.
    pending: Mutex<Option<FrameHandle>>,
    latest: Arc<Mutex<PitchSample>>,
    ticks: Arc<AtomicU64>,
}

impl PitchLoop {
    fn tick(self: &Arc<Self>) {
        let mut pending = self.pending.lock();
        if !self.token.is_valid() {
            *pending = None;
            return;
        }

        let sample = {
            let mut tap = self.tap.lock();
            let mut bins = self.bins.lock();
            tap.fill_byte_frequency_data(&mut bins);
            self.detector.estimate(&bins, tap.sample_rate())
        };
        *self.latest.lock() = sample;
        self.ticks.fetch_add(1, Ordering::SeqCst);

        let next = Arc::clone(self);
        *pending = Some(self.scheduler.request_frame(Box::new(move || next.tick())));
    }
}

/// Per-frame dominant-frequency estimation over an analysis tap.
pub struct PitchMonitor {
    scheduler: Arc<dyn FrameScheduler>,
    detector: PitchDetector,
    latest: Arc<Mutex<PitchSample>>,
    ticks: Arc<AtomicU64>,
    active: Option<Arc<PitchLoop>>,
}

impl PitchMonitor {
    pub fn new(scheduler: Arc<dyn FrameScheduler>, detector: PitchDetector) -> Self {
        Self {
            scheduler,
            detector,
            latest: Arc::new(Mutex::new(PitchSample::NoPitch)),
            ticks: Arc::new(AtomicU64::new(0)),
            active: None,
        }
    }

    /// Start the loop over `tap`. The first estimate is taken before this
    /// returns.
    pub fn start(&mut self, tap: Box<dyn AnalysisTap>, token: TapToken) -> Result<(), VoiceAudioError> {
        if self.is_running() {
            return Err(VoiceAudioError::MonitorAlreadyRunning);
        }
        // A loop whose token was invalidated elsewhere may still own a frame.
        self.stop();

        let bins = vec![0u8; tap.frequency_bin_count()];
        let pitch_loop = Arc::new(PitchLoop {
            tap: Mutex::new(tap),
            bins: Mutex::new(bins),
            detector: self.detector.clone(),
            token,
            scheduler: Arc::clone(&self.scheduler),
            pending: Mutex::new(None),
            latest: Arc::clone(&self.latest),
            ticks: Arc::clone(&self.ticks),
        });
        self.active = Some(Arc::clone(&pitch_loop));
        log::debug!("Pitch monitor started");
        pitch_loop.tick();
        Ok(())
    }

    /// Invalidate the loop's token, cancel its pending frame and reset the
    /// reading to [`PitchSample::NoPitch`]. Safe to call when stopped.
    pub fn stop(&mut self) {
        if let Some(pitch_loop) = self.active.take() {
            let mut pending = pitch_loop.pending.lock();
            pitch_loop.token.invalidate();
            if let Some(handle) = pending.take() {
                self.scheduler.cancel_frame(handle);
            }
            log::debug!("Pitch monitor stopped");
        }
        *self.latest.lock() = PitchSample::NoPitch;
    }

    pub fn is_running(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|pitch_loop| pitch_loop.token.is_valid())
    }

    pub fn latest(&self) -> PitchSample {
        *self.latest.lock()
    }

    /// Estimates taken since construction.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::SeqCst)
    }
}

impl Drop for PitchMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
