/// Work to run on the next display frame.
pub type FrameCallback = Box<dyn FnOnce() + Send + 'static>;

/// Identifies one requested frame so it can be cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Display-refresh tick source.
///
/// Each request runs its callback once, on the next frame. Callbacks that
/// want to keep ticking request another frame from inside the callback.
pub trait FrameScheduler: Send + Sync {
    fn request_frame(&self, callback: FrameCallback) -> FrameHandle;

    /// Drop a pending request. No-op when it already ran or was cancelled.
    fn cancel_frame(&self, handle: FrameHandle);
}
