//! FrameSource trait - tracking source abstraction
//!
//! A frame source owns a blocking receive loop and pushes every frame into a
//! registered callback on that same thread. The callback is a direct
//! synchronous call: the source cannot receive the next frame until it
//! returns, so the callback must never block for unbounded time and has no
//! way to suspend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::{ContractError, MocapFrame};

/// Frame callback type
///
/// `FnMut` because the dispatcher behind it mutates its channel registry.
pub type FrameCallback = Box<dyn FnMut(&MocapFrame) + Send>;

/// Motion-capture frame source
///
/// # Example
///
/// ```ignore
/// let mut source = frame_source::connect("fake", &Default::default())?;
/// source.set_callback(Box::new(move |frame: &MocapFrame| {
///     dispatcher.on_frame(frame);
/// }));
/// source.spin()?;
/// ```
pub trait FrameSource: Send {
    /// Source name (used for logging)
    fn name(&self) -> &str;

    /// Register the frame callback, replacing any previous one
    fn set_callback(&mut self, callback: FrameCallback);

    /// Run the receive loop
    ///
    /// Blocks, invoking the callback once per frame, until the stop handle
    /// fires or the source runs out of frames.
    ///
    /// # Errors
    /// Returns `ContractError::Receive` on an unrecoverable socket failure
    fn spin(&mut self) -> Result<(), ContractError>;

    /// Handle that terminates `spin` from another thread
    fn stop_handle(&self) -> StopHandle;
}

/// Cross-thread stop flag for a frame source
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the receive loop to stop
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}
