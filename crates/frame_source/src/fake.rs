//! Fake 帧源
//!
//! 用于无追踪服务器环境的测试与演示。

use std::collections::VecDeque;

use contracts::{
    ContractError, FrameCallback, FrameSource, LabelledMarker, MocapFrame, Quaternion, RigidBody,
    StopHandle, Vector3,
};
use tracing::{debug, trace, warn};

/// The frame delivered by `FakeFrameSource::single_frame`
///
/// One rigid body at the origin, one standalone marker and one marker owned
/// by model 7.
pub fn canned_frame() -> MocapFrame {
    MocapFrame::new(1.0)
        .with_rigid_bodies(vec![RigidBody {
            position: Vector3::default(),
            orientation: Quaternion::IDENTITY,
        }])
        .with_markers(vec![
            LabelledMarker {
                marker_id: 1,
                model_id: LabelledMarker::NO_MODEL,
                position: Vector3::splat(1.0),
                size: 0.1,
            },
            LabelledMarker {
                marker_id: 2,
                model_id: 7,
                position: Vector3::splat(2.0),
                size: 0.3,
            },
        ])
}

/// Source that replays a fixed list of frames, then returns from `spin`
pub struct FakeFrameSource {
    name: String,
    frames: VecDeque<MocapFrame>,
    callback: Option<FrameCallback>,
    stop: StopHandle,
}

impl FakeFrameSource {
    pub fn new(frames: impl IntoIterator<Item = MocapFrame>) -> Self {
        Self {
            name: "fake".to_string(),
            frames: frames.into_iter().collect(),
            callback: None,
            stop: StopHandle::new(),
        }
    }

    /// Source delivering exactly one `canned_frame()`
    pub fn single_frame() -> Self {
        Self::new([canned_frame()])
    }

    /// Frames not yet delivered
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl FrameSource for FakeFrameSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_callback(&mut self, callback: FrameCallback) {
        self.callback = Some(callback);
    }

    fn spin(&mut self) -> Result<(), ContractError> {
        let Some(callback) = self.callback.as_mut() else {
            warn!(source = %self.name, "spin called without a callback, frames discarded");
            self.frames.clear();
            return Ok(());
        };

        debug!(source = %self.name, frames = self.frames.len(), "fake source started");

        while !self.stop.is_stopped() {
            let Some(frame) = self.frames.pop_front() else {
                break;
            };
            trace!(source = %self.name, t = frame.timestamp, "fake frame delivered");
            callback(&frame);
        }

        debug!(source = %self.name, "fake source finished");
        Ok(())
    }

    fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }
}
