use std::time::Instant;

pub type FrameId = u64;

pub const DEFAULT_CEILING_SECS: f64 = 2.0;

/// Source of render-frame callbacks.
///
/// Every requested frame is eventually delivered back to
/// [`StalenessTimer::on_frame`] with its id unless it was cancelled first.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameId;
    fn cancel_frame(&mut self, id: FrameId);
}

/// Countdown showing how long ago the last snapshot landed.
///
/// At most one frame is pending at a time. The loop stops by itself once the
/// countdown reaches zero and is restarted by [`StalenessTimer::reset`].
#[derive(Debug, Clone)]
pub struct StalenessTimer {
    ceiling: f64,
    remaining: f64,
    last_frame: Option<Instant>,
    pending: Option<FrameId>,
}

impl StalenessTimer {
    pub fn new(ceiling_secs: f64) -> Self {
        Self {
            ceiling: ceiling_secs,
            remaining: ceiling_secs,
            last_frame: None,
            pending: None,
        }
    }

    pub fn remaining(&self) -> f64 {
        self.remaining
    }

    pub fn progress(&self) -> f64 {
        ((self.ceiling - self.remaining) / self.ceiling).clamp(0.0, 1.0)
    }

    pub fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    pub fn pending_frame(&self) -> Option<FrameId> {
        self.pending
    }

    pub fn reset(&mut self, frames: &mut impl FrameScheduler) {
        self.remaining = self.ceiling;
        self.last_frame = None;
        if let Some(id) = self.pending.take() {
            frames.cancel_frame(id);
        }
        self.pending = Some(frames.request_frame());
    }

    /// Returns false for frames that are not the pending one.
    pub fn on_frame(&mut self, id: FrameId, at: Instant, frames: &mut impl FrameScheduler) -> bool {
        if self.pending != Some(id) {
            return false;
        }
        self.pending = None;

        // First frame after a reset only anchors the clock.
        let Some(previous) = self.last_frame.replace(at) else {
            self.pending = Some(frames.request_frame());
            return true;
        };

        let elapsed = at.saturating_duration_since(previous).as_secs_f64();
        self.remaining = (self.remaining - elapsed).max(0.0);

        if self.remaining <= 0.0 {
            self.remaining = 0.0;
            self.last_frame = None;
        } else {
            self.pending = Some(frames.request_frame());
        }
        true
    }
}

impl Default for StalenessTimer {
    fn default() -> Self {
        Self::new(DEFAULT_CEILING_SECS)
    }
}

/// Frame source driven by hand.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct ManualFrames {
    next: FrameId,
    pub(crate) live: Vec<FrameId>,
    pub(crate) cancelled: Vec<FrameId>,
}

#[cfg(test)]
impl ManualFrames {
    pub(crate) fn latest(&self) -> Option<FrameId> {
        self.live.last().copied()
    }
}

#[cfg(test)]
impl FrameScheduler for ManualFrames {
    fn request_frame(&mut self) -> FrameId {
        self.next += 1;
        self.live.push(self.next);
        self.next
    }

    fn cancel_frame(&mut self, id: FrameId) {
        self.live.retain(|live| *live != id);
        self.cancelled.push(id);
    }
}
