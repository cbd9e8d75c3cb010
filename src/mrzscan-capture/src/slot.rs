//! Keep-only-latest frame hand-off
//!
//! A source may produce frames far faster than OCR can consume them. The slot
//! holds at most one pending frame: offering a new frame releases the one
//! waiting, so a slow consumer always starts its next run on the most recent
//! frame and nothing is ever queued behind it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use tracing::trace;

use crate::frame::Frame;

/// Outcome of offering a frame to the slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    /// Slot was empty, frame is now pending
    Accepted,
    /// An older pending frame was dropped in favour of this one
    Superseded,
    /// Slot no longer accepts frames, the frame was dropped
    Closed,
}

/// Counters describing how frames moved through the slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlotStats {
    pub offered: u64,
    pub superseded: u64,
    pub rejected: u64,
}

struct SlotState {
    pending: Option<Frame>,
    accepting: bool,
}

/// Single-frame mailbox between a frame source and the analysis worker
pub struct LatestFrameSlot {
    state: Mutex<SlotState>,
    ready: Condvar,
    offered: AtomicU64,
    superseded: AtomicU64,
    rejected: AtomicU64,
}

impl LatestFrameSlot {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(SlotState {
                pending: None,
                accepting: true,
            }),
            ready: Condvar::new(),
            offered: AtomicU64::new(0),
            superseded: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
        }
    }

    /// Handle for a frame source delivering into this slot
    pub fn sink(self: &Arc<Self>) -> FrameSink {
        FrameSink { slot: self.clone() }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        // Frames are plain data, a poisoned lock leaves nothing half-updated
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Make `frame` the pending frame, releasing any older one
    pub fn offer(&self, frame: Frame) -> Offer {
        self.offered.fetch_add(1, Ordering::Relaxed);
        let mut state = self.lock();

        if !state.accepting {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            return Offer::Closed;
        }

        let outcome = match state.pending.replace(frame) {
            Some(stale) => {
                trace!("dropping stale frame from {}", stale.timestamp);
                self.superseded.fetch_add(1, Ordering::Relaxed);
                Offer::Superseded
            }
            None => Offer::Accepted,
        };
        drop(state);

        self.ready.notify_one();
        outcome
    }

    /// Block until a frame is pending, or return None once the slot is
    /// closed or finished and drained
    pub fn take(&self) -> Option<Frame> {
        let mut state = self.lock();
        loop {
            if let Some(frame) = state.pending.take() {
                return Some(frame);
            }
            if !state.accepting {
                return None;
            }
            state = self.ready.wait(state).unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Stop accepting frames and release the pending one
    pub fn close(&self) {
        let mut state = self.lock();
        state.accepting = false;
        let dropped = state.pending.take();
        drop(state);

        if dropped.is_some() {
            self.superseded.fetch_add(1, Ordering::Relaxed);
        }
        self.ready.notify_all();
    }

    /// Stop accepting frames but leave the pending one to be taken
    pub fn finish(&self) {
        self.lock().accepting = false;
        self.ready.notify_all();
    }

    pub fn is_open(&self) -> bool {
        self.lock().accepting
    }

    pub fn has_pending(&self) -> bool {
        self.lock().pending.is_some()
    }

    pub fn stats(&self) -> SlotStats {
        SlotStats {
            offered: self.offered.load(Ordering::Relaxed),
            superseded: self.superseded.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }
}

impl Default for LatestFrameSlot {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable delivery handle given to a frame source
#[derive(Clone)]
pub struct FrameSink {
    slot: Arc<LatestFrameSlot>,
}

impl FrameSink {
    pub fn offer(&self, frame: Frame) -> Offer {
        self.slot.offer(frame)
    }

    /// Signal that no more frames will be delivered
    pub fn finish(&self) {
        self.slot.finish();
    }

    pub fn is_open(&self) -> bool {
        self.slot.is_open()
    }
}
