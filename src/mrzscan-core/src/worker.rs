//! Single-slot analysis worker
//!
//! One dedicated thread takes frames from a keep-only-latest slot and runs
//! the pipeline on them one at a time. Frames arriving mid-run replace each
//! other in the slot, so at most one frame ever waits. Results go to the
//! sink in the order runs complete.

use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, trace};

use mrzscan_capture::{FrameSink, LatestFrameSlot, SlotStats};
use mrzscan_ocr::OcrEngine;

use crate::events::{ErrorKind, PipelineResult, ResultSink};
use crate::pipeline::Pipeline;

/// Where the worker is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle = 0,
    Analyzing = 1,
    Dispatching = 2,
}

impl PipelineState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => PipelineState::Analyzing,
            2 => PipelineState::Dispatching,
            _ => PipelineState::Idle,
        }
    }
}

#[derive(Debug, Default)]
struct WorkerStats {
    state: AtomicU8,
    runs_started: AtomicU64,
    runs_completed: AtomicU64,
    runs_failed: AtomicU64,
}

/// Snapshot of worker and slot counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerCounters {
    pub runs_started: u64,
    pub runs_completed: u64,
    pub runs_failed: u64,
    pub frames: SlotStats,
}

/// Handle to a running analysis thread
pub struct AnalysisWorker {
    slot: Arc<LatestFrameSlot>,
    stats: Arc<WorkerStats>,
    handle: Option<JoinHandle<()>>,
}

impl AnalysisWorker {
    /// Spawn the worker thread with a fresh, empty slot
    pub fn spawn<E>(pipeline: Arc<Pipeline<E>>, sink: Arc<dyn ResultSink>) -> io::Result<Self>
    where
        E: OcrEngine + 'static,
    {
        let slot = Arc::new(LatestFrameSlot::new());
        let stats = Arc::new(WorkerStats::default());

        let thread_slot = slot.clone();
        let thread_stats = stats.clone();
        let handle = thread::Builder::new()
            .name("mrz-analysis".into())
            .spawn(move || run_loop(&thread_slot, &pipeline, sink.as_ref(), &thread_stats))?;

        debug!("analysis worker started");
        Ok(Self {
            slot,
            stats,
            handle: Some(handle),
        })
    }

    /// Delivery handle for a frame source
    pub fn frame_sink(&self) -> FrameSink {
        self.slot.sink()
    }

    /// Stop accepting frames; the pending frame, if any, is released
    pub fn close(&self) {
        self.slot.close();
    }

    /// Wait for the in-flight run, if any, to be dispatched and the thread
    /// to exit. Closes the slot first.
    pub fn join(&mut self) {
        self.slot.close();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!("analysis worker thread panicked");
            }
            debug!("analysis worker stopped");
        }
    }

    /// True once the thread has exited
    pub fn is_finished(&self) -> bool {
        self.handle
            .as_ref()
            .map(|handle| handle.is_finished())
            .unwrap_or(true)
    }

    /// Current pipeline state; Idle between runs and after exit
    pub fn state(&self) -> PipelineState {
        self.stats.state()
    }

    pub fn counters(&self) -> WorkerCounters {
        WorkerCounters {
            runs_started: self.stats.runs_started.load(Ordering::SeqCst),
            runs_completed: self.stats.runs_completed.load(Ordering::SeqCst),
            runs_failed: self.stats.runs_failed.load(Ordering::SeqCst),
            frames: self.slot.stats(),
        }
    }
}

impl Drop for AnalysisWorker {
    fn drop(&mut self) {
        self.join();
    }
}

fn run_loop<E: OcrEngine>(
    slot: &LatestFrameSlot,
    pipeline: &Pipeline<E>,
    sink: &dyn ResultSink,
    stats: &WorkerStats,
) {
    while let Some(frame) = slot.take() {
        stats.transition(PipelineState::Analyzing);
        stats.runs_started.fetch_add(1, Ordering::SeqCst);
        trace!("analyzing {}x{} frame", frame.width, frame.height);

        let result = panic::catch_unwind(AssertUnwindSafe(|| pipeline.analyze(frame)))
            .unwrap_or_else(|payload| {
                PipelineResult::failed(
                    ErrorKind::DecodeFailure,
                    format!("analysis panicked: {}", panic_message(payload.as_ref())),
                )
            });

        if let PipelineResult::Failed { kind, message } = &result {
            error!("image analysis failed ({}): {}", kind, message);
            stats.runs_failed.fetch_add(1, Ordering::SeqCst);
        }

        stats.transition(PipelineState::Dispatching);
        sink.dispatch(result.into());
        stats.transition(PipelineState::Idle);
        stats.runs_completed.fetch_add(1, Ordering::SeqCst);
    }

    info!(
        "analysis worker exiting after {} runs",
        stats.runs_completed.load(Ordering::SeqCst)
    );
}

impl WorkerStats {
    fn state(&self) -> PipelineState {
        PipelineState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn transition(&self, to: PipelineState) {
        let from = PipelineState::from_u8(self.state.swap(to as u8, Ordering::SeqCst));
        trace!("pipeline {:?} -> {:?}", from, to);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
