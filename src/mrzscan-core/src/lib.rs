//! mrzscan core library
//!
//! Sequences the frame-to-text pipeline, serializes analysis onto a single
//! worker, and exposes the scanner session a host drives.

pub mod colored_logger;
pub mod config;
pub mod error;
pub mod events;
pub mod photo;
pub mod pipeline;
pub mod session;
pub mod worker;

pub use error::ScanError;
pub use events::{ErrorKind, PipelineResult, ResultSink, ScanEvent};
pub use pipeline::Pipeline;
pub use session::{ScannerOptions, ScannerSession, SessionConfig, SessionPhase};
pub use worker::{AnalysisWorker, PipelineState, WorkerCounters};
