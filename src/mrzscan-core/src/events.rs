//! Results and errors delivered to the host

use mrzscan_ocr::MrzText;
use serde::Serialize;
use std::fmt;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Category of a reported failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Trained data missing or unreadable
    InitializationFailure,
    /// Frame source could not start
    SourceBindingFailure,
    /// A frame could not be turned into a bitmap
    DecodeFailure,
    /// OCR engine error
    EngineFailure,
    /// One-shot photo capture failed
    CaptureFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InitializationFailure => "initialization failure",
            ErrorKind::SourceBindingFailure => "source binding failure",
            ErrorKind::DecodeFailure => "decode failure",
            ErrorKind::EngineFailure => "engine failure",
            ErrorKind::CaptureFailure => "capture failure",
        };
        f.write_str(name)
    }
}

/// Outcome of analyzing one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineResult {
    Parsed(MrzText),
    Failed { kind: ErrorKind, message: String },
}

impl PipelineResult {
    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        PipelineResult::Failed {
            kind,
            message: message.into(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, PipelineResult::Failed { .. })
    }
}

/// Event delivered to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ScanEvent {
    Parsed { mrz: MrzText },
    Error { kind: ErrorKind, message: String },
}

impl ScanEvent {
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        ScanEvent::Error {
            kind,
            message: message.into(),
        }
    }
}

impl From<PipelineResult> for ScanEvent {
    fn from(result: PipelineResult) -> Self {
        match result {
            PipelineResult::Parsed(mrz) => ScanEvent::Parsed { mrz },
            PipelineResult::Failed { kind, message } => ScanEvent::Error { kind, message },
        }
    }
}

/// Receiver side of scanner events
///
/// Called from the analysis worker and from session methods; implementations
/// hand the event over to whatever context the host consumes results on.
pub trait ResultSink: Send + Sync {
    fn dispatch(&self, event: ScanEvent);
}

impl ResultSink for UnboundedSender<ScanEvent> {
    fn dispatch(&self, event: ScanEvent) {
        if self.send(event).is_err() {
            debug!("event receiver dropped, discarding event");
        }
    }
}
