//! Scanner error types

use mrzscan_capture::CaptureError;
use mrzscan_ocr::OcrError;
use mrzscan_processing::ProcessingError;
use thiserror::Error;

use crate::events::ErrorKind;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to initialize OCR: {0}")]
    Initialization(#[from] OcrError),

    #[error("camera binding failed: {0}")]
    SourceBinding(#[from] CaptureError),

    #[error("image analysis failed: {0}")]
    Decode(#[from] ProcessingError),

    #[error("photo capture failed: {0}")]
    Capture(String),
}

impl ScanError {
    /// Error kind reported to the host
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScanError::Initialization(_) => ErrorKind::InitializationFailure,
            ScanError::SourceBinding(_) => ErrorKind::SourceBindingFailure,
            ScanError::Decode(_) => ErrorKind::DecodeFailure,
            ScanError::Capture(_) => ErrorKind::CaptureFailure,
        }
    }
}
