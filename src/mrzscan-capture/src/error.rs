//! Capture error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("frame source could not be bound: {0}")]
    Binding(String),

    #[error("no frames available in {0}")]
    NoFrames(String),

    #[error("still capture failed: {0}")]
    StillCapture(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
