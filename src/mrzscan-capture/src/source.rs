//! Frame source capability consumed by the scanner

use crate::error::CaptureError;
use crate::slot::FrameSink;

/// Which camera a source should bind to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LensFacing {
    #[default]
    Back,
    Front,
}

/// Settings applied when a source is bound
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceConfig {
    pub lens_facing: LensFacing,
    /// Illumination state to restore once bound
    pub torch: bool,
}

/// A producer of camera frames
///
/// Implementations deliver frames asynchronously through the given sink and
/// must not block the caller of `start`. Backpressure is the sink's job:
/// offering a frame while an older one is still pending replaces it.
pub trait FrameSource: Send {
    /// Bind the source and begin delivering frames
    fn start(&mut self, config: &SourceConfig, sink: FrameSink) -> Result<(), CaptureError>;

    /// Halt delivery. Safe to call when not started.
    fn stop(&mut self);

    /// Switch the illumination on or off
    fn set_torch(&mut self, on: bool) -> Result<(), CaptureError>;

    /// One-shot full resolution capture, returned as a compressed image
    fn capture_still(&mut self) -> Result<Vec<u8>, CaptureError>;
}
