//! mrzscan-capture - Frame delivery for mrzscan
//!
//! Defines the camera frame model, the keep-only-latest frame slot that
//! bounds pending work to a single frame, and the `FrameSource` capability
//! hosts implement to feed the scanner.

pub mod error;
pub mod frame;
pub mod replay;
pub mod slot;
pub mod source;

pub use error::CaptureError;
pub use frame::{Frame, FrameFormat, Plane};
pub use replay::{DirectorySource, ReplayConfig};
pub use slot::{FrameSink, LatestFrameSlot, Offer, SlotStats};
pub use source::{FrameSource, LensFacing, SourceConfig};
