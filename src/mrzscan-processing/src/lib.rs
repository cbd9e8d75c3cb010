//! mrzscan-processing - Pixel stages of the MRZ pipeline
//!
//! Turns a raw camera frame into an upright bitmap and cuts out the band
//! where a passport's machine-readable zone is expected.

pub mod convert;
pub mod cutout;
pub mod error;
pub mod rotate;

pub use convert::frame_to_image;
pub use cutout::{crop_to_cutout, cutout_region, CutoutRegion, DOCUMENT_FRAME_RATIO};
pub use error::{ProcessingError, Result};
pub use rotate::rotate;
