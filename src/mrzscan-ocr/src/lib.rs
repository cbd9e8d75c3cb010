//! OCR for mrzscan
//!
//! This crate wraps the OCR engine capability the scanner consumes, ships a
//! Tesseract command-line adapter for it, resolves the OCR-B trained data the
//! engine needs, and isolates MRZ lines from noisy recognizer output.

mod assets;
mod engine;
mod error;
mod mrz;
mod processor;

pub use assets::{AssetProvider, BundledAssets, TRAINED_DATA_DIR};
pub use engine::{OcrEngine, SegmentationMode, TesseractEngine, TesseractSession};
pub use error::{OcrError, Result};
pub use mrz::{extract_mrz, MrzText};
pub use processor::TextRecognizer;

/// Tesseract language id of the OCR-B model used for MRZ text
pub const DEFAULT_LANGUAGE: &str = "ocrb";

/// File name of the trained data for [`DEFAULT_LANGUAGE`]
pub fn trained_data_name(language: &str) -> String {
    format!("{}.traineddata", language)
}
