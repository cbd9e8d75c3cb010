use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("failed to initialize OCR engine: {0}")]
    EngineInitFailed(String),

    #[error("OCR processing error: {0}")]
    ProcessingError(String),

    #[error("asset {name} unavailable: {message}")]
    AssetUnavailable { name: String, message: String },

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("image processing error: {0}")]
    ImageError(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, OcrError>;
