use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("unsupported frame format {format}: {message}")]
    UnsupportedFormat { format: String, message: String },

    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    #[error("image processing error: {0}")]
    ImageError(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, ProcessingError>;
