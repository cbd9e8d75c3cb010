use crate::engine::{OcrEngine, SegmentationMode};
use crate::error::{OcrError, Result};
use image::DynamicImage;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Runs one OCR engine lifecycle per bitmap: configure, recognize, release
///
/// Nothing carries over from one recognition to the next. Recognition
/// failures are not errors for the caller: noisy or unreadable input simply
/// yields no text.
pub struct TextRecognizer<E> {
    engine: E,
    data_dir: Option<PathBuf>,
    language: String,
    mode: SegmentationMode,
}

impl<E: OcrEngine> TextRecognizer<E> {
    /// `data_dir` is None when trained data could not be resolved; every
    /// recognition then degrades to empty text
    pub fn new(engine: E, data_dir: Option<PathBuf>, language: impl Into<String>) -> Self {
        Self {
            engine,
            data_dir,
            language: language.into(),
            mode: SegmentationMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: SegmentationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn mode(&self) -> SegmentationMode {
        self.mode
    }

    /// Recognize `image`, surfacing engine failures
    pub fn try_recognize(&self, image: &DynamicImage) -> Result<String> {
        let data_dir = self
            .data_dir
            .as_deref()
            .ok_or_else(|| OcrError::EngineInitFailed("trained data unavailable".into()))?;

        let mut handle = self.engine.configure(data_dir, &self.language, self.mode)?;
        let text = self.engine.recognize(&mut handle, image);
        self.engine.release(handle);
        text
    }

    /// Recognize `image`, treating any engine failure as empty text
    pub fn recognize(&self, image: &DynamicImage) -> String {
        self.try_recognize(image).unwrap_or_else(|e| {
            warn!("OCR failed, continuing with empty text: {}", e);
            String::new()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingEngine {
        fail_recognize: bool,
        configured: AtomicUsize,
        released: AtomicUsize,
    }

    impl OcrEngine for CountingEngine {
        type Handle = SegmentationMode;

        fn configure(&self, _: &Path, _: &str, mode: SegmentationMode) -> Result<Self::Handle> {
            self.configured.fetch_add(1, Ordering::SeqCst);
            Ok(mode)
        }

        fn recognize(&self, mode: &mut Self::Handle, _: &DynamicImage) -> Result<String> {
            if self.fail_recognize {
                return Err(OcrError::ProcessingError("engine crashed".into()));
            }
            Ok(format!("psm {}", mode.psm()))
        }

        fn release(&self, _: Self::Handle) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn bitmap() -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::new(4, 4))
    }

    #[test]
    fn test_lifecycle_per_recognition() {
        let recognizer =
            TextRecognizer::new(CountingEngine::default(), Some(PathBuf::from("tessdata")), "ocrb");

        assert_eq!(recognizer.recognize(&bitmap()), "psm 6");
        assert_eq!(recognizer.recognize(&bitmap()), "psm 6");
        assert_eq!(recognizer.engine().configured.load(Ordering::SeqCst), 2);
        assert_eq!(recognizer.engine().released.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_engine_failure_becomes_empty_text() {
        let engine = CountingEngine {
            fail_recognize: true,
            ..Default::default()
        };
        let recognizer = TextRecognizer::new(engine, Some(PathBuf::from("tessdata")), "ocrb");

        assert!(recognizer.try_recognize(&bitmap()).is_err());
        assert_eq!(recognizer.recognize(&bitmap()), "");
        // The handle is released even when recognition fails
        assert_eq!(recognizer.engine().released.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_missing_trained_data_degrades() {
        let recognizer = TextRecognizer::new(CountingEngine::default(), None, "ocrb")
            .with_mode(SegmentationMode::SingleLine);

        assert_eq!(recognizer.language(), "ocrb");
        assert_eq!(recognizer.mode(), SegmentationMode::SingleLine);
        assert!(recognizer.data_dir().is_none());
        assert_eq!(recognizer.recognize(&bitmap()), "");
        assert_eq!(recognizer.engine().configured.load(Ordering::SeqCst), 0);
    }
}
