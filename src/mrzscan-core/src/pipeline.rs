//! Frame-to-MRZ pipeline

use mrzscan_capture::Frame;
use mrzscan_ocr::{extract_mrz, OcrEngine, TextRecognizer};
use mrzscan_processing::{crop_to_cutout, frame_to_image, rotate};
use tracing::debug;

use crate::events::{ErrorKind, PipelineResult};

/// Converts, straightens, crops, recognizes, and isolates the MRZ of a frame
pub struct Pipeline<E> {
    recognizer: TextRecognizer<E>,
    crop_to_mrz: bool,
}

impl<E: OcrEngine> Pipeline<E> {
    pub fn new(recognizer: TextRecognizer<E>) -> Self {
        Self {
            recognizer,
            crop_to_mrz: true,
        }
    }

    /// Crop the whole document instead of the MRZ band
    pub fn with_mrz_crop(mut self, crop_to_mrz: bool) -> Self {
        self.crop_to_mrz = crop_to_mrz;
        self
    }

    pub fn recognizer(&self) -> &TextRecognizer<E> {
        &self.recognizer
    }

    /// Run every stage on `frame`
    ///
    /// The frame is released as soon as it has been decoded. OCR failures
    /// yield an empty MRZ; only undecodable frames fail.
    pub fn analyze(&self, frame: Frame) -> PipelineResult {
        let rotation = frame.rotation_degrees;
        let decoded = frame_to_image(&frame);
        drop(frame);

        let bitmap = match decoded {
            Ok(bitmap) => bitmap,
            Err(e) => return PipelineResult::failed(ErrorKind::DecodeFailure, e.to_string()),
        };

        let upright = rotate(&bitmap, rotation);
        let cutout = crop_to_cutout(&upright, self.crop_to_mrz);
        let raw = self.recognizer.recognize(&cutout);
        let mrz = extract_mrz(&raw);

        debug!(
            "analysis done: {}x{} cutout, {} raw lines, {} MRZ lines",
            cutout.width(),
            cutout.height(),
            raw.lines().count(),
            mrz.lines().len()
        );
        PipelineResult::Parsed(mrz)
    }
}
