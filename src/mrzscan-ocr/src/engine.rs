use crate::error::{OcrError, Result};
use crate::trained_data_name;
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

/// Page layout assumption handed to the recognizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentationMode {
    /// Fully automatic page segmentation
    Auto,
    /// Single column of text of variable sizes
    SingleColumn,
    /// Single uniform block of text, the MRZ case
    #[default]
    SingleBlock,
    /// Single text line
    SingleLine,
    /// As much text as possible, in no particular order
    SparseText,
}

impl SegmentationMode {
    /// Tesseract page segmentation mode number
    pub fn psm(self) -> u8 {
        match self {
            SegmentationMode::Auto => 3,
            SegmentationMode::SingleColumn => 4,
            SegmentationMode::SingleBlock => 6,
            SegmentationMode::SingleLine => 7,
            SegmentationMode::SparseText => 11,
        }
    }
}

/// OCR engine capability
///
/// A handle is configured for one recognition, used, then released. Engines
/// are free to keep nothing between handles.
pub trait OcrEngine: Send + Sync {
    type Handle;

    /// Prepare a handle for `language` using trained data from `data_dir`
    fn configure(
        &self,
        data_dir: &Path,
        language: &str,
        mode: SegmentationMode,
    ) -> Result<Self::Handle>;

    /// Recognize the text in `image`, lines separated by `\n`
    fn recognize(&self, handle: &mut Self::Handle, image: &DynamicImage) -> Result<String>;

    /// Dispose of a handle
    fn release(&self, handle: Self::Handle);
}

/// OCR engine driving the `tesseract` executable
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    executable: PathBuf,
}

/// Settings of one configured tesseract invocation
#[derive(Debug, Clone)]
pub struct TesseractSession {
    tessdata_dir: PathBuf,
    language: String,
    mode: SegmentationMode,
}

impl TesseractEngine {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Use `executable` when given, otherwise `tesseract` from PATH
    pub fn with_executable(executable: Option<PathBuf>) -> Self {
        Self::new(executable.unwrap_or_else(|| PathBuf::from("tesseract")))
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// First line of `tesseract --version`
    pub fn version(&self) -> Result<String> {
        let output = Command::new(&self.executable)
            .arg("--version")
            .output()
            .map_err(|e| {
                OcrError::EngineInitFailed(format!(
                    "failed to run {}: {}",
                    self.executable.display(),
                    e
                ))
            })?;

        // Older releases print the banner on stderr
        let banner = if output.stdout.is_empty() {
            output.stderr
        } else {
            output.stdout
        };
        Ok(String::from_utf8_lossy(&banner)
            .lines()
            .next()
            .unwrap_or_default()
            .trim()
            .to_string())
    }

    /// Normalize recognizer output to `\n`-separated lines without the
    /// trailing newline and page separator tesseract appends
    fn normalize_output(raw: &[u8]) -> String {
        String::from_utf8_lossy(raw)
            .replace("\r\n", "\n")
            .trim_end()
            .to_string()
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::with_executable(None)
    }
}

impl OcrEngine for TesseractEngine {
    type Handle = TesseractSession;

    fn configure(
        &self,
        data_dir: &Path,
        language: &str,
        mode: SegmentationMode,
    ) -> Result<TesseractSession> {
        let trained_data = data_dir.join(trained_data_name(language));
        if !trained_data.is_file() {
            return Err(OcrError::EngineInitFailed(format!(
                "trained data not found at {}",
                trained_data.display()
            )));
        }

        debug!("configured tesseract for '{}' (psm {})", language, mode.psm());
        Ok(TesseractSession {
            tessdata_dir: data_dir.to_path_buf(),
            language: language.to_string(),
            mode,
        })
    }

    fn recognize(&self, session: &mut TesseractSession, image: &DynamicImage) -> Result<String> {
        debug!(
            "starting OCR recognition on {}x{} bitmap",
            image.width(),
            image.height()
        );

        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        let mut child = Command::new(&self.executable)
            .arg("stdin")
            .arg("stdout")
            .arg("--tessdata-dir")
            .arg(&session.tessdata_dir)
            .arg("-l")
            .arg(&session.language)
            .arg("--psm")
            .arg(session.mode.psm().to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| OcrError::ProcessingError(format!("failed to spawn tesseract: {}", e)))?;

        // Tesseract may exit before reading its input (bad trained data), so
        // the child is reaped and its stderr preferred over the write error
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(&png),
            None => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "failed to open tesseract stdin",
            )),
        };

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(OcrError::ProcessingError(format!(
                "tesseract exited with {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        written?;

        let text = Self::normalize_output(&output.stdout);
        debug!("OCR completed: {} lines", text.lines().count());
        Ok(text)
    }

    fn release(&self, session: TesseractSession) {
        debug!("released tesseract session for '{}'", session.language);
    }
}
