//! Scanner configuration
//!
//! TOML file with `[ocr]`, `[assets]` and `[capture]` sections. Every field
//! has a default, so an empty file (or no file) is a valid configuration.

use anyhow::{Context, Result};
use mrzscan_capture::ReplayConfig;
use mrzscan_ocr::{BundledAssets, SegmentationMode, DEFAULT_LANGUAGE, TRAINED_DATA_DIR};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::session::ScannerOptions;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default)]
    pub ocr: OcrConfig,

    #[serde(default)]
    pub assets: AssetsConfig,

    #[serde(default)]
    pub capture: CaptureConfig,
}

/// Recognizer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Trained data name without extension
    #[serde(default = "default_language")]
    pub language: String,

    /// Tesseract executable (None = look up `tesseract` on PATH)
    pub tesseract_path: Option<PathBuf>,

    #[serde(default)]
    pub segmentation: SegmentationMode,
}

/// Trained data locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Directory shipping `<language>.traineddata`
    #[serde(default = "default_bundle_dir")]
    pub bundle_dir: PathBuf,

    /// Writable cache root (None = platform cache directory)
    pub cache_dir: Option<PathBuf>,
}

/// Frame replay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "default_fps")]
    pub fps: f64,

    #[serde(default)]
    pub rotation_degrees: i32,

    #[serde(default)]
    pub repeat: bool,
}

fn default_language() -> String { DEFAULT_LANGUAGE.to_string() }
fn default_bundle_dir() -> PathBuf { PathBuf::from(TRAINED_DATA_DIR) }
fn default_fps() -> f64 { 15.0 }

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            tesseract_path: None,
            segmentation: SegmentationMode::default(),
        }
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            bundle_dir: default_bundle_dir(),
            cache_dir: None,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            rotation_degrees: 0,
            repeat: false,
        }
    }
}

impl ScannerConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        toml::from_str(&content).context("Failed to parse config TOML")
    }

    /// Load from `path` when given, defaults otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Resolve cache directory with fallback to the platform default
    pub fn resolve_cache_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.assets.cache_dir {
            dir.clone()
        } else {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("mrzscan")
        }
    }

    pub fn scanner_options(&self) -> ScannerOptions {
        ScannerOptions {
            language: self.ocr.language.clone(),
            segmentation: self.ocr.segmentation,
        }
    }

    pub fn bundled_assets(&self) -> BundledAssets {
        BundledAssets::new(self.assets.bundle_dir.clone(), self.resolve_cache_dir())
    }

    /// Replay of `frames_dir` using the `[capture]` settings
    pub fn replay_config(&self, frames_dir: impl Into<PathBuf>) -> ReplayConfig {
        ReplayConfig {
            fps: self.capture.fps,
            rotation_degrees: self.capture.rotation_degrees,
            repeat: self.capture.repeat,
            ..ReplayConfig::new(frames_dir)
        }
    }
}
