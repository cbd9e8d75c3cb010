//! Directory replay frame source
//!
//! Feeds image files from a directory as if they were camera frames. Used by
//! the CLI and handy for reproducing recognition problems from saved shots.

use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::CaptureError;
use crate::frame::Frame;
use crate::slot::{FrameSink, Offer};
use crate::source::{FrameSource, SourceConfig};

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// Directory replay configuration
#[derive(Debug, Clone)]
pub struct ReplayConfig {
    pub frames_dir: PathBuf,
    /// Delivery rate in frames per second
    pub fps: f64,
    /// Rotation metadata attached to every frame
    pub rotation_degrees: i32,
    /// Start over after the last file instead of finishing
    pub repeat: bool,
}

impl ReplayConfig {
    pub fn new(frames_dir: impl Into<PathBuf>) -> Self {
        Self {
            frames_dir: frames_dir.into(),
            fps: 15.0,
            rotation_degrees: 0,
            repeat: false,
        }
    }

    fn frame_interval(&self) -> Duration {
        if self.fps > 0.0 {
            Duration::from_secs_f64(1.0 / self.fps)
        } else {
            Duration::ZERO
        }
    }
}

/// List replayable image files in `dir`, sorted by file name
pub fn list_frames(dir: &Path) -> Result<Vec<PathBuf>, CaptureError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Read an image file into an encoded frame
pub fn load_frame(path: &Path, rotation_degrees: i32) -> Result<Frame, CaptureError> {
    let bytes = fs::read(path)?;
    let (width, height) = image::ImageReader::new(Cursor::new(&bytes))
        .with_guessed_format()?
        .into_dimensions()?;
    Ok(Frame::encoded(bytes, width, height, rotation_degrees))
}

/// Frame source replaying image files from a directory
pub struct DirectorySource {
    config: ReplayConfig,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    last_delivered: Arc<Mutex<Option<PathBuf>>>,
    torch: bool,
}

impl DirectorySource {
    pub fn new(config: ReplayConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
            last_delivered: Arc::new(Mutex::new(None)),
            torch: false,
        }
    }

    pub fn torch(&self) -> bool {
        self.torch
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn replay_loop(
        files: Vec<PathBuf>,
        config: ReplayConfig,
        sink: FrameSink,
        running: Arc<AtomicBool>,
        last_delivered: Arc<Mutex<Option<PathBuf>>>,
    ) {
        let interval = config.frame_interval();
        let mut delivered = 0u64;

        'replay: loop {
            for path in &files {
                if !running.load(Ordering::SeqCst) || !sink.is_open() {
                    break 'replay;
                }
                let started = Instant::now();

                match load_frame(path, config.rotation_degrees) {
                    Ok(frame) => {
                        if sink.offer(frame) == Offer::Closed {
                            break 'replay;
                        }
                        delivered += 1;
                        *last_delivered.lock().unwrap_or_else(|e| e.into_inner()) = Some(path.clone());
                    }
                    Err(e) => warn!("skipping unreadable frame {:?}: {}", path, e),
                }

                let elapsed = started.elapsed();
                if elapsed < interval {
                    thread::park_timeout(interval - elapsed);
                }
            }

            if !config.repeat {
                break;
            }
        }

        debug!("replay delivered {} frames", delivered);
        sink.finish();
        running.store(false, Ordering::SeqCst);
    }
}

impl FrameSource for DirectorySource {
    fn start(&mut self, config: &SourceConfig, sink: FrameSink) -> Result<(), CaptureError> {
        self.stop();

        let files = list_frames(&self.config.frames_dir).map_err(|e| {
            CaptureError::Binding(format!("{}: {}", self.config.frames_dir.display(), e))
        })?;
        if files.is_empty() {
            return Err(CaptureError::NoFrames(
                self.config.frames_dir.display().to_string(),
            ));
        }

        info!(
            "replaying {} frames from {:?} at {} fps ({:?} lens)",
            files.len(),
            self.config.frames_dir,
            self.config.fps,
            config.lens_facing
        );

        if config.torch {
            self.set_torch(true)?;
        }

        self.running.store(true, Ordering::SeqCst);
        let replay_config = self.config.clone();
        let running = self.running.clone();
        let last_delivered = self.last_delivered.clone();

        let handle = thread::Builder::new()
            .name("mrz-replay".into())
            .spawn(move || Self::replay_loop(files, replay_config, sink, running, last_delivered))
            .map_err(|e| CaptureError::Binding(format!("failed to spawn replay thread: {}", e)))?;
        self.worker = Some(handle);

        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.worker.take() {
            handle.thread().unpark();
            if handle.join().is_err() {
                warn!("replay thread panicked");
            }
            debug!("replay source stopped");
        }
    }

    fn set_torch(&mut self, on: bool) -> Result<(), CaptureError> {
        self.torch = on;
        info!("torch {}", if on { "on" } else { "off" });
        Ok(())
    }

    fn capture_still(&mut self) -> Result<Vec<u8>, CaptureError> {
        let last = self
            .last_delivered
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        let path = match last {
            Some(path) => path,
            None => list_frames(&self.config.frames_dir)
                .map_err(|e| CaptureError::StillCapture(e.to_string()))?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    CaptureError::NoFrames(self.config.frames_dir.display().to_string())
                })?,
        };

        debug!("still capture from {:?}", path);
        fs::read(&path).map_err(|e| CaptureError::StillCapture(format!("{:?}: {}", path, e)))
    }
}

impl Drop for DirectorySource {
    fn drop(&mut self) {
        self.stop();
    }
}
