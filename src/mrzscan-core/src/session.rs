//! Scanner session driven by a host
//!
//! The host owns the session and calls it from one thread. Frames and
//! results never touch session state: the worker only sees its slot, the
//! pipeline, and the result sink.

use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

use mrzscan_capture::{FrameSource, LensFacing, SourceConfig};
use mrzscan_ocr::{
    trained_data_name, AssetProvider, OcrEngine, SegmentationMode, TextRecognizer,
    DEFAULT_LANGUAGE,
};

use crate::error::ScanError;
use crate::events::{ErrorKind, ResultSink, ScanEvent};
use crate::photo::finish_photo;
use crate::pipeline::Pipeline;
use crate::worker::{AnalysisWorker, WorkerCounters};

/// OCR settings fixed for the lifetime of a session
#[derive(Debug, Clone)]
pub struct ScannerOptions {
    pub language: String,
    pub segmentation: SegmentationMode,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            segmentation: SegmentationMode::SingleBlock,
        }
    }
}

/// Settings of one start, immutable until the next start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub lens_facing: LensFacing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Streaming,
}

#[derive(Debug)]
struct SessionState {
    phase: SessionPhase,
    torch: bool,
    config: Option<SessionConfig>,
}

/// MRZ scanning session over a frame source and an OCR engine
pub struct ScannerSession<S: FrameSource, E: OcrEngine + 'static> {
    source: S,
    pipeline: Arc<Pipeline<E>>,
    sink: Arc<dyn ResultSink>,
    worker: Option<AnalysisWorker>,
    state: SessionState,
}

impl<S: FrameSource, E: OcrEngine + 'static> ScannerSession<S, E> {
    /// Create a session, resolving the trained data once
    ///
    /// An unresolvable asset is reported to `sink` as an initialization
    /// failure; the session still works, recognizing no text.
    pub fn new(
        source: S,
        engine: E,
        assets: &dyn AssetProvider,
        options: ScannerOptions,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        let asset = trained_data_name(&options.language);
        let data_dir = match assets.resolve(&asset) {
            Ok(path) => {
                info!("trained data at {:?}", path);
                path.parent().map(Path::to_path_buf)
            }
            Err(e) => {
                let failure = ScanError::Initialization(e);
                error!("{}", failure);
                sink.dispatch(ScanEvent::error(failure.kind(), failure.to_string()));
                None
            }
        };

        let recognizer = TextRecognizer::new(engine, data_dir, options.language)
            .with_mode(options.segmentation);

        Self {
            source,
            pipeline: Arc::new(Pipeline::new(recognizer)),
            sink,
            worker: None,
            state: SessionState {
                phase: SessionPhase::Idle,
                torch: false,
                config: None,
            },
        }
    }

    /// Begin accepting frames from the source
    ///
    /// A source that cannot be bound is reported to the sink as a binding
    /// failure and leaves the session idle. Starting a streaming session
    /// rebinds it.
    pub fn start(&mut self, use_front_facing: bool) {
        if self.state.phase == SessionPhase::Streaming {
            info!("session already streaming, rebinding");
            self.stop();
        }

        let config = SessionConfig {
            lens_facing: if use_front_facing {
                LensFacing::Front
            } else {
                LensFacing::Back
            },
        };

        let mut worker = match AnalysisWorker::spawn(self.pipeline.clone(), self.sink.clone()) {
            Ok(worker) => worker,
            Err(e) => {
                self.report_binding_failure(format!("failed to spawn analysis worker: {}", e));
                return;
            }
        };

        let source_config = SourceConfig {
            lens_facing: config.lens_facing,
            torch: self.state.torch,
        };
        if let Err(e) = self.source.start(&source_config, worker.frame_sink()) {
            worker.join();
            self.report_binding_failure(ScanError::SourceBinding(e).to_string());
            return;
        }

        info!("session streaming ({:?} lens)", config.lens_facing);
        self.worker = Some(worker);
        self.state.phase = SessionPhase::Streaming;
        self.state.config = Some(config);
    }

    fn report_binding_failure(&self, message: String) {
        error!("{}", message);
        self.sink
            .dispatch(ScanEvent::error(ErrorKind::SourceBindingFailure, message));
    }

    /// Stop accepting frames, halt the source, and wait for the in-flight
    /// run to be dispatched. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if let Some(worker) = self.worker.as_ref() {
            worker.close();
        }
        self.source.stop();

        if let Some(mut worker) = self.worker.take() {
            worker.join();
            let counters = worker.counters();
            info!(
                "session stopped: {} runs, {} frames offered, {} skipped",
                counters.runs_completed, counters.frames.offered, counters.frames.superseded
            );
        }
        self.state.phase = SessionPhase::Idle;
    }

    /// Switch the source's illumination; remembered across restarts
    pub fn set_torch(&mut self, on: bool) {
        self.state.torch = on;
        if self.state.phase == SessionPhase::Streaming {
            if let Err(e) = self.source.set_torch(on) {
                warn!("torch change ignored: {}", e);
            }
        }
    }

    /// Capture a still and return it as JPEG, cropped to the whole document
    /// when `crop` is set
    pub fn capture_photo(&mut self, crop: bool) -> Result<Vec<u8>, ScanError> {
        let still = self
            .source
            .capture_still()
            .map_err(|e| ScanError::Capture(e.to_string()))?;
        finish_photo(&still, crop)
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.phase
    }

    pub fn is_streaming(&self) -> bool {
        self.state.phase == SessionPhase::Streaming
    }

    pub fn torch(&self) -> bool {
        self.state.torch
    }

    /// Settings of the current or last start
    pub fn config(&self) -> Option<SessionConfig> {
        self.state.config
    }

    /// True when no worker is running: never started, stopped, or the
    /// source finished and every frame was analyzed
    pub fn is_finished(&self) -> bool {
        self.worker
            .as_ref()
            .map(AnalysisWorker::is_finished)
            .unwrap_or(true)
    }

    pub fn counters(&self) -> Option<WorkerCounters> {
        self.worker.as_ref().map(AnalysisWorker::counters)
    }

    pub fn pipeline(&self) -> &Pipeline<E> {
        &self.pipeline
    }
}

impl<S: FrameSource, E: OcrEngine + 'static> Drop for ScannerSession<S, E> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::{synthetic_passport_frame, ScriptedEngine, MRZ_LINES};
    use mrzscan_capture::{CaptureError, FrameSink};
    use mrzscan_ocr::OcrError;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::thread;
    use std::time::{Duration, Instant};
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    /// Frame source the test pushes frames through by hand
    #[derive(Clone, Default)]
    struct ManualSource {
        sink: Arc<Mutex<Option<FrameSink>>>,
        started_with: Arc<Mutex<Vec<SourceConfig>>>,
        torch_calls: Arc<Mutex<Vec<bool>>>,
        fail_binding: bool,
        still: Option<Vec<u8>>,
    }

    impl ManualSource {
        fn push(&self, frame: mrzscan_capture::Frame) {
            let sink = self.sink.lock().unwrap().clone().expect("source not started");
            sink.offer(frame);
        }
    }

    impl FrameSource for ManualSource {
        fn start(&mut self, config: &SourceConfig, sink: FrameSink) -> Result<(), CaptureError> {
            if self.fail_binding {
                return Err(CaptureError::Binding("no camera".into()));
            }
            self.started_with.lock().unwrap().push(*config);
            *self.sink.lock().unwrap() = Some(sink);
            Ok(())
        }

        fn stop(&mut self) {
            self.sink.lock().unwrap().take();
        }

        fn set_torch(&mut self, on: bool) -> Result<(), CaptureError> {
            self.torch_calls.lock().unwrap().push(on);
            Ok(())
        }

        fn capture_still(&mut self) -> Result<Vec<u8>, CaptureError> {
            self.still
                .clone()
                .ok_or_else(|| CaptureError::StillCapture("shutter jammed".into()))
        }
    }

    struct StaticAssets(Option<PathBuf>);

    impl AssetProvider for StaticAssets {
        fn resolve(&self, name: &str) -> mrzscan_ocr::Result<PathBuf> {
            self.0.clone().ok_or_else(|| OcrError::AssetUnavailable {
                name: name.to_string(),
                message: "not bundled".into(),
            })
        }
    }

    fn available() -> StaticAssets {
        StaticAssets(Some(PathBuf::from("/cache/tessdata/ocrb.traineddata")))
    }

    fn session_with(
        source: ManualSource,
        engine: ScriptedEngine,
        assets: StaticAssets,
    ) -> (
        ScannerSession<ManualSource, ScriptedEngine>,
        UnboundedReceiver<ScanEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = ScannerSession::new(
            source,
            engine,
            &assets,
            ScannerOptions::default(),
            Arc::new(tx),
        );
        (session, rx)
    }

    fn wait_for_event(rx: &mut UnboundedReceiver<ScanEvent>) -> ScanEvent {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Ok(event) = rx.try_recv() {
                return event;
            }
            assert!(Instant::now() < deadline, "timed out waiting for event");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_streaming_produces_mrz() {
        let source = ManualSource::default();
        let engine = ScriptedEngine::new(format!("noise\n{}\n{}", MRZ_LINES[0], MRZ_LINES[1]));
        let (mut session, mut rx) = session_with(source.clone(), engine, available());

        session.start(false);
        assert!(session.is_streaming());
        assert_eq!(
            session.config(),
            Some(SessionConfig {
                lens_facing: LensFacing::Back
            })
        );
        assert_eq!(
            session.pipeline().recognizer().data_dir(),
            Some(Path::new("/cache/tessdata"))
        );

        source.push(synthetic_passport_frame(0));
        match wait_for_event(&mut rx) {
            ScanEvent::Parsed { mrz } => assert_eq!(mrz.lines(), &MRZ_LINES),
            other => panic!("unexpected event {:?}", other),
        }

        session.stop();
        assert!(!session.is_streaming());
        assert!(session.is_finished());
    }

    #[test]
    fn test_missing_trained_data_reported_once() {
        let source = ManualSource::default();
        let (mut session, mut rx) =
            session_with(source.clone(), ScriptedEngine::new("AB"), StaticAssets(None));

        match rx.try_recv().unwrap() {
            ScanEvent::Error { kind, .. } => assert_eq!(kind, ErrorKind::InitializationFailure),
            other => panic!("unexpected event {:?}", other),
        }

        // OCR degrades to empty text instead of failing each frame
        session.start(false);
        source.push(synthetic_passport_frame(0));
        match wait_for_event(&mut rx) {
            ScanEvent::Parsed { mrz } => assert!(mrz.is_empty()),
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_binding_failure_leaves_session_idle() {
        let source = ManualSource {
            fail_binding: true,
            ..Default::default()
        };
        let (mut session, mut rx) = session_with(source, ScriptedEngine::new("AB"), available());

        session.start(true);
        assert_eq!(session.phase(), SessionPhase::Idle);
        assert!(session.is_finished());
        match rx.try_recv().unwrap() {
            ScanEvent::Error { kind, message } => {
                assert_eq!(kind, ErrorKind::SourceBindingFailure);
                assert!(message.contains("no camera"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn test_stop_lets_in_flight_run_finish() {
        let source = ManualSource::default();
        let engine = ScriptedEngine::slow("AB\nCD", Duration::from_millis(150));
        let (mut session, mut rx) = session_with(source.clone(), engine, available());

        session.start(false);
        source.push(synthetic_passport_frame(0));
        let deadline = Instant::now() + Duration::from_secs(10);
        while session.counters().map(|c| c.runs_started).unwrap_or(0) == 0 {
            assert!(Instant::now() < deadline);
            thread::sleep(Duration::from_millis(5));
        }

        session.stop();
        assert!(matches!(rx.try_recv(), Ok(ScanEvent::Parsed { .. })));

        // Frames after stop go nowhere
        assert!(source.sink.lock().unwrap().is_none());
        session.stop();
    }

    #[test]
    fn test_torch_state_survives_restart() {
        let source = ManualSource::default();
        let (mut session, _rx) = session_with(source.clone(), ScriptedEngine::new("AB"), available());

        session.set_torch(true);
        // Not streaming yet, so nothing reaches the source
        assert!(source.torch_calls.lock().unwrap().is_empty());

        session.start(true);
        session.set_torch(false);
        session.set_torch(true);
        session.start(true);

        let started = source.started_with.lock().unwrap().clone();
        assert_eq!(started.len(), 2);
        assert!(started.iter().all(|c| c.torch && c.lens_facing == LensFacing::Front));
        assert_eq!(*source.torch_calls.lock().unwrap(), vec![false, true]);
        assert!(session.torch());
    }

    #[test]
    fn test_capture_photo() {
        let mut png = Vec::new();
        image::RgbImage::new(1000, 1600)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageFormat::Png)
            .unwrap();
        let source = ManualSource {
            still: Some(png),
            ..Default::default()
        };
        let (mut session, _rx) = session_with(source, ScriptedEngine::new("AB"), available());

        let jpeg = session.capture_photo(true).unwrap();
        let photo = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((photo.width(), photo.height()), (900, 633));
    }

    #[test]
    fn test_capture_failure_goes_to_caller() {
        let (mut session, mut rx) =
            session_with(ManualSource::default(), ScriptedEngine::new("AB"), available());

        let error = session.capture_photo(false).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::CaptureFailure);
        assert!(rx.try_recv().is_err());
    }
}
