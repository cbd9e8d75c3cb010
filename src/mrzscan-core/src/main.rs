//! mrzscan - MRZ scanner CLI
//!
//! Replays camera frames from a directory through a scanner session and
//! prints the machine-readable zone of every analyzed frame.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use mrzscan_capture::{replay, DirectorySource, FrameSource};
use mrzscan_core::colored_logger::init_logger;
use mrzscan_core::config::ScannerConfig;
use mrzscan_core::photo::finish_photo;
use mrzscan_core::{Pipeline, PipelineResult, ScanEvent, ScannerSession};
use mrzscan_ocr::{trained_data_name, AssetProvider, TesseractEngine, TextRecognizer};

#[derive(Parser)]
#[command(name = "mrzscan")]
#[command(about = "Read machine-readable zones from identity document images")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream a directory of frames through the scanner
    Scan {
        /// Directory of frame images, replayed in file name order
        frames_dir: PathBuf,

        /// Replay rate (frames per second)
        #[arg(long)]
        fps: Option<f64>,

        /// Rotation in degrees that makes the frames upright
        #[arg(short, long)]
        rotation: Option<i32>,

        /// Request the front-facing lens
        #[arg(long)]
        front: bool,

        /// Turn the torch on
        #[arg(long)]
        torch: bool,

        /// Loop over the directory until interrupted
        #[arg(long)]
        repeat: bool,

        /// Stop after the first non-empty MRZ
        #[arg(long)]
        once: bool,

        /// Print events as JSON lines
        #[arg(long)]
        json: bool,
    },

    /// Run the pipeline once on a single image
    Extract {
        /// Image file
        image: PathBuf,

        /// Rotation in degrees that makes the image upright
        #[arg(short, long, default_value = "0")]
        rotation: i32,

        /// Crop to the whole document instead of the MRZ band
        #[arg(long)]
        full: bool,
    },

    /// Take a photo from a frames directory and save it as JPEG
    Photo {
        /// Directory of frame images
        frames_dir: PathBuf,

        /// Output JPEG path
        output: PathBuf,

        /// Keep the full frame instead of cropping to the document
        #[arg(long)]
        no_crop: bool,
    },

    /// Check the OCR engine and trained data
    Check,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logger(cli.verbose)?;

    let config = ScannerConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Scan {
            frames_dir,
            fps,
            rotation,
            front,
            torch,
            repeat,
            once,
            json,
        } => {
            let mut config = config;
            if let Some(fps) = fps {
                config.capture.fps = fps;
            }
            if let Some(rotation) = rotation {
                config.capture.rotation_degrees = rotation;
            }
            config.capture.repeat |= repeat;
            cmd_scan(config, frames_dir, ScanOptions { front, torch, once, json })?;
        }
        Commands::Extract { image, rotation, full } => {
            cmd_extract(&config, &image, rotation, full)?;
        }
        Commands::Photo {
            frames_dir,
            output,
            no_crop,
        } => {
            cmd_photo(&config, frames_dir, &output, !no_crop)?;
        }
        Commands::Check => {
            cmd_check(&config)?;
        }
    }

    Ok(())
}

struct ScanOptions {
    front: bool,
    torch: bool,
    once: bool,
    json: bool,
}

#[tokio::main]
async fn cmd_scan(config: ScannerConfig, frames_dir: PathBuf, options: ScanOptions) -> Result<()> {
    if !frames_dir.is_dir() {
        anyhow::bail!("frames directory not found: {:?}", frames_dir);
    }

    info!("starting mrzscan");
    info!("frames directory: {:?}", frames_dir);
    info!(
        "fps: {}, rotation: {}, repeat: {}",
        config.capture.fps, config.capture.rotation_degrees, config.capture.repeat
    );

    let (tx, mut rx) = mpsc::unbounded_channel();
    let source = DirectorySource::new(config.replay_config(&frames_dir));
    let engine = TesseractEngine::with_executable(config.ocr.tesseract_path.clone());
    let assets = config.bundled_assets();

    let mut session = ScannerSession::new(
        source,
        engine,
        &assets,
        config.scanner_options(),
        Arc::new(tx),
    );
    session.set_torch(options.torch);
    session.start(options.front);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut ticker = tokio::time::interval(Duration::from_millis(200));
    let mut found = 0usize;

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("received shutdown signal");
                break;
            }
            Some(event) = rx.recv() => {
                if print_event(&event, options.json)? {
                    found += 1;
                    if options.once {
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                if session.is_finished() {
                    info!("frame source exhausted");
                    break;
                }
            }
        }
    }

    session.stop();

    // Results dispatched while stopping
    while let Ok(event) = rx.try_recv() {
        if print_event(&event, options.json)? {
            found += 1;
        }
    }

    info!("scanner stopped, {} MRZ result(s)", found);
    Ok(())
}

/// Print one event; returns true for a non-empty MRZ
fn print_event(event: &ScanEvent, json: bool) -> Result<bool> {
    if json {
        println!("{}", serde_json::to_string(event)?);
    }

    match event {
        ScanEvent::Parsed { mrz } if mrz.is_empty() => Ok(false),
        ScanEvent::Parsed { mrz } => {
            if !json {
                println!("{}\n", mrz);
            }
            Ok(true)
        }
        ScanEvent::Error { kind, message } => {
            error!("{}: {}", kind, message);
            Ok(false)
        }
    }
}

fn cmd_extract(config: &ScannerConfig, image: &Path, rotation: i32, full: bool) -> Result<()> {
    let frame = replay::load_frame(image, rotation)
        .with_context(|| format!("Failed to load {:?}", image))?;

    let language = config.ocr.language.clone();
    let trained_data = config
        .bundled_assets()
        .resolve(&trained_data_name(&language))
        .context("Failed to resolve trained data")?;

    let engine = TextRecognizer::new(
        TesseractEngine::with_executable(config.ocr.tesseract_path.clone()),
        trained_data.parent().map(Path::to_path_buf),
        language,
    )
    .with_mode(config.ocr.segmentation);
    let pipeline = Pipeline::new(engine).with_mrz_crop(!full);

    match pipeline.analyze(frame) {
        PipelineResult::Parsed(mrz) if mrz.is_empty() => {
            warn!("no MRZ found in {:?}", image);
        }
        PipelineResult::Parsed(mrz) => println!("{}", mrz),
        PipelineResult::Failed { kind, message } => {
            anyhow::bail!("{}: {}", kind, message);
        }
    }

    Ok(())
}

fn cmd_photo(config: &ScannerConfig, frames_dir: PathBuf, output: &Path, crop: bool) -> Result<()> {
    let mut source = DirectorySource::new(config.replay_config(frames_dir));
    let still = source.capture_still().context("Failed to capture photo")?;
    let jpeg = finish_photo(&still, crop)?;

    std::fs::write(output, &jpeg).with_context(|| format!("Failed to write {:?}", output))?;
    info!("saved {} byte photo to {:?}", jpeg.len(), output);
    Ok(())
}

fn cmd_check(config: &ScannerConfig) -> Result<()> {
    println!("checking dependencies...\n");

    let engine = TesseractEngine::with_executable(config.ocr.tesseract_path.clone());
    let engine_ok = match engine.version() {
        Ok(version) => {
            println!("  tesseract:    {}", version);
            true
        }
        Err(e) => {
            println!("  tesseract:    NOT FOUND ({})", e);
            false
        }
    };

    let asset = trained_data_name(&config.ocr.language);
    let assets_ok = match config.bundled_assets().resolve(&asset) {
        Ok(path) => {
            println!("  trained data: {}", path.display());
            true
        }
        Err(e) => {
            println!("  trained data: MISSING ({})", e);
            false
        }
    };

    println!();

    if !engine_ok {
        println!("WARNING: tesseract is required for text recognition.");
        println!("Install it or set [ocr] tesseract_path in the config file.");
    }
    if !assets_ok {
        println!(
            "WARNING: place {} in {:?} or point [assets] bundle_dir at it.",
            asset, config.assets.bundle_dir
        );
    }
    if engine_ok && assets_ok {
        println!("all checks passed!");
    }

    Ok(())
}
