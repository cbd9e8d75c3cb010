//! Colored logging with per-crate prefixes
//!
//! The prefix is taken from the event target, so capture, processing and
//! OCR output stay distinguishable in one stream. Logs go to stderr; stdout
//! carries scan results.

use owo_colors::{OwoColorize, Style};
use std::fmt;
use std::io;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::{
    format::{FormatEvent, FormatFields, Writer},
    FmtContext,
};
use tracing_subscriber::registry::LookupSpan;

/// Component identifier for prefixing logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Scan,
    Capture,
    Process,
    Ocr,
}

impl Component {
    /// Component owning a tracing target (module path)
    pub fn from_target(target: &str) -> Self {
        let crate_name = target.split("::").next().unwrap_or(target);
        match crate_name {
            "mrzscan_capture" => Component::Capture,
            "mrzscan_processing" => Component::Process,
            "mrzscan_ocr" => Component::Ocr,
            _ => Component::Scan,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Scan => "SCAN",
            Component::Capture => "CAPTURE",
            Component::Process => "PROCESS",
            Component::Ocr => "OCR",
        }
    }

    pub fn color_style(&self) -> Style {
        match self {
            Component::Scan => Style::new().cyan().bold(),
            Component::Capture => Style::new().green().bold(),
            Component::Process => Style::new().yellow().bold(),
            Component::Ocr => Style::new().magenta().bold(),
        }
    }
}

/// Formatter with component prefixes and colors
pub struct ColoredFormatter;

impl<S, N> FormatEvent<S, N> for ColoredFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let metadata = event.metadata();

        let now = chrono::Local::now();
        write!(writer, "{} ", now.format("%H:%M:%S%.3f").dimmed())?;

        let component = Component::from_target(metadata.target());
        let prefix = format!("[{:7}]", component.as_str());
        write!(writer, "{} ", prefix.style(component.color_style()))?;

        match *metadata.level() {
            Level::ERROR => write!(writer, "{} ", "ERROR".red().bold())?,
            Level::WARN => write!(writer, "{} ", "WARN ".yellow().bold())?,
            Level::INFO => write!(writer, "{} ", "INFO ".green().bold())?,
            Level::DEBUG => write!(writer, "{} ", "DEBUG".blue().bold())?,
            Level::TRACE => write!(writer, "{} ", "TRACE".dimmed().bold())?,
        }

        // Worker thread name, when not the main thread
        if let Some(name) = std::thread::current().name() {
            if name != "main" {
                write!(writer, "{} ", format!("({})", name).dimmed())?;
            }
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}

/// Initialize colored logging
///
/// `RUST_LOG` takes precedence; otherwise INFO, or DEBUG when `verbose`.
/// Should be called once per process.
pub fn init_logger(verbose: bool) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let default_level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(default_level.into()));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .event_format(ColoredFormatter)
        .with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
