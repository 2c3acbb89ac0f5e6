//! Logging for Marquee
//!
//! The console shows Marquee's own events at the level the operator picks
//! and keeps third-party crates at `warn`. A per-run file captures every
//! Marquee event at `trace`. Raw engine errors reach these sinks only and
//! never the player overlay.
//!
//! Playback sessions log inside a `session` span, so every line a session
//! produces carries its id.

use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

use tracing::{Level, Span, info_span};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::MarqueeError;

/// File name of the per-run log inside the logs directory.
pub const LOG_FILE_NAME: &str = "marquee-last-run.log";
/// Environment variable holding console filter directives, e.g. `marquee_core::playback=debug`.
pub const LOG_ENV_VAR: &str = "MARQUEE_LOG";

const DEFAULT_LOGS_DIR: &str = "logs";
const MARQUEE_TARGETS: [&str; 2] = ["marquee_core", "marquee"];

/// Installs the global subscriber and returns the path of the run log.
///
/// `MARQUEE_LOG`, when set and valid, replaces the console filter derived
/// from `console_level`.
///
/// # Errors
/// - `MarqueeError::Io` - The logs directory or file could not be created
/// - `MarqueeError::Configuration` - A global subscriber is already installed
pub fn init_tracing(
    console_level: Level,
    logs_dir: Option<&Path>,
) -> Result<PathBuf, MarqueeError> {
    let logs_path = logs_dir.unwrap_or_else(|| Path::new(DEFAULT_LOGS_DIR));
    create_dir_all(logs_path)?;

    let log_file_path = logs_path.join(LOG_FILE_NAME);
    let log_file = File::create(&log_file_path)?;

    let console_layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(console_filter(console_level));

    let file_layer = fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(log_file)
        .with_filter(EnvFilter::new(marquee_directives(Level::TRACE)));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| MarqueeError::Configuration {
            reason: format!("logging already initialized: {e}"),
        })?;

    tracing::debug!(
        console = %console_level,
        log_file = %log_file_path.display(),
        "Logging initialized"
    );

    Ok(log_file_path)
}

/// Span that tags everything logged on behalf of one playback session.
pub fn session_span(session_id: u64) -> Span {
    info_span!("session", id = session_id)
}

fn console_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(marquee_directives(level)))
}

/// Filter directives: `warn` for dependencies, `level` for Marquee crates.
fn marquee_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    let mut directives = vec!["warn".to_string()];
    directives.extend(
        MARQUEE_TARGETS
            .iter()
            .map(|target| format!("{target}={level}")),
    );
    directives.join(",")
}

/// Console verbosity accepted by the `--log-level` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliLogLevel {
    pub fn as_tracing_level(self) -> Level {
        match self {
            CliLogLevel::Error => Level::ERROR,
            CliLogLevel::Warn => Level::WARN,
            CliLogLevel::Info => Level::INFO,
            CliLogLevel::Debug => Level::DEBUG,
            CliLogLevel::Trace => Level::TRACE,
        }
    }
}
