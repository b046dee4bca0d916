//! Logging init: file under XDG state dir, or graceful fallback to stderr.

use anyhow::Result;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,throttle_core=debug";

/// Sink for one log record: the shared log file, or stderr when the handle
/// cannot be duplicated.
enum LogSink {
    File(fs::File),
    Stderr(io::Stderr),
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            LogSink::File(f) => f.write(buf),
            LogSink::Stderr(e) => e.lock().write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            LogSink::File(f) => f.flush(),
            LogSink::Stderr(e) => e.lock().flush(),
        }
    }
}

/// Append-mode `throttle.log` handed to the fmt layer.
struct LogFile {
    file: fs::File,
    path: PathBuf,
}

impl LogFile {
    fn open_in(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let path = dir.join("throttle.log");
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self { file, path })
    }
}

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = LogSink;

    fn make_writer(&'a self) -> Self::Writer {
        match self.file.try_clone() {
            Ok(file) => LogSink::File(file),
            Err(_) => LogSink::Stderr(io::stderr()),
        }
    }
}

/// `RUST_LOG` wins, then the configured directive, then the crate default.
fn env_filter(configured: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured.unwrap_or(DEFAULT_FILTER)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Initialize structured logging to `~/.local/state/throttle/throttle.log`.
/// On failure (e.g. log dir unwritable), returns Err so the caller can fall back to stderr.
pub fn init_logging(filter: Option<&str>) -> Result<()> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("throttle")?;
    let log_file = LogFile::open_in(&xdg_dirs.get_state_home())?;
    let log_file_path = log_file.path.clone();
    let writer = BoxMakeWriter::new(log_file);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter(filter))
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))?;

    tracing::info!("throttle logging initialized at {}", log_file_path.display());

    Ok(())
}

/// Initialize logging to stderr only (no file). Use when init_logging() fails.
pub fn init_logging_stderr(filter: Option<&str>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(filter))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init();
}
