//! Structured logging with tracing, plus per-run log files
//!
//! Every top-level operation (measure, discover, report) appends a
//! human-readable account of its phases and warnings to a log file inside
//! its output directory, independent of the process-wide tracing
//! subscriber.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Initialize the process-wide tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()?;

    Ok(())
}

/// Append-only log file for one engine run.
pub struct RunLog {
    path: PathBuf,
    file: File,
}

impl RunLog {
    /// Open (creating parents on demand) the run log inside `output_dir`.
    pub fn open(output_dir: &Path, filename: &str) -> std::io::Result<Self> {
        std::fs::create_dir_all(output_dir)?;
        let path = output_dir.join(filename);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self { path, file })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a phase boundary. Also emitted at info level so the console
    /// shows the one-line summary.
    pub fn phase(&mut self, message: &str) {
        tracing::info!("{}", message);
        self.write_line("INFO", message);
    }

    /// Record a non-fatal problem.
    pub fn warn(&mut self, message: &str) {
        tracing::warn!("{}", message);
        self.write_line("WARN", message);
    }

    fn write_line(&mut self, level: &str, message: &str) {
        let stamp = Utc::now().format("%Y-%m-%d %H:%M:%S");
        // A failed log write must never take the run down with it.
        let _ = writeln!(self.file, "{} {:5} {}", stamp, level, message);
    }
}
