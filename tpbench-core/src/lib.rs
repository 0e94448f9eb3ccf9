//! tpbench-core - Foundation crate for the tpbench workbench
//!
//! This crate provides the shared functionality used across all tpbench
//! engines:
//!
//! # Modules
//!
//! - [`config`] — Strongly-typed configuration with TOML and environment variable support
//! - [`domain`] — The catalogue model: patterns, instances, measurements
//! - [`infrastructure`] — Disk-resident catalogue store (loading, validation, persistence)
//! - [`logging`] — Structured logging with tracing and per-run log files
//!
//! # Architecture
//!
//! The crate follows the same layering as the rest of the workspace:
//!
//! ```text
//! tpbench-core/
//! ├── domain/           # Pure catalogue model
//! │   └── catalog/      # Pattern, Instance, Measurement entities
//! ├── infrastructure/   # CatalogStore: tp_lib disk layout
//! ├── config/           # Configuration management
//! └── logging           # Tracing bootstrap + per-run log files
//! ```
//!
//! # Configuration
//!
//! Load configuration from files and environment:
//!
//! ```rust,ignore
//! use tpbench_core::Config;
//!
//! let config = Config::load()?;
//! ```
//!
//! Environment variables use the `TPBENCH__` prefix with double underscore
//! separators:
//!
//! ```bash
//! TPBENCH__LIBRARY__TP_LIB=/data/patterns
//! TPBENCH__MEASUREMENT__WORKERS=8
//! ```

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod logging;

pub use config::Config;
pub use logging::init_tracing;
