//! Catalogue error taxonomy

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the catalogue model.
///
/// Engines catch per-pattern and per-instance variants during bulk
/// operations and record them in their run summaries; only fatal
/// preconditions (missing tp_lib, missing target directory) propagate to
/// the caller.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("pattern {0} does not exist in the library")]
    PatternDoesNotExist(u32),

    #[error("pattern is invalid: {reason}")]
    PatternInvalid { reason: String },

    #[error("instance '{0}' does not exist")]
    InstanceDoesNotExist(String),

    #[error("instance is invalid: {reason}")]
    InstanceInvalid { reason: String },

    #[error("no measurement found for pattern {0}")]
    MeasurementNotFound(u32),

    #[error("pattern library has no '{language}' folder under {tp_lib}")]
    LanguageTPLibDoesNotExist { language: String, tp_lib: PathBuf },

    #[error("pattern library does not exist: {0}")]
    TPLibDoesNotExist(PathBuf),

    #[error("target directory does not exist: {0}")]
    TargetDirDoesNotExist(PathBuf),

    #[error("invalid pattern field: {reason}")]
    PatternValueError { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    pub fn pattern_invalid(reason: impl Into<String>) -> Self {
        Self::PatternInvalid {
            reason: reason.into(),
        }
    }

    pub fn instance_invalid(reason: impl Into<String>) -> Self {
        Self::InstanceInvalid {
            reason: reason.into(),
        }
    }

    pub fn pattern_value(reason: impl Into<String>) -> Self {
        Self::PatternValueError {
            reason: reason.into(),
        }
    }
}
