//! Discovery error taxonomy

use thiserror::Error;

use tpbench_core::domain::catalog::CatalogError;

/// Errors raised by the discovery engine.
///
/// Per-rule problems are collected into the run summary; only CPG
/// generation, unsupported languages/methods, and broken preconditions are
/// fatal.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("CPG generation failed: {0}")]
    CPGGenerationError(String),

    #[error("no CPG generator is configured for language {0}")]
    CPGLanguageNotSupported(String),

    #[error("discovery method '{0}' is not supported")]
    DiscoveryMethodNotSupported(String),

    #[error("discovery rule execution failed: {0}")]
    DiscoveryRuleError(String),

    #[error("cannot parse discovery rule output: {0}")]
    DiscoveryRuleParsingResultError(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
