//! SAST adapter contract

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use tpbench_core::domain::catalog::Finding;
use tpbench_core::domain::value_objects::Language;

/// Errors surfaced by adapters and the registry
#[derive(Debug, Error)]
pub enum SastError {
    #[error("unknown SAST tool: {0}")]
    InvalidSastTool(String),

    #[error("none of the requested SAST tools supports language {0}")]
    InvalidSastTools(String),

    #[error("SAST scan failed for {tool}: {reason}")]
    SastScanFailed { tool: String, reason: String },

    #[error("failed to parse result file for {tool}: {reason}")]
    ResultParseFailed { tool: String, reason: String },

    #[error("invalid tool configuration for {tool}: {reason}")]
    InvalidToolConfig { tool: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SastError {
    pub fn scan_failed(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SastScanFailed {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    pub fn parse_failed(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ResultParseFailed {
            tool: tool.into(),
            reason: reason.into(),
        }
    }
}

/// Uniform contract every SAST tool adapter implements.
///
/// `launch` drives the external binary and hands back the raw result
/// artefact; `inspect` turns that artefact into normalised findings whose
/// `type` lives in the framework taxonomy and whose `file` is a basename.
#[async_trait]
pub trait SastAdapter: Send + Sync {
    /// Tool name as configured (registry key component)
    fn name(&self) -> &str;

    /// Configured version; may be the literal "saas"
    fn version(&self) -> &str;

    /// Uppercase language tokens the tool can analyse
    fn supported_languages(&self) -> &[String];

    fn supports(&self, language: &Language) -> bool {
        self.supported_languages()
            .iter()
            .any(|l| l.eq_ignore_ascii_case(language.as_str()))
    }

    /// Resolve "saas"-style version placeholders into the concrete version
    /// seen at runtime. For pinned versions this is the identity.
    async fn tool_version(&self) -> String;

    /// Run the tool against `src_dir` and return the result artefact path.
    ///
    /// `measurement` distinguishes catalogue measurement runs from plain
    /// scans; adapters may pass extra flags for them. `lib_dir` points at
    /// additional libraries some tools need on their class/include path.
    async fn launch(
        &self,
        src_dir: &Path,
        language: &Language,
        output_dir: &Path,
        lib_dir: Option<&Path>,
        measurement: bool,
    ) -> Result<PathBuf, SastError>;

    /// Parse a result artefact into findings.
    async fn inspect(
        &self,
        result_file: &Path,
        language: &Language,
    ) -> Result<Vec<Finding>, SastError>;
}
