//! Generic subprocess SAST adapter
//!
//! Wraps any CLI SAST tool that can be described by a small TOML file:
//! which executable to run, how to template its arguments, what result
//! format it writes, and how its native rule ids map onto the framework
//! vulnerability taxonomy.
//!
//! Argument templates support four placeholders: `$SRC_DIR`, `$OUT_FILE`,
//! `$LANGUAGE` and `$LIB_DIR`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use tpbench_core::domain::catalog::Finding;
use tpbench_core::domain::value_objects::Language;

use crate::adapter::{SastAdapter, SastError};
use crate::sarif::{findings_from_sarif, SarifLog};

/// Result artefact format a tool produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultFormat {
    Sarif,
    Csv,
}

impl ResultFormat {
    fn extension(self) -> &'static str {
        match self {
            ResultFormat::Sarif => "sarif",
            ResultFormat::Csv => "csv",
        }
    }
}

/// Per-tool command configuration, loaded from the TOML file named in the
/// tools table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCommandConfig {
    /// Executable name or path
    pub executable: String,
    /// Argument template; placeholders are substituted per launch
    pub arguments: Vec<String>,
    pub result_format: ResultFormat,
    /// Extra arguments appended on measurement runs
    #[serde(default)]
    pub measurement_arguments: Vec<String>,
    /// Extra arguments appended when a library directory is supplied;
    /// usually contain `$LIB_DIR`
    #[serde(default)]
    pub library_arguments: Vec<String>,
    /// Probe used to resolve "saas" versions (defaults to `--version`)
    #[serde(default)]
    pub version_arguments: Option<Vec<String>>,
    /// Native rule id -> framework vulnerability type
    #[serde(default)]
    pub type_mapping: HashMap<String, String>,
}

/// A SAST tool driven through its command line.
pub struct CommandAdapter {
    name: String,
    version: String,
    supported_languages: Vec<String>,
    config: ToolCommandConfig,
}

impl CommandAdapter {
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        supported_languages: Vec<String>,
        config: ToolCommandConfig,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            supported_languages,
            config,
        }
    }

    /// Load the per-tool TOML configuration file.
    pub fn from_config_file(
        name: &str,
        version: &str,
        supported_languages: Vec<String>,
        config_file: &Path,
    ) -> Result<Self, SastError> {
        let raw = std::fs::read_to_string(config_file).map_err(|e| SastError::InvalidToolConfig {
            tool: format!("{}:{}", name, version),
            reason: format!("cannot read '{}': {}", config_file.display(), e),
        })?;
        let config: ToolCommandConfig =
            toml::from_str(&raw).map_err(|e| SastError::InvalidToolConfig {
                tool: format!("{}:{}", name, version),
                reason: e.to_string(),
            })?;
        Ok(Self::new(name, version, supported_languages, config))
    }

    fn substitute(
        template: &[String],
        src_dir: &Path,
        out_file: &Path,
        language: &Language,
        lib_dir: Option<&Path>,
    ) -> Vec<String> {
        template
            .iter()
            .map(|arg| {
                arg.replace("$SRC_DIR", &src_dir.to_string_lossy())
                    .replace("$OUT_FILE", &out_file.to_string_lossy())
                    .replace("$LANGUAGE", language.as_str())
                    .replace(
                        "$LIB_DIR",
                        &lib_dir.map(|p| p.to_string_lossy().into_owned()).unwrap_or_default(),
                    )
            })
            .collect()
    }
}

#[async_trait]
impl SastAdapter for CommandAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn supported_languages(&self) -> &[String] {
        &self.supported_languages
    }

    async fn tool_version(&self) -> String {
        if self.version != "saas" {
            return self.version.clone();
        }

        let args = self
            .config
            .version_arguments
            .clone()
            .unwrap_or_else(|| vec!["--version".to_string()]);
        match Command::new(&self.config.executable).args(&args).output().await {
            Ok(output) if output.status.success() => String::from_utf8_lossy(&output.stdout)
                .lines()
                .next()
                .unwrap_or_default()
                .trim()
                .to_string(),
            Ok(output) => {
                warn!(tool = %self.name, code = ?output.status.code(), "Version probe failed");
                self.version.clone()
            }
            Err(e) => {
                warn!(tool = %self.name, error = %e, "Version probe failed");
                self.version.clone()
            }
        }
    }

    #[instrument(skip(self, lib_dir), fields(tool = %self.name, src = %src_dir.display()))]
    async fn launch(
        &self,
        src_dir: &Path,
        language: &Language,
        output_dir: &Path,
        lib_dir: Option<&Path>,
        measurement: bool,
    ) -> Result<PathBuf, SastError> {
        tokio::fs::create_dir_all(output_dir).await?;
        let out_file = output_dir.join(format!(
            "{}_{}_{}.{}",
            self.name,
            self.version.replace('.', "_"),
            Uuid::new_v4().simple(),
            self.config.result_format.extension()
        ));

        let mut args =
            Self::substitute(&self.config.arguments, src_dir, &out_file, language, lib_dir);
        if measurement {
            args.extend(Self::substitute(
                &self.config.measurement_arguments,
                src_dir,
                &out_file,
                language,
                lib_dir,
            ));
        }
        if lib_dir.is_some() {
            args.extend(Self::substitute(
                &self.config.library_arguments,
                src_dir,
                &out_file,
                language,
                lib_dir,
            ));
        }

        debug!(executable = %self.config.executable, ?args, "Launching SAST tool");

        let output = Command::new(&self.config.executable)
            .args(&args)
            .output()
            .await
            .map_err(|e| SastError::scan_failed(&self.name, e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SastError::scan_failed(
                &self.name,
                format!("exit code {:?}: {}", output.status.code(), stderr.trim()),
            ));
        }
        if !out_file.is_file() {
            return Err(SastError::scan_failed(
                &self.name,
                format!("tool produced no result file at {}", out_file.display()),
            ));
        }

        Ok(out_file)
    }

    async fn inspect(
        &self,
        result_file: &Path,
        _language: &Language,
    ) -> Result<Vec<Finding>, SastError> {
        let raw = tokio::fs::read_to_string(result_file).await?;

        let findings = match self.config.result_format {
            ResultFormat::Sarif => {
                let log: SarifLog = serde_json::from_str(&raw)
                    .map_err(|e| SastError::parse_failed(&self.name, e.to_string()))?;
                findings_from_sarif(&log, &self.config.type_mapping)
            }
            ResultFormat::Csv => self.findings_from_csv(&raw)?,
        };

        debug!(tool = %self.name, count = findings.len(), "Inspected result file");
        Ok(findings)
    }
}

impl CommandAdapter {
    /// Parse a `type,file,line` CSV result file. A header row is tolerated;
    /// the `file` column is reduced to its basename.
    fn findings_from_csv(&self, raw: &str) -> Result<Vec<Finding>, SastError> {
        let mut findings = Vec::new();
        for (idx, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() != 3 {
                return Err(SastError::parse_failed(
                    &self.name,
                    format!("line {}: expected 'type,file,line', got '{}'", idx + 1, line),
                ));
            }
            let Ok(line_no) = fields[2].parse::<u32>() else {
                if idx == 0 {
                    continue; // header row
                }
                return Err(SastError::parse_failed(
                    &self.name,
                    format!("line {}: '{}' is not a line number", idx + 1, fields[2]),
                ));
            };
            let file = Path::new(fields[1])
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| fields[1].to_string());
            findings.push(Finding::new(fields[0], file, line_no));
        }
        Ok(findings)
    }
}
