//! Code property graph generation
//!
//! The CPG builder is an external toolchain described per language in the
//! configuration: a command template with `$SRC_DIR` and `$BINARY_OUT`
//! placeholders plus the toolchain installation directory. After building,
//! a short smoke-test query loads the produced binary; a CPG that cannot
//! be loaded is treated as not generated at all.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use tpbench_core::config::CpgGeneratorConfig;

use crate::errors::DiscoveryError;

const SMOKE_TEST_ERROR: &str = "Error in CPG generation";

/// Produces a CPG binary for a source tree.
#[async_trait]
pub trait CpgGenerator: Send + Sync {
    async fn generate(
        &self,
        src_dir: &Path,
        build_name: &str,
        out_dir: &Path,
        timeout: Option<Duration>,
    ) -> Result<PathBuf, DiscoveryError>;
}

/// CPG generation through the configured joern toolchain.
pub struct JoernCpgGenerator {
    config: CpgGeneratorConfig,
}

impl JoernCpgGenerator {
    pub fn new(config: CpgGeneratorConfig) -> Self {
        Self { config }
    }

    /// Path of the joern query runner inside the installation directory.
    pub fn query_runner(&self) -> PathBuf {
        self.config.installation_dir.join("joern")
    }

    async fn run_build_command(
        &self,
        command_line: &str,
        timeout: Option<Duration>,
    ) -> Result<(), DiscoveryError> {
        let mut parts = command_line.split_whitespace();
        let Some(program) = parts.next() else {
            return Err(DiscoveryError::CPGGenerationError(
                "empty command template".to_string(),
            ));
        };
        let mut command = Command::new(program);
        command.args(parts);

        debug!(command = %command_line, "Generating CPG");

        let output = match timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .map_err(|_| {
                    DiscoveryError::CPGGenerationError(format!(
                        "timed out after {} seconds",
                        limit.as_secs()
                    ))
                })?,
            None => command.output().await,
        }
        .map_err(|e| DiscoveryError::CPGGenerationError(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DiscoveryError::CPGGenerationError(format!(
                "builder exited with {:?}: {}",
                output.status.code(),
                stderr.trim()
            )));
        }
        Ok(())
    }

    /// Load the produced binary through the query runner; anything but a
    /// clean load invalidates the build.
    async fn smoke_test(&self, cpg_binary: &Path) -> Result<(), DiscoveryError> {
        let script = format!(
            "importCpg(\"{}\") match {{\n  case Some(cpg) => println(cpg.graph.nodeCount)\n  case None => println(\"{}\")\n}}\n",
            cpg_binary.display(),
            SMOKE_TEST_ERROR
        );
        let mut script_file = tempfile::Builder::new()
            .prefix("cpg_smoke_")
            .suffix(".sc")
            .tempfile()?;
        script_file.write_all(script.as_bytes())?;

        let output = Command::new(self.query_runner())
            .arg("--script")
            .arg(script_file.path())
            .output()
            .await
            .map_err(|e| DiscoveryError::CPGGenerationError(format!("smoke test: {}", e)))?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() || stdout.contains(SMOKE_TEST_ERROR) {
            return Err(DiscoveryError::CPGGenerationError(format!(
                "smoke test failed for {}",
                cpg_binary.display()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl CpgGenerator for JoernCpgGenerator {
    #[instrument(skip(self), fields(src = %src_dir.display(), build_name))]
    async fn generate(
        &self,
        src_dir: &Path,
        build_name: &str,
        out_dir: &Path,
        timeout: Option<Duration>,
    ) -> Result<PathBuf, DiscoveryError> {
        std::fs::create_dir_all(out_dir)?;
        let cpg_binary = out_dir.join(format!("{}.cpg.bin", build_name));

        let command_line = self
            .config
            .command_template
            .replace("$SRC_DIR", &src_dir.to_string_lossy())
            .replace("$BINARY_OUT", &cpg_binary.to_string_lossy());

        self.run_build_command(&command_line, timeout).await?;

        if !cpg_binary.is_file() {
            return Err(DiscoveryError::CPGGenerationError(format!(
                "builder produced no binary at {}",
                cpg_binary.display()
            )));
        }

        self.smoke_test(&cpg_binary).await?;
        debug!(cpg = %cpg_binary.display(), "CPG generated");
        Ok(cpg_binary)
    }
}
