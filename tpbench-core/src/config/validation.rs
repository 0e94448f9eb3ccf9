//! Configuration validation module

use crate::config::Config;

/// Trait for validating configuration sections
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Measurement configuration error: {message}")]
    Measurement { message: String },

    #[error("Tools configuration error: {message}")]
    Tools { message: String },

    #[error("CPG configuration error: {message}")]
    Cpg { message: String },

    #[error("Logging configuration error: {message}")]
    Logging { message: String },
}

impl ValidationError {
    pub fn measurement(message: impl Into<String>) -> Self {
        Self::Measurement {
            message: message.into(),
        }
    }

    pub fn tools(message: impl Into<String>) -> Self {
        Self::Tools {
            message: message.into(),
        }
    }

    pub fn cpg(message: impl Into<String>) -> Self {
        Self::Cpg {
            message: message.into(),
        }
    }

    pub fn logging(message: impl Into<String>) -> Self {
        Self::Logging {
            message: message.into(),
        }
    }
}

impl Validate for Config {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.measurement.workers == 0 {
            return Err(ValidationError::measurement(
                "measurement.workers must be > 0",
            ));
        }

        if self.logging.log_filename.trim().is_empty() {
            return Err(ValidationError::logging(
                "logging.log_filename must not be empty",
            ));
        }

        for (tool, versions) in &self.tools {
            if versions.is_empty() {
                return Err(ValidationError::tools(format!(
                    "tool '{}' has no versions configured",
                    tool
                )));
            }
            for (version, entry) in versions {
                if entry.supported_languages.is_empty() {
                    return Err(ValidationError::tools(format!(
                        "tool '{}:{}' declares no supported languages",
                        tool, version
                    )));
                }
                if entry.tool_interface.trim().is_empty() {
                    return Err(ValidationError::tools(format!(
                        "tool '{}:{}' has an empty tool_interface",
                        tool, version
                    )));
                }
            }
        }

        for (language, generator) in &self.cpg {
            for placeholder in ["$SRC_DIR", "$BINARY_OUT"] {
                if !generator.command_template.contains(placeholder) {
                    return Err(ValidationError::cpg(format!(
                        "cpg.{} command_template is missing the {} placeholder",
                        language, placeholder
                    )));
                }
            }
        }

        Ok(())
    }
}
