//! Adapter registry
//!
//! Maps `(tool name, tool version)` to an adapter instance. The registry is
//! built once from the configuration tools table; engines then resolve the
//! user's requested tool descriptors through it and filter them down to the
//! current language.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use tpbench_core::config::Config;
use tpbench_core::domain::value_objects::{Language, ToolDescriptor};

use crate::adapter::{SastAdapter, SastError};
use crate::command_adapter::CommandAdapter;

/// Registry of available SAST adapters.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: HashMap<(String, String), Arc<dyn SastAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the registry from the configuration tools table.
    ///
    /// Each entry's `tool_interface` selects the adapter implementation;
    /// an unknown interface token is a configuration error surfaced as
    /// `InvalidSastTool`.
    pub fn from_config(config: &Config) -> Result<Self, SastError> {
        let mut registry = Self::new();
        for (name, versions) in &config.tools {
            for (version, entry) in versions {
                let adapter: Arc<dyn SastAdapter> = match entry.tool_interface.as_str() {
                    "command" => Arc::new(CommandAdapter::from_config_file(
                        name,
                        version,
                        entry.supported_languages.clone(),
                        &entry.config_file_path,
                    )?),
                    other => {
                        return Err(SastError::InvalidSastTool(format!(
                            "{}:{} uses unknown tool_interface '{}'",
                            name, version, other
                        )))
                    }
                };
                registry.register(adapter);
            }
        }
        Ok(registry)
    }

    /// Register an adapter under its own name and version.
    pub fn register(&mut self, adapter: Arc<dyn SastAdapter>) {
        let key = (adapter.name().to_string(), adapter.version().to_string());
        debug!(tool = %key.0, version = %key.1, "Registered SAST adapter");
        self.adapters.insert(key, adapter);
    }

    /// Look up one tool. Unknown tools fail with `InvalidSastTool`.
    pub fn get(&self, tool: &ToolDescriptor) -> Result<Arc<dyn SastAdapter>, SastError> {
        self.adapters
            .get(&(tool.name.clone(), tool.version.clone()))
            .cloned()
            .ok_or_else(|| SastError::InvalidSastTool(tool.to_string()))
    }

    /// Resolve the requested tools and keep those supporting `language`.
    ///
    /// An unknown descriptor is fatal; an empty result after language
    /// filtering fails with `InvalidSastTools`.
    pub fn filter_for_language(
        &self,
        tools: &[ToolDescriptor],
        language: &Language,
    ) -> Result<Vec<(ToolDescriptor, Arc<dyn SastAdapter>)>, SastError> {
        let mut supported = Vec::new();
        for tool in tools {
            let adapter = self.get(tool)?;
            if adapter.supports(language) {
                supported.push((tool.clone(), adapter));
            } else {
                debug!(tool = %tool, language = %language, "Tool does not support language; dropped");
            }
        }
        if supported.is_empty() {
            return Err(SastError::InvalidSastTools(language.to_string()));
        }
        Ok(supported)
    }
}
