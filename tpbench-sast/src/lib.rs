//! tpbench-sast - SAST tool integration
//!
//! External SAST tools plug into the workbench through a two-operation
//! adapter contract: `launch` runs the tool against a source tree and
//! returns a result artefact, `inspect` normalises that artefact into
//! framework findings. Adapters are dispatched at runtime through a
//! registry keyed by `(tool name, tool version)`.
//!
//! The in-tree [`CommandAdapter`] wraps any CLI tool describable by a small
//! TOML file (executable, argument template, result format, taxonomy
//! mapping); SARIF and CSV result files are understood out of the box.

pub mod adapter;
pub mod command_adapter;
pub mod registry;
pub mod sarif;

pub use adapter::{SastAdapter, SastError};
pub use command_adapter::{CommandAdapter, ResultFormat, ToolCommandConfig};
pub use registry::AdapterRegistry;
