//! tpbench-discovery - finding pattern occurrences in target code
//!
//! The discovery engine generates a code property graph (CPG) for a target
//! source tree, compiles the discovery rules of the requested pattern
//! instances against it, and correlates raw rule output back to
//! (pattern, instance) pairs. Prior measurement results gate the work:
//! instances the chosen tools already detect reliably are skipped, because
//! discovery exists to cover the blind spots.
//!
//! Two modes are exposed: pattern-driven discovery over the catalogue, and
//! manual discovery over an explicit set of rule files.

pub mod cpg;
pub mod engine;
pub mod errors;
pub mod rules;

pub use cpg::{CpgGenerator, JoernCpgGenerator};
pub use engine::{DiscoveryEngine, DiscoverySummary, ManualSummary, RuleFailure};
pub use errors::DiscoveryError;
pub use rules::{flatten_rule_paths, JoernRuleRunner, RawFinding, RuleRunner};
