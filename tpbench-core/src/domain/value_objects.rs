//! Catalogue value objects

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Programming language of a pattern, stored as an uppercase token.
///
/// Language folders in the pattern library are named by this token
/// (`PHP`, `JS`, ...), so the type normalises case on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Language(String);

impl Language {
    pub fn new(token: impl AsRef<str>) -> Self {
        Self(token.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Language {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

/// A requested SAST tool, identified by name and version.
///
/// The version may be the literal `"saas"` for hosted tools whose concrete
/// version is only known at runtime; measurement filtering treats it as a
/// wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub version: String,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Does a persisted measurement version satisfy this descriptor?
    pub fn version_matches(&self, recorded: &str) -> bool {
        self.version == "saas" || self.version == recorded
    }
}

impl fmt::Display for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.version)
    }
}

impl FromStr for ToolDescriptor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((name, version)) if !name.is_empty() && !version.is_empty() => {
                Ok(Self::new(name, version))
            }
            _ => Err(format!("expected '<name>:<version>', got '{}'", s)),
        }
    }
}

/// File extension registered for a discovery method, without the dot.
///
/// Returns `None` for methods the framework does not know about; rule
/// validation only applies to registered methods.
pub fn rule_extension_for(method: &str) -> Option<&'static str> {
    match method {
        "joern" => Some("sc"),
        _ => None,
    }
}
