//! Package references written as `#r "nuget:Name, Version"`

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

static NUGET_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*nuget\s*:\s*(?P<name>[^,\s]+)\s*(?:,\s*(?P<version>[^,\s]+))?\s*$")
        .unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageReference {
    pub name: String,
    pub version: Option<String>,
}

impl PackageReference {
    pub fn new(name: impl Into<String>, version: Option<String>) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Parse the unquoted argument of a `#r` directive.
    pub fn parse(text: &str) -> Option<Self> {
        let captures = NUGET_REFERENCE.captures(text)?;
        Some(Self {
            name: captures["name"].to_string(),
            version: captures.name("version").map(|v| v.as_str().to_string()),
        })
    }
}

impl fmt::Display for PackageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.version {
            Some(version) => write!(f, "nuget:{}, {}", self.name, version),
            None => write!(f, "nuget:{}", self.name),
        }
    }
}

/// Whether the raw arguments of a `#r` name a package rather than a file.
pub fn is_package_argument(arguments: &str) -> bool {
    arguments
        .trim()
        .trim_start_matches('"')
        .trim_start()
        .get(..6)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("nuget:"))
}
