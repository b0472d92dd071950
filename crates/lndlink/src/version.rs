//! Version descriptors and the compatibility rules applied to them.
//!
//! A [`VersionDescriptor`] describes both the version an lnd node reports
//! and the minimum version a caller requires. Compatibility is hierarchical:
//! major, then minor, then patch, where the first differing component decides.

use std::collections::HashSet;
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Build tags every sub-server client in this crate relies on.
pub const DEFAULT_BUILD_TAGS: [&str; 4] = ["signrpc", "walletrpc", "chainrpc", "invoicesrpc"];

/// An lnd application version plus the build tags it was compiled with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionDescriptor {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
    /// Patch version.
    pub patch: u32,
    /// Build tags (sub-servers) compiled into the daemon.
    #[serde(default)]
    pub build_tags: Vec<String>,
}

impl VersionDescriptor {
    /// Creates a version without build tags.
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            build_tags: Vec::new(),
        }
    }

    /// Replaces the build tags.
    #[must_use]
    pub fn with_build_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.build_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// The minimum version required for every client in this crate to work.
    #[must_use]
    pub fn minimum_compatible() -> Self {
        Self::new(0, 11, 0).with_build_tags(DEFAULT_BUILD_TAGS)
    }

    /// Whether this version is at least `expected`.
    ///
    /// The components are compared in order; the first one that differs
    /// decides, and equal versions are compatible.
    #[must_use]
    pub fn is_at_least(&self, expected: &Self) -> bool {
        if self.major != expected.major {
            return self.major > expected.major;
        }
        if self.minor != expected.minor {
            return self.minor > expected.minor;
        }
        if self.patch != expected.patch {
            return self.patch > expected.patch;
        }
        true
    }

    /// Required tags that this version does not carry.
    ///
    /// Order and duplicates are irrelevant on both sides.
    #[must_use]
    pub fn missing_build_tags<'a>(&self, required: &'a [String]) -> Vec<&'a str> {
        let present: HashSet<&str> = self.build_tags.iter().map(String::as_str).collect();
        let mut missing: Vec<&str> = Vec::new();
        for tag in required {
            if !present.contains(tag.as_str()) && !missing.contains(&tag.as_str()) {
                missing.push(tag.as_str());
            }
        }
        missing
    }

    /// Short form without build tags, e.g. `v0.11.0-beta`.
    #[must_use]
    pub fn short(&self) -> String {
        format!("v{}.{}.{}-beta", self.major, self.minor, self.patch)
    }
}

impl Default for VersionDescriptor {
    fn default() -> Self {
        Self::minimum_compatible()
    }
}

impl fmt::Display for VersionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, build tags '{}'",
            self.short(),
            self.build_tags.join(",")
        )
    }
}

/// Error returned when parsing a version string fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionParseError {
    /// Wrong number of segments (expected "major.minor.patch").
    InvalidFormat(String),
    /// A numeric segment could not be parsed.
    InvalidNumber(ParseIntError),
}

impl fmt::Display for VersionParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFormat(s) => write!(
                f,
                "invalid version format: {s} (expected major.minor.patch)"
            ),
            Self::InvalidNumber(e) => write!(f, "invalid version number: {e}"),
        }
    }
}

impl std::error::Error for VersionParseError {}

impl From<ParseIntError> for VersionParseError {
    fn from(e: ParseIntError) -> Self {
        Self::InvalidNumber(e)
    }
}

impl FromStr for VersionDescriptor {
    type Err = VersionParseError;

    /// Parses `1.2.3`, `v1.2.3` or `v1.2.3-beta`. Build tags are left empty.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
        let core = trimmed.split_once('-').map_or(trimmed, |(core, _)| core);

        let parts: Vec<&str> = core.split('.').collect();
        let [major, minor, patch] = parts.as_slice() else {
            return Err(VersionParseError::InvalidFormat(s.to_string()));
        };
        Ok(Self::new(major.parse()?, minor.parse()?, patch.parse()?))
    }
}
