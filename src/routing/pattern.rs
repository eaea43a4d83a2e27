//! Route pattern matching.
//!
//! # Responsibilities
//! - Compile a route's regular expression exactly once
//! - Match an incoming path and extract capture groups
//!
//! # Design Decisions
//! - Leftmost-first matching (`regex` crate semantics), unanchored unless the
//!   pattern anchors itself
//! - Index 0 is the whole match, indices ≥ 1 are the parenthesized groups
//! - Groups that did not participate in the match yield an empty string so
//!   `$n` numbering stays stable

use std::fmt;
use std::ops::Deref;

use regex::Regex;

/// Error raised when a route pattern fails to compile.
pub type PatternError = regex::Error;

/// A compiled route pattern.
#[derive(Clone)]
pub struct CompiledPattern {
    source: String,
    regex: Regex,
}

impl CompiledPattern {
    /// Compile `source`. Called once per route at table construction.
    pub fn new(source: impl Into<String>) -> Result<Self, PatternError> {
        let source = source.into();
        let regex = Regex::new(&source)?;
        Ok(Self { source, regex })
    }

    /// The pattern as written in configuration.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match `path`, returning every capture group on success.
    pub fn captures(&self, path: &str) -> Option<Captures> {
        let caps = self.regex.captures(path)?;
        let groups = caps
            .iter()
            .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
            .collect();
        Some(Captures(groups))
    }

    /// Cheap check without capture extraction.
    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

impl fmt::Debug for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CompiledPattern").field(&self.source).finish()
    }
}

/// Captured substrings of one successful match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures(Vec<String>);

impl Captures {
    /// Group `index`, if the pattern has that many groups.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }
}

impl Deref for Captures {
    type Target = [String];

    fn deref(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for Captures {
    fn from(groups: Vec<String>) -> Self {
        Self(groups)
    }
}
