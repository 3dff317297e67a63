//! Command marker handling.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, TangleError};

/// Default string preceding every command line.
pub const DEFAULT_MARKER: &str = "%!";

/// How block names found in a file are compared against a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// Names must be identical.
    #[default]
    Exact,
    /// The shorter name must be a prefix of the longer one. This is the
    /// historical behaviour; `greet` matches a block named `greeting`.
    Prefix,
}

impl MatchPolicy {
    /// Compares a candidate block name against the requested name.
    #[must_use]
    pub fn matches(self, candidate: &str, requested: &str) -> bool {
        match self {
            MatchPolicy::Exact => candidate == requested,
            MatchPolicy::Prefix => {
                candidate.starts_with(requested) || requested.starts_with(candidate)
            }
        }
    }
}

/// The literal string that introduces a command line.
///
/// The marker is matched literally even when it contains regex
/// metacharacters, so the default `%!` as well as exotic markers like
/// `\\!` work unchanged.
#[derive(Debug, Clone)]
pub struct CommandMarker {
    text: String,
    pattern: Regex,
}

impl CommandMarker {
    /// Builds a marker and its line-matching pattern.
    pub fn new(marker: &str) -> Result<Self> {
        if marker.is_empty() {
            return Err(TangleError::Config(
                "command marker must not be empty".to_string(),
            ));
        }
        let pattern = Regex::new(&format!(
            r"^\s*{}\s*(?P<name>[^:\s]*)",
            regex::escape(marker)
        ))?;
        Ok(Self {
            text: marker.to_string(),
            pattern,
        })
    }

    /// Returns the marker text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// A line is a command line when its first whitespace-delimited token
    /// starts with the marker. Prefix match, not equality: a marker of `%!`
    /// recognises a first word of `%!foo`.
    pub fn is_command_line(&self, line: &str) -> bool {
        line.split_whitespace()
            .next()
            .is_some_and(|word| word.starts_with(&self.text))
    }

    pub(crate) fn pattern(&self) -> &Regex {
        &self.pattern
    }
}

impl Default for CommandMarker {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER).expect("default marker is a valid pattern")
    }
}
