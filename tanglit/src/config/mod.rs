//! Engine configuration.

mod marker;

pub use marker::{CommandMarker, MatchPolicy, DEFAULT_MARKER};

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Maximum depth of nested block references.
pub const MAX_RECURSION_LEVEL: usize = 10;

/// Name of the configuration file looked up in the base directory.
pub const CONFIG_FILE: &str = "tanglit.toml";

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// String preceding every command.
    pub marker: String,

    /// How block names are compared against a reference.
    pub block_match: MatchPolicy,

    /// Maximum depth of nested block references.
    pub max_recursion: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            block_match: MatchPolicy::default(),
            max_recursion: MAX_RECURSION_LEVEL,
        }
    }
}

impl Config {
    /// Builds the command marker for this configuration.
    pub fn command_marker(&self) -> Result<CommandMarker> {
        CommandMarker::new(&self.marker)
    }
}

/// Reads configuration from `dir/tanglit.toml`, falling back to defaults
/// when no such file exists.
pub fn read_config(dir: &Path) -> Result<Config> {
    let path = dir.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(Config::default());
    }
    read_config_file(&path)
}

/// Reads configuration from an explicit file path.
pub fn read_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}
