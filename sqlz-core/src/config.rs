use crate::codec::gzip::DEFAULT_LEVEL;
use crate::error::Result;
use crate::minify::BlockComments;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Pipeline settings. Every field is optional in the TOML file.
///
/// ```toml
/// level = 9
/// block_comments = "spanning"
/// deterministic = true
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Gzip level, 0-9; larger values are clamped.
    pub level: u32,
    pub block_comments: BlockComments,
    /// When true, bundle entries carry no wall-clock timestamp.
    pub deterministic: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
            block_comments: BlockComments::default(),
            deterministic: false,
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }
}
