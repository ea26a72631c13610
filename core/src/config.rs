//! Validation limits and diagnostic settings.
//!
//! Defines the YAML-serializable configuration consulted by every
//! interpreted validation call.
//!
//! # Example YAML
//!
//! ```yaml
//! max_depth: 128
//! preview_len: 40
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default maximum number of simultaneously active lazy frames.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Default maximum length, in characters, of a value preview in diagnostics.
pub const DEFAULT_PREVIEW_LEN: usize = 40;

/// Settings for one validation call.
///
/// Every field has a default, so a partial YAML document is accepted.
///
/// # Examples
///
/// ```
/// # use cito_core::ValidationConfig;
/// let config: ValidationConfig = serde_yaml::from_str("max_depth: 16").unwrap();
/// assert_eq!(config.max_depth, 16);
/// assert_eq!(config.preview_len, cito_core::DEFAULT_PREVIEW_LEN);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Maximum number of lazy (recursive) references that may be active at
    /// once. Exceeding it fails the call with
    /// [`DepthLimitExceeded`](crate::CitoError::DepthLimitExceeded).
    pub max_depth: usize,
    /// Maximum number of characters of the offending value rendered after
    /// `got` in a diagnostic.
    pub preview_len: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            preview_len: DEFAULT_PREVIEW_LEN,
        }
    }
}

impl ValidationConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::CitoError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::CitoError::YamlError) if parsing
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::CitoError::IoError) if the file cannot
    /// be written, or [`YamlError`](crate::CitoError::YamlError) if
    /// serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Returns a copy with a different depth limit.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Returns a copy with a different preview length.
    pub fn with_preview_len(mut self, preview_len: usize) -> Self {
        self.preview_len = preview_len;
        self
    }
}
