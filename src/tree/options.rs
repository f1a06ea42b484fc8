use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{Result, TreeError};

use super::node::Sizing;

/// Order used by document producers for name and number trees.
pub const DEFAULT_ORDER: usize = 5;

/// Configuration knobs for a tree instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TreeOptions {
    /// Order `t`: leaves hold `[2t, 4t]` pairs, interior nodes `[t, 2t]` kids.
    pub order: usize,
    /// Run a full structural verification when adopting an existing root.
    pub verify_on_open: bool,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            order: DEFAULT_ORDER,
            verify_on_open: false,
        }
    }
}

impl TreeOptions {
    /// Options with the given order and defaults elsewhere.
    pub fn with_order(order: usize) -> Self {
        Self {
            order,
            ..Self::default()
        }
    }

    /// Parses options from a TOML document.
    pub fn from_toml_str(contents: &str) -> std::result::Result<Self, OptionsError> {
        toml::from_str(contents).map_err(|source| OptionsError::Parse { path: None, source })
    }

    /// Loads options from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> std::result::Result<Self, OptionsError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| OptionsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| OptionsError::Parse {
            path: Some(path.to_path_buf()),
            source,
        })
    }

    /// Rejects a zero order.
    pub fn validate(&self) -> Result<()> {
        if self.order == 0 {
            return Err(TreeError::InvalidArgument(
                "tree order must be positive, got 0".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn sizing(&self) -> Sizing {
        Sizing::new(self.order)
    }
}

/// Failures while loading [`TreeOptions`].
#[derive(Debug, Error)]
pub enum OptionsError {
    /// The options file could not be read.
    #[error("failed to read tree options {}: {}", .path.display(), .source)]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The options document is not valid TOML for [`TreeOptions`].
    #[error("failed to parse tree options{}: {}", describe_path(.path), .source)]
    Parse {
        /// File that was being parsed, if any.
        path: Option<PathBuf>,
        /// Underlying TOML failure.
        #[source]
        source: toml::de::Error,
    },
}

fn describe_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" {}", p.display()))
        .unwrap_or_default()
}
