//! Expansion configuration
//!
//! Marker names and the empty-matrix policy. Every field has a default, so an
//! empty YAML document (or no document at all) yields the stock behaviour:
//!
//! ```yaml
//! scope_marker: scope
//! loop_marker: matrix
//! empty_matrix: reject
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::info;

/// Environment variable naming a YAML configuration file.
pub const CONFIG_ENV_VAR: &str = "DECL_MATRIX_CONFIG";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("marker name `{0}` is not a valid identifier")]
    InvalidMarker(String),

    #[error("scope and loop markers must differ, both are `{0}`")]
    SameMarkers(String),

    #[error("`doc` is reserved for documentation and cannot be used as a marker")]
    ReservedMarker,
}

/// What to do when a loop variable ranges over an empty matrix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyMatrixPolicy {
    /// Fail the whole expansion.
    #[default]
    Reject,
    /// Expand the declaration to nothing and log a warning.
    Allow,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExpandConfig {
    /// Attribute name introducing a named matrix, `#[scope]` by default.
    pub scope_marker: String,
    /// Attribute name requesting Cartesian expansion, `#[matrix(..)]` by default.
    pub loop_marker: String,
    pub empty_matrix: EmptyMatrixPolicy,
}

impl Default for ExpandConfig {
    fn default() -> Self {
        Self {
            scope_marker: "scope".to_string(),
            loop_marker: "matrix".to_string(),
            empty_matrix: EmptyMatrixPolicy::Reject,
        }
    }
}

impl ExpandConfig {
    pub fn with_scope_marker(mut self, name: impl Into<String>) -> Self {
        self.scope_marker = name.into();
        self
    }

    pub fn with_loop_marker(mut self, name: impl Into<String>) -> Self {
        self.loop_marker = name.into();
        self
    }

    pub fn with_empty_matrix(mut self, policy: EmptyMatrixPolicy) -> Self {
        self.empty_matrix = policy;
        self
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(source: &str) -> Result<Self> {
        let config: Self = if source.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(source).context("Failed to parse expansion config")?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading expansion configuration from {}", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_yaml_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Load from the file named by `DECL_MATRIX_CONFIG`, or fall back to defaults.
    pub fn from_env() -> Result<Self> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) if !path.is_empty() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for name in [&self.scope_marker, &self.loop_marker] {
            if syn::parse_str::<syn::Ident>(name).is_err() {
                return Err(ConfigError::InvalidMarker(name.clone()));
            }
            if name == "doc" {
                return Err(ConfigError::ReservedMarker);
            }
        }
        if self.scope_marker == self.loop_marker {
            return Err(ConfigError::SameMarkers(self.scope_marker.clone()));
        }
        Ok(())
    }

    pub(crate) fn is_scope_marker(&self, attr: &syn::Attribute) -> bool {
        attr.path().is_ident(&self.scope_marker)
    }

    pub(crate) fn is_loop_marker(&self, attr: &syn::Attribute) -> bool {
        attr.path().is_ident(&self.loop_marker)
    }
}
