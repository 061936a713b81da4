// Copyright 2025 Cowboy AI, LLC.

//! Repository configuration

use crate::errors::RepositoryResult;
use crate::resolver::DEFAULT_IMPLEMENTATION_POSTFIX;
use serde::{Deserialize, Serialize};

/// When unimplemented fragments are reported
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapMode {
    /// Report on first invocation of an unimplemented method
    #[default]
    Lazy,
    /// Refuse to create a repository with unimplemented fragments
    Eager,
}

/// Per-repository configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfiguration {
    /// Make invocation metadata available to fragment implementations
    pub expose_metadata: bool,
    /// Postfix appended to contract names to find implementations
    pub implementation_postfix: String,
    /// Namespaces searched for implementations; empty means the repository's own
    pub base_packages: Vec<String>,
    /// Type-name prefixes never considered as implementations
    pub exclude_filters: Vec<String>,
    /// When unimplemented fragments are reported
    pub bootstrap_mode: BootstrapMode,
}

impl Default for RepositoryConfiguration {
    fn default() -> Self {
        Self {
            expose_metadata: false,
            implementation_postfix: DEFAULT_IMPLEMENTATION_POSTFIX.to_string(),
            base_packages: Vec::new(),
            exclude_filters: Vec::new(),
            bootstrap_mode: BootstrapMode::Lazy,
        }
    }
}

impl RepositoryConfiguration {
    /// Parse a configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> RepositoryResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Enable or disable invocation metadata exposure
    pub fn with_expose_metadata(mut self, expose: bool) -> Self {
        self.expose_metadata = expose;
        self
    }

    /// Set the implementation postfix
    pub fn with_implementation_postfix(mut self, postfix: impl Into<String>) -> Self {
        self.implementation_postfix = postfix.into();
        self
    }

    /// Add a base package to search
    pub fn with_base_package(mut self, package: impl Into<String>) -> Self {
        self.base_packages.push(package.into());
        self
    }

    /// Add an exclude filter
    pub fn with_exclude_filter(mut self, prefix: impl Into<String>) -> Self {
        self.exclude_filters.push(prefix.into());
        self
    }

    /// Set the bootstrap mode
    pub fn with_bootstrap_mode(mut self, mode: BootstrapMode) -> Self {
        self.bootstrap_mode = mode;
        self
    }
}
