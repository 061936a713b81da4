// Copyright 2025 Cowboy AI, LLC.

//! Store module extensions
//!
//! Each store module contributes an extension that decides which repository
//! interfaces it is responsible for. A factory only creates repositories some
//! registered extension accepts.

use crate::metadata::RepositoryMetadata;
use std::fmt;

/// Store-module hook deciding which repositories the module creates
pub trait RepositoryConfigurationExtension: Send + Sync + fmt::Debug {
    /// Human readable module name
    fn module_name(&self) -> &str;

    /// Prefix used for module-specific configuration keys
    fn module_prefix(&self) -> &str;

    /// Whether this module creates `metadata`'s repository
    ///
    /// Imperative modules accept non-reactive repositories only.
    fn use_repository_configuration(&self, metadata: &RepositoryMetadata) -> bool {
        !metadata.is_reactive()
    }
}

/// Extension accepting either imperative or reactive repositories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleExtension {
    module_name: String,
    module_prefix: String,
    reactive: bool,
}

impl ModuleExtension {
    /// Extension for imperative repositories
    pub fn imperative(module_name: impl Into<String>, module_prefix: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            module_prefix: module_prefix.into(),
            reactive: false,
        }
    }

    /// Extension for reactive repositories
    pub fn reactive(module_name: impl Into<String>, module_prefix: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            module_prefix: module_prefix.into(),
            reactive: true,
        }
    }
}

impl RepositoryConfigurationExtension for ModuleExtension {
    fn module_name(&self) -> &str {
        &self.module_name
    }

    fn module_prefix(&self) -> &str {
        &self.module_prefix
    }

    fn use_repository_configuration(&self, metadata: &RepositoryMetadata) -> bool {
        metadata.is_reactive() == self.reactive
    }
}
