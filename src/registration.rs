// Copyright 2025 Cowboy AI, LLC.

//! Externally declared fragment implementations
//!
//! Modules can declare implementations for fragment contracts without being
//! scanned, through a properties-style file:
//!
//! ```text
//! # contract = implementation[, implementation...]
//! com.acme.repository.Search=com.acme.search.ElasticSearchImpl
//! com.acme.repository.Audit=com.acme.audit.AuditImpl,\
//!     com.acme.audit.FallbackAuditImpl
//! ```
//!
//! Keys are fully-qualified contract names; values are fully-qualified
//! implementation type names, looked up in the implementation catalog at
//! resolution time.

use crate::contract::is_qualified_name;
use crate::errors::{RepositoryError, RepositoryResult};
use indexmap::IndexMap;
use std::path::Path;
use tracing::debug;

/// Contract name to implementation type names, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalRegistry {
    entries: IndexMap<String, Vec<String>>,
}

impl ExternalRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse registrations from properties-style text
    ///
    /// `#` and `!` start comment lines; a trailing `\` continues the entry on
    /// the next line. Repeated keys accumulate their implementations.
    pub fn parse(input: &str) -> RepositoryResult<Self> {
        let mut registry = Self::new();
        let mut pending: Option<(usize, String)> = None;

        for (index, raw) in input.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();

            let (start, mut logical) = match pending.take() {
                Some(entry) => entry,
                None => {
                    if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                        continue;
                    }
                    (line_no, String::new())
                }
            };

            if let Some(continued) = line.strip_suffix('\\') {
                logical.push_str(continued);
                pending = Some((start, logical));
                continue;
            }
            logical.push_str(line);
            registry.parse_entry(start, &logical)?;
        }

        if let Some((start, logical)) = pending {
            registry.parse_entry(start, &logical)?;
        }

        debug!(contracts = registry.len(), "parsed external fragment registrations");
        Ok(registry)
    }

    /// Read and parse a registration file
    pub fn from_path(path: impl AsRef<Path>) -> RepositoryResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    fn parse_entry(&mut self, line: usize, entry: &str) -> RepositoryResult<()> {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| RepositoryError::InvalidRegistration {
                line,
                reason: format!("expected 'Contract=Implementation', found '{entry}'"),
            })?;

        let contract = key.trim();
        if !is_qualified_name(contract) {
            return Err(RepositoryError::InvalidRegistration {
                line,
                reason: format!("'{contract}' is not a qualified contract name"),
            });
        }

        let implementations: Vec<&str> = value
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .collect();
        if implementations.is_empty() {
            return Err(RepositoryError::InvalidRegistration {
                line,
                reason: format!("no implementation declared for '{contract}'"),
            });
        }
        if let Some(bad) = implementations.iter().find(|name| !is_qualified_name(name)) {
            return Err(RepositoryError::InvalidRegistration {
                line,
                reason: format!("'{bad}' is not a qualified implementation name"),
            });
        }

        for implementation in implementations {
            self.register(contract, implementation);
        }
        Ok(())
    }

    /// Register `implementation` for `contract`, ignoring duplicates
    pub fn register(&mut self, contract: impl Into<String>, implementation: impl Into<String>) {
        let implementation = implementation.into();
        let list = self.entries.entry(contract.into()).or_default();
        if !list.contains(&implementation) {
            list.push(implementation);
        }
    }

    /// Combine with another registry; entries of `self` keep precedence
    pub fn merge(mut self, other: ExternalRegistry) -> Self {
        for (contract, implementations) in other.entries {
            for implementation in implementations {
                self.register(contract.clone(), implementation);
            }
        }
        self
    }

    /// Implementation type names registered for `contract`
    pub fn implementations_for(&self, contract: &str) -> &[String] {
        self.entries
            .get(contract)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Number of contracts with registrations
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
