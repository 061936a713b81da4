// Copyright 2025 Cowboy AI, LLC.

//! Repository interface metadata

use crate::contract::{lower_camel, package_of, simple_name_of, ContractType};
use serde::{Deserialize, Serialize};

/// Describes one repository interface and the fragments it declares
///
/// Fragment contracts are kept in declaration order; that order is the
/// dispatch priority of the composed repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryMetadata {
    repository_interface: String,
    identity_override: Option<String>,
    domain_type: String,
    id_type: String,
    reactive: bool,
    fragment_contracts: Vec<ContractType>,
}

impl RepositoryMetadata {
    /// Create metadata for `repository_interface` managing `domain_type`
    pub fn new(
        repository_interface: impl Into<String>,
        domain_type: impl Into<String>,
        id_type: impl Into<String>,
    ) -> Self {
        Self {
            repository_interface: repository_interface.into(),
            identity_override: None,
            domain_type: domain_type.into(),
            id_type: id_type.into(),
            reactive: false,
            fragment_contracts: Vec::new(),
        }
    }

    /// Give the repository an explicit identity (`@specialCustom`)
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.identity_override = Some(identity.into());
        self
    }

    /// Mark the repository as reactive
    pub fn reactive(mut self) -> Self {
        self.reactive = true;
        self
    }

    /// Declare the next fragment contract (lower priority than those before it)
    pub fn with_fragment(mut self, contract: ContractType) -> Self {
        self.fragment_contracts.push(contract);
        self
    }

    /// Fully-qualified name of the repository interface
    pub fn repository_interface(&self) -> &str {
        &self.repository_interface
    }

    /// Repository interface name without its namespace
    pub fn simple_name(&self) -> &str {
        simple_name_of(&self.repository_interface)
    }

    /// Namespace the repository interface lives in
    pub fn package(&self) -> &str {
        package_of(&self.repository_interface)
    }

    /// The explicit identity override, if one was declared
    pub fn identity_override(&self) -> Option<&str> {
        self.identity_override.as_deref()
    }

    /// Registered identity: the override, or the lower-camel simple name
    pub fn identity(&self) -> String {
        self.identity_override
            .clone()
            .unwrap_or_else(|| lower_camel(self.simple_name()))
    }

    /// Domain type managed by the repository
    pub fn domain_type(&self) -> &str {
        &self.domain_type
    }

    /// Identifier type of the domain type
    pub fn id_type(&self) -> &str {
        &self.id_type
    }

    /// Whether this is a reactive repository
    pub fn is_reactive(&self) -> bool {
        self.reactive
    }

    /// Declared fragment contracts in priority order
    pub fn fragment_contracts(&self) -> &[ContractType] {
        &self.fragment_contracts
    }
}
