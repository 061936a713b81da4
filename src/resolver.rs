// Copyright 2025 Cowboy AI, LLC.

//! Fragment implementation resolution
//!
//! The resolver never scans anything itself. A startup step outside this
//! crate registers every implementation type it discovered in an
//! [`ImplementationCatalog`]; the resolver then matches contracts against the
//! catalog by naming convention and identity, falling back to the
//! [`ExternalRegistry`].
//!
//! Resolution never fails: a contract without a matching implementation
//! yields an unimplemented fragment, and the failure surfaces only when one of
//! its methods is invoked.

use crate::composition::FragmentComposition;
use crate::config::RepositoryConfiguration;
use crate::contract::{lower_camel, package_of, simple_name_of, ContractType};
use crate::errors::{RepositoryError, RepositoryResult};
use crate::fragment::{Fragment, ImplementationFactory, ImplementationRef};
use crate::metadata::RepositoryMetadata;
use crate::registration::ExternalRegistry;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default postfix appended to a contract's simple name to find its implementation
pub const DEFAULT_IMPLEMENTATION_POSTFIX: &str = "Impl";

/// One discovered implementation type
#[derive(Clone)]
pub struct ImplementationCandidate {
    type_name: String,
    explicit_identity: Option<String>,
    factory: ImplementationFactory,
}

impl ImplementationCandidate {
    /// Create a candidate for `type_name`, instantiated through `factory`
    pub fn new<F>(type_name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> RepositoryResult<ImplementationRef> + Send + Sync + 'static,
    {
        Self {
            type_name: type_name.into(),
            explicit_identity: None,
            factory: Arc::new(factory),
        }
    }

    /// Register the candidate under an explicit identity
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.explicit_identity = Some(identity.into());
        self
    }

    /// Fully-qualified implementation type name
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Implementation type name without its namespace
    pub fn simple_name(&self) -> &str {
        simple_name_of(&self.type_name)
    }

    /// Namespace of the implementation type
    pub fn package(&self) -> &str {
        package_of(&self.type_name)
    }

    /// Registered identity: the explicit one, or the lower-camel simple name
    pub fn identity(&self) -> String {
        self.explicit_identity
            .clone()
            .unwrap_or_else(|| lower_camel(self.simple_name()))
    }

    /// Whether the identity was set explicitly
    pub fn has_explicit_identity(&self) -> bool {
        self.explicit_identity.is_some()
    }

    fn bind(&self, contract: &ContractType) -> Fragment {
        Fragment::from_factory(
            contract.clone(),
            self.type_name.clone(),
            Arc::clone(&self.factory),
        )
    }
}

impl fmt::Debug for ImplementationCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImplementationCandidate")
            .field("type_name", &self.type_name)
            .field("identity", &self.identity())
            .finish()
    }
}

/// Every implementation type known to the application, keyed by type name
#[derive(Debug, Clone, Default)]
pub struct ImplementationCatalog {
    candidates: IndexMap<String, ImplementationCandidate>,
}

impl ImplementationCatalog {
    /// An empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a candidate
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the type name is already registered.
    pub fn register(&mut self, candidate: ImplementationCandidate) -> RepositoryResult<()> {
        if self.candidates.contains_key(candidate.type_name()) {
            return Err(RepositoryError::InvalidArgument(format!(
                "Implementation {} already registered",
                candidate.type_name()
            )));
        }
        self.candidates
            .insert(candidate.type_name().to_string(), candidate);
        Ok(())
    }

    /// Builder-style [`register`](Self::register)
    pub fn with(mut self, candidate: ImplementationCandidate) -> RepositoryResult<Self> {
        self.register(candidate)?;
        Ok(self)
    }

    /// Look up a candidate by fully-qualified type name
    pub fn get(&self, type_name: &str) -> Option<&ImplementationCandidate> {
        self.candidates.get(type_name)
    }

    /// Candidates in registration order
    pub fn iter(&self) -> impl Iterator<Item = &ImplementationCandidate> {
        self.candidates.values()
    }

    /// Number of candidates
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Where and how to look for implementations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchScope {
    base_packages: Vec<String>,
    implementation_postfix: String,
    exclude_filters: Vec<String>,
}

impl SearchScope {
    /// Scope covering `base_packages` with the default postfix
    ///
    /// An empty package list means "the repository interface's package".
    pub fn new<I, S>(base_packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            base_packages: base_packages.into_iter().map(Into::into).collect(),
            implementation_postfix: DEFAULT_IMPLEMENTATION_POSTFIX.to_string(),
            exclude_filters: Vec::new(),
        }
    }

    /// Scope described by a repository configuration
    pub fn from_configuration(configuration: &RepositoryConfiguration) -> Self {
        Self {
            base_packages: configuration.base_packages.clone(),
            implementation_postfix: configuration.implementation_postfix.clone(),
            exclude_filters: configuration.exclude_filters.clone(),
        }
    }

    /// Use a different implementation postfix
    pub fn with_postfix(mut self, postfix: impl Into<String>) -> Self {
        self.implementation_postfix = postfix.into();
        self
    }

    /// Never consider types whose name starts with `prefix`
    pub fn with_exclude(mut self, prefix: impl Into<String>) -> Self {
        self.exclude_filters.push(prefix.into());
        self
    }

    /// Implementation postfix
    pub fn implementation_postfix(&self) -> &str {
        &self.implementation_postfix
    }

    /// Configured base packages
    pub fn base_packages(&self) -> &[String] {
        &self.base_packages
    }

    fn covers(&self, candidate: &ImplementationCandidate, repository: &RepositoryMetadata) -> bool {
        if self
            .exclude_filters
            .iter()
            .any(|prefix| candidate.type_name().starts_with(prefix.as_str()))
        {
            return false;
        }
        let package = candidate.package();
        let within = |base: &str| {
            base.is_empty()
                || package == base
                || package
                    .strip_prefix(base)
                    .is_some_and(|rest| rest.starts_with('.'))
        };
        if self.base_packages.is_empty() {
            within(repository.package())
        } else {
            self.base_packages.iter().any(|base| within(base.as_str()))
        }
    }
}

impl Default for SearchScope {
    fn default() -> Self {
        Self::new(Vec::<String>::new())
    }
}

/// Matches fragment contracts to implementations
#[derive(Debug, Clone, Default)]
pub struct FragmentResolver {
    catalog: ImplementationCatalog,
    registry: ExternalRegistry,
}

impl FragmentResolver {
    /// Create a resolver over a catalog and external registrations
    pub fn new(catalog: ImplementationCatalog, registry: ExternalRegistry) -> Self {
        Self { catalog, registry }
    }

    /// The implementation catalog
    pub fn catalog(&self) -> &ImplementationCatalog {
        &self.catalog
    }

    /// The external registrations
    pub fn registry(&self) -> &ExternalRegistry {
        &self.registry
    }

    /// Resolve the fragment for `contract` declared by `repository`
    ///
    /// Scanned candidates inside `scope` take precedence over external
    /// registrations. Several scanned candidates are told apart by identity:
    /// the expected identity is the repository's identity override plus the
    /// postfix when one is declared, else the lower-camel contract name plus
    /// the postfix.
    pub fn resolve(
        &self,
        contract: &ContractType,
        scope: &SearchScope,
        repository: &RepositoryMetadata,
    ) -> Fragment {
        let expected_type = format!("{}{}", contract.simple_name(), scope.implementation_postfix());
        let candidates: Vec<&ImplementationCandidate> = self
            .catalog
            .iter()
            .filter(|candidate| candidate.simple_name() == expected_type)
            .filter(|candidate| scope.covers(candidate, repository))
            .collect();

        match candidates.as_slice() {
            [single] => {
                debug!(
                    contract = %contract.name(),
                    implementation = %single.type_name(),
                    "resolved fragment implementation"
                );
                return single.bind(contract);
            }
            [] => {}
            several => {
                let expected_identity = expected_identity(contract, scope, repository);
                return match several
                    .iter()
                    .find(|candidate| candidate.identity() == expected_identity)
                {
                    Some(chosen) => {
                        debug!(
                            contract = %contract.name(),
                            implementation = %chosen.type_name(),
                            identity = %expected_identity,
                            candidates = several.len(),
                            "resolved ambiguous fragment implementation by identity"
                        );
                        chosen.bind(contract)
                    }
                    None => {
                        let names: Vec<&str> = several.iter().map(|c| c.type_name()).collect();
                        warn!(
                            contract = %contract.name(),
                            identity = %expected_identity,
                            candidates = ?names,
                            "no candidate matches the expected identity; fragment left unimplemented"
                        );
                        Fragment::unimplemented(contract.clone())
                    }
                };
            }
        }

        for type_name in self.registry.implementations_for(contract.name()) {
            match self.catalog.get(type_name) {
                Some(candidate) => {
                    debug!(
                        contract = %contract.name(),
                        implementation = %type_name,
                        "resolved fragment implementation from external registration"
                    );
                    return candidate.bind(contract);
                }
                None => warn!(
                    contract = %contract.name(),
                    implementation = %type_name,
                    "externally registered implementation is not in the catalog"
                ),
            }
        }

        debug!(contract = %contract.name(), "no implementation found; fragment left unimplemented");
        Fragment::unimplemented(contract.clone())
    }

    /// Fill every placeholder of `composition` that can be resolved
    ///
    /// Bound fragments keep the slot of the placeholder they replace.
    pub fn bind(
        &self,
        composition: &FragmentComposition,
        scope: &SearchScope,
        repository: &RepositoryMetadata,
    ) -> FragmentComposition {
        composition
            .iter()
            .filter(|fragment| !fragment.is_implemented())
            .map(|placeholder| self.resolve(placeholder.contract(), scope, repository))
            .collect::<Vec<_>>()
            .into_iter()
            .fold(composition.clone(), |composition, fragment| composition.append(fragment))
    }

    /// Compose the full repository: declared fragments in declaration order,
    /// then `base` last
    pub fn resolve_composition(
        &self,
        repository: &RepositoryMetadata,
        scope: &SearchScope,
        base: Fragment,
    ) -> FragmentComposition {
        let declared = FragmentComposition::of(
            repository
                .fragment_contracts()
                .iter()
                .cloned()
                .map(Fragment::unimplemented),
        )
        .for_repository(repository.repository_interface());

        self.bind(&declared, scope, repository).append(base)
    }
}

fn expected_identity(
    contract: &ContractType,
    scope: &SearchScope,
    repository: &RepositoryMetadata,
) -> String {
    let stem = match repository.identity_override() {
        Some(identity) => identity.to_string(),
        None => lower_camel(contract.simple_name()),
    };
    format!("{stem}{}", scope.implementation_postfix())
}
