// Copyright 2025 Cowboy AI, LLC.

//! Repository creation and dispatch
//!
//! [`RepositoryFactory`] turns repository metadata plus a base implementation
//! into a [`ComposedRepository`]: the resolved fragment composition with a
//! precomputed dispatch table. Every call is routed to the first fragment
//! declaring the method.

use crate::composition::{DispatchTable, FragmentComposition};
use crate::config::{BootstrapMode, RepositoryConfiguration};
use crate::context::{self, ContextGuard, RepositoryMethodContext};
use crate::contract::MethodSignature;
use crate::errors::{RepositoryError, RepositoryResult};
use crate::extension::RepositoryConfigurationExtension;
use crate::fragment::Fragment;
use crate::metadata::RepositoryMetadata;
use crate::resolver::{FragmentResolver, SearchScope};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug_span, info};

/// Creates composed repositories
#[derive(Debug, Clone, Default)]
pub struct RepositoryFactory {
    resolver: FragmentResolver,
    configuration: RepositoryConfiguration,
    extensions: Vec<Arc<dyn RepositoryConfigurationExtension>>,
}

impl RepositoryFactory {
    /// Create a factory resolving fragments through `resolver`
    pub fn new(resolver: FragmentResolver, configuration: RepositoryConfiguration) -> Self {
        Self {
            resolver,
            configuration,
            extensions: Vec::new(),
        }
    }

    /// Register a store-module extension
    pub fn register_extension(
        &mut self,
        extension: impl RepositoryConfigurationExtension + 'static,
    ) {
        self.extensions.push(Arc::new(extension));
    }

    /// Builder-style [`register_extension`](Self::register_extension)
    pub fn with_extension(
        mut self,
        extension: impl RepositoryConfigurationExtension + 'static,
    ) -> Self {
        self.register_extension(extension);
        self
    }

    /// The factory configuration
    pub fn configuration(&self) -> &RepositoryConfiguration {
        &self.configuration
    }

    /// Create the repository described by `metadata` on top of `base`
    ///
    /// Without registered extensions every repository is accepted.
    ///
    /// # Errors
    ///
    /// - `RepositoryCreation` when no extension accepts the repository
    /// - `FragmentNotImplemented` in eager bootstrap mode when a declared
    ///   fragment has no implementation
    pub fn get_repository(
        &self,
        metadata: RepositoryMetadata,
        base: Fragment,
    ) -> RepositoryResult<ComposedRepository> {
        let module = self.select_module(&metadata)?;
        let scope = SearchScope::from_configuration(&self.configuration);
        let composition = self.resolver.resolve_composition(&metadata, &scope, base);

        if self.configuration.bootstrap_mode == BootstrapMode::Eager {
            composition.validate_implementation()?;
        }

        info!(
            repository = %metadata.repository_interface(),
            module = module.as_deref().unwrap_or("default"),
            fragments = composition.len(),
            unimplemented = composition.iter().filter(|f| !f.is_implemented()).count(),
            "created repository"
        );

        Ok(ComposedRepository::new(
            Arc::new(metadata),
            composition,
            self.configuration.expose_metadata,
        ))
    }

    fn select_module(&self, metadata: &RepositoryMetadata) -> RepositoryResult<Option<String>> {
        if self.extensions.is_empty() {
            return Ok(None);
        }
        self.extensions
            .iter()
            .find(|extension| extension.use_repository_configuration(metadata))
            .map(|extension| Some(extension.module_name().to_string()))
            .ok_or_else(|| RepositoryError::RepositoryCreation {
                message: format!(
                    "no store module accepts this {} repository",
                    if metadata.is_reactive() { "reactive" } else { "imperative" }
                ),
                repository_interface: metadata.repository_interface().to_string(),
            })
    }
}

/// A repository assembled from fragments
#[derive(Debug, Clone)]
pub struct ComposedRepository {
    metadata: Arc<RepositoryMetadata>,
    composition: FragmentComposition,
    dispatch: DispatchTable,
    expose_metadata: bool,
}

impl ComposedRepository {
    /// Assemble a repository from an existing composition
    pub fn new(
        metadata: Arc<RepositoryMetadata>,
        composition: FragmentComposition,
        expose_metadata: bool,
    ) -> Self {
        let composition = composition.for_repository(metadata.repository_interface());
        let dispatch = composition.dispatch_table();
        Self {
            metadata,
            composition,
            dispatch,
            expose_metadata,
        }
    }

    /// Repository metadata
    pub fn metadata(&self) -> &RepositoryMetadata {
        &self.metadata
    }

    /// The fragment composition
    pub fn composition(&self) -> &FragmentComposition {
        &self.composition
    }

    /// Whether invocation metadata is exposed to implementations
    pub fn exposes_metadata(&self) -> bool {
        self.expose_metadata
    }

    /// Whether `method` is part of this repository's surface
    pub fn declares(&self, method: &MethodSignature) -> bool {
        self.dispatch.lookup(method).is_some()
    }

    /// Invoke `method` with `args`
    ///
    /// When metadata exposure is enabled the invocation context is current
    /// for the duration of the call.
    ///
    /// # Errors
    ///
    /// - `MethodNotFound` when no fragment declares `method`
    /// - `FragmentNotImplemented` when the declaring fragment has no
    ///   implementation
    /// - whatever the implementation returns
    pub fn invoke(&self, method: &MethodSignature, args: &[Value]) -> RepositoryResult<Value> {
        let span = debug_span!(
            "repository.invoke",
            repository = %self.metadata.repository_interface(),
            method = %method
        );
        let _entered = span.enter();

        let fragment = self.lookup(method)?;
        let _guard = if self.expose_metadata {
            ContextGuard::enter(self.context_for(method))
        } else {
            ContextGuard::suppress()
        };
        fragment.invoke(self.metadata.repository_interface(), method, args)
    }

    /// Invoke `method` with the invocation context stored task-locally
    ///
    /// Same outcomes as [`invoke`](Self::invoke).
    pub async fn invoke_scoped(
        &self,
        method: &MethodSignature,
        args: &[Value],
    ) -> RepositoryResult<Value> {
        let fragment = self.lookup(method)?;
        let repository_interface = self.metadata.repository_interface();
        let context = self.expose_metadata.then(|| self.context_for(method));
        context::scope_slot(context, async move {
            let _deferred = ContextGuard::defer_to_task();
            fragment.invoke(repository_interface, method, args)
        })
        .await
    }

    fn lookup(&self, method: &MethodSignature) -> RepositoryResult<&Fragment> {
        self.dispatch
            .resolve(method)?
            .ok_or_else(|| RepositoryError::MethodNotFound {
                repository_interface: self.metadata.repository_interface().to_string(),
                method: method.to_string(),
            })
    }

    fn context_for(&self, method: &MethodSignature) -> RepositoryMethodContext {
        RepositoryMethodContext::new(Arc::clone(&self.metadata), method.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::ContractType;
    use crate::extension::ModuleExtension;
    use crate::fragment::tests::Tagged;
    use crate::fragment::{FragmentImplementation, ImplementationRef};
    use crate::registration::ExternalRegistry;
    use crate::resolver::{ImplementationCandidate, ImplementationCatalog};
    use serde_json::json;

    /// Reports the invocation context it observes
    #[derive(Debug)]
    struct ContextInspector;

    impl FragmentImplementation for ContextInspector {
        fn type_name(&self) -> &str {
            "com.acme.store.ContextInspector"
        }

        fn supports(&self, method: &MethodSignature) -> bool {
            method.name() == "inspect"
        }

        fn invoke(&self, _method: &MethodSignature, _args: &[Value]) -> RepositoryResult<Value> {
            let context = context::current()?;
            Ok(json!({
                "repository": context.repository_interface(),
                "domain": context.domain_type(),
                "method": context.method().to_string(),
            }))
        }
    }

    fn inspect() -> MethodSignature {
        MethodSignature::new("inspect", Vec::<String>::new())
    }

    fn base() -> Fragment {
        Fragment::implemented(
            ContractType::new("com.acme.store.SimpleRepository").with_method(inspect()),
            Arc::new(ContextInspector),
        )
        .unwrap()
    }

    fn metadata() -> RepositoryMetadata {
        RepositoryMetadata::new("com.acme.repository.UserRepository", "User", "Long")
    }

    #[test]
    fn test_context_exposed_when_enabled() {
        let factory = RepositoryFactory::new(
            FragmentResolver::default(),
            RepositoryConfiguration::default().with_expose_metadata(true),
        );
        let repository = factory.get_repository(metadata(), base()).unwrap();

        let result = repository.invoke(&inspect(), &[]).unwrap();

        assert_eq!(result["repository"], "com.acme.repository.UserRepository");
        assert_eq!(result["domain"], "User");
        assert_eq!(result["method"], "inspect()");
        assert!(!context::is_active());
    }

    #[test]
    fn test_context_absent_when_disabled() {
        let factory = RepositoryFactory::default();
        let repository = factory.get_repository(metadata(), base()).unwrap();

        let err = repository.invoke(&inspect(), &[]).unwrap_err();
        assert!(err.is_illegal_state());
    }

    #[tokio::test]
    async fn test_invoke_scoped_uses_task_context() {
        let factory = RepositoryFactory::new(
            FragmentResolver::default(),
            RepositoryConfiguration::default().with_expose_metadata(true),
        );
        let repository = factory.get_repository(metadata(), base()).unwrap();

        let result = repository.invoke_scoped(&inspect(), &[]).await.unwrap();
        assert_eq!(result["domain"], "User");
        assert!(!context::is_active());
    }

    #[derive(Debug)]
    struct Failing;

    impl FragmentImplementation for Failing {
        fn type_name(&self) -> &str {
            "com.acme.store.Failing"
        }

        fn supports(&self, _method: &MethodSignature) -> bool {
            true
        }

        fn invoke(&self, method: &MethodSignature, _args: &[Value]) -> RepositoryResult<Value> {
            assert!(context::is_active());
            Err(RepositoryError::InvocationFailed {
                method: method.to_string(),
                reason: "store unavailable".to_string(),
            })
        }
    }

    #[test]
    fn test_context_released_when_implementation_fails() {
        let base = Fragment::implemented(
            ContractType::new("com.acme.store.SimpleRepository").with_method(inspect()),
            Arc::new(Failing),
        )
        .unwrap();
        let repository = RepositoryFactory::new(
            FragmentResolver::default(),
            RepositoryConfiguration::default().with_expose_metadata(true),
        )
        .get_repository(metadata(), base)
        .unwrap();

        let err = repository.invoke(&inspect(), &[]).unwrap_err();

        assert_eq!(err.to_string(), "Invocation of inspect() failed: store unavailable");
        assert!(!context::is_active());
    }

    #[test]
    fn test_unknown_method() {
        let repository = RepositoryFactory::default()
            .get_repository(metadata(), base())
            .unwrap();

        let method = MethodSignature::new("delete", ["User"]);
        assert!(!repository.declares(&method));
        match repository.invoke(&method, &[]) {
            Err(RepositoryError::MethodNotFound { method, .. }) => {
                assert_eq!(method, "delete(User)")
            }
            other => panic!("Expected MethodNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_eager_bootstrap_rejects_unimplemented_fragments() {
        let factory = RepositoryFactory::new(
            FragmentResolver::default(),
            RepositoryConfiguration::default().with_bootstrap_mode(BootstrapMode::Eager),
        );
        let metadata = metadata().with_fragment(ContractType::new("com.acme.repository.Search"));

        let err = factory.get_repository(metadata, base()).unwrap_err();
        assert!(err.is_repository_creation_error());
        assert_eq!(err.fragment().unwrap().contract().simple_name(), "Search");
    }

    #[test]
    fn test_extension_selection() {
        let factory = RepositoryFactory::default()
            .with_extension(ModuleExtension::reactive("Reactive Commons", "commons"));

        let err = factory.get_repository(metadata(), base()).unwrap_err();
        assert!(matches!(err, RepositoryError::RepositoryCreation { .. }));
        assert_eq!(err.repository_interface(), Some("com.acme.repository.UserRepository"));

        assert!(factory.get_repository(metadata().reactive(), base()).is_ok());
    }

    #[test]
    fn test_resolved_custom_fragment_overrides_base() {
        let catalog = ImplementationCatalog::new()
            .with(ImplementationCandidate::new(
                "com.acme.repository.InspectOverrideImpl",
                || {
                    Ok(Tagged::new("com.acme.repository.InspectOverrideImpl", &["inspect"])
                        as ImplementationRef)
                },
            ))
            .unwrap();
        let factory = RepositoryFactory::new(
            FragmentResolver::new(catalog, ExternalRegistry::new()),
            RepositoryConfiguration::default().with_base_package("com.acme"),
        );
        let metadata = metadata().with_fragment(
            ContractType::new("com.acme.repository.InspectOverride").with_method(inspect()),
        );

        let repository = factory.get_repository(metadata, base()).unwrap();
        let result = repository.invoke(&inspect(), &[]).unwrap();

        assert_eq!(result["by"], "com.acme.repository.InspectOverrideImpl");
    }
}
