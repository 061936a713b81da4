// Copyright 2025 Cowboy AI, LLC.

//! Repository fragments
//!
//! A [`Fragment`] pairs a capability contract with an optional implementation.
//! Fragments are immutable values: binding an implementation to a placeholder
//! produces a new fragment for the same contract.
//!
//! Implementations are invoked with JSON values for arguments and results so
//! that fragments of different contracts can share one dispatch table.

use crate::contract::{ContractType, MethodSignature};
use crate::errors::{RepositoryError, RepositoryResult};
use once_cell::sync::OnceCell;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A concrete implementation backing one or more fragment contracts
///
/// # Example
///
/// ```
/// use cim_repository::{FragmentImplementation, MethodSignature, RepositoryResult};
/// use serde_json::Value;
///
/// #[derive(Debug)]
/// struct SearchImpl;
///
/// impl FragmentImplementation for SearchImpl {
///     fn type_name(&self) -> &str { "com.acme.repository.SearchImpl" }
///     fn supports(&self, method: &MethodSignature) -> bool { method.name() == "search" }
///     fn invoke(&self, _method: &MethodSignature, args: &[Value]) -> RepositoryResult<Value> {
///         Ok(Value::Array(args.to_vec()))
///     }
/// }
/// ```
pub trait FragmentImplementation: Send + Sync + fmt::Debug {
    /// Fully-qualified name of the implementation type
    fn type_name(&self) -> &str;

    /// Whether this implementation answers `method`
    fn supports(&self, method: &MethodSignature) -> bool;

    /// Handle one call
    fn invoke(&self, method: &MethodSignature, args: &[Value]) -> RepositoryResult<Value>;

    /// Whether this implementation answers every method of `contract`
    fn satisfies(&self, contract: &ContractType) -> bool {
        contract.methods().all(|method| self.supports(method))
    }
}

/// Shared handle to an implementation instance
pub type ImplementationRef = Arc<dyn FragmentImplementation>;

/// Factory producing an implementation instance on demand
pub type ImplementationFactory = Arc<dyn Fn() -> RepositoryResult<ImplementationRef> + Send + Sync>;

/// Implementation materialized on first use
struct LazyImplementation {
    type_name: String,
    factory: ImplementationFactory,
    instance: OnceCell<ImplementationRef>,
}

impl LazyImplementation {
    fn get(&self, contract: &ContractType) -> RepositoryResult<&ImplementationRef> {
        self.instance.get_or_try_init(|| {
            debug!(
                implementation = %self.type_name,
                contract = %contract.name(),
                "materializing fragment implementation"
            );
            let instance = (self.factory)()?;
            check_contract(contract, instance.as_ref())?;
            Ok(instance)
        })
    }
}

#[derive(Clone)]
enum Binding {
    Eager(ImplementationRef),
    Lazy(Arc<LazyImplementation>),
}

impl Binding {
    fn type_name(&self) -> &str {
        match self {
            Binding::Eager(instance) => instance.type_name(),
            Binding::Lazy(lazy) => &lazy.type_name,
        }
    }
}

/// A contract with an optional implementation
#[derive(Clone)]
pub struct Fragment {
    contract: Arc<ContractType>,
    binding: Option<Binding>,
}

impl Fragment {
    /// Create a fragment backed by `instance`
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `instance` does not answer every method of
    /// `contract`.
    pub fn implemented(
        contract: impl Into<Arc<ContractType>>,
        instance: ImplementationRef,
    ) -> RepositoryResult<Self> {
        let contract = contract.into();
        check_contract(&contract, instance.as_ref())?;
        Ok(Self {
            contract,
            binding: Some(Binding::Eager(instance)),
        })
    }

    /// Create a placeholder fragment awaiting an implementation
    pub fn unimplemented(contract: impl Into<Arc<ContractType>>) -> Self {
        Self {
            contract: contract.into(),
            binding: None,
        }
    }

    /// Create a fragment whose implementation is built on first invocation
    ///
    /// The contract check is deferred until the factory runs.
    pub fn lazy<F>(
        contract: impl Into<Arc<ContractType>>,
        type_name: impl Into<String>,
        factory: F,
    ) -> Self
    where
        F: Fn() -> RepositoryResult<ImplementationRef> + Send + Sync + 'static,
    {
        Self::from_factory(contract, type_name, Arc::new(factory))
    }

    pub(crate) fn from_factory(
        contract: impl Into<Arc<ContractType>>,
        type_name: impl Into<String>,
        factory: ImplementationFactory,
    ) -> Self {
        Self {
            contract: contract.into(),
            binding: Some(Binding::Lazy(Arc::new(LazyImplementation {
                type_name: type_name.into(),
                factory,
                instance: OnceCell::new(),
            }))),
        }
    }

    /// Return a new fragment for the same contract backed by `instance`
    pub fn with_implementation(&self, instance: ImplementationRef) -> RepositoryResult<Self> {
        Self::implemented(Arc::clone(&self.contract), instance)
    }

    /// The capability contract
    pub fn contract(&self) -> &ContractType {
        &self.contract
    }

    /// Whether an implementation is bound
    pub fn is_implemented(&self) -> bool {
        self.binding.is_some()
    }

    /// Whether the implementation instance exists already
    pub fn is_materialized(&self) -> bool {
        match &self.binding {
            Some(Binding::Eager(_)) => true,
            Some(Binding::Lazy(lazy)) => lazy.instance.get().is_some(),
            None => false,
        }
    }

    /// Type name of the bound implementation, if any
    pub fn implementation_type(&self) -> Option<&str> {
        self.binding.as_ref().map(Binding::type_name)
    }

    /// The implementation instance, materializing a lazy binding
    pub fn implementation(&self) -> RepositoryResult<Option<ImplementationRef>> {
        match &self.binding {
            Some(Binding::Eager(instance)) => Ok(Some(Arc::clone(instance))),
            Some(Binding::Lazy(lazy)) => lazy.get(&self.contract).map(|i| Some(Arc::clone(i))),
            None => Ok(None),
        }
    }

    /// Whether the contract declares `method`
    pub fn has_method(&self, method: &MethodSignature) -> bool {
        self.contract.declares(method)
    }

    /// Invoke `method` on the bound implementation
    ///
    /// # Errors
    ///
    /// Returns `FragmentNotImplemented` naming `repository_interface` and this
    /// fragment when no implementation is bound.
    pub fn invoke(
        &self,
        repository_interface: &str,
        method: &MethodSignature,
        args: &[Value],
    ) -> RepositoryResult<Value> {
        match self.implementation()? {
            Some(instance) => instance.invoke(method, args),
            None => Err(RepositoryError::fragment_not_implemented(
                repository_interface,
                self.clone(),
            )),
        }
    }
}

fn check_contract(
    contract: &ContractType,
    instance: &dyn FragmentImplementation,
) -> RepositoryResult<()> {
    if instance.satisfies(contract) {
        return Ok(());
    }
    let missing: Vec<String> = contract
        .methods()
        .filter(|m| !instance.supports(m))
        .map(ToString::to_string)
        .collect();
    Err(RepositoryError::InvalidArgument(format!(
        "Implementation {} does not satisfy {}: missing {}",
        instance.type_name(),
        contract.name(),
        missing.join(", ")
    )))
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fragment")
            .field("contract", &self.contract.name())
            .field("implementation", &self.implementation_type())
            .field("materialized", &self.is_materialized())
            .finish()
    }
}

impl fmt::Display for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.implementation_type() {
            Some(implementation) => write!(
                f,
                "ImplementedFragment {}:{}",
                self.contract,
                crate::contract::simple_name_of(implementation)
            ),
            None => write!(f, "UnimplementedFragment {}", self.contract),
        }
    }
}
