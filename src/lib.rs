// Copyright 2025 Cowboy AI, LLC.

//! # CIM Repository
//!
//! Repository fragment composition for the Composable Information Machine.
//!
//! A repository is assembled from ordered *fragments*, each pairing a
//! capability contract with an optional implementation:
//! - **Contracts**: method sets a fragment must provide
//! - **Fragments**: contract plus implementation, or a placeholder awaiting one
//! - **Composition**: ordered fragments; the first declaring fragment answers a method
//! - **Resolver**: binds implementations to contracts by naming convention,
//!   identity and external registrations
//! - **Invocation Context**: call-scoped metadata, exposed on opt-in
//!
//! ## Design Principles
//!
//! 1. **Positional Priority**: custom fragments, then store aspects, then the base implementation
//! 2. **Immutability**: fragments and compositions are values; binding returns new values
//! 3. **Lazy Failure**: missing implementations fail when invoked, not when composed
//! 4. **Call Scoping**: invocation metadata never leaks between concurrent calls
//!
//! ## Example
//!
//! ```
//! use cim_repository::{
//!     ContractType, Fragment, MethodSignature, RepositoryError, RepositoryFactory,
//!     RepositoryMetadata,
//! };
//!
//! let search = ContractType::new("com.acme.repository.Search")
//!     .with_type_parameters(["T"])
//!     .with_method(MethodSignature::new("search", ["String"]));
//! let metadata = RepositoryMetadata::new("com.acme.repository.UserRepository", "User", "Long")
//!     .with_fragment(search);
//! let base = Fragment::unimplemented(ContractType::new("com.acme.store.SimpleRepository"));
//!
//! let repository = RepositoryFactory::default().get_repository(metadata, base).unwrap();
//! let err = repository
//!     .invoke(&MethodSignature::new("search", ["String"]), &[])
//!     .unwrap_err();
//!
//! assert!(matches!(err, RepositoryError::FragmentNotImplemented { .. }));
//! ```

#![warn(missing_docs)]

mod composition;
mod config;
mod contract;
mod errors;
mod extension;
mod fragment;
mod metadata;
mod registration;
mod repository;
mod resolver;
pub mod context;

// Re-export core types
pub use composition::{DispatchTable, DispatchTarget, FragmentComposition};
pub use config::{BootstrapMode, RepositoryConfiguration};
pub use context::{ContextGuard, RepositoryMethodContext};
pub use contract::{lower_camel, ContractType, MethodSignature};
pub use errors::{RepositoryError, RepositoryResult};
pub use extension::{ModuleExtension, RepositoryConfigurationExtension};
pub use fragment::{Fragment, FragmentImplementation, ImplementationFactory, ImplementationRef};
pub use metadata::RepositoryMetadata;
pub use registration::ExternalRegistry;
pub use repository::{ComposedRepository, RepositoryFactory};
pub use resolver::{
    FragmentResolver, ImplementationCandidate, ImplementationCatalog, SearchScope,
    DEFAULT_IMPLEMENTATION_POSTFIX,
};
