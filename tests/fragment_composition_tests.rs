// Copyright 2025 Cowboy AI, LLC.

use std::sync::Arc;

use cim_repository::{
    ContractType, ExternalRegistry, Fragment, FragmentComposition, FragmentImplementation,
    FragmentResolver, ImplementationCandidate, ImplementationCatalog, ImplementationRef,
    MethodSignature, RepositoryError, RepositoryFactory, RepositoryMetadata, RepositoryResult,
    SearchScope,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{json, Value};

/// Answers every method with its own type name
#[derive(Debug)]
struct Named(String);

impl FragmentImplementation for Named {
    fn type_name(&self) -> &str {
        &self.0
    }

    fn supports(&self, _method: &MethodSignature) -> bool {
        true
    }

    fn invoke(&self, _method: &MethodSignature, _args: &[Value]) -> RepositoryResult<Value> {
        Ok(json!(self.0))
    }
}

fn named(type_name: &str) -> ImplementationRef {
    Arc::new(Named(type_name.to_string()))
}

fn m() -> MethodSignature {
    MethodSignature::new("m", ["String"])
}

fn contract(simple_name: &str) -> ContractType {
    ContractType::new(format!("com.acme.repository.{simple_name}")).with_method(m())
}

fn fragment(simple_name: &str) -> Fragment {
    Fragment::implemented(contract(simple_name), named(&format!("{simple_name}Impl"))).unwrap()
}

fn user_repository() -> RepositoryMetadata {
    RepositoryMetadata::new("com.acme.repository.UserRepository", "User", "Long")
}

#[test]
fn custom_fragment_has_priority_over_aspect_and_base() {
    let composition =
        FragmentComposition::of([fragment("Custom"), fragment("Aspect"), fragment("Base")]);

    let found = composition.find_method(&m()).unwrap().unwrap();
    assert_eq!(found.implementation_type(), Some("CustomImpl"));

    let result = found.invoke("UserRepository", &m(), &[]).unwrap();
    assert_eq!(result, json!("CustomImpl"));
}

#[test]
fn placeholder_keeps_its_rank_after_binding() {
    let declared = FragmentComposition::of([
        fragment("First"),
        Fragment::unimplemented(contract("Second")),
        fragment("Third"),
    ]);

    let bound = declared.append(fragment("Second"));

    let order: Vec<_> = bound
        .iter()
        .map(|f| f.implementation_type().unwrap_or("-").to_string())
        .collect();
    assert_eq!(order, ["FirstImpl", "SecondImpl", "ThirdImpl"]);

    let without_first = FragmentComposition::of(bound.iter().skip(1).cloned());
    let found = without_first.find_method(&m()).unwrap().unwrap();
    assert_eq!(found.implementation_type(), Some("SecondImpl"));
}

#[test]
fn unimplemented_composition_fails_only_at_dispatch() {
    let composition = FragmentComposition::of([
        Fragment::unimplemented(contract("Custom")),
        Fragment::unimplemented(contract("Base")),
    ])
    .for_repository("com.acme.repository.UserRepository");

    assert_eq!(composition.len(), 2);
    let table = composition.dispatch_table();
    assert_eq!(table.len(), 1);

    let err = composition.find_method(&m()).unwrap_err();
    assert!(err.is_repository_creation_error());
    assert_eq!(err.fragment().unwrap().contract().simple_name(), "Custom");
}

#[test]
fn search_scenario_reports_fragment_and_repository() {
    let search = ContractType::new("com.acme.repository.Search")
        .with_type_parameters(["T"])
        .with_method(MethodSignature::new("search", ["String"]));
    let resolver = FragmentResolver::default();

    let resolved = resolver.resolve(
        &search,
        &SearchScope::new(["com.acme.repository"]),
        &user_repository(),
    );
    assert!(!resolved.is_implemented());

    let repository = RepositoryFactory::default()
        .get_repository(user_repository().with_fragment(search), fragment("Base"))
        .unwrap();

    match repository.invoke(&MethodSignature::new("search", ["String"]), &[json!("x")]) {
        Err(RepositoryError::FragmentNotImplemented {
            repository_interface,
            fragment,
            ..
        }) => {
            assert_eq!(repository_interface, "com.acme.repository.UserRepository");
            assert_eq!(fragment.contract().to_string(), "Search<T>");
        }
        other => panic!("Expected FragmentNotImplemented, got {other:?}"),
    }

    // the base implementation still answers its own methods
    assert_eq!(repository.invoke(&m(), &[]).unwrap(), json!("BaseImpl"));
}

fn customized_catalog() -> ImplementationCatalog {
    ImplementationCatalog::new()
        .with(ImplementationCandidate::new(
            "com.acme.repository.CustomizedUserRepositoryImpl",
            || Ok(named("com.acme.repository.CustomizedUserRepositoryImpl")),
        ))
        .unwrap()
        .with(
            ImplementationCandidate::new(
                "com.acme.repository.special.CustomizedUserRepositoryImpl",
                || Ok(named("com.acme.repository.special.CustomizedUserRepositoryImpl")),
            )
            .with_identity("specialCustomImpl"),
        )
        .unwrap()
}

#[test]
fn ambiguity_resolved_by_default_identity() {
    let resolver = FragmentResolver::new(customized_catalog(), ExternalRegistry::new());
    let customized = contract("CustomizedUserRepository");

    let fragment =
        resolver.resolve(&customized, &SearchScope::new(["com.acme"]), &user_repository());

    assert_eq!(
        fragment.implementation_type(),
        Some("com.acme.repository.CustomizedUserRepositoryImpl")
    );
}

#[test]
fn ambiguity_resolved_by_repository_identity_override() {
    let resolver = FragmentResolver::new(customized_catalog(), ExternalRegistry::new());
    let customized = contract("CustomizedUserRepository");
    let repository = user_repository().with_identity("specialCustom");

    let fragment = resolver.resolve(&customized, &SearchScope::new(["com.acme"]), &repository);

    assert_eq!(
        fragment.implementation_type(),
        Some("com.acme.repository.special.CustomizedUserRepositoryImpl")
    );
}

#[test]
fn external_registration_file_binds_fragment() {
    let registry = ExternalRegistry::parse(
        "# vendor search module\n\
         com.acme.repository.Search=org.vendor.search.IndexedSearch\n",
    )
    .unwrap();
    let catalog = ImplementationCatalog::new()
        .with(ImplementationCandidate::new("org.vendor.search.IndexedSearch", || {
            Ok(named("org.vendor.search.IndexedSearch"))
        }))
        .unwrap();
    let resolver = FragmentResolver::new(catalog, registry);

    let resolved = resolver.resolve(
        &contract("Search"),
        &SearchScope::new(["com.acme"]),
        &user_repository(),
    );

    assert_eq!(resolved.implementation_type(), Some("org.vendor.search.IndexedSearch"));
    assert_eq!(
        resolved.invoke("UserRepository", &m(), &[]).unwrap(),
        json!("org.vendor.search.IndexedSearch")
    );
}

proptest! {
    #[test]
    fn first_implemented_declaring_fragment_answers(
        implemented in prop::collection::vec(any::<bool>(), 1..8)
    ) {
        let fragments: Vec<Fragment> = implemented
            .iter()
            .enumerate()
            .map(|(i, bound)| {
                if *bound {
                    fragment(&format!("F{i}"))
                } else {
                    Fragment::unimplemented(contract(&format!("F{i}")))
                }
            })
            .collect();
        let composition = FragmentComposition::of(fragments);

        let result = composition.find_method(&m());
        if implemented[0] {
            let found = result.unwrap().unwrap();
            prop_assert_eq!(found.implementation_type(), Some("F0Impl"));
        } else {
            let err = result.unwrap_err();
            prop_assert_eq!(err.fragment().unwrap().contract().simple_name(), "F0");
        }
    }
}
