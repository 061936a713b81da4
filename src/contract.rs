// Copyright 2025 Cowboy AI, LLC.

//! Capability contracts and method signatures
//!
//! A [`ContractType`] describes the set of methods a fragment must provide.
//! Contracts are identified by their fully-qualified, dotted name
//! (`com.acme.repository.CustomizedUserRepository`), which also carries the
//! namespace the resolver scans against.

use crate::errors::{RepositoryError, RepositoryResult};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a repository method: its name and parameter types
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodSignature {
    name: String,
    parameter_types: Vec<String>,
}

impl MethodSignature {
    /// Create a signature from a method name and its parameter types
    pub fn new<I, S>(name: impl Into<String>, parameter_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            parameter_types: parameter_types.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse a signature written as `name(Type1, Type2)`
    ///
    /// Generic arguments may contain commas (`Map<K, V>`); only top-level
    /// commas separate parameters.
    pub fn parse(input: &str) -> RepositoryResult<Self> {
        let input = input.trim();
        let open = input.find('(').ok_or_else(|| {
            RepositoryError::InvalidArgument(format!("Method signature '{input}' lacks '('"))
        })?;
        if !input.ends_with(')') {
            return Err(RepositoryError::InvalidArgument(format!(
                "Method signature '{input}' must end with ')'"
            )));
        }

        let name = input[..open].trim();
        if !is_identifier(name) {
            return Err(RepositoryError::InvalidArgument(format!(
                "Invalid method name '{name}'"
            )));
        }

        let params = &input[open + 1..input.len() - 1];
        let mut parameter_types = Vec::new();
        let mut depth = 0usize;
        let mut start = 0;
        for (i, c) in params.char_indices() {
            match c {
                '<' => depth += 1,
                '>' => {
                    depth = depth.checked_sub(1).ok_or_else(|| {
                        RepositoryError::InvalidArgument(format!(
                            "Unbalanced '>' in '{input}'"
                        ))
                    })?
                }
                ',' if depth == 0 => {
                    parameter_types.push(params[start..i].trim().to_string());
                    start = i + 1;
                }
                _ => {}
            }
        }
        if depth != 0 {
            return Err(RepositoryError::InvalidArgument(format!(
                "Unbalanced '<' in '{input}'"
            )));
        }
        let last = params[start..].trim();
        if !last.is_empty() || !parameter_types.is_empty() {
            parameter_types.push(last.to_string());
        }
        if parameter_types.iter().any(String::is_empty) {
            return Err(RepositoryError::InvalidArgument(format!(
                "Empty parameter type in '{input}'"
            )));
        }

        Ok(Self {
            name: name.to_string(),
            parameter_types,
        })
    }

    /// The method name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared parameter types, in order
    pub fn parameter_types(&self) -> &[String] {
        &self.parameter_types
    }

    /// Number of parameters
    pub fn arity(&self) -> usize {
        self.parameter_types.len()
    }
}

impl fmt::Display for MethodSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.parameter_types.join(", "))
    }
}

/// Capability descriptor: an interface-level set of methods
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractType {
    name: String,
    type_parameters: Vec<String>,
    methods: IndexSet<MethodSignature>,
}

impl ContractType {
    /// Create a contract with no methods from its fully-qualified name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_parameters: Vec::new(),
            methods: IndexSet::new(),
        }
    }

    /// Declare generic type parameters (`Search<T>`)
    pub fn with_type_parameters<I, S>(mut self, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.type_parameters = parameters.into_iter().map(Into::into).collect();
        self
    }

    /// Declare a method
    pub fn with_method(mut self, method: MethodSignature) -> Self {
        self.methods.insert(method);
        self
    }

    /// Declare several methods
    pub fn with_methods(mut self, methods: impl IntoIterator<Item = MethodSignature>) -> Self {
        self.methods.extend(methods);
        self
    }

    /// Fully-qualified name, without type parameters
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name without the namespace
    pub fn simple_name(&self) -> &str {
        simple_name_of(&self.name)
    }

    /// The namespace (package) portion of the name, empty at the root
    pub fn package(&self) -> &str {
        package_of(&self.name)
    }

    /// Generic type parameters
    pub fn type_parameters(&self) -> &[String] {
        &self.type_parameters
    }

    /// Whether this contract declares `method`
    pub fn declares(&self, method: &MethodSignature) -> bool {
        self.methods.contains(method)
    }

    /// Declared methods in declaration order
    pub fn methods(&self) -> impl Iterator<Item = &MethodSignature> {
        self.methods.iter()
    }
}

impl fmt::Display for ContractType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.simple_name())?;
        if !self.type_parameters.is_empty() {
            write!(f, "<{}>", self.type_parameters.join(", "))?;
        }
        Ok(())
    }
}

/// Last segment of a dotted type name
pub fn simple_name_of(type_name: &str) -> &str {
    type_name.rsplit('.').next().unwrap_or(type_name)
}

/// Everything before the last segment of a dotted type name
pub fn package_of(type_name: &str) -> &str {
    type_name.rsplit_once('.').map(|(pkg, _)| pkg).unwrap_or("")
}

/// Lower-case the first character of a simple type name
///
/// Names starting with two upper-case characters (`URLRepository`) are kept
/// as they are, matching how bean identities are derived from type names.
pub fn lower_camel(simple_name: &str) -> String {
    let mut chars = simple_name.chars();
    match (chars.next(), chars.next()) {
        (Some(first), Some(second)) if first.is_uppercase() && second.is_uppercase() => {
            simple_name.to_string()
        }
        (Some(first), _) => first.to_lowercase().chain(simple_name.chars().skip(1)).collect(),
        (None, _) => String::new(),
    }
}

/// Whether `segment` is a valid identifier (letters, digits, `_`, `$`)
pub(crate) fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Whether `name` is a dotted sequence of identifiers
pub(crate) fn is_qualified_name(name: &str) -> bool {
    !name.is_empty() && name.split('.').all(is_identifier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("CustomizedUserRepository", "customizedUserRepository" ; "regular name")]
    #[test_case("URLRepository", "URLRepository" ; "acronym prefix")]
    #[test_case("A", "a" ; "single character")]
    #[test_case("", "" ; "empty")]
    fn test_lower_camel(input: &str, expected: &str) {
        assert_eq!(lower_camel(input), expected);
    }

    #[test]
    fn test_contract_names() {
        let contract = ContractType::new("com.acme.repository.Search").with_type_parameters(["T"]);

        assert_eq!(contract.simple_name(), "Search");
        assert_eq!(contract.package(), "com.acme.repository");
        assert_eq!(contract.to_string(), "Search<T>");

        let root = ContractType::new("Search");
        assert_eq!(root.simple_name(), "Search");
        assert_eq!(root.package(), "");
    }

    #[test]
    fn test_declares() {
        let search = MethodSignature::new("search", ["String"]);
        let contract = ContractType::new("com.acme.Search").with_method(search.clone());

        assert!(contract.declares(&search));
        assert!(!contract.declares(&MethodSignature::new("search", ["Integer"])));
    }

    #[test_case("findAll()", "findAll", &[] ; "no parameters")]
    #[test_case("save(User)", "save", &["User"] ; "one parameter")]
    #[test_case(" findBy( String , int ) ", "findBy", &["String", "int"] ; "whitespace")]
    #[test_case("merge(Map<K, V>, List<T>)", "merge", &["Map<K, V>", "List<T>"] ; "generic commas")]
    fn test_parse_signature(input: &str, name: &str, params: &[&str]) {
        let sig = MethodSignature::parse(input).unwrap();
        assert_eq!(sig.name(), name);
        assert_eq!(sig.parameter_types(), params);
    }

    #[test_case("findAll" ; "missing parens")]
    #[test_case("findAll(" ; "unterminated")]
    #[test_case("(String)" ; "missing name")]
    #[test_case("find(String,)" ; "empty parameter")]
    #[test_case("find(Map<K, V)" ; "unbalanced generics")]
    fn test_parse_signature_rejects(input: &str) {
        assert!(matches!(
            MethodSignature::parse(input),
            Err(RepositoryError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_signature_display_parses_back() {
        let sig = MethodSignature::new("findByEmail", ["String", "Pageable"]);
        assert_eq!(sig.to_string(), "findByEmail(String, Pageable)");
        assert_eq!(MethodSignature::parse(&sig.to_string()).unwrap(), sig);
    }

    #[test]
    fn test_qualified_names() {
        assert!(is_qualified_name("com.acme.repository.Search"));
        assert!(is_qualified_name("Search"));
        assert!(!is_qualified_name("com..Search"));
        assert!(!is_qualified_name("com.acme.1Search"));
        assert!(!is_qualified_name(""));
    }
}
