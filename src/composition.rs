// Copyright 2025 Cowboy AI, LLC.

//! Ordered fragment composition
//!
//! A [`FragmentComposition`] is the full behavior surface of one repository:
//! an ordered list of fragment slots where earlier slots take dispatch
//! priority over later ones. Custom fragments come first, store aspects next,
//! and the base implementation last.
//!
//! ```mermaid
//! graph LR
//!     C[custom fragments] --> A[store aspects] --> B[base implementation]
//! ```
//!
//! Compositions are immutable. `append` returns a new composition; binding an
//! implementation to a placeholder keeps the placeholder's slot.

use crate::contract::{ContractType, MethodSignature};
use crate::errors::{RepositoryError, RepositoryResult};
use crate::fragment::Fragment;
use indexmap::IndexMap;
use tracing::{debug, warn};

const UNBOUND_REPOSITORY: &str = "<unbound repository>";

/// Ordered, immutable set of fragments forming one repository
#[derive(Debug, Clone, Default)]
pub struct FragmentComposition {
    repository_interface: Option<String>,
    slots: Vec<Fragment>,
}

impl FragmentComposition {
    /// An empty composition
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a composition from fragments in priority order
    pub fn of(fragments: impl IntoIterator<Item = Fragment>) -> Self {
        Self::empty().append_all(fragments)
    }

    /// Attach the repository interface this composition serves
    pub fn for_repository(mut self, repository_interface: impl Into<String>) -> Self {
        self.repository_interface = Some(repository_interface.into());
        self
    }

    /// Repository interface this composition serves, if attached
    pub fn repository_interface(&self) -> Option<&str> {
        self.repository_interface.as_deref()
    }

    /// Return a composition with `fragment` added
    ///
    /// A fragment whose contract is not present yet goes to the end (lowest
    /// priority). An implemented fragment for a contract that is present as a
    /// placeholder fills that placeholder's slot. Anything else leaves the
    /// composition unchanged.
    pub fn append(&self, fragment: Fragment) -> Self {
        let mut slots = self.slots.clone();
        let existing = slots
            .iter()
            .position(|slot| slot.contract().name() == fragment.contract().name());

        match existing {
            None => slots.push(fragment),
            Some(slot) if !slots[slot].is_implemented() && fragment.is_implemented() => {
                debug!(
                    contract = %fragment.contract().name(),
                    slot,
                    "binding implementation to placeholder fragment"
                );
                slots[slot] = fragment;
            }
            Some(slot) if slots[slot].is_implemented() && fragment.is_implemented() => {
                warn!(
                    contract = %fragment.contract().name(),
                    kept = ?slots[slot].implementation_type(),
                    ignored = ?fragment.implementation_type(),
                    "contract already implemented; ignoring duplicate fragment"
                );
            }
            Some(_) => {}
        }

        Self {
            repository_interface: self.repository_interface.clone(),
            slots,
        }
    }

    /// Append several fragments in order
    pub fn append_all(&self, fragments: impl IntoIterator<Item = Fragment>) -> Self {
        fragments
            .into_iter()
            .fold(self.clone(), |composition, fragment| composition.append(fragment))
    }

    /// Find the fragment answering `method`
    ///
    /// Returns `Ok(None)` when no fragment declares the method. The first
    /// declaring slot wins even when it has no implementation. Such a
    /// placeholder is reported as `FragmentNotImplemented` here rather than
    /// handed back, so every caller fails at lookup the same way dispatch
    /// would, and later fragments are never consulted in its place.
    pub fn find_method(&self, method: &MethodSignature) -> RepositoryResult<Option<&Fragment>> {
        match self.declaring_fragment(method) {
            Some((_, fragment)) if fragment.is_implemented() => Ok(Some(fragment)),
            Some((_, fragment)) => Err(RepositoryError::fragment_not_implemented(
                self.repository_name(),
                fragment.clone(),
            )),
            None => Ok(None),
        }
    }

    /// The fragment registered for `contract`
    pub fn fragment_for(&self, contract: &ContractType) -> Option<&Fragment> {
        self.slots
            .iter()
            .find(|slot| slot.contract().name() == contract.name())
    }

    /// Whether a fragment for `contract` is present
    pub fn contains(&self, contract: &ContractType) -> bool {
        self.fragment_for(contract).is_some()
    }

    /// Fragments in priority order
    pub fn iter(&self) -> impl Iterator<Item = &Fragment> {
        self.slots.iter()
    }

    /// Number of fragment slots
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Fail if any fragment lacks an implementation
    pub fn validate_implementation(&self) -> RepositoryResult<()> {
        match self.slots.iter().find(|slot| !slot.is_implemented()) {
            Some(fragment) => Err(RepositoryError::fragment_not_implemented(
                self.repository_name(),
                fragment.clone(),
            )),
            None => Ok(()),
        }
    }

    /// Precompute the method-to-fragment mapping
    pub fn dispatch_table(&self) -> DispatchTable {
        let mut entries = IndexMap::new();
        for (slot, fragment) in self.slots.iter().enumerate() {
            for method in fragment.contract().methods() {
                entries.entry(method.clone()).or_insert_with(|| {
                    if fragment.is_implemented() {
                        DispatchTarget::Resolved {
                            slot,
                            fragment: fragment.clone(),
                        }
                    } else {
                        DispatchTarget::Unimplemented {
                            slot,
                            fragment: fragment.clone(),
                        }
                    }
                });
            }
        }
        DispatchTable {
            repository_interface: self.repository_name().to_string(),
            entries,
        }
    }

    fn declaring_fragment(&self, method: &MethodSignature) -> Option<(usize, &Fragment)> {
        self.slots
            .iter()
            .enumerate()
            .find(|(_, fragment)| fragment.has_method(method))
    }

    fn repository_name(&self) -> &str {
        self.repository_interface
            .as_deref()
            .unwrap_or(UNBOUND_REPOSITORY)
    }
}

/// Where a method call is routed
#[derive(Debug, Clone)]
pub enum DispatchTarget {
    /// The slot holds an implemented fragment
    Resolved {
        /// Slot index in the composition
        slot: usize,
        /// The answering fragment
        fragment: Fragment,
    },
    /// The slot holds a placeholder
    Unimplemented {
        /// Slot index in the composition
        slot: usize,
        /// The placeholder fragment
        fragment: Fragment,
    },
}

impl DispatchTarget {
    /// Slot index of the target
    pub fn slot(&self) -> usize {
        match self {
            DispatchTarget::Resolved { slot, .. } | DispatchTarget::Unimplemented { slot, .. } => {
                *slot
            }
        }
    }

    /// The target fragment
    pub fn fragment(&self) -> &Fragment {
        match self {
            DispatchTarget::Resolved { fragment, .. }
            | DispatchTarget::Unimplemented { fragment, .. } => fragment,
        }
    }
}

/// Method signature to fragment mapping computed from a composition
#[derive(Debug, Clone)]
pub struct DispatchTable {
    repository_interface: String,
    entries: IndexMap<MethodSignature, DispatchTarget>,
}

impl DispatchTable {
    /// Target for `method`, if the repository surface contains it
    pub fn lookup(&self, method: &MethodSignature) -> Option<&DispatchTarget> {
        self.entries.get(method)
    }

    /// Resolve `method` to an implemented fragment
    ///
    /// Same outcomes as [`FragmentComposition::find_method`].
    pub fn resolve(&self, method: &MethodSignature) -> RepositoryResult<Option<&Fragment>> {
        match self.entries.get(method) {
            Some(DispatchTarget::Resolved { fragment, .. }) => Ok(Some(fragment)),
            Some(DispatchTarget::Unimplemented { fragment, .. }) => {
                Err(RepositoryError::fragment_not_implemented(
                    &self.repository_interface,
                    fragment.clone(),
                ))
            }
            None => Ok(None),
        }
    }

    /// All methods of the repository surface
    pub fn methods(&self) -> impl Iterator<Item = &MethodSignature> {
        self.entries.keys()
    }

    /// Number of distinct methods
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
