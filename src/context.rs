// Copyright 2025 Cowboy AI, LLC.

//! Repository method invocation context
//!
//! Fragment implementations can ask for metadata about the repository call
//! they are serving. The context exists only while a call is dispatched
//! through a repository that exposes metadata:
//!
//! ```mermaid
//! stateDiagram-v2
//!     [*] --> Absent
//!     Absent --> Active: dispatch (expose_metadata)
//!     Active --> Absent: call returns or fails
//! ```
//!
//! Storage is call-scoped: a thread-local slot managed by [`ContextGuard`] for
//! synchronous dispatch, and a task-local slot managed by [`scope`] for async
//! callers. Concurrent calls never observe each other's context.
//!
//! A call through a repository without metadata exposure masks any enclosing
//! context ([`ContextGuard::suppress`], [`scope_absent`]), so nested calls
//! never see the caller's metadata.

use crate::contract::MethodSignature;
use crate::errors::{RepositoryError, RepositoryResult};
use crate::metadata::RepositoryMetadata;
use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

/// Thread-local state; `Unset` defers to the task-local scope
#[derive(Debug, Clone)]
enum Slot {
    Unset,
    Absent,
    Active(RepositoryMethodContext),
}

thread_local! {
    static CURRENT: RefCell<Slot> = const { RefCell::new(Slot::Unset) };
}

tokio::task_local! {
    static TASK_CONTEXT: Option<RepositoryMethodContext>;
}

/// Metadata about the repository call in progress
#[derive(Debug, Clone)]
pub struct RepositoryMethodContext {
    repository: Arc<RepositoryMetadata>,
    method: MethodSignature,
    invocation_id: Uuid,
    started_at: DateTime<Utc>,
}

impl RepositoryMethodContext {
    /// Create the context for one call of `method` on `repository`
    pub fn new(repository: Arc<RepositoryMetadata>, method: MethodSignature) -> Self {
        Self {
            repository,
            method,
            invocation_id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }

    /// Metadata of the repository being invoked
    pub fn repository(&self) -> &RepositoryMetadata {
        &self.repository
    }

    /// Fully-qualified name of the repository interface
    pub fn repository_interface(&self) -> &str {
        self.repository.repository_interface()
    }

    /// Domain type managed by the repository
    pub fn domain_type(&self) -> &str {
        self.repository.domain_type()
    }

    /// The method being invoked
    pub fn method(&self) -> &MethodSignature {
        &self.method
    }

    /// Unique id of this invocation
    pub fn invocation_id(&self) -> Uuid {
        self.invocation_id
    }

    /// When the invocation started
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

/// The context of the call in progress
///
/// # Errors
///
/// Returns `IllegalState` when no call is being dispatched through a
/// repository with metadata exposure enabled, at any call depth.
pub fn current() -> RepositoryResult<RepositoryMethodContext> {
    let slot = CURRENT.with(|slot| slot.borrow().clone());
    match slot {
        Slot::Active(context) => Ok(context),
        Slot::Absent => Err(absent()),
        Slot::Unset => TASK_CONTEXT
            .try_with(Clone::clone)
            .ok()
            .flatten()
            .ok_or_else(absent),
    }
}

/// Whether a context is active for the current call
pub fn is_active() -> bool {
    current().is_ok()
}

fn absent() -> RepositoryError {
    RepositoryError::IllegalState(
        "No repository method context available; enable expose_metadata on the repository"
            .to_string(),
    )
}

/// Makes a context current on this thread until dropped
///
/// The previous context, if any, is restored on drop, so nested calls unwind
/// correctly on every exit path including panics. The guard is `!Send`.
#[must_use = "the context is cleared when the guard is dropped"]
pub struct ContextGuard {
    previous: Slot,
    _not_send: PhantomData<*const ()>,
}

impl ContextGuard {
    /// Make `context` current
    pub fn enter(context: RepositoryMethodContext) -> Self {
        Self::install(Slot::Active(context))
    }

    /// Hide any enclosing context, thread or task scoped, until dropped
    pub fn suppress() -> Self {
        Self::install(Slot::Absent)
    }

    /// Let the task-local scope decide until dropped
    pub(crate) fn defer_to_task() -> Self {
        Self::install(Slot::Unset)
    }

    fn install(slot: Slot) -> Self {
        let previous = CURRENT.with(|cell| cell.replace(slot));
        Self {
            previous,
            _not_send: PhantomData,
        }
    }
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let previous = std::mem::replace(&mut self.previous, Slot::Unset);
        CURRENT.with(|slot| *slot.borrow_mut() = previous);
    }
}

/// Run `future` with `context` current for the task
pub async fn scope<F>(context: RepositoryMethodContext, future: F) -> F::Output
where
    F: Future,
{
    scope_slot(Some(context), future).await
}

/// Run `future` with no context for the task, hiding any enclosing scope
pub async fn scope_absent<F>(future: F) -> F::Output
where
    F: Future,
{
    scope_slot(None, future).await
}

pub(crate) async fn scope_slot<F>(
    context: Option<RepositoryMethodContext>,
    future: F,
) -> F::Output
where
    F: Future,
{
    TASK_CONTEXT.scope(context, future).await
}
