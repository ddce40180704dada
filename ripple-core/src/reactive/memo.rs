//! Memo Implementation
//!
//! A Memo is a cached derived value that re-evaluates only when it is read
//! after one of its dependencies changed.
//!
//! # How Memos Work
//!
//! 1. On creation, the memo runs its computation once and caches the result.
//!    Every signal read during that run subscribes the memo's invalidator.
//!
//! 2. When a dependency changes, the invalidator marks the memo dirty. No
//!    computation happens yet.
//!
//! 3. On the next read, a dirty memo drains its cleanups, recomputes, and
//!    stores the new value. If the value changed, the effects that read the
//!    memo are run (or queued, inside a batch).
//!
//! # Why This Matters
//!
//! This "lazy" approach avoids unnecessary recomputation:
//!
//! - A signal changes
//! - 10 memos depend on it
//! - Only the memos actually accessed will recompute
//! - Memos that are never read stay dirty (no wasted work)
//!
//! The price is that a memo serves its previous value until somebody reads
//! it again.
//!
//! # Memos as sources
//!
//! A memo behaves like a signal to whatever reads it: effects reading it
//! subscribe to it, and memos reading it are marked dirty when it is.

use std::cell::{Cell, RefCell};
use std::fmt::Debug;
use std::rc::Rc;

use scopeguard::ScopeGuard;

use super::cleanup;
use super::context::{Frame, ReactiveContext};
use super::effect::run_effects;
use super::scope::{Computation, ScopeCollector};
use super::subscriber::{SourceId, SubscriberId, Subscribers};
use crate::error::{ReactiveError, Result};

/// The untyped half of a memo: identity, dirty flag and dependents.
///
/// This is what signals hold (weakly) as the memo's invalidator.
pub(crate) struct MemoNode {
    /// The subscriber ID used for dependency tracking.
    id: SubscriberId,

    /// Whether the cached value is stale.
    dirty: Cell<bool>,

    /// Effects and memos that read this memo.
    dependents: Subscribers,

    /// Set while this memo runs its dependents, so they cannot retrigger it.
    notifying: Cell<bool>,

    /// The scope that was active when the memo was created.
    owner: Option<ScopeCollector>,

    /// Whether the memo's scope has been disposed.
    disposed: Cell<bool>,
}

impl MemoNode {
    pub(crate) fn id(&self) -> SubscriberId {
        self.id
    }

    /// Mark the memo dirty and propagate to memos that read it.
    ///
    /// Propagation stops at memos that are already dirty.
    pub(crate) fn invalidate(&self) {
        if self.dirty.replace(true) {
            return;
        }

        tracing::trace!(memo = %self.id, "memo invalidated");
        self.dependents.invalidate_memos();
    }

    /// Stop tracking new dependencies and drain pending cleanups.
    pub(crate) fn dispose(&self) {
        if !self.disposed.replace(true) {
            cleanup::drain(self.id);
        }
    }

    /// Run `compute` as this memo.
    ///
    /// A disposed memo computes untracked, so it cannot subscribe again.
    fn compute_with<T>(self: &Rc<Self>, compute: impl FnOnce() -> T) -> T {
        let invalidator = (!self.disposed.get()).then(|| Rc::clone(self));
        let _ctx = ReactiveContext::enter(
            Frame::new()
                .effect(None)
                .invalidator(invalidator)
                .scope(self.owner.clone())
                .cleaning(false),
        );

        tracing::trace!(memo = %self.id, "computing memo");
        compute()
    }

    /// Run the effects reading this memo, except the one reading it now.
    fn notify_dependents(&self) {
        if self.notifying.get() {
            return;
        }

        let reader = ReactiveContext::active_effect_id();
        let effects: Vec<_> = self
            .dependents
            .effects()
            .into_iter()
            .filter(|effect| Some(effect.id()) != reader)
            .collect();
        if effects.is_empty() {
            return;
        }

        self.notifying.set(true);
        let _reset = scopeguard::guard(&self.notifying, |notifying| notifying.set(false));
        run_effects(effects);
    }
}

struct MemoInner<T> {
    node: Rc<MemoNode>,

    /// The computation function.
    compute: Box<dyn Fn() -> T>,

    /// The cached value.
    value: RefCell<T>,
}

impl<T> Drop for MemoInner<T> {
    /// The last handle is gone, so nobody can read the memo again.
    fn drop(&mut self) {
        self.node.dispose();
    }
}

/// A cached derived value that recomputes lazily.
///
/// # Type Parameters
///
/// - `T`: The type of the computed value. The PartialEq bound is needed to
///   detect when the computed value actually changed.
///
/// # Example
///
/// ```rust
/// use ripple_core::{create_memo, create_signal};
///
/// let (count, set_count) = create_signal(2);
/// let doubled = create_memo(move || count.get() * 2).expect("not nested");
///
/// assert_eq!(doubled.get(), 4);
/// set_count.set(5);
/// assert_eq!(doubled.get(), 10);
/// ```
pub struct Memo<T> {
    inner: Rc<MemoInner<T>>,
}

impl<T> Memo<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Get the memo's subscriber ID.
    pub fn id(&self) -> SubscriberId {
        self.inner.node.id
    }

    /// Get the ID of the memo as a source for its readers.
    pub fn source_id(&self) -> SourceId {
        self.inner.node.dependents.id()
    }

    /// Get the current value, recomputing it if it is dirty.
    ///
    /// If called within a reactive context, this also registers the
    /// current computation as a dependent of the memo.
    pub fn get(&self) -> T {
        self.inner.node.dependents.track();
        self.get_untracked()
    }

    /// Get the current value without registering a dependency.
    ///
    /// A dirty memo is still refreshed.
    pub fn get_untracked(&self) -> T {
        if self.inner.node.dirty.get() {
            self.refresh();
        }

        self.inner.value.borrow().clone()
    }

    /// Check if the cached value is stale.
    pub fn is_dirty(&self) -> bool {
        self.inner.node.dirty.get()
    }

    /// Get the number of effects that read this memo.
    pub fn effect_subscriber_count(&self) -> usize {
        self.inner.node.dependents.effect_count()
    }

    /// Get the number of memos that read this memo.
    pub fn memo_subscriber_count(&self) -> usize {
        self.inner.node.dependents.invalidator_count()
    }

    /// Recompute the value and notify readers if it changed.
    fn refresh(&self) {
        let node = &self.inner.node;
        cleanup::drain(node.id);

        // Cleared before computing, so a write during the computation
        // leaves the memo dirty again.
        node.dirty.set(false);
        let stale = scopeguard::guard(node, |node| node.dirty.set(true));
        let value = node.compute_with(|| (self.inner.compute)());
        ScopeGuard::into_inner(stale);

        let changed = *self.inner.value.borrow() != value;
        let _previous = self.inner.value.replace(value);

        if changed {
            node.notify_dependents();
        }
    }
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Memo<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Memo")
            .field("id", &self.inner.node.id)
            .field("value", &*self.inner.value.borrow())
            .field("dirty", &self.inner.node.dirty.get())
            .finish()
    }
}

/// Create a memo, computing its value once right away.
///
/// Memos cannot be created while another memo is computing or while an
/// effect is running; wrap the creation in [`untrack`](super::untrack) if
/// that is really intended.
pub fn create_memo<T, F>(f: F) -> Result<Memo<T>>
where
    T: Clone + PartialEq + 'static,
    F: Fn() -> T + 'static,
{
    let id = SubscriberId::new();

    if let Some(parent) = ReactiveContext::active_memo_id() {
        tracing::error!(memo = %id, parent = %parent, "memos cannot be nested inside memos");
        return Err(ReactiveError::NestedMemo { memo: id, parent });
    }
    if let Some(effect) = ReactiveContext::active_effect_id() {
        tracing::error!(memo = %id, effect = %effect, "memos cannot be created inside an effect");
        return Err(ReactiveError::MemoInsideEffect { memo: id, effect });
    }

    let node = Rc::new(MemoNode {
        id,
        dirty: Cell::new(false),
        dependents: Subscribers::new(),
        notifying: Cell::new(false),
        owner: ReactiveContext::active_scope(),
        disposed: Cell::new(false),
    });

    if let Some(scope) = &node.owner {
        scope.adopt(Computation::Memo(Rc::downgrade(&node)));
    }

    let value = node.compute_with(&f);

    Ok(Memo {
        inner: Rc::new(MemoInner {
            node,
            compute: Box::new(f),
            value: RefCell::new(value),
        }),
    })
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
