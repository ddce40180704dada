//! Scopes
//!
//! A scope is a disposal boundary. While its callback runs, every effect
//! and memo created inside is adopted by the scope, and every subscription
//! those computations make (now or on later runs) is recorded. Disposing
//! the scope removes exactly those subscriptions from the signals' and
//! memos' subscriber sets, drains the computations' cleanups and stops
//! them from running again.
//!
//! Scopes do not nest: an inner scope shadows the outer one while its
//! callback runs, and computations created there belong to the inner scope
//! only.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::{IndexMap, IndexSet};

use super::context::{Frame, ReactiveContext};
use super::effect::EffectNode;
use super::memo::MemoNode;
use super::subscriber::{EffectSet, InvalidatorSet, SourceId, SubscriberId, Subscribers};

/// Unique identifier for a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u64);

impl ScopeId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ScopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "scope{}", self.0)
    }
}

/// A computation adopted by a scope.
pub(crate) enum Computation {
    Effect(Weak<EffectNode>),
    Memo(Weak<MemoNode>),
}

impl Computation {
    fn dispose(&self) {
        match self {
            Self::Effect(effect) => {
                if let Some(effect) = effect.upgrade() {
                    effect.dispose();
                }
            }
            Self::Memo(memo) => {
                if let Some(memo) = memo.upgrade() {
                    memo.dispose();
                }
            }
        }
    }
}

/// Subscriber IDs a scope inserted into one subscriber set.
struct Scoped<S> {
    set: Weak<S>,
    ids: IndexSet<SubscriberId>,
}

impl<S> Scoped<S> {
    fn new(set: &Rc<S>) -> Self {
        Self {
            set: Rc::downgrade(set),
            ids: IndexSet::new(),
        }
    }
}

#[derive(Default)]
struct ScopeRecords {
    scoped_effects: IndexMap<SourceId, Scoped<EffectSet>>,
    scoped_memo_invalidators: IndexMap<SourceId, Scoped<InvalidatorSet>>,
    computations: Vec<Computation>,
}

/// The collector installed in the context while a scope is active.
pub(crate) type ScopeCollector = Rc<ScopeState>;

pub(crate) struct ScopeState {
    id: ScopeId,

    /// `None` once the scope has been disposed.
    records: RefCell<Option<ScopeRecords>>,
}

impl ScopeState {
    fn new() -> Self {
        Self {
            id: ScopeId::new(),
            records: RefCell::new(Some(ScopeRecords::default())),
        }
    }

    /// Take ownership of a computation created while this scope is active.
    pub(crate) fn adopt(&self, computation: Computation) {
        if let Some(records) = self.records.borrow_mut().as_mut() {
            records.computations.push(computation);
        }
    }

    /// Record the subscriptions a tracked read of `source` just made.
    pub(crate) fn collect(
        &self,
        source: &Subscribers,
        effect: Option<SubscriberId>,
        memo: Option<SubscriberId>,
    ) {
        let mut records = self.records.borrow_mut();
        let Some(records) = records.as_mut() else {
            return;
        };

        if let Some(effect) = effect {
            records
                .scoped_effects
                .entry(source.id())
                .or_insert_with(|| Scoped::new(source.effect_set()))
                .ids
                .insert(effect);
        }
        if let Some(memo) = memo {
            records
                .scoped_memo_invalidators
                .entry(source.id())
                .or_insert_with(|| Scoped::new(source.invalidator_set()))
                .ids
                .insert(memo);
        }
    }

    /// Sever every recorded subscription. Returns `false` if the scope was
    /// already disposed.
    fn dispose(&self) -> bool {
        let Some(records) = self.records.borrow_mut().take() else {
            return false;
        };

        tracing::trace!(
            scope = %self.id,
            sources = records.scoped_effects.len() + records.scoped_memo_invalidators.len(),
            computations = records.computations.len(),
            "disposing scope"
        );

        // Removed effects are dropped only after every borrow is released.
        let mut released = Vec::new();
        for scoped in records.scoped_effects.into_values() {
            if let Some(set) = scoped.set.upgrade() {
                let mut set = set.borrow_mut();
                released.extend(scoped.ids.iter().filter_map(|id| set.shift_remove(id)));
            }
        }
        for scoped in records.scoped_memo_invalidators.into_values() {
            if let Some(set) = scoped.set.upgrade() {
                let mut set = set.borrow_mut();
                for id in &scoped.ids {
                    set.shift_remove(id);
                }
            }
        }

        for computation in &records.computations {
            computation.dispose();
        }

        drop(released);
        true
    }
}

/// Handle returned by [`create_scope`].
///
/// Cloning the handle does not create a new scope.
#[derive(Clone)]
pub struct Scope {
    state: ScopeCollector,
}

impl Scope {
    /// Get the scope's unique ID.
    pub fn id(&self) -> ScopeId {
        self.state.id
    }

    /// Dispose every computation created inside the scope.
    ///
    /// Calling it again is a no-op.
    pub fn dispose(&self) {
        self.state.dispose();
    }

    /// Dispose the scope, then run `on_disposed`.
    ///
    /// `on_disposed` only runs on the call that actually disposes.
    pub fn dispose_with<F>(&self, on_disposed: F)
    where
        F: FnOnce(),
    {
        if self.state.dispose() {
            on_disposed();
        }
    }

    /// Check if the scope has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.state.records.borrow().is_none()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.state.id)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Run `f` with a new scope collecting the computations it creates.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use ripple_core::{create_effect, create_scope, create_signal};
///
/// let (count, set_count) = create_signal(0);
/// let runs = Rc::new(Cell::new(0));
///
/// let runs_clone = runs.clone();
/// let scope = create_scope(move || {
///     create_effect(move || {
///         count.get();
///         runs_clone.set(runs_clone.get() + 1);
///     });
/// });
///
/// scope.dispose();
/// set_count.set(1);
/// assert_eq!(runs.get(), 1);
/// ```
pub fn create_scope<F>(f: F) -> Scope
where
    F: FnOnce(),
{
    let state = Rc::new(ScopeState::new());

    {
        let _ctx = ReactiveContext::enter(Frame::new().scope(Some(Rc::clone(&state))));
        f();
    }

    Scope { state }
}
