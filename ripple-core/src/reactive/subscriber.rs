//! Subscriber sets for the reactive system.
//!
//! Every source of reactivity (a signal, or a memo acting as one) owns a
//! [`Subscribers`] value: one insertion-ordered set of effects to re-run and
//! one of memo invalidators to mark dirty. Reading a source registers the
//! computation that is currently active in the [`ReactiveContext`].

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use indexmap::IndexMap;

use super::context::ReactiveContext;
use super::effect::EffectNode;
use super::memo::MemoNode;

/// Unique identifier for a subscriber.
///
/// Each computation (effect or memo) gets a unique ID when created. This ID
/// is the key of every subscriber set, batch queue and cleanup registry
/// entry, so two computations built from the same closure never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Unique identifier for a reactive source (a signal or a memo).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceId(u64);

impl SourceId {
    /// Generate a new unique source ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SourceId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Effects to re-run when a source changes, in subscription order.
pub(crate) type EffectSet = RefCell<IndexMap<SubscriberId, Rc<EffectNode>>>;

/// Memos to mark dirty when a source changes.
///
/// Held weakly: a memo nobody can read any more has nothing to invalidate.
pub(crate) type InvalidatorSet = RefCell<IndexMap<SubscriberId, Weak<MemoNode>>>;

/// The two subscriber sets of a reactive source.
pub(crate) struct Subscribers {
    id: SourceId,
    effects: Rc<EffectSet>,
    invalidators: Rc<InvalidatorSet>,
}

impl Subscribers {
    pub(crate) fn new() -> Self {
        Self {
            id: SourceId::new(),
            effects: Rc::new(RefCell::new(IndexMap::new())),
            invalidators: Rc::new(RefCell::new(IndexMap::new())),
        }
    }

    pub(crate) fn id(&self) -> SourceId {
        self.id
    }

    pub(crate) fn effect_set(&self) -> &Rc<EffectSet> {
        &self.effects
    }

    pub(crate) fn invalidator_set(&self) -> &Rc<InvalidatorSet> {
        &self.invalidators
    }

    /// Register the active computation, if any, as a subscriber.
    ///
    /// Called on every tracked read. Registration is keyed by subscriber ID,
    /// so repeated reads from the same run leave a single entry. The active
    /// scope collector, if any, is told which entries this read produced.
    pub(crate) fn track(&self) {
        let effect = ReactiveContext::active_effect();
        let memo = ReactiveContext::active_invalidator();
        if effect.is_none() && memo.is_none() {
            return;
        }

        if let Some(effect) = &effect {
            let inserted = {
                let mut effects = self.effects.borrow_mut();
                if effects.contains_key(&effect.id()) {
                    false
                } else {
                    effects.insert(effect.id(), Rc::clone(effect));
                    true
                }
            };
            if inserted {
                effect.add_source(Rc::downgrade(&self.effects));
            }
        }

        if let Some(memo) = &memo {
            self.invalidators
                .borrow_mut()
                .entry(memo.id())
                .or_insert_with(|| Rc::downgrade(memo));
        }

        if let Some(scope) = ReactiveContext::active_scope() {
            scope.collect(
                self,
                effect.as_ref().map(|effect| effect.id()),
                memo.as_ref().map(|memo| memo.id()),
            );
        }
    }

    /// Mark every subscribed memo dirty.
    ///
    /// Dead entries are pruned first. The set is snapshotted so invalidation
    /// can re-enter the reactive system without holding a borrow.
    pub(crate) fn invalidate_memos(&self) {
        let memos: Vec<Rc<MemoNode>> = {
            let mut invalidators = self.invalidators.borrow_mut();
            invalidators.retain(|_, memo| memo.strong_count() > 0);
            invalidators.values().filter_map(Weak::upgrade).collect()
        };

        for memo in memos {
            memo.invalidate();
        }
    }

    /// Snapshot of the subscribed effects, in subscription order.
    pub(crate) fn effects(&self) -> Vec<Rc<EffectNode>> {
        self.effects.borrow().values().cloned().collect()
    }

    pub(crate) fn effect_count(&self) -> usize {
        self.effects.borrow().len()
    }

    pub(crate) fn invalidator_count(&self) -> usize {
        self.invalidators
            .borrow()
            .values()
            .filter(|memo| memo.strong_count() > 0)
            .count()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
