//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a signal is read,
//! we can register the current computation as a dependent.
//!
//! # Implementation
//!
//! The context is a set of thread-local slots:
//!
//! - the active effect
//! - the active memo invalidator
//! - the active scope collector
//! - the active batch collector
//! - whether a cleanup drain is in progress
//!
//! Slots are only changed through [`ReactiveContext::enter`], which saves the
//! previous values and restores them when the returned guard is dropped. This
//! keeps nesting correct when computations are invoked from inside other
//! computations, cleanups or batch flushes, and also when a callback panics.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::batch::PendingEffects;
use super::config::RuntimeConfig;
use super::effect::EffectNode;
use super::memo::MemoNode;
use super::scope::ScopeCollector;
use super::SubscriberId;

thread_local! {
    static SLOTS: Slots = Slots::default();
}

/// The per-thread slot registers.
#[derive(Default)]
struct Slots {
    effect: RefCell<Option<Rc<EffectNode>>>,
    invalidator: RefCell<Option<Rc<MemoNode>>>,
    scope: RefCell<Option<ScopeCollector>>,
    batch: RefCell<Option<PendingEffects>>,
    cleaning: Cell<bool>,
    config: Cell<RuntimeConfig>,
}

impl Slots {
    /// Install every slot present in `frame`, returning the replaced values.
    fn swap(&self, frame: Frame) -> Frame {
        Frame {
            effect: frame.effect.map(|effect| self.effect.replace(effect)),
            invalidator: frame
                .invalidator
                .map(|invalidator| self.invalidator.replace(invalidator)),
            scope: frame.scope.map(|scope| self.scope.replace(scope)),
            batch: frame.batch.map(|batch| self.batch.replace(batch)),
            cleaning: frame.cleaning.map(|cleaning| self.cleaning.replace(cleaning)),
        }
    }
}

/// A set of slot changes to apply for the duration of a callback.
///
/// Slots left unset in the frame keep their current value.
#[derive(Default)]
pub(crate) struct Frame {
    effect: Option<Option<Rc<EffectNode>>>,
    invalidator: Option<Option<Rc<MemoNode>>>,
    scope: Option<Option<ScopeCollector>>,
    batch: Option<Option<PendingEffects>>,
    cleaning: Option<bool>,
}

impl Frame {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn effect(mut self, effect: Option<Rc<EffectNode>>) -> Self {
        self.effect = Some(effect);
        self
    }

    pub(crate) fn invalidator(mut self, invalidator: Option<Rc<MemoNode>>) -> Self {
        self.invalidator = Some(invalidator);
        self
    }

    pub(crate) fn scope(mut self, scope: Option<ScopeCollector>) -> Self {
        self.scope = Some(scope);
        self
    }

    pub(crate) fn batch(mut self, batch: Option<PendingEffects>) -> Self {
        self.batch = Some(batch);
        self
    }

    pub(crate) fn cleaning(mut self, cleaning: bool) -> Self {
        self.cleaning = Some(cleaning);
        self
    }
}

/// Guard that restores the previous slot values when dropped.
///
/// This ensures the context is properly maintained even if
/// the computation panics.
#[must_use = "the context is restored as soon as the guard is dropped"]
pub struct ReactiveContext {
    saved: Frame,
}

impl ReactiveContext {
    /// Enter a new reactive context described by `frame`.
    ///
    /// The context is automatically exited when the returned guard is dropped.
    pub(crate) fn enter(frame: Frame) -> Self {
        let saved = SLOTS.with(|slots| slots.swap(frame));
        Self { saved }
    }

    /// Check if a computation is currently collecting dependencies.
    pub fn is_tracking() -> bool {
        SLOTS.with(|slots| slots.effect.borrow().is_some() || slots.invalidator.borrow().is_some())
    }

    /// Get the ID of the running effect, if any.
    pub fn active_effect_id() -> Option<SubscriberId> {
        SLOTS.with(|slots| slots.effect.borrow().as_ref().map(|effect| effect.id()))
    }

    /// Get the ID of the memo currently computing, if any.
    pub fn active_memo_id() -> Option<SubscriberId> {
        SLOTS.with(|slots| slots.invalidator.borrow().as_ref().map(|memo| memo.id()))
    }

    /// Get the computation that `on_cleanup` would register against.
    pub fn current_owner() -> Option<SubscriberId> {
        Self::active_effect_id().or_else(Self::active_memo_id)
    }

    /// Check if signal writes are currently being collected by a batch.
    pub fn is_batching() -> bool {
        SLOTS.with(|slots| slots.batch.borrow().is_some())
    }

    /// Check if cleanup callbacks are currently being drained.
    pub fn is_cleaning() -> bool {
        SLOTS.with(|slots| slots.cleaning.get())
    }

    /// Check if a scope is collecting subscriptions.
    pub fn has_scope() -> bool {
        SLOTS.with(|slots| slots.scope.borrow().is_some())
    }

    /// Install the diagnostics configuration for this thread.
    pub fn configure(config: RuntimeConfig) {
        SLOTS.with(|slots| slots.config.set(config));
    }

    /// Get the diagnostics configuration for this thread.
    pub fn config() -> RuntimeConfig {
        SLOTS.with(|slots| slots.config.get())
    }

    pub(crate) fn active_effect() -> Option<Rc<EffectNode>> {
        SLOTS.with(|slots| slots.effect.borrow().clone())
    }

    pub(crate) fn active_invalidator() -> Option<Rc<MemoNode>> {
        SLOTS.with(|slots| slots.invalidator.borrow().clone())
    }

    pub(crate) fn active_scope() -> Option<ScopeCollector> {
        SLOTS.with(|slots| slots.scope.borrow().clone())
    }

    pub(crate) fn active_batch() -> Option<PendingEffects> {
        SLOTS.with(|slots| slots.batch.borrow().clone())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let saved = std::mem::take(&mut self.saved);
        // The replaced values are dropped outside of the slot borrows.
        let _current = SLOTS.with(|slots| slots.swap(saved));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_starts_empty() {
        assert!(!ReactiveContext::is_tracking());
        assert!(ReactiveContext::current_owner().is_none());
        assert!(!ReactiveContext::is_batching());
        assert!(!ReactiveContext::is_cleaning());
        assert!(!ReactiveContext::has_scope());
    }

    #[test]
    fn guard_restores_previous_value() {
        {
            let _ctx = ReactiveContext::enter(Frame::new().cleaning(true));
            assert!(ReactiveContext::is_cleaning());

            {
                let _inner = ReactiveContext::enter(Frame::new().cleaning(false));
                assert!(!ReactiveContext::is_cleaning());
            }

            // Restored to the outer value, not cleared
            assert!(ReactiveContext::is_cleaning());
        }

        assert!(!ReactiveContext::is_cleaning());
    }

    #[test]
    fn unset_slots_are_left_alone() {
        let pending = PendingEffects::default();
        let _batch = ReactiveContext::enter(Frame::new().batch(Some(pending)));

        {
            let _ctx = ReactiveContext::enter(Frame::new().cleaning(true));
            assert!(ReactiveContext::is_batching());
        }

        assert!(ReactiveContext::is_batching());
    }

    #[test]
    fn guard_restores_on_panic() {
        let result = std::panic::catch_unwind(|| {
            let _ctx = ReactiveContext::enter(Frame::new().cleaning(true));
            panic!("callback failed");
        });

        assert!(result.is_err());
        assert!(!ReactiveContext::is_cleaning());
    }

    #[test]
    fn configuration_is_per_thread() {
        ReactiveContext::configure(RuntimeConfig::quiet());
        assert_eq!(ReactiveContext::config(), RuntimeConfig::quiet());

        let other = std::thread::spawn(ReactiveContext::config)
            .join()
            .expect("thread panicked");
        assert_eq!(other, RuntimeConfig::default());
    }
}
