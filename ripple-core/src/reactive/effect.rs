//! Effect Implementation
//!
//! An Effect is a side-effecting computation that runs whenever its
//! dependencies change.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies.
//!
//! 2. Every signal (or memo) read during a run subscribes the effect.
//!
//! 3. When any of those sources is written, the effect runs again, or is
//!    queued if a batch is collecting.
//!
//! 4. Cleanups registered with `on_cleanup` during a run are drained right
//!    before the next run starts.
//!
//! # Self-removal
//!
//! The value returned by the effect function decides whether the effect
//! stays subscribed, see [`EffectOutcome`]. An effect that asks to be
//! removed is dropped from every subscriber set that references it.
//!
//! # Ownership
//!
//! Signals own the effects subscribed to them. An effect created outside of
//! a scope can never be unsubscribed by anyone but itself, which is why
//! such effects are reported as leaks.

use std::cell::{Cell, RefCell};
use std::ops::ControlFlow;
use std::rc::{Rc, Weak};

use smallvec::SmallVec;

use super::cleanup;
use super::context::{Frame, ReactiveContext};
use super::scope::{Computation, ScopeCollector};
use super::subscriber::{EffectSet, SubscriberId};

/// Return values an effect function may produce.
///
/// `true`, or [`ControlFlow::Break`], asks the runtime to unsubscribe the
/// effect after the current run.
pub trait EffectOutcome {
    /// Whether the effect should be removed from its sources.
    fn unsubscribes(&self) -> bool;
}

impl EffectOutcome for () {
    fn unsubscribes(&self) -> bool {
        false
    }
}

impl EffectOutcome for bool {
    fn unsubscribes(&self) -> bool {
        *self
    }
}

impl<B, C> EffectOutcome for ControlFlow<B, C> {
    fn unsubscribes(&self) -> bool {
        self.is_break()
    }
}

/// The runtime side of an effect.
pub(crate) struct EffectNode {
    /// The subscriber ID used for dependency tracking.
    id: SubscriberId,

    /// The effect function, reduced to "should unsubscribe".
    callback: Box<dyn Fn() -> bool>,

    /// The scope that was active when the effect was created.
    owner: Option<ScopeCollector>,

    /// Subscriber sets this effect has been inserted into.
    sources: RefCell<SmallVec<[Weak<EffectSet>; 4]>>,

    /// Whether the effect has been disposed.
    disposed: Cell<bool>,

    /// Number of times the effect has run.
    run_count: Cell<usize>,
}

impl EffectNode {
    pub(crate) fn id(&self) -> SubscriberId {
        self.id
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    pub(crate) fn add_source(&self, source: Weak<EffectSet>) {
        self.sources.borrow_mut().push(source);
    }

    /// Run the effect function, unless the effect has been disposed.
    pub(crate) fn run(self: &Rc<Self>) {
        if self.is_disposed() {
            return;
        }

        if self.run_with(|| (self.callback)()) {
            self.unsubscribe();
        }
    }

    /// Run `body` as this effect.
    ///
    /// Pending cleanups are drained first. While `body` runs, this effect is
    /// the active effect, no memo is computing, and the owning scope collects
    /// any new subscriptions.
    fn run_with<R>(self: &Rc<Self>, body: impl FnOnce() -> R) -> R {
        cleanup::drain(self.id);

        let _ctx = ReactiveContext::enter(
            Frame::new()
                .effect(Some(Rc::clone(self)))
                .invalidator(None)
                .scope(self.owner.clone())
                .cleaning(false),
        );

        self.run_count.set(self.run_count.get() + 1);
        tracing::trace!(effect = %self.id, run = self.run_count.get(), "running effect");

        body()
    }

    /// Remove this effect from every source that references it.
    fn unsubscribe(&self) {
        let sources = std::mem::take(&mut *self.sources.borrow_mut());
        tracing::trace!(effect = %self.id, sources = sources.len(), "effect unsubscribed itself");

        let mut released = Vec::with_capacity(sources.len());
        for source in sources {
            if let Some(set) = source.upgrade() {
                let removed = set.borrow_mut().shift_remove(&self.id);
                released.extend(removed);
            }
        }

        self.dispose();
    }

    /// Stop the effect from ever running again and drain its cleanups.
    pub(crate) fn dispose(&self) {
        if !self.disposed.replace(true) {
            cleanup::drain(self.id);
        }
    }
}

/// Run `effects` now, or hand them to the collecting batch.
pub(crate) fn run_effects(effects: Vec<Rc<EffectNode>>) {
    if effects.is_empty() {
        return;
    }

    if let Some(pending) = ReactiveContext::active_batch() {
        pending.extend(effects);
        return;
    }

    for effect in effects {
        effect.run();
    }
}

/// Create an effect and run it once, returning the result of that run.
///
/// The effect re-runs whenever a signal or memo it read during its last run
/// changes. Create effects inside [`create_scope`](super::create_scope) so
/// they can be disposed.
///
/// # Example
///
/// ```rust
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use ripple_core::{create_effect, create_signal};
///
/// let (n, set_n) = create_signal(0);
/// let log = Rc::new(RefCell::new(Vec::new()));
///
/// let log_clone = log.clone();
/// create_effect(move || log_clone.borrow_mut().push(n.get()));
///
/// set_n.set(1);
/// set_n.set(1);
/// set_n.set(2);
/// assert_eq!(*log.borrow(), vec![0, 1, 2]);
/// ```
pub fn create_effect<F, R>(f: F) -> R
where
    F: Fn() -> R + 'static,
    R: EffectOutcome,
{
    let id = SubscriberId::new();
    let owner = ReactiveContext::active_scope();
    let config = ReactiveContext::config();

    if owner.is_none() && config.warn_unscoped_effects {
        tracing::warn!(
            effect = %id,
            "effect created outside of a scope can never be disposed; \
             wrap it in create_scope and dispose it when no longer needed"
        );
    }
    if config.warn_nesting {
        if let Some(parent) = ReactiveContext::active_effect_id() {
            tracing::error!(
                effect = %id,
                parent = %parent,
                "effect nested inside another effect is not disposed with it; \
                 wrap the inner effect in untrack or create_scope"
            );
        }
        if let Some(memo) = ReactiveContext::active_memo_id() {
            tracing::error!(
                effect = %id,
                memo = %memo,
                "effect created inside a memo; wrap it in untrack"
            );
        }
    }

    let f = Rc::new(f);
    let callback = {
        let f = Rc::clone(&f);
        Box::new(move || (*f)().unsubscribes()) as Box<dyn Fn() -> bool>
    };

    let node = Rc::new(EffectNode {
        id,
        callback,
        owner,
        sources: RefCell::new(SmallVec::new()),
        disposed: Cell::new(false),
        run_count: Cell::new(0),
    });

    if let Some(scope) = &node.owner {
        scope.adopt(Computation::Effect(Rc::downgrade(&node)));
    }

    let result = node.run_with(|| (*f)());
    if result.unsubscribes() {
        node.unsubscribe();
    }

    result
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{create_scope, on_cleanup, Signal};

    #[test]
    fn effect_runs_on_creation() {
        let run_count = Rc::new(Cell::new(0));
        let run_count_clone = run_count.clone();

        create_effect(move || {
            run_count_clone.set(run_count_clone.get() + 1);
        });

        assert_eq!(run_count.get(), 1);
    }

    #[test]
    fn effect_returns_first_result() {
        assert!(!create_effect(|| false));
        assert_eq!(create_effect(|| ControlFlow::<(), u8>::Continue(7)), ControlFlow::Continue(7));
    }

    #[test]
    fn effect_reruns_on_dependency_change() {
        let signal = Signal::new(1);
        let seen = Rc::new(RefCell::new(Vec::new()));

        let signal_clone = signal.clone();
        let seen_clone = seen.clone();
        create_effect(move || seen_clone.borrow_mut().push(signal_clone.get()));

        signal.set(2);
        signal.set(3);

        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn repeated_reads_subscribe_once() {
        let signal = Signal::new(0);

        let signal_clone = signal.clone();
        create_effect(move || {
            for _ in 0..5 {
                signal_clone.get();
            }
        });

        assert_eq!(signal.effect_subscriber_count(), 1);
    }

    #[test]
    fn effect_returning_true_unsubscribes() {
        let a = Signal::new(0);
        let b = Signal::new(0);
        let runs = Rc::new(Cell::new(0));

        let (a_clone, b_clone, runs_clone) = (a.clone(), b.clone(), runs.clone());
        create_effect(move || {
            runs_clone.set(runs_clone.get() + 1);
            a_clone.get() + b_clone.get() >= 2
        });
        assert_eq!(a.effect_subscriber_count(), 1);
        assert_eq!(b.effect_subscriber_count(), 1);

        a.set(1);
        a.set(2);
        assert_eq!(runs.get(), 3);
        assert_eq!(a.effect_subscriber_count(), 0);
        assert_eq!(b.effect_subscriber_count(), 0);

        b.set(5);
        assert_eq!(runs.get(), 3);
    }

    #[test]
    fn cleanup_runs_before_rerun() {
        let signal = Signal::new(0);
        let events = Rc::new(RefCell::new(Vec::new()));

        let signal_clone = signal.clone();
        let events_clone = events.clone();
        create_effect(move || {
            let value = signal_clone.get();
            events_clone.borrow_mut().push(format!("run {value}"));
            let events = events_clone.clone();
            on_cleanup(move || events.borrow_mut().push(format!("cleanup {value}")));
        });

        signal.set(1);

        assert_eq!(*events.borrow(), vec!["run 0", "cleanup 0", "run 1"]);
    }

    #[test]
    fn self_removal_runs_last_cleanups_once() {
        let signal = Signal::new(0);
        let events = Rc::new(RefCell::new(Vec::new()));

        let (signal_clone, events_clone) = (signal.clone(), events.clone());
        create_effect(move || {
            let value = signal_clone.get();
            events_clone.borrow_mut().push(format!("run {value}"));
            let events = events_clone.clone();
            on_cleanup(move || events.borrow_mut().push(format!("cleanup {value}")));
            value >= 1
        });

        signal.set(1);
        signal.set(2);

        assert_eq!(
            *events.borrow(),
            vec!["run 0", "cleanup 0", "run 1", "cleanup 1"]
        );
        assert_eq!(signal.effect_subscriber_count(), 0);
    }

    #[test]
    fn disposed_effect_does_not_run() {
        let signal = Signal::new(0);
        let runs = Rc::new(Cell::new(0));

        let (signal_clone, runs_clone) = (signal.clone(), runs.clone());
        let scope = create_scope(move || {
            create_effect(move || {
                signal_clone.get();
                runs_clone.set(runs_clone.get() + 1);
            });
        });

        scope.dispose();
        signal.set(1);

        assert_eq!(runs.get(), 1);
        assert_eq!(signal.effect_subscriber_count(), 0);
    }

    #[test]
    fn panicking_effect_restores_context() {
        let result = std::panic::catch_unwind(|| {
            create_effect::<_, ()>(|| panic!("effect failed"));
        });

        assert!(result.is_err());
        assert!(ReactiveContext::active_effect_id().is_none());
        assert!(!ReactiveContext::is_tracking());
    }
}
