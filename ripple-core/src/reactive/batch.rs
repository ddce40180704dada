//! Batching
//!
//! Group multiple signal writes into a single effect pass.
//!
//! While a batch is collecting, writes still update values and mark memos
//! dirty immediately, but the effects they would run are queued in a
//! deduplicated set. The set is shared by every nested `batch` call and is
//! flushed once, when the outermost call returns.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;

use super::context::{Frame, ReactiveContext};
use super::effect::EffectNode;
use super::SubscriberId;

/// Effects queued by the collecting batch, in first-queued order.
#[derive(Clone, Default)]
pub(crate) struct PendingEffects {
    effects: Rc<RefCell<IndexMap<SubscriberId, Rc<EffectNode>>>>,
}

impl PendingEffects {
    /// Queue effects; an effect already queued keeps its place.
    pub(crate) fn extend(&self, effects: Vec<Rc<EffectNode>>) {
        let mut pending = self.effects.borrow_mut();
        for effect in effects {
            pending.entry(effect.id()).or_insert(effect);
        }
    }

    fn take(&self) -> Vec<Rc<EffectNode>> {
        std::mem::take(&mut *self.effects.borrow_mut())
            .into_values()
            .collect()
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.effects.borrow().len()
    }
}

/// Batch multiple signal updates into a single effect pass.
///
/// Without batching, each signal update triggers effects immediately.
/// With batching, each affected effect runs once after all updates complete.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use ripple_core::{batch, create_effect, create_signal};
///
/// let (a, set_a) = create_signal(1);
/// let (b, set_b) = create_signal(2);
/// let run_count = Rc::new(Cell::new(0));
///
/// let run_count_clone = run_count.clone();
/// create_effect(move || {
///     let _ = a.get() + b.get();
///     run_count_clone.set(run_count_clone.get() + 1);
/// });
/// assert_eq!(run_count.get(), 1);
///
/// batch(|| {
///     set_a.set(10);
///     set_b.set(20);
/// });
///
/// // Effect ran only once more (not twice)
/// assert_eq!(run_count.get(), 2);
/// ```
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    let previous = ReactiveContext::active_batch();
    if previous.is_some() && ReactiveContext::config().warn_nesting {
        tracing::warn!("nested batch; its effects run once the outermost batch completes");
    }

    let pending = previous.clone().unwrap_or_default();
    let result = {
        let _ctx = ReactiveContext::enter(Frame::new().batch(Some(pending.clone())));
        f()
    };

    if previous.is_none() {
        flush(&pending);
    }

    result
}

/// Run every queued effect once, skipping disposed ones.
///
/// The batch slot has already been restored, so writes made by these
/// effects run their own effects immediately.
fn flush(pending: &PendingEffects) {
    let effects = pending.take();
    tracing::trace!(effects = effects.len(), "flushing batch");

    for effect in effects {
        effect.run();
    }
}
