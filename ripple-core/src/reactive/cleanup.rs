//! Cleanup registry.
//!
//! `on_cleanup` attaches a teardown callback to the effect or memo that is
//! currently running. The callbacks are drained (invoked in registration
//! order, then forgotten) right before that computation runs again, or when
//! its scope disposes it.

use std::cell::RefCell;
use std::collections::HashMap;

use smallvec::SmallVec;

use super::context::{Frame, ReactiveContext};
use super::SubscriberId;

type Cleanup = Box<dyn FnOnce()>;

thread_local! {
    static REGISTRY: RefCell<HashMap<SubscriberId, SmallVec<[Cleanup; 2]>>> =
        RefCell::new(HashMap::new());
}

/// Register a teardown callback for the running effect or memo.
///
/// Called from inside a cleanup that is being drained, the callback runs
/// immediately instead of being queued. Called with no computation running,
/// the callback has nothing to attach to and is dropped.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use ripple_core::{create_effect, create_signal, on_cleanup};
///
/// let (count, set_count) = create_signal(0);
/// let cleaned = Rc::new(Cell::new(0));
///
/// let cleaned_clone = cleaned.clone();
/// create_effect(move || {
///     count.get();
///     let cleaned = cleaned_clone.clone();
///     on_cleanup(move || cleaned.set(cleaned.get() + 1));
/// });
///
/// set_count.set(1);
/// assert_eq!(cleaned.get(), 1);
/// ```
pub fn on_cleanup<F>(callback: F)
where
    F: FnOnce() + 'static,
{
    if ReactiveContext::is_cleaning() {
        if ReactiveContext::config().warn_nesting {
            tracing::warn!(
                "on_cleanup called from inside a cleanup callback; running it immediately"
            );
        }
        callback();
        return;
    }

    let Some(owner) = ReactiveContext::current_owner() else {
        tracing::warn!("on_cleanup called outside of an effect or memo; the callback will never run");
        return;
    };

    REGISTRY.with(|registry| {
        registry
            .borrow_mut()
            .entry(owner)
            .or_default()
            .push(Box::new(callback));
    });
}

/// Invoke and forget every cleanup registered for `owner`.
///
/// The entry is removed before any callback runs, so callbacks registered
/// by a re-run triggered from inside a cleanup belong to that next run.
pub(crate) fn drain(owner: SubscriberId) {
    // Memos dropped while thread locals are torn down find no registry.
    let Ok(Some(callbacks)) = REGISTRY.try_with(|registry| registry.borrow_mut().remove(&owner))
    else {
        return;
    };

    tracing::trace!(computation = %owner, count = callbacks.len(), "running cleanups");

    let _ctx = ReactiveContext::enter(Frame::new().cleaning(true));
    for callback in callbacks {
        callback();
    }
}

/// Number of cleanups waiting for `owner`'s next run or disposal.
#[cfg(test)]
pub(crate) fn pending(owner: SubscriberId) -> usize {
    REGISTRY.with(|registry| registry.borrow().get(&owner).map_or(0, SmallVec::len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counter() -> (Rc<Cell<usize>>, impl Fn() -> Box<dyn FnOnce()>) {
        let count = Rc::new(Cell::new(0));
        let handle = count.clone();
        (count, move || {
            let count = handle.clone();
            Box::new(move || count.set(count.get() + 1)) as Box<dyn FnOnce()>
        })
    }

    #[test]
    fn cleanup_outside_computation_is_dropped() {
        let (count, make) = counter();
        on_cleanup(make());

        assert_eq!(count.get(), 0);
    }

    #[test]
    fn drain_runs_in_registration_order_once() {
        let owner = SubscriberId::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for i in 0..3 {
            let order = order.clone();
            REGISTRY.with(|registry| {
                registry
                    .borrow_mut()
                    .entry(owner)
                    .or_default()
                    .push(Box::new(move || order.borrow_mut().push(i)));
            });
        }
        assert_eq!(pending(owner), 3);

        drain(owner);
        drain(owner);

        assert_eq!(*order.borrow(), vec![0, 1, 2]);
        assert_eq!(pending(owner), 0);
    }

    #[test]
    fn cleanup_registered_while_cleaning_runs_immediately() {
        let (count, make) = counter();

        let _ctx = ReactiveContext::enter(Frame::new().cleaning(true));
        on_cleanup(make());

        assert_eq!(count.get(), 1);
    }

    #[test]
    fn cleaning_flag_is_set_only_during_drain() {
        let owner = SubscriberId::new();
        let seen = Rc::new(Cell::new(false));

        let seen_clone = seen.clone();
        REGISTRY.with(|registry| {
            registry
                .borrow_mut()
                .entry(owner)
                .or_default()
                .push(Box::new(move || seen_clone.set(ReactiveContext::is_cleaning())));
        });

        drain(owner);

        assert!(seen.get());
        assert!(!ReactiveContext::is_cleaning());
    }
}
