//! Untracked execution.

use super::context::{Frame, ReactiveContext};

/// Read signals without creating dependencies.
///
/// Clears the active effect and memo for the duration of `f`; both are
/// restored afterwards, also when `f` panics.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use std::rc::Rc;
/// use ripple_core::{create_effect, create_signal, untrack};
///
/// let (a, set_a) = create_signal(1);
/// let (b, set_b) = create_signal(2);
/// let run_count = Rc::new(Cell::new(0));
///
/// let run_count_clone = run_count.clone();
/// create_effect(move || {
///     let _ = a.get() + untrack(|| b.get());
///     run_count_clone.set(run_count_clone.get() + 1);
/// });
///
/// set_a.set(10); // Effect re-runs (dependency)
/// set_b.set(20); // Effect does NOT re-run (untracked)
/// assert_eq!(run_count.get(), 2);
/// ```
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::enter(Frame::new().effect(None).invalidator(None));
    f()
}

/// Run `f` with no scope collecting.
///
/// Effects and memos created inside `f` are not adopted by the enclosing
/// scope and survive its disposal.
pub fn untrack_scope<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::enter(Frame::new().scope(None));
    f()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{create_effect, create_scope};

    #[test]
    fn untrack_clears_tracking_slots() {
        create_effect(|| {
            assert!(ReactiveContext::is_tracking());
            untrack(|| assert!(!ReactiveContext::is_tracking()));
            assert!(ReactiveContext::is_tracking());
        });
    }

    #[test]
    fn untrack_restores_on_panic() {
        create_effect(|| {
            let result = std::panic::catch_unwind(|| untrack(|| panic!("read failed")));
            assert!(result.is_err());
            assert!(ReactiveContext::is_tracking());
        });
    }

    #[test]
    fn untrack_scope_clears_only_the_scope() {
        create_scope(|| {
            untrack_scope(|| assert!(!ReactiveContext::has_scope()));
            assert!(ReactiveContext::has_scope());
        });
    }
}
