//! Ripple Core
//!
//! This crate provides a fine-grained reactive runtime. It implements:
//!
//! - Reactive cells (signals) that discover their readers automatically
//! - Eager computations (effects) and lazy cached derivations (memos)
//! - Disposal containers (scopes) and write coalescing (batches)
//! - Per-computation teardown callbacks (cleanups)
//!
//! Dependencies are never declared: whatever a computation reads while it
//! runs becomes a dependency, and writes re-run exactly the computations
//! that read the written cell.
//!
//! # Architecture
//!
//! - `reactive`: the primitives and the thread-local execution context
//! - `error`: errors returned for misuse the runtime refuses
//!
//! Misuse that the runtime tolerates (leaky unscoped effects, nesting) is
//! reported through `tracing`.
//!
//! # Example
//!
//! ```rust
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use ripple_core::{batch, create_effect, create_memo, create_scope, create_signal};
//!
//! let (count, set_count) = create_signal(0);
//! let count_clone = count.clone();
//! let doubled = create_memo(move || count_clone.get() * 2).expect("not nested");
//! let log = Rc::new(RefCell::new(Vec::new()));
//!
//! let log_clone = log.clone();
//! let scope = create_scope(move || {
//!     create_effect(move || {
//!         log_clone.borrow_mut().push((count.get(), doubled.get()));
//!     });
//! });
//!
//! batch(|| {
//!     set_count.set(4);
//!     set_count.set(5);
//! });
//! assert_eq!(*log.borrow(), vec![(0, 0), (5, 10)]);
//!
//! scope.dispose();
//! set_count.set(6);
//! assert_eq!(log.borrow().len(), 2);
//! ```

pub mod error;
pub mod reactive;

pub use error::{ReactiveError, Result};
pub use reactive::{
    batch, create_effect, create_memo, create_scope, create_signal, on_cleanup, untrack,
    untrack_scope, Memo, ReadSignal, Scope, Signal, WriteSignal,
};
