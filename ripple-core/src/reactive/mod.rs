//! Reactive Primitives
//!
//! This module implements the core reactive system: signals, effects, memos,
//! scopes and batches. These primitives form the foundation of Ripple's
//! fine-grained reactivity.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A Signal is a container for mutable state. When a signal's value is read
//! within a tracking context (such as a memo or effect), the signal automatically
//! registers that context as a dependent. When the signal's value changes, all
//! dependents are notified.
//!
//! ## Effects
//!
//! An Effect is a side-effecting computation that runs once when created and
//! again whenever a dependency changes.
//!
//! ## Memos
//!
//! A Memo is a derived value that caches its result. A dependency change only
//! marks it dirty; it recomputes on the next read.
//!
//! ## Scopes and batches
//!
//! A Scope collects the computations created inside it so they can be
//! disposed together. A batch defers effects triggered by several writes and
//! runs each of them once.
//!
//! # Implementation Notes
//!
//! The reactive system uses a thread-local tracking context to automatically
//! detect dependencies. When a signal is read, we check if there is an active
//! tracking context and, if so, register the dependency.
//!
//! Everything here is single-threaded: handles are `Rc`-based and neither
//! `Send` nor `Sync`.

mod batch;
mod cleanup;
mod config;
mod context;
mod effect;
mod memo;
mod scope;
mod signal;
mod subscriber;
mod untrack;

pub use batch::batch;
pub use cleanup::on_cleanup;
pub use config::RuntimeConfig;
pub use context::ReactiveContext;
pub use effect::{create_effect, EffectOutcome};
pub use memo::{create_memo, Memo};
pub use scope::{create_scope, Scope, ScopeId};
pub use signal::{create_signal, ReadSignal, Signal, WriteSignal};
pub use subscriber::{SourceId, SubscriberId};
pub use untrack::{untrack, untrack_scope};
