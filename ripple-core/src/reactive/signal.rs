//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive. It holds a value and
//! tracks which computations depend on it.
//!
//! # How Signals Work
//!
//! 1. When a signal is read within a reactive context (memo/effect), the
//!    signal registers that context as a subscriber.
//!
//! 2. When a signal's value changes, subscribed memos are marked dirty
//!    first, then the value is replaced, then subscribed effects run.
//!
//! 3. Writing a value equal to the current one does nothing, unless the
//!    write is forced.
//!
//! Marking memos dirty before any effect runs means an effect that reads a
//! memo during this write recomputes it instead of seeing a stale cache.

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use super::effect::run_effects;
use super::subscriber::{SourceId, Subscribers};

struct SignalInner<T> {
    /// The current value.
    value: RefCell<T>,

    /// Effects and memos that read this signal.
    subscribers: Subscribers,
}

/// A reactive signal holding a value of type T.
///
/// Cloning a signal yields another handle to the same cell.
///
/// # Example
///
/// ```rust
/// use ripple_core::Signal;
///
/// let count = Signal::new(0);
///
/// // Read the value
/// assert_eq!(count.get(), 0);
///
/// // Update the value (notifies subscribers)
/// count.set(5);
/// assert_eq!(count.get(), 5);
/// ```
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

impl<T> Signal<T>
where
    T: 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                value: RefCell::new(value),
                subscribers: Subscribers::new(),
            }),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> SourceId {
        self.inner.subscribers.id()
    }

    /// Get the current value.
    ///
    /// If called within a reactive context, this also registers the
    /// current computation as a subscriber.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.inner.subscribers.track();
        self.get_untracked()
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.borrow().clone()
    }

    /// Set a new value and notify subscribers if it differs from the
    /// current one.
    pub fn set(&self, value: T)
    where
        T: PartialEq,
    {
        self.replace(value, false);
    }

    /// Set a new value and notify subscribers even if it is unchanged.
    pub fn force_set(&self, value: T)
    where
        T: PartialEq,
    {
        self.replace(value, true);
    }

    /// Write a value, optionally forcing notification, and return the
    /// value now held by the signal.
    pub fn write(&self, value: T, force: bool) -> T
    where
        T: Clone + PartialEq,
    {
        self.replace(value, force);
        self.get_untracked()
    }

    /// Update the value using a function.
    ///
    /// This is useful for updates that depend on the current value.
    pub fn update<F>(&self, f: F)
    where
        T: PartialEq,
        F: FnOnce(&T) -> T,
    {
        let value = f(&self.inner.value.borrow());
        self.set(value);
    }

    /// Split the signal into its read and write halves.
    pub fn split(self) -> (ReadSignal<T>, WriteSignal<T>) {
        (
            ReadSignal {
                signal: self.clone(),
            },
            WriteSignal { signal: self },
        )
    }

    /// Get the number of effects subscribed to this signal.
    pub fn effect_subscriber_count(&self) -> usize {
        self.inner.subscribers.effect_count()
    }

    /// Get the number of memos subscribed to this signal.
    pub fn memo_subscriber_count(&self) -> usize {
        self.inner.subscribers.invalidator_count()
    }

    /// Store `value` and notify subscribers; returns whether anyone was
    /// notified.
    fn replace(&self, value: T, force: bool) -> bool
    where
        T: PartialEq,
    {
        if !force && *self.inner.value.borrow() == value {
            return false;
        }

        let subscribers = &self.inner.subscribers;
        subscribers.invalidate_memos();
        let _previous = self.inner.value.replace(value);

        let effects = subscribers.effects();
        tracing::trace!(signal = %subscribers.id(), effects = effects.len(), force, "signal changed");
        run_effects(effects);

        true
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Debug for Signal<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.subscribers.id())
            .field("value", &*self.inner.value.borrow())
            .field("effect_subscribers", &self.inner.subscribers.effect_count())
            .finish()
    }
}

/// The read half of a signal.
pub struct ReadSignal<T> {
    signal: Signal<T>,
}

impl<T> ReadSignal<T>
where
    T: Clone + 'static,
{
    /// Get the current value, subscribing the active computation.
    pub fn get(&self) -> T {
        self.signal.get()
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.signal.get_untracked()
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> SourceId {
        self.signal.id()
    }
}

impl<T> Clone for ReadSignal<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
        }
    }
}

impl<T: Debug> Debug for ReadSignal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ReadSignal").field(&self.signal).finish()
    }
}

/// The write half of a signal.
pub struct WriteSignal<T> {
    signal: Signal<T>,
}

impl<T> WriteSignal<T>
where
    T: PartialEq + 'static,
{
    /// Set a new value, notifying subscribers if it changed.
    pub fn set(&self, value: T) {
        self.signal.set(value);
    }

    /// Set a new value and notify subscribers unconditionally.
    pub fn force_set(&self, value: T) {
        self.signal.force_set(value);
    }

    /// Write a value and return the value now held by the signal.
    pub fn write(&self, value: T, force: bool) -> T
    where
        T: Clone,
    {
        self.signal.write(value, force)
    }

    /// Update the value using a function.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        self.signal.update(f);
    }
}

impl<T> Clone for WriteSignal<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
        }
    }
}

impl<T: Debug> Debug for WriteSignal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("WriteSignal").field(&self.signal).finish()
    }
}

/// Create a signal and return its read and write halves.
pub fn create_signal<T>(initial: T) -> (ReadSignal<T>, WriteSignal<T>)
where
    T: 'static,
{
    Signal::new(initial).split()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
