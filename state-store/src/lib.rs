//! Reactive State Primitives
//!
//! Single-threaded building blocks for fine-grained reactive state: cells
//! that notify on change, derived values that recompute only when read after
//! one of their sources changed, and subscription handles that release their
//! observer exactly once.
//!
//! # Features
//!
//! - **Change Detection**: `Signal::set` is a no-op for equal values, with a
//!   configurable equality per signal
//! - **Lazy Derivation**: `Computed` values are invalidated on write and
//!   recomputed on read
//! - **Trailing Coalescing**: reentrant writes from observers are delivered in
//!   one follow-up pass instead of recursing
//! - **Scoped Subscriptions**: idempotent `unsubscribe`, release on drop, weak
//!   back-references so handles never keep owners alive
//!
//! # Quick Start
//!
//! ```rust
//! use state_store::{Computed, Signal};
//!
//! let volume = Signal::new(0.5_f64);
//! let muted = Signal::new(false);
//!
//! let audible = {
//!     let (v, m) = (volume.clone(), muted.clone());
//!     Computed::new(&[&volume, &muted], move || !m.get() && v.get() > 0.0)
//! };
//!
//! let sub = muted.subscribe(|m| println!("muted: {m}"));
//!
//! assert!(audible.get());
//! muted.set(true);
//! assert!(!audible.get());
//!
//! sub.unsubscribe();
//! ```
//!
//! # Architecture
//!
//! ```text
//! Signal<T> ──version──▶ Computed<U> ──version──▶ Computed<V>
//!     │    ◀──invalidate──     │     ◀──invalidate──
//!     │
//!     └── ObserverList<T> ──▶ Subscription (weak, idempotent)
//! ```
//!
//! Nothing here is `Send`: all reads, writes and notifications happen on the
//! calling thread, in program order.

// Modules
pub mod computed;
pub mod signal;
pub mod source;
pub mod subscription;

// Re-exports - Public API
pub use computed::Computed;
pub use signal::{equals, same_value, Equality, Signal};
pub use source::{AsSource, Dependent, Source};
pub use subscription::{Detach, Observer, ObserverList, Subscription};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::computed::Computed;
    pub use crate::signal::Signal;
    pub use crate::source::AsSource;
    pub use crate::subscription::Subscription;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_full_workflow() {
        let current_time = Signal::with_equality(0.0, same_value);
        let duration = Signal::with_equality(f64::NAN, same_value);

        let remaining = {
            let (t, d) = (current_time.clone(), duration.clone());
            Computed::new(&[&current_time, &duration], move || {
                let d = d.get();
                if d.is_finite() {
                    (d - t.get()).max(0.0)
                } else {
                    0.0
                }
            })
        };

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sub = {
            let seen = Rc::clone(&seen);
            duration.subscribe(move |d| seen.borrow_mut().push(*d))
        };

        assert_eq!(remaining.get(), 0.0);
        duration.set(f64::NAN);
        duration.set(90.0);
        current_time.set(30.0);

        assert_eq!(remaining.get(), 60.0);
        assert_eq!(*seen.borrow(), vec![90.0]);
        sub.unsubscribe();
    }

    #[test]
    fn test_signal_clone_shares_state() {
        let a = Signal::new(1);
        let b = a.clone();

        a.set(5);
        assert_eq!(b.get(), 5);
        assert_eq!(b.version(), 1);
    }
}
