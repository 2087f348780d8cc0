//! Attach/detach scopes for UI widgets
//!
//! Widgets subscribe when they are attached to a player and must release
//! everything when they are detached, in whatever order the host tears them
//! down. An [`AttachScope`] owns a widget's subscriptions for one attachment:
//! detaching (explicitly or by dropping the scope) releases all of them.

use std::cell::{Cell, RefCell};
use std::fmt;

use state_store::Subscription;
use tracing::trace;

use crate::model::{PlayerState, Target};
use crate::store::StateStore;

/// Subscriptions held for the duration of one attachment
pub struct AttachScope {
    name: String,
    attached: Cell<bool>,
    subscriptions: RefCell<Vec<Subscription>>,
}

impl AttachScope {
    /// A detached scope; `name` is used in logs only
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attached: Cell::new(false),
            subscriptions: RefCell::new(Vec::new()),
        }
    }

    /// Mark the scope attached. Attaching twice is a no-op.
    pub fn attach(&self) {
        if !self.attached.replace(true) {
            trace!(scope = %self.name, "Scope attached");
        }
    }

    pub fn is_attached(&self) -> bool {
        self.attached.get()
    }

    /// Keep `subscription` until the scope detaches
    ///
    /// A subscription handed to a detached scope is released immediately.
    pub fn hold(&self, subscription: Subscription) {
        if self.attached.get() {
            self.subscriptions.borrow_mut().push(subscription);
        } else {
            trace!(scope = %self.name, "Scope not attached; releasing subscription");
            subscription.unsubscribe();
        }
    }

    /// Subscribe to `store` for the lifetime of this attachment
    pub fn subscribe(
        &self,
        store: &StateStore,
        target: impl Into<Target>,
        callback: impl FnMut(&PlayerState) + 'static,
    ) {
        if self.attached.get() {
            self.hold(store.subscribe(target, callback));
        }
    }

    /// Release every held subscription. Detaching twice is a no-op.
    pub fn detach(&self) {
        if !self.attached.replace(false) {
            return;
        }
        let released: Vec<Subscription> = self.subscriptions.borrow_mut().drain(..).collect();
        trace!(scope = %self.name, released = released.len(), "Scope detached");
        for subscription in released {
            subscription.unsubscribe();
        }
    }

    /// Number of subscriptions held
    pub fn len(&self) -> usize {
        self.subscriptions.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.borrow().is_empty()
    }
}

impl Drop for AttachScope {
    fn drop(&mut self) {
        self.detach();
    }
}

impl fmt::Debug for AttachScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachScope")
            .field("name", &self.name)
            .field("attached", &self.attached.get())
            .field("subscriptions", &self.len())
            .finish()
    }
}
