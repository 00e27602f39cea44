//! Subscription handles and teardown bookkeeping.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

type Teardown = Box<dyn FnOnce()>;

#[derive(Default)]
struct Inner {
    closed: Cell<bool>,
    teardowns: RefCell<Vec<Teardown>>,
    children: RefCell<Vec<Subscription>>,
}

/// Handle to an active subscription.
///
/// Clones share state: unsubscribing through any clone closes all of them.
/// Unsubscribing is idempotent; teardowns run once, in registration order,
/// followed by child subscriptions.
#[derive(Clone, Default)]
pub struct Subscription {
    inner: Rc<Inner>,
}

impl Subscription {
    pub fn new() -> Self {
        Self::default()
    }

    /// A subscription that is already closed.
    pub fn closed() -> Self {
        let sub = Self::new();
        sub.inner.closed.set(true);
        sub
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn unsubscribe(&self) {
        if self.inner.closed.replace(true) {
            return;
        }
        let teardowns = std::mem::take(&mut *self.inner.teardowns.borrow_mut());
        for teardown in teardowns {
            teardown();
        }
        let children = std::mem::take(&mut *self.inner.children.borrow_mut());
        for child in children {
            child.unsubscribe();
        }
    }

    /// Register a callback to run on unsubscribe. Runs immediately if this
    /// subscription is already closed.
    pub fn add_teardown(&self, teardown: impl FnOnce() + 'static) {
        if self.is_closed() {
            teardown();
        } else {
            self.inner.teardowns.borrow_mut().push(Box::new(teardown));
        }
    }

    /// Link a child: closing `self` closes `child` too.
    pub fn add(&self, child: Subscription) {
        if Rc::ptr_eq(&self.inner, &child.inner) {
            return;
        }
        if self.is_closed() {
            child.unsubscribe();
        } else {
            self.inner.children.borrow_mut().push(child);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .finish()
    }
}
