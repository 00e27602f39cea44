//! Observers and the subscriber wrapper handed to producers.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::subscription::Subscription;

/// Receiver of stream notifications.
///
/// Every callback returns a `Result`: an `Err` travels back into whoever
/// made the call, exactly like an exception thrown inside a callback.
/// `error` and `complete` default to no-ops.
pub trait Observer<T, E> {
    fn next(&self, value: T) -> Result<(), E>;

    fn error(&self, err: E) -> Result<(), E> {
        drop(err);
        Ok(())
    }

    fn complete(&self) -> Result<(), E> {
        Ok(())
    }
}

/// Observer built from a bare `next` callback.
pub struct FnObserver<F, T> {
    next: F,
    _marker: PhantomData<fn(T)>,
}

/// Wrap a `next` callback as an [`Observer`] whose `error` and `complete`
/// do nothing.
pub fn from_fn<T, E, F>(next: F) -> FnObserver<F, T>
where
    F: Fn(T) -> Result<(), E>,
{
    FnObserver {
        next,
        _marker: PhantomData,
    }
}

impl<T, E, F> Observer<T, E> for FnObserver<F, T>
where
    F: Fn(T) -> Result<(), E>,
{
    fn next(&self, value: T) -> Result<(), E> {
        (self.next)(value)
    }
}

// ── Subscriber ────────────────────────────────────────────────────────────────

struct Inner<T, E> {
    destination: Box<dyn Observer<T, E>>,
    stopped: Cell<bool>,
    subscription: Subscription,
}

/// The observer a producer talks to.
///
/// Wraps the real destination and enforces the stream grammar: after
/// `error` or `complete` (or after its subscription is closed) every further
/// notification is ignored. A terminal notification also unsubscribes, which
/// runs the producer's teardowns and closes linked upstream subscriptions.
pub struct Subscriber<T, E> {
    inner: Rc<Inner<T, E>>,
}

impl<T, E> Clone for Subscriber<T, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: 'static, E: 'static> Subscriber<T, E> {
    pub fn new(destination: impl Observer<T, E> + 'static) -> Self {
        Self {
            inner: Rc::new(Inner {
                destination: Box::new(destination),
                stopped: Cell::new(false),
                subscription: Subscription::new(),
            }),
        }
    }
}

impl<T, E> Subscriber<T, E> {
    /// `true` once a terminal notification was delivered or the
    /// subscription was closed from outside.
    pub fn is_closed(&self) -> bool {
        self.inner.stopped.get() || self.inner.subscription.is_closed()
    }

    pub fn subscription(&self) -> &Subscription {
        &self.inner.subscription
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn next(&self, value: T) -> Result<(), E> {
        if self.is_closed() {
            return Ok(());
        }
        self.inner.destination.next(value)
    }

    pub fn error(&self, err: E) -> Result<(), E> {
        if self.is_closed() {
            return Ok(());
        }
        self.inner.stopped.set(true);
        let result = self.inner.destination.error(err);
        self.inner.subscription.unsubscribe();
        result
    }

    pub fn complete(&self) -> Result<(), E> {
        if self.is_closed() {
            return Ok(());
        }
        self.inner.stopped.set(true);
        let result = self.inner.destination.complete();
        self.inner.subscription.unsubscribe();
        result
    }
}

impl<T, E> Observer<T, E> for Subscriber<T, E> {
    fn next(&self, value: T) -> Result<(), E> {
        Subscriber::next(self, value)
    }

    fn error(&self, err: E) -> Result<(), E> {
        Subscriber::error(self, err)
    }

    fn complete(&self) -> Result<(), E> {
        Subscriber::complete(self)
    }
}

impl<T, E> fmt::Debug for Subscriber<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscriber")
            .field("closed", &self.is_closed())
            .finish()
    }
}
