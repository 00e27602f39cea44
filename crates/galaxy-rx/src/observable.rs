//! The `Observable` handle, its factories and the trace recorder.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::observer::{Observer, Subscriber};
use crate::subscription::Subscription;

type Producer<T, E> = dyn Fn(&Subscriber<T, E>) -> Result<(), E>;

/// A push-based stream.
///
/// Cheap to clone: clones share the producer. Nothing happens until
/// [`Observable::subscribe`] is called, and every subscription runs the
/// producer again from scratch.
pub struct Observable<T, E> {
    producer: Rc<Producer<T, E>>,
    depth: usize,
}

impl<T, E> Clone for Observable<T, E> {
    fn clone(&self) -> Self {
        Self {
            producer: Rc::clone(&self.producer),
            depth: self.depth,
        }
    }
}

impl<T, E> fmt::Debug for Observable<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Observable")
    }
}

impl<T, E> Observable<T, E> {
    /// Whether both handles share one producer.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.producer, &other.producer)
    }

    /// Number of operator layers between this stream and its root
    /// producer. Streams built with [`Observable::new`] have depth 0.
    pub fn depth(&self) -> usize {
        self.depth
    }
}

impl<T: 'static, E: 'static> Observable<T, E> {
    /// Build a stream from a producer. The producer runs synchronously on
    /// each subscribe; an `Err` it returns is delivered to the subscriber's
    /// `error` while the subscriber is still open.
    pub fn new(producer: impl Fn(&Subscriber<T, E>) -> Result<(), E> + 'static) -> Self {
        Self::layered(producer, 0)
    }

    pub(crate) fn layered(
        producer: impl Fn(&Subscriber<T, E>) -> Result<(), E> + 'static,
        depth: usize,
    ) -> Self {
        Self {
            producer: Rc::new(producer),
            depth,
        }
    }

    /// Subscribe an observer.
    ///
    /// Returns `Err` only when an error has nowhere left to go: it was
    /// raised after the subscriber terminated (a failing `complete`
    /// callback) or by the `error` callback itself.
    pub fn subscribe(&self, observer: impl Observer<T, E> + 'static) -> Result<Subscription, E> {
        let subscriber = Subscriber::new(observer);
        self.subscribe_with(&subscriber)?;
        Ok(subscriber.subscription().clone())
    }

    /// Run the producer against an existing subscriber.
    pub fn subscribe_with(&self, subscriber: &Subscriber<T, E>) -> Result<(), E> {
        match (self.producer)(subscriber) {
            Ok(()) => Ok(()),
            Err(err) if subscriber.is_closed() => Err(err),
            Err(err) => subscriber.error(err),
        }
    }

    /// Apply one operator: `s.pipe(a).pipe(b)` is `b(a(s))`.
    pub fn pipe<R, Op>(&self, op: Op) -> Observable<R, E>
    where
        Op: FnOnce(Observable<T, E>) -> Observable<R, E>,
    {
        op(self.clone())
    }

    /// Apply a sequence of same-typed operators left to right.
    pub fn pipe_all<Op>(&self, ops: impl IntoIterator<Item = Op>) -> Observable<T, E>
    where
        Op: FnOnce(Observable<T, E>) -> Observable<T, E>,
    {
        ops.into_iter().fold(self.clone(), |source, op| op(source))
    }

    /// Subscribe and record every notification. An error that escapes the
    /// subscription is recorded as the terminal.
    pub fn trace(&self) -> Trace<T, E> {
        let recorded = Rc::new(RefCell::new(Trace::default()));
        if let Err(err) = self.subscribe(Recorder(Rc::clone(&recorded))) {
            recorded.borrow_mut().terminal = Some(Terminal::Error(err));
        }
        let mut trace = recorded.borrow_mut();
        Trace {
            values: std::mem::take(&mut trace.values),
            terminal: trace.terminal.take(),
        }
    }
}

// ── Factories ─────────────────────────────────────────────────────────────────

/// Emit each value in order, then complete.
pub fn of<T, E>(values: impl IntoIterator<Item = T>) -> Observable<T, E>
where
    T: Clone + 'static,
    E: 'static,
{
    let values: Rc<[T]> = values.into_iter().collect();
    Observable::new(move |subscriber| {
        for value in values.iter() {
            if subscriber.is_closed() {
                return Ok(());
            }
            subscriber.next(value.clone())?;
        }
        subscriber.complete()
    })
}

/// Complete immediately without emitting.
pub fn empty<T: 'static, E: 'static>() -> Observable<T, E> {
    Observable::new(|subscriber| subscriber.complete())
}

// ── Trace ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Terminal<E> {
    Complete,
    Error(E),
}

/// Everything one subscription observed.
#[derive(Debug, Clone, PartialEq)]
pub struct Trace<T, E> {
    pub values: Vec<T>,
    /// `None` when the stream neither completed nor errored.
    pub terminal: Option<Terminal<E>>,
}

impl<T, E> Default for Trace<T, E> {
    fn default() -> Self {
        Self {
            values: Vec::new(),
            terminal: None,
        }
    }
}

impl<T, E> Trace<T, E> {
    pub fn completed(&self) -> bool {
        matches!(self.terminal, Some(Terminal::Complete))
    }

    pub fn error(&self) -> Option<&E> {
        match &self.terminal {
            Some(Terminal::Error(err)) => Some(err),
            _ => None,
        }
    }
}

struct Recorder<T, E>(Rc<RefCell<Trace<T, E>>>);

impl<T, E> Observer<T, E> for Recorder<T, E> {
    fn next(&self, value: T) -> Result<(), E> {
        self.0.borrow_mut().values.push(value);
        Ok(())
    }

    fn error(&self, err: E) -> Result<(), E> {
        self.0.borrow_mut().terminal = Some(Terminal::Error(err));
        Ok(())
    }

    fn complete(&self) -> Result<(), E> {
        self.0.borrow_mut().terminal = Some(Terminal::Complete);
        Ok(())
    }
}
