//! Stream operators.
//!
//! An operator is a function `Observable<T, E> -> Observable<R, E>`. Each
//! returned stream subscribes to its source lazily, once per downstream
//! subscription, and links the upstream subscription under the downstream
//! one so that a downstream terminal tears the source down. A derived stream
//! is one layer deeper than its source.

use std::cell::Cell;
use std::rc::Rc;

use crate::observable::{empty, Observable};
use crate::observer::{Observer, Subscriber};

/// Subscribe `observer` to `source` on behalf of `downstream`.
///
/// The upstream subscription becomes a child of the downstream one. An error
/// that escapes the source subscription is returned to the caller.
pub fn operate<T, R, E>(
    source: &Observable<T, E>,
    downstream: &Subscriber<R, E>,
    observer: impl Observer<T, E> + 'static,
) -> Result<(), E>
where
    T: 'static,
    E: 'static,
{
    let upstream = Subscriber::new(observer);
    downstream.subscription().add(upstream.subscription().clone());
    source.subscribe_with(&upstream)
}

// ── map ───────────────────────────────────────────────────────────────────────

pub fn map<T, R, E, F>(project: F) -> impl Fn(Observable<T, E>) -> Observable<R, E>
where
    T: 'static,
    R: 'static,
    E: 'static,
    F: Fn(T) -> R + 'static,
{
    try_map::<T, R, E, _>(move |value: T| Ok(project(value)))
}

/// Like [`map`], but a failing projection errors the stream.
pub fn try_map<T, R, E, F>(project: F) -> impl Fn(Observable<T, E>) -> Observable<R, E>
where
    T: 'static,
    R: 'static,
    E: 'static,
    F: Fn(T) -> Result<R, E> + 'static,
{
    let project = Rc::new(project);
    move |source: Observable<T, E>| {
        let project = Rc::clone(&project);
        let depth = source.depth() + 1;
        let producer = move |subscriber: &Subscriber<R, E>| {
            let observer = MapObserver {
                downstream: subscriber.clone(),
                project: Rc::clone(&project),
            };
            operate(&source, subscriber, observer)
        };
        Observable::layered(producer, depth)
    }
}

struct MapObserver<R, E, F> {
    downstream: Subscriber<R, E>,
    project: Rc<F>,
}

impl<T, R, E, F> Observer<T, E> for MapObserver<R, E, F>
where
    F: Fn(T) -> Result<R, E>,
{
    fn next(&self, value: T) -> Result<(), E> {
        match (self.project)(value) {
            Ok(mapped) => self.downstream.next(mapped),
            Err(err) => self.downstream.error(err),
        }
    }

    fn error(&self, err: E) -> Result<(), E> {
        self.downstream.error(err)
    }

    fn complete(&self) -> Result<(), E> {
        self.downstream.complete()
    }
}

// ── filter ────────────────────────────────────────────────────────────────────

pub fn filter<T, E, P>(predicate: P) -> impl Fn(Observable<T, E>) -> Observable<T, E>
where
    T: 'static,
    E: 'static,
    P: Fn(&T) -> bool + 'static,
{
    try_filter::<T, E, _>(move |value: &T| Ok(predicate(value)))
}

/// Like [`filter`], but a failing predicate errors the stream.
pub fn try_filter<T, E, P>(predicate: P) -> impl Fn(Observable<T, E>) -> Observable<T, E>
where
    T: 'static,
    E: 'static,
    P: Fn(&T) -> Result<bool, E> + 'static,
{
    let predicate = Rc::new(predicate);
    move |source: Observable<T, E>| {
        let predicate = Rc::clone(&predicate);
        let depth = source.depth() + 1;
        let producer = move |subscriber: &Subscriber<T, E>| {
            let observer = FilterObserver {
                downstream: subscriber.clone(),
                predicate: Rc::clone(&predicate),
            };
            operate(&source, subscriber, observer)
        };
        Observable::layered(producer, depth)
    }
}

struct FilterObserver<T, E, P> {
    downstream: Subscriber<T, E>,
    predicate: Rc<P>,
}

impl<T, E, P> Observer<T, E> for FilterObserver<T, E, P>
where
    P: Fn(&T) -> Result<bool, E>,
{
    fn next(&self, value: T) -> Result<(), E> {
        match (self.predicate)(&value) {
            Ok(true) => self.downstream.next(value),
            Ok(false) => Ok(()),
            Err(err) => self.downstream.error(err),
        }
    }

    fn error(&self, err: E) -> Result<(), E> {
        self.downstream.error(err)
    }

    fn complete(&self) -> Result<(), E> {
        self.downstream.complete()
    }
}

// ── take ──────────────────────────────────────────────────────────────────────

/// Forward the first `count` values, then complete and unsubscribe from the
/// source. `take(0)` completes without subscribing to the source at all.
pub fn take<T, E>(count: usize) -> impl Fn(Observable<T, E>) -> Observable<T, E>
where
    T: 'static,
    E: 'static,
{
    move |source: Observable<T, E>| {
        if count == 0 {
            return empty();
        }
        let depth = source.depth() + 1;
        let producer = move |subscriber: &Subscriber<T, E>| {
            let observer = TakeObserver {
                downstream: subscriber.clone(),
                remaining: Cell::new(count),
            };
            operate(&source, subscriber, observer)
        };
        Observable::layered(producer, depth)
    }
}

struct TakeObserver<T, E> {
    downstream: Subscriber<T, E>,
    remaining: Cell<usize>,
}

impl<T, E> Observer<T, E> for TakeObserver<T, E> {
    fn next(&self, value: T) -> Result<(), E> {
        let remaining = self.remaining.get();
        if remaining == 0 {
            return Ok(());
        }
        self.remaining.set(remaining - 1);
        self.downstream.next(value)?;
        if remaining == 1 {
            self.downstream.complete()?;
        }
        Ok(())
    }

    fn error(&self, err: E) -> Result<(), E> {
        self.downstream.error(err)
    }

    fn complete(&self) -> Result<(), E> {
        self.downstream.complete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observable::of;
    use std::cell::RefCell;

    #[test]
    fn test_map_doubles() {
        let trace = of::<_, ()>([1, 2, 3, 4]).pipe(map(|x: i32| x * 2)).trace();
        assert_eq!(trace.values, vec![2, 4, 6, 8]);
        assert!(trace.completed());
    }

    #[test]
    fn test_filter_keeps_even() {
        let trace = of::<_, ()>([1, 2, 3, 4, 5])
            .pipe(filter(|n: &i32| n % 2 == 0))
            .trace();
        assert_eq!(trace.values, vec![2, 4]);
    }

    #[test]
    fn test_take_limits_and_completes() {
        let trace = of::<_, ()>([1, 2, 3, 4, 5, 6]).pipe(take(3)).trace();
        assert_eq!(trace.values, vec![1, 2, 3]);
        assert!(trace.completed());
    }

    #[test]
    fn test_take_zero_never_subscribes() {
        let subscribed = Rc::new(Cell::new(false));
        let flag = Rc::clone(&subscribed);
        let source: Observable<i32, ()> = Observable::new(move |s| {
            flag.set(true);
            s.next(1)
        });
        let trace = source.pipe(take(0)).trace();
        assert!(trace.values.is_empty());
        assert!(trace.completed());
        assert!(!subscribed.get());
    }

    #[test]
    fn test_take_stops_source_production() {
        let produced = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&produced);
        let source: Observable<i32, ()> = Observable::new(move |s| {
            for i in 1..=10 {
                if s.is_closed() {
                    break;
                }
                log.borrow_mut().push(i);
                s.next(i)?;
            }
            s.complete()
        });
        let trace = source.pipe(take(2)).trace();
        assert_eq!(trace.values, vec![1, 2]);
        assert_eq!(*produced.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_take_completes_even_if_source_does_not() {
        let source: Observable<i32, ()> = Observable::new(|s| {
            s.next(1)?;
            s.next(2)
        });
        let trace = source.pipe(take(1)).trace();
        assert_eq!(trace.values, vec![1]);
        assert!(trace.completed());
    }

    #[test]
    fn test_try_map_error_stops_stream() {
        let trace = of::<_, String>([1, 2, 3])
            .pipe(try_map(|x: i32| {
                if x == 2 {
                    Err("two".to_string())
                } else {
                    Ok(x)
                }
            }))
            .trace();
        assert_eq!(trace.values, vec![1]);
        assert_eq!(trace.error(), Some(&"two".to_string()));
    }

    #[test]
    fn test_try_filter_error_is_forwarded() {
        let trace = of::<_, String>([1, 2])
            .pipe(try_filter(|_: &i32| Err("bad predicate".to_string())))
            .trace();
        assert!(trace.values.is_empty());
        assert_eq!(trace.error(), Some(&"bad predicate".to_string()));
    }

    #[test]
    fn test_error_passes_through_operators() {
        let source: Observable<i32, String> = Observable::new(|s| {
            s.next(1)?;
            s.error("upstream".into())
        });
        let trace = source
            .pipe(map(|x: i32| x + 1))
            .pipe(filter(|_: &i32| true))
            .pipe(take(5))
            .trace();
        assert_eq!(trace.values, vec![2]);
        assert_eq!(trace.error(), Some(&"upstream".to_string()));
    }

    #[test]
    fn test_pipe_all_applies_left_to_right() {
        let ops: Vec<Box<dyn FnOnce(Observable<i32, ()>) -> Observable<i32, ()>>> = vec![
            Box::new(map(|x: i32| x + 1)),
            Box::new(map(|x: i32| x * 10)),
        ];
        assert_eq!(of([1, 2]).pipe_all(ops).trace().values, vec![20, 30]);
    }

    #[test]
    fn test_operators_add_one_layer() {
        let source = of::<_, ()>([1]);
        let chained = source
            .pipe(map(|x: i32| x))
            .pipe(filter(|_: &i32| true))
            .pipe(take(1));
        assert_eq!(chained.depth(), 3);
        assert_eq!(source.depth(), 0);
    }

    #[test]
    fn test_failing_final_complete_escapes_the_chain() {
        let source = of::<_, String>([1, 2, 3]).pipe(map(|x: i32| x * 2)).pipe(take(1));
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        struct FailOnComplete(Rc<RefCell<Vec<i32>>>);
        impl Observer<i32, String> for FailOnComplete {
            fn next(&self, value: i32) -> Result<(), String> {
                self.0.borrow_mut().push(value);
                Ok(())
            }
            fn complete(&self) -> Result<(), String> {
                Err("complete failed".to_string())
            }
        }
        let result = source.subscribe(FailOnComplete(sink));
        assert_eq!(result.unwrap_err(), "complete failed");
        assert_eq!(*seen.borrow(), vec![2]);
    }

    #[test]
    fn test_operator_is_reusable() {
        let double = map(|x: i32| x * 2);
        let a = of::<_, ()>([1]).pipe(&double).trace();
        let b = of::<_, ()>([5]).pipe(&double).trace();
        assert_eq!((a.values, b.values), (vec![2], vec![10]));
    }
}
