//! Algebraic laws of the runtime, checked with proptest.
//!
//! Covers: `of` replays its arguments, `filter` removes failing elements,
//! `map` preserves length and order, `take(n)` yields a prefix and never
//! forwards past it, and `pipe` composes left to right.

use std::cell::Cell;
use std::rc::Rc;

use galaxy_rx::{filter, from_fn, map, of, take, Observable, Subscriber, Terminal};
use proptest::prelude::*;

// ─────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────

fn values(source: &Observable<i64, String>) -> Vec<i64> {
    let trace = source.trace();
    assert_eq!(trace.terminal, Some(Terminal::Complete));
    trace.values
}

/// A source that emits `items` and counts how many `next` calls reach its
/// subscriber while it is still open.
fn counting_source(items: Vec<i64>, delivered: Rc<Cell<usize>>) -> Observable<i64, String> {
    Observable::new(move |subscriber: &Subscriber<i64, String>| {
        for item in &items {
            if !subscriber.is_closed() {
                delivered.set(delivered.get() + 1);
            }
            subscriber.next(*item)?;
        }
        subscriber.complete()
    })
}

proptest! {
    #[test]
    fn of_replays_arguments(items in prop::collection::vec(any::<i64>(), 0..32)) {
        prop_assert_eq!(values(&of(items.clone())), items);
    }

    #[test]
    fn filter_removes_failing_elements(
        items in prop::collection::vec(-1000i64..1000, 0..32),
        modulus in 1i64..7,
    ) {
        let expected: Vec<i64> = items.iter().copied().filter(|x| x % modulus == 0).collect();
        let piped = of(items).pipe(filter(move |x: &i64| x % modulus == 0));
        prop_assert_eq!(values(&piped), expected);
    }

    #[test]
    fn map_preserves_length_and_order(
        items in prop::collection::vec(-1000i64..1000, 0..32),
        k in -5i64..5,
    ) {
        let expected: Vec<i64> = items.iter().map(|x| x * k + 1).collect();
        let piped = of(items).pipe(map(move |x: i64| x * k + 1));
        prop_assert_eq!(values(&piped), expected);
    }

    #[test]
    fn take_yields_prefix(items in prop::collection::vec(any::<i64>(), 0..32), n in 0usize..40) {
        let expected: Vec<i64> = items.iter().copied().take(n).collect();
        prop_assert_eq!(values(&of(items).pipe(take(n))), expected);
    }

    #[test]
    fn take_never_forwards_past_count(items in prop::collection::vec(any::<i64>(), 0..32), n in 1usize..40) {
        let delivered = Rc::new(Cell::new(0));
        let source = counting_source(items.clone(), Rc::clone(&delivered));
        let forwarded = Rc::new(Cell::new(0));
        let sink = Rc::clone(&forwarded);
        let subscribed = source.pipe(take(n)).subscribe(from_fn(move |_: i64| {
            sink.set(sink.get() + 1);
            Ok::<(), String>(())
        }));
        prop_assert!(subscribed.is_ok());
        prop_assert_eq!(forwarded.get(), n.min(items.len()));
        prop_assert_eq!(delivered.get(), n.min(items.len()));
    }

    #[test]
    fn pipe_composes_left_to_right(items in prop::collection::vec(-100i64..100, 0..16)) {
        let chained = of(items.clone()).pipe(map(|x: i64| x + 1)).pipe(map(|x: i64| x * 3));
        let nested = map(|x: i64| x * 3)(map(|x: i64| x + 1)(of(items)));
        prop_assert_eq!(values(&chained), values(&nested));
    }

    #[test]
    fn subscribing_twice_is_idempotent(items in prop::collection::vec(any::<i64>(), 0..16), n in 0usize..20) {
        let piped = of::<i64, String>(items).pipe(take(n));
        prop_assert_eq!(piped.trace(), piped.trace());
    }
}

#[test]
fn test_take_zero_completes_immediately() {
    let trace = of::<i64, String>([1, 2, 3]).pipe(take(0)).trace();
    assert!(trace.values.is_empty());
    assert!(trace.completed());
}

#[test]
fn test_producer_error_delivered_not_raised() {
    let failing: Observable<i64, String> = Observable::new(|_| Err("producer threw".into()));
    let seen = Rc::new(Cell::new(false));
    let flag = Rc::clone(&seen);
    struct OnError(Rc<Cell<bool>>);
    impl galaxy_rx::Observer<i64, String> for OnError {
        fn next(&self, _: i64) -> Result<(), String> {
            Ok(())
        }
        fn error(&self, err: String) -> Result<(), String> {
            assert_eq!(err, "producer threw");
            self.0.set(true);
            Ok(())
        }
    }
    let sub = failing.subscribe(OnError(flag)).unwrap();
    assert!(seen.get());
    assert!(sub.is_closed());
}

#[test]
fn test_teardown_runs_when_take_completes() {
    let torn_down = Rc::new(Cell::new(false));
    let flag = Rc::clone(&torn_down);
    let source: Observable<i64, String> = Observable::new(move |subscriber| {
        let flag = Rc::clone(&flag);
        subscriber.subscription().add_teardown(move || flag.set(true));
        for i in 0..100 {
            subscriber.next(i)?;
        }
        subscriber.complete()
    });
    assert_eq!(values(&source.pipe(take(3))), vec![0, 1, 2]);
    assert!(torn_down.get());
}

#[test]
fn test_unsubscribe_before_producer_finishes() {
    let source: Observable<i64, String> = Observable::new(|subscriber| {
        subscriber.next(1)?;
        subscriber.subscription().unsubscribe();
        subscriber.next(2)?;
        subscriber.complete()
    });
    let trace = source.trace();
    assert_eq!(trace.values, vec![1]);
    assert_eq!(trace.terminal, None);
}

#[test]
fn test_error_after_terminal_is_not_swallowed() {
    let source: Observable<i64, String> = Observable::new(|subscriber| {
        subscriber.next(1)?;
        subscriber.complete()?;
        Err("thrown after complete".into())
    });
    let chained = source.pipe(map(|x: i64| x + 1)).pipe(filter(|_: &i64| true));
    let result = chained.subscribe(from_fn(|_: i64| Ok::<(), String>(())));
    assert_eq!(result.unwrap_err(), "thrown after complete");
}
