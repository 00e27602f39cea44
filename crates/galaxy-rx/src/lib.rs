//! Micro reactive runtime for RxGalaxy missions.
//!
//! A minimal, synchronous, single-threaded take on the Observable contract:
//! producers push `next`/`error`/`complete` into a [`Subscriber`] in the same
//! call stack as `subscribe`, operators are plain functions from one
//! [`Observable`] to another, and [`take`] is the only early-termination
//! construct.
//!
//! ```
//! use galaxy_rx::{filter, map, of, take};
//!
//! let trace = of::<_, ()>([1, 2, 3, 4, 5, 6])
//!     .pipe(filter(|n: &i32| n % 2 == 0))
//!     .pipe(map(|n: i32| n * 10))
//!     .pipe(take(2))
//!     .trace();
//! assert_eq!(trace.values, vec![20, 40]);
//! assert!(trace.completed());
//! ```

mod observable;
mod observer;
mod operators;
mod subscription;

pub use observable::{empty, of, Observable, Terminal, Trace};
pub use observer::{from_fn, FnObserver, Observer, Subscriber};
pub use operators::{filter, map, operate, take, try_filter, try_map};
pub use subscription::Subscription;
