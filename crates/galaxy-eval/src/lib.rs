//! Sandboxed evaluator and test harness for RxGalaxy mission programs.
//!
//! A mission program is JavaScript-like source text. It is parsed into an
//! AST and run by a tree-walking interpreter whose only bindings are the
//! stream primitives (`Observable`, `of`, `map`, `filter`, `take`), `Error`
//! and a capture-only `console`. Nothing of the host is reachable, every
//! run gets a fresh scope and step budget, and no clock or randomness is
//! consulted, so the same program always yields the same result.
//!
//! ```
//! use galaxy_eval::{evaluate, EvalConfig};
//!
//! let program = "
//!     const results = [];
//!     of(1, 2, 3, 4).pipe(filter(x => x % 2 === 0)).subscribe(v => results.push(v));
//!     return results;
//! ";
//! let evaluation = evaluate(program, &EvalConfig::default());
//! let expected = [serde_json::json!(2), serde_json::json!(4)];
//! assert_eq!(evaluation.outcome.values(), Some(&expected[..]));
//! ```

mod builtins;
mod config;
mod env;
mod error;
mod interpreter;
mod members;
mod sandbox;
mod test_runner;
mod value;

pub use builtins::PRIMITIVES;
pub use config::{EvalConfig, HarnessConfig};
pub use env::Environment;
pub use error::{EvalError, EvalResult};
pub use interpreter::Interpreter;
pub use sandbox::{evaluate, ConsoleEntry, ConsoleLevel, Evaluation, Outcome};
pub use test_runner::{fingerprint, run_tests, run_tests_with_progress, TestRunSummary};
pub use value::{Elements, Fields, Function, NativeFn, Record, Sink, Stream, Value};
