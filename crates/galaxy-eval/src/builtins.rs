//! The bindings visible to mission programs: the stream primitives,
//! `Error`, and the capture-only `console`.

use galaxy_rx::{of, take, try_filter, try_map};
use galaxy_types::ast::ImportDecl;
use tracing::debug;

use crate::env::Environment;
use crate::error::{EvalError, EvalResult};
use crate::interpreter::Interpreter;
use crate::sandbox::ConsoleLevel;
use crate::value::{Fields, Sink, Stream, Value};

/// Names a mission may import.
pub const PRIMITIVES: [&str; 5] = ["Observable", "of", "filter", "map", "take"];

/// Define every global binding in `env`.
pub(crate) fn install(env: &Environment, capture_console: bool) {
    env.define("Observable", Value::constructor("Observable", construct_observable));
    env.define("of", Value::native("of", |_, args| Ok(Value::Observable(of(args)))));
    env.define("map", Value::native("map", map_operator));
    env.define("filter", Value::native("filter", filter_operator));
    env.define("take", Value::native("take", take_operator));
    env.define("Error", Value::constructor("Error", construct_error));
    if capture_console {
        env.define("console", console());
    }
}

/// Imports are declarative: every name must already be a provided primitive.
pub(crate) fn check_import(import: &ImportDecl, env: &Environment) -> EvalResult<()> {
    for name in &import.names {
        if !PRIMITIVES.contains(&name.name.as_str()) || env.get(&name.name).is_none() {
            return Err(EvalError::Syntax {
                line: name.span.start_line,
                column: name.span.start_col,
                message: format!(
                    "The requested module '{}' does not provide an export named '{}'",
                    import.source, name.name
                ),
            });
        }
    }
    Ok(())
}

// ══════════════════════════════════════════════════════════════════════════════
// Observable
// ══════════════════════════════════════════════════════════════════════════════

/// `new Observable(producer)`.
///
/// The producer is called with the subscriber on every subscribe. A throw
/// inside it lands in the subscriber's `error`; a returned function is
/// registered as teardown.
fn construct_observable(interp: &Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    let producer = match args.into_iter().next() {
        Some(f @ Value::Function(_)) => Some(f),
        None | Some(Value::Undefined) => None,
        Some(other) => {
            return Err(EvalError::type_error(format!(
                "Observable producer must be a function, got {}",
                other.type_of()
            )))
        }
    };
    let interp = interp.clone();
    Ok(Value::Observable(Stream::new(move |subscriber: &Sink| {
        let Some(producer) = &producer else {
            return Ok(());
        };
        let teardown = interp.call(producer, vec![Value::Subscriber(subscriber.clone())])?;
        if let Value::Function(_) = teardown {
            let interp = interp.clone();
            subscriber.subscription().add_teardown(move || {
                if let Err(err) = interp.call(&teardown, Vec::new()) {
                    debug!(%err, "teardown failed");
                }
            });
        }
        Ok(())
    })))
}

/// The stream an operator was applied to.
pub(crate) fn expect_stream(value: Option<Value>, operator: &str) -> EvalResult<Stream> {
    match value {
        Some(Value::Observable(stream)) => Ok(stream),
        other => Err(EvalError::type_error(format!(
            "{operator}() must be applied to an Observable, got {}",
            other.map_or("undefined", |v| v.type_of())
        ))),
    }
}

fn expect_function(value: Option<Value>, operator: &str) -> EvalResult<Value> {
    match value {
        Some(f @ Value::Function(_)) => Ok(f),
        other => Err(EvalError::type_error(format!(
            "{operator}() expects a function, got {}",
            other.map_or_else(|| "undefined".to_string(), |v| v.inspect())
        ))),
    }
}

// ── Operators ─────────────────────────────────────────────────────────────────

/// The stream an operator is applied to, refused once the chain already
/// carries `max_pipe_depth` layers.
fn operator_source(interp: &Interpreter, args: Vec<Value>, operator: &str) -> EvalResult<Stream> {
    let source = expect_stream(args.into_iter().next(), operator)?;
    let limit = interp.config().max_pipe_depth;
    if source.depth() >= limit {
        return Err(EvalError::range_error(format!(
            "{operator}() cannot extend a stream of {limit} operators"
        )));
    }
    Ok(source)
}

/// `map(project)` returns an operator: a function from stream to stream.
fn map_operator(_: &Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    let project = expect_function(args.into_iter().next(), "map")?;
    Ok(Value::native("map", move |interp, args| {
        let source = operator_source(interp, args, "map")?;
        let interp = interp.clone();
        let project = project.clone();
        Ok(Value::Observable(source.pipe(try_map(move |value: Value| {
            interp.call(&project, vec![value])
        }))))
    }))
}

fn filter_operator(_: &Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    let predicate = expect_function(args.into_iter().next(), "filter")?;
    Ok(Value::native("filter", move |interp, args| {
        let source = operator_source(interp, args, "filter")?;
        let interp = interp.clone();
        let predicate = predicate.clone();
        Ok(Value::Observable(source.pipe(try_filter(move |value: &Value| {
            Ok(interp.call(&predicate, vec![value.clone()])?.is_truthy())
        }))))
    }))
}

/// `take(n)`: `n` is rounded up; negative or non-numeric counts mean zero.
fn take_operator(_: &Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    let n = args.first().map_or(f64::NAN, Value::to_number);
    let count = if n.is_nan() || n <= 0.0 {
        0
    } else {
        n.ceil() as usize
    };
    Ok(Value::native("take", move |interp, args| {
        let source = operator_source(interp, args, "take")?;
        Ok(Value::Observable(source.pipe(take(count))))
    }))
}

// ══════════════════════════════════════════════════════════════════════════════
// Error and console
// ══════════════════════════════════════════════════════════════════════════════

/// `new Error(message)`: a plain `{ name, message }` object.
fn construct_error(_: &Interpreter, args: Vec<Value>) -> EvalResult<Value> {
    let message = match args.into_iter().next() {
        None | Some(Value::Undefined) => String::new(),
        Some(value) => value.to_js_string(),
    };
    let mut fields = Fields::new();
    fields.insert("name".to_string(), Value::from("Error"));
    fields.insert("message".to_string(), Value::from(message));
    Ok(Value::object(fields))
}

fn console() -> Value {
    let mut fields = Fields::new();
    for level in [ConsoleLevel::Log, ConsoleLevel::Warn, ConsoleLevel::Error] {
        fields.insert(
            level.as_str().to_string(),
            Value::native(level.as_str(), move |interp, args| {
                interp.log(level, &args);
                Ok(Value::Undefined)
            }),
        );
    }
    Value::object(fields)
}
