//! Property access on runtime values and the built-in methods it exposes.
//!
//! Methods are returned as native functions bound to their receiver, so
//! `const push = results.push; push(1)` works like a method call.

use std::cell::RefCell;
use std::rc::Rc;

use galaxy_rx::Observer;

use crate::error::{EvalError, EvalResult};
use crate::interpreter::Interpreter;
use crate::value::{Elements, Sink, Stream, Value};

type Items = Rc<RefCell<Elements>>;

/// Largest index an assignment may grow an array to in one step.
const MAX_ARRAY_GROWTH: usize = 1 << 20;

/// `object[key]` / `object.key`.
pub(crate) fn get_property(object: &Value, key: &Value) -> EvalResult<Value> {
    let name = key.to_js_string();
    Ok(match object {
        Value::Undefined | Value::Null => {
            return Err(EvalError::type_error(format!(
                "Cannot read properties of {} (reading '{name}')",
                object.to_js_string()
            )))
        }
        Value::Array(items) => match array_index(key) {
            Some(index) => items.borrow().get(index).cloned().unwrap_or(Value::Undefined),
            None if name == "length" => Value::Number(items.borrow().len() as f64),
            None => array_method(items, &name).unwrap_or(Value::Undefined),
        },
        Value::Str(s) => match array_index(key) {
            Some(index) => s
                .chars()
                .nth(index)
                .map_or(Value::Undefined, |c| Value::from(c.to_string())),
            None if name == "length" => Value::Number(s.chars().count() as f64),
            None => string_method(s, &name).unwrap_or(Value::Undefined),
        },
        Value::Object(fields) => fields.borrow().get(&name).cloned().unwrap_or(Value::Undefined),
        Value::Function(f) if name == "name" => Value::from(f.name()),
        Value::Observable(stream) => observable_method(stream, &name).unwrap_or(Value::Undefined),
        Value::Subscriber(sink) if name == "closed" => Value::Bool(sink.is_closed()),
        Value::Subscriber(sink) => subscriber_method(sink, &name).unwrap_or(Value::Undefined),
        Value::Subscription(sub) if name == "closed" => Value::Bool(sub.is_closed()),
        Value::Subscription(sub) if name == "unsubscribe" => {
            let sub = sub.clone();
            Value::native("unsubscribe", move |_, _| {
                sub.unsubscribe();
                Ok(Value::Undefined)
            })
        }
        _ => Value::Undefined,
    })
}

/// `object[key] = value`.
pub(crate) fn set_property(object: &Value, key: &Value, value: Value) -> EvalResult<()> {
    match object {
        Value::Undefined | Value::Null => Err(EvalError::type_error(format!(
            "Cannot set properties of {} (setting '{}')",
            object.to_js_string(),
            key.to_js_string()
        ))),
        Value::Array(items) => {
            let mut items = items.borrow_mut();
            let len = items.len();
            let new_len = match array_index(key) {
                Some(index) => index + 1,
                None if key.to_js_string() == "length" => {
                    let n = value.to_number();
                    if n < 0.0 || n.fract() != 0.0 || n.is_nan() {
                        return Err(EvalError::type_error("Invalid array length"));
                    }
                    n as usize
                }
                // Named properties on arrays are not kept.
                None => return Ok(()),
            };
            if new_len > len.saturating_add(MAX_ARRAY_GROWTH) {
                return Err(EvalError::type_error("Invalid array length"));
            }
            match array_index(key) {
                Some(index) => {
                    if index >= len {
                        items.resize(index + 1, Value::Undefined);
                    }
                    items[index] = value;
                }
                None => items.resize(new_len, Value::Undefined),
            }
            Ok(())
        }
        Value::Object(fields) => {
            fields.borrow_mut().insert(key.to_js_string(), value);
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Canonical non-negative integer keys address array elements.
fn array_index(key: &Value) -> Option<usize> {
    match key {
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 && n.is_finite() => Some(*n as usize),
        Value::Str(s) => s
            .parse::<usize>()
            .ok()
            .filter(|i| i.to_string() == &**s),
        _ => None,
    }
}

fn callback(value: Option<&Value>) -> EvalResult<Value> {
    match value {
        Some(f @ Value::Function(_)) => Ok(f.clone()),
        other => Err(EvalError::type_error(format!(
            "{} is not a function",
            other.map_or_else(|| "undefined".to_string(), Value::inspect)
        ))),
    }
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

// ══════════════════════════════════════════════════════════════════════════════
// Arrays
// ══════════════════════════════════════════════════════════════════════════════

type ArrayMethod = fn(&Interpreter, &Items, Vec<Value>) -> EvalResult<Value>;

fn array_method(items: &Items, name: &str) -> Option<Value> {
    let method: ArrayMethod = match name {
        "push" => array_push,
        "pop" => |_, items, _| Ok(items.borrow_mut().pop().unwrap_or(Value::Undefined)),
        "join" => array_join,
        "includes" => |_, items, args| {
            let needle = arg(&args, 0);
            Ok(Value::Bool(items.borrow().iter().any(|v| v.same_value_zero(&needle))))
        },
        "indexOf" => |_, items, args| {
            let needle = arg(&args, 0);
            let position = items.borrow().iter().position(|v| v.strict_eq(&needle));
            Ok(Value::Number(position.map_or(-1.0, |i| i as f64)))
        },
        "slice" => array_slice,
        "forEach" => array_for_each,
        "map" => array_map,
        "filter" => array_filter,
        "reduce" => array_reduce,
        _ => return None,
    };
    let items = Rc::clone(items);
    Some(Value::native(name, move |interp, args| method(interp, &items, args)))
}

fn array_push(_: &Interpreter, items: &Items, args: Vec<Value>) -> EvalResult<Value> {
    let mut items = items.borrow_mut();
    items.extend(args);
    Ok(Value::Number(items.len() as f64))
}

fn array_join(_: &Interpreter, items: &Items, args: Vec<Value>) -> EvalResult<Value> {
    let separator = match args.first() {
        None | Some(Value::Undefined) => ",".to_string(),
        Some(sep) => sep.to_js_string(),
    };
    let parts: Vec<String> = items
        .borrow()
        .iter()
        .map(|item| match item {
            Value::Undefined | Value::Null => String::new(),
            other => other.to_js_string(),
        })
        .collect();
    Ok(Value::from(parts.join(&separator)))
}

/// Resolve a possibly negative `slice` bound against `len`.
fn relative_index(bound: Option<&Value>, len: usize, default: usize) -> usize {
    let n = match bound {
        None | Some(Value::Undefined) => return default,
        Some(value) => value.to_number(),
    };
    let n = if n.is_nan() { 0.0 } else { n.trunc() };
    if n < 0.0 {
        (len as f64 + n).max(0.0) as usize
    } else {
        n.min(len as f64) as usize
    }
}

fn array_slice(_: &Interpreter, items: &Items, args: Vec<Value>) -> EvalResult<Value> {
    let items = items.borrow();
    let len = items.len();
    let start = relative_index(args.first(), len, 0);
    let end = relative_index(args.get(1), len, len);
    let slice = if start < end {
        items[start..end].to_vec()
    } else {
        Vec::new()
    };
    Ok(Value::array(slice))
}

// ── Callback methods ──────────────────────────────────────────────────────────
//
// Elements are read one at a time with no borrow held across the callback,
// so callbacks may mutate the array being iterated. The visited range is
// fixed by the length at the start of the call.

fn item_at(items: &Items, index: usize) -> Option<Value> {
    items.borrow().get(index).cloned()
}

/// Call `f(item, index, array)` for each element; collect the results.
fn each(interp: &Interpreter, items: &Items, args: &[Value]) -> EvalResult<Vec<(Value, Value)>> {
    let f = callback(args.first())?;
    let len = items.borrow().len();
    let mut out = Vec::with_capacity(len);
    for index in 0..len {
        let Some(item) = item_at(items, index) else {
            break;
        };
        let result = interp.call(
            &f,
            vec![
                item.clone(),
                Value::Number(index as f64),
                Value::Array(Rc::clone(items)),
            ],
        )?;
        out.push((item, result));
    }
    Ok(out)
}

fn array_for_each(interp: &Interpreter, items: &Items, args: Vec<Value>) -> EvalResult<Value> {
    each(interp, items, &args)?;
    Ok(Value::Undefined)
}

fn array_map(interp: &Interpreter, items: &Items, args: Vec<Value>) -> EvalResult<Value> {
    let mapped = each(interp, items, &args)?
        .into_iter()
        .map(|(_, result)| result)
        .collect();
    Ok(Value::array(mapped))
}

fn array_filter(interp: &Interpreter, items: &Items, args: Vec<Value>) -> EvalResult<Value> {
    let kept = each(interp, items, &args)?
        .into_iter()
        .filter(|(_, keep)| keep.is_truthy())
        .map(|(item, _)| item)
        .collect();
    Ok(Value::array(kept))
}

fn array_reduce(interp: &Interpreter, items: &Items, args: Vec<Value>) -> EvalResult<Value> {
    let f = callback(args.first())?;
    let len = items.borrow().len();
    let (mut acc, mut index) = match args.get(1) {
        Some(initial) => (initial.clone(), 0),
        None => match item_at(items, 0) {
            Some(first) => (first, 1),
            None => {
                return Err(EvalError::type_error(
                    "Reduce of empty array with no initial value",
                ))
            }
        },
    };
    while index < len {
        let Some(item) = item_at(items, index) else {
            break;
        };
        acc = interp.call(
            &f,
            vec![
                acc,
                item,
                Value::Number(index as f64),
                Value::Array(Rc::clone(items)),
            ],
        )?;
        index += 1;
    }
    Ok(acc)
}

// ══════════════════════════════════════════════════════════════════════════════
// Strings
// ══════════════════════════════════════════════════════════════════════════════

fn string_method(s: &Rc<str>, name: &str) -> Option<Value> {
    let method: fn(&str, &[Value]) -> Value = match name {
        "toUpperCase" => |s, _| Value::from(s.to_uppercase()),
        "toLowerCase" => |s, _| Value::from(s.to_lowercase()),
        "trim" => |s, _| Value::from(s.trim()),
        "includes" => |s, args| Value::Bool(s.contains(arg(args, 0).to_js_string().as_str())),
        _ => return None,
    };
    let s = Rc::clone(s);
    Some(Value::native(name, move |_, args| Ok(method(&s, &args))))
}

// ══════════════════════════════════════════════════════════════════════════════
// Streams
// ══════════════════════════════════════════════════════════════════════════════

fn observable_method(stream: &Stream, name: &str) -> Option<Value> {
    let stream = stream.clone();
    match name {
        "subscribe" => Some(Value::native("subscribe", move |interp, args| {
            let observer = JsObserver::new(interp, args.into_iter().next());
            // Errors that escape the stream (a throwing `error` callback)
            // become uncaught errors of the program.
            let subscription = stream.subscribe(observer)?;
            interp.check_budget()?;
            Ok(Value::Subscription(subscription))
        })),
        "pipe" => Some(Value::native("pipe", move |interp, args| {
            args.iter()
                .try_fold(Value::Observable(stream.clone()), |current, op| {
                    interp.call(op, vec![current])
                })
        })),
        _ => None,
    }
}

fn subscriber_method(sink: &Sink, name: &str) -> Option<Value> {
    let sink = sink.clone();
    let method = match name {
        "next" => Value::native("next", move |_, args| {
            sink.next(arg(&args, 0))?;
            Ok(Value::Undefined)
        }),
        "error" => Value::native("error", move |_, args| {
            sink.error(EvalError::from_value(arg(&args, 0)))?;
            Ok(Value::Undefined)
        }),
        "complete" => Value::native("complete", move |_, _| {
            sink.complete()?;
            Ok(Value::Undefined)
        }),
        _ => return None,
    };
    Some(method)
}

/// The observer a mission passes to `subscribe`.
enum JsObserver {
    /// A bare function (next only) or an object with `next`, `error` and
    /// `complete` members, any of which may be missing.
    Callbacks {
        interp: Interpreter,
        next: Option<Value>,
        error: Option<Value>,
        complete: Option<Value>,
    },
    /// Another subscriber, as in `source.subscribe(subscriber)`.
    Forward(Sink),
}

impl JsObserver {
    fn new(interp: &Interpreter, observer: Option<Value>) -> Self {
        let (next, error, complete) = match observer {
            Some(Value::Subscriber(sink)) => return Self::Forward(sink),
            Some(f @ Value::Function(_)) => (Some(f), None, None),
            Some(Value::Object(fields)) => {
                let fields = fields.borrow();
                let member = |name: &str| {
                    fields
                        .get(name)
                        .filter(|v| matches!(v, Value::Function(_)))
                        .cloned()
                };
                (member("next"), member("error"), member("complete"))
            }
            _ => (None, None, None),
        };
        Self::Callbacks {
            interp: interp.clone(),
            next,
            error,
            complete,
        }
    }
}

impl Observer<Value, EvalError> for JsObserver {
    fn next(&self, value: Value) -> EvalResult<()> {
        match self {
            Self::Forward(sink) => sink.next(value),
            Self::Callbacks { interp, next, .. } => {
                if let Some(f) = next {
                    interp.call(f, vec![value])?;
                }
                Ok(())
            }
        }
    }

    fn error(&self, err: EvalError) -> EvalResult<()> {
        match self {
            Self::Forward(sink) => sink.error(err),
            // Budget traps are not the mission's to handle.
            Self::Callbacks { .. } if !err.is_catchable() => Err(err),
            Self::Callbacks { interp, error, .. } => {
                if let Some(f) = error {
                    interp.call(f, vec![err.to_value()])?;
                }
                Ok(())
            }
        }
    }

    fn complete(&self) -> EvalResult<()> {
        match self {
            Self::Forward(sink) => sink.complete(),
            Self::Callbacks {
                interp,
                error,
                complete,
                ..
            } => {
                let Some(f) = complete else {
                    return Ok(());
                };
                match interp.call(f, Vec::new()) {
                    Ok(_) => Ok(()),
                    // A throwing `complete` is reported to this observer's
                    // own `error` callback.
                    Err(err) if err.is_catchable() => match error {
                        Some(handler) => interp.call(handler, vec![err.to_value()]).map(drop),
                        None => Ok(()),
                    },
                    Err(err) => Err(err),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use galaxy_rx::Subscription;

    fn array(values: &[f64]) -> Value {
        Value::array(values.iter().copied().map(Value::Number).collect())
    }

    #[test]
    fn test_array_index_keys() {
        assert_eq!(array_index(&Value::Number(2.0)), Some(2));
        assert_eq!(array_index(&Value::from("3")), Some(3));
        assert_eq!(array_index(&Value::from("03")), None);
        assert_eq!(array_index(&Value::Number(1.5)), None);
        assert_eq!(array_index(&Value::Number(-1.0)), None);
    }

    #[test]
    fn test_array_length_and_index() {
        let a = array(&[1.0, 2.0]);
        assert!(matches!(get_property(&a, &Value::from("length")), Ok(Value::Number(n)) if n == 2.0));
        assert!(matches!(get_property(&a, &Value::Number(1.0)), Ok(Value::Number(n)) if n == 2.0));
        assert!(matches!(get_property(&a, &Value::Number(5.0)), Ok(Value::Undefined)));
    }

    #[test]
    fn test_set_index_grows_array() {
        let a = array(&[]);
        set_property(&a, &Value::Number(2.0), Value::Bool(true)).unwrap();
        assert_eq!(a.inspect(), "[undefined, undefined, true]");
        set_property(&a, &Value::from("length"), Value::Number(1.0)).unwrap();
        assert_eq!(a.inspect(), "[undefined]");
    }

    #[test]
    fn test_huge_index_rejected() {
        let a = array(&[]);
        assert!(set_property(&a, &Value::Number(1e12), Value::Null).is_err());
    }

    #[test]
    fn test_read_from_undefined() {
        let err = get_property(&Value::Undefined, &Value::from("pipe")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "TypeError: Cannot read properties of undefined (reading 'pipe')"
        );
    }

    #[test]
    fn test_relative_index() {
        assert_eq!(relative_index(Some(&Value::Number(-2.0)), 5, 0), 3);
        assert_eq!(relative_index(Some(&Value::Number(9.0)), 5, 0), 5);
        assert_eq!(relative_index(None, 5, 5), 5);
        assert_eq!(relative_index(Some(&Value::Number(-9.0)), 5, 0), 0);
    }

    #[test]
    fn test_string_members() {
        let s = Value::from("Hi");
        assert!(matches!(get_property(&s, &Value::from("length")), Ok(Value::Number(n)) if n == 2.0));
        assert_eq!(get_property(&s, &Value::Number(0.0)).unwrap().inspect(), "H");
        assert!(matches!(get_property(&s, &Value::from("nope")), Ok(Value::Undefined)));
    }

    #[test]
    fn test_subscription_closed_member() {
        let sub = Value::Subscription(Subscription::closed());
        assert!(matches!(get_property(&sub, &Value::from("closed")), Ok(Value::Bool(true))));
    }
}
