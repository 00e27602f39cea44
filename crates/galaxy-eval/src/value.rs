//! Runtime values of the mission language.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;

use galaxy_rx::{Observable, Subscriber, Subscription};
use galaxy_types::ast::FunctionExpr;

use crate::env::Environment;
use crate::error::{EvalError, EvalResult};
use crate::interpreter::Interpreter;

/// Stream of mission values.
pub type Stream = Observable<Value, EvalError>;
/// Subscriber handed to mission producers.
pub type Sink = Subscriber<Value, EvalError>;

/// Host function callable from mission code.
pub type NativeFn = Rc<dyn Fn(&Interpreter, Vec<Value>) -> EvalResult<Value>>;

/// Objects keep their keys sorted so output never depends on insertion
/// history.
pub type Fields = BTreeMap<String, Value>;

/// A mission-language value.
///
/// Arrays and objects are shared and mutable, so closures that capture them
/// observe each other's writes.
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Array(Rc<RefCell<Elements>>),
    Object(Rc<RefCell<Record>>),
    Function(Rc<Function>),
    Observable(Stream),
    Subscriber(Sink),
    Subscription(Subscription),
}

// ── Container storage ─────────────────────────────────────────────────────────

/// The elements behind an array value.
///
/// Dropping the last handle to a nested array releases the children it
/// uniquely owns through a worklist, so nesting depth never reaches the
/// native stack.
#[derive(Debug, Clone, Default)]
pub struct Elements(Vec<Value>);

/// The properties behind an object value. Released like [`Elements`].
#[derive(Debug, Clone, Default)]
pub struct Record(Fields);

impl Deref for Elements {
    type Target = Vec<Value>;

    fn deref(&self) -> &Vec<Value> {
        &self.0
    }
}

impl DerefMut for Elements {
    fn deref_mut(&mut self) -> &mut Vec<Value> {
        &mut self.0
    }
}

impl Deref for Record {
    type Target = Fields;

    fn deref(&self) -> &Fields {
        &self.0
    }
}

impl DerefMut for Record {
    fn deref_mut(&mut self) -> &mut Fields {
        &mut self.0
    }
}

impl Drop for Elements {
    fn drop(&mut self) {
        release(std::mem::take(&mut self.0));
    }
}

impl Drop for Record {
    fn drop(&mut self) {
        release(std::mem::take(&mut self.0).into_values().collect());
    }
}

fn release(mut pending: Vec<Value>) {
    while let Some(value) = pending.pop() {
        match value {
            Value::Array(items) => {
                if let Ok(cell) = Rc::try_unwrap(items) {
                    let mut elements = cell.into_inner();
                    pending.append(&mut elements.0);
                }
            }
            Value::Object(fields) => {
                if let Ok(cell) = Rc::try_unwrap(fields) {
                    let mut record = cell.into_inner();
                    pending.extend(std::mem::take(&mut record.0).into_values());
                }
            }
            _ => {}
        }
    }
}

pub enum Function {
    Closure {
        decl: Rc<FunctionExpr>,
        env: Environment,
    },
    Native {
        name: String,
        func: NativeFn,
        /// Only constructors may be called with `new`, and only with `new`.
        constructor: bool,
    },
}

impl Function {
    pub fn name(&self) -> &str {
        match self {
            Self::Closure { decl, .. } => decl
                .name
                .as_ref()
                .map(|n| n.name.as_str())
                .unwrap_or("anonymous"),
            Self::Native { name, .. } => name,
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Function: {}]", self.name())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Construction
// ══════════════════════════════════════════════════════════════════════════════

impl Value {
    pub fn array(items: Vec<Value>) -> Self {
        Self::Array(Rc::new(RefCell::new(Elements(items))))
    }

    pub fn object(fields: Fields) -> Self {
        Self::Object(Rc::new(RefCell::new(Record(fields))))
    }

    pub fn native(name: &str, func: impl Fn(&Interpreter, Vec<Value>) -> EvalResult<Value> + 'static) -> Self {
        Self::Function(Rc::new(Function::Native {
            name: name.to_string(),
            func: Rc::new(func),
            constructor: false,
        }))
    }

    pub fn constructor(
        name: &str,
        func: impl Fn(&Interpreter, Vec<Value>) -> EvalResult<Value> + 'static,
    ) -> Self {
        Self::Function(Rc::new(Function::Native {
            name: name.to_string(),
            func: Rc::new(func),
            constructor: true,
        }))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Str(Rc::from(s))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Conversions
// ══════════════════════════════════════════════════════════════════════════════

/// Nesting beyond which string conversion and inspection stop descending.
const MAX_RENDER_DEPTH: usize = 16;

impl Value {
    /// The result of `typeof`.
    pub fn type_of(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Str(_) => "string",
            Self::Function(_) => "function",
            Self::Null
            | Self::Array(_)
            | Self::Object(_)
            | Self::Observable(_)
            | Self::Subscriber(_)
            | Self::Subscription(_) => "object",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Self::Undefined => f64::NAN,
            Self::Null => 0.0,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Number(n) => *n,
            Self::Str(s) => string_to_number(s),
            Self::Array(_) => string_to_number(&self.to_js_string()),
            _ => f64::NAN,
        }
    }

    /// String conversion as used by `+`, templates and `join`.
    pub fn to_js_string(&self) -> String {
        self.to_js_string_at(0)
    }

    fn to_js_string_at(&self, depth: usize) -> String {
        match self {
            Self::Undefined => "undefined".to_string(),
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => number_to_string(*n),
            Self::Str(s) => s.to_string(),
            Self::Array(items) => {
                if depth >= MAX_RENDER_DEPTH {
                    return String::new();
                }
                items
                    .borrow()
                    .iter()
                    .map(|item| match item {
                        Self::Undefined | Self::Null => String::new(),
                        other => other.to_js_string_at(depth + 1),
                    })
                    .collect::<Vec<_>>()
                    .join(",")
            }
            Self::Function(f) => format!("function {}() {{ [code] }}", f.name()),
            Self::Object(_) | Self::Observable(_) | Self::Subscriber(_) | Self::Subscription(_) => {
                "[object Object]".to_string()
            }
        }
    }

    /// Console rendering: strings print raw at the top level and quoted
    /// inside collections.
    pub fn inspect(&self) -> String {
        match self {
            Self::Str(s) => s.to_string(),
            other => other.inspect_at(0),
        }
    }

    fn inspect_at(&self, depth: usize) -> String {
        match self {
            Self::Str(s) => format!("'{s}'"),
            Self::Array(items) => {
                if depth >= MAX_RENDER_DEPTH {
                    return "[Array]".to_string();
                }
                let parts: Vec<String> = items
                    .borrow()
                    .iter()
                    .map(|item| item.inspect_at(depth + 1))
                    .collect();
                format!("[{}]", parts.join(", "))
            }
            Self::Object(fields) => {
                if depth >= MAX_RENDER_DEPTH {
                    return "[Object]".to_string();
                }
                let fields = fields.borrow();
                if fields.is_empty() {
                    return "{}".to_string();
                }
                let parts: Vec<String> = fields
                    .iter()
                    .map(|(k, v)| format!("{k}: {}", v.inspect_at(depth + 1)))
                    .collect();
                format!("{{ {} }}", parts.join(", "))
            }
            Self::Function(f) => format!("[Function: {}]", f.name()),
            Self::Observable(_) => "Observable {}".to_string(),
            Self::Subscriber(s) => format!("Subscriber {{ closed: {} }}", s.is_closed()),
            Self::Subscription(s) => format!("Subscription {{ closed: {} }}", s.is_closed()),
            other => other.to_js_string(),
        }
    }

    /// How an uncaught thrown value is reported: error-like objects as
    /// `Name: message`, strings raw, anything else inspected.
    pub fn describe_thrown(&self) -> String {
        match self {
            Self::Str(s) => s.to_string(),
            Self::Object(fields) => {
                let fields = fields.borrow();
                match (fields.get("name"), fields.get("message")) {
                    (Some(Self::Str(name)), Some(message)) => {
                        format!("{name}: {}", message.to_js_string())
                    }
                    (None, Some(message)) => message.to_js_string(),
                    _ => self.inspect(),
                }
            }
            other => other.inspect(),
        }
    }

    // ── Equality ──────────────────────────────────────────────────────────────

    /// `===`
    pub fn strict_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            (Self::Observable(a), Self::Observable(b)) => a.ptr_eq(b),
            (Self::Subscriber(a), Self::Subscriber(b)) => a.ptr_eq(b),
            (Self::Subscription(a), Self::Subscription(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// `==`
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() || b.is_nullish() => a.is_nullish() && b.is_nullish(),
            (Self::Number(_), Self::Str(_)) | (Self::Str(_), Self::Number(_)) => {
                self.to_number() == other.to_number()
            }
            (Self::Bool(_), _) => Value::Number(self.to_number()).loose_eq(other),
            (_, Self::Bool(_)) => self.loose_eq(&Value::Number(other.to_number())),
            (Self::Array(_) | Self::Object(_), Self::Number(_) | Self::Str(_)) => {
                Value::from(self.to_js_string()).loose_eq(other)
            }
            (Self::Number(_) | Self::Str(_), Self::Array(_) | Self::Object(_)) => {
                self.loose_eq(&Value::from(other.to_js_string()))
            }
            _ => self.strict_eq(other),
        }
    }

    /// Equality used by `includes`: like `===`, but `NaN` equals itself.
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) if a.is_nan() && b.is_nan() => true,
            _ => self.strict_eq(other),
        }
    }

    // ── JSON ──────────────────────────────────────────────────────────────────

    /// Convert to JSON the way `JSON.stringify` treats values: integral
    /// numbers become integers, non-finite numbers and non-data values
    /// become `null` (or are skipped as object properties), and cycles are a
    /// `TypeError`. Nesting deeper than [`MAX_JSON_DEPTH`] is a `RangeError`.
    pub fn to_json(&self) -> EvalResult<serde_json::Value> {
        self.to_json_inner(&mut Vec::new())
    }

    fn to_json_inner(&self, stack: &mut Vec<*const ()>) -> EvalResult<serde_json::Value> {
        use serde_json::Value as Json;
        Ok(match self {
            Self::Null | Self::Undefined => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Number(n) => number_to_json(*n),
            Self::Str(s) => Json::String(s.to_string()),
            Self::Array(items) => {
                let ptr = Rc::as_ptr(items) as *const ();
                enter_json(stack, ptr)?;
                let mut out = Vec::new();
                for item in items.borrow().iter() {
                    out.push(item.to_json_inner(stack)?);
                }
                stack.pop();
                Json::Array(out)
            }
            Self::Object(fields) => {
                let ptr = Rc::as_ptr(fields) as *const ();
                enter_json(stack, ptr)?;
                let mut out = serde_json::Map::new();
                for (key, value) in fields.borrow().iter() {
                    if value.is_json_data() {
                        out.insert(key.clone(), value.to_json_inner(stack)?);
                    }
                }
                stack.pop();
                Json::Object(out)
            }
            Self::Function(_) | Self::Observable(_) | Self::Subscriber(_) | Self::Subscription(_) => {
                Json::Null
            }
        })
    }

    fn is_json_data(&self) -> bool {
        !matches!(
            self,
            Self::Undefined
                | Self::Function(_)
                | Self::Observable(_)
                | Self::Subscriber(_)
                | Self::Subscription(_)
        )
    }
}

/// Deepest container nesting a trace may carry. Matches the recursion limit
/// of `serde_json`'s parser, so every trace reads back.
pub const MAX_JSON_DEPTH: usize = 128;

fn enter_json(stack: &mut Vec<*const ()>, ptr: *const ()) -> EvalResult<()> {
    if stack.contains(&ptr) {
        return Err(EvalError::type_error("Converting circular structure to JSON"));
    }
    if stack.len() >= MAX_JSON_DEPTH {
        return Err(EvalError::range_error(format!(
            "cannot convert values nested deeper than {MAX_JSON_DEPTH} levels to JSON"
        )));
    }
    stack.push(ptr);
    Ok(())
}

/// Largest integer a double represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn number_to_json(n: f64) -> serde_json::Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null)
    }
}

/// `String(n)`: shortest round-trip digits, with exponent notation outside
/// `1e-6 <= |n| < 1e21`.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if (1e-6..1e21).contains(&n.abs()) {
        format!("{n}")
    } else {
        let formatted = format!("{n:e}");
        match formatted.split_once('e') {
            Some((mantissa, exponent)) if !exponent.starts_with('-') => {
                format!("{mantissa}e+{exponent}")
            }
            _ => formatted,
        }
    }
}

fn string_to_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map_or(f64::NAN, |v| v as f64);
    }
    match s {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    let lower = s.to_ascii_lowercase();
    if lower.contains("inf") || lower.contains("nan") {
        return f64::NAN;
    }
    s.parse().unwrap_or(f64::NAN)
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "{s:?}"),
            other => f.write_str(&other.inspect()),
        }
    }
}
