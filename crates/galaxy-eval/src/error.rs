//! Runtime error types for the mission evaluator.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::value::Value;

/// Evaluation error: a thrown value, a runtime fault, or a budget trap.
///
/// Catchable errors can be routed into a stream's `error` channel; budget
/// and syntax errors always end the evaluation.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    /// `throw value`, or an error delivered through a stream.
    #[error("Uncaught {}", .0.describe_thrown())]
    Thrown(Value),
    #[error("TypeError: {0}")]
    Type(String),
    #[error("ReferenceError: {0} is not defined")]
    Reference(String),
    #[error("TypeError: Assignment to constant variable '{0}'.")]
    ConstAssign(String),
    #[error("SyntaxError: Identifier '{0}' has already been declared")]
    Redeclared(String),
    #[error("RangeError: Maximum call stack size exceeded")]
    CallDepth,
    #[error("RangeError: {0}")]
    Range(String),
    #[error("SyntaxError at {line}:{column}: {message}")]
    Syntax {
        line: u32,
        column: u32,
        message: String,
    },
    #[error("step limit of {0} exceeded (possible infinite loop)")]
    StepLimit(u64),
}

impl EvalError {
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::Type(message.into())
    }

    pub fn range_error(message: impl Into<String>) -> Self {
        Self::Range(message.into())
    }

    /// Whether mission code may observe this error (for example in an
    /// `error` callback). Budget traps and syntax errors may not.
    pub fn is_catchable(&self) -> bool {
        !matches!(self, Self::StepLimit(_) | Self::Syntax { .. })
    }

    /// The value mission code sees for this error.
    pub fn to_value(&self) -> Value {
        let (name, message) = match self {
            Self::Thrown(value) => return value.clone(),
            Self::Type(message) => ("TypeError", message.clone()),
            Self::Reference(name) => ("ReferenceError", format!("{name} is not defined")),
            Self::ConstAssign(name) => (
                "TypeError",
                format!("Assignment to constant variable '{name}'."),
            ),
            Self::Redeclared(name) => (
                "SyntaxError",
                format!("Identifier '{name}' has already been declared"),
            ),
            Self::CallDepth => ("RangeError", "Maximum call stack size exceeded".to_string()),
            Self::Range(message) => ("RangeError", message.clone()),
            Self::Syntax { message, .. } => ("SyntaxError", message.clone()),
            Self::StepLimit(limit) => ("RangeError", format!("step limit of {limit} exceeded")),
        };
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), Value::from(name));
        fields.insert("message".to_string(), Value::from(message));
        Value::object(fields)
    }

    /// Inverse of [`EvalError::to_value`] for errors that travelled through
    /// mission code: a thrown value stays thrown.
    pub fn from_value(value: Value) -> Self {
        Self::Thrown(value)
    }
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;
