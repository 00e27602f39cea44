//! The evaluation boundary: program text in, emission trace or error out.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tracing::debug;

use galaxy_types::{GalaxyError, SourceFile};

use crate::config::EvalConfig;
use crate::error::{EvalError, EvalResult};
use crate::interpreter::Interpreter;
use crate::value::Value;

/// File name reported in syntax errors.
const PROGRAM_FILE: &str = "mission.js";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleLevel {
    Log,
    Warn,
    Error,
}

impl ConsoleLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// One captured `console` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleEntry {
    pub level: ConsoleLevel,
    pub message: String,
}

// ══════════════════════════════════════════════════════════════════════════════
// Outcome
// ══════════════════════════════════════════════════════════════════════════════

/// What a program evaluated to.
///
/// Serializes as `{"ok": true, "values": [...]}` or
/// `{"ok": false, "message": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "OutcomeRepr", try_from = "OutcomeRepr")]
pub enum Outcome {
    /// The returned array as JSON; empty when the program returned anything
    /// else.
    Ok { values: Vec<Json> },
    Err { message: String },
}

impl Outcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    pub fn values(&self) -> Option<&[Json]> {
        match self {
            Self::Ok { values } => Some(values),
            Self::Err { .. } => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Ok { .. } => None,
            Self::Err { message } => Some(message),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct OutcomeRepr {
    ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    values: Option<Vec<Json>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl From<Outcome> for OutcomeRepr {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Ok { values } => Self {
                ok: true,
                values: Some(values),
                message: None,
            },
            Outcome::Err { message } => Self {
                ok: false,
                values: None,
                message: Some(message),
            },
        }
    }
}

impl TryFrom<OutcomeRepr> for Outcome {
    type Error = String;

    fn try_from(repr: OutcomeRepr) -> Result<Self, Self::Error> {
        match (repr.ok, repr.values, repr.message) {
            (true, values, _) => Ok(Outcome::Ok {
                values: values.unwrap_or_default(),
            }),
            (false, _, Some(message)) => Ok(Outcome::Err { message }),
            (false, _, None) => Err("failed outcome without a message".to_string()),
        }
    }
}

/// Everything one evaluation produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    #[serde(flatten)]
    pub outcome: Outcome,
    /// Captured console output, in call order.
    pub logs: Vec<ConsoleEntry>,
    /// Interpreter steps consumed.
    pub steps: u64,
}

// ══════════════════════════════════════════════════════════════════════════════
// Entry point
// ══════════════════════════════════════════════════════════════════════════════

/// Evaluate a mission program in a fresh sandbox.
///
/// The program runs as a function body with only the stream primitives (and
/// the capture-only `console`) in scope. Its return value becomes the trace
/// when it is an array. Every failure, including syntax errors, comes back
/// as [`Outcome::Err`]; nothing panics or escapes.
pub fn evaluate(program_text: &str, config: &EvalConfig) -> Evaluation {
    let file = SourceFile::new(PROGRAM_FILE, program_text);
    let program = match galaxy_parser::parse_source(&file).into_program() {
        Ok(program) => program,
        Err(errors) => {
            let message = errors
                .first()
                .map(syntax_message)
                .unwrap_or_else(|| "SyntaxError: program could not be parsed".to_string());
            debug!(total_errors = errors.total_errors, "{message}");
            return Evaluation {
                outcome: Outcome::Err { message },
                logs: Vec::new(),
                steps: 0,
            };
        }
    };

    let interpreter = Interpreter::new(*config);
    let outcome = match interpreter.run(&program).and_then(|value| trace_of(&value)) {
        Ok(values) => Outcome::Ok { values },
        Err(err) => Outcome::Err {
            message: err.to_string(),
        },
    };
    let steps = interpreter.steps();
    debug!(steps, ok = outcome.is_ok(), "evaluation finished");
    Evaluation {
        outcome,
        logs: interpreter.take_logs(),
        steps,
    }
}

fn syntax_message(error: &GalaxyError) -> String {
    EvalError::Syntax {
        line: error.span.start_line,
        column: error.span.start_col,
        message: error.message.clone(),
    }
    .to_string()
}

/// Arrays become the trace; any other return value means "no emissions".
fn trace_of(value: &Value) -> EvalResult<Vec<Json>> {
    match value {
        Value::Array(_) => match value.to_json()? {
            Json::Array(items) => Ok(items),
            _ => Ok(Vec::new()),
        },
        _ => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval(source: &str) -> Evaluation {
        evaluate(source, &EvalConfig::default())
    }

    #[test]
    fn test_array_return_is_trace() {
        assert_eq!(eval("return [1, 'a', null]").outcome.values(), Some(&[json!(1), json!("a"), json!(null)][..]));
    }

    #[test]
    fn test_non_array_return_is_empty_trace() {
        assert_eq!(eval("return 5").outcome.values(), Some(&[][..]));
        assert_eq!(eval("const x = 1").outcome.values(), Some(&[][..]));
    }

    #[test]
    fn test_syntax_error_message() {
        let evaluation = eval("const = 5");
        let message = evaluation.outcome.message().unwrap();
        assert!(message.starts_with("SyntaxError at 1:"), "{message}");
        assert_eq!(evaluation.steps, 0);
    }

    #[test]
    fn test_outcome_json_shape() {
        let ok = serde_json::to_value(Outcome::Ok { values: vec![json!(2)] }).unwrap();
        assert_eq!(ok, json!({"ok": true, "values": [2]}));
        let err = serde_json::to_value(Outcome::Err { message: "boom".into() }).unwrap();
        assert_eq!(err, json!({"ok": false, "message": "boom"}));
        let back: Outcome = serde_json::from_value(err).unwrap();
        assert_eq!(back.message(), Some("boom"));
    }

    #[test]
    fn test_evaluation_json_flattens_outcome() {
        let json = serde_json::to_value(eval("console.log('hi'); return [1]")).unwrap();
        assert_eq!(json["ok"], json!(true));
        assert_eq!(json["values"], json!([1]));
        assert_eq!(json["logs"], json!([{"level": "log", "message": "hi"}]));
    }

    #[test]
    fn test_console_is_captured_not_printed() {
        let evaluation = eval("console.log('n', 1, [2]); console.warn('w'); return []");
        assert_eq!(
            evaluation.logs,
            vec![
                ConsoleEntry {
                    level: ConsoleLevel::Log,
                    message: "n 1 [2]".into()
                },
                ConsoleEntry {
                    level: ConsoleLevel::Warn,
                    message: "w".into()
                },
            ]
        );
    }

    #[test]
    fn test_console_can_be_disabled() {
        let config = EvalConfig {
            capture_console: false,
            ..EvalConfig::default()
        };
        let evaluation = evaluate("console.log('x')", &config);
        assert_eq!(
            evaluation.outcome.message(),
            Some("ReferenceError: console is not defined")
        );
    }

    #[test]
    fn test_cyclic_trace_is_error() {
        let evaluation = eval("const a = []; a.push(a); return a");
        assert!(evaluation.outcome.message().unwrap().contains("circular"));
    }
}
