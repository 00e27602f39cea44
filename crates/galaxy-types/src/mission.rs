//! Mission data model: missions, test cases, rewards and test results.
//!
//! Field names serialize in camelCase so catalog documents stay compatible
//! with the JSON the browser UI already speaks (`initialCode`, `testCode`,
//! `expectedOutput`, ...).

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How hard a mission is. Display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// Resources granted when every test of a mission passes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reward {
    pub fuel: u32,
    pub artifacts: f64,
    pub rank: u32,
}

/// A named program plus the emission trace it must produce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    /// Unique within its mission.
    pub name: String,
    pub expected_output: Vec<Value>,
    /// Mission-language program text. Blank means "run the submitted code".
    #[serde(rename = "testCode", default)]
    pub program: String,
}

impl TestCase {
    pub fn new(name: impl Into<String>, expected_output: Vec<Value>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expected_output,
            program: program.into(),
        }
    }
}

/// One learning unit. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    pub id: String,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    /// Starter code shown in the editor.
    pub initial_code: String,
    /// Ordered; results are reported in this order.
    pub tests: Vec<TestCase>,
    /// Marble diagram data. Never evaluated.
    #[serde(default)]
    pub input_marbles: Vec<Value>,
    #[serde(default)]
    pub output_marbles: Vec<Value>,
    pub reward: Reward,
}

/// Outcome of running a single [`TestCase`].
///
/// `passed` holds exactly when there is no error and the traces are equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    /// Empty when the program failed.
    pub actual_output: Vec<Value>,
    pub expected_output: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Wall-clock time, only when the harness was asked to measure it.
    #[serde(default, rename = "executionTime", skip_serializing_if = "Option::is_none")]
    pub execution_time_ms: Option<f64>,
    /// Interpreter steps consumed. Deterministic for a given program.
    #[serde(default)]
    pub steps: u64,
}

impl TestResult {
    /// A result for a program that evaluated to `actual`.
    pub fn from_trace(case: &TestCase, actual: Vec<Value>, steps: u64) -> Self {
        Self {
            name: case.name.clone(),
            passed: trace_eq(&actual, &case.expected_output),
            actual_output: actual,
            expected_output: case.expected_output.clone(),
            error: None,
            execution_time_ms: None,
            steps,
        }
    }

    /// A result for a program that failed with `message`.
    pub fn from_error(case: &TestCase, message: impl Into<String>, steps: u64) -> Self {
        Self {
            name: case.name.clone(),
            passed: false,
            actual_output: Vec::new(),
            expected_output: case.expected_output.clone(),
            error: Some(message.into()),
            execution_time_ms: None,
            steps,
        }
    }
}

/// Structural, order-sensitive equality of two emission traces.
///
/// Numbers compare by value, so `1` equals `1.0`.
pub fn trace_eq(actual: &[Value], expected: &[Value]) -> bool {
    actual.len() == expected.len() && actual.iter().zip(expected).all(|(a, b)| value_eq(a, b))
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(xs), Value::Array(ys)) => trace_eq(xs, ys),
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).is_some_and(|y| value_eq(x, y)))
        }
        _ => a == b,
    }
}

/// A mission is complete when it has results and every one passed.
pub fn mission_complete(results: &[TestResult]) -> bool {
    !results.is_empty() && results.iter().all(|r| r.passed)
}
