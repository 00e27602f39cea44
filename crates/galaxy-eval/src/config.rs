//! Evaluator and harness configuration.

use serde::{Deserialize, Serialize};

/// Limits and switches for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvalConfig {
    /// Interpreter steps (statements plus expressions) before the run traps.
    pub step_limit: u64,
    /// Nested mission-function calls before a `RangeError` is thrown.
    pub max_call_depth: usize,
    /// Operator layers a single stream may carry before `map`, `filter`
    /// or `take` throw a `RangeError`.
    pub max_pipe_depth: usize,
    /// Provide a `console` binding whose output is captured per evaluation.
    pub capture_console: bool,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            step_limit: 1_000_000,
            max_call_depth: 64,
            max_pipe_depth: 256,
            capture_console: true,
        }
    }
}

/// Settings for a harness run over several test cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub eval: EvalConfig,
    /// Record wall-clock time per test case. Off by default so repeated
    /// runs produce identical results.
    pub measure_time: bool,
}

impl HarnessConfig {
    /// Load a config from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
