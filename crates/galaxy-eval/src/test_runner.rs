//! Mission test harness: runs each test case in a fresh sandbox and scores
//! the emitted trace against the expected one.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use galaxy_types::{TestCase, TestResult};

use crate::config::HarnessConfig;
use crate::sandbox::{evaluate, Outcome};

/// Summary of one harness run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRunSummary {
    /// In declared test-case order.
    pub results: Vec<TestResult>,
    pub passed: usize,
    pub failed: usize,
    /// SHA-256 of the submitted program text, lowercase hex.
    pub fingerprint: String,
}

impl TestRunSummary {
    /// Every case passed and there was at least one.
    pub fn all_passed(&self) -> bool {
        galaxy_types::mission_complete(&self.results)
    }
}

impl fmt::Display for TestRunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in &self.results {
            if r.passed {
                writeln!(f, "  ✓ {}", r.name)?;
            } else {
                match &r.error {
                    Some(error) => writeln!(f, "  ✗ {}: {error}", r.name)?,
                    None => writeln!(f, "  ✗ {}: output did not match", r.name)?,
                }
            }
        }
        writeln!(f, "\n{} passed, {} failed", self.passed, self.failed)
    }
}

/// Run every test case against `program_text`.
pub fn run_tests(program_text: &str, cases: &[TestCase], config: &HarnessConfig) -> TestRunSummary {
    run_tests_with_progress(program_text, cases, config, |_, _, _| {})
}

/// Like [`run_tests`], calling `on_progress(index, total, result)` after
/// each case. Cases run strictly in order and a failing case never stops
/// the ones after it.
#[instrument(skip_all, fields(cases = cases.len()))]
pub fn run_tests_with_progress(
    program_text: &str,
    cases: &[TestCase],
    config: &HarnessConfig,
    mut on_progress: impl FnMut(usize, usize, &TestResult),
) -> TestRunSummary {
    let total = cases.len();
    let mut results = Vec::with_capacity(total);
    for (index, case) in cases.iter().enumerate() {
        let result = run_case(program_text, case, config);
        debug!(
            case = %case.name,
            passed = result.passed,
            steps = result.steps,
            "test case finished"
        );
        on_progress(index, total, &result);
        results.push(result);
    }

    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.len() - passed;
    let fingerprint = fingerprint(program_text);
    info!(passed, failed, %fingerprint, "test run finished");
    TestRunSummary {
        results,
        passed,
        failed,
        fingerprint,
    }
}

/// Evaluate one case. Its own program runs when it has one; a blank
/// program means the submitted code is the test.
fn run_case(program_text: &str, case: &TestCase, config: &HarnessConfig) -> TestResult {
    let program = if case.program.trim().is_empty() {
        program_text
    } else {
        case.program.as_str()
    };

    let started = config.measure_time.then(Instant::now);
    let evaluation = evaluate(program, &config.eval);
    let mut result = match evaluation.outcome {
        Outcome::Ok { values } => TestResult::from_trace(case, values, evaluation.steps),
        Outcome::Err { message } => TestResult::from_error(case, message, evaluation.steps),
    };
    result.execution_time_ms = started.map(|t| t.elapsed().as_secs_f64() * 1000.0);
    result
}

/// Lowercase hex SHA-256 of `program_text`.
pub fn fingerprint(program_text: &str) -> String {
    Sha256::digest(program_text.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
