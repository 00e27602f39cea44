//! Integration tests for the test harness: scoring, ordering, isolation and
//! idempotence of test runs.

use galaxy_eval::{fingerprint, run_tests, run_tests_with_progress, EvalConfig, HarnessConfig};
use galaxy_types::{mission_complete, TestCase};
use serde_json::{json, Value as Json};

// ══════════════════════════════════════════════════════════════════════════════
// Helpers
// ══════════════════════════════════════════════════════════════════════════════

fn values(expected: Json) -> Vec<Json> {
    expected.as_array().cloned().unwrap_or_default()
}

fn case(name: &str, expected: Json, program: &str) -> TestCase {
    TestCase::new(name, values(expected), program)
}

/// A case that runs whatever program is submitted.
fn submission_case(name: &str, expected: Json) -> TestCase {
    TestCase::new(name, values(expected), "")
}

fn config() -> HarnessConfig {
    HarnessConfig::default()
}

const EMIT_ONE_TWO_THREE: &str = "
    const results = [];
    const numbers$ = new Observable(subscriber => {
        subscriber.next(1);
        subscriber.next(2);
        subscriber.next(3);
        subscriber.complete();
    });
    numbers$.subscribe(value => results.push(value));
    return results;
";

fn filter_program(predicate: &str) -> String {
    format!(
        "
        const results = [];
        const numbers$ = of(1, 2, 3, 4, 5);
        const filtered$ = numbers$.pipe(filter({predicate}));
        filtered$.subscribe(value => results.push(value));
        return results;
        "
    )
}

// ══════════════════════════════════════════════════════════════════════════════
// Scenarios
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_observable_emission_passes() {
    let cases = [submission_case("Should emit numbers 1, 2, 3", json!([1, 2, 3]))];
    let summary = run_tests(EMIT_ONE_TWO_THREE, &cases, &config());
    let result = &summary.results[0];
    assert!(result.passed);
    assert_eq!(result.actual_output, vec![json!(1), json!(2), json!(3)]);
    assert!(result.error.is_none());
}

#[test]
fn test_filter_even_passes() {
    let cases = [submission_case("Should filter even numbers", json!([2, 4]))];
    let summary = run_tests(&filter_program("n => n % 2 === 0"), &cases, &config());
    assert!(summary.results[0].passed);
    assert_eq!(summary.results[0].actual_output, vec![json!(2), json!(4)]);
}

#[test]
fn test_wrong_predicate_is_mismatch_not_error() {
    let cases = [submission_case("Should filter even numbers", json!([2, 4]))];
    let summary = run_tests(&filter_program("n => n > 2"), &cases, &config());
    let result = &summary.results[0];
    assert!(!result.passed);
    assert!(result.error.is_none());
    assert_eq!(result.actual_output, vec![json!(3), json!(4), json!(5)]);
    assert_eq!(result.expected_output, vec![json!(2), json!(4)]);
}

#[test]
fn test_take_three_passes() {
    let program = "
        const results = [];
        of(1, 2, 3, 4, 5, 6).pipe(take(3)).subscribe(value => results.push(value));
        return results;
    ";
    let cases = [submission_case("Should take only first 3 values", json!([1, 2, 3]))];
    assert!(run_tests(program, &cases, &config()).results[0].passed);
}

#[test]
fn test_syntax_error_fails_with_message() {
    let cases = [submission_case("Should emit numbers 1, 2, 3", json!([1, 2, 3]))];
    let summary = run_tests("const results = [; return results", &cases, &config());
    let result = &summary.results[0];
    assert!(!result.passed);
    assert!(result.actual_output.is_empty());
    let error = result.error.as_deref().unwrap_or_default();
    assert!(error.starts_with("SyntaxError"), "{error}");
}

// ══════════════════════════════════════════════════════════════════════════════
// Harness behaviour
// ══════════════════════════════════════════════════════════════════════════════

#[test]
fn test_failure_does_not_stop_later_cases() {
    let cases = [
        case("throws", json!([1]), "throw new Error('kaboom')"),
        case("loops", json!([]), "while (true) {}"),
        case("passes", json!([7]), "return [7]"),
    ];
    let harness = HarnessConfig {
        eval: EvalConfig {
            step_limit: 5_000,
            ..EvalConfig::default()
        },
        ..HarnessConfig::default()
    };
    let summary = run_tests("", &cases, &harness);
    let names: Vec<&str> = summary.results.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["throws", "loops", "passes"]);
    assert_eq!(
        summary.results[0].error.as_deref(),
        Some("Uncaught Error: kaboom")
    );
    assert!(summary.results[1]
        .error
        .as_deref()
        .is_some_and(|e| e.starts_with("step limit")));
    assert!(summary.results[2].passed);
    assert_eq!((summary.passed, summary.failed), (1, 2));
    assert!(!mission_complete(&summary.results));
}

#[test]
fn test_runaway_structures_fail_their_case_only() {
    let cases = [
        case(
            "chain",
            json!([2]),
            "let s = of(1); for (let i = 0; i < 5000; i++) { s = s.pipe(map(x => x + 1)); } \
             const r = []; s.subscribe(v => r.push(v)); return r;",
        ),
        case(
            "nesting",
            json!([1]),
            "let a = []; for (let i = 0; i < 1000; i++) { a = [a]; } return [a];",
        ),
        case("passes", json!([7]), "return [7]"),
    ];
    let summary = run_tests("", &cases, &config());
    let errors: Vec<bool> = summary
        .results
        .iter()
        .map(|r| r.error.as_deref().is_some_and(|e| e.starts_with("RangeError")))
        .collect();
    assert_eq!(errors, vec![true, true, false]);
    assert!(summary.results[2].passed);
}

#[test]
fn test_result_invariant_holds() {
    let cases = [
        case("ok", json!([1, 2]), "return [1, 2]"),
        case("mismatch", json!([1, 2]), "return [2, 1]"),
        case("error", json!([1, 2]), "return undefinedName"),
        case("non-array", json!([]), "return 42"),
    ];
    for result in run_tests("", &cases, &config()).results {
        let traces_equal = galaxy_types::trace_eq(&result.actual_output, &result.expected_output);
        assert_eq!(result.passed, result.error.is_none() && traces_equal, "{}", result.name);
        if result.error.is_some() {
            assert!(result.actual_output.is_empty());
        }
    }
}

#[test]
fn test_numbers_compare_by_value() {
    let cases = [case("halves", json!([1, 2.5]), "return [0.5 * 2, 5 / 2]")];
    assert!(run_tests("", &cases, &config()).results[0].passed);
}

#[test]
fn test_cases_are_isolated() {
    let cases = [
        case("defines", json!([1]), "var leaked = 1; return [leaked]"),
        case("reads", json!(["undefined"]), "return [typeof leaked]"),
    ];
    assert!(run_tests("", &cases, &config()).all_passed());
}

#[test]
fn test_runs_are_idempotent() {
    let cases = [
        submission_case("emits", json!([1, 2, 3])),
        case("filters", json!([2, 4]), &filter_program("n => n % 2 === 0")),
        case("broken", json!([1]), "of(1).pipe(map(x => x.y.z)).subscribe(() => {}); return 1"),
    ];
    let first = run_tests(EMIT_ONE_TWO_THREE, &cases, &config());
    for _ in 0..100 {
        assert_eq!(run_tests(EMIT_ONE_TWO_THREE, &cases, &config()), first);
    }
}

#[test]
fn test_summary_fingerprint_identifies_submission() {
    let cases = [submission_case("emits", json!([1, 2, 3]))];
    let a = run_tests(EMIT_ONE_TWO_THREE, &cases, &config());
    let b = run_tests("return [1, 2, 3]", &cases, &config());
    assert_eq!(a.fingerprint, fingerprint(EMIT_ONE_TWO_THREE));
    assert_ne!(a.fingerprint, b.fingerprint);
    assert_eq!(a.results[0].actual_output, b.results[0].actual_output);
    assert!(a.all_passed() && b.all_passed());
}

#[test]
fn test_progress_callback_sees_every_case() {
    let cases: Vec<TestCase> = (0..5)
        .map(|i| case(&format!("case {i}"), json!([i]), &format!("return [{i}]")))
        .collect();
    let mut calls = Vec::new();
    let summary = run_tests_with_progress("", &cases, &config(), |index, total, result| {
        calls.push((index, total, result.passed));
    });
    assert_eq!(calls.len(), 5);
    assert!(calls.iter().enumerate().all(|(i, c)| c.0 == i && c.1 == 5 && c.2));
    assert_eq!(summary.passed, 5);
}

#[test]
fn test_result_json_uses_camel_case() {
    let cases = [case("json", json!([1]), "return [1]")];
    let summary = run_tests("", &cases, &config());
    let json = serde_json::to_value(&summary.results[0]).unwrap();
    assert_eq!(json["actualOutput"], json!([1]));
    assert_eq!(json["expectedOutput"], json!([1]));
    assert!(json.get("executionTime").is_none());
    assert!(json.get("error").is_none());
}
