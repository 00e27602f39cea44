//! RxGalaxy evaluator and mission catalog as a WASM module for the browser.
//!
//! Every export takes and returns strings; structured results are JSON.
//! Nothing here panics on bad input: malformed requests and serialization
//! failures come back as `{"error": "..."}` objects.
//!
//! # Usage (JavaScript)
//!
//! ```js
//! import init, { get_mission, run_mission } from 'galaxy-wasm';
//!
//! await init();
//!
//! const mission = JSON.parse(get_mission("filter-anomaly"));
//! const summary = JSON.parse(run_mission("filter-anomaly", editor.getValue()));
//! // { results: [{ name, passed, actualOutput, expectedOutput, steps }], passed: 1, failed: 0, fingerprint: "..." }
//! ```

use galaxy_eval::{EvalConfig, HarnessConfig};
use galaxy_missions::MissionRegistry;
use galaxy_types::{Mission, TestCase};
use serde::Serialize;
use wasm_bindgen::prelude::*;

/// Shown when a mission id is unknown.
pub const MISSION_NOT_FOUND: &str = "mission data not found";

#[derive(Serialize)]
#[serde(untagged)]
enum MissionLookup<'a> {
    Found { found: bool, mission: &'a Mission },
    Missing { found: bool, message: &'static str },
}

impl<'a> MissionLookup<'a> {
    fn new(mission: Option<&'a Mission>) -> Self {
        match mission {
            Some(mission) => Self::Found {
                found: true,
                mission,
            },
            None => Self::Missing {
                found: false,
                message: MISSION_NOT_FOUND,
            },
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| error_json(&format!("Serialization error: {e}")))
}

fn error_json(message: &str) -> String {
    serde_json::json!({ "error": message }).to_string()
}

/// Evaluate a program once and return its `Evaluation`:
/// ```json
/// { "ok": true, "values": [2, 4], "logs": [], "steps": 118 }
/// ```
#[wasm_bindgen]
pub fn evaluate(program: &str) -> String {
    to_json(&galaxy_eval::evaluate(program, &EvalConfig::default()))
}

/// Run `program` against a JSON array of test cases
/// (`[{ "name", "expectedOutput", "testCode" }]`) and return the
/// `TestRunSummary`.
#[wasm_bindgen]
pub fn run_tests(program: &str, tests_json: &str) -> String {
    match serde_json::from_str::<Vec<TestCase>>(tests_json) {
        Ok(cases) => to_json(&galaxy_eval::run_tests(program, &cases, &HarnessConfig::default())),
        Err(e) => error_json(&format!("Invalid test cases: {e}")),
    }
}

/// Run a built-in mission's tests against `program`.
#[wasm_bindgen]
pub fn run_mission(mission_id: &str, program: &str) -> String {
    let registry = MissionRegistry::builtin();
    match registry.get_mission(mission_id) {
        Some(mission) => to_json(&galaxy_eval::run_tests(
            program,
            &mission.tests,
            &HarnessConfig::default(),
        )),
        None => to_json(&MissionLookup::new(None)),
    }
}

/// `{"found": true, "mission": {...}}`, or
/// `{"found": false, "message": "mission data not found"}`.
#[wasm_bindgen]
pub fn get_mission(mission_id: &str) -> String {
    to_json(&MissionLookup::new(MissionRegistry::builtin().get_mission(mission_id)))
}

/// All galaxy-map planets as a JSON array.
#[wasm_bindgen]
pub fn list_planets() -> String {
    to_json(&MissionRegistry::builtin().planets())
}

/// Return the crate version string.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn parse(text: String) -> Value {
        serde_json::from_str(&text).unwrap()
    }

    #[test]
    fn test_evaluate() {
        let out = parse(evaluate("return [1, 'a']"));
        assert_eq!(out["ok"], json!(true));
        assert_eq!(out["values"], json!([1, "a"]));

        let out = parse(evaluate("return ["));
        assert_eq!(out["ok"], json!(false));
        assert!(out["message"].as_str().unwrap().starts_with("SyntaxError"));
    }

    #[test]
    fn test_get_mission() {
        let out = parse(get_mission("map-station"));
        assert_eq!(out["found"], json!(true));
        assert_eq!(out["mission"]["title"], json!("Map Station"));
        assert_eq!(out["mission"]["tests"][0]["expectedOutput"], json!([2, 4, 6, 8]));
    }

    #[test]
    fn test_missing_mission() {
        let expected = json!({ "found": false, "message": "mission data not found" });
        assert_eq!(parse(get_mission("nonexistent")), expected);
        assert_eq!(parse(run_mission("nonexistent", "return []")), expected);
    }

    #[test]
    fn test_run_mission() {
        let out = parse(run_mission("take-station", ""));
        assert_eq!(out["passed"], json!(1));
        assert_eq!(out["results"][0]["actualOutput"], json!([1, 2, 3]));
        assert!(out["results"][0].get("executionTime").is_none());
    }

    #[test]
    fn test_run_tests() {
        let tests = r#"[{ "name": "doubles", "expectedOutput": [2, 4], "testCode": "" }]"#;
        let program = "const r = []; of(1, 2).pipe(map(x => x * 2)).subscribe(v => r.push(v)); return r;";
        let out = parse(run_tests(program, tests));
        assert_eq!(out["results"][0]["passed"], json!(true));
        assert_eq!(out["fingerprint"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn test_run_tests_rejects_bad_json() {
        let out = parse(run_tests("return []", "{"));
        assert!(out["error"].as_str().unwrap().starts_with("Invalid test cases"));
    }

    #[test]
    fn test_list_planets() {
        let out = parse(list_planets());
        assert_eq!(out.as_array().unwrap().len(), 12);
        assert_eq!(out[0]["type"], json!("tutorial"));
    }

    #[test]
    fn test_version() {
        assert_eq!(version(), "0.1.0");
    }
}
