//! The static mission and planet catalog, and its JSON document form.
//!
//! The built-in catalog is the one the game ships with and the one every
//! lookup falls back to when a remote store is unreachable.

use galaxy_types::{Difficulty, Mission, Reward, TestCase};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::planet::{Planet, PlanetKind, Position};

/// A full catalog document: `{ "missions": [...], "planets": [...] }`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub missions: Vec<Mission>,
    #[serde(default)]
    pub planets: Vec<Planet>,
}

impl Catalog {
    /// The catalog the game ships with: four missions, twelve planets.
    pub fn builtin() -> Self {
        Self {
            missions: vec![
                observable_base(),
                filter_anomaly(),
                map_station(),
                take_station(),
            ],
            planets: builtin_planets(),
        }
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Missions
// ──────────────────────────────────────────────────────────────────────────────

fn reward(fuel: u32, artifacts: f64, rank: u32) -> Reward {
    Reward {
        fuel,
        artifacts,
        rank,
    }
}

fn trace(values: Value) -> Vec<Value> {
    match values {
        Value::Array(items) => items,
        other => vec![other],
    }
}

fn observable_base() -> Mission {
    Mission {
        id: "observable-base".into(),
        title: "Observable Base Station".into(),
        description: "Welcome to your first RxJS mission! Create an Observable that emits a sequence of numbers.".into(),
        difficulty: Difficulty::Easy,
        initial_code: r#"// Create an Observable that emits 1, 2, 3
import { Observable } from 'rxjs';

const numbers$ = new Observable(subscriber => {
  // Your code here
  subscriber.next(1);
  subscriber.next(2);
  subscriber.next(3);
  subscriber.complete();
});

numbers$.subscribe(value => console.log(value));"#
            .into(),
        tests: vec![TestCase::new(
            "Should emit numbers 1, 2, 3",
            trace(json!([1, 2, 3])),
            r#"
// Test: Check if Observable emits 1, 2, 3
const results = [];
const numbers$ = new Observable(subscriber => {
  subscriber.next(1);
  subscriber.next(2);
  subscriber.next(3);
  subscriber.complete();
});
numbers$.subscribe(value => results.push(value));
return results;
"#,
        )],
        input_marbles: trace(json!([1, 2, 3])),
        output_marbles: trace(json!([1, 2, 3])),
        reward: reward(100, 0.25, 50),
    }
}

fn filter_anomaly() -> Mission {
    Mission {
        id: "filter-anomaly".into(),
        title: "Filter Anomaly".into(),
        description: "Filter valuable meteors (even numbers) from a storm.".into(),
        difficulty: Difficulty::Medium,
        initial_code: r#"// Filter even numbers from the stream
import { of } from 'rxjs';
import { filter } from 'rxjs/operators';

const numbers$ = of(1, 2, 3, 4, 5);
const filtered$ = numbers$.pipe(
  filter(n => n % 2 === 0)
);

filtered$.subscribe(value => console.log(value));"#
            .into(),
        tests: vec![TestCase::new(
            "Should filter even numbers",
            trace(json!([2, 4])),
            r#"
// Test: Check if filter correctly filters even numbers
const results = [];
const numbers$ = of(1, 2, 3, 4, 5);
const filtered$ = numbers$.pipe(filter(n => n % 2 === 0));
filtered$.subscribe(value => results.push(value));
return results;
"#,
        )],
        input_marbles: trace(json!([1, 2, 3, 4, 5])),
        output_marbles: trace(json!([2, 4])),
        reward: reward(125, 0.35, 60),
    }
}

fn map_station() -> Mission {
    Mission {
        id: "map-station".into(),
        title: "Map Station".into(),
        description: "Transform numbers by doubling them using the map operator.".into(),
        difficulty: Difficulty::Medium,
        initial_code: r#"// Transform numbers by doubling them
import { of } from 'rxjs';
import { map } from 'rxjs/operators';

const numbers$ = of(1, 2, 3, 4);
const doubled$ = numbers$.pipe(
  // Your code here
  map(n => n * 2)
);

doubled$.subscribe(value => console.log(value));"#
            .into(),
        tests: vec![TestCase::new(
            "Should double all numbers",
            trace(json!([2, 4, 6, 8])),
            r#"
// Test: Check if map correctly doubles all numbers
const results = [];
const numbers$ = of(1, 2, 3, 4);
const doubled$ = numbers$.pipe(map(n => n * 2));
doubled$.subscribe(value => results.push(value));
return results;
"#,
        )],
        input_marbles: trace(json!([1, 2, 3, 4])),
        output_marbles: trace(json!([2, 4, 6, 8])),
        reward: reward(150, 0.5, 75),
    }
}

fn take_station() -> Mission {
    Mission {
        id: "take-station".into(),
        title: "Take Station".into(),
        description: "Use the take operator to limit emissions to the first 3 values.".into(),
        difficulty: Difficulty::Easy,
        initial_code: r#"// Take only the first 3 values
import { of } from 'rxjs';
import { take } from 'rxjs/operators';

const numbers$ = of(1, 2, 3, 4, 5, 6);
const limited$ = numbers$.pipe(
  // Your code here
  take(3)
);

limited$.subscribe(value => console.log(value));"#
            .into(),
        tests: vec![TestCase::new(
            "Should take only first 3 values",
            trace(json!([1, 2, 3])),
            r#"
// Test: Check if take correctly limits to 3 values
const results = [];
const numbers$ = of(1, 2, 3, 4, 5, 6);
const limited$ = numbers$.pipe(take(3));
limited$.subscribe(value => results.push(value));
return results;
"#,
        )],
        input_marbles: trace(json!([1, 2, 3, 4, 5, 6])),
        output_marbles: trace(json!([1, 2, 3])),
        reward: reward(120, 0.3, 55),
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Planets
// ──────────────────────────────────────────────────────────────────────────────

/// Fields in map order: id, name, description, distance, kind, unlocked,
/// position, colour, required fuel, reward.
type PlanetRow = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    PlanetKind,
    bool,
    (f64, f64),
    &'static str,
    u32,
    (u32, f64, u32),
);

#[rustfmt::skip]
const PLANETS: [PlanetRow; 12] = [
    ("observable-base", "Observable Base", "Learn the fundamentals of RxJS Observables", "2.48.4rom",
        PlanetKind::Tutorial, true, (400.0, 300.0), "#4ECDC4", 0, (100, 0.25, 50)),
    ("map-station", "Map Station", "Transform data with the map operator", "4.36.9kam",
        PlanetKind::Challenge, false, (800.0, 200.0), "#FF6B6B", 50, (150, 0.5, 75)),
    ("filter-anomaly", "Filter Anomaly", "Filter valuable meteors from a storm", "1.75.61com",
        PlanetKind::Mission, true, (200.0, 500.0), "#9B59B6", 25, (125, 0.35, 60)),
    ("merge-nebula", "Merge Nebula", "Combine multiple data streams", "3.8.97.2weim",
        PlanetKind::Challenge, false, (1200.0, 400.0), "#3498DB", 75, (200, 0.75, 100)),
    ("switchmap-vortex", "SwitchMap Vortex", "Navigate through dimensional switches", "52.5.56ram",
        PlanetKind::Advanced, false, (600.0, 700.0), "#E74C3C", 100, (250, 1.0, 150)),
    ("debounce-field", "Debounce Field", "Control the flow of rapid events", "7.2.34.8lux",
        PlanetKind::Advanced, false, (1400.0, 300.0), "#F39C12", 120, (300, 1.25, 175)),
    ("combinelatest-hub", "CombineLatest Hub", "Synchronize multiple data sources", "9.1.45.2zen",
        PlanetKind::Expert, false, (100.0, 800.0), "#8E44AD", 150, (400, 1.5, 200)),
    ("take-station", "Take Station", "Limit the number of emissions", "3.2.18.5neo",
        PlanetKind::Tutorial, false, (900.0, 600.0), "#2ECC71", 30, (120, 0.3, 55)),
    ("scan-observatory", "Scan Observatory", "Accumulate values over time", "5.7.22.1arc",
        PlanetKind::Challenge, false, (1600.0, 500.0), "#1ABC9C", 90, (180, 0.6, 85)),
    ("distinct-realm", "Distinct Realm", "Filter out duplicate emissions", "4.1.33.7qux",
        PlanetKind::Mission, false, (300.0, 100.0), "#E67E22", 60, (160, 0.45, 70)),
    ("retry-fortress", "Retry Fortress", "Handle errors with retry logic", "8.9.44.2def",
        PlanetKind::Advanced, false, (1100.0, 100.0), "#C0392B", 140, (320, 1.1, 160)),
    ("share-nexus", "Share Nexus", "Share observables between subscribers", "6.3.55.8ghi",
        PlanetKind::Expert, false, (50.0, 200.0), "#9C27B0", 180, (450, 1.8, 220)),
];

fn builtin_planets() -> Vec<Planet> {
    PLANETS
        .iter()
        .map(
            |&(id, name, description, distance, kind, unlocked, (x, y), color, fuel, (rf, ra, rr))| {
                Planet {
                    id: id.into(),
                    name: name.into(),
                    description: description.into(),
                    distance: distance.into(),
                    kind,
                    unlocked,
                    position: Position { x, y },
                    color: color.into(),
                    required_fuel: Some(fuel),
                    reward: Some(reward(rf, ra, rr)),
                }
            },
        )
        .collect()
}
