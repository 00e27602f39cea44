//! Galaxy-map entries. Each planet shares its id with the mission it hosts,
//! when it hosts one.

use galaxy_types::Reward;
use serde::{Deserialize, Serialize};

/// Category shown on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanetKind {
    Tutorial,
    Challenge,
    Mission,
    Advanced,
    Expert,
}

/// Map coordinates in map pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Planet {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Flavour text, not a number.
    pub distance: String,
    #[serde(rename = "type")]
    pub kind: PlanetKind,
    pub unlocked: bool,
    pub position: Position,
    /// CSS colour, e.g. `#4ECDC4`.
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_fuel: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward: Option<Reward>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_planet_json_shape() {
        let planet = Planet {
            id: "observable-base".into(),
            name: "Observable Base".into(),
            description: "Learn the fundamentals".into(),
            distance: "2.48.4rom".into(),
            kind: PlanetKind::Tutorial,
            unlocked: true,
            position: Position { x: 400.0, y: 300.0 },
            color: "#4ECDC4".into(),
            required_fuel: Some(0),
            reward: None,
        };
        let value = serde_json::to_value(&planet).unwrap();
        assert_eq!(value["type"], json!("tutorial"));
        assert_eq!(value["requiredFuel"], json!(0));
        assert_eq!(value["position"], json!({ "x": 400.0, "y": 300.0 }));
        assert!(value.get("reward").is_none());
    }

    #[test]
    fn test_optional_fields_default() {
        let planet: Planet = serde_json::from_value(json!({
            "id": "p", "name": "P", "description": "", "distance": "far",
            "type": "expert", "unlocked": false,
            "position": { "x": 1, "y": 2 }, "color": "#000"
        }))
        .unwrap();
        assert_eq!(planet.kind, PlanetKind::Expert);
        assert_eq!(planet.required_fuel, None);
        assert_eq!(planet.reward, None);
    }
}
