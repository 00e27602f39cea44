//! Player progress: resources, completed missions and map unlocking.

use galaxy_types::{mission_complete, Mission, TestResult};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::planet::Planet;

/// Upper bound of the fuel gauge.
pub const MAX_FUEL_LEVEL: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub fuel: u32,
    /// Gauge reading in `0..=MAX_FUEL_LEVEL`.
    pub fuel_level: f64,
    pub artifacts: f64,
    pub captain_rank: u32,
    #[serde(default)]
    pub completed_missions: Vec<String>,
}

impl Default for PlayerStats {
    fn default() -> Self {
        Self {
            fuel: 4400,
            fuel_level: 3.3,
            artifacts: 2.25,
            captain_rank: 2530,
            completed_missions: Vec::new(),
        }
    }
}

impl PlayerStats {
    pub fn has_completed(&self, mission_id: &str) -> bool {
        self.completed_missions.iter().any(|id| id == mission_id)
    }

    /// Grant the mission's reward if every test passed and the mission was
    /// not completed before. Returns whether the reward was granted.
    pub fn complete_mission(&mut self, mission: &Mission, results: &[TestResult]) -> bool {
        if !mission_complete(results) || self.has_completed(&mission.id) {
            return false;
        }
        let reward = mission.reward;
        self.fuel = self.fuel.saturating_add(reward.fuel);
        self.fuel_level = (self.fuel_level + f64::from(reward.fuel) / 1000.0).min(MAX_FUEL_LEVEL);
        self.artifacts += reward.artifacts;
        self.captain_rank = self.captain_rank.saturating_add(reward.rank);
        self.completed_missions.push(mission.id.clone());
        info!(
            mission = %mission.id,
            fuel = self.fuel,
            rank = self.captain_rank,
            "mission completed"
        );
        true
    }

    /// Unlock every locked planet with a non-zero fuel requirement the
    /// player now meets. Returns the ids that were unlocked.
    pub fn unlock_planets(&self, planets: &mut [Planet]) -> Vec<String> {
        planets
            .iter_mut()
            .filter(|p| !p.unlocked)
            .filter(|p| p.required_fuel.is_some_and(|fuel| fuel > 0 && self.fuel >= fuel))
            .map(|p| {
                p.unlocked = true;
                p.id.clone()
            })
            .collect()
    }
}

impl Planet {
    /// Unlocked and affordable. A planet without a fuel requirement costs
    /// nothing.
    pub fn is_reachable(&self, stats: &PlayerStats) -> bool {
        self.unlocked && stats.fuel >= self.required_fuel.unwrap_or(0)
    }
}
