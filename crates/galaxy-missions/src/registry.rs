//! Mission lookup: the static registry, the remote-store abstraction and the
//! registry that falls back from one to the other.

use galaxy_types::Mission;
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::Catalog;
use crate::planet::Planet;

/// Why a mission store could not answer.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("mission store unavailable: {0}")]
    Unavailable(String),
    #[error("malformed mission document: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A store that missions and planets can be fetched from.
///
/// `Ok(None)` means the store answered and has no such mission.
pub trait MissionSource {
    fn fetch_mission(&self, id: &str) -> Result<Option<Mission>, SourceError>;
    fn fetch_planets(&self) -> Result<Vec<Planet>, SourceError>;
}

/// In-memory, read-only mission and planet catalog.
#[derive(Debug, Clone)]
pub struct MissionRegistry {
    missions: Vec<Mission>,
    planets: Vec<Planet>,
}

impl MissionRegistry {
    /// The registry over the catalog the game ships with.
    pub fn builtin() -> Self {
        Self::from_catalog(Catalog::builtin())
    }

    /// Build a registry from a catalog. When an id repeats, the first
    /// entry wins.
    pub fn from_catalog(catalog: Catalog) -> Self {
        let mut missions: Vec<Mission> = Vec::with_capacity(catalog.missions.len());
        for mission in catalog.missions {
            if missions.iter().any(|m| m.id == mission.id) {
                warn!(mission = %mission.id, "duplicate mission id ignored");
                continue;
            }
            missions.push(mission);
        }
        Self {
            missions,
            planets: catalog.planets,
        }
    }

    /// Look a mission up by id. Unknown ids are a normal outcome.
    pub fn get_mission(&self, id: &str) -> Option<&Mission> {
        self.missions.iter().find(|m| m.id == id)
    }

    /// Mission ids in catalog order.
    pub fn mission_ids(&self) -> impl Iterator<Item = &str> {
        self.missions.iter().map(|m| m.id.as_str())
    }

    pub fn planets(&self) -> &[Planet] {
        &self.planets
    }

    pub fn get_planet(&self, id: &str) -> Option<&Planet> {
        self.planets.iter().find(|p| p.id == id)
    }

    pub fn to_catalog(&self) -> Catalog {
        Catalog {
            missions: self.missions.clone(),
            planets: self.planets.clone(),
        }
    }
}

impl Default for MissionRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl MissionSource for MissionRegistry {
    fn fetch_mission(&self, id: &str) -> Result<Option<Mission>, SourceError> {
        Ok(self.get_mission(id).cloned())
    }

    fn fetch_planets(&self) -> Result<Vec<Planet>, SourceError> {
        Ok(self.planets.clone())
    }
}

/// A store backed by a catalog JSON document. The document is parsed on
/// every fetch, so a malformed one fails each request.
#[derive(Debug, Clone)]
pub struct JsonMissionSource {
    document: String,
}

impl JsonMissionSource {
    pub fn new(document: impl Into<String>) -> Self {
        Self {
            document: document.into(),
        }
    }

    fn catalog(&self) -> Result<Catalog, SourceError> {
        Ok(Catalog::from_json(&self.document)?)
    }
}

impl MissionSource for JsonMissionSource {
    fn fetch_mission(&self, id: &str) -> Result<Option<Mission>, SourceError> {
        Ok(self.catalog()?.missions.into_iter().find(|m| m.id == id))
    }

    fn fetch_planets(&self) -> Result<Vec<Planet>, SourceError> {
        Ok(self.catalog()?.planets)
    }
}

/// Asks a remote source first and answers from a static registry when the
/// source fails or does not know the mission.
#[derive(Debug, Clone)]
pub struct FallbackRegistry<S> {
    source: S,
    fallback: MissionRegistry,
}

impl<S: MissionSource> FallbackRegistry<S> {
    /// Fall back to the built-in catalog.
    pub fn new(source: S) -> Self {
        Self::with_fallback(source, MissionRegistry::builtin())
    }

    pub fn with_fallback(source: S, fallback: MissionRegistry) -> Self {
        Self { source, fallback }
    }

    pub fn get_mission(&self, id: &str) -> Option<Mission> {
        match self.source.fetch_mission(id) {
            Ok(Some(mission)) => Some(mission),
            Ok(None) => {
                debug!(mission = id, "not in mission store, trying static catalog");
                self.fallback.get_mission(id).cloned()
            }
            Err(err) => {
                warn!(mission = id, error = %err, "mission store failed, using static catalog");
                self.fallback.get_mission(id).cloned()
            }
        }
    }

    pub fn planets(&self) -> Vec<Planet> {
        self.source.fetch_planets().unwrap_or_else(|err| {
            warn!(error = %err, "planet store failed, using static catalog");
            self.fallback.planets().to_vec()
        })
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}
