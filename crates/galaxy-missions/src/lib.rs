//! Mission and planet catalog for RxGalaxy.
//!
//! [`MissionRegistry`] serves the built-in catalog; [`FallbackRegistry`]
//! puts a remote [`MissionSource`] in front of it and answers from the
//! built-in catalog whenever the source fails. [`PlayerStats`] holds the
//! reward and unlocking rules applied when a mission's tests all pass.

mod catalog;
mod planet;
mod progress;
mod registry;

pub use catalog::Catalog;
pub use planet::{Planet, PlanetKind, Position};
pub use progress::{PlayerStats, MAX_FUEL_LEVEL};
pub use registry::{FallbackRegistry, JsonMissionSource, MissionRegistry, MissionSource, SourceError};
