pub mod cli_utils;
pub mod components;
pub mod config;
pub mod errors;
pub mod geo;
pub mod pathfinding;
pub mod plugins;
pub mod terrain_generation;

// Selective re-exports for external consumers

pub use components::{NavAgent, WorldPosition};
pub use config::GeoPathConfig;
pub use errors::{GeoPathError, GeoPathResult};
pub use geo::{GeoEngine, HeightMapGeo, InstanceId, Nswe};
pub use pathfinding::{GridPoint, MoverKind, PathFinder};
pub use plugins::GeoPathPlugin;
