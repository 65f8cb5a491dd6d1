// DXCC Engine Library
// Callsign → DXCC entity resolution over Club Log, CTY CSV and prefix-list data

pub mod config;
pub mod engine;
pub mod error;
pub mod locator;
pub mod merge;
pub mod model;
pub mod readers;
pub mod resolver;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{LoadError, MaskError, MergeError};
pub use merge::{merge, Clash, Element};
pub use model::{
    Continent, Coordinates, DataSet, Entity, Pattern, PatternKind, Provider,
    ProviderCapabilities, Validity, INVALID_ENTITY, NO_ENTITY,
};
pub use readers::ReadOptions;
pub use resolver::{Provenance, Resolution, ResolutionCache, Resolver, Role};
