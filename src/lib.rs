pub mod attrs;
pub mod config;
pub mod engine;
pub mod filter;
pub mod geometry;
pub mod grid;
pub mod objective;
pub mod params;
pub mod propagate;
pub mod sampler;
pub mod snapshot;
pub mod web;

pub use attrs::Attribute;
pub use config::{ConfigLoader, ModelConfig};
pub use engine::{Engine, EngineSettings, LineId, PassSummary};
pub use filter::Filter;
pub use grid::{CellId, HexGrid, InfraKind};
pub use objective::{FishModel, Model};
pub use params::ParameterSet;
pub use snapshot::{GridSnapshot, SnapshotWriter};
