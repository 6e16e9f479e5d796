//! Configuration inputs for a build pass.
//!
//! # Responsibility
//! - Model the flat properties mapping and decode its text format.
//! - Extract the allow-listed engine property snapshot.
//! - Resolve builder settings (paths, prefix) with environment overrides.
//!
//! # Invariants
//! - A loaded mapping is never mutated by the core after parsing.

pub mod engine;
pub mod properties;
pub mod settings;

pub use engine::{engine_property_keys, EngineProperties};
pub use properties::{parse_properties, Properties, PropertiesParseError};
pub use settings::{BuilderSettings, SettingsError};
