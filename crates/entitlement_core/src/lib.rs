//! Extension discovery and capability dispatch for the entitlement engine.
//! This crate owns the configuration holder and every rule for populating it.

pub mod builder;
pub mod config;
pub mod extension;
pub mod holder;
pub mod logging;
pub mod resource;

pub use builder::{BuildError, BuildOutcome, ConfigLoadError, ConfigSource, EntitlementExtensionBuilder};
pub use config::{
    engine_property_keys, parse_properties, BuilderSettings, EngineProperties, Properties,
    PropertiesParseError, SettingsError,
};
pub use extension::capability::{dispatch_order, CapabilityRole};
pub use extension::dispatch::ExtensionDispatcher;
pub use extension::factory::{ExtensionFactory, FactoryError, InstantiateError};
pub use extension::finder::{
    ExtensionConfigurer, ExtensionConfigurerError, ExtensionFinderError, PropertiesExtensionFinder,
};
pub use extension::roles::{Capabilities, Extension, ExtensionInitError, Module};
pub use holder::{EntitlementConfigHolder, HolderSummary, Registration};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use resource::{BundledResources, FsResourceResolver, ResourceResolver, ResourceStream};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
