//! Indexed extension discovery over flat properties.
//!
//! # Responsibility
//! - Enumerate `<prefix>.<n>=<type id>` declarations from `n = 1` upward.
//! - Build each declaration's sub-configuration from
//!   `<prefix>.<n>.config.<name>=<value>` keys.
//! - Instantiate the declared type and hand it to an `ExtensionConfigurer`.
//!
//! # Invariants
//! - Indices are visited in ascending order, each exactly once.
//! - The first missing index ends discovery; later declarations are never
//!   visited.
//! - The first failure aborts discovery; earlier hand-offs are not undone.
//!
//! Example:
//!
//! ```text
//! PropertyExtensionFinder.1=com.example.FooAttributeFinder
//! PropertyExtensionFinder.1.config.url=ldap://localhost
//! PropertyExtensionFinder.2=com.example.BarPolicyStore
//! ```

use crate::config::properties::Properties;
use crate::config::settings::DEFAULT_EXTENSION_PREFIX;
use crate::extension::factory::{ExtensionFactory, InstantiateError};
use crate::extension::roles::{Extension, ExtensionInitError};
use log::{debug, info, warn};
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Consumer of freshly instantiated extensions.
pub trait ExtensionConfigurer {
    fn configure_extension(
        &mut self,
        extension: Box<dyn Extension>,
        properties: Properties,
    ) -> Result<(), ExtensionConfigurerError>;
}

impl<F> ExtensionConfigurer for F
where
    F: FnMut(Box<dyn Extension>, Properties) -> Result<(), ExtensionConfigurerError>,
{
    fn configure_extension(
        &mut self,
        extension: Box<dyn Extension>,
        properties: Properties,
    ) -> Result<(), ExtensionConfigurerError> {
        self(extension, properties)
    }
}

/// One reachable `<prefix>.<n>` declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionDeclaration {
    /// 1-based position.
    pub index: usize,
    pub type_id: String,
    pub properties: Properties,
}

/// Finder driven by a key prefix and a constructor registry.
pub struct PropertiesExtensionFinder<'f> {
    prefix: String,
    factory: &'f ExtensionFactory,
}

impl<'f> PropertiesExtensionFinder<'f> {
    /// Finder using the default `PropertyExtensionFinder` prefix.
    pub fn new(factory: &'f ExtensionFactory) -> Self {
        Self::with_prefix(factory, DEFAULT_EXTENSION_PREFIX)
    }

    pub fn with_prefix(factory: &'f ExtensionFactory, prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            factory,
        }
    }

    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = prefix.into();
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Lists reachable declarations without instantiating anything.
    pub fn declarations(&self, properties: &Properties) -> Vec<ExtensionDeclaration> {
        (1..)
            .map_while(|index| {
                properties
                    .get(&self.declaration_key(index))
                    .map(|type_id| ExtensionDeclaration {
                        index,
                        type_id: type_id.to_string(),
                        properties: properties.scoped(&self.config_prefix(index)),
                    })
            })
            .collect()
    }

    /// Instantiates every reachable declaration in index order and passes it
    /// with its sub-configuration to `configurer`.
    ///
    /// Returns the number of extensions handed off.
    ///
    /// # Errors
    /// - `Resolution` when a type id has no registered constructor.
    /// - `Instantiation` when the constructor fails.
    /// - `Configuration` when `configurer` rejects the extension.
    pub fn find_extensions(
        &self,
        properties: &Properties,
        configurer: &mut dyn ExtensionConfigurer,
    ) -> Result<usize, ExtensionFinderError> {
        let mut index = 1;
        while let Some(type_id) = properties.get(&self.declaration_key(index)) {
            debug!(
                "event=extension_found module=finder status=ok prefix={} index={} type_id={}",
                self.prefix, index, type_id
            );

            let extension = self.factory.instantiate(type_id).map_err(|err| match err {
                InstantiateError::UnknownType(_) => ExtensionFinderError::Resolution {
                    index,
                    type_id: type_id.to_string(),
                },
                InstantiateError::ConstructionFailed { reason, .. } => {
                    ExtensionFinderError::Instantiation {
                        index,
                        type_id: type_id.to_string(),
                        reason,
                    }
                }
            })?;

            let sub_config = properties.scoped(&self.config_prefix(index));
            configurer
                .configure_extension(extension, sub_config)
                .map_err(|source| ExtensionFinderError::Configuration {
                    index,
                    type_id: type_id.to_string(),
                    source,
                })?;
            index += 1;
        }

        let visited = index - 1;
        let unreachable = self.unreachable_indices(properties, visited);
        if !unreachable.is_empty() {
            warn!(
                "event=extension_scan module=finder status=skip prefix={} gap_at={} unreachable={:?}",
                self.prefix,
                visited + 1,
                unreachable
            );
        }
        info!(
            "event=extension_scan module=finder status=ok prefix={} count={}",
            self.prefix, visited
        );
        Ok(visited)
    }

    /// Declared indices past the first gap. They are reported, never visited.
    pub fn unreachable_indices(&self, properties: &Properties, visited: usize) -> Vec<usize> {
        let pattern = format!(r"^{}\.(\d+)$", regex::escape(&self.prefix));
        let Ok(matcher) = Regex::new(&pattern) else {
            return Vec::new();
        };

        let mut indices: Vec<usize> = properties
            .keys()
            .filter_map(|key| matcher.captures(key))
            .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
            .filter(|index| *index > visited + 1)
            .collect();
        indices.sort_unstable();
        indices
    }

    fn declaration_key(&self, index: usize) -> String {
        format!("{}.{}", self.prefix, index)
    }

    fn config_prefix(&self, index: usize) -> String {
        format!("{}.{}.config.", self.prefix, index)
    }
}

/// Dispatcher-side failure for one extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionConfigurerError {
    /// The extension rejected its sub-configuration.
    Initialization {
        type_name: String,
        source: ExtensionInitError,
    },
    /// The extension implements none of the known capability roles.
    Unrecognized { type_name: String },
}

impl Display for ExtensionConfigurerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initialization { type_name, source } => {
                write!(f, "extension `{type_name}` failed to initialize: {source}")
            }
            Self::Unrecognized { type_name } => {
                write!(f, "unrecognized entitlement extension of type `{type_name}`")
            }
        }
    }
}

impl Error for ExtensionConfigurerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Initialization { source, .. } => Some(source),
            Self::Unrecognized { .. } => None,
        }
    }
}

/// Discovery failure; carries the failing index and type id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionFinderError {
    Resolution {
        index: usize,
        type_id: String,
    },
    Instantiation {
        index: usize,
        type_id: String,
        reason: String,
    },
    Configuration {
        index: usize,
        type_id: String,
        source: ExtensionConfigurerError,
    },
}

impl ExtensionFinderError {
    pub fn index(&self) -> usize {
        match self {
            Self::Resolution { index, .. }
            | Self::Instantiation { index, .. }
            | Self::Configuration { index, .. } => *index,
        }
    }

    pub fn type_id(&self) -> &str {
        match self {
            Self::Resolution { type_id, .. }
            | Self::Instantiation { type_id, .. }
            | Self::Configuration { type_id, .. } => type_id,
        }
    }
}

impl Display for ExtensionFinderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resolution { index, type_id } => write!(
                f,
                "extension #{index}: type `{type_id}` is not registered"
            ),
            Self::Instantiation {
                index,
                type_id,
                reason,
            } => write!(
                f,
                "extension #{index}: could not instantiate `{type_id}`: {reason}"
            ),
            Self::Configuration {
                index,
                type_id,
                source,
            } => write!(f, "extension #{index} (`{type_id}`): {source}"),
        }
    }
}

impl Error for ExtensionFinderError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Configuration { source, .. } => Some(source),
            Self::Resolution { .. } | Self::Instantiation { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ExtensionConfigurerError, ExtensionFinderError, PropertiesExtensionFinder};
    use crate::config::properties::Properties;
    use crate::extension::factory::ExtensionFactory;
    use crate::extension::roles::{Capabilities, Extension, ExtensionInitError};

    #[derive(Default)]
    struct Inert;

    impl Extension for Inert {
        fn init(&mut self, _properties: &Properties) -> Result<(), ExtensionInitError> {
            Ok(())
        }

        fn into_capabilities(self: Box<Self>) -> Capabilities {
            Capabilities::none()
        }
    }

    fn factory() -> ExtensionFactory {
        let mut factory = ExtensionFactory::new();
        factory
            .register_default::<Inert>("test.Inert")
            .expect("registration");
        factory
    }

    fn props(pairs: &[(&str, &str)]) -> Properties {
        pairs.iter().copied().collect()
    }

    #[test]
    fn declarations_stop_at_first_gap() {
        let factory = factory();
        let finder = PropertiesExtensionFinder::with_prefix(&factory, "P");
        let properties = props(&[
            ("P.1", "a"),
            ("P.2", "b"),
            ("P.2.config.x", "1"),
            ("P.4", "d"),
        ]);

        let declarations = finder.declarations(&properties);
        assert_eq!(declarations.len(), 2);
        assert_eq!(declarations[1].index, 2);
        assert_eq!(declarations[1].type_id, "b");
        assert_eq!(declarations[1].properties.get("x"), Some("1"));
        assert_eq!(finder.unreachable_indices(&properties, 2), vec![4]);
    }

    #[test]
    fn unreachable_ignores_nested_and_foreign_keys() {
        let factory = factory();
        let finder = PropertiesExtensionFinder::with_prefix(&factory, "P.x");
        let properties = props(&[("P.x.5.config.a", "1"), ("PAx.7", "t"), ("P.x.9", "t")]);
        assert_eq!(finder.unreachable_indices(&properties, 0), vec![9]);
    }

    #[test]
    fn empty_properties_visit_nothing() {
        let factory = factory();
        let finder = PropertiesExtensionFinder::new(&factory);
        let mut calls = 0;
        let mut configurer =
            |_: Box<dyn Extension>, _: Properties| -> Result<(), ExtensionConfigurerError> {
                calls += 1;
                Ok(())
            };
        let count = finder
            .find_extensions(&Properties::new(), &mut configurer)
            .expect("empty scan succeeds");
        assert_eq!(count, 0);
        assert_eq!(calls, 0);
    }

    #[test]
    fn prefix_can_be_changed() {
        let factory = factory();
        let mut finder = PropertiesExtensionFinder::new(&factory);
        assert_eq!(finder.prefix(), "PropertyExtensionFinder");
        finder.set_prefix("Custom");

        let mut seen = Vec::new();
        let mut configurer =
            |_: Box<dyn Extension>, p: Properties| -> Result<(), ExtensionConfigurerError> {
                seen.push(p);
                Ok(())
            };
        let properties = props(&[
            ("PropertyExtensionFinder.1", "test.Inert"),
            ("Custom.1", "test.Inert"),
            ("Custom.1.config.k", "v"),
        ]);
        let count = finder
            .find_extensions(&properties, &mut configurer)
            .expect("scan succeeds");
        assert_eq!(count, 1);
        assert_eq!(seen[0].get("k"), Some("v"));
    }

    #[test]
    fn finder_error_exposes_index_and_type_id() {
        let err = ExtensionFinderError::Resolution {
            index: 3,
            type_id: "x.Y".to_string(),
        };
        assert_eq!(err.index(), 3);
        assert_eq!(err.type_id(), "x.Y");
        assert!(err.to_string().contains("#3"));
    }
}
