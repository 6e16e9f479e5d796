//! Build pass: load configuration, install engine properties, wire extensions.
//!
//! # Responsibility
//! - Locate `entitlement.properties`: the config directory first, then the
//!   named resource from the active resolver.
//! - Install the engine property snapshot into the holder.
//! - Run extension discovery with the holder-backed dispatcher.
//!
//! # Invariants
//! - A missing configuration is a successful no-op; the holder is untouched.
//! - An existing but unreadable source aborts the pass.
//! - The first extension failure aborts the pass; earlier registrations stay.
//!
//! # See also
//! - `extension::finder` for the declaration format.

use crate::config::engine::EngineProperties;
use crate::config::properties::{parse_properties, Properties, PropertiesParseError};
use crate::config::settings::BuilderSettings;
use crate::extension::dispatch::ExtensionDispatcher;
use crate::extension::factory::ExtensionFactory;
use crate::extension::finder::{ExtensionFinderError, PropertiesExtensionFinder};
use crate::holder::EntitlementConfigHolder;
use crate::resource::{BundledResources, ResourceResolver, ResourceStream};
use log::{error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io::{self, Read};
use std::path::PathBuf;
use std::time::Instant;

/// Where a loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// File in the configuration directory.
    File(PathBuf),
    /// Named resource from the host-supplied resolver.
    HostResource(String),
    /// Named resource from the default resolver.
    DefaultResource(String),
}

impl Display for ConfigSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "file:{}", path.display()),
            Self::HostResource(name) => write!(f, "host:{name}"),
            Self::DefaultResource(name) => write!(f, "default:{name}"),
        }
    }
}

/// Result of a successful build pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildOutcome {
    /// No source was found; the holder was left unmodified.
    NoConfiguration,
    Configured {
        source: ConfigSource,
        engine_property_count: usize,
        extension_count: usize,
    },
}

/// Builds entitlement configuration into an `EntitlementConfigHolder`.
pub struct EntitlementExtensionBuilder {
    settings: BuilderSettings,
    factory: ExtensionFactory,
    host_resolver: Option<Box<dyn ResourceResolver>>,
    default_resolver: Box<dyn ResourceResolver>,
}

impl EntitlementExtensionBuilder {
    /// Builder falling back to the crate's bundled default configuration.
    pub fn new(settings: BuilderSettings, factory: ExtensionFactory) -> Self {
        Self {
            settings,
            factory,
            host_resolver: None,
            default_resolver: Box::new(BundledResources::defaults()),
        }
    }

    /// Uses `resolver` instead of the default one for all lookups.
    pub fn with_host_resolver(mut self, resolver: impl ResourceResolver + 'static) -> Self {
        self.host_resolver = Some(Box::new(resolver));
        self
    }

    /// Replaces the resolver used when no host resolver is supplied.
    pub fn with_default_resolver(mut self, resolver: impl ResourceResolver + 'static) -> Self {
        self.default_resolver = Box::new(resolver);
        self
    }

    pub fn settings(&self) -> &BuilderSettings {
        &self.settings
    }

    pub fn factory(&self) -> &ExtensionFactory {
        &self.factory
    }

    /// Locates and parses the configuration.
    ///
    /// Returns `Ok(None)` when neither the config-dir file nor the named
    /// resource exists.
    pub fn load_properties(&self) -> Result<Option<(ConfigSource, Properties)>, ConfigLoadError> {
        let Some((source, stream)) = self.open_source()? else {
            return Ok(None);
        };

        let properties = read_source(&source, stream)?;
        info!(
            "event=config_load module=builder status=ok source={} entry_count={}",
            source,
            properties.len()
        );
        Ok(Some((source, properties)))
    }

    /// Runs one build pass into `holder`.
    ///
    /// # Errors
    /// - `BuildError::Load` when an existing source cannot be read or parsed.
    /// - `BuildError::Extensions` on the first failing extension.
    pub fn build(&self, holder: &mut EntitlementConfigHolder) -> Result<BuildOutcome, BuildError> {
        let started_at = Instant::now();
        info!("event=config_build module=builder status=start");

        let loaded = self.load_properties().map_err(|err| {
            error!(
                "event=config_build module=builder status=error duration_ms={} error_code=config_load_failed error={}",
                started_at.elapsed().as_millis(),
                err
            );
            BuildError::Load(err)
        })?;

        let Some((source, properties)) = loaded else {
            warn!(
                "event=config_build module=builder status=skip reason=config_not_found file_name={}",
                self.settings.config_file_name
            );
            return Ok(BuildOutcome::NoConfiguration);
        };

        let engine_properties = EngineProperties::extract(&properties);
        let engine_property_count = engine_properties.len();
        holder.set_engine_properties(engine_properties);

        let finder =
            PropertiesExtensionFinder::with_prefix(&self.factory, &self.settings.extension_prefix);
        let mut dispatcher = ExtensionDispatcher::new(holder);
        let extension_count = finder
            .find_extensions(&properties, &mut dispatcher)
            .map_err(|err| {
                error!(
                    "event=config_build module=builder status=error duration_ms={} error_code=extension_failed index={} type_id={} error={}",
                    started_at.elapsed().as_millis(),
                    err.index(),
                    err.type_id(),
                    err
                );
                BuildError::Extensions(err)
            })?;

        info!(
            "event=config_build module=builder status=ok duration_ms={} source={} engine_property_count={} extension_count={}",
            started_at.elapsed().as_millis(),
            source,
            engine_property_count,
            extension_count
        );
        Ok(BuildOutcome::Configured {
            source,
            engine_property_count,
            extension_count,
        })
    }

    fn open_source(&self) -> Result<Option<(ConfigSource, ResourceStream)>, ConfigLoadError> {
        let resolver: &dyn ResourceResolver = self
            .host_resolver
            .as_deref()
            .unwrap_or(self.default_resolver.as_ref());

        let path = self.settings.config_file_path();
        let primary = resolver
            .resolve_path(&path)
            .map_err(|err| ConfigLoadError::io(ConfigSource::File(path.clone()), err))?;
        if let Some(stream) = primary {
            return Ok(Some((ConfigSource::File(path), stream)));
        }

        let name = self.settings.config_file_name.clone();
        let source = if self.host_resolver.is_some() {
            ConfigSource::HostResource(name.clone())
        } else {
            ConfigSource::DefaultResource(name.clone())
        };
        match resolver.resolve_name(&name) {
            Ok(Some(stream)) => Ok(Some((source, stream))),
            Ok(None) => Ok(None),
            Err(err) => Err(ConfigLoadError::io(source, err)),
        }
    }
}

fn read_source(source: &ConfigSource, mut stream: ResourceStream) -> Result<Properties, ConfigLoadError> {
    let mut bytes = Vec::new();
    stream
        .read_to_end(&mut bytes)
        .map_err(|err| ConfigLoadError::io(source.clone(), err))?;
    drop(stream);

    // ISO-8859-1: each byte is the code point of the same value.
    let text: String = bytes.iter().copied().map(char::from).collect();
    parse_properties(&text).map_err(|err| ConfigLoadError::Malformed {
        source: source.clone(),
        error: err,
    })
}

/// Failure to read an existing configuration source.
#[derive(Debug)]
pub enum ConfigLoadError {
    Io { source: ConfigSource, error: io::Error },
    Malformed {
        source: ConfigSource,
        error: PropertiesParseError,
    },
}

impl ConfigLoadError {
    fn io(source: ConfigSource, error: io::Error) -> Self {
        Self::Io { source, error }
    }

    pub fn config_source(&self) -> &ConfigSource {
        match self {
            Self::Io { source, .. } | Self::Malformed { source, .. } => source,
        }
    }
}

impl Display for ConfigLoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { source, error } => write!(f, "failed to read {source}: {error}"),
            Self::Malformed { source, error } => write!(f, "failed to parse {source}: {error}"),
        }
    }
}

impl Error for ConfigLoadError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { error, .. } => Some(error),
            Self::Malformed { error, .. } => Some(error),
        }
    }
}

/// Build pass failure.
#[derive(Debug)]
pub enum BuildError {
    Load(ConfigLoadError),
    Extensions(ExtensionFinderError),
}

impl Display for BuildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Load(err) => write!(f, "configuration load failed: {err}"),
            Self::Extensions(err) => write!(f, "extension configuration failed: {err}"),
        }
    }
}

impl Error for BuildError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Load(err) => Some(err),
            Self::Extensions(err) => Some(err),
        }
    }
}

impl From<ConfigLoadError> for BuildError {
    fn from(value: ConfigLoadError) -> Self {
        Self::Load(value)
    }
}

impl From<ExtensionFinderError> for BuildError {
    fn from(value: ExtensionFinderError) -> Self {
        Self::Extensions(value)
    }
}

#[cfg(test)]
mod tests {
    use super::{read_source, ConfigLoadError, ConfigSource};
    use std::io::{self, Read};

    struct FailingReader;

    impl Read for FailingReader {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
    }

    #[test]
    fn read_failure_is_reported_with_source() {
        let source = ConfigSource::DefaultResource("entitlement.properties".to_string());
        let err = read_source(&source, Box::new(FailingReader)).expect_err("read must fail");
        assert!(matches!(err, ConfigLoadError::Io { .. }));
        assert_eq!(err.config_source(), &source);
        assert!(err.to_string().contains("default:entitlement.properties"));
    }

    #[test]
    fn malformed_escape_is_reported() {
        let source = ConfigSource::File("conf/entitlement.properties".into());
        let err = read_source(&source, Box::new("a=\\uZZZZ".as_bytes()))
            .expect_err("parse must fail");
        assert!(matches!(err, ConfigLoadError::Malformed { .. }));
    }

    #[test]
    fn decodes_bytes_as_latin1() {
        let source = ConfigSource::DefaultResource("x".to_string());
        let bytes: &'static [u8] = b"a=caf\xe9\nb=\\u00e9t\xe9\n";
        let props = read_source(&source, Box::new(bytes)).expect("parse succeeds");
        assert_eq!(props.get("a"), Some("caf\u{e9}"));
        assert_eq!(props.get("b"), Some("\u{e9}t\u{e9}"));
    }
}
