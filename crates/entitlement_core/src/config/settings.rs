//! Builder settings with environment overrides.
//!
//! Defaults mirror the server layout (`repository/conf/identity`) and can be
//! overridden per process through `ENTITLEMENT_*` environment variables.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

/// Default configuration file name looked up in the config dir and resources.
pub const DEFAULT_CONFIG_FILE_NAME: &str = "entitlement.properties";
/// Default key prefix for indexed extension declarations.
pub const DEFAULT_EXTENSION_PREFIX: &str = "PropertyExtensionFinder";
/// Default configuration directory, relative to the working directory.
pub const DEFAULT_CONFIG_DIR: &str = "repository/conf/identity";

pub const ENV_CONFIG_DIR: &str = "ENTITLEMENT_CONFIG_DIR";
pub const ENV_CONFIG_FILE: &str = "ENTITLEMENT_CONFIG_FILE";
pub const ENV_EXTENSION_PREFIX: &str = "ENTITLEMENT_EXTENSION_PREFIX";

/// Resolved settings for one build pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuilderSettings {
    /// Directory searched first for the configuration file.
    pub config_dir: PathBuf,
    /// Configuration file / resource name.
    pub config_file_name: String,
    /// Prefix of `<prefix>.<n>` extension declarations.
    pub extension_prefix: String,
}

impl Default for BuilderSettings {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            config_file_name: DEFAULT_CONFIG_FILE_NAME.to_string(),
            extension_prefix: DEFAULT_EXTENSION_PREFIX.to_string(),
        }
    }
}

impl BuilderSettings {
    /// Defaults overridden from the process environment.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Applies overrides from an arbitrary lookup (environment, test map).
    ///
    /// A variable that is set but blank is rejected rather than ignored.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, SettingsError> {
        if let Some(dir) = non_blank(ENV_CONFIG_DIR, lookup(ENV_CONFIG_DIR))? {
            self.config_dir = PathBuf::from(dir);
        }
        if let Some(file) = non_blank(ENV_CONFIG_FILE, lookup(ENV_CONFIG_FILE))? {
            self.config_file_name = file;
        }
        if let Some(prefix) = non_blank(ENV_EXTENSION_PREFIX, lookup(ENV_EXTENSION_PREFIX))? {
            self.extension_prefix = prefix;
        }
        Ok(self)
    }

    /// Full path of the primary configuration file.
    pub fn config_file_path(&self) -> PathBuf {
        self.config_dir.join(&self.config_file_name)
    }
}

fn non_blank(name: &'static str, value: Option<String>) -> Result<Option<String>, SettingsError> {
    match value {
        None => Ok(None),
        Some(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                Err(SettingsError::BlankOverride(name))
            } else {
                Ok(Some(trimmed.to_string()))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    BlankOverride(&'static str),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankOverride(name) => write!(f, "environment override `{name}` is blank"),
        }
    }
}

impl Error for SettingsError {}

#[cfg(test)]
mod tests {
    use super::{
        BuilderSettings, SettingsError, DEFAULT_EXTENSION_PREFIX, ENV_CONFIG_DIR,
        ENV_EXTENSION_PREFIX,
    };
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_point_at_server_conf_dir() {
        let settings = BuilderSettings::default();
        assert_eq!(settings.extension_prefix, DEFAULT_EXTENSION_PREFIX);
        assert_eq!(
            settings.config_file_path(),
            PathBuf::from("repository/conf/identity/entitlement.properties")
        );
    }

    #[test]
    fn applies_overrides() {
        let settings = BuilderSettings::default()
            .with_overrides(lookup_from(&[
                (ENV_CONFIG_DIR, "/etc/entitlement"),
                (ENV_EXTENSION_PREFIX, " Custom.Finder "),
            ]))
            .expect("overrides apply");
        assert_eq!(settings.config_dir, PathBuf::from("/etc/entitlement"));
        assert_eq!(settings.extension_prefix, "Custom.Finder");
        assert_eq!(settings.config_file_name, "entitlement.properties");
    }

    #[test]
    fn rejects_blank_override() {
        let err = BuilderSettings::default()
            .with_overrides(lookup_from(&[(ENV_CONFIG_DIR, "   ")]))
            .expect_err("blank override must fail");
        assert_eq!(err, SettingsError::BlankOverride(ENV_CONFIG_DIR));
    }
}
