//! First-party extensions referenced by the bundled default configuration.

use crate::config::properties::Properties;
use crate::extension::factory::{ExtensionFactory, FactoryError};
use crate::extension::roles::{
    Capabilities, Extension, ExtensionInitError, Module, PipAttributeFinder, PolicyFinderModule,
    PolicyStoreManager, StatusDataHandler,
};
use log::info;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

pub const STATIC_ATTRIBUTE_FINDER: &str = "builtin.pip.StaticAttributeFinder";
pub const IN_MEMORY_POLICY_STORE: &str = "builtin.policy.InMemoryPolicyStore";
pub const LOGGING_STATUS_HANDLER: &str = "builtin.pap.LoggingStatusHandler";

const ATTRIBUTE_KEY_PREFIX: &str = "attribute.";
const MAX_POLICIES_KEY: &str = "maxPolicies";
const MODULE_NAME_KEY: &str = "moduleName";

impl ExtensionFactory {
    /// Factory pre-loaded with the built-in extension types.
    pub fn with_builtins() -> Result<Self, FactoryError> {
        let mut factory = Self::new();
        register_builtins(&mut factory)?;
        Ok(factory)
    }
}

/// Registers every built-in extension type into `factory`.
pub fn register_builtins(factory: &mut ExtensionFactory) -> Result<(), FactoryError> {
    factory.register_default::<StaticAttributeFinder>(STATIC_ATTRIBUTE_FINDER)?;
    factory.register_default::<InMemoryPolicyStore>(IN_MEMORY_POLICY_STORE)?;
    factory.register_default::<LoggingStatusHandler>(LOGGING_STATUS_HANDLER)?;
    Ok(())
}

fn module_name_from(properties: &Properties, fallback: &str) -> String {
    properties
        .get(MODULE_NAME_KEY)
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// Attribute finder answering from `attribute.<id>=v1,v2` sub-configuration.
#[derive(Debug, Default)]
pub struct StaticAttributeFinder {
    name: String,
    attributes: BTreeMap<String, Vec<String>>,
}

impl Module for StaticAttributeFinder {
    fn module_name(&self) -> &str {
        &self.name
    }
}

impl PipAttributeFinder for StaticAttributeFinder {
    fn supported_attributes(&self) -> Vec<String> {
        self.attributes.keys().cloned().collect()
    }

    fn find_attribute_values(&self, attribute_id: &str) -> Vec<String> {
        self.attributes.get(attribute_id).cloned().unwrap_or_default()
    }
}

impl Extension for StaticAttributeFinder {
    fn init(&mut self, properties: &Properties) -> Result<(), ExtensionInitError> {
        self.name = module_name_from(properties, "StaticAttributeFinder");
        let scoped = properties.scoped(ATTRIBUTE_KEY_PREFIX);
        for (attribute_id, raw) in &scoped {
            if attribute_id.is_empty() {
                return Err(ExtensionInitError::invalid_property(
                    ATTRIBUTE_KEY_PREFIX,
                    raw,
                    "attribute id is empty",
                ));
            }
            let values = raw
                .split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(str::to_string)
                .collect();
            self.attributes.insert(attribute_id.clone(), values);
        }
        Ok(())
    }

    fn into_capabilities(self: Box<Self>) -> Capabilities {
        let this: Arc<Self> = Arc::from(self);
        Capabilities::none().with_attribute_finder(this)
    }
}

/// Policy finder and store manager backed by an in-process map.
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    name: String,
    max_policies: Option<usize>,
    policies: RwLock<BTreeMap<String, String>>,
}

impl InMemoryPolicyStore {
    pub fn policy(&self, policy_id: &str) -> Option<String> {
        self.policies
            .read()
            .ok()
            .and_then(|policies| policies.get(policy_id).cloned())
    }
}

impl Module for InMemoryPolicyStore {
    fn module_name(&self) -> &str {
        &self.name
    }
}

impl PolicyFinderModule for InMemoryPolicyStore {
    fn policy_ids(&self) -> Vec<String> {
        self.policies
            .read()
            .map(|policies| policies.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl PolicyStoreManager for InMemoryPolicyStore {
    fn add_policy(&self, policy_id: &str, policy: &str) -> bool {
        let Ok(mut policies) = self.policies.write() else {
            return false;
        };
        let replacing = policies.contains_key(policy_id);
        if !replacing && self.max_policies.is_some_and(|max| policies.len() >= max) {
            return false;
        }
        policies.insert(policy_id.to_string(), policy.to_string());
        true
    }

    fn remove_policy(&self, policy_id: &str) -> bool {
        self.policies
            .write()
            .map(|mut policies| policies.remove(policy_id).is_some())
            .unwrap_or(false)
    }
}

impl Extension for InMemoryPolicyStore {
    fn init(&mut self, properties: &Properties) -> Result<(), ExtensionInitError> {
        self.name = module_name_from(properties, "InMemoryPolicyStore");
        if let Some(raw) = properties.get(MAX_POLICIES_KEY) {
            let max = raw
                .trim()
                .parse::<usize>()
                .map_err(|err| ExtensionInitError::invalid_property(MAX_POLICIES_KEY, raw, err))?;
            self.max_policies = Some(max);
        }
        Ok(())
    }

    fn into_capabilities(self: Box<Self>) -> Capabilities {
        let this: Arc<Self> = Arc::from(self);
        Capabilities::none()
            .with_policy_finder(this.clone())
            .with_policy_store(this)
    }
}

/// Status handler that forwards notifications to the log.
#[derive(Debug, Default)]
pub struct LoggingStatusHandler {
    name: String,
}

impl Module for LoggingStatusHandler {
    fn module_name(&self) -> &str {
        &self.name
    }
}

impl StatusDataHandler for LoggingStatusHandler {
    fn handle(&self, about: &str, key: &str, message: &str) {
        info!(
            "event=status_notification module=builtin status=ok handler={} about={} key={} message={}",
            self.name, about, key, message
        );
    }
}

impl Extension for LoggingStatusHandler {
    fn init(&mut self, properties: &Properties) -> Result<(), ExtensionInitError> {
        self.name = module_name_from(properties, "LoggingStatusHandler");
        Ok(())
    }

    fn into_capabilities(self: Box<Self>) -> Capabilities {
        let this: Arc<Self> = Arc::from(self);
        Capabilities::none().with_status_handler(this)
    }
}
