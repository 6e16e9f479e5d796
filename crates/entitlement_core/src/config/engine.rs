//! Global engine property snapshot.
//!
//! # Responsibility
//! - Define the fixed allow-list of engine-level keys.
//! - Copy only allow-listed keys out of a raw configuration mapping.
//!
//! # Invariants
//! - Keys outside the allow-list are never copied.
//! - Stored values are trimmed of surrounding whitespace.
//! - A snapshot is immutable once extracted.

use crate::config::properties::Properties;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

pub const ON_DEMAND_POLICY_LOADING: &str = "PDP.OnDemangPolicyLoading.Enable";
pub const ON_DEMAND_POLICY_MAX_POLICY_ENTRIES: &str =
    "PDP.OnDemangPolicyLoading.MaxInMemoryPolicies";
pub const DECISION_CACHING: &str = "PDP.DecisionCaching.Enable";
pub const DECISION_CACHING_INTERVAL: &str = "PDP.DecisionCaching.CachingInterval";
pub const ATTRIBUTE_CACHING: &str = "PDP.AttributeCaching.Enable";
pub const ATTRIBUTE_CACHING_INTERVAL: &str = "PDP.AttributeCaching.CachingInterval";
pub const RESOURCE_CACHING: &str = "PDP.ResourceCaching.Enable";
pub const RESOURCE_CACHING_INTERVAL: &str = "PDP.ResourceCaching.CachingInterval";
pub const PDP_ENABLE: &str = "PDP.Enable";
pub const PAP_ENABLE: &str = "PAP.Enable";
pub const ENGINE_CONFIG_ENABLE: &str = "PDP.Balana.Config.Enable";
pub const MULTIPLE_DECISION_PROFILE_ENABLE: &str = "PDP.Multiple.Decision.Profile.Enable";
pub const MAX_POLICY_REFERENCE_ENTRIES: &str = "PDP.References.MaxPolicyEntries";
pub const FILESYSTEM_POLICY_PATH: &str = "PAP.Policy.Add.Start.Policy.File.Path";
pub const POLICY_ID_REGEXP_PATTERN: &str = "PAP.Policy.Id.Regexp.Pattern";
pub const GLOBAL_COMBINING_ALGORITHM: &str = "PDP.Global.Policy.Combining.Algorithm";
pub const ITEMS_PER_PAGE: &str = "PAP.Items.Per.Page";
pub const START_UP_POLICY_ADDING: &str = "PAP.Policy.Add.Start.Enable";
pub const SCHEMA_VALIDATION: &str = "PDP.SchemaValidation.Enable";
pub const ENGINE_CACHING_INTERVAL: &str = "Entitlement.Engine.CachingInterval";
pub const REGISTRY_LEVEL_POLICY_CACHE_CLEAR: &str = "PDP.Registry.Level.Policy.Cache.Clear";
pub const POLICY_CACHING_INTERVAL: &str = "PDP.PolicyCaching.CachingInterval";

const ENGINE_PROPERTY_KEYS: &[&str] = &[
    ON_DEMAND_POLICY_LOADING,
    ON_DEMAND_POLICY_MAX_POLICY_ENTRIES,
    DECISION_CACHING,
    DECISION_CACHING_INTERVAL,
    ATTRIBUTE_CACHING,
    ATTRIBUTE_CACHING_INTERVAL,
    RESOURCE_CACHING,
    RESOURCE_CACHING_INTERVAL,
    PDP_ENABLE,
    PAP_ENABLE,
    ENGINE_CONFIG_ENABLE,
    MULTIPLE_DECISION_PROFILE_ENABLE,
    MAX_POLICY_REFERENCE_ENTRIES,
    FILESYSTEM_POLICY_PATH,
    POLICY_ID_REGEXP_PATTERN,
    GLOBAL_COMBINING_ALGORITHM,
    ITEMS_PER_PAGE,
    START_UP_POLICY_ADDING,
    SCHEMA_VALIDATION,
    ENGINE_CACHING_INTERVAL,
    REGISTRY_LEVEL_POLICY_CACHE_CLEAR,
    POLICY_CACHING_INTERVAL,
];

/// Returns the allow-listed engine property names.
pub fn engine_property_keys() -> &'static [&'static str] {
    ENGINE_PROPERTY_KEYS
}

/// Immutable snapshot of allow-listed engine properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct EngineProperties {
    values: BTreeMap<String, String>,
}

impl EngineProperties {
    /// Copies every allow-listed key present in `raw`, trimming its value.
    pub fn extract(raw: &Properties) -> Self {
        let values = ENGINE_PROPERTY_KEYS
            .iter()
            .filter_map(|key| {
                raw.get(key)
                    .map(|value| ((*key).to_string(), value.trim().to_string()))
            })
            .collect();
        Self { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Reads a boolean flag. `None` when absent or not `true`/`false`.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        let value = self.get(key)?;
        if value.eq_ignore_ascii_case("true") {
            Some(true)
        } else if value.eq_ignore_ascii_case("false") {
            Some(false)
        } else {
            None
        }
    }

    /// Reads an unsigned integer (intervals, entry limits, page sizes).
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key)?.parse().ok()
    }

    /// Compiles the configured policy-id pattern, if one is set.
    pub fn policy_id_pattern(&self) -> Option<Result<Regex, regex::Error>> {
        self.get(POLICY_ID_REGEXP_PATTERN).map(Regex::new)
    }
}
