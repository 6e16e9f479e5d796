//! Capability roles an extension can be registered under.

use serde::Serialize;
use std::fmt::{Display, Formatter};

/// One registration slot of the configuration holder.
///
/// Variant order is the dispatch priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityRole {
    AttributeFinder,
    ResourceFinder,
    PipExtension,
    PolicyFinderModule,
    PolicyCollection,
    PolicyStoreManager,
    PolicyDataStore,
    DataFinderModule,
    PolicyPublisher,
    PolicyVersionManager,
    PostPublisher,
    PublisherVerification,
    StatusHandler,
}

const DISPATCH_ORDER: &[CapabilityRole] = &[
    CapabilityRole::AttributeFinder,
    CapabilityRole::ResourceFinder,
    CapabilityRole::PipExtension,
    CapabilityRole::PolicyFinderModule,
    CapabilityRole::PolicyCollection,
    CapabilityRole::PolicyStoreManager,
    CapabilityRole::PolicyDataStore,
    CapabilityRole::DataFinderModule,
    CapabilityRole::PolicyPublisher,
    CapabilityRole::PolicyVersionManager,
    CapabilityRole::PostPublisher,
    CapabilityRole::PublisherVerification,
    CapabilityRole::StatusHandler,
];

/// Roles in the fixed order the dispatcher tests them.
pub fn dispatch_order() -> &'static [CapabilityRole] {
    DISPATCH_ORDER
}

impl CapabilityRole {
    /// Stable string id used in logs and summaries.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AttributeFinder => "attribute_finder",
            Self::ResourceFinder => "resource_finder",
            Self::PipExtension => "pip_extension",
            Self::PolicyFinderModule => "policy_finder_module",
            Self::PolicyCollection => "policy_collection",
            Self::PolicyStoreManager => "policy_store_manager",
            Self::PolicyDataStore => "policy_data_store",
            Self::DataFinderModule => "data_finder_module",
            Self::PolicyPublisher => "policy_publisher",
            Self::PolicyVersionManager => "policy_version_manager",
            Self::PostPublisher => "post_publisher",
            Self::PublisherVerification => "publisher_verification",
            Self::StatusHandler => "status_handler",
        }
    }
}

impl Display for CapabilityRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
