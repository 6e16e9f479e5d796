//! Configuration holder: one registration slot per capability role.
//!
//! # Responsibility
//! - Own registered extensions together with their sub-configuration.
//! - Own the engine property snapshot of the last build pass.
//!
//! # Invariants
//! - Slots preserve registration order.
//! - Only the dispatcher and builder populate the holder.

use crate::config::engine::EngineProperties;
use crate::config::properties::Properties;
use crate::extension::capability::{dispatch_order, CapabilityRole};
use crate::extension::roles::{
    EntitlementDataFinderModule, PipAttributeFinder, PipExtension, PipResourceFinder,
    PolicyCollection, PolicyDataStore, PolicyFinderModule, PolicyPublisherModule,
    PolicyStoreManager, PolicyVersionManager, PostPublisherModule, PublisherVerificationModule,
    StatusDataHandler,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One extension registered in a slot, with its scoped sub-configuration.
pub struct Registration<T: ?Sized> {
    pub extension: Arc<T>,
    pub properties: Properties,
}

impl<T: ?Sized> Clone for Registration<T> {
    fn clone(&self) -> Self {
        Self {
            extension: Arc::clone(&self.extension),
            properties: self.properties.clone(),
        }
    }
}

/// Process-wide configuration aggregate populated by a build pass.
#[derive(Default)]
pub struct EntitlementConfigHolder {
    engine_properties: Option<EngineProperties>,
    attribute_finders: Vec<Registration<dyn PipAttributeFinder>>,
    resource_finders: Vec<Registration<dyn PipResourceFinder>>,
    pip_extensions: Vec<Registration<dyn PipExtension>>,
    policy_finders: Vec<Registration<dyn PolicyFinderModule>>,
    policy_collections: Vec<Registration<dyn PolicyCollection>>,
    policy_stores: Vec<Registration<dyn PolicyStoreManager>>,
    policy_data_stores: Vec<Registration<dyn PolicyDataStore>>,
    data_finders: Vec<Registration<dyn EntitlementDataFinderModule>>,
    policy_publishers: Vec<Registration<dyn PolicyPublisherModule>>,
    version_managers: Vec<Registration<dyn PolicyVersionManager>>,
    post_publishers: Vec<Registration<dyn PostPublisherModule>>,
    publisher_verifications: Vec<Registration<dyn PublisherVerificationModule>>,
    status_handlers: Vec<Registration<dyn StatusDataHandler>>,
}

fn registration<T: ?Sized>(extension: Arc<T>, properties: Properties) -> Registration<T> {
    Registration {
        extension,
        properties,
    }
}

impl EntitlementConfigHolder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_engine_properties(&mut self, properties: EngineProperties) {
        self.engine_properties = Some(properties);
    }

    /// Engine snapshot, `None` until a build pass found a configuration.
    pub fn engine_properties(&self) -> Option<&EngineProperties> {
        self.engine_properties.as_ref()
    }

    pub fn add_attribute_finder(&mut self, ext: Arc<dyn PipAttributeFinder>, props: Properties) {
        self.attribute_finders.push(registration(ext, props));
    }

    pub fn add_resource_finder(&mut self, ext: Arc<dyn PipResourceFinder>, props: Properties) {
        self.resource_finders.push(registration(ext, props));
    }

    pub fn add_pip_extension(&mut self, ext: Arc<dyn PipExtension>, props: Properties) {
        self.pip_extensions.push(registration(ext, props));
    }

    pub fn add_policy_finder(&mut self, ext: Arc<dyn PolicyFinderModule>, props: Properties) {
        self.policy_finders.push(registration(ext, props));
    }

    pub fn add_policy_collection(&mut self, ext: Arc<dyn PolicyCollection>, props: Properties) {
        self.policy_collections.push(registration(ext, props));
    }

    pub fn add_policy_store(&mut self, ext: Arc<dyn PolicyStoreManager>, props: Properties) {
        self.policy_stores.push(registration(ext, props));
    }

    pub fn add_policy_data_store(&mut self, ext: Arc<dyn PolicyDataStore>, props: Properties) {
        self.policy_data_stores.push(registration(ext, props));
    }

    pub fn add_data_finder(
        &mut self,
        ext: Arc<dyn EntitlementDataFinderModule>,
        props: Properties,
    ) {
        self.data_finders.push(registration(ext, props));
    }

    pub fn add_policy_publisher(&mut self, ext: Arc<dyn PolicyPublisherModule>, props: Properties) {
        self.policy_publishers.push(registration(ext, props));
    }

    pub fn add_version_manager(&mut self, ext: Arc<dyn PolicyVersionManager>, props: Properties) {
        self.version_managers.push(registration(ext, props));
    }

    pub fn add_post_publisher(&mut self, ext: Arc<dyn PostPublisherModule>, props: Properties) {
        self.post_publishers.push(registration(ext, props));
    }

    pub fn add_publisher_verification(
        &mut self,
        ext: Arc<dyn PublisherVerificationModule>,
        props: Properties,
    ) {
        self.publisher_verifications.push(registration(ext, props));
    }

    pub fn add_status_handler(&mut self, ext: Arc<dyn StatusDataHandler>, props: Properties) {
        self.status_handlers.push(registration(ext, props));
    }

    pub fn attribute_finders(&self) -> &[Registration<dyn PipAttributeFinder>] {
        &self.attribute_finders
    }

    pub fn resource_finders(&self) -> &[Registration<dyn PipResourceFinder>] {
        &self.resource_finders
    }

    pub fn pip_extensions(&self) -> &[Registration<dyn PipExtension>] {
        &self.pip_extensions
    }

    pub fn policy_finders(&self) -> &[Registration<dyn PolicyFinderModule>] {
        &self.policy_finders
    }

    pub fn policy_collections(&self) -> &[Registration<dyn PolicyCollection>] {
        &self.policy_collections
    }

    pub fn policy_stores(&self) -> &[Registration<dyn PolicyStoreManager>] {
        &self.policy_stores
    }

    pub fn policy_data_stores(&self) -> &[Registration<dyn PolicyDataStore>] {
        &self.policy_data_stores
    }

    pub fn data_finders(&self) -> &[Registration<dyn EntitlementDataFinderModule>] {
        &self.data_finders
    }

    pub fn policy_publishers(&self) -> &[Registration<dyn PolicyPublisherModule>] {
        &self.policy_publishers
    }

    pub fn version_managers(&self) -> &[Registration<dyn PolicyVersionManager>] {
        &self.version_managers
    }

    pub fn post_publishers(&self) -> &[Registration<dyn PostPublisherModule>] {
        &self.post_publishers
    }

    pub fn publisher_verifications(&self) -> &[Registration<dyn PublisherVerificationModule>] {
        &self.publisher_verifications
    }

    pub fn status_handlers(&self) -> &[Registration<dyn StatusDataHandler>] {
        &self.status_handlers
    }

    /// Number of registrations in one slot.
    pub fn slot_len(&self, role: CapabilityRole) -> usize {
        match role {
            CapabilityRole::AttributeFinder => self.attribute_finders.len(),
            CapabilityRole::ResourceFinder => self.resource_finders.len(),
            CapabilityRole::PipExtension => self.pip_extensions.len(),
            CapabilityRole::PolicyFinderModule => self.policy_finders.len(),
            CapabilityRole::PolicyCollection => self.policy_collections.len(),
            CapabilityRole::PolicyStoreManager => self.policy_stores.len(),
            CapabilityRole::PolicyDataStore => self.policy_data_stores.len(),
            CapabilityRole::DataFinderModule => self.data_finders.len(),
            CapabilityRole::PolicyPublisher => self.policy_publishers.len(),
            CapabilityRole::PolicyVersionManager => self.version_managers.len(),
            CapabilityRole::PostPublisher => self.post_publishers.len(),
            CapabilityRole::PublisherVerification => self.publisher_verifications.len(),
            CapabilityRole::StatusHandler => self.status_handlers.len(),
        }
    }

    /// Total registrations across slots; a double-registered object counts twice.
    pub fn registration_count(&self) -> usize {
        dispatch_order().iter().map(|role| self.slot_len(*role)).sum()
    }

    /// `true` when no pass has touched the holder.
    pub fn is_empty(&self) -> bool {
        self.engine_properties.is_none() && self.registration_count() == 0
    }

    pub fn summary(&self) -> HolderSummary {
        HolderSummary {
            engine_property_count: self.engine_properties.as_ref().map_or(0, |p| p.len()),
            slots: dispatch_order()
                .iter()
                .filter(|role| self.slot_len(**role) > 0)
                .map(|role| (*role, self.slot_len(*role)))
                .collect(),
        }
    }
}

/// Serializable overview of a populated holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HolderSummary {
    pub engine_property_count: usize,
    /// Non-empty slots only.
    pub slots: BTreeMap<CapabilityRole, usize>,
}
