//! Extension contracts consumed by the dispatcher.
//!
//! # Responsibility
//! - Declare one trait per capability role. The traits only carry what the
//!   wiring layer needs; behavior lives in the engine that consumes them.
//! - Declare the `Extension` lifecycle: construct, init with scoped
//!   properties, then expose role handles.
//!
//! # Invariants
//! - `init` runs exactly once per instance, before any role handle exists.
//! - Role handles share one allocation, so a type registered under two roles
//!   is the same object in both slots.

use crate::config::properties::Properties;
use crate::extension::capability::CapabilityRole;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Common supertrait of every role.
pub trait Module: Send + Sync {
    /// Human-readable module name for logs and admin listings.
    fn module_name(&self) -> &str;
}

/// Supplies attribute values.
pub trait PipAttributeFinder: Module {
    /// Attribute ids this finder can resolve.
    fn supported_attributes(&self) -> Vec<String> {
        Vec::new()
    }

    /// Resolves values of one attribute id.
    fn find_attribute_values(&self, _attribute_id: &str) -> Vec<String> {
        Vec::new()
    }
}

/// Resolves child/descendant resources.
pub trait PipResourceFinder: Module {}

/// Generic request-time information point hook.
pub trait PipExtension: Module {}

/// Locates policies for evaluation.
pub trait PolicyFinderModule: Module {
    /// Ids of the policies this module currently serves.
    fn policy_ids(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Groups policies for target matching.
pub trait PolicyCollection: Module {}

/// Manages the stored policy set.
pub trait PolicyStoreManager: Module {
    /// Stores or replaces one policy. `false` when the store refuses it.
    fn add_policy(&self, policy_id: &str, policy: &str) -> bool;
    fn remove_policy(&self, policy_id: &str) -> bool;
}

/// Stores policy metadata.
pub trait PolicyDataStore: Module {}

/// Serves entitlement data to administration tooling.
pub trait EntitlementDataFinderModule: Module {}

/// Publishes policies to decision points.
pub trait PolicyPublisherModule: Module {}

/// Keeps versioned copies of policies.
pub trait PolicyVersionManager: Module {}

/// Runs after publication.
pub trait PostPublisherModule: Module {}

/// Approves publish requests.
pub trait PublisherVerificationModule: Module {}

/// Receives administration status notifications.
pub trait StatusDataHandler: Module {
    fn handle(&self, about: &str, key: &str, message: &str);
}

/// Lifecycle contract of a dynamically configured extension.
pub trait Extension: Send + Sync + 'static {
    /// Applies the extension's scoped sub-configuration.
    fn init(&mut self, properties: &Properties) -> Result<(), ExtensionInitError>;

    /// Converts the initialized object into role handles.
    ///
    /// Return every role the type implements; the dispatcher decides which
    /// slots it lands in.
    fn into_capabilities(self: Box<Self>) -> Capabilities;

    /// Concrete type name, used in diagnostics.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Role handles exposed by one extension instance.
#[derive(Default)]
pub struct Capabilities {
    pub attribute_finder: Option<Arc<dyn PipAttributeFinder>>,
    pub resource_finder: Option<Arc<dyn PipResourceFinder>>,
    pub pip_extension: Option<Arc<dyn PipExtension>>,
    pub policy_finder: Option<Arc<dyn PolicyFinderModule>>,
    pub policy_collection: Option<Arc<dyn PolicyCollection>>,
    pub policy_store: Option<Arc<dyn PolicyStoreManager>>,
    pub policy_data_store: Option<Arc<dyn PolicyDataStore>>,
    pub data_finder: Option<Arc<dyn EntitlementDataFinderModule>>,
    pub policy_publisher: Option<Arc<dyn PolicyPublisherModule>>,
    pub version_manager: Option<Arc<dyn PolicyVersionManager>>,
    pub post_publisher: Option<Arc<dyn PostPublisherModule>>,
    pub publisher_verification: Option<Arc<dyn PublisherVerificationModule>>,
    pub status_handler: Option<Arc<dyn StatusDataHandler>>,
}

impl Capabilities {
    /// No roles: the dispatcher rejects such an extension.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_attribute_finder(mut self, handle: Arc<dyn PipAttributeFinder>) -> Self {
        self.attribute_finder = Some(handle);
        self
    }

    pub fn with_resource_finder(mut self, handle: Arc<dyn PipResourceFinder>) -> Self {
        self.resource_finder = Some(handle);
        self
    }

    pub fn with_pip_extension(mut self, handle: Arc<dyn PipExtension>) -> Self {
        self.pip_extension = Some(handle);
        self
    }

    pub fn with_policy_finder(mut self, handle: Arc<dyn PolicyFinderModule>) -> Self {
        self.policy_finder = Some(handle);
        self
    }

    pub fn with_policy_collection(mut self, handle: Arc<dyn PolicyCollection>) -> Self {
        self.policy_collection = Some(handle);
        self
    }

    pub fn with_policy_store(mut self, handle: Arc<dyn PolicyStoreManager>) -> Self {
        self.policy_store = Some(handle);
        self
    }

    pub fn with_policy_data_store(mut self, handle: Arc<dyn PolicyDataStore>) -> Self {
        self.policy_data_store = Some(handle);
        self
    }

    pub fn with_data_finder(mut self, handle: Arc<dyn EntitlementDataFinderModule>) -> Self {
        self.data_finder = Some(handle);
        self
    }

    pub fn with_policy_publisher(mut self, handle: Arc<dyn PolicyPublisherModule>) -> Self {
        self.policy_publisher = Some(handle);
        self
    }

    pub fn with_version_manager(mut self, handle: Arc<dyn PolicyVersionManager>) -> Self {
        self.version_manager = Some(handle);
        self
    }

    pub fn with_post_publisher(mut self, handle: Arc<dyn PostPublisherModule>) -> Self {
        self.post_publisher = Some(handle);
        self
    }

    pub fn with_publisher_verification(
        mut self,
        handle: Arc<dyn PublisherVerificationModule>,
    ) -> Self {
        self.publisher_verification = Some(handle);
        self
    }

    pub fn with_status_handler(mut self, handle: Arc<dyn StatusDataHandler>) -> Self {
        self.status_handler = Some(handle);
        self
    }

    /// Whether the instance exposes `role`.
    pub fn has(&self, role: CapabilityRole) -> bool {
        match role {
            CapabilityRole::AttributeFinder => self.attribute_finder.is_some(),
            CapabilityRole::ResourceFinder => self.resource_finder.is_some(),
            CapabilityRole::PipExtension => self.pip_extension.is_some(),
            CapabilityRole::PolicyFinderModule => self.policy_finder.is_some(),
            CapabilityRole::PolicyCollection => self.policy_collection.is_some(),
            CapabilityRole::PolicyStoreManager => self.policy_store.is_some(),
            CapabilityRole::PolicyDataStore => self.policy_data_store.is_some(),
            CapabilityRole::DataFinderModule => self.data_finder.is_some(),
            CapabilityRole::PolicyPublisher => self.policy_publisher.is_some(),
            CapabilityRole::PolicyVersionManager => self.version_manager.is_some(),
            CapabilityRole::PostPublisher => self.post_publisher.is_some(),
            CapabilityRole::PublisherVerification => self.publisher_verification.is_some(),
            CapabilityRole::StatusHandler => self.status_handler.is_some(),
        }
    }

    pub fn is_empty(&self) -> bool {
        crate::extension::capability::dispatch_order()
            .iter()
            .all(|role| !self.has(*role))
    }
}

/// Rejection raised by an extension while applying its sub-configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionInitError {
    message: String,
}

impl ExtensionInitError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Sub-configuration key that must be present but was not.
    pub fn missing_property(name: &str) -> Self {
        Self::new(format!("required property `{name}` is missing"))
    }

    /// Sub-configuration key whose value could not be accepted.
    pub fn invalid_property(name: &str, value: &str, reason: impl Display) -> Self {
        Self::new(format!("property `{name}` has invalid value `{value}`: {reason}"))
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ExtensionInitError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl Error for ExtensionInitError {}
