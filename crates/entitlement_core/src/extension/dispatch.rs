//! Capability dispatch of initialized extensions into holder slots.
//!
//! # Responsibility
//! - Initialize each extension with its sub-configuration.
//! - Pick the holder slot(s) from the roles the extension exposes.
//!
//! # Invariants
//! - Roles are tested in `dispatch_order()`; only the first match registers.
//! - Exception: a policy finder module that is also a policy store manager is
//!   registered into the store slot and then the finder slot.
//! - An extension exposing no role is rejected and nothing is registered.

use crate::config::properties::Properties;
use crate::extension::capability::{dispatch_order, CapabilityRole};
use crate::extension::finder::{ExtensionConfigurer, ExtensionConfigurerError};
use crate::extension::roles::{Capabilities, Extension};
use crate::holder::EntitlementConfigHolder;
use log::{error, info};
use std::sync::Arc;

/// Returns the slots an extension with `capabilities` is registered into,
/// in registration order. Empty when no role matches.
pub fn resolve_roles(capabilities: &Capabilities) -> Vec<CapabilityRole> {
    let Some(primary) = dispatch_order()
        .iter()
        .copied()
        .find(|role| capabilities.has(*role))
    else {
        return Vec::new();
    };

    if primary == CapabilityRole::PolicyFinderModule
        && capabilities.has(CapabilityRole::PolicyStoreManager)
    {
        return vec![
            CapabilityRole::PolicyStoreManager,
            CapabilityRole::PolicyFinderModule,
        ];
    }
    vec![primary]
}

/// `ExtensionConfigurer` that registers into an `EntitlementConfigHolder`.
pub struct ExtensionDispatcher<'h> {
    holder: &'h mut EntitlementConfigHolder,
}

impl<'h> ExtensionDispatcher<'h> {
    pub fn new(holder: &'h mut EntitlementConfigHolder) -> Self {
        Self { holder }
    }

    fn register(
        &mut self,
        role: CapabilityRole,
        capabilities: &Capabilities,
        properties: Properties,
    ) {
        let holder = &mut *self.holder;
        match role {
            CapabilityRole::AttributeFinder => {
                if let Some(handle) = &capabilities.attribute_finder {
                    holder.add_attribute_finder(Arc::clone(handle), properties);
                }
            }
            CapabilityRole::ResourceFinder => {
                if let Some(handle) = &capabilities.resource_finder {
                    holder.add_resource_finder(Arc::clone(handle), properties);
                }
            }
            CapabilityRole::PipExtension => {
                if let Some(handle) = &capabilities.pip_extension {
                    holder.add_pip_extension(Arc::clone(handle), properties);
                }
            }
            CapabilityRole::PolicyFinderModule => {
                if let Some(handle) = &capabilities.policy_finder {
                    holder.add_policy_finder(Arc::clone(handle), properties);
                }
            }
            CapabilityRole::PolicyCollection => {
                if let Some(handle) = &capabilities.policy_collection {
                    holder.add_policy_collection(Arc::clone(handle), properties);
                }
            }
            CapabilityRole::PolicyStoreManager => {
                if let Some(handle) = &capabilities.policy_store {
                    holder.add_policy_store(Arc::clone(handle), properties);
                }
            }
            CapabilityRole::PolicyDataStore => {
                if let Some(handle) = &capabilities.policy_data_store {
                    holder.add_policy_data_store(Arc::clone(handle), properties);
                }
            }
            CapabilityRole::DataFinderModule => {
                if let Some(handle) = &capabilities.data_finder {
                    holder.add_data_finder(Arc::clone(handle), properties);
                }
            }
            CapabilityRole::PolicyPublisher => {
                if let Some(handle) = &capabilities.policy_publisher {
                    holder.add_policy_publisher(Arc::clone(handle), properties);
                }
            }
            CapabilityRole::PolicyVersionManager => {
                if let Some(handle) = &capabilities.version_manager {
                    holder.add_version_manager(Arc::clone(handle), properties);
                }
            }
            CapabilityRole::PostPublisher => {
                if let Some(handle) = &capabilities.post_publisher {
                    holder.add_post_publisher(Arc::clone(handle), properties);
                }
            }
            CapabilityRole::PublisherVerification => {
                if let Some(handle) = &capabilities.publisher_verification {
                    holder.add_publisher_verification(Arc::clone(handle), properties);
                }
            }
            CapabilityRole::StatusHandler => {
                if let Some(handle) = &capabilities.status_handler {
                    holder.add_status_handler(Arc::clone(handle), properties);
                }
            }
        }
    }
}

impl ExtensionConfigurer for ExtensionDispatcher<'_> {
    fn configure_extension(
        &mut self,
        mut extension: Box<dyn Extension>,
        properties: Properties,
    ) -> Result<(), ExtensionConfigurerError> {
        let type_name = extension.type_name();
        info!(
            "event=extension_register module=dispatch status=start type={} property_count={}",
            type_name,
            properties.len()
        );

        if let Err(source) = extension.init(&properties) {
            error!(
                "event=extension_register module=dispatch status=error type={} error_code=init_failed error={}",
                type_name, source
            );
            return Err(ExtensionConfigurerError::Initialization {
                type_name: type_name.to_string(),
                source,
            });
        }

        let capabilities = extension.into_capabilities();
        let roles = resolve_roles(&capabilities);
        if roles.is_empty() {
            error!(
                "event=extension_register module=dispatch status=error type={} error_code=unrecognized_extension",
                type_name
            );
            return Err(ExtensionConfigurerError::Unrecognized {
                type_name: type_name.to_string(),
            });
        }

        for role in &roles {
            self.register(*role, &capabilities, properties.clone());
            info!(
                "event=extension_register module=dispatch status=ok type={} role={}",
                type_name, role
            );
        }
        Ok(())
    }
}
