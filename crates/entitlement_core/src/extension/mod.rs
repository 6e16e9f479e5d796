//! Extension discovery and capability dispatch.
//!
//! Extensions are declared in flat properties by index, constructed through a
//! registered factory, initialized with their scoped sub-configuration and
//! registered into the configuration holder slot matching their role.

pub mod builtin;
pub mod capability;
pub mod dispatch;
pub mod factory;
pub mod finder;
pub mod roles;
