//! Type-identifier to constructor registry.
//!
//! Extension types are named in configuration by a string identifier. Hosts
//! register a zero-argument constructor per identifier at startup; resolving
//! an unknown identifier is a lookup miss.

use crate::extension::roles::Extension;
use std::any::Any;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::panic::{catch_unwind, AssertUnwindSafe};

type Constructor = Box<dyn Fn() -> Result<Box<dyn Extension>, String> + Send + Sync>;

/// Registered extension constructors keyed by type identifier.
#[derive(Default)]
pub struct ExtensionFactory {
    constructors: BTreeMap<String, Constructor>,
}

impl ExtensionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an infallible constructor.
    pub fn register<F>(&mut self, type_id: &str, constructor: F) -> Result<(), FactoryError>
    where
        F: Fn() -> Box<dyn Extension> + Send + Sync + 'static,
    {
        self.insert(type_id, Box::new(move || Ok(constructor())))
    }

    /// Registers a constructor that may refuse to build an instance.
    pub fn register_fallible<F>(&mut self, type_id: &str, constructor: F) -> Result<(), FactoryError>
    where
        F: Fn() -> Result<Box<dyn Extension>, String> + Send + Sync + 'static,
    {
        self.insert(type_id, Box::new(constructor))
    }

    /// Registers `T::default` as the constructor.
    pub fn register_default<T>(&mut self, type_id: &str) -> Result<(), FactoryError>
    where
        T: Extension + Default,
    {
        self.register(type_id, || Box::new(T::default()))
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.constructors.contains_key(type_id)
    }

    /// Sorted registered identifiers.
    pub fn type_ids(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    /// Creates a fresh, uninitialized instance of `type_id`.
    ///
    /// A constructor that panics is reported as a failed construction.
    pub fn instantiate(&self, type_id: &str) -> Result<Box<dyn Extension>, InstantiateError> {
        let constructor = self
            .constructors
            .get(type_id)
            .ok_or_else(|| InstantiateError::UnknownType(type_id.to_string()))?;

        match catch_unwind(AssertUnwindSafe(constructor)) {
            Ok(Ok(instance)) => Ok(instance),
            Ok(Err(reason)) => Err(InstantiateError::ConstructionFailed {
                type_id: type_id.to_string(),
                reason,
            }),
            Err(payload) => Err(InstantiateError::ConstructionFailed {
                type_id: type_id.to_string(),
                reason: format!("constructor panicked: {}", panic_message(payload.as_ref())),
            }),
        }
    }

    fn insert(&mut self, type_id: &str, constructor: Constructor) -> Result<(), FactoryError> {
        if !is_valid_type_id(type_id) {
            return Err(FactoryError::InvalidTypeId(type_id.to_string()));
        }
        if self.constructors.contains_key(type_id) {
            return Err(FactoryError::DuplicateTypeId(type_id.to_string()));
        }
        self.constructors.insert(type_id.to_string(), constructor);
        Ok(())
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

fn is_valid_type_id(value: &str) -> bool {
    !value.is_empty() && !value.chars().any(char::is_whitespace)
}

/// Registration-time errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactoryError {
    InvalidTypeId(String),
    DuplicateTypeId(String),
}

impl Display for FactoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidTypeId(value) => write!(f, "extension type id is invalid: `{value}`"),
            Self::DuplicateTypeId(value) => {
                write!(f, "extension type id already registered: {value}")
            }
        }
    }
}

impl Error for FactoryError {}

/// Lookup/construction failures of `instantiate`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstantiateError {
    UnknownType(String),
    ConstructionFailed { type_id: String, reason: String },
}

impl Display for InstantiateError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownType(value) => write!(f, "no extension type registered as `{value}`"),
            Self::ConstructionFailed { type_id, reason } => {
                write!(f, "failed to construct `{type_id}`: {reason}")
            }
        }
    }
}

impl Error for InstantiateError {}

#[cfg(test)]
mod tests {
    use super::{ExtensionFactory, FactoryError, InstantiateError};
    use crate::config::properties::Properties;
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

    #[test]
    fn instantiates_registered_type() {
        let mut factory = ExtensionFactory::new();
        factory
            .register_default::<Inert>("test.Inert")
            .expect("registration");

        assert!(factory.contains("test.Inert"));
        let instance = factory.instantiate("test.Inert").expect("instance");
        assert!(instance.type_name().ends_with("Inert"));
    }

    #[test]
    fn each_instantiation_is_a_fresh_object() {
        let mut factory = ExtensionFactory::new();
        factory
            .register_default::<Inert>("test.Inert")
            .expect("registration");
        assert!(factory.instantiate("test.Inert").is_ok());
        assert!(factory.instantiate("test.Inert").is_ok());
    }

    #[test]
    fn unknown_type_is_lookup_miss() {
        let factory = ExtensionFactory::new();
        let err = factory.instantiate("missing.Type").err().expect("must fail");
        assert_eq!(err, InstantiateError::UnknownType("missing.Type".to_string()));
    }

    #[test]
    fn rejects_invalid_and_duplicate_type_ids() {
        let mut factory = ExtensionFactory::new();
        assert_eq!(
            factory.register_default::<Inert>(""),
            Err(FactoryError::InvalidTypeId(String::new()))
        );
        assert_eq!(
            factory.register_default::<Inert>("has space"),
            Err(FactoryError::InvalidTypeId("has space".to_string()))
        );
        factory
            .register_default::<Inert>("test.Inert")
            .expect("first registration");
        assert_eq!(
            factory.register_default::<Inert>("test.Inert"),
            Err(FactoryError::DuplicateTypeId("test.Inert".to_string()))
        );
        assert_eq!(factory.type_ids(), vec!["test.Inert"]);
    }

    #[test]
    fn reports_refused_and_panicking_constructors() {
        let mut factory = ExtensionFactory::new();
        factory
            .register_fallible("test.Refuses", || Err("no backend".to_string()))
            .expect("registration");
        factory
            .register("test.Panics", || panic!("boom"))
            .expect("registration");

        let refused = factory.instantiate("test.Refuses").err().expect("must fail");
        assert!(matches!(
            refused,
            InstantiateError::ConstructionFailed { ref reason, .. } if reason == "no backend"
        ));

        let panicked = factory.instantiate("test.Panics").err().expect("must fail");
        assert!(matches!(panicked, InstantiateError::ConstructionFailed { .. }));
    }
}
