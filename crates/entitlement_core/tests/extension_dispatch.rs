use entitlement_core::extension::finder::PropertiesExtensionFinder;
use entitlement_core::extension::roles::{
    PipAttributeFinder, PipResourceFinder, PolicyFinderModule, PolicyStoreManager,
};
use entitlement_core::{
    Capabilities, EntitlementConfigHolder, Extension, ExtensionConfigurerError,
    ExtensionDispatcher, ExtensionFactory, ExtensionFinderError, ExtensionInitError, Module,
    Properties,
};
use std::sync::{Arc, Mutex};

type InitLog = Arc<Mutex<Vec<(String, Option<String>)>>>;

struct Recorder {
    label: &'static str,
    log: InitLog,
}

impl Module for Recorder {
    fn module_name(&self) -> &str {
        self.label
    }
}

impl PipAttributeFinder for Recorder {}

impl Extension for Recorder {
    fn init(&mut self, properties: &Properties) -> Result<(), ExtensionInitError> {
        self.log
            .lock()
            .expect("init log lock")
            .push((self.label.to_string(), properties.get("k").map(str::to_string)));
        Ok(())
    }

    fn into_capabilities(self: Box<Self>) -> Capabilities {
        let this: Arc<Self> = Arc::from(self);
        Capabilities::none().with_attribute_finder(this)
    }
}

#[derive(Default)]
struct FinderAndStore;

impl Module for FinderAndStore {
    fn module_name(&self) -> &str {
        "FinderAndStore"
    }
}

impl PolicyFinderModule for FinderAndStore {}

impl PolicyStoreManager for FinderAndStore {
    fn add_policy(&self, _policy_id: &str, _policy: &str) -> bool {
        true
    }

    fn remove_policy(&self, _policy_id: &str) -> bool {
        false
    }
}

impl Extension for FinderAndStore {
    fn init(&mut self, _properties: &Properties) -> Result<(), ExtensionInitError> {
        Ok(())
    }

    fn into_capabilities(self: Box<Self>) -> Capabilities {
        let this: Arc<Self> = Arc::from(self);
        Capabilities::none()
            .with_policy_finder(this.clone())
            .with_policy_store(this)
    }
}

#[derive(Default)]
struct AttributeAndResource;

impl Module for AttributeAndResource {
    fn module_name(&self) -> &str {
        "AttributeAndResource"
    }
}

impl PipAttributeFinder for AttributeAndResource {}
impl PipResourceFinder for AttributeAndResource {}

impl Extension for AttributeAndResource {
    fn init(&mut self, _properties: &Properties) -> Result<(), ExtensionInitError> {
        Ok(())
    }

    fn into_capabilities(self: Box<Self>) -> Capabilities {
        let this: Arc<Self> = Arc::from(self);
        Capabilities::none()
            .with_attribute_finder(this.clone())
            .with_resource_finder(this)
    }
}

#[derive(Default)]
struct Unroled;

impl Extension for Unroled {
    fn init(&mut self, _properties: &Properties) -> Result<(), ExtensionInitError> {
        Ok(())
    }

    fn into_capabilities(self: Box<Self>) -> Capabilities {
        Capabilities::none()
    }
}

#[derive(Default)]
struct RequiresEndpoint;

impl Module for RequiresEndpoint {
    fn module_name(&self) -> &str {
        "RequiresEndpoint"
    }
}

impl PipResourceFinder for RequiresEndpoint {}

impl Extension for RequiresEndpoint {
    fn init(&mut self, properties: &Properties) -> Result<(), ExtensionInitError> {
        properties
            .get("endpoint")
            .map(|_| ())
            .ok_or_else(|| ExtensionInitError::missing_property("endpoint"))
    }

    fn into_capabilities(self: Box<Self>) -> Capabilities {
        let this: Arc<Self> = Arc::from(self);
        Capabilities::none().with_resource_finder(this)
    }
}

fn factory_with_recorders(log: &InitLog) -> ExtensionFactory {
    let mut factory = ExtensionFactory::new();
    for label in ["t.A", "t.B", "t.C"] {
        let log = Arc::clone(log);
        factory
            .register(label, move || {
                Box::new(Recorder {
                    label,
                    log: Arc::clone(&log),
                })
            })
            .expect("recorder registration");
    }
    factory
        .register_default::<FinderAndStore>("t.FinderAndStore")
        .expect("registration");
    factory
        .register_default::<AttributeAndResource>("t.AttributeAndResource")
        .expect("registration");
    factory
        .register_default::<Unroled>("t.Unroled")
        .expect("registration");
    factory
        .register_default::<RequiresEndpoint>("t.RequiresEndpoint")
        .expect("registration");
    factory
}

fn props(pairs: &[(&str, &str)]) -> Properties {
    pairs.iter().copied().collect()
}

fn run(
    factory: &ExtensionFactory,
    properties: &Properties,
    holder: &mut EntitlementConfigHolder,
) -> Result<usize, ExtensionFinderError> {
    let finder = PropertiesExtensionFinder::with_prefix(factory, "P");
    let mut dispatcher = ExtensionDispatcher::new(holder);
    finder.find_extensions(properties, &mut dispatcher)
}

fn same_object<A: ?Sized, B: ?Sized>(a: &Arc<A>, b: &Arc<B>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

#[test]
fn declarations_are_visited_in_index_order_with_exact_sub_config() {
    let log = InitLog::default();
    let factory = factory_with_recorders(&log);
    let properties = props(&[
        ("P.1", "t.B"),
        ("P.1.config.k", "one"),
        ("P.2", "t.A"),
        ("P.2.config.k", "two"),
        ("P.3", "t.C"),
        ("P.10.config.k", "ten"),
        ("P.1.configk", "stray"),
    ]);
    let mut holder = EntitlementConfigHolder::new();

    let count = run(&factory, &properties, &mut holder).expect("scan succeeds");

    assert_eq!(count, 3);
    let seen = log.lock().expect("init log lock").clone();
    assert_eq!(
        seen,
        vec![
            ("t.B".to_string(), Some("one".to_string())),
            ("t.A".to_string(), Some("two".to_string())),
            ("t.C".to_string(), None),
        ]
    );

    let finders = holder.attribute_finders();
    assert_eq!(finders.len(), 3);
    assert_eq!(finders[0].extension.module_name(), "t.B");
    assert_eq!(finders[0].properties.len(), 1);
    assert_eq!(finders[0].properties.get("k"), Some("one"));
    assert!(finders[2].properties.is_empty());
}

#[test]
fn discovery_stops_at_first_gap() {
    let log = InitLog::default();
    let factory = factory_with_recorders(&log);
    let properties = props(&[("P.1", "t.A"), ("P.3", "t.B"), ("P.4", "t.C")]);
    let mut holder = EntitlementConfigHolder::new();

    let count = run(&factory, &properties, &mut holder).expect("scan succeeds");

    assert_eq!(count, 1);
    assert_eq!(holder.registration_count(), 1);
    assert_eq!(log.lock().expect("init log lock").len(), 1);
}

#[test]
fn unknown_type_aborts_and_keeps_earlier_registrations() {
    let log = InitLog::default();
    let factory = factory_with_recorders(&log);
    let properties = props(&[("P.1", "t.A"), ("P.2", "t.Missing"), ("P.3", "t.B")]);
    let mut holder = EntitlementConfigHolder::new();

    let err = run(&factory, &properties, &mut holder).expect_err("unknown type must fail");

    assert_eq!(
        err,
        ExtensionFinderError::Resolution {
            index: 2,
            type_id: "t.Missing".to_string(),
        }
    );
    assert_eq!(holder.attribute_finders().len(), 1);
    assert_eq!(log.lock().expect("init log lock").len(), 1);
}

#[test]
fn finder_and_store_registers_into_both_slots() {
    let log = InitLog::default();
    let factory = factory_with_recorders(&log);
    let properties = props(&[("P.1", "t.FinderAndStore"), ("P.1.config.dir", "/policies")]);
    let mut holder = EntitlementConfigHolder::new();

    run(&factory, &properties, &mut holder).expect("scan succeeds");

    assert_eq!(holder.policy_stores().len(), 1);
    assert_eq!(holder.policy_finders().len(), 1);
    assert_eq!(holder.registration_count(), 2);
    assert!(same_object(
        &holder.policy_stores()[0].extension,
        &holder.policy_finders()[0].extension
    ));
    assert_eq!(holder.policy_finders()[0].properties.get("dir"), Some("/policies"));
    assert_eq!(holder.policy_stores()[0].properties.get("dir"), Some("/policies"));
}

#[test]
fn multi_role_object_lands_in_highest_priority_slot_only() {
    let log = InitLog::default();
    let factory = factory_with_recorders(&log);
    let properties = props(&[("P.1", "t.AttributeAndResource")]);
    let mut holder = EntitlementConfigHolder::new();

    run(&factory, &properties, &mut holder).expect("scan succeeds");

    assert_eq!(holder.attribute_finders().len(), 1);
    assert!(holder.resource_finders().is_empty());
    assert_eq!(holder.registration_count(), 1);
}

#[test]
fn extension_without_roles_is_unrecognized() {
    let log = InitLog::default();
    let factory = factory_with_recorders(&log);
    let properties = props(&[("P.1", "t.A"), ("P.2", "t.Unroled")]);
    let mut holder = EntitlementConfigHolder::new();

    let err = run(&factory, &properties, &mut holder).expect_err("unroled must fail");

    match err {
        ExtensionFinderError::Configuration {
            index,
            source: ExtensionConfigurerError::Unrecognized { type_name },
            ..
        } => {
            assert_eq!(index, 2);
            assert!(type_name.ends_with("Unroled"), "got {type_name}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(holder.registration_count(), 1);
}

#[test]
fn init_failure_propagates_as_configuration_error() {
    let log = InitLog::default();
    let factory = factory_with_recorders(&log);
    let properties = props(&[("P.1", "t.RequiresEndpoint")]);
    let mut holder = EntitlementConfigHolder::new();

    let err = run(&factory, &properties, &mut holder).expect_err("init must fail");

    match &err {
        ExtensionFinderError::Configuration {
            source: ExtensionConfigurerError::Initialization { source, .. },
            ..
        } => assert!(source.message().contains("endpoint")),
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(holder.resource_finders().is_empty());

    let properties = props(&[
        ("P.1", "t.RequiresEndpoint"),
        ("P.1.config.endpoint", "https://pip.local"),
    ]);
    run(&factory, &properties, &mut holder).expect("configured extension succeeds");
    assert_eq!(holder.resource_finders().len(), 1);
}

#[test]
fn panicking_constructor_is_an_instantiation_failure() {
    let mut factory = ExtensionFactory::new();
    factory
        .register("t.Broken", || -> Box<dyn Extension> {
            panic!("constructor exploded")
        })
        .expect("registration");
    let mut holder = EntitlementConfigHolder::new();

    let err = run(&factory, &props(&[("P.1", "t.Broken")]), &mut holder)
        .expect_err("panicking constructor must fail");

    match err {
        ExtensionFinderError::Instantiation { index, reason, .. } => {
            assert_eq!(index, 1);
            assert!(reason.contains("constructor exploded"), "got {reason}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(holder.is_empty());
}
