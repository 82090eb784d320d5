#![allow(non_snake_case)]

use super::*;
use crate::component::Instance;
use crate::test_support::{EventLog, Tracked, logging_callback, publish, ranked};
use depman_registry::InMemoryRegistry;
use std::sync::atomic::{AtomicBool, Ordering};

const STORE: &str = "org.example.Store";

/// Owner recording the availability reports it receives
struct RecordingOwner {
    log: EventLog,
    instances: Vec<Instance>,
    registered: AtomicBool,
}

impl RecordingOwner {
    fn new(log: &EventLog) -> Arc<Self> {
        Arc::new(Self {
            log: log.clone(),
            instances: vec![Tracked::instance(log)],
            registered: AtomicBool::new(false),
        })
    }
}

impl DependencyService for RecordingOwner {
    fn dependency_available(&self, _: &dyn Dependency) {
        self.log.push("available");
    }

    fn dependency_unavailable(&self, _: &dyn Dependency) {
        self.log.push("unavailable");
    }

    fn dependency_changed(&self, _: &dyn Dependency) {
        self.log.push("changed");
    }

    fn service(&self) -> Option<Instance> {
        self.instances.first().cloned()
    }

    fn init_service(&self) -> Option<Instance> {
        self.service()
    }

    fn composition_instances(&self) -> Vec<Instance> {
        self.instances.clone()
    }

    fn is_registered(&self) -> bool {
        self.registered.load(Ordering::SeqCst)
    }

    fn name(&self) -> String {
        "owner".to_string()
    }
}

struct Fixture {
    registry: Arc<InMemoryRegistry>,
    log: EventLog,
    owner: Arc<RecordingOwner>,
    handle: Arc<dyn DependencyService>,
    dependency: Arc<ServiceDependency>,
}

impl Fixture {
    fn new() -> Self {
        let registry = Arc::new(InMemoryRegistry::new());
        let log = EventLog::default();
        let owner = RecordingOwner::new(&log);
        let handle: Arc<dyn DependencyService> = owner.clone();
        let dependency = ServiceDependency::new(registry.clone());
        dependency.set_service(STORE, None).unwrap();
        dependency
            .set_callbacks(
                Some(logging_callback("added")),
                Some(logging_callback("changed")),
                Some(logging_callback("removed")),
            )
            .unwrap();
        Self {
            registry,
            log,
            owner,
            handle,
            dependency,
        }
    }

    fn start(&self) {
        self.dependency.start(&self.handle);
    }

    fn stop(&self) {
        self.dependency.stop(&self.handle);
    }

    fn publish(&self, properties: Properties) -> Box<dyn depman_core::RegistrationHandle> {
        publish(&*self.registry, STORE, properties)
    }
}

// ---- configuration ----

#[test]
fn ServiceDependency___defaults___required_with_injection() {
    let fixture = Fixture::new();

    assert!(fixture.dependency.is_required());
    assert!(fixture.dependency.is_auto_config());
    assert_eq!(fixture.dependency.cardinality(), Cardinality::Single);
    assert_eq!(fixture.dependency.interface().as_deref(), Some(STORE));
    assert_eq!(fixture.dependency.kind(), "service");
}

#[test]
fn ServiceDependency___invalid_filter___is_rejected() {
    let dependency = ServiceDependency::new(Arc::new(InMemoryRegistry::new()));

    let result = dependency.set_service(STORE, Some("(region=eu"));

    assert!(matches!(result, Err(DmError::InvalidFilter(_))));
    assert!(dependency.filter().is_none());
}

#[test]
fn ServiceDependency___configured_while_started___is_invalid_state() {
    let fixture = Fixture::new();
    fixture.start();

    let result = fixture.dependency.set_required(false);

    assert!(matches!(result, Err(DmError::InvalidState { .. })));
    assert!(fixture.dependency.is_required());
}

#[test]
fn ServiceDependency___name___shows_combined_filter() {
    let dependency = ServiceDependency::new(Arc::new(InMemoryRegistry::new()));
    dependency.set_service(STORE, Some("(region=eu)")).unwrap();

    assert_eq!(
        dependency.name(),
        "(&(objectClass=org.example.Store)(region=eu))"
    );
}

#[test]
fn ServiceDependency___start_without_service___stays_stopped() {
    let registry = Arc::new(InMemoryRegistry::new());
    let owner: Arc<dyn DependencyService> = RecordingOwner::new(&EventLog::default());
    let dependency = ServiceDependency::new(registry.clone());

    dependency.start(&owner);

    assert!(!dependency.is_started());
    assert_eq!(registry.listener_count(), 0);
}

// ---- availability ----

#[test]
fn ServiceDependency___started_without_providers___required_is_unavailable() {
    let fixture = Fixture::new();

    fixture.start();

    assert!(fixture.dependency.is_started());
    assert!(!fixture.dependency.is_available());
    assert!(fixture.log.events().is_empty());
    assert_eq!(fixture.registry.listener_count(), 1);
}

#[test]
fn ServiceDependency___optional_without_providers___is_available() {
    let fixture = Fixture::new();
    fixture.dependency.set_required(false).unwrap();

    fixture.start();

    assert!(fixture.dependency.is_available());
}

#[test]
fn ServiceDependency___first_required_provider___reports_available_without_callback() {
    let fixture = Fixture::new();
    fixture.start();

    let provider = fixture.publish(Properties::new());

    assert_eq!(fixture.log.events(), vec!["available"]);
    assert!(fixture.dependency.is_available());
    let reference = provider.reference().unwrap();
    assert_eq!(fixture.registry.use_count(&reference), Some(1));
}

#[test]
fn ServiceDependency___second_required_provider___reports_changed_and_added() {
    let fixture = Fixture::new();
    fixture.start();
    let _first = fixture.publish(Properties::new());

    let _second = fixture.publish(Properties::new());

    assert_eq!(fixture.log.events(), vec!["available", "changed", "added:2"]);
    assert_eq!(fixture.dependency.tracked_count(), 2);
}

#[test]
fn ServiceDependency___existing_providers___tracked_on_start() {
    let fixture = Fixture::new();
    let _first = fixture.publish(Properties::new());
    let _second = fixture.publish(Properties::new());

    fixture.start();

    assert_eq!(fixture.dependency.tracked_count(), 2);
    assert_eq!(fixture.log.events(), vec!["available", "changed", "added:2"]);
}

#[test]
fn ServiceDependency___last_required_provider_leaves___reports_unavailable() {
    let fixture = Fixture::new();
    fixture.start();
    let provider = fixture.publish(Properties::new());
    fixture.log.clear();

    provider.unregister().unwrap();

    assert_eq!(fixture.log.events(), vec!["unavailable"]);
    assert!(!fixture.dependency.is_available());
    assert!(fixture.dependency.service().is_absent());
}

#[test]
fn ServiceDependency___required_removal___delivered_by_owner_later() {
    let fixture = Fixture::new();
    fixture.start();
    let provider = fixture.publish(Properties::new());
    provider.unregister().unwrap();
    fixture.log.clear();

    fixture.dependency.invoke_removed(&*fixture.handle);

    assert_eq!(fixture.log.events(), vec!["removed:1"]);
}

#[test]
fn ServiceDependency___one_of_two_providers_leaves___reports_changed_and_removed() {
    let fixture = Fixture::new();
    fixture.start();
    let first = fixture.publish(Properties::new());
    let _second = fixture.publish(Properties::new());
    fixture.log.clear();

    first.unregister().unwrap();

    assert_eq!(fixture.log.events(), vec!["changed", "removed:1"]);
    assert!(fixture.dependency.is_available());
}

#[test]
fn ServiceDependency___optional_provider_lifecycle___callbacks_fire_directly() {
    let fixture = Fixture::new();
    fixture.dependency.set_required(false).unwrap();
    fixture.start();

    let provider = fixture.publish(Properties::new());
    provider.unregister().unwrap();

    assert_eq!(
        fixture.log.events(),
        vec!["available", "added:1", "unavailable", "removed:1"]
    );
}

#[test]
fn ServiceDependency___modified_provider___changed_callback_only_when_registered() {
    let fixture = Fixture::new();
    fixture.start();
    let provider = fixture.publish(Properties::new());
    fixture.log.clear();

    provider.set_properties(ranked(3)).unwrap();
    fixture.owner.registered.store(true, Ordering::SeqCst);
    provider.set_properties(ranked(4)).unwrap();

    assert_eq!(fixture.log.events(), vec!["changed", "changed", "changed:1"]);
    assert_eq!(fixture.dependency.service_reference().unwrap().ranking(), 4);
}

#[test]
fn ServiceDependency___provider_leaves_filter___is_removed() {
    let fixture = Fixture::new();
    fixture
        .dependency
        .set_service(STORE, Some("(region=eu)"))
        .unwrap();
    fixture.start();
    let mut eu = Properties::new();
    eu.insert("region".to_string(), serde_json::json!("eu"));
    let provider = fixture.publish(eu);
    fixture.log.clear();

    let mut us = Properties::new();
    us.insert("region".to_string(), serde_json::json!("us"));
    provider.set_properties(us).unwrap();

    assert_eq!(fixture.log.events(), vec!["unavailable"]);
    assert_eq!(fixture.dependency.tracked_count(), 0);
}

#[test]
fn ServiceDependency___provider_enters_filter___is_added() {
    let fixture = Fixture::new();
    fixture
        .dependency
        .set_service(STORE, Some("(region=eu)"))
        .unwrap();
    fixture.start();
    let provider = fixture.publish(Properties::new());
    assert!(fixture.log.events().is_empty());

    let mut eu = Properties::new();
    eu.insert("region".to_string(), serde_json::json!("eu"));
    provider.set_properties(eu).unwrap();

    assert_eq!(fixture.log.events(), vec!["available"]);
}

// ---- selection and injection ----

#[test]
fn ServiceDependency___best_provider___highest_ranking_wins() {
    let fixture = Fixture::new();
    fixture.start();
    let _low = fixture.publish(ranked(1));
    let _high = fixture.publish(ranked(10));
    let _middle = fixture.publish(ranked(5));

    let best = fixture.dependency.service_reference().unwrap();
    let order: Vec<ServiceId> = fixture
        .dependency
        .references()
        .iter()
        .map(ServiceReference::id)
        .collect();

    assert_eq!(best.id(), ServiceId(2));
    assert_eq!(order, vec![ServiceId(2), ServiceId(3), ServiceId(1)]);
}

#[test]
fn ServiceDependency___equal_ranking___oldest_provider_wins() {
    let fixture = Fixture::new();
    fixture.start();
    let _first = fixture.publish(Properties::new());
    let _second = fixture.publish(Properties::new());

    assert_eq!(
        fixture.dependency.service_reference().unwrap().id(),
        ServiceId(1)
    );
}

#[test]
fn ServiceDependency___default_implementation___used_while_no_provider() {
    let fixture = Fixture::new();
    fixture
        .dependency
        .set_default_implementation(ServiceObject::new("fallback"))
        .unwrap();
    fixture.start();

    let value = fixture.dependency.service();

    let Value::Present(object) = value else {
        panic!("expected the default implementation");
    };
    assert_eq!(object.downcast_ref::<&'static str>(), Some(&"fallback"));
}

#[test]
fn ServiceDependency___named_injection___targets_named_slot() {
    let fixture = Fixture::new();
    fixture.dependency.set_auto_config_name("primary").unwrap();
    fixture.start();
    let _provider = fixture.publish(Properties::new());

    let injection = fixture.dependency.injection().unwrap();

    assert!(injection.targets("primary"));
    assert!(!injection.targets("secondary"));
    assert!(matches!(
        injection.value,
        Injected::Service {
            value: Value::Present(_),
            ..
        }
    ));
}

#[test]
fn ServiceDependency___aggregate_injection___lists_every_provider() {
    let fixture = Fixture::new();
    fixture
        .dependency
        .set_cardinality(Cardinality::Aggregate)
        .unwrap();
    fixture.start();
    let _first = fixture.publish(Properties::new());
    let _second = fixture.publish(Properties::new());

    let injection = fixture.dependency.injection().unwrap();

    let Injected::Services { values, .. } = injection.value else {
        panic!("expected an aggregate injection");
    };
    assert_eq!(values.len(), 2);
    assert_eq!(fixture.dependency.services().len(), 2);
}

#[test]
fn ServiceDependency___properties___are_best_provider_without_identity_keys() {
    let fixture = Fixture::new();
    fixture.start();
    let mut properties = ranked(2);
    properties.insert("region".to_string(), serde_json::json!("eu"));
    let _provider = fixture.publish(properties);

    let exposed = fixture.dependency.properties().unwrap();

    assert_eq!(exposed.get("region"), Some(&serde_json::json!("eu")));
    assert!(exposed.contains_key("service.ranking"));
    assert!(!exposed.contains_key("objectClass"));
    assert!(!exposed.contains_key("service.id"));
}

// ---- stop ----

#[test]
fn ServiceDependency___stop___unsubscribes_and_releases_providers() {
    let fixture = Fixture::new();
    fixture.start();
    let provider = fixture.publish(Properties::new());
    let reference = provider.reference().unwrap();
    fixture.log.clear();

    fixture.stop();

    assert!(!fixture.dependency.is_started());
    assert_eq!(fixture.registry.listener_count(), 0);
    assert_eq!(fixture.registry.use_count(&reference), Some(0));
    assert_eq!(fixture.log.events(), vec!["unavailable"]);
    assert_eq!(fixture.dependency.tracked_count(), 0);
}

#[test]
fn ServiceDependency___stop_optional___fires_removed_for_each_provider() {
    let fixture = Fixture::new();
    fixture.dependency.set_required(false).unwrap();
    fixture.start();
    let _first = fixture.publish(Properties::new());
    let _second = fixture.publish(ranked(1));
    fixture.log.clear();

    fixture.stop();

    assert_eq!(
        fixture.log.events(),
        vec!["unavailable", "removed:2", "removed:1"]
    );
}

#[test]
fn ServiceDependency___events_after_stop___are_ignored() {
    let fixture = Fixture::new();
    fixture.start();
    fixture.stop();
    fixture.log.clear();

    let _provider = fixture.publish(Properties::new());

    assert!(fixture.log.events().is_empty());
    assert_eq!(fixture.dependency.tracked_count(), 0);
}

#[test]
fn ServiceDependency___restart___tracks_again() {
    let fixture = Fixture::new();
    let _provider = fixture.publish(Properties::new());
    fixture.start();
    fixture.stop();

    fixture.start();

    assert_eq!(fixture.dependency.tracked_count(), 1);
    assert_eq!(fixture.registry.listener_count(), 1);
}

#[test]
fn ServiceDependency___debug___shows_filter_and_state() {
    let fixture = Fixture::new();

    let debug = format!("{:?}", fixture.dependency);

    assert!(debug.contains("objectClass=org.example.Store"));
    assert!(debug.contains("started: false"));
}
