#![allow(non_snake_case)]

use super::*;

struct Greeter {
    greeting: &'static str,
}

impl Component for Greeter {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct Other;

impl Component for Other {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[test]
fn Injection___unnamed___targets_every_slot() {
    let injection = Injection::new(None, Injected::Registration(None));

    assert!(injection.targets("registration"));
    assert!(injection.targets("anything"));
}

#[test]
fn Injection___named___targets_only_that_slot() {
    let injection = Injection::new(Some("primary".to_string()), Injected::Registration(None));

    assert!(injection.targets("primary"));
    assert!(!injection.targets("secondary"));
}

#[test]
fn component_ref___registered_instance___returns_concrete_type() {
    let instance: Instance = Arc::new(Greeter { greeting: "hello" });
    let object = ServiceObject::new(instance);

    let greeter = component_ref::<Greeter>(&object).unwrap();

    assert_eq!(greeter.greeting, "hello");
}

#[test]
fn component_ref___wrong_type___returns_none() {
    let instance: Instance = Arc::new(Greeter { greeting: "hello" });
    let object = ServiceObject::new(instance);

    assert!(component_ref::<Other>(&object).is_none());
}

#[test]
fn component_ref___plain_object___returns_none() {
    let object = ServiceObject::new("not a component");

    assert!(component_ref::<Greeter>(&object).is_none());
}

#[test]
fn downcast_instance___matching_type___returns_some() {
    let instance: Instance = Arc::new(Greeter { greeting: "hi" });

    assert_eq!(downcast_instance::<Greeter>(&instance).unwrap().greeting, "hi");
    assert!(downcast_instance::<Other>(&instance).is_none());
}

#[test]
fn Component___default_inject___ignores_value() {
    let greeter = Greeter { greeting: "hi" };

    greeter.inject(&Injection::new(None, Injected::Registration(None)));

    assert_eq!(greeter.greeting, "hi");
}

#[test]
fn Injected___debug___summarises_service_values() {
    let service = Injected::Service {
        interface: "org.example.Store".to_string(),
        value: Value::Absent,
    };
    let services = Injected::Services {
        interface: "org.example.Store".to_string(),
        values: Arc::from(vec![ServiceObject::new(1u8), ServiceObject::new(2u8)]),
    };

    let service_debug = format!("{service:?}");
    let services_debug = format!("{services:?}");

    assert!(service_debug.contains("present: false"));
    assert!(services_debug.contains("count: 2"));
}
