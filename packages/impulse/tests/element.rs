use std::cell::RefCell;

use impulse::{
    register, Definition, EmitOptions, Error, Host, ImpulseElement, PropertyDefinition,
    PropertyValue, TargetDefinition,
};
use impulse_dom::{document, fixture, DomError, Element, Event, ListenerOptions};
use pretty_assertions::assert_eq;
use serde_json::json;

thread_local! {
    static LOG: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

fn log(entry: impl Into<String>) {
    LOG.with(|log| log.borrow_mut().push(entry.into()));
}

fn take_log() -> Vec<String> {
    LOG.with(|log| std::mem::take(&mut *log.borrow_mut()))
}

struct Counter {
    host: Host<Counter>,
}

impl ImpulseElement for Counter {
    fn create(host: Host<Self>) -> Self {
        log("create");
        Self { host }
    }

    fn connected(&self) {
        log("connected");
    }

    fn disconnected(&self) {
        log("disconnected");
    }
}

fn counter() -> Definition<Counter> {
    Definition::new("x-counter")
        .property(
            PropertyDefinition::number("count")
                .on_change(|_, new, old| log(format!("count {old} -> {new}"))),
        )
        .property(
            PropertyDefinition::string("label")
                .default_value("clicks")
                .on_change(|_, new, old| log(format!("label {old} -> {new}"))),
        )
        .property(PropertyDefinition::boolean("newRecord"))
        .property(PropertyDefinition::array("tags"))
        .target(
            TargetDefinition::single("output")
                .on_connected(|_, _| log("output connected"))
                .on_disconnected(|_, _| log("output disconnected")),
        )
}

fn setup(html: &str) -> (Element, Host<Counter>) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    register(counter()).unwrap();
    let el = fixture(html).unwrap();
    let host = Host::<Counter>::from_element(el).unwrap();
    (el, host)
}

#[test]
fn callbacks_run_in_order() {
    let (el, host) = setup(r#"<x-counter><span data-target="x-counter.output"></span></x-counter>"#);
    assert_eq!(take_log(), ["create", "output connected", "connected"]);
    assert!(host.is_started());
    assert!(el.has_attribute("data-impulse-element"));

    el.remove();
    assert_eq!(take_log(), ["disconnected", "output disconnected"]);
    assert!(!host.is_started());

    document().body().append_child(el).unwrap();
    assert_eq!(take_log(), ["output connected", "connected"]);
}

#[test]
fn defaults_are_written_without_change_callbacks() {
    let (el, host) = setup("<x-counter></x-counter>");
    assert_eq!(el.get_attribute("count").as_deref(), Some("0"));
    assert_eq!(el.get_attribute("label").as_deref(), Some("clicks"));
    assert!(!el.has_attribute("new-record"));
    assert_eq!(el.get_attribute("tags").as_deref(), Some("[]"));
    assert_eq!(take_log(), ["create", "connected"]);

    assert_eq!(host.get("count"), Some(PropertyValue::Number(0.0)));
    assert_eq!(host.get("newRecord"), Some(PropertyValue::Boolean(false)));
}

#[test]
fn present_attributes_win_over_defaults() {
    let (el, host) = setup(r#"<x-counter label="hits" count="3"></x-counter>"#);
    assert_eq!(el.get_attribute("label").as_deref(), Some("hits"));
    assert_eq!(host.get("count").and_then(|count| count.as_f64()), Some(3.0));
    assert_eq!(take_log(), ["create", "connected"]);
}

#[test]
fn attribute_changes_call_change_hooks() {
    let (el, host) = setup("<x-counter></x-counter>");
    take_log();

    el.set_attribute("count", "2").unwrap();
    host.set("count", 5).unwrap();
    host.set("label", "taps").unwrap();
    assert_eq!(
        take_log(),
        ["count 0 -> 2", "count 2 -> 5", "label clicks -> taps"]
    );

    // Same value after parsing.
    el.set_attribute("count", "5.0").unwrap();
    el.set_attribute("count", "5.0").unwrap();
    assert!(take_log().is_empty());

    host.remove("label").unwrap();
    assert_eq!(take_log(), ["label taps -> "]);
}

#[test]
fn changes_before_connecting_are_ignored() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    register(counter()).unwrap();
    let el = document().create_element("x-counter").unwrap();
    el.set_attribute("count", "7").unwrap();
    assert_eq!(take_log(), ["create"]);

    document().body().append_child(el).unwrap();
    assert_eq!(take_log(), ["connected"]);
    assert_eq!(el.get_attribute("count").as_deref(), Some("7"));
}

#[test]
fn elements_upgrade_when_registered_late() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let el = fixture("<x-counter></x-counter>").unwrap();
    assert!(Host::<Counter>::from_element(el).is_none());

    register(counter()).unwrap();
    assert_eq!(take_log(), ["create", "connected"]);
    assert!(Host::<Counter>::from_element(el).is_some());
    assert!(impulse::is_registered::<Counter>());
}

#[test]
fn serialized_values() {
    let (_el, host) = setup("<x-counter></x-counter>");
    host.set_serialized("tags", &["a", "b"]).unwrap();
    assert_eq!(host.element().get_attribute("tags").as_deref(), Some(r#"["a","b"]"#));
    assert_eq!(
        host.deserialize::<Vec<String>>("tags"),
        Some(vec!["a".to_string(), "b".to_string()])
    );

    host.set("newRecord", true).unwrap();
    assert_eq!(host.element().get_attribute("new-record").as_deref(), Some(""));
    assert_eq!(host.deserialize::<bool>("newRecord"), Some(true));
}

#[test]
fn unknown_keys_are_errors() {
    let (_el, host) = setup("<x-counter></x-counter>");
    assert_eq!(
        host.set("missing", 1),
        Err(Error::UnknownKey {
            tag: "x-counter".into(),
            key: "missing".into()
        })
    );
    assert!(host.property("missing").is_none());
    assert_eq!(host.property("newRecord").unwrap().attribute(), "new-record");
}

#[test]
fn with_borrows_the_value() {
    let (el, host) = setup("<x-counter></x-counter>");
    assert_eq!(host.with(|counter| counter.host.element()), Some(el));
    assert_eq!(host.identifier(), "x-counter");
}

struct Other;

impl ImpulseElement for Other {
    fn create(_host: Host<Self>) -> Self {
        Other
    }
}

#[test]
fn registration_rules() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    register(counter()).unwrap();
    assert_eq!(register(counter()), Ok(()));

    assert_eq!(
        register(Definition::<Counter>::new("x-tally")),
        Err(Error::AlreadyDefined("x-counter".into()))
    );
    assert_eq!(
        register(Definition::<Other>::new("x-counter")),
        Err(Error::AlreadyDefined("x-counter".into()))
    );
    assert!(matches!(
        register(Definition::<Other>::new("other")),
        Err(Error::Dom(DomError::InvalidCharacter(_)))
    ));
    assert!(!impulse::is_registered::<Other>());

    let duplicate = Definition::<Other>::new("x-other")
        .property(PropertyDefinition::string("name"))
        .target(TargetDefinition::multiple("name"));
    assert!(matches!(register(duplicate), Err(Error::DuplicateKey { .. })));
    assert_eq!(register(Definition::<Other>::new("x-other")), Ok(()));
}

#[test]
fn emit_prefixes_with_the_identifier() {
    let (_el, host) = setup("<x-counter></x-counter>");
    let seen = std::rc::Rc::new(RefCell::new(Vec::new()));
    for name in ["x-counter:changed", "changed", "counter:changed"] {
        let seen = seen.clone();
        document().add_event_listener(name, ListenerOptions::new(), move |event: &Event| {
            seen.borrow_mut()
                .push((event.event_type().to_string(), event.detail().clone()));
        });
    }

    let event = host.emit("changed", EmitOptions::new().detail(json!({ "count": 1 })));
    assert!(event.bubbles());
    assert!(event.composed());
    host.emit("changed", EmitOptions::new().no_prefix());
    host.emit("changed", EmitOptions::new().prefix("counter").bubbles(false));

    assert_eq!(
        *seen.borrow(),
        [
            ("x-counter:changed".to_string(), json!({ "count": 1 })),
            ("changed".to_string(), json!({})),
        ]
    );

    let target = fixture("<div></div>").unwrap();
    let hits = std::rc::Rc::new(RefCell::new(0));
    let counted = hits.clone();
    target.add_event_listener("x-counter:ping", ListenerOptions::new(), move |_| {
        *counted.borrow_mut() += 1;
    });
    host.emit("ping", EmitOptions::new().target(target));
    assert_eq!(*hits.borrow(), 1);
}
