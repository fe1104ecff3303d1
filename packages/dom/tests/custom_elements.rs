use std::cell::RefCell;
use std::rc::Rc;

use impulse_dom::{
    custom_elements, document, fixture, CustomElement, CustomElementDefinition, DomError, Element,
};
use pretty_assertions::assert_eq;

type Log = Rc<RefCell<Vec<String>>>;

struct Recorder {
    element: Element,
    log: Log,
}

impl CustomElement for Recorder {
    fn connected(&self) {
        self.log.borrow_mut().push(format!("connected {}", self.element.id()));
    }

    fn disconnected(&self) {
        self.log.borrow_mut().push(format!("disconnected {}", self.element.id()));
    }

    fn attribute_changed(&self, name: &str, old_value: Option<&str>, new_value: Option<&str>) {
        self.log
            .borrow_mut()
            .push(format!("{name}: {old_value:?} -> {new_value:?}"));
    }
}

fn define_recorder(name: &str) -> Log {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let log = Log::default();
    let definition = CustomElementDefinition::new({
        let log = log.clone();
        move |element| {
            log.borrow_mut().push("constructed".to_string());
            Recorder {
                element,
                log: log.clone(),
            }
        }
    })
    .observed_attributes(["open"]);
    custom_elements::define(name, definition).unwrap();
    log
}

#[test]
fn elements_are_upgraded_and_connected() {
    let log = define_recorder("x-recorder");
    let el = fixture(r#"<x-recorder id="a" open="yes"></x-recorder>"#).unwrap();

    assert!(custom_elements::upgraded(el).is_some());
    assert!(custom_elements::upgraded_as::<Recorder>(el).is_some());
    assert_eq!(
        *log.borrow(),
        vec![
            "constructed",
            r#"open: None -> Some("yes")"#,
            "connected a",
        ]
    );
}

#[test]
fn observed_attribute_changes() {
    let log = define_recorder("x-recorder");
    let el = fixture(r#"<x-recorder id="a"></x-recorder>"#).unwrap();
    log.borrow_mut().clear();

    el.set_attribute("open", "").unwrap();
    el.set_attribute("other", "ignored").unwrap();
    el.remove_attribute("open");

    assert_eq!(
        *log.borrow(),
        vec![r#"open: None -> Some("")"#, r#"open: Some("") -> None"#]
    );
}

#[test]
fn disconnect_and_reconnect_subtrees() {
    let log = define_recorder("x-recorder");
    let root = fixture(
        r#"<div><x-recorder id="outer"><x-recorder id="inner"></x-recorder></x-recorder></div>"#,
    )
    .unwrap();
    log.borrow_mut().clear();

    let outer = root.first_element_child().unwrap();
    outer.remove();
    document().body().append_child(outer).unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            "disconnected outer",
            "disconnected inner",
            "connected outer",
            "connected inner",
        ]
    );
}

#[test]
fn definition_upgrades_connected_elements() {
    let root = fixture(r#"<div><x-late id="one"></x-late><x-late id="two"></x-late></div>"#).unwrap();
    let detached = document().create_element("x-late").unwrap();
    detached.set_id("three").unwrap();

    let log = define_recorder("x-late");
    assert_eq!(
        *log.borrow(),
        vec!["constructed", "connected one", "constructed", "connected two"]
    );
    assert!(custom_elements::upgraded(detached).is_none());

    root.append_child(detached).unwrap();
    assert_eq!(log.borrow().last().map(String::as_str), Some("connected three"));
}

#[test]
fn reactions_queued_by_callbacks_run_after_the_current_one() {
    struct Spawner {
        element: Element,
        log: Log,
    }

    impl CustomElement for Spawner {
        fn connected(&self) {
            self.log.borrow_mut().push("spawner connected".into());
            let child = document().create_element("x-child").unwrap();
            self.element.append_child(child).unwrap();
            self.log.borrow_mut().push("spawner done".into());
        }
    }

    let child_log = define_recorder("x-child");
    let log = Log::default();
    custom_elements::define(
        "x-spawner",
        CustomElementDefinition::new({
            let log = log.clone();
            move |element| Spawner {
                element,
                log: log.clone(),
            }
        }),
    )
    .unwrap();

    fixture("<x-spawner></x-spawner>").unwrap();
    assert_eq!(*log.borrow(), vec!["spawner connected", "spawner done"]);
    assert_eq!(*child_log.borrow(), vec!["constructed", "connected "]);
}

#[test]
fn invalid_and_duplicate_definitions() {
    define_recorder("x-dup");
    assert!(custom_elements::is_defined("x-dup"));
    assert!(custom_elements::get("x-dup").is_some());
    assert!(matches!(
        custom_elements::define("x-dup", CustomElementDefinition::new(|element| Recorder {
            element,
            log: Log::default(),
        })),
        Err(DomError::NotSupported(_))
    ));

    for name in ["nodash", "X-Upper", "-leading", "has space-x"] {
        assert!(
            custom_elements::define(
                name,
                CustomElementDefinition::new(|element| Recorder {
                    element,
                    log: Log::default(),
                })
            )
            .is_err(),
            "{name}"
        );
    }
}
