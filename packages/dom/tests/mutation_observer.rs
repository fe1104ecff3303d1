use std::cell::RefCell;
use std::rc::Rc;

use impulse_dom::{
    document, fixture, queue_microtask, run_microtasks, DomError, MutationObserver,
    MutationObserverInit, MutationRecord,
};
use pretty_assertions::assert_eq;

fn recording_observer() -> (MutationObserver, Rc<RefCell<Vec<Vec<MutationRecord>>>>) {
    let batches = Rc::new(RefCell::new(Vec::new()));
    let observer = MutationObserver::new({
        let batches = batches.clone();
        move |records, _| batches.borrow_mut().push(records)
    });
    (observer, batches)
}

#[test]
fn records_are_delivered_at_the_checkpoint() {
    let root = fixture("<div></div>").unwrap();
    let (observer, batches) = recording_observer();
    observer
        .observe(root, MutationObserverInit::new().attributes())
        .unwrap();

    root.set_attribute("a", "1").unwrap();
    root.set_attribute("b", "2").unwrap();
    assert!(batches.borrow().is_empty());

    run_microtasks();
    let batches = batches.borrow();
    assert_eq!(batches.len(), 1);
    assert_eq!(
        batches[0],
        vec![
            MutationRecord::Attributes {
                target: root.as_node(),
                attribute_name: "a".into(),
                old_value: None,
            },
            MutationRecord::Attributes {
                target: root.as_node(),
                attribute_name: "b".into(),
                old_value: None,
            },
        ]
    );
}

#[test]
fn attribute_filter_and_old_value() {
    let root = fixture(r#"<div data-x="old"></div>"#).unwrap();
    let (observer, batches) = recording_observer();
    observer
        .observe(
            root,
            MutationObserverInit::new()
                .attribute_filter(["data-x"])
                .attribute_old_value(),
        )
        .unwrap();

    root.set_attribute("data-y", "ignored").unwrap();
    root.set_attribute("data-x", "new").unwrap();
    root.remove_attribute("data-x");
    run_microtasks();

    assert_eq!(
        batches.borrow()[0],
        vec![
            MutationRecord::Attributes {
                target: root.as_node(),
                attribute_name: "data-x".into(),
                old_value: Some("old".into()),
            },
            MutationRecord::Attributes {
                target: root.as_node(),
                attribute_name: "data-x".into(),
                old_value: Some("new".into()),
            },
        ]
    );
}

#[test]
fn child_list_records_with_subtree() {
    let root = fixture("<div><section></section></div>").unwrap();
    let section = root.first_element_child().unwrap();
    let (observer, batches) = recording_observer();
    observer
        .observe(root, MutationObserverInit::new().child_list().subtree())
        .unwrap();

    let first = document().create_element("p").unwrap();
    let second = document().create_element("p").unwrap();
    section.append_child(first).unwrap();
    section.append_child(second).unwrap();
    first.remove();
    run_microtasks();

    assert_eq!(
        batches.borrow()[0],
        vec![
            MutationRecord::ChildList {
                target: section.as_node(),
                added_nodes: vec![first.as_node()],
                removed_nodes: vec![],
                previous_sibling: None,
                next_sibling: None,
            },
            MutationRecord::ChildList {
                target: section.as_node(),
                added_nodes: vec![second.as_node()],
                removed_nodes: vec![],
                previous_sibling: Some(first.as_node()),
                next_sibling: None,
            },
            MutationRecord::ChildList {
                target: section.as_node(),
                added_nodes: vec![],
                removed_nodes: vec![first.as_node()],
                previous_sibling: None,
                next_sibling: Some(second.as_node()),
            },
        ]
    );
}

#[test]
fn without_subtree_only_the_target_is_observed() {
    let root = fixture("<div><section></section></div>").unwrap();
    let section = root.first_element_child().unwrap();
    let (observer, batches) = recording_observer();
    observer
        .observe(root, MutationObserverInit::new().child_list().attributes())
        .unwrap();

    section.set_attribute("hidden", "").unwrap();
    section
        .append_child(document().create_element("p").unwrap())
        .unwrap();
    run_microtasks();

    assert!(batches.borrow().is_empty());
}

#[test]
fn one_record_per_observer() {
    let root = fixture("<div><p></p></div>").unwrap();
    let child = root.first_element_child().unwrap();
    let (observer, batches) = recording_observer();
    // Both registrations match a change to `child`.
    observer
        .observe(root, MutationObserverInit::new().attributes().subtree())
        .unwrap();
    observer
        .observe(child, MutationObserverInit::new().attributes())
        .unwrap();

    child.set_attribute("title", "x").unwrap();
    run_microtasks();
    assert_eq!(batches.borrow()[0].len(), 1);
}

#[test]
fn invalid_options() {
    let root = fixture("<div></div>").unwrap();
    let observer = MutationObserver::new(|_, _| {});
    assert!(matches!(
        observer.observe(root, MutationObserverInit::new()),
        Err(DomError::InvalidObserverOptions(_))
    ));
    assert!(matches!(
        observer.observe(root, MutationObserverInit::new().subtree()),
        Err(DomError::InvalidObserverOptions(_))
    ));

    let mut contradiction = MutationObserverInit::new().child_list().attribute_old_value();
    contradiction.attributes = Some(false);
    assert!(matches!(
        observer.observe(root, contradiction),
        Err(DomError::InvalidObserverOptions(_))
    ));
}

#[test]
fn take_records_and_disconnect() {
    let root = fixture("<div></div>").unwrap();
    let (observer, batches) = recording_observer();
    observer
        .observe(root, MutationObserverInit::new().attributes())
        .unwrap();

    root.set_attribute("a", "1").unwrap();
    assert_eq!(observer.take_records().len(), 1);
    run_microtasks();
    assert!(batches.borrow().is_empty());

    root.set_attribute("a", "2").unwrap();
    observer.disconnect();
    root.set_attribute("a", "3").unwrap();
    run_microtasks();
    assert!(batches.borrow().is_empty());
}

#[test]
fn dropping_the_observer_stops_delivery() {
    let root = fixture("<div></div>").unwrap();
    let (observer, batches) = recording_observer();
    observer
        .observe(root, MutationObserverInit::new().attributes())
        .unwrap();
    root.set_attribute("a", "1").unwrap();
    drop(observer);
    run_microtasks();
    assert!(batches.borrow().is_empty());
}

#[test]
fn observers_are_notified_in_creation_order() {
    let root = fixture("<div></div>").unwrap();
    let log = Rc::new(RefCell::new(Vec::new()));
    let first = MutationObserver::new({
        let log = log.clone();
        move |_, _| log.borrow_mut().push("first")
    });
    let second = MutationObserver::new({
        let log = log.clone();
        move |_, _| log.borrow_mut().push("second")
    });
    second
        .observe(root, MutationObserverInit::new().attributes())
        .unwrap();
    first
        .observe(root, MutationObserverInit::new().attributes())
        .unwrap();

    root.set_attribute("a", "1").unwrap();
    run_microtasks();
    assert_eq!(*log.borrow(), vec!["first", "second"]);
}

#[test]
fn mutations_inside_a_callback_are_delivered_by_the_same_checkpoint() {
    let root = fixture("<div></div>").unwrap();
    let count = Rc::new(RefCell::new(0));
    let observer = MutationObserver::new({
        let count = count.clone();
        move |records, _| {
            *count.borrow_mut() += records.len();
            if let MutationRecord::Attributes { target, .. } = &records[0] {
                let element = target.as_element().unwrap();
                if element.get_attribute("step").as_deref() == Some("1") {
                    element.set_attribute("step", "2").unwrap();
                    // Nested checkpoints do nothing.
                    run_microtasks();
                }
            }
        }
    });
    observer
        .observe(root, MutationObserverInit::new().attributes())
        .unwrap();

    root.set_attribute("step", "1").unwrap();
    run_microtasks();
    assert_eq!(*count.borrow(), 2);
}

#[test]
fn microtasks_run_in_fifo_order() {
    let log = Rc::new(RefCell::new(Vec::new()));
    for i in 0..3 {
        let log = log.clone();
        queue_microtask(move || {
            log.borrow_mut().push(i);
            if i == 0 {
                let log = log.clone();
                queue_microtask(move || log.borrow_mut().push(3));
            }
        });
    }
    run_microtasks();
    assert_eq!(*log.borrow(), vec![0, 1, 2, 3]);
}
