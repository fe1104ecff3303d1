use std::cell::RefCell;
use std::rc::Rc;

use impulse_dom::{document, fixture, run_microtasks, DomError, Element};
use impulse_observers::{SelectorObserver, SelectorObserverDelegate};
use pretty_assertions::assert_eq;

#[derive(Default)]
struct Spy {
    log: RefCell<Vec<String>>,
}

impl Spy {
    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.log.borrow_mut())
    }
}

impl SelectorObserverDelegate for Spy {
    fn element_connected(&self, element: Element) {
        self.log.borrow_mut().push(format!("connected {}", element.id()));
    }

    fn element_disconnected(&self, element: Element) {
        self.log.borrow_mut().push(format!("disconnected {}", element.id()));
    }
}

fn observe(root: Element, selector: &str) -> (Rc<Spy>, SelectorObserver) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let spy = Rc::new(Spy::default());
    let observer = SelectorObserver::new(root, selector, Rc::downgrade(&spy)).unwrap();
    observer.start();
    (spy, observer)
}

#[test]
fn connects_matching_elements() {
    let root = fixture(
        r#"<div class="card" id="root"><p class="card" id="a"></p><p id="b"></p><span class="card" id="c"></span></div>"#,
    )
    .unwrap();
    let (spy, observer) = observe(root, "p.card, span");
    assert_eq!(spy.take(), ["connected a", "connected c"]);
    assert_eq!(observer.selector().as_str(), "p.card, span");
}

#[test]
fn the_root_is_included_when_it_matches() {
    let root = fixture(r#"<div class="card" id="root"><p class="card" id="a"></p></div>"#).unwrap();
    let (spy, _observer) = observe(root, ".card");
    assert_eq!(spy.take(), ["connected root", "connected a"]);
}

#[test]
fn class_changes_move_elements_in_and_out() {
    let root = fixture(r#"<div><p id="a"></p><p id="b" class="active"></p></div>"#).unwrap();
    let (spy, observer) = observe(root, ".active");
    assert_eq!(spy.take(), ["connected b"]);

    let a = document().get_element_by_id("a").unwrap();
    let b = document().get_element_by_id("b").unwrap();
    a.class_list().add("active").unwrap();
    b.class_list().remove("active").unwrap();
    run_microtasks();
    assert_eq!(spy.take(), ["connected a", "disconnected b"]);

    a.class_list().add("other").unwrap();
    run_microtasks();
    assert!(spy.take().is_empty());
    assert_eq!(observer.elements(), [a]);
}

#[test]
fn attribute_selectors_follow_their_values() {
    let root = fixture(r#"<div><p id="a" data-state="open"></p></div>"#).unwrap();
    let (spy, _observer) = observe(root, r#"[data-state="open"]"#);
    assert_eq!(spy.take(), ["connected a"]);

    let a = document().get_element_by_id("a").unwrap();
    a.set_attribute("data-state", "closed").unwrap();
    run_microtasks();
    assert_eq!(spy.take(), ["disconnected a"]);

    a.set_attribute("data-state", "open").unwrap();
    run_microtasks();
    assert_eq!(spy.take(), ["connected a"]);
}

#[test]
fn inserted_subtrees_are_scanned() {
    let root = fixture("<div></div>").unwrap();
    let (spy, _observer) = observe(root, "ul > li");

    root.set_inner_html(r#"<ul id="list"><li id="one"></li><li id="two"></li></ul>"#)
        .unwrap();
    run_microtasks();
    assert_eq!(spy.take(), ["connected one", "connected two"]);

    root.set_inner_html("").unwrap();
    run_microtasks();
    assert_eq!(spy.take(), ["disconnected one", "disconnected two"]);
}

#[test]
fn stop_processes_pending_mutations() {
    let root = fixture(r#"<div><p id="a" class="x"></p></div>"#).unwrap();
    let (spy, observer) = observe(root, ".x");
    spy.take();

    document().get_element_by_id("a").unwrap().remove();
    observer.stop();
    assert_eq!(spy.take(), ["disconnected a"]);
}

#[test]
fn malformed_selectors_are_rejected() {
    let root = fixture("<div></div>").unwrap();
    let spy = Rc::new(Spy::default());
    for selector in ["", "div >", "[data-x", "a:hover"] {
        let result = SelectorObserver::new(root, selector, Rc::downgrade(&spy));
        assert!(
            matches!(result, Err(DomError::InvalidSelector { .. })),
            "{selector:?} should be rejected"
        );
    }
}

#[test]
fn removed_subtrees_disconnect_elements_that_no_longer_match() {
    let root = fixture(r#"<div><section class="open" id="s"><p id="a"></p></section></div>"#)
        .unwrap();
    let (spy, observer) = observe(root, ".open p");
    assert_eq!(spy.take(), ["connected a"]);

    let section = document().get_element_by_id("s").unwrap();
    section.class_list().remove("open").unwrap();
    section.remove();
    run_microtasks();
    assert_eq!(spy.take(), ["disconnected a"]);
    assert!(observer.elements().is_empty());
}
