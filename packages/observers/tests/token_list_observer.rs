use std::cell::RefCell;
use std::rc::Rc;

use impulse_dom::{document, fixture, run_microtasks, Element};
use impulse_observers::{Token, TokenListObserver, TokenListObserverDelegate};
use pretty_assertions::assert_eq;

/// Logs `+content` for matched tokens and `-content` for unmatched ones.
#[derive(Default)]
struct Spy {
    log: RefCell<Vec<String>>,
    tokens: RefCell<Vec<Token>>,
}

impl Spy {
    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.log.borrow_mut())
    }
}

impl TokenListObserverDelegate for Spy {
    fn token_matched(&self, token: &Token) {
        self.log.borrow_mut().push(format!("+{}", token.content));
        self.tokens.borrow_mut().push(token.clone());
    }

    fn token_unmatched(&self, token: &Token) {
        self.log.borrow_mut().push(format!("-{}", token.content));
    }
}

fn setup() -> (Element, Rc<Spy>, TokenListObserver) {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    let el = fixture(r#"<div data-test="foo bar"><span></span></div>"#).unwrap();
    let spy = Rc::new(Spy::default());
    let observer = TokenListObserver::new(el, "data-test", Rc::downgrade(&spy));
    observer.start();
    (el, spy, observer)
}

#[test]
fn matches_the_initial_tokens() {
    let (el, spy, observer) = setup();
    assert_eq!(spy.take(), ["+foo", "+bar"]);

    let token = spy.tokens.borrow()[0].clone();
    assert_eq!(
        token,
        Token {
            element: el,
            attribute_name: "data-test".to_string(),
            content: "foo".to_string(),
        }
    );
    let contents: Vec<String> = observer.tokens_for(el).into_iter().map(|t| t.content).collect();
    assert_eq!(contents, ["foo", "bar"]);
}

#[test]
fn adding_a_token_in_the_middle() {
    let (el, spy, _observer) = setup();
    spy.take();
    el.set_attribute("data-test", "foo baz bar").unwrap();
    run_microtasks();
    assert_eq!(spy.take(), ["+baz"]);
}

#[test]
fn removing_a_token() {
    let (el, spy, _observer) = setup();
    spy.take();
    el.set_attribute("data-test", "bar").unwrap();
    run_microtasks();
    assert_eq!(spy.take(), ["-foo"]);
}

#[test]
fn removing_all_tokens() {
    let (el, spy, observer) = setup();
    spy.take();
    el.set_attribute("data-test", "").unwrap();
    run_microtasks();
    assert_eq!(spy.take(), ["-foo", "-bar"]);
    assert!(observer.tokens_for(el).is_empty());
}

#[test]
fn removing_the_only_token() {
    let (el, spy, _observer) = setup();
    el.set_attribute("data-test", "foo").unwrap();
    run_microtasks();
    spy.take();

    el.set_attribute("data-test", "").unwrap();
    run_microtasks();
    assert_eq!(spy.take(), ["-foo"]);
}

#[test]
fn replacing_tokens_unmatches_before_matching() {
    let (el, spy, _observer) = setup();
    spy.take();
    el.set_attribute("data-test", "qux bar quux").unwrap();
    run_microtasks();
    assert_eq!(spy.take(), ["-foo", "+qux", "+quux"]);
}

#[test]
fn reordering_and_whitespace_changes_are_silent() {
    let (el, spy, _observer) = setup();
    spy.take();
    el.set_attribute("data-test", "  bar\n\tfoo  bar ").unwrap();
    run_microtasks();
    assert!(spy.take().is_empty());
}

#[test]
fn removing_the_attribute_unmatches_remembered_tokens() {
    let (el, spy, _observer) = setup();
    spy.take();
    el.remove_attribute("data-test");
    run_microtasks();
    assert_eq!(spy.take(), ["-foo", "-bar"]);
}

#[test]
fn edits_between_checkpoints_are_diffed_against_the_last_seen_tokens() {
    let (el, spy, _observer) = setup();
    spy.take();
    el.set_attribute("data-test", "one").unwrap();
    el.set_attribute("data-test", "foo bar two").unwrap();
    run_microtasks();
    assert_eq!(spy.take(), ["+two"]);
}

#[test]
fn removed_elements_unmatch_their_tokens() {
    let (el, spy, _observer) = setup();
    let span = el.first_element_child().unwrap();
    span.set_attribute("data-test", "a b").unwrap();
    run_microtasks();
    assert_eq!(spy.take(), ["+foo", "+bar", "+a", "+b"]);

    span.remove();
    run_microtasks();
    assert_eq!(spy.take(), ["-a", "-b"]);

    document().body().append_child(span).unwrap();
    run_microtasks();
    assert!(spy.take().is_empty());
}

#[test]
fn unmatch_all_forgets_every_token() {
    let (el, spy, observer) = setup();
    spy.take();
    observer.unmatch_all();
    assert_eq!(spy.take(), ["-foo", "-bar"]);
    assert!(observer.tokens_for(el).is_empty());
}
