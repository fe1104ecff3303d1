use impulse_dom::{document, fixture, DomError, NodeType};
use pretty_assertions::assert_eq;

#[test]
fn fresh_document() {
    let doc = document();
    assert_eq!(doc.node_type(), NodeType::Document);
    assert_eq!(doc.document_element().local_name(), "html");
    assert_eq!(doc.head().parent_element(), Some(doc.document_element()));
    assert_eq!(doc.body().parent_element(), Some(doc.document_element()));
    assert!(doc.body().is_connected());
    assert!(doc.body().children().is_empty());
}

#[test]
fn append_and_insert_before() {
    let doc = document();
    let list = doc.create_element("ul").unwrap();
    let a = doc.create_element("li").unwrap();
    let b = doc.create_element("li").unwrap();
    let c = doc.create_element("li").unwrap();

    list.append_child(a).unwrap();
    list.append_child(c).unwrap();
    list.insert_before(b, Some(c.as_node())).unwrap();

    assert_eq!(list.children(), vec![a, b, c]);
    assert_eq!(b.previous_sibling(), Some(a.as_node()));
    assert_eq!(b.next_sibling(), Some(c.as_node()));
    assert!(!list.is_connected());

    doc.body().append_child(list).unwrap();
    assert!(b.is_connected());
    assert!(doc.body().contains(b));
    assert!(!b.contains(list));
}

#[test]
fn moving_a_node_detaches_it_first() {
    let doc = document();
    let first = doc.create_element("div").unwrap();
    let second = doc.create_element("div").unwrap();
    let child = doc.create_element("span").unwrap();

    first.append_child(child).unwrap();
    second.append_child(child).unwrap();

    assert!(first.children().is_empty());
    assert_eq!(second.children(), vec![child]);
    assert_eq!(child.parent_element(), Some(second));
}

#[test]
fn fragments_move_their_children() {
    let doc = document();
    let fragment = doc.create_document_fragment();
    let a = doc.create_element("a").unwrap();
    let b = doc.create_element("b").unwrap();
    fragment.append_child(a).unwrap();
    fragment.append_child(b).unwrap();

    doc.body().append_child(fragment).unwrap();

    assert!(fragment.child_nodes().is_empty());
    assert_eq!(doc.body().children(), vec![a, b]);
}

#[test]
fn hierarchy_errors() {
    let doc = document();
    let parent = doc.create_element("div").unwrap();
    let child = doc.create_element("div").unwrap();
    parent.append_child(child).unwrap();

    assert!(matches!(
        child.append_child(parent),
        Err(DomError::HierarchyRequest(_))
    ));
    assert!(matches!(
        parent.append_child(parent),
        Err(DomError::HierarchyRequest(_))
    ));

    let text = doc.create_text_node("text");
    assert!(matches!(
        text.append_child(doc.create_element("p").unwrap()),
        Err(DomError::HierarchyRequest(_))
    ));

    let stranger = doc.create_element("p").unwrap();
    assert_eq!(parent.remove_child(stranger), Err(DomError::NotFound));
    assert_eq!(
        parent.insert_before(doc.create_element("p").unwrap(), Some(stranger.as_node())),
        Err(DomError::NotFound)
    );
}

#[test]
fn remove_and_replace_children() {
    let root = fixture("<div><p>one</p><p>two</p></div>").unwrap();
    let paragraphs = root.children();
    assert_eq!(paragraphs.len(), 2);

    paragraphs[0].remove();
    assert_eq!(root.children(), vec![paragraphs[1]]);
    assert!(!paragraphs[0].is_connected());

    let replacement = document().create_element("section").unwrap();
    root.replace_children([replacement.as_node()]).unwrap();
    assert_eq!(root.children(), vec![replacement]);
    assert!(!paragraphs[1].is_connected());
}

#[test]
fn text_content() {
    let root = fixture("<div><p>Hello</p><p>world</p></div>").unwrap();
    assert_eq!(root.text_content(), "Helloworld");

    root.set_text_content("replaced").unwrap();
    assert!(root.children().is_empty());
    assert_eq!(root.child_nodes().len(), 1);
    assert_eq!(root.text_content(), "replaced");

    root.set_text_content("").unwrap();
    assert!(root.child_nodes().is_empty());
}

#[test]
fn attributes() {
    let doc = document();
    let el = doc.create_element("DIV").unwrap();
    assert_eq!(el.local_name(), "div");
    assert_eq!(el.tag_name(), "DIV");

    el.set_attribute("Data-Foo", "bar").unwrap();
    assert_eq!(el.get_attribute("data-foo").as_deref(), Some("bar"));
    assert!(el.has_attribute("DATA-FOO"));

    el.set_attribute("hidden", "").unwrap();
    assert_eq!(el.attribute_names(), vec!["data-foo", "hidden"]);

    el.remove_attribute("data-foo");
    assert_eq!(el.get_attribute("data-foo"), None);

    assert_eq!(el.toggle_attribute("hidden", None), Ok(false));
    assert_eq!(el.toggle_attribute("hidden", None), Ok(true));
    assert_eq!(el.toggle_attribute("hidden", Some(true)), Ok(true));
    assert_eq!(el.toggle_attribute("hidden", Some(false)), Ok(false));
    assert_eq!(el.toggle_attribute("hidden", Some(false)), Ok(false));

    assert_eq!(
        el.set_attribute("bad name", "x"),
        Err(DomError::InvalidCharacter("bad name".to_string()))
    );
    assert!(doc.create_element("").is_err());
}

#[test]
fn class_list() {
    let el = fixture(r#"<div class="a b"></div>"#).unwrap();
    let classes = el.class_list();
    assert_eq!(classes.values(), vec!["a", "b"]);

    classes.add("c").unwrap();
    classes.add("a").unwrap();
    assert_eq!(el.get_attribute("class").as_deref(), Some("a b c"));

    classes.remove("b").unwrap();
    assert!(!classes.contains("b"));
    assert_eq!(classes.toggle("b"), Ok(true));
    assert_eq!(classes.toggle("a"), Ok(false));
    assert_eq!(classes.values(), vec!["c", "b"]);
}

#[test]
fn inner_html() {
    let root = fixture("<div></div>").unwrap();
    root.set_inner_html(r#"<span id="one"></span><span id="two"></span>"#)
        .unwrap();
    let ids: Vec<String> = root.children().iter().map(|el| el.id()).collect();
    assert_eq!(ids, vec!["one", "two"]);
    assert_eq!(
        document().get_element_by_id("two"),
        Some(root.children()[1])
    );
}
