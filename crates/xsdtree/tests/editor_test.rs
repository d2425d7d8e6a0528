//! Editing sessions: undo history, clipboard, listeners and validators.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::{NODE_START, child, editor, network, outline};
use pretty_assertions::assert_eq;
use xsdtree::{EditorError, NodeId, Target, TreeEvent, Validator, XsdTree};

#[test]
fn test_undo_then_redo_restores_each_state() {
    let mut editor = editor();
    let root = editor.root();
    let network = child(&mut editor, root, "Network");
    let node = child(&mut editor, network, "Node");
    let mut states = vec![outline(editor.tree())];

    editor.activate(node).unwrap();
    states.push(outline(editor.tree()));
    editor.set_id(node, "A").unwrap();
    states.push(outline(editor.tree()));
    let second = editor.add(node).unwrap();
    states.push(outline(editor.tree()));
    editor.set_id(second, "B").unwrap();
    states.push(outline(editor.tree()));
    editor.set_attribute_value(second, "Visible", "false").unwrap();
    states.push(outline(editor.tree()));
    editor.move_by(second, -1).unwrap();
    states.push(outline(editor.tree()));
    editor.remove(node).unwrap();
    states.push(outline(editor.tree()));

    assert_eq!(
        states.last().unwrap(),
        &["Ots", "Ots.Network", "Ots.Network.Node Id=B Visible=false"]
    );
    let actions = states.len() - 1;
    assert_eq!(editor.undo_log().len(), actions);

    for state in states.iter().rev().skip(1) {
        assert!(editor.undo().unwrap());
        assert_eq!(&outline(editor.tree()), state);
    }
    assert!(!editor.can_undo());
    assert!(!editor.undo().unwrap());

    for state in states.iter().skip(1) {
        assert!(editor.redo().unwrap());
        assert_eq!(&outline(editor.tree()), state);
    }
    assert!(!editor.can_redo());
}

#[test]
fn test_new_edit_discards_undone_actions() {
    let common::Network {
        mut editor, node, ..
    } = network();
    editor.set_id(node, "B").unwrap();
    editor.undo().unwrap();
    assert!(editor.can_redo());
    assert_eq!(editor.redo_description().as_deref(), Some("Redo id change (Node)"));

    editor.set_attribute_value(node, "Visible", "false").unwrap();
    assert!(!editor.can_redo());
    assert_eq!(
        editor.undo_description().as_deref(),
        Some("Undo attribute change (Node)")
    );
}

#[test]
fn test_failed_or_empty_operations_leave_no_action() {
    let common::Network {
        mut editor, node, ..
    } = network();
    let before = editor.undo_log().len();
    editor.set_id(node, "A").unwrap();
    assert!(matches!(
        editor.set_value(node, "x"),
        Err(EditorError::Tree(_))
    ));
    assert_eq!(editor.undo_log().len(), before);
}

#[test]
fn test_choice_options_stay_restorable() {
    let mut editor = editor();
    let root = editor.root();
    let run = child(&mut editor, root, "Run");
    editor.activate(run).unwrap();
    let duration = editor.children(run).unwrap()[0];
    editor.set_value(duration, "3600").unwrap();
    let sequence = editor.tree().options_of(duration)[1];

    editor.set_option(duration, sequence).unwrap();
    assert_eq!(editor.tree().loaded_children(run), [sequence]);
    assert!(!editor.tree().is_active(duration));
    assert_eq!(
        editor.undo_description().as_deref(),
        Some("Undo option change (Duration)")
    );

    editor.undo().unwrap();
    assert_eq!(editor.tree().loaded_children(run), [duration]);
    assert!(editor.tree().is_active(duration));
    assert_eq!(editor.tree().value(duration), Some("3600"));

    editor.redo().unwrap();
    assert_eq!(editor.tree().selected_option(duration), Some(sequence));
}

#[test]
fn test_paste_copies_content_and_undoes() {
    let common::Network {
        mut editor, node, ..
    } = network();
    editor.set_attribute_value(node, "Visible", "false").unwrap();
    let second = editor.add(node).unwrap();
    editor.set_id(second, "B").unwrap();

    assert!(matches!(editor.paste(second), Err(EditorError::EmptyClipboard)));
    editor.copy(node);
    editor.paste(second).unwrap();
    assert_eq!(editor.tree().id(second), Some("A"));
    assert_eq!(editor.tree().attribute_value(second, "Visible"), Some("false"));
    assert_eq!(
        editor.report_invalid_id(second).as_deref(),
        Some("Value A for Id is not unique within Ots.Network.")
    );
    assert_eq!(editor.undo_description().as_deref(), Some("Undo paste (Node)"));

    editor.undo().unwrap();
    assert_eq!(editor.tree().id(second), Some("B"));
    assert_eq!(editor.tree().attribute_value(second, "Visible"), None);
    assert_eq!(editor.report_invalid_id(second), None);
}

#[test]
fn test_cut_removes_and_keeps_for_paste() {
    let common::Network {
        mut editor,
        network,
        node,
        ..
    } = network();
    let second = editor.add(node).unwrap();
    editor.set_id(second, "B").unwrap();

    editor.cut(second).unwrap();
    assert!(!editor.tree().is_attached(second));
    assert_eq!(editor.clipboard(), Some(second));
    assert_eq!(editor.undo_description().as_deref(), Some("Undo cut (Node)"));

    editor.paste(node).unwrap();
    assert_eq!(editor.tree().id(node), Some("B"));

    editor.undo().unwrap();
    editor.undo().unwrap();
    assert_eq!(editor.tree().position(second), Some(1));
    assert_eq!(editor.tree().parent(second), Some(network));
    assert_eq!(editor.tree().id(node), Some("A"));
}

#[test]
fn test_load_clears_history() {
    let mut editor = editor();
    editor
        .load_xml(r#"<Ots><Network><Node Id="A"/><Link Id="L" NodeStart="B"/></Network></Ots>"#)
        .unwrap();
    assert!(!editor.can_undo());
    let root = editor.root();
    let messages = editor.messages(root).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(
        messages[0].1,
        "Value B for NodeStart does not refer to a known Node within Ots.Network."
    );
    assert_eq!(editor.tree().path_string(messages[0].0), "Ots.Network.Link");

    let saved = editor.save_xml().unwrap();
    assert!(saved.contains(r#"NodeStart="B""#));
}

fn recorder() -> (Rc<RefCell<Vec<TreeEvent>>>, impl FnMut(&XsdTree, &TreeEvent) + 'static) {
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&events);
    let listener = move |_: &XsdTree, event: &TreeEvent| sink.borrow_mut().push(event.clone());
    (events, listener)
}

#[test]
fn test_root_listener_receives_existing_nodes() {
    let mut editor = editor();
    let root = editor.root();
    let (events, listener) = recorder();
    editor.subscribe(root, listener);

    let replayed: Vec<TreeEvent> = events.borrow().iter().take(2).cloned().collect();
    let children = editor.tree().loaded_children(root).to_vec();
    assert_eq!(
        replayed,
        [
            TreeEvent::NodeCreated {
                node: children[0],
                parent: root,
                index: 0
            },
            TreeEvent::NodeCreated {
                node: children[1],
                parent: root,
                index: 1
            },
        ]
    );
}

#[test]
fn test_listener_scope_and_unsubscribe() {
    let common::Network {
        mut editor,
        node,
        link,
        ..
    } = network();
    let (events, listener) = recorder();
    let subscription = editor.subscribe(node, listener);
    assert!(events.borrow().is_empty());

    editor.set_attribute_value(link, "Id", "M").unwrap();
    assert!(events.borrow().is_empty());

    editor.set_id(node, "B").unwrap();
    assert_eq!(
        *events.borrow(),
        [TreeEvent::AttributeChanged {
            node,
            attribute: "Id".to_string(),
            previous: Some("A".to_string())
        }]
    );

    assert!(editor.unsubscribe(subscription));
    editor.undo().unwrap();
    assert_eq!(events.borrow().len(), 1);
}

struct StartOptions;

impl Validator for StartOptions {
    fn validate(&self, _tree: &XsdTree, _node: NodeId) -> Option<String> {
        None
    }

    fn options(&self, _tree: &XsdTree, _node: NodeId) -> Option<Vec<String>> {
        Some(vec!["B".to_string(), "C".to_string()])
    }
}

#[test]
fn test_registered_validators() {
    let common::Network {
        mut editor,
        node,
        link,
        ..
    } = network();
    editor.register_validator(
        "Node",
        Target::Attribute("Id".to_string()),
        |tree: &XsdTree, node: NodeId| {
            tree.id(node)
                .filter(|id| id.chars().any(char::is_lowercase))
                .map(|id| format!("Id {id} is not upper case."))
        },
    );
    editor.register_validator("Link", Target::Attribute("NodeStart".to_string()), StartOptions);

    editor.set_id(node, "b").unwrap();
    assert_eq!(
        editor.report_invalid_id(node).as_deref(),
        Some("Id b is not upper case.")
    );
    editor.set_id(node, "B").unwrap();
    assert_eq!(editor.report_invalid_id(node), None);

    let second = editor.add(node).unwrap();
    editor.set_id(second, "C").unwrap();
    let third = editor.add(second).unwrap();
    editor.set_id(third, "D").unwrap();
    assert_eq!(editor.attribute_options(link, NODE_START), ["B", "C"]);
    assert_eq!(editor.attribute_options(node, 1), ["true", "false"]);
}
