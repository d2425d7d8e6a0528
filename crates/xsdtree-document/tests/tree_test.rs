//! Structural operations on an expanded tree.

mod common;

use common::{child, names, tree};
use pretty_assertions::assert_eq;
use xsdtree_document::{TreeError, TreeEvent};

#[test]
fn test_expansion_follows_declaration_order() {
    let mut tree = tree();
    let root = tree.root();
    let children = tree.children(root).unwrap();
    assert_eq!(names(&tree, &children), ["Definitions", "Network", "Run"]);
    assert!(!tree.is_active(children[0]));
    assert!(tree.is_active(children[1]));

    let network = children[1];
    let network_children = tree.children(network).unwrap();
    assert_eq!(names(&tree, &network_children), ["xi:include", "Node", "Link"]);
    assert_eq!(tree.path_string(network_children[1]), "Ots.Network.Node");
}

#[test]
fn test_add_and_remove_respect_occurrences() {
    let mut tree = tree();
    let root = tree.root();
    let network = child(&mut tree, root, "Network");
    let node = child(&mut tree, network, "Node");
    tree.set_active(node).unwrap();
    let second = tree.add(node).unwrap();
    assert_eq!(tree.position(second), Some(2));
    assert!(tree.is_removable(node));
    assert!(tree.is_removable(second));

    tree.remove(second).unwrap();
    assert!(!tree.is_attached(second));
    assert_eq!(tree.sibling_positions(node), [1]);

    // the only optional instance is deactivated, not removed
    tree.remove(node).unwrap();
    assert!(tree.is_attached(node));
    assert!(!tree.is_active(node));

    assert_eq!(tree.remove(network), Err(TreeError::MinOccurs(network)));
}

#[test]
fn test_events_describe_mutations() {
    let mut tree = tree();
    let root = tree.root();
    let network = child(&mut tree, root, "Network");
    let node = child(&mut tree, network, "Node");
    tree.take_events();

    tree.set_active(node).unwrap();
    tree.set_attribute_value(node, "Id", "A").unwrap();
    let second = tree.add(node).unwrap();
    let direct: Vec<TreeEvent> = tree
        .take_events()
        .into_iter()
        .filter(|record| record.is_direct())
        .map(|record| record.event)
        .collect();
    assert_eq!(
        direct,
        [
            TreeEvent::ActivationChanged {
                node,
                active: true
            },
            TreeEvent::AttributeChanged {
                node,
                attribute: "Id".to_string(),
                previous: None
            },
            TreeEvent::NodeCreated {
                node: second,
                parent: network,
                index: 2
            },
        ]
    );
}

#[test]
fn test_choice_switches_options() {
    let mut tree = tree();
    let root = tree.root();
    let run = child(&mut tree, root, "Run");
    tree.set_active(run).unwrap();
    let duration = tree.children(run).unwrap()[0];
    assert_eq!(tree.node_name(duration), "Duration");
    let options = tree.options_of(duration).to_vec();
    assert_eq!(names(&tree, &options), ["Duration", "xsd:sequence"]);
    assert_eq!(tree.short_string(options[1]), "Start | End");

    tree.take_events();
    tree.set_option(duration, options[1]).unwrap();
    assert_eq!(tree.loaded_children(run), [options[1]]);
    assert!(tree.is_active(options[1]));
    assert!(!tree.is_active(duration));
    let events: Vec<_> = tree.take_events().into_iter().map(|r| r.event).collect();
    assert_eq!(
        events,
        [TreeEvent::OptionChanged {
            choice: tree.choice(duration).unwrap(),
            selected: options[1],
            previous: duration,
        }]
    );

    let network = child(&mut tree, root, "Network");
    assert_eq!(
        tree.set_option(network, options[0]),
        Err(TreeError::NotAChoice(network))
    );
}

#[test]
fn test_values_only_on_editable_nodes() {
    let mut tree = tree();
    let root = tree.root();
    let network = child(&mut tree, root, "Network");
    assert_eq!(tree.set_value(network, "x"), Err(TreeError::NotEditable(network)));

    let link = child(&mut tree, network, "Link");
    tree.set_active(link).unwrap();
    let speed = child(&mut tree, link, "Speed");
    assert!(tree.is_editable(speed));
    tree.set_active(speed).unwrap();
    tree.set_value(speed, "fast").unwrap();
    assert_eq!(
        tree.schema_value_message(speed).as_deref(),
        Some("Value 'fast' does not match pattern [0-9]+ km/h.")
    );
    tree.set_value(speed, "50 km/h").unwrap();
    assert_eq!(tree.schema_value_message(speed), None);
}

#[test]
fn test_boolean_default_is_not_stored() {
    let mut tree = tree();
    let root = tree.root();
    let network = child(&mut tree, root, "Network");
    let node = child(&mut tree, network, "Node");
    tree.set_active(node).unwrap();
    tree.set_attribute_value(node, "Visible", "true").unwrap();
    assert_eq!(tree.attribute_value(node, "Visible"), None);
    tree.set_attribute_value(node, "Visible", "false").unwrap();
    assert_eq!(tree.attribute_value(node, "Visible"), Some("false"));
    assert_eq!(
        tree.set_attribute_value(node, "Color", "red"),
        Err(TreeError::UnknownAttribute {
            node,
            name: "Color".to_string()
        })
    );
}

#[test]
fn test_duplicate_copies_content() {
    let mut tree = tree();
    let root = tree.root();
    let network = child(&mut tree, root, "Network");
    let link = child(&mut tree, network, "Link");
    tree.set_active(link).unwrap();
    tree.set_id(link, "L1").unwrap();
    let speed = child(&mut tree, link, "Speed");
    tree.set_active(speed).unwrap();
    tree.set_value(speed, "80 km/h").unwrap();

    let copy = tree.duplicate(link).unwrap();
    assert_ne!(copy, link);
    assert_eq!(tree.position(copy), Some(tree.position(link).unwrap() + 1));
    assert_eq!(tree.id(copy), Some("L1"));
    let copied_speed = tree.first_child(copy, "Speed").unwrap();
    assert_ne!(copied_speed, speed);
    assert_eq!(tree.value(copied_speed), Some("80 km/h"));
    assert_eq!(tree.path_string(copied_speed), "Ots.Network.Link.Speed");
}

#[test]
fn test_move_is_clamped_to_siblings() {
    let mut tree = tree();
    let root = tree.root();
    let network = child(&mut tree, root, "Network");
    let first = child(&mut tree, network, "Node");
    tree.set_active(first).unwrap();
    let second = tree.add(first).unwrap();
    let third = tree.add(second).unwrap();
    assert!(!tree.can_move_up(first));
    assert!(tree.can_move_down(first));

    tree.take_events();
    tree.move_by(first, 10).unwrap();
    assert_eq!(tree.loaded_children(network)[1..4], [second, third, first]);
    let events: Vec<_> = tree.take_events().into_iter().map(|r| r.event).collect();
    assert_eq!(
        events,
        [TreeEvent::Moved {
            node: first,
            from: 1,
            to: 3
        }]
    );
    // the include placeholder before the nodes is not a sibling
    tree.move_by(second, -10).unwrap();
    assert_eq!(tree.position(second), Some(1));
}

#[test]
fn test_type_queries() {
    let mut tree = tree();
    let root = tree.root();
    let network = child(&mut tree, root, "Network");
    let node = child(&mut tree, network, "Node");
    let link = child(&mut tree, network, "Link");
    assert!(tree.is_type(node, "Node"));
    assert!(tree.is_type(node, "Network.Node"));
    assert!(tree.is_type(node, "NodeType"));
    assert!(!tree.is_type(link, "Node"));
    assert!(tree.is_identifiable(node));
    assert!(!tree.is_identifiable(network));
    assert_eq!(tree.short_string(node), "Node");
    assert_eq!(tree.description(node).as_deref(), Some("A point in the network."));
    assert_eq!(tree.attribute_restrictions(node, 1), ["true", "false"]);
}

#[test]
fn test_copy_into_replaces_content() {
    let mut tree = tree();
    let root = tree.root();
    let network = child(&mut tree, root, "Network");
    let node = child(&mut tree, network, "Node");
    tree.set_active(node).unwrap();
    tree.set_id(node, "A").unwrap();
    let target = tree.add(node).unwrap();
    tree.set_id(target, "B").unwrap();
    let before = tree.snapshot(target);

    tree.copy_into(node, target).unwrap();
    assert_eq!(tree.id(target), Some("A"));

    tree.restore(target, before);
    assert_eq!(tree.id(target), Some("B"));

    let link = child(&mut tree, network, "Link");
    assert_eq!(
        tree.copy_into(link, node),
        Err(TreeError::CannotContain {
            from: link,
            target: node
        })
    );
}
