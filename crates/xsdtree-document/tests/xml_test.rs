//! Loading and saving XML documents.

mod common;

use common::{child, outline, tree};
use pretty_assertions::assert_eq;
use xsdtree_document::{IncludeResolver, TreeEvent, XmlError};
use xsdtree_schema::MemoryResolver;

const DOCUMENT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Ots Version="1">
  <Network>
    <Node Id="A"/>
    <Node Id="B" Visible="false"/>
    <Link Id="L" NodeStart="A">
      <Speed>50 km/h</Speed>
    </Link>
  </Network>
  <Run>
    <Duration>3600</Duration>
  </Run>
</Ots>"#;

#[test]
fn test_load_fills_matching_nodes() {
    let mut tree = tree();
    tree.load_xml(DOCUMENT).unwrap();
    assert_eq!(
        outline(&tree),
        [
            "Ots Version=1",
            "Ots.Network",
            "Ots.Network.Node Id=A",
            "Ots.Network.Node Id=B Visible=false",
            "Ots.Network.Link Id=L NodeStart=A",
            "Ots.Network.Link.Speed '50 km/h'",
            "Ots.Run",
            "Ots.Run.Duration '3600'",
        ]
    );
}

#[test]
fn test_save_then_load_keeps_content() {
    let mut tree = tree();
    tree.load_xml(DOCUMENT).unwrap();
    let saved = tree.save_xml().unwrap();
    assert!(saved.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(saved.contains("<Duration>3600</Duration>"));
    assert!(!saved.contains("Definitions"));

    let mut reloaded = common::tree();
    reloaded.load_xml(&saved).unwrap();
    assert_eq!(outline(&reloaded), outline(&tree));
}

#[test]
fn test_load_selects_sequence_option() {
    let mut tree = tree();
    tree.load_xml("<Ots><Network/><Run><Start>1</Start><End>2</End></Run></Ots>")
        .unwrap();
    let root = tree.root();
    let run = child(&mut tree, root, "Run");
    let selected = tree.loaded_children(run)[0];
    assert!(tree.is_sequence(selected));
    assert_eq!(tree.selected_option(selected), Some(selected));
    let start = tree.first_child(run, "Start").unwrap();
    assert_eq!(tree.value(start), Some("1"));
    assert_eq!(tree.path_string(start), "Ots.Run.Start");

    let saved = tree.save_xml().unwrap();
    assert!(saved.contains("<Start>1</Start>"));
    assert!(saved.contains("<End>2</End>"));
    assert!(!saved.contains("Duration"));
}

#[test]
fn test_unknown_elements_are_skipped() {
    let mut tree = tree();
    tree.load_xml(r#"<Ots><Network><Bogus/><Node Id="A"/></Network></Ots>"#)
        .unwrap();
    assert_eq!(
        outline(&tree),
        ["Ots", "Ots.Network", "Ots.Network.Node Id=A"]
    );
}

#[test]
fn test_root_must_match() {
    let mut tree = tree();
    let result = tree.load_xml("<Other/>");
    assert!(matches!(
        result,
        Err(XmlError::RootMismatch { expected, found }) if expected == "Ots" && found == "Other"
    ));
    assert!(matches!(tree.load_xml("<Ots>"), Err(XmlError::Syntax(_))));
}

#[test]
fn test_namespace_prefix_on_save() {
    let schema = common::schema();
    let options = xsdtree_document::TreeOptions {
        namespace: Some(xsdtree_document::Namespace {
            prefix: "ots".to_string(),
            uri: "http://www.example.org/ots".to_string(),
        }),
        ..Default::default()
    };
    let mut tree = xsdtree_document::XsdTree::new(schema, options).unwrap();
    tree.load_xml(r#"<ots:Ots xmlns:ots="http://www.example.org/ots"><ots:Network/></ots:Ots>"#)
        .unwrap();
    let saved = tree.save_xml().unwrap();
    assert!(saved.contains(r#"<ots:Ots xmlns:ots="http://www.example.org/ots""#));
    assert!(saved.contains("<ots:Network/>"));
}

fn with_includes(tree: &mut xsdtree_document::XsdTree) {
    let files = MemoryResolver::new().with("data/nodes.xml", r#"<Node Id="B"/>"#);
    tree.set_include_resolver(IncludeResolver::new(files, Some("data/main.xml".to_string())));
}

#[test]
fn test_included_content_is_loaded_but_not_saved() {
    let mut tree = tree();
    with_includes(&mut tree);
    tree.load_xml(
        r#"<Ots xmlns:xi="http://www.w3.org/2001/XInclude">
          <Network>
            <xi:include href="nodes.xml"/>
            <Node Id="A"/>
          </Network>
        </Ots>"#,
    )
    .unwrap();
    let root = tree.root();
    let network = child(&mut tree, root, "Network");
    let include = tree.loaded_children(network)[0];
    assert!(tree.is_xi_include(include));
    assert_eq!(tree.attribute_value(include, "href"), Some("nodes.xml"));
    let included = tree.loaded_children(include).to_vec();
    assert_eq!(included.len(), 1);
    assert!(tree.is_included(included[0]));
    assert_eq!(tree.id(included[0]), Some("B"));
    assert_eq!(tree.path_string(included[0]), "Ots.Network.Node");
    assert_eq!(tree.include_message(include), None);

    let saved = tree.save_xml().unwrap();
    assert!(saved.contains(r#"<xi:include href="nodes.xml"/>"#));
    assert!(saved.contains(r#"Id="A""#));
    assert!(!saved.contains(r#"Id="B""#));
}

#[test]
fn test_missing_include_is_reported() {
    let mut tree = tree();
    with_includes(&mut tree);
    let root = tree.root();
    let network = child(&mut tree, root, "Network");
    let include = tree.children(network).unwrap()[0];
    tree.set_active(include).unwrap();
    tree.set_attribute_value_at(include, 0, "missing.xml").unwrap();
    assert!(tree.loaded_children(include).is_empty());
    assert_eq!(
        tree.include_message(include).as_deref(),
        Some("Unable to find file missing.xml.")
    );

    tree.set_attribute_value_at(include, 1, "nodes.xml").unwrap();
    assert_eq!(tree.include_message(include), None);
    assert_eq!(tree.loaded_children(include).len(), 1);
}

#[test]
fn test_changing_include_file_is_one_direct_event() {
    let mut tree = tree();
    with_includes(&mut tree);
    let root = tree.root();
    let network = child(&mut tree, root, "Network");
    let include = tree.children(network).unwrap()[0];
    tree.set_active(include).unwrap();
    tree.take_events();

    tree.set_attribute_value_at(include, 0, "nodes.xml").unwrap();
    let included = tree.loaded_children(include).to_vec();
    assert_eq!(included.len(), 1);
    assert_eq!(tree.id(included[0]), Some("B"));

    let events = tree.take_events();
    let direct: Vec<TreeEvent> = events
        .into_iter()
        .filter(|record| record.is_direct())
        .map(|record| record.event)
        .collect();
    assert_eq!(
        direct,
        vec![TreeEvent::AttributeChanged {
            node: include,
            attribute: "File".to_string(),
            previous: None,
        }]
    );
}
