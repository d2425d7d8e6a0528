//! Validate command - loads a document into an editor session and reports
//! every node with a message.

use std::sync::Arc;

use nu_ansi_term::Color;
use xsdtree::Editor;
use xsdtree_document::IncludeResolver;
use xsdtree_schema::FileResolver;

use crate::util::{load_config, load_schema, read_file};

#[derive(clap::Args)]
pub struct Args {
    /// Path to the main schema file
    pub schema: String,

    /// Path to the XML document to validate
    pub document: String,
}

pub fn run(args: Args) -> anyhow::Result<()> {
    let config = load_config()?;
    let schema = load_schema(&args.schema, &config)?;
    let text = read_file(&args.document)?;

    let mut editor = Editor::new(Arc::new(schema), config)?;
    editor.set_include_resolver(IncludeResolver::new(FileResolver, Some(args.document.clone())));
    editor.load_xml(&text)?;

    let root = editor.root();
    let messages = editor.messages(root)?;
    if messages.is_empty() {
        println!("{} {}", Color::Green.paint("Valid:"), args.document);
        return Ok(());
    }
    for (node, message) in &messages {
        let tree = editor.tree();
        let label = match tree.id(*node) {
            Some(id) => format!("{} ({id})", tree.path_string(*node)),
            None => tree.path_string(*node).to_string(),
        };
        eprintln!("{} {label}: {message}", Color::Red.paint("invalid:"));
    }
    eprintln!(
        "{}",
        Color::Red.paint(format!("{} invalid nodes in {}", messages.len(), args.document))
    );
    std::process::exit(1);
}
