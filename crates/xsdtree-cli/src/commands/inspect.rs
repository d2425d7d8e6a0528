//! Inspect command - prints the expanded tree of a schema.

use std::sync::Arc;

use nu_ansi_term::Color;
use xsdtree::{Editor, NodeId};

use crate::util::{load_config, load_schema, read_file};

#[derive(clap::Args)]
pub struct Args {
    /// Path to the main schema file
    pub schema: String,

    /// Document to load before printing
    #[arg(short, long)]
    pub document: Option<String>,

    /// Levels below the root to expand
    #[arg(long, default_value_t = 3)]
    pub depth: usize,
}

pub fn run(args: Args) -> anyhow::Result<()> {
    let config = load_config()?;
    let schema = load_schema(&args.schema, &config)?;
    let mut editor = Editor::new(Arc::new(schema), config)?;
    if let Some(document) = &args.document {
        editor.load_xml(&read_file(document)?)?;
    }

    let mut out = String::new();
    let root = editor.root();
    print_node(&mut editor, root, 0, args.depth, &mut out)?;
    print!("{out}");
    Ok(())
}

fn print_node(
    editor: &mut Editor,
    node: NodeId,
    level: usize,
    depth: usize,
    out: &mut String,
) -> anyhow::Result<()> {
    let tree = editor.tree();
    let mut line = format!("{}{}", "  ".repeat(level), tree.short_string(node));
    if tree.max_occurs(node) != Some(1) || tree.min_occurs(node) != 1 {
        let max = tree
            .max_occurs(node)
            .map_or_else(|| "*".to_string(), |max| max.to_string());
        line.push_str(&format!(" [{}..{max}]", tree.min_occurs(node)));
    }
    for attribute in tree.attributes(node) {
        match &attribute.value {
            Some(value) => line.push_str(&format!(" {}={value}", attribute.name)),
            None => line.push_str(&format!(" {}", attribute.name)),
        }
    }
    if let Some(value) = tree.value(node) {
        line.push_str(&format!(" = {value}"));
    }
    if tree.is_active(node) {
        out.push_str(&line);
    } else {
        out.push_str(&Color::DarkGray.paint(line).to_string());
    }
    out.push('\n');

    if level >= depth {
        return Ok(());
    }
    let children = if editor.tree().is_active(node) {
        editor.children(node)?
    } else {
        editor.tree().loaded_children(node).to_vec()
    };
    for child in children {
        print_node(editor, child, level + 1, depth, out)?;
    }
    Ok(())
}
