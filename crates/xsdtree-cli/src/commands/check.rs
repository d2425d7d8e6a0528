//! Check command - loads a schema and reports its diagnostics.

use nu_ansi_term::Color;

use crate::util::{load_config, load_schema};

#[derive(clap::Args)]
pub struct Args {
    /// Path to the main schema file
    pub schema: String,

    /// Quiet mode: only print diagnostics
    #[arg(short, long)]
    pub quiet: bool,
}

pub fn run(args: Args) -> anyhow::Result<()> {
    let config = load_config()?;
    let schema = load_schema(&args.schema, &config)?;

    if !args.quiet {
        println!(
            "{} root {}, {} files, {} elements, {} types, {} keys, {} keyrefs, {} uniques",
            Color::Green.paint("Loaded"),
            schema.root_name(),
            schema.read_files().len(),
            schema.elements().len(),
            schema.types().len(),
            schema.keys().len(),
            schema.keyrefs().len(),
            schema.uniques().len(),
        );
    }
    for diagnostic in schema.diagnostics() {
        println!("{} {diagnostic}", Color::Yellow.paint("warning:"));
    }
    if !args.quiet {
        match schema.diagnostics().len() {
            0 => println!("{}", Color::Green.paint("No diagnostics")),
            n => println!("{n} diagnostics"),
        }
    }
    Ok(())
}
