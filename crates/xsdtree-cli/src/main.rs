use clap::{ArgAction, Parser, Subcommand};
use nu_ansi_term::Color;
use tracing_subscriber::EnvFilter;

mod commands;
mod util;

#[derive(Parser)]
#[command(name = "xsdtree", about = "XSD schema and XML document utilities")]
struct Cli {
    /// Log more: -v for loading summaries, -vv for expansion details
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a schema and print its diagnostics
    Check(commands::check::Args),
    /// Validate an XML document against a schema
    Validate(commands::validate::Args),
    /// Print the tree a schema expands to
    Inspect(commands::inspect::Args),
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    let result = match cli.command {
        Commands::Check(args) => commands::check::run(args),
        Commands::Validate(args) => commands::validate::run(args),
        Commands::Inspect(args) => commands::inspect::run(args),
    };
    if let Err(e) = result {
        eprintln!("{}", Color::Red.paint(format!("Error: {e:#}")));
        std::process::exit(1);
    }
}
