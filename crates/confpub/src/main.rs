//! confpub CLI - publish documentation projects to Confluence.
//!
//! Provides commands for:
//! - `publish`: Convert the project and update its Confluence page
//! - `render`: Convert the project to storage XHTML without network access

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{PublishArgs, RenderArgs};
use output::Output;

/// confpub - publish Writerside/Authord Markdown to Confluence.
#[derive(Parser)]
#[command(name = "confpub", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish the project to its Confluence page.
    Publish(PublishArgs),
    /// Render the project to storage XHTML.
    Render(RenderArgs),
}

impl Commands {
    fn verbose(&self) -> bool {
        match self {
            Self::Publish(args) => args.common.verbose,
            Self::Render(args) => args.common.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.command.verbose() {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Publish(args) => args.execute(&output),
        Commands::Render(args) => args.execute(&output),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
