//! DermLink CLI
//!
//! Drives the two protocol roles from a terminal: `pair` runs a browser-style
//! pairing session, `capture` uploads an image the way the mobile page does.

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "dermlink", version, about = "DermLink remote-capture utility")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pairing session: save the barcode, then receive images
    Pair(commands::pair::PairArgs),
    /// Upload an image as a paired capture device
    Capture(commands::capture::CaptureArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Pair(args) => commands::pair::run(args),
        Commands::Capture(args) => commands::capture::run(args),
    }
}
