//! CLI argument parsing for the postalizer-worker binary.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "postalizer-worker", about = "Postal vehicle-service schedule worker")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Process every plate document in the input directory (default if no
    /// subcommand given)
    Run,
    /// Load and validate the reference tables, then exit
    Tables,
}
