use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "rosa")]
#[command(about = "Operator tool for the Rosa server shim")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Inspect a host layout file
    Layout {
        #[command(subcommand)]
        target: LayoutTarget,
    },
    /// List every hookable event
    Hooks,
}

#[derive(Subcommand)]
pub enum LayoutTarget {
    /// Scan a host binary on disk and report which layout entries resolve
    Check {
        /// Host executable to scan
        #[arg(short, long)]
        binary: PathBuf,

        /// Layout file describing the build
        #[arg(short, long, default_value = "layout.json", env = "ROSA_LAYOUT")]
        layout: PathBuf,
    },
}
