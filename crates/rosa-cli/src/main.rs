mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command, LayoutTarget};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("rosa_core=error".parse()?))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Layout {
            target: LayoutTarget::Check { binary, layout },
        } => commands::layout::run_check(&binary, &layout),
        Command::Hooks => commands::hooks::run(),
    }
}
