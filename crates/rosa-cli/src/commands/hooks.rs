//! Hooks command implementation.

use anyhow::Result;
use owo_colors::OwoColorize;
use rosa_core::HookId;
use strum::IntoEnumIterator;

/// One row per event: name, post alias, intercepted host symbol
pub fn catalog() -> Vec<(HookId, String, &'static str)> {
    HookId::iter()
        .map(|id| (id, id.post_name(), id.function().symbol()))
        .collect()
}

/// Run the hooks command
pub fn run() -> Result<()> {
    println!("{:<22} {:<26} {}", "Event".bold(), "Post alias".bold(), "Host symbol".bold());
    for (id, post, symbol) in catalog() {
        println!("{:<22} {:<26} {}", id.to_string(), post, symbol.dimmed());
    }
    Ok(())
}
