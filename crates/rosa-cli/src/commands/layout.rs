//! Layout check command implementation.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use owo_colors::OwoColorize;
use rosa_core::{HostFunction, HostLayout, Scanner};
use strum::IntoEnumIterator;

/// Outcome of scanning one binary with one layout
#[derive(Debug, Default)]
pub struct LayoutReport {
    /// `section.name` and the file offset it resolved to
    pub resolved: Vec<(String, usize)>,
    pub unresolved: Vec<String>,
    /// Host functions the layout has no entry for
    pub missing: Vec<&'static str>,
}

/// Resolve `layout` against the raw bytes of a host executable.
///
/// Offsets are file-relative here; only whether a signature matches carries
/// over to the loaded image.
pub fn check(layout: &HostLayout, binary: &[u8]) -> LayoutReport {
    let resolved = layout.resolve(0, &Scanner::new(0, binary));

    let mut report = LayoutReport::default();
    for (section, entries) in [
        ("arrays", &resolved.arrays),
        ("counters", &resolved.counters),
        ("functions", &resolved.functions),
    ] {
        for (name, address) in entries {
            report.resolved.push((format!("{section}.{name}"), *address));
        }
    }
    report.unresolved = resolved.unresolved;

    let described: BTreeSet<&str> = layout.functions.keys().map(String::as_str).collect();
    report.missing = HostFunction::iter()
        .map(HostFunction::symbol)
        .filter(|symbol| !described.contains(symbol))
        .collect();
    report
}

/// Run the layout check command
pub fn run_check(binary: &Path, layout: &Path) -> Result<()> {
    let layout_data = HostLayout::load(layout)
        .with_context(|| format!("loading layout {}", layout.display()))?;
    let bytes = fs::read(binary).with_context(|| format!("reading {}", binary.display()))?;

    println!("=== Layout Check ===");
    println!("Layout:  {} (host version {})", layout.display(), layout_data.version);
    println!("Binary:  {} ({} bytes)", binary.display(), bytes.len());
    println!();

    let report = check(&layout_data, &bytes);
    for (name, offset) in &report.resolved {
        println!("  {} {:<40} {:#010x}", "✓".green(), name, offset);
    }
    for name in &report.unresolved {
        println!("  {} {:<40} {}", "✗".red(), name, "not found".red());
    }
    for symbol in &report.missing {
        println!("  {} functions.{:<30} {}", "-".yellow(), symbol, "no entry".yellow());
    }
    println!();
    println!(
        "{} resolved, {} unresolved, {} without entry",
        report.resolved.len(),
        report.unresolved.len(),
        report.missing.len()
    );

    if !report.unresolved.is_empty() {
        bail!("{} layout entries did not resolve", report.unresolved.len());
    }
    Ok(())
}
