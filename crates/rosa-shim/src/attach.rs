//! Startup and shutdown of the shim inside the host process

use std::env;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use rosa_core::config::LogConfig;
use rosa_core::{
    Config, Host, HostLayout, Network, ProcessImage, Runtime, Scanner, UreqTransport, Worker,
    World, runtime, script,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "ROSA_CONFIG";
const DEFAULT_CONFIG: &str = "rosa.toml";

static WORKER: Mutex<Option<Worker>> = Mutex::new(None);

pub fn config_path() -> PathBuf {
    env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG))
}

/// Configuration at `path`, or the defaults with the reason they were used
pub fn load_config(path: &Path) -> (Config, Option<String>) {
    match Config::load(path) {
        Ok(config) => (config, None),
        Err(e) if e.is_not_found() => (Config::default(), None),
        Err(e) => (
            Config::default(),
            Some(format!("Failed to load {}: {}, using defaults", path.display(), e)),
        ),
    }
}

fn init_logging(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    // A host that already installed a subscriber keeps it.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Resolve the host layout, install every hook and run the entry script.
///
/// Must run on the thread that drives the host's logic ticks.
pub fn attach() -> Result<()> {
    let path = config_path();
    let (config, warning) = load_config(&path);
    init_logging(&config.log);
    if let Some(warning) = warning {
        warn!("{}", warning);
    }
    info!("Rosa {} attaching", env!("CARGO_PKG_VERSION"));

    let image = ProcessImage::current().context("locating host image")?;
    info!("Host image at {:#x} ({:#x} bytes)", image.base, image.len);
    let layout = HostLayout::load(&config.host.layout)
        .with_context(|| format!("loading layout {}", config.host.layout.display()))?;
    info!("Using layout for host version {}", layout.version);

    // SAFETY: the code range of the current image stays mapped for the process lifetime.
    let code = unsafe { image.code() };
    let resolved = layout.resolve(image.base, &Scanner::new(image.base + image.code_offset, code));
    if !resolved.unresolved.is_empty() {
        warn!("{} layout entries unresolved", resolved.unresolved.len());
    }

    let host = Host::from_layout(&resolved);
    // SAFETY: the layout was resolved against the running image.
    let world = unsafe { World::from_layout(&resolved) };
    let transport = Arc::new(UreqTransport::new(config.http.connect_timeout()));
    let network = Arc::new(Network::new(transport));
    let worker = Worker::spawn(Arc::clone(&network), config.http.poll_interval())?;
    *WORKER.lock() = Some(worker);

    let rt = Runtime::new(host, world, network, &config.script, image.base);
    runtime::enter(Rc::clone(&rt));
    rt.install_hooks();
    if let Err(e) = rt.start() {
        script::report_error(&e);
    }
    Ok(())
}

/// Stop the HTTP worker; hooks stay installed until the process exits
pub fn detach() {
    if let Some(mut worker) = WORKER.lock().take() {
        worker.stop();
        info!("Rosa detached");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_config_uses_defaults_silently() {
        let dir = tempfile::tempdir().unwrap();
        let (config, warning) = load_config(&dir.path().join("rosa.toml"));
        assert!(warning.is_none());
        assert_eq!(config.script.mode, "default");
    }

    #[test]
    fn test_broken_config_warns() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[script").unwrap();
        let (config, warning) = load_config(file.path());
        assert!(warning.unwrap().contains("using defaults"));
        assert_eq!(config.http.poll_interval_ms, 16);
    }

    #[test]
    fn test_config_is_read() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[script]\nmode = \"race\"").unwrap();
        let (config, warning) = load_config(file.path());
        assert!(warning.is_none());
        assert_eq!(config.script.mode, "race");
    }

    #[test]
    fn test_detach_without_attach() {
        detach();
        assert!(WORKER.lock().is_none());
    }
}
