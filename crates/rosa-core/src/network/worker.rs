use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use super::{Network, ShutdownSignal};
use crate::error::Result;

/// Background thread executing queued requests
pub struct Worker {
    shutdown: Arc<ShutdownSignal>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn spawn(network: Arc<Network>, poll_interval: Duration) -> Result<Self> {
        let shutdown = Arc::new(ShutdownSignal::new());
        let signal = Arc::clone(&shutdown);
        let handle = thread::Builder::new()
            .name("rosa-http".to_string())
            .spawn(move || run(&network, &signal, poll_interval))?;
        debug!("HTTP worker started");
        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }

    /// Signal the thread and wait for it to finish its current request
    pub fn stop(&mut self) {
        self.shutdown.trigger();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("HTTP worker panicked");
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(network: &Network, shutdown: &ShutdownSignal, poll_interval: Duration) {
    loop {
        while !shutdown.is_shutdown() && network.process_one() {}
        if shutdown.wait(poll_interval) {
            break;
        }
    }
    debug!("HTTP worker stopped");
}
