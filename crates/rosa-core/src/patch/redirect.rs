use std::cell::Cell;

use tracing::{debug, error};

use super::site::PatchSite;
use crate::error::Result;

/// An installed redirect with scoped, re-entrant bypass.
///
/// States: installed and active, installed and bypassed (depth > 0), or
/// uninstalled. Only the outermost bypass touches the patch site; nested ones
/// just count, so a call-through that re-enters the same function reaches the
/// original code every time.
pub struct Redirect {
    name: &'static str,
    site: Box<dyn PatchSite>,
    installed: Cell<bool>,
    depth: Cell<u32>,
    faulted: Cell<bool>,
}

impl Redirect {
    pub fn install(name: &'static str, site: Box<dyn PatchSite>) -> Result<Self> {
        site.apply()?;
        debug!("Installed redirect {}", name);
        Ok(Self {
            name,
            site,
            installed: Cell::new(true),
            depth: Cell::new(0),
            faulted: Cell::new(false),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_installed(&self) -> bool {
        self.installed.get()
    }

    /// Calls to the host function currently land in the replacement
    pub fn is_active(&self) -> bool {
        self.installed.get() && self.depth.get() == 0
    }

    /// Address that runs the original code while a bypass is held
    pub fn original(&self) -> usize {
        self.site.entry()
    }

    /// Route calls to the original code until the guard is dropped.
    ///
    /// Fails when the site cannot be restored; the redirect then stays active
    /// and no guard is handed out, so the caller must not call the entry.
    pub fn bypass(&self) -> Result<Bypass<'_>> {
        let depth = self.depth.get() + 1;
        if depth == 1 && self.installed.get() {
            if let Err(e) = self.site.restore() {
                if !self.faulted.replace(true) {
                    error!("Failed to bypass redirect {}: {}", self.name, e);
                }
                return Err(e);
            }
        }
        self.depth.set(depth);
        Ok(Bypass {
            redirect: Some(self),
        })
    }

    /// Remove the redirect for good
    pub fn uninstall(&self) -> Result<()> {
        if !self.installed.get() {
            return Ok(());
        }
        if self.depth.get() == 0 {
            self.site.restore()?;
        }
        self.installed.set(false);
        debug!("Removed redirect {}", self.name);
        Ok(())
    }

    fn release(&self) {
        let depth = self.depth.get().saturating_sub(1);
        self.depth.set(depth);
        if depth == 0 && self.installed.get() {
            if let Err(e) = self.site.apply() {
                error!("Failed to reinstate redirect {}: {}", self.name, e);
            }
        }
    }
}

impl Drop for Redirect {
    fn drop(&mut self) {
        if let Err(e) = self.uninstall() {
            error!("Failed to remove redirect {}: {}", self.name, e);
        }
    }
}

/// Scope during which one redirect is lifted
#[must_use = "the redirect is reinstated as soon as the guard is dropped"]
pub struct Bypass<'a> {
    redirect: Option<&'a Redirect>,
}

impl Bypass<'_> {
    /// Guard for a function that has no redirect installed
    pub fn none() -> Self {
        Self { redirect: None }
    }
}

impl Drop for Bypass<'_> {
    fn drop(&mut self) {
        if let Some(redirect) = self.redirect {
            redirect.release();
        }
    }
}
