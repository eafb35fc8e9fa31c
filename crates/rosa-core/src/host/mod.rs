//! Access to the host's functions
//!
//! Every host function is reached through an [`Entry`]. Hookable functions
//! may additionally carry an installed [`Redirect`]; calls made from this
//! crate always go to the original code by holding a bypass for the duration
//! of the call.

mod calls;
mod function;
#[cfg(test)]
pub mod mock;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use strum::{EnumCount, IntoEnumIterator};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::hook::HookId;
use crate::offset::ResolvedLayout;
use crate::patch::{Bypass, DispatchSlot, InlineJump, PatchSite, Redirect};

pub use function::*;

/// How one host function is reached
#[derive(Debug, Clone, Default)]
pub enum Entry {
    /// Code address of the function entry
    Direct(usize),
    /// Function-pointer slot the host calls through
    Slot(Arc<AtomicUsize>),
    #[default]
    Unresolved,
}

impl Entry {
    /// Address a call should jump to right now
    pub fn address(&self) -> Option<usize> {
        match self {
            Entry::Direct(address) => Some(*address),
            Entry::Slot(slot) => Some(slot.load(Ordering::Acquire)),
            Entry::Unresolved => None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        !matches!(self, Entry::Unresolved)
    }
}

/// Host function table plus the redirects installed over it
pub struct Host {
    entries: Vec<Entry>,
    redirects: Vec<Option<Redirect>>,
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

impl Host {
    /// Table with every function unresolved
    pub fn new() -> Self {
        Self {
            entries: vec![Entry::Unresolved; HostFunction::COUNT],
            redirects: (0..HookId::COUNT).map(|_| None).collect(),
        }
    }

    /// Table of direct entries taken from a resolved layout
    pub fn from_layout(layout: &ResolvedLayout) -> Self {
        let mut host = Self::new();
        for function in HostFunction::iter() {
            match layout.function(function.symbol()) {
                Some(address) => host.set_entry(function, Entry::Direct(address)),
                None => warn!("Host function {} is unavailable", function.symbol()),
            }
        }
        host
    }

    pub fn set_entry(&mut self, function: HostFunction, entry: Entry) {
        self.entries[function as usize] = entry;
    }

    pub fn entry(&self, function: HostFunction) -> &Entry {
        &self.entries[function as usize]
    }

    /// Redirect calls of a hookable function to `replacement`.
    ///
    /// An unresolved function installs nothing and reports `Unavailable`.
    pub fn install(&mut self, id: HookId, replacement: usize) -> Result<()> {
        let function = id.function();
        let site: Box<dyn PatchSite> = match self.entry(function) {
            // SAFETY: the address came from the host layout and names a function entry.
            Entry::Direct(address) => Box::new(unsafe { InlineJump::new(*address, replacement)? }),
            Entry::Slot(slot) => Box::new(DispatchSlot::new(Arc::clone(slot), replacement)),
            Entry::Unresolved => return Err(Error::Unavailable(function.symbol())),
        };
        // Replacing an existing redirect restores it first through its Drop.
        self.redirects[id as usize] = None;
        self.redirects[id as usize] = Some(Redirect::install(function.symbol(), site)?);
        Ok(())
    }

    /// Install a redirect for every hookable function that resolved.
    ///
    /// Failures are reported once here and the event stays uninstalled.
    pub fn install_all(&mut self, replacement: impl Fn(HookId) -> usize) -> Vec<HookId> {
        let mut installed = Vec::new();
        for id in HookId::iter() {
            match self.install(id, replacement(id)) {
                Ok(()) => installed.push(id),
                Err(e) => warn!("Hook {} not installed: {}", id, e),
            }
        }
        info!("Installed {}/{} hooks", installed.len(), HookId::COUNT);
        installed
    }

    pub fn redirect(&self, id: HookId) -> Option<&Redirect> {
        self.redirects[id as usize].as_ref()
    }

    /// Lift the redirect of `id` until the guard drops
    pub fn bypass(&self, id: HookId) -> Result<Bypass<'_>> {
        match self.redirect(id) {
            Some(redirect) => redirect.bypass(),
            None => Ok(Bypass::none()),
        }
    }

    /// Remove every redirect
    pub fn uninstall_all(&mut self) {
        for redirect in &mut self.redirects {
            *redirect = None;
        }
    }

    /// Run `call` with the address of the original code of `function`.
    ///
    /// `call` is skipped when the redirect over the function cannot be lifted.
    pub fn with_original<R>(&self, function: HostFunction, call: impl FnOnce(usize) -> R) -> Result<R> {
        let _bypass = function.hook().map(|id| self.bypass(id)).transpose()?;
        let address = self
            .entry(function)
            .address()
            .ok_or(Error::Unavailable(function.symbol()))?;
        Ok(call(address))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    extern "C" fn original() {}
    extern "C" fn replacement() {}

    fn slot_host() -> (Arc<AtomicUsize>, Host) {
        let slot = Arc::new(AtomicUsize::new(original as usize));
        let mut host = Host::new();
        host.set_entry(HostFunction::Logic, Entry::Slot(Arc::clone(&slot)));
        (slot, host)
    }

    #[test]
    fn test_unresolved_function_is_unavailable() {
        let host = Host::new();
        let err = host.with_original(HostFunction::Logic, |_| ()).unwrap_err();
        assert!(matches!(err, Error::Unavailable("logic")));
    }

    #[test]
    fn test_install_unresolved_installs_nothing() {
        let mut host = Host::new();
        assert!(host.install(HookId::Logic, replacement as usize).is_err());
        assert!(host.redirect(HookId::Logic).is_none());
        let _bypass = host.bypass(HookId::Logic).unwrap();
    }

    #[test]
    fn test_with_original_sees_original_while_installed() {
        let (slot, mut host) = slot_host();
        host.install(HookId::Logic, replacement as usize).unwrap();
        assert_eq!(slot.load(Ordering::SeqCst), replacement as usize);

        let seen = host.with_original(HostFunction::Logic, |address| address).unwrap();
        assert_eq!(seen, original as usize);
        assert_eq!(slot.load(Ordering::SeqCst), replacement as usize);
    }

    #[test]
    fn test_install_all_reports_installed() {
        let (_slot, mut host) = slot_host();
        let installed = host.install_all(|_| replacement as usize);
        assert_eq!(installed, vec![HookId::Logic]);
    }

    #[test]
    fn test_uninstall_all_restores() {
        let (slot, mut host) = slot_host();
        host.install(HookId::Logic, replacement as usize).unwrap();
        host.uninstall_all();
        assert_eq!(slot.load(Ordering::SeqCst), original as usize);
    }

    #[test]
    fn test_from_layout() {
        let mut layout = ResolvedLayout::default();
        layout.functions.insert("createitem".to_string(), 0x1234);
        let host = Host::from_layout(&layout);
        assert_eq!(host.entry(HostFunction::CreateItem).address(), Some(0x1234));
        assert!(!host.entry(HostFunction::DeleteItem).is_resolved());
    }

    struct LockedSlot(Arc<AtomicUsize>);

    impl PatchSite for LockedSlot {
        fn apply(&self) -> Result<()> {
            self.0.store(replacement as usize, Ordering::SeqCst);
            Ok(())
        }

        fn restore(&self) -> Result<()> {
            Err(Error::PatchFailed {
                address: original as usize,
                message: "write denied".to_string(),
            })
        }

        fn entry(&self) -> usize {
            self.0.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn test_failed_bypass_skips_the_call() {
        let (slot, mut host) = slot_host();
        let redirect = Redirect::install("logic", Box::new(LockedSlot(Arc::clone(&slot)))).unwrap();
        host.redirects[HookId::Logic as usize] = Some(redirect);

        let mut called = false;
        let err = host
            .with_original(HostFunction::Logic, |_| called = true)
            .unwrap_err();
        assert!(matches!(err, Error::PatchFailed { .. }));
        assert!(!called);
        assert_eq!(slot.load(Ordering::SeqCst), replacement as usize);
    }
}
