use strum::EnumCount;

use super::id::{HookId, Phase};

#[derive(Debug)]
struct Entry<C> {
    enabled: bool,
    pre: Option<C>,
    post: Option<C>,
}

impl<C> Default for Entry<C> {
    fn default() -> Self {
        Self {
            enabled: false,
            pre: None,
            post: None,
        }
    }
}

/// Catalog of every interceptable event with its flag and callbacks.
///
/// The enabled flag is independent of whether the host function could be
/// redirected; a trampoline only consults the registry when it runs.
#[derive(Debug)]
pub struct HookRegistry<C> {
    entries: Vec<Entry<C>>,
}

impl<C> Default for HookRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> HookRegistry<C> {
    pub fn new() -> Self {
        Self {
            entries: (0..HookId::COUNT).map(|_| Entry::default()).collect(),
        }
    }

    fn entry(&self, id: HookId) -> &Entry<C> {
        &self.entries[id as usize]
    }

    fn entry_mut(&mut self, id: HookId) -> &mut Entry<C> {
        &mut self.entries[id as usize]
    }

    /// Enable an event by name; returns whether the name was recognised
    pub fn enable(&mut self, name: &str) -> bool {
        self.set_enabled(name, true)
    }

    /// Disable an event by name; returns whether the name was recognised
    pub fn disable(&mut self, name: &str) -> bool {
        self.set_enabled(name, false)
    }

    fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match HookId::parse_event(name) {
            Some((id, _)) => {
                self.entry_mut(id).enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn is_enabled(&self, id: HookId) -> bool {
        self.entry(id).enabled
    }

    /// Disable every event, keeping registered callbacks
    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            entry.enabled = false;
        }
    }

    /// Disable every event and drop every callback
    pub fn reset(&mut self) {
        for entry in &mut self.entries {
            *entry = Entry::default();
        }
    }

    /// Register the callback for an event name, replacing any previous one.
    ///
    /// Returns `None` when the name is unknown, otherwise the replaced callback.
    pub fn set(&mut self, name: &str, callback: Option<C>) -> Option<Option<C>> {
        let (id, phase) = HookId::parse_event(name)?;
        let entry = self.entry_mut(id);
        let slot = match phase {
            Phase::Pre => &mut entry.pre,
            Phase::Post => &mut entry.post,
        };
        Some(std::mem::replace(slot, callback))
    }

    /// Callback to run for `phase`, only when the event is enabled
    pub fn callback(&self, id: HookId, phase: Phase) -> Option<&C> {
        let entry = self.entry(id);
        if !entry.enabled {
            return None;
        }
        match phase {
            Phase::Pre => entry.pre.as_ref(),
            Phase::Post => entry.post.as_ref(),
        }
    }
}
