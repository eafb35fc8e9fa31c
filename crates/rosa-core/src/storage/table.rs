use crate::error::{Error, Result};
use crate::memory::layout::capacity;

/// Per-slot containers parallel to one host array.
///
/// Entries are created on first access and must be cleared whenever the
/// matching slot is created or removed, so a recycled slot never sees its
/// previous occupant's data.
#[derive(Debug)]
pub struct SideTable<V> {
    category: &'static str,
    slots: Vec<Option<V>>,
}

impl<V> SideTable<V> {
    pub fn new(category: &'static str, capacity: usize) -> Self {
        Self {
            category,
            slots: (0..capacity).map(|_| None).collect(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    fn slot_mut(&mut self, index: usize) -> Result<&mut Option<V>> {
        let capacity = self.slots.len();
        self.slots
            .get_mut(index)
            .ok_or_else(|| Error::out_of_range(self.category, index as i64, capacity))
    }

    pub fn get(&self, index: usize) -> Option<&V> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Existing container of `index`, allocating it with `create` on first use
    pub fn get_or_try_insert_with(
        &mut self,
        index: usize,
        create: impl FnOnce() -> Result<V>,
    ) -> Result<&V> {
        let slot = self.slot_mut(index)?;
        if slot.is_none() {
            *slot = Some(create()?);
        }
        slot.as_ref()
            .ok_or_else(|| Error::InvalidArgument("side table slot vanished".to_string()))
    }

    /// Release the container of `index`; out-of-range indices are ignored
    pub fn clear(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = None;
        }
    }

    /// Release every container
    pub fn reset(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
    }

    /// Release containers whose slot is no longer live
    pub fn retain(&mut self, mut is_live: impl FnMut(usize) -> bool) {
        for (index, slot) in self.slots.iter_mut().enumerate() {
            if slot.is_some() && !is_live(index) {
                *slot = None;
            }
        }
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

/// One side table per category that supports attached data
#[derive(Debug)]
pub struct SideTables<V> {
    pub players: SideTable<V>,
    pub humans: SideTable<V>,
    pub items: SideTable<V>,
    pub vehicles: SideTable<V>,
    pub bodies: SideTable<V>,
}

impl<V> Default for SideTables<V> {
    fn default() -> Self {
        Self {
            players: SideTable::new("Player", capacity::PLAYERS),
            humans: SideTable::new("Human", capacity::HUMANS),
            items: SideTable::new("Item", capacity::ITEMS),
            vehicles: SideTable::new("Vehicle", capacity::VEHICLES),
            bodies: SideTable::new("RigidBody", capacity::RIGID_BODIES),
        }
    }
}

impl<V> SideTables<V> {
    pub fn reset(&mut self) {
        self.players.reset();
        self.humans.reset();
        self.items.reset();
        self.vehicles.reset();
        self.bodies.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocates_once() {
        let mut table = SideTable::new("Item", 4);
        let mut calls = 0;
        for _ in 0..3 {
            let value = table
                .get_or_try_insert_with(2, || {
                    calls += 1;
                    Ok(vec![1])
                })
                .unwrap();
            assert_eq!(value, &vec![1]);
        }
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_get_after_clear_is_fresh() {
        let mut table = SideTable::new("Item", 4);
        table.get_or_try_insert_with(1, || Ok(String::from("stale"))).unwrap();
        table.clear(1);
        assert!(table.get(1).is_none());
        let fresh = table.get_or_try_insert_with(1, || Ok(String::new())).unwrap();
        assert!(fresh.is_empty());
    }

    #[test]
    fn test_out_of_range() {
        let mut table: SideTable<u8> = SideTable::new("Human", 2);
        let err = table.get_or_try_insert_with(2, || Ok(0)).unwrap_err();
        assert!(matches!(err, Error::OutOfRange { category: "Human", index: 2, bound: 2 }));
        table.clear(99);
    }

    #[test]
    fn test_failed_create_leaves_slot_empty() {
        let mut table: SideTable<u8> = SideTable::new("Item", 2);
        assert!(table
            .get_or_try_insert_with(0, || Err(Error::InvalidArgument("no".into())))
            .is_err());
        assert!(table.get(0).is_none());
    }

    #[test]
    fn test_retain_releases_dead_slots() {
        let mut table = SideTable::new("Player", 4);
        for i in 0..4 {
            table.get_or_try_insert_with(i, || Ok(i)).unwrap();
        }
        table.retain(|i| i % 2 == 0);
        assert_eq!(table.occupied(), 2);
        assert!(table.get(1).is_none());
        assert_eq!(table.get(2), Some(&2));
    }

    #[test]
    fn test_reset_all() {
        let mut tables: SideTables<u8> = SideTables::default();
        tables.items.get_or_try_insert_with(5, || Ok(1)).unwrap();
        tables.bodies.get_or_try_insert_with(5, || Ok(1)).unwrap();
        tables.reset();
        assert_eq!(tables.items.occupied(), 0);
        assert_eq!(tables.bodies.occupied(), 0);
    }
}
