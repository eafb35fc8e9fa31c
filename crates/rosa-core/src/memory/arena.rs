//! Views over the host's statically allocated record arrays.
//!
//! An [`Arena`] is a non-owning description of one host array: the address of
//! its first element and how far it extends. It never allocates, frees or
//! moves the array; the host owns it for the life of the process.

use std::fmt;
use std::mem;
use std::ptr::NonNull;

use bytemuck::Zeroable;

use crate::error::{Error, Result};
use crate::memory::layout::NO_REFERENCE;

/// How a category marks which of its slots denote live entities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Each slot carries its own active flag; slots are recycled in place
    Flag,
    /// Live entries are packed at the front; the first inactive slot ends the list
    Prefix,
    /// Every slot inside the arena's bound is live
    Dense,
}

/// A record type stored in one of the host's arrays
pub trait Record: Copy + Zeroable + fmt::Debug + 'static {
    /// Category name used for display and error messages
    const NAME: &'static str;
    const LIVENESS: Liveness;

    fn is_active(&self) -> bool {
        true
    }
}

/// Extent of a host array
#[derive(Debug, Clone, Copy)]
pub enum Extent {
    /// Fixed number of slots; every index below it is addressable
    Fixed(usize),
    /// Densely filled array whose live length is kept in a host counter
    Counted {
        counter: NonNull<i32>,
        capacity: usize,
    },
}

impl Extent {
    fn capacity(&self) -> usize {
        match *self {
            Extent::Fixed(capacity) => capacity,
            Extent::Counted { capacity, .. } => capacity,
        }
    }

    fn bound(&self) -> usize {
        match *self {
            Extent::Fixed(capacity) => capacity,
            Extent::Counted { counter, capacity } => {
                // SAFETY: the counter address was resolved together with the array
                // and lives in the host's static data for the whole process.
                let live = unsafe { counter.as_ptr().read_volatile() };
                usize::try_from(live).unwrap_or(0).min(capacity)
            }
        }
    }
}

/// Non-owning handle to a host array of `T`
pub struct Arena<T: Record> {
    base: NonNull<T>,
    extent: Extent,
}

impl<T: Record> Clone for Arena<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Record> Copy for Arena<T> {}

impl<T: Record> fmt::Debug for Arena<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("category", &T::NAME)
            .field("base", &self.base)
            .field("extent", &self.extent)
            .finish()
    }
}

impl<T: Record> Arena<T> {
    /// Describe a host array starting at `base`.
    ///
    /// # Safety
    /// `base` must point to `extent`'s capacity of contiguous `T` records that
    /// stay allocated for as long as this arena or any view derived from it is
    /// used. A counted extent's counter must stay valid for the same duration.
    pub unsafe fn from_raw_parts(base: *mut T, extent: Extent) -> Result<Self> {
        let base = NonNull::new(base).ok_or(Error::ArrayNotResolved(T::NAME))?;
        Ok(Self { base, extent })
    }

    pub fn base(&self) -> NonNull<T> {
        self.base
    }

    /// Number of slots the host reserved for this array
    pub fn capacity(&self) -> usize {
        self.extent.capacity()
    }

    /// Exclusive upper bound accepted by [`Arena::get`]
    pub fn bound(&self) -> usize {
        self.extent.bound()
    }

    /// Slot index of a record inside this array, derived from its address
    pub fn index_of(&self, ptr: NonNull<T>) -> usize {
        (ptr.as_ptr() as usize - self.base.as_ptr() as usize) / mem::size_of::<T>()
    }

    /// Whether `ptr` addresses the start of one of this array's slots
    pub fn contains(&self, ptr: NonNull<T>) -> bool {
        let base = self.base.as_ptr() as usize;
        let addr = ptr.as_ptr() as usize;
        let size = mem::size_of::<T>();
        addr >= base && (addr - base) % size == 0 && (addr - base) / size < self.capacity()
    }

    /// View of slot `index`, whether or not it is currently live
    pub fn get(&self, index: i64) -> Result<EntityRef<T>> {
        let bound = self.bound();
        match usize::try_from(index) {
            Ok(i) if i < bound => Ok(self.slot(i)),
            _ => Err(Error::out_of_range(T::NAME, index, bound)),
        }
    }

    /// Follow a stored cross-reference; the sentinel yields `None`
    pub fn reference(&self, raw: i32) -> Result<Option<EntityRef<T>>> {
        if raw == NO_REFERENCE {
            return Ok(None);
        }
        match usize::try_from(raw) {
            Ok(i) if i < self.capacity() => Ok(Some(self.slot(i))),
            _ => Err(Error::out_of_range(T::NAME, raw.into(), self.capacity())),
        }
    }

    /// Number of live entities
    pub fn count(&self) -> usize {
        match T::LIVENESS {
            Liveness::Flag => self.iter().filter(|e| e.is_active()).count(),
            Liveness::Prefix => self.iter().take_while(|e| e.is_active()).count(),
            Liveness::Dense => self.bound(),
        }
    }

    /// Live entities in ascending slot order
    pub fn live(&self) -> Vec<EntityRef<T>> {
        match T::LIVENESS {
            Liveness::Flag => self.iter().filter(|e| e.is_active()).collect(),
            Liveness::Prefix => self.iter().take_while(|e| e.is_active()).collect(),
            Liveness::Dense => self.iter().collect(),
        }
    }

    /// Every addressable slot, live or not
    pub fn iter(&self) -> impl Iterator<Item = EntityRef<T>> + '_ {
        (0..self.bound()).map(move |i| self.slot(i))
    }

    fn slot(&self, index: usize) -> EntityRef<T> {
        debug_assert!(index < self.capacity());
        // SAFETY: index is below the capacity the arena was created with.
        let ptr = unsafe { NonNull::new_unchecked(self.base.as_ptr().add(index)) };
        EntityRef { arena: *self, ptr }
    }
}

/// Identity-free view of one slot in a host array.
///
/// The view stores only the slot's address. Its index is recomputed from that
/// address every time it is asked for and is only meaningful while the slot
/// keeps its current occupant.
pub struct EntityRef<T: Record> {
    arena: Arena<T>,
    ptr: NonNull<T>,
}

impl<T: Record> Clone for EntityRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: Record> Copy for EntityRef<T> {}

impl<T: Record> EntityRef<T> {
    pub fn index(&self) -> usize {
        self.arena.index_of(self.ptr)
    }

    pub fn arena(&self) -> &Arena<T> {
        &self.arena
    }

    pub fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    pub fn address(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    pub fn is_active(&self) -> bool {
        self.read(|r| r.is_active())
    }

    /// Inspect the record in place
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        // SAFETY: the pointer addresses a slot of a live host array and the host
        // is not running while crate code holds the reference.
        f(unsafe { self.ptr.as_ref() })
    }

    /// Mutate the record in place
    pub fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        // SAFETY: see `read`; the reference does not escape the closure.
        f(unsafe { &mut *self.ptr.as_ptr() })
    }
}

impl<T: Record> PartialEq for EntityRef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.ptr == other.ptr
    }
}

impl<T: Record> Eq for EntityRef<T> {}

impl<T: Record> fmt::Display for EntityRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", T::NAME, self.index())
    }
}

impl<T: Record> fmt::Debug for EntityRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}) @ {:#x}", T::NAME, self.index(), self.address())
    }
}
