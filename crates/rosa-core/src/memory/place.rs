use std::ptr::NonNull;

/// A value that lives either in crate-owned storage or inside host memory.
///
/// Script-side vectors and rotation matrices use this so that a value built
/// by script code and a field embedded in a host record share one type. Reads
/// and writes through a `Host` place go straight to the host's memory.
#[derive(Debug, Clone, Copy)]
pub enum Place<T: Copy> {
    Owned(T),
    Host(NonNull<T>),
}

impl<T: Copy> Place<T> {
    /// Refer to a value embedded in host memory.
    ///
    /// # Safety
    /// `ptr` must stay valid for reads and writes for as long as the place, or
    /// any copy of it, is used.
    pub unsafe fn host(ptr: *mut T) -> Option<Self> {
        NonNull::new(ptr).map(Place::Host)
    }

    pub fn get(&self) -> T {
        match self {
            Place::Owned(value) => *value,
            // SAFETY: guaranteed by the constructor contract.
            Place::Host(ptr) => unsafe { ptr.as_ptr().read_unaligned() },
        }
    }

    pub fn set(&mut self, value: T) {
        match self {
            Place::Owned(slot) => *slot = value,
            // SAFETY: guaranteed by the constructor contract.
            Place::Host(ptr) => unsafe { ptr.as_ptr().write_unaligned(value) },
        }
    }

    /// Apply `f` to the value and store the result back
    pub fn update(&mut self, f: impl FnOnce(&mut T)) {
        let mut value = self.get();
        f(&mut value);
        self.set(value);
    }

    /// Address inside host memory, if this place refers to one
    pub fn address(&self) -> Option<usize> {
        match self {
            Place::Owned(_) => None,
            Place::Host(ptr) => Some(ptr.as_ptr() as usize),
        }
    }
}

impl<T: Copy> From<T> for Place<T> {
    fn from(value: T) -> Self {
        Place::Owned(value)
    }
}
