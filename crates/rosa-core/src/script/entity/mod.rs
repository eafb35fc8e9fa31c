//! Script proxies over host records
//!
//! A [`Proxy`] is an [`EntityRef`] handed to Lua. It reads and writes the
//! host record in place on every access and never caches a field, so a proxy
//! kept across ticks observes whatever currently occupies its slot.

use std::fmt;
use std::ptr::NonNull;

use mlua::{AnyUserData, MetaMethod, UserData, UserDataFields, UserDataMethods};

use crate::entity::Category;
use crate::memory::EntityRef;
use crate::script::runtime;
use crate::storage::Attached;

/// Reference to one slot of a host array, as seen by scripts
pub struct Proxy<T: Category>(pub EntityRef<T>);

impl<T: Category> Proxy<T> {
    pub fn index(&self) -> usize {
        self.0.index()
    }

    pub fn as_ptr(&self) -> *mut T {
        self.0.as_ptr()
    }

    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.0.read(f)
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        self.0.write(f)
    }

    /// Slot index as the host's `int` id
    pub fn id(&self) -> i32 {
        self.index() as i32
    }
}

/// Record embedded in another record, e.g. a human's bone
pub struct Member<T: Copy + 'static> {
    ptr: NonNull<T>,
    index: usize,
}

impl<T: Copy + 'static> Member<T> {
    /// # Safety
    /// `ptr` must point into a host record that outlives the member.
    pub(crate) unsafe fn new(ptr: *mut T, index: usize) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr, index })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn as_ptr(&self) -> *mut T {
        self.ptr.as_ptr()
    }

    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        // SAFETY: guaranteed by the constructor contract.
        f(unsafe { self.ptr.as_ref() })
    }

    pub fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        // SAFETY: guaranteed by the constructor contract.
        f(unsafe { &mut *self.ptr.as_ptr() })
    }
}

impl<T: Copy + 'static> fmt::Debug for Member<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Member({}) @ {:#x}", self.index, self.ptr.as_ptr() as usize)
    }
}

/// Integer or float fields exposed under their script names
macro_rules! scalar_fields {
    ($fields:ident { $($name:literal => $field:ident: $ty:ty),* $(,)? }) => {$(
        $fields.add_field_method_get($name, |_, this| Ok(this.read(|r| r.$field)));
        $fields.add_field_method_set($name, |_, this, value: $ty| {
            this.write(|r| r.$field = value);
            Ok(())
        });
    )*};
}

/// `int` flags exposed as booleans
macro_rules! flag_fields {
    ($fields:ident { $($name:literal => $field:ident),* $(,)? }) => {$(
        $fields.add_field_method_get($name, |_, this| Ok(this.read(|r| r.$field != 0)));
        $fields.add_field_method_set($name, |_, this, value: bool| {
            this.write(|r| r.$field = value as i32);
            Ok(())
        });
    )*};
}

/// Embedded vectors, handed out by reference
macro_rules! vector_fields {
    ($fields:ident { $($name:literal => $field:ident),* $(,)? }) => {$(
        $fields.add_field_method_get($name, |_, this| {
            let ptr = this.as_ptr();
            // SAFETY: the field lies inside a host record that is never freed.
            Ok(unsafe { $crate::script::LuaVector::host(&raw mut (*ptr).$field) })
        });
        $fields.add_field_method_set($name, |_, this, value: mlua::UserDataRef<$crate::script::LuaVector>| {
            let value = value.get();
            this.write(|r| r.$field = value);
            Ok(())
        });
    )*};
}

/// Embedded rotation matrices, handed out by reference
macro_rules! rotation_fields {
    ($fields:ident { $($name:literal => $field:ident),* $(,)? }) => {$(
        $fields.add_field_method_get($name, |_, this| {
            let ptr = this.as_ptr();
            // SAFETY: as for vector fields.
            Ok(unsafe { $crate::script::LuaRotMatrix::host(&raw mut (*ptr).$field) })
        });
        $fields.add_field_method_set($name, |_, this, value: mlua::UserDataRef<$crate::script::LuaRotMatrix>| {
            let value = value.get();
            this.write(|r| r.$field = value);
            Ok(())
        });
    )*};
}

/// Fixed-size host strings
macro_rules! text_fields {
    ($fields:ident { $($name:literal => $field:ident),* $(,)? }) => {$(
        $fields.add_field_method_get($name, |_, this| {
            Ok(this.read(|r| $crate::game::read_fixed_str(&r.$field)))
        });
        $fields.add_field_method_set($name, |_, this, value: String| {
            this.write(|r| $crate::game::write_fixed_str(&mut r.$field, &value));
            Ok(())
        });
    )*};
}

/// Cross-references that may be cleared by assigning `nil`
macro_rules! reference_fields {
    ($fields:ident { $($name:literal => $field:ident: $target:ty),* $(,)? }) => {$(
        reference_getters!($fields { $name => $field: $target });
        $fields.add_field_method_set($name, |_, this, value: Option<mlua::UserDataRef<$crate::script::Proxy<$target>>>| {
            let id = value.map_or($crate::memory::layout::NO_REFERENCE, |other| other.id());
            this.write(|r| r.$field = id);
            Ok(())
        });
    )*};
}

/// Read-only cross-references
macro_rules! reference_getters {
    ($fields:ident { $($name:literal => $field:ident: $target:ty),* $(,)? }) => {$(
        $fields.add_field_method_get($name, |lua, this| {
            let raw = this.read(|r| r.$field);
            $crate::script::entity_value::<$target>(&*$crate::script::runtime(lua)?, lua, raw)
        });
    )*};
}

mod human;
mod item;
mod physics;
mod player;
mod world;

/// `index`, `__tostring` and `__eq`, shared by every category
fn add_identity<T, F>(fields: &mut F)
where
    T: Category,
    Proxy<T>: UserData,
    F: UserDataFields<Proxy<T>>,
{
    fields.add_field_method_get("index", |_, this| Ok(this.index()));
}

fn add_identity_methods<T, M>(methods: &mut M)
where
    T: Category,
    Proxy<T>: UserData,
    M: UserDataMethods<Proxy<T>>,
{
    methods.add_meta_method(MetaMethod::ToString, |_, this, ()| Ok(this.0.to_string()));
    methods.add_meta_method(MetaMethod::Eq, |_, this, other: AnyUserData| {
        Ok(other
            .borrow::<Proxy<T>>()
            .map(|other| other.0 == this.0)
            .unwrap_or(false))
    });
}

/// `data`, the slot's side-storage table
fn add_data<T, F>(fields: &mut F)
where
    T: Attached,
    Proxy<T>: UserData,
    F: UserDataFields<Proxy<T>>,
{
    fields.add_field_method_get("data", |lua, this| runtime(lua)?.data::<T>(lua, this.index()));
}

/// `isActive` for categories that keep an active flag
fn add_active<T, F>(fields: &mut F)
where
    T: Category,
    Proxy<T>: UserData,
    F: UserDataFields<Proxy<T>>,
{
    fields.add_field_method_get("isActive", |_, this| Ok(this.0.is_active()));
}

/// Address of the record any entity or member proxy refers to
pub fn record_address(ud: &AnyUserData) -> Option<usize> {
    macro_rules! try_proxies {
        ($($ty:ty),*) => {$(
            if let Ok(proxy) = ud.borrow::<Proxy<$ty>>() {
                return Some(proxy.0.address());
            }
        )*};
    }
    macro_rules! try_members {
        ($($ty:ty),*) => {$(
            if let Ok(member) = ud.borrow::<Member<$ty>>() {
                return Some(member.as_ptr() as usize);
            }
        )*};
    }
    use crate::game::*;
    try_proxies!(
        Connection, Account, Player, Human, ItemType, Item, Vehicle, Bullet, RigidBody, Bond,
        Street, StreetIntersection
    );
    try_members!(Action, MenuButton, Bone, StreetLane);
    None
}

/// Index argument of a sub-record accessor, checked against `bound`
fn member_index(category: &'static str, index: i64, bound: usize) -> crate::error::Result<usize> {
    match usize::try_from(index) {
        Ok(i) if i < bound => Ok(i),
        _ => Err(crate::error::Error::out_of_range(category, index, bound)),
    }
}
