//! The Lua environment handed to server scripts
//!
//! A fresh environment is built on start and on every environment reset. It
//! reaches the [`Runtime`] through a weak reference kept in the state's app
//! data, so dropping the runtime never leaves script functions with a
//! dangling context.

mod api;
mod entity;
pub mod http;
mod library;
mod memory;
mod value;

pub use entity::{Member, Proxy};
pub use value::{LuaRotMatrix, LuaVector};

use std::ffi::CString;
use std::fmt;
use std::rc::{Rc, Weak};

use mlua::{IntoLua, Lua, UserData, Value};
use owo_colors::OwoColorize;
use tracing::error;

use crate::entity::Category;
use crate::error::{Error, Result};
use crate::game::{RotMatrix, Vector};
use crate::runtime::Runtime;

/// Build a new Lua state with every global installed
pub fn create_environment(runtime: Weak<Runtime>, mode: &str) -> Result<Lua> {
    let lua = Lua::new();
    lua.set_app_data(runtime);
    value::install(&lua)?;
    api::install(&lua, mode)?;
    library::install(&lua)?;
    http::install(&lua)?;
    memory::install(&lua)?;
    Ok(lua)
}

/// Runtime owning the environment `lua` belongs to
pub fn runtime(lua: &Lua) -> mlua::Result<Rc<Runtime>> {
    lua.app_data_ref::<Weak<Runtime>>()
        .and_then(|this| this.upgrade())
        .ok_or_else(|| Error::NoEnvironment.into())
}

/// Log a script failure with the highlighted banner
pub fn report_error(error: &impl fmt::Display) {
    error!("{} {}", " Lua error ".white().on_red().bold(), error);
}

/// Script text as a C string; interior NULs are rejected
pub fn c_text(text: String) -> Result<CString> {
    CString::new(text).map_err(|e| Error::InvalidArgument(e.to_string()))
}

/// Lua truthiness: everything except `nil` and `false`
pub fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Nil | Value::Boolean(false))
}

/// Vector proxy over host memory; `nil` for a null pointer
pub fn vector_ref(lua: &Lua, ptr: *mut Vector) -> mlua::Result<Value> {
    // SAFETY: the pointer is a host argument valid for the duration of the hooked call.
    unsafe { LuaVector::host(ptr) }.into_lua(lua)
}

/// Rotation proxy over host memory; `nil` for a null pointer
pub fn rotation_ref(lua: &Lua, ptr: *mut RotMatrix) -> mlua::Result<Value> {
    // SAFETY: as in `vector_ref`.
    unsafe { LuaRotMatrix::host(ptr) }.into_lua(lua)
}

/// Proxy of the entity a stored reference names.
///
/// The sentinel, an id outside the category's array and an unresolved array
/// all yield `nil`.
pub fn entity_value<T: Category>(rt: &Runtime, lua: &Lua, raw: i32) -> mlua::Result<Value>
where
    Proxy<T>: UserData,
{
    let Ok(arena) = rt.world().arena::<T>() else {
        return Ok(Value::Nil);
    };
    match arena.reference(raw) {
        Ok(Some(entity)) => Proxy(entity).into_lua(lua),
        _ => Ok(Value::Nil),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::Item;
    use crate::host::mock::MockHost;
    use crate::memory::layout::NO_REFERENCE;

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&Value::Nil));
        assert!(!is_truthy(&Value::Boolean(false)));
        assert!(is_truthy(&Value::Boolean(true)));
        assert!(is_truthy(&Value::Integer(0)));
    }

    #[test]
    fn test_environment_without_runtime() {
        let lua = create_environment(Weak::new(), "default").unwrap();
        let err = lua.load("items.getCount()").exec().unwrap_err();
        assert!(err.to_string().contains("No script environment"));
    }

    #[test]
    fn test_entity_value_sentinel_and_range() {
        let mock = MockHost::new();
        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        assert!(entity_value::<Item>(&rt, &lua, NO_REFERENCE).unwrap().is_nil());
        assert!(entity_value::<Item>(&rt, &lua, 5000).unwrap().is_nil());
        assert!(entity_value::<Item>(&rt, &lua, 3).unwrap().is_userdata());
    }

    #[test]
    fn test_null_vector_ref_is_nil() {
        let lua = Lua::new();
        assert!(vector_ref(&lua, std::ptr::null_mut()).unwrap().is_nil());
        assert!(rotation_ref(&lua, std::ptr::null_mut()).unwrap().is_nil());
    }
}
