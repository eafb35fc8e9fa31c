//! The `memory` table: unchecked peek and poke at process addresses

use mlua::{AnyUserData, Lua, Table};

use super::{entity, runtime, value};
use crate::error::Error;
use crate::memory::raw;

macro_rules! typed_access {
    ($table:expr, $lua:expr, { $($suffix:literal => $ty:ty),* $(,)? }) => {$(
        $table.set(
            concat!("read", $suffix),
            $lua.create_function(|_, address: usize| {
                // SAFETY: scripts own the consequences of the address they pass.
                Ok(unsafe { raw::read::<$ty>(address) }?)
            })?,
        )?;
        $table.set(
            concat!("write", $suffix),
            $lua.create_function(|_, (address, value): (usize, $ty)| {
                // SAFETY: as above.
                Ok(unsafe { raw::write::<$ty>(address, value) }?)
            })?,
        )?;
    )*};
}

fn address_of(ud: &AnyUserData) -> mlua::Result<usize> {
    entity::record_address(ud)
        .or_else(|| value::place_address(ud))
        .ok_or_else(|| Error::InvalidArgument("value has no address".to_string()).into())
}

pub fn install(lua: &Lua) -> mlua::Result<()> {
    let memory: Table = lua.create_table()?;
    memory.set(
        "getBaseAddress",
        lua.create_function(|lua, ()| Ok(runtime(lua)?.image_base()))?,
    )?;
    memory.set(
        "getAddress",
        lua.create_function(|_, ud: AnyUserData| address_of(&ud))?,
    )?;

    typed_access!(memory, lua, {
        "Byte" => i8,
        "UByte" => u8,
        "Short" => i16,
        "UShort" => u16,
        "Int" => i32,
        "UInt" => u32,
        "Long" => i64,
        "ULong" => u64,
        "Float" => f32,
        "Double" => f64,
    });

    memory.set(
        "readBytes",
        lua.create_function(|lua, (address, len): (usize, usize)| {
            // SAFETY: as for the typed reads.
            let bytes = unsafe { raw::read_bytes(address, len) }?;
            lua.create_string(&bytes)
        })?,
    )?;
    memory.set(
        "writeBytes",
        lua.create_function(|_, (address, bytes): (usize, mlua::String)| {
            // SAFETY: as for the typed writes.
            Ok(unsafe { raw::write_bytes(address, &bytes.as_bytes()) }?)
        })?,
    )?;
    lua.globals().set("memory", memory)
}
