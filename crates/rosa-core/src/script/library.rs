//! One global table per entity category

use std::ptr;

use mlua::{IntoLua, Lua, Table, UserData, UserDataRef, Value};

use super::value::{to_rotation, to_vector};
use super::{LuaRotMatrix, LuaVector, Proxy, runtime};
use crate::entity::Category;
use crate::error::Error;
use crate::game::*;
use crate::memory::layout::{NO_REFERENCE, player};
use crate::memory::{Arena, EntityRef};
use crate::runtime::Runtime;
use crate::storage::Attached;

fn arena<T: Category>(lua: &Lua) -> mlua::Result<Arena<T>> {
    Ok(runtime(lua)?.world().arena::<T>()?)
}

/// `getCount`, `getAll` and `getByIndex`
fn category<T: Category>(lua: &Lua) -> mlua::Result<Table>
where
    Proxy<T>: UserData,
{
    let table = lua.create_table()?;
    table.set(
        "getCount",
        lua.create_function(|lua, ()| Ok(arena::<T>(lua)?.count()))?,
    )?;
    table.set(
        "getAll",
        lua.create_function(|lua, ()| {
            lua.create_sequence_from(arena::<T>(lua)?.live().into_iter().map(Proxy))
        })?,
    )?;
    table.set(
        "getByIndex",
        lua.create_function(|lua, index: i64| Ok(Proxy(arena::<T>(lua)?.get(index)?)))?,
    )?;
    Ok(table)
}

/// Entity the host just allocated at `id`, with any data left by the slot's
/// previous occupant dropped; `None` when the host refused
fn created<T: Attached>(rt: &Runtime, id: i32) -> mlua::Result<Option<EntityRef<T>>> {
    let Some(entity) = rt.world().arena::<T>()?.reference(id)? else {
        return Ok(None);
    };
    rt.clear_data::<T>(entity.index());
    Ok(Some(entity))
}

fn item_type_id(value: &Value) -> mlua::Result<i32> {
    match value {
        Value::Integer(id) => i32::try_from(*id)
            .map_err(|_| Error::InvalidArgument(format!("item type {id} is out of range")).into()),
        Value::UserData(ud) => Ok(ud.borrow::<Proxy<ItemType>>()?.id()),
        other => Err(Error::InvalidArgument(format!(
            "expected an item type, got {}",
            other.type_name()
        ))
        .into()),
    }
}

fn as_mut_ptr<T>(value: &mut Option<T>) -> *mut T {
    value.as_mut().map_or(ptr::null_mut(), |v| v as *mut T)
}

fn install_players(lua: &Lua, table: &Table) -> mlua::Result<()> {
    table.set(
        "createBot",
        lua.create_function(|lua, ()| {
            let rt = runtime(lua)?;
            // SAFETY: createplayer takes no arguments.
            let id = unsafe { rt.host().create_player() }?;
            let Some(bot) = created::<Player>(&rt, id)? else {
                return Ok(Value::Nil);
            };
            bot.write(|p| {
                p.sub_rosa_id = 0;
                p.is_bot = 1;
                p.team = player::BOT_TEAM;
                write_fixed_str(&mut p.name, player::BOT_NAME);
            });
            Proxy(bot).into_lua(lua)
        })?,
    )?;
    table.set(
        "getByPhone",
        lua.create_function(|lua, phone: i32| {
            Ok(arena::<Player>(lua)?
                .live()
                .into_iter()
                .find(|p| p.read(|p| p.phone_number) == phone)
                .map(Proxy))
        })?,
    )?;
    table.set(
        "getNonBots",
        lua.create_function(|lua, ()| {
            let players = arena::<Player>(lua)?.live();
            lua.create_sequence_from(
                players
                    .into_iter()
                    .filter(|p| p.read(|p| p.is_bot == 0 && p.sub_rosa_id != 0))
                    .map(Proxy),
            )
        })?,
    )?;
    Ok(())
}

fn install_accounts(lua: &Lua, table: &Table) -> mlua::Result<()> {
    table.set(
        "getByPhone",
        lua.create_function(|lua, phone: i32| {
            Ok(arena::<Account>(lua)?
                .live()
                .into_iter()
                .find(|a| a.read(|a| a.phone_number) == phone)
                .map(Proxy))
        })?,
    )?;
    table.set(
        "save",
        lua.create_function(|lua, ()| {
            // SAFETY: takes no arguments.
            Ok(unsafe { runtime(lua)?.host().save_accounts() }?)
        })?,
    )?;
    Ok(())
}

fn install_humans(lua: &Lua, table: &Table) -> mlua::Result<()> {
    table.set(
        "create",
        lua.create_function(
            |lua,
             (pos, rot, owner): (
                UserDataRef<LuaVector>,
                UserDataRef<LuaRotMatrix>,
                UserDataRef<Proxy<Player>>,
            )| {
                let (mut pos, mut rot) = (pos.get(), rot.get());
                let rt = runtime(lua)?;
                let previous = owner.read(|p| p.human_id);
                if previous != NO_REFERENCE {
                    // SAFETY: the id was read from the host's own player record.
                    unsafe { rt.host().delete_human(previous) }?;
                    if let Ok(index) = usize::try_from(previous) {
                        rt.clear_data::<Human>(index);
                    }
                }
                // SAFETY: both values outlive the call.
                let id = unsafe { rt.host().create_human(&mut pos, &mut rot, owner.id()) }?;
                let Some(human) = created::<Human>(&rt, id)? else {
                    return Ok(Value::Nil);
                };
                let owner_id = owner.id();
                human.write(|h| h.player_id = owner_id);
                owner.write(|p| p.human_id = id);
                Proxy(human).into_lua(lua)
            },
        )?,
    )?;
    Ok(())
}

fn install_items(lua: &Lua, table: &Table) -> mlua::Result<()> {
    // create(type, pos, [vel,] [rot])
    table.set(
        "create",
        lua.create_function(
            |lua, (kind, pos, a, b): (Value, UserDataRef<LuaVector>, Value, Value)| {
                let kind = item_type_id(&kind)?;
                let mut pos = pos.get();
                let (mut vel, mut rot) = match (to_vector(&a), to_rotation(&a)) {
                    (Some(vel), _) => (Some(vel), to_rotation(&b)),
                    (None, Some(rot)) => (None, Some(rot)),
                    (None, None) => (None, None),
                };
                let rt = runtime(lua)?;
                // SAFETY: every pointer is null or refers to a local that outlives the call.
                let id = unsafe {
                    rt.host()
                        .create_item(kind, &mut pos, as_mut_ptr(&mut vel), as_mut_ptr(&mut rot))
                }?;
                created::<Item>(&rt, id)?.map(Proxy).into_lua(lua)
            },
        )?,
    )?;
    table.set(
        "createRope",
        lua.create_function(
            |lua, (pos, rot): (UserDataRef<LuaVector>, UserDataRef<LuaRotMatrix>)| {
                let (mut pos, mut rot) = (pos.get(), rot.get());
                let rt = runtime(lua)?;
                // SAFETY: both values outlive the call.
                let id = unsafe { rt.host().create_rope(&mut pos, &mut rot) }?;
                created::<Item>(&rt, id)?.map(Proxy).into_lua(lua)
            },
        )?,
    )?;
    Ok(())
}

fn install_vehicles(lua: &Lua, table: &Table) -> mlua::Result<()> {
    // create(type, pos, [vel,] [rot,] [color])
    table.set(
        "create",
        lua.create_function(
            |lua, (kind, pos, a, b, c): (i32, UserDataRef<LuaVector>, Value, Value, Value)| {
                let mut pos = pos.get();
                let (mut vel, rot, color) = match to_vector(&a) {
                    Some(vel) => (Some(vel), b, c),
                    None => (None, a, b),
                };
                let mut rot = match rot {
                    Value::Nil => Some(RotMatrix::IDENTITY),
                    other => Some(to_rotation(&other).ok_or_else(|| {
                        Error::InvalidArgument("expected a RotMatrix".to_string())
                    })?),
                };
                let color = lua.unpack::<Option<i32>>(color)?.unwrap_or(0);
                let rt = runtime(lua)?;
                // SAFETY: as for items.
                let id = unsafe {
                    rt.host().create_object(
                        kind,
                        &mut pos,
                        as_mut_ptr(&mut vel),
                        as_mut_ptr(&mut rot),
                        color,
                    )
                }?;
                created::<Vehicle>(&rt, id)?.map(Proxy).into_lua(lua)
            },
        )?,
    )?;
    Ok(())
}

pub fn install(lua: &Lua) -> mlua::Result<()> {
    let globals = lua.globals();

    macro_rules! plain {
        ($($ty:ty),*) => {$(
            globals.set(<$ty>::LIBRARY, category::<$ty>(lua)?)?;
        )*};
    }
    plain!(Connection, ItemType, Bullet, RigidBody, Bond, Street, StreetIntersection);

    let players = category::<Player>(lua)?;
    install_players(lua, &players)?;
    globals.set(Player::LIBRARY, players)?;

    let accounts = category::<Account>(lua)?;
    install_accounts(lua, &accounts)?;
    globals.set(Account::LIBRARY, accounts)?;

    let humans = category::<Human>(lua)?;
    install_humans(lua, &humans)?;
    globals.set(Human::LIBRARY, humans)?;

    let items = category::<Item>(lua)?;
    install_items(lua, &items)?;
    globals.set(Item::LIBRARY, items)?;

    let vehicles = category::<Vehicle>(lua)?;
    install_vehicles(lua, &vehicles)?;
    globals.set(Vehicle::LIBRARY, vehicles)?;

    Ok(())
}
