//! Replacement functions installed over the hookable host functions.
//!
//! Each trampoline has the exact signature of the function it replaces. It
//! runs the pre callback, calls the original code under a bypass unless the
//! callback suppressed it, does the native follow-up work of the event
//! (side-table clears) and finally runs the post callback.

use std::ffi::{CStr, c_char};

use mlua::{IntoLuaMulti, Lua, MultiValue, Value};
use tracing::error;

use super::{HookId, Phase};
use crate::error::{Error, Result};
use crate::game::{Human, Item, Player, RotMatrix, Vector, Vehicle};
use crate::host::Host;
use crate::memory::layout::NO_REFERENCE;
use crate::runtime::{self, ResetReason, Runtime};
use crate::script::{self, entity_value, rotation_ref, vector_ref};
use crate::storage::Attached;

/// Run one intercepted call.
///
/// `args` builds the callback arguments; it receives `Some(result)` when
/// building the post callback's arguments. A truthy first return value of the
/// pre callback skips the original, the follow-up and the post callback and
/// makes the trampoline return `suppressed`.
pub(crate) fn intercept<R, A, O, P>(
    rt: &Runtime,
    id: HookId,
    suppressed: R,
    args: A,
    original: O,
    after: P,
) -> R
where
    R: Copy,
    A: Fn(&Runtime, &Lua, Option<R>) -> mlua::Result<MultiValue>,
    O: FnOnce(&Host) -> Result<R>,
    P: FnOnce(&Runtime, R),
{
    if let Some((lua, callback)) = rt.callback(id, Phase::Pre) {
        let outcome = args(rt, &lua, None).and_then(|args| callback.call::<Value>(args));
        match outcome {
            Ok(value) if script::is_truthy(&value) => return suppressed,
            Ok(_) => {}
            Err(e) => script::report_error(&e),
        }
    }

    let result = match original(&rt.host()) {
        Ok(result) => result,
        // The redirect reported it the first time.
        Err(Error::PatchFailed { .. }) => return suppressed,
        Err(e) => {
            error!("Original of {} could not run: {}", id, e);
            return suppressed;
        }
    };
    after(rt, result);

    if let Some((lua, callback)) = rt.callback(id, Phase::Post) {
        let outcome = args(rt, &lua, Some(result)).and_then(|args| callback.call::<()>(args));
        if let Err(e) = outcome {
            script::report_error(&e);
        }
    }
    result
}

fn with_runtime<R>(id: HookId, fallback: R, f: impl FnOnce(&Runtime) -> R) -> R {
    match runtime::current() {
        Some(rt) => f(&rt),
        None => {
            error!("{} reached a trampoline on a thread without a runtime", id);
            fallback
        }
    }
}

fn no_args<R>(_: &Runtime, _: &Lua, _: Option<R>) -> mlua::Result<MultiValue> {
    Ok(MultiValue::new())
}

fn clear_slot<T: Attached>(rt: &Runtime, id: i32) {
    if let Ok(index) = usize::try_from(id) {
        rt.clear_data::<T>(index);
    }
}

fn message_text(message: *const c_char) -> Option<String> {
    if message.is_null() {
        return None;
    }
    // SAFETY: the host passes a NUL-terminated buffer.
    Some(unsafe { CStr::from_ptr(message) }.to_string_lossy().into_owned())
}

/// Address of the trampoline that replaces the function of `id`
pub fn trampoline_address(id: HookId) -> usize {
    match id {
        HookId::ResetGame => h_resetgame as usize,
        HookId::Logic => h_logic as usize,
        HookId::CreatePlayer => h_createplayer as usize,
        HookId::DeletePlayer => h_deleteplayer as usize,
        HookId::CreateHuman => h_createhuman as usize,
        HookId::DeleteHuman => h_deletehuman as usize,
        HookId::CreateItem => h_createitem as usize,
        HookId::DeleteItem => h_deleteitem as usize,
        HookId::CreateVehicle => h_createobject as usize,
        HookId::DeleteVehicle => h_deleteobject as usize,
        HookId::LinkItem => h_linkitem as usize,
        HookId::GrenadeExplode => h_grenadeexplosion as usize,
        HookId::HumanDamage => h_human_applydamage as usize,
        HookId::Message => h_createevent_message as usize,
        HookId::UpdatePlayer => h_createevent_updateplayer as usize,
        HookId::UpdatePlayerFinance => h_createevent_updateplayer_finance as usize,
        HookId::UpdateVehicle => h_createevent_updateobject as usize,
        HookId::BulletHit => h_createevent_bullethit as usize,
        HookId::SaveAccounts => h_saveaccountsserver as usize,
        HookId::LineIntersectHuman => h_lineintersecthuman as usize,
    }
}

extern "C" fn h_resetgame() {
    with_runtime(HookId::ResetGame, (), |rt| {
        rt.reset_game(ResetReason::EngineCall)
    })
}

extern "C" fn h_logic() {
    with_runtime(HookId::Logic, (), |rt| {
        rt.tick();
        intercept(
            rt,
            HookId::Logic,
            (),
            no_args,
            // SAFETY: logic takes no arguments.
            |host| unsafe { host.logic() },
            |_, ()| {},
        )
    })
}

extern "C" fn h_createplayer() -> i32 {
    with_runtime(HookId::CreatePlayer, NO_REFERENCE, |rt| {
        intercept(
            rt,
            HookId::CreatePlayer,
            NO_REFERENCE,
            |rt, lua, created| match created {
                None => Ok(MultiValue::new()),
                Some(id) => entity_value::<Player>(rt, lua, id)?.into_lua_multi(lua),
            },
            // SAFETY: createplayer takes no arguments.
            |host| unsafe { host.create_player() },
            clear_slot::<Player>,
        )
    })
}

extern "C" fn h_deleteplayer(player: i32) {
    with_runtime(HookId::DeletePlayer, (), |rt| {
        intercept(
            rt,
            HookId::DeletePlayer,
            (),
            move |rt, lua, _| entity_value::<Player>(rt, lua, player)?.into_lua_multi(lua),
            // SAFETY: forwards the host's own argument.
            move |host| unsafe { host.delete_player(player) },
            move |rt, ()| clear_slot::<Player>(rt, player),
        )
    })
}

extern "C" fn h_createhuman(pos: *mut Vector, rot: *mut RotMatrix, player: i32) -> i32 {
    with_runtime(HookId::CreateHuman, NO_REFERENCE, |rt| {
        intercept(
            rt,
            HookId::CreateHuman,
            NO_REFERENCE,
            move |rt, lua, created| match created {
                None => (
                    vector_ref(lua, pos)?,
                    rotation_ref(lua, rot)?,
                    entity_value::<Player>(rt, lua, player)?,
                )
                    .into_lua_multi(lua),
                Some(id) => entity_value::<Human>(rt, lua, id)?.into_lua_multi(lua),
            },
            // SAFETY: forwards the host's own arguments.
            move |host| unsafe { host.create_human(pos, rot, player) },
            clear_slot::<Human>,
        )
    })
}

extern "C" fn h_deletehuman(human: i32) {
    with_runtime(HookId::DeleteHuman, (), |rt| {
        intercept(
            rt,
            HookId::DeleteHuman,
            (),
            move |rt, lua, _| entity_value::<Human>(rt, lua, human)?.into_lua_multi(lua),
            // SAFETY: forwards the host's own argument.
            move |host| unsafe { host.delete_human(human) },
            move |rt, ()| clear_slot::<Human>(rt, human),
        )
    })
}

extern "C" fn h_createitem(
    item_type: i32,
    pos: *mut Vector,
    vel: *mut Vector,
    rot: *mut RotMatrix,
) -> i32 {
    with_runtime(HookId::CreateItem, NO_REFERENCE, |rt| {
        intercept(
            rt,
            HookId::CreateItem,
            NO_REFERENCE,
            move |rt, lua, created| match created {
                None => (
                    item_type,
                    vector_ref(lua, pos)?,
                    vector_ref(lua, vel)?,
                    rotation_ref(lua, rot)?,
                )
                    .into_lua_multi(lua),
                Some(id) => entity_value::<Item>(rt, lua, id)?.into_lua_multi(lua),
            },
            // SAFETY: forwards the host's own arguments.
            move |host| unsafe { host.create_item(item_type, pos, vel, rot) },
            clear_slot::<Item>,
        )
    })
}

extern "C" fn h_deleteitem(item: i32) {
    with_runtime(HookId::DeleteItem, (), |rt| {
        intercept(
            rt,
            HookId::DeleteItem,
            (),
            move |rt, lua, _| entity_value::<Item>(rt, lua, item)?.into_lua_multi(lua),
            // SAFETY: forwards the host's own argument.
            move |host| unsafe { host.delete_item(item) },
            move |rt, ()| clear_slot::<Item>(rt, item),
        )
    })
}

extern "C" fn h_createobject(
    vehicle_type: i32,
    pos: *mut Vector,
    vel: *mut Vector,
    rot: *mut RotMatrix,
    color: i32,
) -> i32 {
    with_runtime(HookId::CreateVehicle, NO_REFERENCE, |rt| {
        intercept(
            rt,
            HookId::CreateVehicle,
            NO_REFERENCE,
            move |rt, lua, created| match created {
                None => (
                    vehicle_type,
                    vector_ref(lua, pos)?,
                    vector_ref(lua, vel)?,
                    rotation_ref(lua, rot)?,
                    color,
                )
                    .into_lua_multi(lua),
                Some(id) => entity_value::<Vehicle>(rt, lua, id)?.into_lua_multi(lua),
            },
            // SAFETY: forwards the host's own arguments.
            move |host| unsafe { host.create_object(vehicle_type, pos, vel, rot, color) },
            clear_slot::<Vehicle>,
        )
    })
}

extern "C" fn h_deleteobject(vehicle: i32) {
    with_runtime(HookId::DeleteVehicle, (), |rt| {
        intercept(
            rt,
            HookId::DeleteVehicle,
            (),
            move |rt, lua, _| entity_value::<Vehicle>(rt, lua, vehicle)?.into_lua_multi(lua),
            // SAFETY: forwards the host's own argument.
            move |host| unsafe { host.delete_object(vehicle) },
            move |rt, ()| clear_slot::<Vehicle>(rt, vehicle),
        )
    })
}

extern "C" fn h_linkitem(item: i32, child_item: i32, parent_human: i32, slot: i32) -> i32 {
    with_runtime(HookId::LinkItem, 0, |rt| {
        intercept(
            rt,
            HookId::LinkItem,
            0,
            move |rt, lua, _| {
                (
                    entity_value::<Item>(rt, lua, item)?,
                    entity_value::<Item>(rt, lua, child_item)?,
                    entity_value::<Human>(rt, lua, parent_human)?,
                    slot,
                )
                    .into_lua_multi(lua)
            },
            // SAFETY: forwards the host's own arguments.
            move |host| unsafe { host.link_item(item, child_item, parent_human, slot) },
            |_, _| {},
        )
    })
}

extern "C" fn h_grenadeexplosion(item: i32) {
    with_runtime(HookId::GrenadeExplode, (), |rt| {
        intercept(
            rt,
            HookId::GrenadeExplode,
            (),
            move |rt, lua, _| entity_value::<Item>(rt, lua, item)?.into_lua_multi(lua),
            // SAFETY: forwards the host's own argument.
            move |host| unsafe { host.grenade_explosion(item) },
            |_, ()| {},
        )
    })
}

extern "C" fn h_human_applydamage(human: i32, bone: i32, unknown: i32, damage: i32) {
    with_runtime(HookId::HumanDamage, (), |rt| {
        intercept(
            rt,
            HookId::HumanDamage,
            (),
            move |rt, lua, _| {
                (entity_value::<Human>(rt, lua, human)?, bone, damage).into_lua_multi(lua)
            },
            // SAFETY: forwards the host's own arguments.
            move |host| unsafe { host.human_apply_damage(human, bone, unknown, damage) },
            |_, ()| {},
        )
    })
}

extern "C" fn h_createevent_message(kind: i32, message: *mut c_char, speaker: i32, distance: i32) {
    with_runtime(HookId::Message, (), |rt| {
        intercept(
            rt,
            HookId::Message,
            (),
            move |_, lua, _| (kind, message_text(message), speaker, distance).into_lua_multi(lua),
            // SAFETY: forwards the host's own arguments.
            move |host| unsafe { host.event_message(kind, message, speaker, distance) },
            |_, ()| {},
        )
    })
}

extern "C" fn h_createevent_updateplayer(player: i32) {
    with_runtime(HookId::UpdatePlayer, (), |rt| {
        intercept(
            rt,
            HookId::UpdatePlayer,
            (),
            move |rt, lua, _| entity_value::<Player>(rt, lua, player)?.into_lua_multi(lua),
            // SAFETY: forwards the host's own argument.
            move |host| unsafe { host.event_update_player(player) },
            |_, ()| {},
        )
    })
}

extern "C" fn h_createevent_updateplayer_finance(player: i32) {
    with_runtime(HookId::UpdatePlayerFinance, (), |rt| {
        intercept(
            rt,
            HookId::UpdatePlayerFinance,
            (),
            move |rt, lua, _| entity_value::<Player>(rt, lua, player)?.into_lua_multi(lua),
            // SAFETY: forwards the host's own argument.
            move |host| unsafe { host.event_update_player_finance(player) },
            |_, ()| {},
        )
    })
}

extern "C" fn h_createevent_updateobject(
    vehicle: i32,
    update_type: i32,
    part: i32,
    pos: *mut Vector,
    normal: *mut Vector,
) {
    with_runtime(HookId::UpdateVehicle, (), |rt| {
        intercept(
            rt,
            HookId::UpdateVehicle,
            (),
            move |rt, lua, _| {
                (
                    entity_value::<Vehicle>(rt, lua, vehicle)?,
                    update_type,
                    part,
                    vector_ref(lua, pos)?,
                    vector_ref(lua, normal)?,
                )
                    .into_lua_multi(lua)
            },
            // SAFETY: forwards the host's own arguments.
            move |host| unsafe { host.event_update_object(vehicle, update_type, part, pos, normal) },
            |_, ()| {},
        )
    })
}

extern "C" fn h_createevent_bullethit(
    unknown: i32,
    hit_type: i32,
    pos: *mut Vector,
    normal: *mut Vector,
) {
    with_runtime(HookId::BulletHit, (), |rt| {
        intercept(
            rt,
            HookId::BulletHit,
            (),
            move |_, lua, _| {
                (hit_type, vector_ref(lua, pos)?, vector_ref(lua, normal)?).into_lua_multi(lua)
            },
            // SAFETY: forwards the host's own arguments.
            move |host| unsafe { host.event_bullet_hit(unknown, hit_type, pos, normal) },
            |_, ()| {},
        )
    })
}

extern "C" fn h_saveaccountsserver() {
    with_runtime(HookId::SaveAccounts, (), |rt| {
        intercept(
            rt,
            HookId::SaveAccounts,
            (),
            no_args,
            // SAFETY: saveaccountsserver takes no arguments.
            |host| unsafe { host.save_accounts() },
            |_, ()| {},
        )
    })
}

extern "C" fn h_lineintersecthuman(human: i32, a: *mut Vector, b: *mut Vector) -> i32 {
    with_runtime(HookId::LineIntersectHuman, 0, |rt| {
        intercept(
            rt,
            HookId::LineIntersectHuman,
            0,
            move |rt, lua, _| {
                (
                    entity_value::<Human>(rt, lua, human)?,
                    vector_ref(lua, a)?,
                    vector_ref(lua, b)?,
                )
                    .into_lua_multi(lua)
            },
            // SAFETY: forwards the host's own arguments.
            move |host| unsafe { host.line_intersect_human(human, a, b) },
            |_, _| {},
        )
    })
}
