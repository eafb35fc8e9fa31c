//! Free-standing globals: printing, hooks, chat, events, physics queries and
//! the `os` additions

use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use mlua::{Function, Lua, Table, UserDataRef, Value, Variadic};
use tracing::info;

use super::{LuaVector, Proxy, c_text, runtime};
use crate::error::Error;
use crate::fs;
use crate::game::{Human, LineIntersectResult, Vector, Vehicle};
use crate::hook::HookId;
use crate::memory::layout::message;
use crate::runtime::ResetReason;

fn install_print(lua: &Lua) -> mlua::Result<()> {
    let print = lua.create_function(|lua, args: Variadic<Value>| {
        let tostring: Function = lua.globals().get("tostring")?;
        let parts = args
            .iter()
            .map(|value| tostring.call::<String>(value.clone()))
            .collect::<mlua::Result<Vec<_>>>()?;
        info!(target: "rosa::script", "{}", parts.join("\t"));
        Ok(())
    })?;
    lua.globals().set("print", print)?;

    // Console text without a line break, e.g. a prompt.
    let print_append = lua.create_function(|_, text: String| {
        let mut out = io::stdout().lock();
        out.write_all(text.as_bytes())
            .and_then(|()| out.flush())
            .map_err(Error::Io)?;
        Ok(())
    })?;
    lua.globals().set("printAppend", print_append)
}

fn install_server(lua: &Lua, mode: &str) -> mlua::Result<()> {
    let globals = lua.globals();
    globals.set(
        "flagStateForReset",
        lua.create_function(|lua, mode: String| {
            runtime(lua)?.flag_reset(&mode);
            Ok(())
        })?,
    )?;

    let server = lua.create_table()?;
    server.set("mode", mode)?;
    server.set(
        "reset",
        lua.create_function(|lua, ()| {
            runtime(lua)?.reset_game(ResetReason::ScriptCall);
            Ok(())
        })?,
    )?;
    globals.set("server", server)
}

fn install_hook(lua: &Lua) -> mlua::Result<()> {
    let hook = lua.create_table()?;
    hook.set(
        "set",
        lua.create_function(|lua, (name, callback): (String, Option<Function>)| {
            let replaced = runtime(lua)?.hooks_mut().set(&name, callback);
            match replaced {
                Some(_) => Ok(()),
                None => Err(Error::InvalidArgument(format!("Unknown event {name}")).into()),
            }
        })?,
    )?;
    hook.set(
        "enable",
        lua.create_function(|lua, name: String| Ok(runtime(lua)?.hooks_mut().enable(&name)))?,
    )?;
    hook.set(
        "disable",
        lua.create_function(|lua, name: String| Ok(runtime(lua)?.hooks_mut().disable(&name)))?,
    )?;
    hook.set(
        "clear",
        lua.create_function(|lua, ()| {
            runtime(lua)?.hooks_mut().clear();
            Ok(())
        })?,
    )?;
    hook.set(
        "isEnabled",
        lua.create_function(|lua, name: String| {
            let rt = runtime(lua)?;
            Ok(HookId::parse_event(&name).is_some_and(|(id, _)| rt.hooks().is_enabled(id)))
        })?,
    )?;
    lua.globals().set("hook", hook)
}

/// Send `text` through the host's message event
fn send_message(lua: &Lua, kind: i32, text: String, speaker: i32, distance: i32) -> mlua::Result<()> {
    let text = c_text(text)?;
    // SAFETY: the host reads the NUL-terminated text during the call only.
    Ok(unsafe {
        runtime(lua)?
            .host()
            .event_message(kind, text.as_ptr().cast_mut(), speaker, distance)
    }?)
}

fn install_chat(lua: &Lua) -> mlua::Result<()> {
    let chat = lua.create_table()?;
    chat.set(
        "announce",
        lua.create_function(|lua, text: String| {
            send_message(lua, message::ANNOUNCE, text, message::NO_SPEAKER, 0)
        })?,
    )?;
    chat.set(
        "tellAdmins",
        lua.create_function(|lua, text: String| {
            send_message(lua, message::ADMINS, text, message::NO_SPEAKER, 0)
        })?,
    )?;
    chat.set(
        "addRaw",
        lua.create_function(
            |lua, (kind, text, speaker, distance): (i32, String, i32, i32)| {
                send_message(lua, kind, text, speaker, distance)
            },
        )?,
    )?;
    lua.globals().set("chat", chat)
}

fn install_events(lua: &Lua) -> mlua::Result<()> {
    let events = lua.create_table()?;
    events.set(
        "createSound",
        lua.create_function(
            |lua,
             (sound, pos, volume, pitch): (
                i32,
                UserDataRef<LuaVector>,
                Option<f32>,
                Option<f32>,
            )| {
                let mut pos = pos.get();
                // SAFETY: the position outlives the call.
                Ok(unsafe {
                    runtime(lua)?.host().event_sound(
                        sound,
                        &mut pos,
                        volume.unwrap_or(1.0),
                        pitch.unwrap_or(1.0),
                    )
                }?)
            },
        )?,
    )?;
    events.set(
        "createExplosion",
        lua.create_function(|lua, pos: UserDataRef<LuaVector>| {
            let mut pos = pos.get();
            // SAFETY: as above.
            Ok(unsafe { runtime(lua)?.host().event_explosion(0, &mut pos) }?)
        })?,
    )?;
    events.set(
        "createBulletHit",
        lua.create_function(
            |lua,
             (hit_type, pos, normal): (i32, UserDataRef<LuaVector>, UserDataRef<LuaVector>)| {
                let (mut pos, mut normal) = (pos.get(), normal.get());
                // SAFETY: as above.
                Ok(unsafe {
                    runtime(lua)?
                        .host()
                        .event_bullet_hit(0, hit_type, &mut pos, &mut normal)
                }?)
            },
        )?,
    )?;
    lua.globals().set("events", events)
}

/// Result table of a line intersection query; only `hit` is set on a miss
fn intersection(
    lua: &Lua,
    hit: i32,
    extra: impl FnOnce(&Table, &LineIntersectResult) -> mlua::Result<()>,
) -> mlua::Result<Table> {
    let table = lua.create_table()?;
    table.set("hit", hit != 0)?;
    if hit != 0 {
        let result = runtime(lua)?.world().line_intersect_result()?;
        table.set("pos", LuaVector::owned(result.pos))?;
        table.set("normal", LuaVector::owned(result.normal))?;
        table.set("fraction", result.fraction)?;
        extra(&table, &result)?;
    }
    Ok(table)
}

fn segment(a: UserDataRef<LuaVector>, b: UserDataRef<LuaVector>) -> (Vector, Vector) {
    (a.get(), b.get())
}

fn install_physics(lua: &Lua) -> mlua::Result<()> {
    let physics = lua.create_table()?;
    physics.set(
        "lineIntersectLevel",
        lua.create_function(|lua, (a, b): (UserDataRef<LuaVector>, UserDataRef<LuaVector>)| {
            let (mut a, mut b) = segment(a, b);
            // SAFETY: both points outlive the call.
            let hit = unsafe { runtime(lua)?.host().line_intersect_level(&mut a, &mut b) }?;
            intersection(lua, hit, |_, _| Ok(()))
        })?,
    )?;
    physics.set(
        "lineIntersectHuman",
        lua.create_function(
            |lua,
             (human, a, b): (
                UserDataRef<Proxy<Human>>,
                UserDataRef<LuaVector>,
                UserDataRef<LuaVector>,
            )| {
                let (mut a, mut b) = segment(a, b);
                // SAFETY: as above.
                let hit = unsafe {
                    runtime(lua)?
                        .host()
                        .line_intersect_human(human.id(), &mut a, &mut b)
                }?;
                intersection(lua, hit, |table, result| table.set("bone", result.human_bone))
            },
        )?,
    )?;
    physics.set(
        "lineIntersectVehicle",
        lua.create_function(
            |lua,
             (vehicle, a, b): (
                UserDataRef<Proxy<Vehicle>>,
                UserDataRef<LuaVector>,
                UserDataRef<LuaVector>,
            )| {
                let (mut a, mut b) = segment(a, b);
                // SAFETY: as above.
                let hit = unsafe {
                    runtime(lua)?
                        .host()
                        .line_intersect_object(vehicle.id(), &mut a, &mut b)
                }?;
                intersection(lua, hit, |table, result| {
                    // The bone slot carries the wheel index when no face was hit.
                    if result.vehicle_face == -1 {
                        table.set("wheel", result.human_bone)
                    } else {
                        table.set("face", result.vehicle_face)
                    }
                })
            },
        )?,
    )?;
    physics.set(
        "lineIntersectTriangle",
        lua.create_function(
            |lua,
             (out_pos, normal, a, b, t1, t2, t3): (
                UserDataRef<LuaVector>,
                UserDataRef<LuaVector>,
                UserDataRef<LuaVector>,
                UserDataRef<LuaVector>,
                UserDataRef<LuaVector>,
                UserDataRef<LuaVector>,
                UserDataRef<LuaVector>,
            )| {
                let (mut hit_pos, mut hit_normal) = (out_pos.get(), normal.get());
                let mut points = [a.get(), b.get(), t1.get(), t2.get(), t3.get()];
                let [a, b, t1, t2, t3] = &mut points;
                let mut fraction = 0.0f32;
                // SAFETY: every pointer refers to a local that outlives the call.
                let hit = unsafe {
                    runtime(lua)?.host().line_intersect_triangle(
                        &mut hit_pos,
                        &mut hit_normal,
                        &mut fraction,
                        a,
                        b,
                        t1,
                        t2,
                        t3,
                    )
                }?;
                if hit == 0 {
                    return Ok(None);
                }
                out_pos.set(hit_pos);
                normal.set(hit_normal);
                Ok(Some(fraction))
            },
        )?,
    )?;
    physics.set(
        "garbageCollectBullets",
        lua.create_function(|lua, ()| {
            // SAFETY: takes no arguments.
            Ok(unsafe { runtime(lua)?.host().bullet_time_to_live() }?)
        })?,
    )?;
    lua.globals().set("physics", physics)
}

fn install_os(lua: &Lua) -> mlua::Result<()> {
    let os: Table = lua.globals().get("os")?;
    os.set(
        "listDirectory",
        lua.create_function(|lua, path: String| {
            let entries = fs::list_directory(&path)?;
            let tables = entries
                .into_iter()
                .map(|entry| {
                    let table = lua.create_table()?;
                    table.set("isDirectory", entry.is_directory)?;
                    table.set("name", entry.name)?;
                    table.set("stem", entry.stem)?;
                    table.set("extension", entry.extension)?;
                    Ok(table)
                })
                .collect::<mlua::Result<Vec<_>>>()?;
            lua.create_sequence_from(tables)
        })?,
    )?;
    os.set(
        "createDirectory",
        lua.create_function(|_, path: String| Ok(fs::create_directory(&path)?))?,
    )?;
    os.set(
        "realClock",
        lua.create_function(|_, ()| {
            let elapsed = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default();
            Ok(elapsed.as_secs_f64())
        })?,
    )?;
    Ok(())
}

pub fn install(lua: &Lua, mode: &str) -> mlua::Result<()> {
    install_print(lua)?;
    install_server(lua, mode)?;
    install_hook(lua)?;
    install_chat(lua)?;
    install_events(lua)?;
    install_physics(lua)?;
    install_os(lua)
}

#[cfg(test)]
mod tests {
    use crate::host::HostFunction;
    use crate::host::mock::{self, MockHost};
    use crate::hook::HookId;

    #[test]
    fn test_hook_table() {
        let mock = MockHost::new();
        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        let ok: bool = lua
            .load(
                r#"
                hook.set("PostCreateItem", function() end)
                local known = hook.enable("PostCreateItem")
                local unknown = hook.enable("Nonsense")
                local enabled = hook.isEnabled("CreateItem")
                hook.clear()
                return known and not unknown and enabled and not hook.isEnabled("CreateItem")
                "#,
            )
            .eval()
            .unwrap();
        assert!(ok);
        assert!(!rt.hooks().is_enabled(HookId::CreateItem));
        assert!(lua.load("hook.set('Nonsense', function() end)").exec().is_err());
    }

    #[test]
    fn test_server_reset_from_script() {
        let mock = MockHost::new();
        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        lua.load(
            r#"
            hook.set("PostResetGame", function(reason) reason_seen = reason end)
            hook.enable("ResetGame")
            server.reset()
            "#,
        )
        .exec()
        .unwrap();
        assert_eq!(mock::calls(HostFunction::ResetGame), 1);
        assert_eq!(lua.globals().get::<i32>("reason_seen").unwrap(), 3);
    }

    #[test]
    fn test_print_append() {
        let mock = MockHost::new();
        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        lua.load(r#"printAppend("")"#).exec().unwrap();
        assert!(lua.load("printAppend()").exec().is_err());
    }

    #[test]
    fn test_chat_messages() {
        let mock = MockHost::new();
        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        lua.load(
            r#"
            chat.announce("hello all")
            chat.tellAdmins("psst")
            chat.addRaw(1, "hi", 7, 3)
            "#,
        )
        .exec()
        .unwrap();
        assert_eq!(
            mock::messages(),
            vec![
                (0, "hello all".to_string(), -1, 0),
                (4, "psst".to_string(), -1, 0),
                (1, "hi".to_string(), 7, 3),
            ]
        );
    }

    #[test]
    fn test_line_intersect_level() {
        let mock = MockHost::new();
        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        let ok: bool = lua
            .load(
                r#"
                local hit = physics.lineIntersectLevel(Vector(0, 10, 0), Vector(0, -10, 0))
                local miss = physics.lineIntersectLevel(Vector(0, 10, 0), Vector(0, 5, 0))
                return hit.hit and hit.fraction == 0.5 and hit.pos.y == 0
                    and hit.normal.y == 1 and not miss.hit and miss.pos == nil
                "#,
            )
            .eval()
            .unwrap();
        assert!(ok);
    }

    #[test]
    fn test_line_intersect_vehicle_face_or_wheel() {
        let mock = MockHost::new();
        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        let ok: bool = lua
            .load(
                r#"
                local car = vehicles.create(13, Vector())
                local body = physics.lineIntersectVehicle(car, Vector(1, 4, 0), Vector(1, -4, 0))
                local wheel = physics.lineIntersectVehicle(car, Vector(-1, 4, 0), Vector(-1, -4, 0))
                local miss = physics.lineIntersectVehicle(car, Vector(0, 4, 0), Vector(0, 2, 0))
                return body.hit and body.face == 5 and body.wheel == nil
                    and wheel.hit and wheel.wheel == 2 and wheel.face == nil
                    and wheel.fraction == 0.5 and not miss.hit
                "#,
            )
            .eval()
            .unwrap();
        assert!(ok);
        assert_eq!(mock::calls(HostFunction::LineIntersectObject), 3);
    }

    #[test]
    fn test_os_directory_functions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("mode.lua"), "").unwrap();
        let mock = MockHost::new();
        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        lua.globals()
            .set("root", dir.path().to_string_lossy().into_owned())
            .unwrap();
        let ok: bool = lua
            .load(
                r#"
                local created = os.createDirectory(root .. "/modes/race")
                local again = os.createDirectory(root .. "/modes/race")
                local entries = os.listDirectory(root)
                return created and not again and #entries == 2
                    and entries[1].name == "mode.lua" and entries[1].stem == "mode"
                    and entries[1].extension == ".lua" and entries[2].isDirectory
                    and os.realClock() > 0
                "#,
            )
            .eval()
            .unwrap();
        assert!(ok);
    }

    #[test]
    fn test_unresolved_event_function_raises() {
        let mock = MockHost::new();
        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        let err = lua.load("events.createExplosion(Vector())").exec().unwrap_err();
        assert!(err.to_string().contains("unavailable"));
    }
}
