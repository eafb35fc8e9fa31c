use std::ptr;

use mlua::{UserData, UserDataFields, UserDataMethods, UserDataRef};

use super::{Proxy, add_active, add_data, add_identity, add_identity_methods};
use crate::game::{Bond, Bullet, Player, RigidBody, Vector, Vehicle};
use crate::script::{LuaVector, entity_value, runtime};

/// Copy of an optional vector argument, kept alive across a host call
fn vector_arg(value: Option<UserDataRef<LuaVector>>) -> Option<Vector> {
    value.map(|v| v.get())
}

fn as_mut_ptr(value: &mut Option<Vector>) -> *mut Vector {
    value.as_mut().map_or(ptr::null_mut(), |v| v as *mut Vector)
}

impl UserData for Proxy<Vehicle> {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        add_identity(fields);
        add_data(fields);
        flag_fields!(fields {
            "isActive" => active,
            "isLocked" => is_locked,
        });
        scalar_fields!(fields {
            "type" => type_id: i32,
            "controllableState" => controllable_state: i32,
            "health" => health: i32,
            "color" => color: i32,
            "gear" => gear: f32,
            "steerControl" => steer_control: f32,
            "gasControl" => gas_control: f32,
            "brakeControl" => brake_control: f32,
        });
        vector_fields!(fields { "pos" => pos, "vel" => vel });
        rotation_fields!(fields { "rot" => rot });
        reference_fields!(fields { "lastDriver" => last_driver_player_id: Player });
        reference_getters!(fields { "rigidBody" => body_id: RigidBody });
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_identity_methods(methods);

        methods.add_method("remove", |lua, this, ()| {
            let rt = runtime(lua)?;
            // SAFETY: the id names a slot of the host's vehicle array.
            unsafe { rt.host().delete_object(this.id()) }?;
            rt.clear_data::<Vehicle>(this.index());
            Ok(())
        });

        methods.add_method("updateType", |lua, this, ()| {
            // SAFETY: as above.
            Ok(unsafe { runtime(lua)?.host().event_create_object(this.id()) }?)
        });

        methods.add_method(
            "updateDestruction",
            |lua,
             this,
             (update_type, part, pos, normal): (
                i32,
                i32,
                Option<UserDataRef<LuaVector>>,
                Option<UserDataRef<LuaVector>>,
            )| {
                let (mut pos, mut normal) = (vector_arg(pos), vector_arg(normal));
                // SAFETY: both vectors outlive the call; absent ones are passed as null.
                Ok(unsafe {
                    runtime(lua)?.host().event_update_object(
                        this.id(),
                        update_type,
                        part,
                        as_mut_ptr(&mut pos),
                        as_mut_ptr(&mut normal),
                    )
                }?)
            },
        );
    }
}

impl UserData for Proxy<Bullet> {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        add_identity(fields);
        add_active(fields);
        scalar_fields!(fields {
            "type" => kind: i32,
            "time" => time: i32,
        });
        vector_fields!(fields {
            "pos" => pos,
            "vel" => vel,
            "lastPos" => last_pos,
        });
        reference_fields!(fields { "player" => player_id: Player });
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_identity_methods(methods);
    }
}

impl UserData for Proxy<RigidBody> {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        add_identity(fields);
        add_data(fields);
        flag_fields!(fields {
            "isActive" => active,
            "isSettled" => settled,
        });
        scalar_fields!(fields {
            "type" => kind: i32,
            "mass" => mass: f32,
        });
        vector_fields!(fields { "pos" => pos, "vel" => vel });
        rotation_fields!(fields { "rot" => rot, "rotVel" => rot_vel });
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_identity_methods(methods);

        methods.add_method(
            "bondTo",
            |lua,
             this,
             (other, local, other_local): (
                UserDataRef<Proxy<RigidBody>>,
                UserDataRef<LuaVector>,
                UserDataRef<LuaVector>,
            )| {
                let (mut local, mut other_local) = (local.get(), other_local.get());
                let rt = runtime(lua)?;
                // SAFETY: both vectors outlive the call.
                let bond = unsafe {
                    rt.host()
                        .bond_bodies(this.id(), other.id(), &mut local, &mut other_local)
                }?;
                entity_value::<Bond>(&rt, lua, bond)
            },
        );

        methods.add_method("bondRotTo", |lua, this, other: UserDataRef<Proxy<RigidBody>>| {
            let rt = runtime(lua)?;
            // SAFETY: plain integer arguments.
            let bond = unsafe { rt.host().bond_rotation(this.id(), other.id()) }?;
            entity_value::<Bond>(&rt, lua, bond)
        });

        methods.add_method(
            "bondToLevel",
            |lua, this, (local, global): (UserDataRef<LuaVector>, UserDataRef<LuaVector>)| {
                let (mut local, mut global) = (local.get(), global.get());
                let rt = runtime(lua)?;
                // SAFETY: both vectors outlive the call.
                let bond = unsafe { rt.host().bond_level(this.id(), &mut local, &mut global) }?;
                entity_value::<Bond>(&rt, lua, bond)
            },
        );

        methods.add_method(
            "collideLevel",
            |lua,
             this,
             (local, normal, a, b, c, d): (
                UserDataRef<LuaVector>,
                UserDataRef<LuaVector>,
                f32,
                f32,
                f32,
                f32,
            )| {
                let (mut local, mut normal) = (local.get(), normal.get());
                // SAFETY: both vectors outlive the call.
                Ok(unsafe {
                    runtime(lua)?
                        .host()
                        .collide_level(this.id(), &mut local, &mut normal, a, b, c, d)
                }?)
            },
        );
    }
}

impl UserData for Proxy<Bond> {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        add_identity(fields);
        flag_fields!(fields { "isActive" => active });
        scalar_fields!(fields {
            "type" => kind: i32,
            "despawnTime" => despawn_time: i32,
        });
        vector_fields!(fields {
            "globalPos" => global_pos,
            "localPos" => local_pos,
            "otherLocalPos" => other_local_pos,
        });
        reference_getters!(fields {
            "body" => body_id: RigidBody,
            "otherBody" => other_body_id: RigidBody,
        });
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_identity_methods(methods);
    }
}
