use mlua::{UserData, UserDataFields, UserDataMethods, UserDataRef, Value};

use super::{Member, Proxy, add_data, add_identity, add_identity_methods, member_index};
use crate::game::{Account, Bone, Human, Item, Player, RigidBody, Vehicle};
use crate::memory::layout::{NO_REFERENCE, human, message};
use crate::runtime::Runtime;
use crate::script::{LuaVector, c_text, entity_value, runtime};

/// Apply `f` to the rigid body of every bone
fn for_each_body(rt: &Runtime, human: &Proxy<Human>, mut f: impl FnMut(&mut RigidBody)) -> crate::error::Result<()> {
    let bodies = rt.world().arena::<RigidBody>()?;
    let ids = human.read(|h| h.bones.map(|bone| bone.body_id));
    for id in ids {
        if let Some(body) = bodies.reference(id)? {
            body.write(&mut f);
        }
    }
    Ok(())
}

/// A held item, or a grabbed human, exists only while its flag is set
fn held<T>(rt: &Runtime, lua: &mlua::Lua, flag: i32, raw: i32) -> mlua::Result<Value>
where
    T: crate::entity::Category,
    Proxy<T>: UserData,
{
    if flag == 0 {
        return Ok(Value::Nil);
    }
    entity_value::<T>(rt, lua, raw)
}

impl UserData for Proxy<Human> {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        add_identity(fields);
        add_data(fields);
        flag_fields!(fields {
            "isActive" => active,
            "isImmortal" => is_immortal,
            "isBleeding" => is_bleeding,
        });
        scalar_fields!(fields {
            "physicsSim" => physics_sim: i32,
            "stamina" => stamina: i32,
            "maxStamina" => max_stamina: i32,
            "vehicleSeat" => vehicle_seat: i32,
            "despawnTime" => despawn_time: i32,
            "oxygen" => oxygen: i32,
            "health" => health: i32,
            "bloodLevel" => blood_level: i32,
            "chestHP" => chest_hp: i32,
            "headHP" => head_hp: i32,
            "leftArmHP" => left_arm_hp: i32,
            "rightArmHP" => right_arm_hp: i32,
            "leftLegHP" => left_leg_hp: i32,
            "rightLegHP" => right_leg_hp: i32,
            "viewYaw" => view_yaw: f32,
            "viewPitch" => view_pitch: f32,
            "gender" => gender: i32,
            "model" => model: i32,
            "inputFlags" => input_flags: u32,
            "lastInputFlags" => last_input_flags: u32,
            "walkInput" => walk_input: f32,
            "strafeInput" => strafe_input: f32,
        });
        vector_fields!(fields { "pos" => pos });
        reference_fields!(fields {
            "player" => player_id: Player,
            "account" => account_id: Account,
            "vehicle" => vehicle_id: Vehicle,
        });

        fields.add_field_method_get("rightHandItem", |lua, this| {
            let (flag, id) = this.read(|h| (h.right_hand_occupied, h.right_hand_item_id));
            held::<Item>(&*runtime(lua)?, lua, flag, id)
        });
        fields.add_field_method_get("leftHandItem", |lua, this| {
            let (flag, id) = this.read(|h| (h.left_hand_occupied, h.left_hand_item_id));
            held::<Item>(&*runtime(lua)?, lua, flag, id)
        });
        fields.add_field_method_get("rightHandGrab", |lua, this| {
            let (flag, id) = this.read(|h| (h.is_grabbing_right, h.grabbing_right_human_id));
            held::<Human>(&*runtime(lua)?, lua, flag, id)
        });
        fields.add_field_method_get("leftHandGrab", |lua, this| {
            let (flag, id) = this.read(|h| (h.is_grabbing_left, h.grabbing_left_human_id));
            held::<Human>(&*runtime(lua)?, lua, flag, id)
        });
        fields.add_field_method_set("rightHandGrab", |_, this, other: Option<UserDataRef<Proxy<Human>>>| {
            let other = other.map(|o| o.id());
            this.write(|h| match other {
                Some(id) => {
                    h.is_grabbing_right = 1;
                    h.grabbing_right_human_id = id;
                    h.grabbing_right_bone = 0;
                }
                None => h.is_grabbing_right = 0,
            });
            Ok(())
        });
        fields.add_field_method_set("leftHandGrab", |_, this, other: Option<UserDataRef<Proxy<Human>>>| {
            let other = other.map(|o| o.id());
            this.write(|h| match other {
                Some(id) => {
                    h.is_grabbing_left = 1;
                    h.grabbing_left_human_id = id;
                    h.grabbing_left_bone = 0;
                }
                None => h.is_grabbing_left = 0,
            });
            Ok(())
        });
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_identity_methods(methods);

        methods.add_method("remove", |lua, this, ()| {
            let rt = runtime(lua)?;
            // SAFETY: the id names a slot of the host's human array.
            unsafe { rt.host().delete_human(this.id()) }?;
            rt.clear_data::<Human>(this.index());
            Ok(())
        });

        methods.add_method("teleport", |lua, this, target: UserDataRef<LuaVector>| {
            let offset = target.get() - this.read(|h| h.pos);
            let rt = runtime(lua)?;
            this.write(|h| {
                h.pos = h.pos + offset;
                for bone in &mut h.bones {
                    bone.pos = bone.pos + offset;
                    bone.pos2 = bone.pos2 + offset;
                }
            });
            for_each_body(&rt, this, |body| body.pos = body.pos + offset)?;
            Ok(())
        });

        methods.add_method("speak", |lua, this, (text, distance): (String, i32)| {
            let text = c_text(text)?;
            // SAFETY: the host reads the NUL-terminated text during the call only.
            Ok(unsafe {
                runtime(lua)?.host().event_message(
                    message::HUMAN_SPEECH,
                    text.as_ptr().cast_mut(),
                    this.id(),
                    distance,
                )
            }?)
        });

        methods.add_method("arm", |lua, this, (weapon, magazines): (i32, i32)| {
            // SAFETY: plain integer arguments.
            Ok(unsafe { runtime(lua)?.host().arm_human(this.id(), weapon, magazines) }?)
        });

        methods.add_method("getBone", |_, this, index: i64| {
            let index = member_index("Bone", index, human::BONES)?;
            let ptr = this.as_ptr();
            // SAFETY: index is below the array's length.
            Ok(unsafe { Member::new(&raw mut (*ptr).bones[index], index) })
        });

        methods.add_method("getRigidBody", |lua, this, index: i64| {
            let index = member_index("Bone", index, human::BONES)?;
            let body = this.read(|h| h.bones[index].body_id);
            entity_value::<RigidBody>(&*runtime(lua)?, lua, body)
        });

        methods.add_method("setVelocity", |lua, this, velocity: UserDataRef<LuaVector>| {
            let velocity = velocity.get();
            for_each_body(&*runtime(lua)?, this, |body| body.vel = velocity)?;
            Ok(())
        });

        methods.add_method("addVelocity", |lua, this, velocity: UserDataRef<LuaVector>| {
            let velocity = velocity.get();
            for_each_body(&*runtime(lua)?, this, |body| body.vel = body.vel + velocity)?;
            Ok(())
        });

        methods.add_method("mountItem", |lua, this, (item, slot): (UserDataRef<Proxy<Item>>, i32)| {
            // SAFETY: ids name slots of the host's arrays.
            let linked = unsafe {
                runtime(lua)?
                    .host()
                    .link_item(item.id(), NO_REFERENCE, this.id(), slot)
            }?;
            Ok(linked != 0)
        });

        methods.add_method("applyDamage", |lua, this, (bone, damage): (i32, i32)| {
            // SAFETY: plain integer arguments.
            Ok(unsafe { runtime(lua)?.host().human_apply_damage(this.id(), bone, 0, damage) }?)
        });
    }
}

impl UserData for Member<Bone> {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("index", |_, this| Ok(this.index()));
        vector_fields!(fields { "pos" => pos, "pos2" => pos2 });
    }
}

#[cfg(test)]
mod tests {
    use crate::game::Vector;
    use crate::host::HostFunction;
    use crate::host::mock::{self, MockHost};

    #[test]
    fn test_teleport_moves_bones_and_bodies() {
        let mock = MockHost::new();
        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        lua.load(
            r#"
            local ply = players.createBot()
            man = humans.create(Vector(0, 10, 0), RotMatrix(), ply)
            man:teleport(Vector(100, 10, 0))
            "#,
        )
        .exec()
        .unwrap();

        let human = mock.world().humans.unwrap().get(0).unwrap();
        assert_eq!(human.read(|h| h.pos), Vector::new(100.0, 10.0, 0.0));
        assert_eq!(human.read(|h| h.bones[7].pos), Vector::new(100.0, 10.0, 0.0));
        let body = mock.world().bodies.unwrap().get(7).unwrap();
        assert_eq!(body.read(|b| b.pos), Vector::new(100.0, 0.0, 0.0));
    }

    #[test]
    fn test_velocity_applies_to_every_bone_body() {
        let mock = MockHost::new();
        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        lua.load(
            r#"
            local man = humans.create(Vector(), RotMatrix(), players.createBot())
            man:setVelocity(Vector(1, 0, 0))
            man:addVelocity(Vector(0, 2, 0))
            "#,
        )
        .exec()
        .unwrap();
        let bodies = mock.world().bodies.unwrap();
        for i in 0..16 {
            assert_eq!(bodies.get(i).unwrap().read(|b| b.vel), Vector::new(1.0, 2.0, 0.0));
        }
    }

    #[test]
    fn test_grab_and_vehicle_references() {
        let mock = MockHost::new();
        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        let ok: bool = lua
            .load(
                r#"
                local a = humans.getByIndex(0)
                local b = humans.getByIndex(1)
                a.rightHandGrab = b
                local grabbed = a.rightHandGrab == b
                a.rightHandGrab = nil
                a.vehicle = vehicles.getByIndex(4)
                local inside = a.vehicle.index == 4
                a.vehicle = nil
                return grabbed and a.rightHandGrab == nil and inside and a.vehicle == nil
                "#,
            )
            .eval()
            .unwrap();
        assert!(ok);
    }

    #[test]
    fn test_mount_item_calls_link() {
        let mock = MockHost::new();
        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        let mounted: bool = lua
            .load(
                r#"
                local man = humans.create(Vector(), RotMatrix(), players.createBot())
                local gun = items.create(1, Vector())
                return man:mountItem(gun, 0) and gun.parentHuman == man
                "#,
            )
            .eval()
            .unwrap();
        assert!(mounted);
        assert_eq!(mock::calls(HostFunction::LinkItem), 1);
    }

    #[test]
    fn test_bone_index_bound() {
        let mock = MockHost::new();
        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        assert!(lua.load("humans.getByIndex(0):getBone(15)").exec().is_ok());
        assert!(lua.load("humans.getByIndex(0):getBone(16)").exec().is_err());
    }
}
