use mlua::{UserData, UserDataFields, UserDataMethods, UserDataRef};

use super::{Proxy, add_data, add_identity, add_identity_methods, member_index};
use crate::game::{Human, Item, ItemType, Player, RigidBody, read_fixed_str, write_fixed_str};
use crate::memory::layout::{NO_REFERENCE, item, message};
use crate::script::{c_text, runtime};

impl UserData for Proxy<Item> {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        add_identity(fields);
        add_data(fields);
        flag_fields!(fields {
            "isActive" => active,
            "hasPhysics" => has_physics,
            "physicsSettled" => physics_settled,
            "isStatic" => is_static,
        });
        scalar_fields!(fields {
            "despawnTime" => despawn_time: i32,
            "parentSlot" => parent_slot: i32,
            "bullets" => bullets: i32,
            "cooldown" => cooldown: i32,
            "cashSpread" => cash_spread: i32,
            "cashBillAmount" => cash_bill_amount: i32,
            "cashPureValue" => cash_pure_value: i32,
            "phoneNumber" => phone_number: i32,
            "displayPhoneNumber" => display_phone_number: i32,
            "enteredPhoneNumber" => entered_phone_number: i32,
            "computerCurrentLine" => computer_current_line: i32,
            "computerTopLine" => computer_top_line: i32,
            "computerCursor" => computer_cursor: i32,
        });
        vector_fields!(fields { "pos" => pos, "vel" => vel });
        rotation_fields!(fields { "rot" => rot });
        reference_fields!(fields {
            "type" => type_id: ItemType,
            "grenadePrimer" => grenade_primer_id: Player,
        });
        reference_getters!(fields {
            "parentHuman" => parent_human_id: Human,
            "parentItem" => parent_item_id: Item,
            "rigidBody" => body_id: RigidBody,
        });
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_identity_methods(methods);

        methods.add_method("remove", |lua, this, ()| {
            let rt = runtime(lua)?;
            // SAFETY: the id names a slot of the host's item array.
            unsafe { rt.host().delete_item(this.id()) }?;
            rt.clear_data::<Item>(this.index());
            Ok(())
        });

        methods.add_method("mountItem", |lua, this, (child, slot): (UserDataRef<Proxy<Item>>, i32)| {
            // SAFETY: ids name slots of the host's item array.
            let linked = unsafe {
                runtime(lua)?
                    .host()
                    .link_item(this.id(), child.id(), NO_REFERENCE, slot)
            }?;
            Ok(linked != 0)
        });

        methods.add_method("unmount", |lua, this, ()| {
            // SAFETY: as above.
            let unlinked = unsafe {
                runtime(lua)?
                    .host()
                    .link_item(this.id(), NO_REFERENCE, NO_REFERENCE, 0)
            }?;
            Ok(unlinked != 0)
        });

        methods.add_method("speak", |lua, this, (text, distance): (String, i32)| {
            let text = c_text(text)?;
            // SAFETY: the host reads the NUL-terminated text during the call only.
            Ok(unsafe {
                runtime(lua)?.host().event_message(
                    message::ITEM_SPEECH,
                    text.as_ptr().cast_mut(),
                    this.id(),
                    distance,
                )
            }?)
        });

        methods.add_method("explode", |lua, this, ()| {
            // SAFETY: the id names a slot of the host's item array.
            Ok(unsafe { runtime(lua)?.host().grenade_explosion(this.id()) }?)
        });

        methods.add_method("setMemo", |lua, this, memo: String| {
            let memo = c_text(memo)?;
            // SAFETY: the host copies the memo during the call.
            Ok(unsafe { runtime(lua)?.host().item_set_memo(this.id(), memo.as_ptr()) }?)
        });

        methods.add_method("computerTransmitLine", |lua, this, line: u32| {
            // SAFETY: the id names a slot of the host's item array.
            Ok(unsafe { runtime(lua)?.host().item_computer_transmit_line(this.id(), line) }?)
        });

        methods.add_method("computerIncrementLine", |lua, this, ()| {
            // SAFETY: as above.
            Ok(unsafe { runtime(lua)?.host().item_computer_increment_line(this.id()) }?)
        });

        methods.add_method("computerSetLine", |_, this, (line, text): (i64, String)| {
            let line = member_index("Computer line", line, item::COMPUTER_LINES)?;
            this.write(|i| write_fixed_str(&mut i.computer_lines[line], &text));
            Ok(())
        });

        methods.add_method("computerGetLine", |_, this, line: i64| {
            let line = member_index("Computer line", line, item::COMPUTER_LINES)?;
            Ok(this.read(|i| read_fixed_str(&i.computer_lines[line])))
        });

        methods.add_method("computerSetColor", |_, this, (line, column, color): (i64, i64, u8)| {
            let line = member_index("Computer line", line, item::COMPUTER_LINES)?;
            let column = member_index("Computer column", column, item::COMPUTER_LINE_LEN)?;
            this.write(|i| i.computer_line_colors[line][column] = color);
            Ok(())
        });
    }
}
