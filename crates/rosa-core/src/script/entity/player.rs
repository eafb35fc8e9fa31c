use mlua::{UserData, UserDataFields, UserDataMethods, UserDataRef, Value};

use super::{Member, Proxy, add_data, add_identity, add_identity_methods, member_index};
use crate::error::Error;
use crate::game::{Account, Action, Connection, Human, MenuButton, Player};
use crate::memory::layout::{message, player};
use crate::script::{LuaVector, c_text, entity_value, runtime};

impl UserData for Proxy<Player> {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        add_identity(fields);
        add_data(fields);
        flag_fields!(fields {
            "isActive" => active,
            "isAdmin" => is_admin,
            "isReady" => is_ready,
            "isBot" => is_bot,
        });
        scalar_fields!(fields {
            "subRosaID" => sub_rosa_id: i32,
            "phoneNumber" => phone_number: i32,
            "money" => money: i32,
            "corporateRating" => corporate_rating: i32,
            "criminalRating" => criminal_rating: i32,
            "team" => team: i32,
            "teamSwitchTimer" => team_switch_timer: i32,
            "stocks" => stocks: i32,
            "spawnTimer" => spawn_timer: i32,
            "menuTab" => menu_tab: i32,
            "numActions" => num_actions: i32,
            "lastNumActions" => last_num_actions: i32,
            "numMenuButtons" => num_menu_buttons: i32,
            "gender" => gender: i32,
            "skinColor" => skin_color: i32,
            "hairColor" => hair_color: i32,
            "hair" => hair: i32,
            "eyeColor" => eye_color: i32,
            "model" => model: i32,
            "suitColor" => suit_color: i32,
            "tieColor" => tie_color: i32,
            "head" => head: i32,
            "necklace" => necklace: i32,
        });
        text_fields!(fields { "name" => name });
        reference_fields!(fields { "human" => human_id: Human });

        fields.add_field_method_get("connection", |lua, this| {
            let rt = runtime(lua)?;
            let connections = rt.world().arena::<Connection>()?;
            let id = this.id();
            match connections.iter().find(|c| c.read(|c| c.player_id) == id) {
                Some(connection) => entity_value::<Connection>(&rt, lua, connection.index() as i32),
                None => Ok(Value::Nil),
            }
        });

        reference_getters!(fields { "account" => account_id: Account });
        fields.add_field_method_set("account", |_, this, account: Option<UserDataRef<Proxy<Account>>>| {
            let account = account.ok_or_else(|| {
                Error::InvalidArgument("Cannot set account to nil value".to_string())
            })?;
            let id = account.id();
            this.write(|p| p.account_id = id);
            Ok(())
        });

        fields.add_field_method_get("botDestination", |_, this| {
            if !this.read(|p| p.bot_has_destination != 0) {
                return Ok(None);
            }
            let ptr = this.as_ptr();
            // SAFETY: the field lies inside a host record that is never freed.
            Ok(unsafe { LuaVector::host(&raw mut (*ptr).bot_destination) })
        });
        fields.add_field_method_set("botDestination", |_, this, destination: Option<UserDataRef<LuaVector>>| {
            let destination = destination.map(|d| d.get());
            this.write(|p| match destination {
                Some(destination) => {
                    p.bot_has_destination = 1;
                    p.bot_destination = destination;
                }
                None => p.bot_has_destination = 0,
            });
            Ok(())
        });
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_identity_methods(methods);

        methods.add_method("update", |lua, this, ()| {
            // SAFETY: the id names a slot of the host's player array.
            Ok(unsafe { runtime(lua)?.host().event_update_player(this.id()) }?)
        });
        methods.add_method("updateFinance", |lua, this, ()| {
            // SAFETY: as above.
            Ok(unsafe { runtime(lua)?.host().event_update_player_finance(this.id()) }?)
        });
        methods.add_method("remove", |lua, this, ()| {
            let rt = runtime(lua)?;
            // SAFETY: as above.
            unsafe { rt.host().delete_player(this.id()) }?;
            rt.clear_data::<Player>(this.index());
            Ok(())
        });
        methods.add_method("sendMessage", |lua, this, text: String| {
            let text = c_text(text)?;
            // SAFETY: the host reads the NUL-terminated text during the call only.
            Ok(unsafe {
                runtime(lua)?.host().event_message(
                    message::PRIVATE,
                    text.as_ptr().cast_mut(),
                    this.id(),
                    0,
                )
            }?)
        });
        methods.add_method("getAction", |_, this, index: i64| {
            let index = member_index("Action", index, player::ACTIONS)?;
            let ptr = this.as_ptr();
            // SAFETY: index is below the array's length.
            Ok(unsafe { Member::new(&raw mut (*ptr).actions[index], index) })
        });
        methods.add_method("getMenuButton", |_, this, index: i64| {
            let index = member_index("MenuButton", index, player::MENU_BUTTONS)?;
            let ptr = this.as_ptr();
            // SAFETY: index is below the array's length.
            Ok(unsafe { Member::new(&raw mut (*ptr).menu_buttons[index], index) })
        });
    }
}

impl UserData for Member<Action> {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("index", |_, this| Ok(this.index()));
        scalar_fields!(fields {
            "type" => kind: i32,
            "a" => a: i32,
            "b" => b: i32,
            "c" => c: i32,
            "d" => d: i32,
        });
    }
}

impl UserData for Member<MenuButton> {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("index", |_, this| Ok(this.index()));
        scalar_fields!(fields { "id" => id: i32 });
        text_fields!(fields { "text" => text });
    }
}

#[cfg(test)]
mod tests {
    use crate::host::HostFunction;
    use crate::host::mock::{self, MockHost};

    #[test]
    fn test_player_fields_and_references() {
        let mock = MockHost::new();
        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        let ok: bool = lua
            .load(
                r#"
                local ply = players.createBot()
                ply.money = 500
                ply.name = "Gordon"
                local man = humans.create(Vector(1, 2, 3), RotMatrix(), ply)
                return ply.isBot and ply.team == 6 and ply.money == 500
                    and ply.name == "Gordon" and ply.human == man
                    and man.player == ply and tostring(ply) == "Player(0)"
                "#,
            )
            .eval()
            .unwrap();
        assert!(ok);
    }

    #[test]
    fn test_account_cannot_be_cleared() {
        let mock = MockHost::new();
        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        let err = lua
            .load("players.getByIndex(0).account = nil")
            .exec()
            .unwrap_err();
        assert!(err.to_string().contains("Cannot set account to nil value"));
    }

    #[test]
    fn test_bot_destination() {
        let mock = MockHost::new();
        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        let ok: bool = lua
            .load(
                r#"
                local ply = players.getByIndex(3)
                local before = ply.botDestination
                ply.botDestination = Vector(5, 0, 5)
                local set = ply.botDestination.x == 5
                ply.botDestination = nil
                return before == nil and set and ply.botDestination == nil
                "#,
            )
            .eval()
            .unwrap();
        assert!(ok);
    }

    #[test]
    fn test_actions_and_menu_buttons() {
        let mock = MockHost::new();
        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        lua.load(
            r#"
            local ply = players.getByIndex(1)
            ply:getAction(63).type = 2
            ply:getMenuButton(0).text = "Buy"
            "#,
        )
        .exec()
        .unwrap();
        let player = mock.world().players.unwrap().get(1).unwrap();
        assert_eq!(player.read(|p| p.actions[63].kind), 2);
        assert!(lua.load("players.getByIndex(1):getAction(64)").exec().is_err());
        assert!(lua.load("players.getByIndex(1):getMenuButton(32)").exec().is_err());
    }

    #[test]
    fn test_send_message_bypasses_hook() {
        let mock = MockHost::new();
        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        lua.load(
            r#"
            hook.set("Message", function() hooked = true; return true end)
            hook.enable("Message")
            players.getByIndex(2):sendMessage("welcome")
            "#,
        )
        .exec()
        .unwrap();
        assert_eq!(mock::calls(HostFunction::EventMessage), 1);
        assert_eq!(mock::messages(), vec![(6, "welcome".to_string(), 2, 0)]);
        assert!(lua.load("hooked == nil").eval::<bool>().unwrap());
    }

    #[test]
    fn test_remove_clears_data() {
        let mock = MockHost::new();
        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        let ok: bool = lua
            .load(
                r#"
                local ply = players.createBot()
                ply.data.score = 10
                ply:remove()
                return not ply.isActive and ply.data.score == nil
                "#,
            )
            .eval()
            .unwrap();
        assert!(ok);
        assert_eq!(mock::calls(HostFunction::DeletePlayer), 1);
    }
}
