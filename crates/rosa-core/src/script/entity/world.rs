use std::net::Ipv4Addr;

use mlua::{UserData, UserDataFields, UserDataMethods};

use super::{Member, Proxy, add_active, add_identity, add_identity_methods, member_index};
use crate::game::{
    Account, Connection, Human, ItemType, Player, Street, StreetIntersection, StreetLane,
};
use crate::memory::layout::street;

impl UserData for Proxy<Connection> {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        add_identity(fields);
        scalar_fields!(fields {
            "port" => port: u32,
            "timeoutTime" => timeout_time: i32,
        });
        flag_fields!(fields { "adminVisible" => admin_visible });
        fields.add_field_method_get("address", |_, this| {
            Ok(Ipv4Addr::from(this.read(|c| c.address)).to_string())
        });
        reference_getters!(fields { "player" => player_id: Player });
        reference_fields!(fields { "spectatingHuman" => spectating_human_id: Human });
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_identity_methods(methods);
    }
}

impl UserData for Proxy<Account> {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        add_identity(fields);
        add_active(fields);
        scalar_fields!(fields {
            "subRosaID" => sub_rosa_id: i32,
            "phoneNumber" => phone_number: i32,
            "money" => money: i32,
            "corporateRating" => corporate_rating: i32,
            "criminalRating" => criminal_rating: i32,
            "spawnTimer" => spawn_timer: i32,
            "playTime" => play_time: i32,
            "banTime" => ban_time: i32,
        });
        text_fields!(fields { "name" => name });
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_identity_methods(methods);
    }
}

impl UserData for Proxy<ItemType> {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        add_identity(fields);
        scalar_fields!(fields {
            "price" => price: i32,
            "mass" => mass: f32,
            "fireRate" => fire_rate: i32,
            "bulletType" => bullet_type: i32,
            "magazineAmmo" => magazine_ammo: i32,
            "bulletVelocity" => bullet_velocity: f32,
            "bulletSpread" => bullet_spread: f32,
            "numHands" => num_hands: i32,
        });
        flag_fields!(fields { "isGun" => is_gun });
        vector_fields!(fields {
            "rightHandPos" => right_hand_pos,
            "leftHandPos" => left_hand_pos,
            "boundsCenter" => bounding_box,
        });
        text_fields!(fields { "name" => name });
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_identity_methods(methods);
    }
}

impl UserData for Proxy<Street> {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        add_identity(fields);
        text_fields!(fields { "name" => name });
        scalar_fields!(fields { "numTrafficCars" => num_traffic_cars: i32 });
        fields.add_field_method_get("numLanes", |_, this| Ok(this.read(|s| s.num_lanes)));
        vector_fields!(fields {
            "trafficCuboidA" => traffic_cuboid_a,
            "trafficCuboidB" => traffic_cuboid_b,
        });
        reference_getters!(fields {
            "intersectionA" => intersection_a: StreetIntersection,
            "intersectionB" => intersection_b: StreetIntersection,
        });
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_identity_methods(methods);

        // Lanes past `numLanes` hold stale data, so the live count bounds the index.
        methods.add_method("getLane", |_, this, index: i64| {
            let lanes = this.read(|s| s.num_lanes).clamp(0, street::LANES as i32) as usize;
            let index = member_index("Lane", index, lanes)?;
            let ptr = this.as_ptr();
            // SAFETY: index is below the array's length.
            Ok(unsafe { Member::new(&raw mut (*ptr).lanes[index], index) })
        });
    }
}

impl UserData for Member<StreetLane> {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("index", |_, this| Ok(this.index()));
        scalar_fields!(fields { "direction" => direction: i32 });
        vector_fields!(fields { "posA" => pos_a, "posB" => pos_b });
    }
}

impl UserData for Proxy<StreetIntersection> {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        add_identity(fields);
        vector_fields!(fields { "pos" => pos });
        scalar_fields!(fields {
            "lightEast" => light_east: i32,
            "lightSouth" => light_south: i32,
            "lightWest" => light_west: i32,
            "lightNorth" => light_north: i32,
            "lightsTimer" => lights_timer: i32,
            "lightsState" => lights_state: i32,
        });
        reference_getters!(fields {
            "streetEast" => street_east: Street,
            "streetSouth" => street_south: Street,
            "streetWest" => street_west: Street,
            "streetNorth" => street_north: Street,
        });
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        add_identity_methods(methods);
    }
}

#[cfg(test)]
mod tests {
    use crate::game::write_fixed_str;
    use crate::host::mock::MockHost;

    #[test]
    fn test_connection_fields() {
        let mut mock = MockHost::new();
        let connections = mock.world().connections.unwrap();
        mock.set_count("connections", 1);
        connections.get(0).unwrap().write(|c| {
            c.address = 0x7F00_0001;
            c.port = 27015;
            c.player_id = 0;
            c.spectating_human_id = -1;
        });

        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        let ok: bool = lua
            .load(
                r#"
                local ply = players.createBot()
                local con = connections.getByIndex(0)
                return connections.getCount() == 1 and con.address == "127.0.0.1"
                    and con.port == 27015 and con.player == ply and ply.connection == con
                    and con.spectatingHuman == nil
                "#,
            )
            .eval()
            .unwrap();
        assert!(ok);
        assert!(lua.load("connections.getByIndex(1)").exec().is_err());
    }

    #[test]
    fn test_street_lanes_bounded_by_lane_count() {
        let mut mock = MockHost::new();
        mock.set_count("streets", 1);
        mock.world().streets.unwrap().get(0).unwrap().write(|s| {
            write_fixed_str(&mut s.name, "First Street");
            s.num_lanes = 2;
            s.intersection_a = -1;
            s.intersection_b = -1;
            s.lanes[1].direction = 1;
        });

        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        let ok: bool = lua
            .load(
                r#"
                local street = streets.getByIndex(0)
                return street.name == "First Street" and street.numLanes == 2
                    and street:getLane(1).direction == 1 and street.intersectionA == nil
                "#,
            )
            .eval()
            .unwrap();
        assert!(ok);
        assert!(lua.load("streets.getByIndex(0):getLane(2)").exec().is_err());
    }

    #[test]
    fn test_account_and_item_type_fields() {
        let mock = MockHost::new();
        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        let ok: bool = lua
            .load(
                r#"
                local acc = accounts.getByIndex(10)
                local inactive = not acc.isActive
                acc.subRosaID = 77
                acc.name = "Jane"
                local kind = itemTypes.getByIndex(1)
                kind.name = "AK-47"
                kind.isGun = true
                return inactive and acc.isActive and acc.name == "Jane"
                    and kind.isGun and tostring(kind) == "ItemType(1)"
                "#,
            )
            .eval()
            .unwrap();
        assert!(ok);
    }
}
