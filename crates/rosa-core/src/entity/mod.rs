//! Entity categories over the host's static arrays
//!
//! Binds each record type to its array in the [`World`] and describes how the
//! category marks live slots. Identity of an entity is its slot index, derived
//! from its address by [`EntityRef::index`](crate::memory::EntityRef::index).

mod world;

pub use world::World;

use crate::game::*;
use crate::memory::{Arena, Liveness, Record};

/// A record type with its own array in the world
pub trait Category: Record {
    /// Name of the script library table for this category
    const LIBRARY: &'static str;

    fn arena(world: &World) -> Option<Arena<Self>>;
}

macro_rules! category {
    ($ty:ty, $name:literal, $library:literal, $field:ident, $liveness:expr $(, |$r:ident| $active:expr)?) => {
        impl Record for $ty {
            const NAME: &'static str = $name;
            const LIVENESS: Liveness = $liveness;
            $(
                fn is_active(&self) -> bool {
                    let $r = self;
                    $active
                }
            )?
        }

        impl Category for $ty {
            const LIBRARY: &'static str = $library;

            fn arena(world: &World) -> Option<Arena<Self>> {
                world.$field
            }
        }
    };
}

category!(Connection, "Connection", "connections", connections, Liveness::Dense);
category!(Account, "Account", "accounts", accounts, Liveness::Prefix, |r| r.sub_rosa_id != 0);
category!(Player, "Player", "players", players, Liveness::Flag, |r| r.active != 0);
category!(Human, "Human", "humans", humans, Liveness::Flag, |r| r.active != 0);
category!(ItemType, "ItemType", "itemTypes", item_types, Liveness::Dense);
category!(Item, "Item", "items", items, Liveness::Flag, |r| r.active != 0);
category!(Vehicle, "Vehicle", "vehicles", vehicles, Liveness::Flag, |r| r.active != 0);
category!(Bullet, "Bullet", "bullets", bullets, Liveness::Dense);
category!(RigidBody, "RigidBody", "rigidBodies", bodies, Liveness::Flag, |r| r.active != 0);
category!(Bond, "Bond", "bonds", bonds, Liveness::Flag, |r| r.active != 0);
category!(Street, "Street", "streets", streets, Liveness::Dense);
category!(StreetIntersection, "StreetIntersection", "intersections", intersections, Liveness::Dense);
