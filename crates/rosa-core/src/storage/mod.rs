//! Script-attached data keyed by slot index

mod table;

pub use table::{SideTable, SideTables};

use crate::entity::Category;
use crate::game::{Human, Item, Player, RigidBody, Vehicle};

/// A category whose entities can carry script-attached data
pub trait Attached: Category {
    fn side_table<V>(tables: &mut SideTables<V>) -> &mut SideTable<V>;
}

macro_rules! attached {
    ($($ty:ty => $field:ident),* $(,)?) => {$(
        impl Attached for $ty {
            fn side_table<V>(tables: &mut SideTables<V>) -> &mut SideTable<V> {
                &mut tables.$field
            }
        }
    )*};
}

attached! {
    Player => players,
    Human => humans,
    Item => items,
    Vehicle => vehicles,
    RigidBody => bodies,
}
