//! The host functions this crate calls or intercepts

use std::ffi::c_char;

use strum::{EnumCount, EnumIter};

use crate::game::{RotMatrix, Vector};
use crate::hook::HookId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, EnumCount)]
pub enum HostFunction {
    ResetGame,
    Logic,
    CreatePlayer,
    DeletePlayer,
    CreateHuman,
    DeleteHuman,
    CreateItem,
    DeleteItem,
    CreateRope,
    CreateObject,
    DeleteObject,
    LinkItem,
    GrenadeExplosion,
    HumanApplyDamage,
    EventMessage,
    EventUpdatePlayer,
    EventUpdatePlayerFinance,
    EventCreateObject,
    EventUpdateObject,
    EventSound,
    EventExplosion,
    EventBulletHit,
    SaveAccountsServer,
    LineIntersectLevel,
    LineIntersectHuman,
    LineIntersectObject,
    LineIntersectTriangle,
    BulletTimeToLive,
    ScenarioArmHuman,
    BondRigidBodyRigidBody,
    BondRigidBodyRotRigidBody,
    BondRigidBodyLevel,
    CollisionRigidBodyLevel,
    ItemSetMemo,
    ItemComputerTransmitLine,
    ItemComputerIncrementLine,
}

impl HostFunction {
    /// Symbol name used as the key in the host layout file
    pub const fn symbol(self) -> &'static str {
        match self {
            HostFunction::ResetGame => "resetgame",
            HostFunction::Logic => "logic",
            HostFunction::CreatePlayer => "createplayer",
            HostFunction::DeletePlayer => "deleteplayer",
            HostFunction::CreateHuman => "createhuman",
            HostFunction::DeleteHuman => "deletehuman",
            HostFunction::CreateItem => "createitem",
            HostFunction::DeleteItem => "deleteitem",
            HostFunction::CreateRope => "createrope",
            HostFunction::CreateObject => "createobject",
            HostFunction::DeleteObject => "deleteobject",
            HostFunction::LinkItem => "linkitem",
            HostFunction::GrenadeExplosion => "grenadeexplosion",
            HostFunction::HumanApplyDamage => "human_applydamage",
            HostFunction::EventMessage => "createevent_message",
            HostFunction::EventUpdatePlayer => "createevent_updateplayer",
            HostFunction::EventUpdatePlayerFinance => "createevent_updateplayer_finance",
            HostFunction::EventCreateObject => "createevent_createobject",
            HostFunction::EventUpdateObject => "createevent_updateobject",
            HostFunction::EventSound => "createevent_sound",
            HostFunction::EventExplosion => "createevent_explosion",
            HostFunction::EventBulletHit => "createevent_bullethit",
            HostFunction::SaveAccountsServer => "saveaccountsserver",
            HostFunction::LineIntersectLevel => "lineintersectlevel",
            HostFunction::LineIntersectHuman => "lineintersecthuman",
            HostFunction::LineIntersectObject => "lineintersectobject",
            HostFunction::LineIntersectTriangle => "lineintersecttriangle",
            HostFunction::BulletTimeToLive => "bullettimetolive",
            HostFunction::ScenarioArmHuman => "scenario_armhuman",
            HostFunction::BondRigidBodyRigidBody => "createbond_rigidbody_rigidbody",
            HostFunction::BondRigidBodyRotRigidBody => "createbond_rigidbody_rot_rigidbody",
            HostFunction::BondRigidBodyLevel => "createbond_rigidbody_level",
            HostFunction::CollisionRigidBodyLevel => "addcollision_rigidbody_level",
            HostFunction::ItemSetMemo => "item_setmemo",
            HostFunction::ItemComputerTransmitLine => "item_computertransmitline",
            HostFunction::ItemComputerIncrementLine => "item_computerincrementline",
        }
    }

    /// The event that intercepts this function, if any
    pub fn hook(self) -> Option<HookId> {
        use strum::IntoEnumIterator;
        HookId::iter().find(|id| id.function() == self)
    }
}

pub type VoidFn = unsafe extern "C" fn();
pub type CreatePlayerFn = unsafe extern "C" fn() -> i32;
pub type IdFn = unsafe extern "C" fn(i32);
pub type CreateHumanFn = unsafe extern "C" fn(*mut Vector, *mut RotMatrix, i32) -> i32;
pub type CreateItemFn = unsafe extern "C" fn(i32, *mut Vector, *mut Vector, *mut RotMatrix) -> i32;
pub type CreateRopeFn = unsafe extern "C" fn(*mut Vector, *mut RotMatrix) -> i32;
pub type CreateObjectFn =
    unsafe extern "C" fn(i32, *mut Vector, *mut Vector, *mut RotMatrix, i32) -> i32;
pub type LinkItemFn = unsafe extern "C" fn(i32, i32, i32, i32) -> i32;
pub type ApplyDamageFn = unsafe extern "C" fn(i32, i32, i32, i32);
pub type MessageFn = unsafe extern "C" fn(i32, *mut c_char, i32, i32);
pub type UpdateObjectFn = unsafe extern "C" fn(i32, i32, i32, *mut Vector, *mut Vector);
pub type SoundFn = unsafe extern "C" fn(i32, *mut Vector, f32, f32);
pub type ExplosionFn = unsafe extern "C" fn(i32, *mut Vector);
pub type BulletHitFn = unsafe extern "C" fn(i32, i32, *mut Vector, *mut Vector);
pub type LineIntersectLevelFn = unsafe extern "C" fn(*mut Vector, *mut Vector) -> i32;
pub type LineIntersectEntityFn = unsafe extern "C" fn(i32, *mut Vector, *mut Vector) -> i32;
pub type LineIntersectTriangleFn = unsafe extern "C" fn(
    *mut Vector,
    *mut Vector,
    *mut f32,
    *mut Vector,
    *mut Vector,
    *mut Vector,
    *mut Vector,
    *mut Vector,
) -> i32;
pub type ArmHumanFn = unsafe extern "C" fn(i32, i32, i32);
pub type BondBodiesFn = unsafe extern "C" fn(i32, i32, *mut Vector, *mut Vector) -> i32;
pub type BondRotFn = unsafe extern "C" fn(i32, i32) -> i32;
pub type BondLevelFn = unsafe extern "C" fn(i32, *mut Vector, *mut Vector) -> i32;
pub type CollideLevelFn = unsafe extern "C" fn(i32, *mut Vector, *mut Vector, f32, f32, f32, f32);
pub type SetMemoFn = unsafe extern "C" fn(i32, *const c_char);
pub type TransmitLineFn = unsafe extern "C" fn(i32, u32);

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_symbols_unique() {
        let mut symbols: Vec<_> = HostFunction::iter().map(HostFunction::symbol).collect();
        symbols.sort_unstable();
        symbols.dedup();
        assert_eq!(symbols.len(), HostFunction::COUNT);
    }

    #[test]
    fn test_hook_mapping() {
        assert_eq!(HostFunction::CreateObject.hook(), Some(HookId::CreateVehicle));
        assert_eq!(HostFunction::CreateRope.hook(), None);
        for id in HookId::iter() {
            assert_eq!(id.function().hook(), Some(id));
        }
    }
}
