//! Typed calls into the original host functions.
//!
//! # Safety
//!
//! Every pointer argument must be null where the host accepts null, or point
//! to a live value of the pointee type for the duration of the call. Ids are
//! passed through unchecked; the host validates them itself.

use std::ffi::c_char;
use std::mem;

use super::function::*;
use super::Host;
use crate::error::Result;
use crate::game::{RotMatrix, Vector};

/// Reinterpret a code address as a function pointer of type `F`
unsafe fn cast<F: Copy>(address: usize) -> F {
    debug_assert_eq!(mem::size_of::<F>(), mem::size_of::<usize>());
    unsafe { mem::transmute_copy(&address) }
}

impl Host {
    pub unsafe fn reset_game(&self) -> Result<()> {
        self.with_original(HostFunction::ResetGame, |a| unsafe { cast::<VoidFn>(a)() })
    }

    pub unsafe fn logic(&self) -> Result<()> {
        self.with_original(HostFunction::Logic, |a| unsafe { cast::<VoidFn>(a)() })
    }

    pub unsafe fn create_player(&self) -> Result<i32> {
        self.with_original(HostFunction::CreatePlayer, |a| unsafe {
            cast::<CreatePlayerFn>(a)()
        })
    }

    pub unsafe fn delete_player(&self, player: i32) -> Result<()> {
        self.with_original(HostFunction::DeletePlayer, |a| unsafe { cast::<IdFn>(a)(player) })
    }

    pub unsafe fn create_human(
        &self,
        pos: *mut Vector,
        rot: *mut RotMatrix,
        player: i32,
    ) -> Result<i32> {
        self.with_original(HostFunction::CreateHuman, |a| unsafe {
            cast::<CreateHumanFn>(a)(pos, rot, player)
        })
    }

    pub unsafe fn delete_human(&self, human: i32) -> Result<()> {
        self.with_original(HostFunction::DeleteHuman, |a| unsafe { cast::<IdFn>(a)(human) })
    }

    pub unsafe fn create_item(
        &self,
        item_type: i32,
        pos: *mut Vector,
        vel: *mut Vector,
        rot: *mut RotMatrix,
    ) -> Result<i32> {
        self.with_original(HostFunction::CreateItem, |a| unsafe {
            cast::<CreateItemFn>(a)(item_type, pos, vel, rot)
        })
    }

    pub unsafe fn delete_item(&self, item: i32) -> Result<()> {
        self.with_original(HostFunction::DeleteItem, |a| unsafe { cast::<IdFn>(a)(item) })
    }

    pub unsafe fn create_rope(&self, pos: *mut Vector, rot: *mut RotMatrix) -> Result<i32> {
        self.with_original(HostFunction::CreateRope, |a| unsafe {
            cast::<CreateRopeFn>(a)(pos, rot)
        })
    }

    pub unsafe fn create_object(
        &self,
        vehicle_type: i32,
        pos: *mut Vector,
        vel: *mut Vector,
        rot: *mut RotMatrix,
        color: i32,
    ) -> Result<i32> {
        self.with_original(HostFunction::CreateObject, |a| unsafe {
            cast::<CreateObjectFn>(a)(vehicle_type, pos, vel, rot, color)
        })
    }

    pub unsafe fn delete_object(&self, vehicle: i32) -> Result<()> {
        self.with_original(HostFunction::DeleteObject, |a| unsafe { cast::<IdFn>(a)(vehicle) })
    }

    pub unsafe fn link_item(
        &self,
        item: i32,
        child_item: i32,
        parent_human: i32,
        slot: i32,
    ) -> Result<i32> {
        self.with_original(HostFunction::LinkItem, |a| unsafe {
            cast::<LinkItemFn>(a)(item, child_item, parent_human, slot)
        })
    }

    pub unsafe fn grenade_explosion(&self, item: i32) -> Result<()> {
        self.with_original(HostFunction::GrenadeExplosion, |a| unsafe {
            cast::<IdFn>(a)(item)
        })
    }

    pub unsafe fn human_apply_damage(
        &self,
        human: i32,
        bone: i32,
        unknown: i32,
        damage: i32,
    ) -> Result<()> {
        self.with_original(HostFunction::HumanApplyDamage, |a| unsafe {
            cast::<ApplyDamageFn>(a)(human, bone, unknown, damage)
        })
    }

    pub unsafe fn event_message(
        &self,
        kind: i32,
        message: *mut c_char,
        speaker: i32,
        distance: i32,
    ) -> Result<()> {
        self.with_original(HostFunction::EventMessage, |a| unsafe {
            cast::<MessageFn>(a)(kind, message, speaker, distance)
        })
    }

    pub unsafe fn event_update_player(&self, player: i32) -> Result<()> {
        self.with_original(HostFunction::EventUpdatePlayer, |a| unsafe {
            cast::<IdFn>(a)(player)
        })
    }

    pub unsafe fn event_update_player_finance(&self, player: i32) -> Result<()> {
        self.with_original(HostFunction::EventUpdatePlayerFinance, |a| unsafe {
            cast::<IdFn>(a)(player)
        })
    }

    pub unsafe fn event_create_object(&self, vehicle: i32) -> Result<()> {
        self.with_original(HostFunction::EventCreateObject, |a| unsafe {
            cast::<IdFn>(a)(vehicle)
        })
    }

    pub unsafe fn event_update_object(
        &self,
        vehicle: i32,
        update_type: i32,
        part: i32,
        pos: *mut Vector,
        normal: *mut Vector,
    ) -> Result<()> {
        self.with_original(HostFunction::EventUpdateObject, |a| unsafe {
            cast::<UpdateObjectFn>(a)(vehicle, update_type, part, pos, normal)
        })
    }

    pub unsafe fn event_sound(
        &self,
        sound: i32,
        pos: *mut Vector,
        volume: f32,
        pitch: f32,
    ) -> Result<()> {
        self.with_original(HostFunction::EventSound, |a| unsafe {
            cast::<SoundFn>(a)(sound, pos, volume, pitch)
        })
    }

    pub unsafe fn event_explosion(&self, kind: i32, pos: *mut Vector) -> Result<()> {
        self.with_original(HostFunction::EventExplosion, |a| unsafe {
            cast::<ExplosionFn>(a)(kind, pos)
        })
    }

    pub unsafe fn event_bullet_hit(
        &self,
        unknown: i32,
        hit_type: i32,
        pos: *mut Vector,
        normal: *mut Vector,
    ) -> Result<()> {
        self.with_original(HostFunction::EventBulletHit, |a| unsafe {
            cast::<BulletHitFn>(a)(unknown, hit_type, pos, normal)
        })
    }

    pub unsafe fn save_accounts(&self) -> Result<()> {
        self.with_original(HostFunction::SaveAccountsServer, |a| unsafe {
            cast::<VoidFn>(a)()
        })
    }

    pub unsafe fn line_intersect_level(&self, a: *mut Vector, b: *mut Vector) -> Result<i32> {
        self.with_original(HostFunction::LineIntersectLevel, |f| unsafe {
            cast::<LineIntersectLevelFn>(f)(a, b)
        })
    }

    pub unsafe fn line_intersect_human(
        &self,
        human: i32,
        a: *mut Vector,
        b: *mut Vector,
    ) -> Result<i32> {
        self.with_original(HostFunction::LineIntersectHuman, |f| unsafe {
            cast::<LineIntersectEntityFn>(f)(human, a, b)
        })
    }

    pub unsafe fn line_intersect_object(
        &self,
        vehicle: i32,
        a: *mut Vector,
        b: *mut Vector,
    ) -> Result<i32> {
        self.with_original(HostFunction::LineIntersectObject, |f| unsafe {
            cast::<LineIntersectEntityFn>(f)(vehicle, a, b)
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub unsafe fn line_intersect_triangle(
        &self,
        out_pos: *mut Vector,
        normal: *mut Vector,
        fraction: *mut f32,
        a: *mut Vector,
        b: *mut Vector,
        t1: *mut Vector,
        t2: *mut Vector,
        t3: *mut Vector,
    ) -> Result<i32> {
        self.with_original(HostFunction::LineIntersectTriangle, |f| unsafe {
            cast::<LineIntersectTriangleFn>(f)(out_pos, normal, fraction, a, b, t1, t2, t3)
        })
    }

    pub unsafe fn bullet_time_to_live(&self) -> Result<()> {
        self.with_original(HostFunction::BulletTimeToLive, |a| unsafe { cast::<VoidFn>(a)() })
    }

    pub unsafe fn arm_human(&self, human: i32, weapon: i32, magazines: i32) -> Result<()> {
        self.with_original(HostFunction::ScenarioArmHuman, |a| unsafe {
            cast::<ArmHumanFn>(a)(human, weapon, magazines)
        })
    }

    pub unsafe fn bond_bodies(
        &self,
        body: i32,
        other: i32,
        local: *mut Vector,
        other_local: *mut Vector,
    ) -> Result<i32> {
        self.with_original(HostFunction::BondRigidBodyRigidBody, |a| unsafe {
            cast::<BondBodiesFn>(a)(body, other, local, other_local)
        })
    }

    pub unsafe fn bond_rotation(&self, body: i32, other: i32) -> Result<i32> {
        self.with_original(HostFunction::BondRigidBodyRotRigidBody, |a| unsafe {
            cast::<BondRotFn>(a)(body, other)
        })
    }

    pub unsafe fn bond_level(
        &self,
        body: i32,
        local: *mut Vector,
        global: *mut Vector,
    ) -> Result<i32> {
        self.with_original(HostFunction::BondRigidBodyLevel, |a| unsafe {
            cast::<BondLevelFn>(a)(body, local, global)
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub unsafe fn collide_level(
        &self,
        body: i32,
        local: *mut Vector,
        normal: *mut Vector,
        a: f32,
        b: f32,
        c: f32,
        d: f32,
    ) -> Result<()> {
        self.with_original(HostFunction::CollisionRigidBodyLevel, |f| unsafe {
            cast::<CollideLevelFn>(f)(body, local, normal, a, b, c, d)
        })
    }

    pub unsafe fn item_set_memo(&self, item: i32, memo: *const c_char) -> Result<()> {
        self.with_original(HostFunction::ItemSetMemo, |a| unsafe {
            cast::<SetMemoFn>(a)(item, memo)
        })
    }

    pub unsafe fn item_computer_transmit_line(&self, item: i32, line: u32) -> Result<()> {
        self.with_original(HostFunction::ItemComputerTransmitLine, |a| unsafe {
            cast::<TransmitLineFn>(a)(item, line)
        })
    }

    pub unsafe fn item_computer_increment_line(&self, item: i32) -> Result<()> {
        self.with_original(HostFunction::ItemComputerIncrementLine, |a| unsafe {
            cast::<IdFn>(a)(item)
        })
    }
}
