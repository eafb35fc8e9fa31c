use std::str::FromStr;

use strum::{Display, EnumCount, EnumIter, EnumString, IntoStaticStr};

use crate::host::HostFunction;

/// Interceptable event points, one per hooked host function
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    EnumCount,
    IntoStaticStr,
)]
pub enum HookId {
    ResetGame,
    Logic,
    CreatePlayer,
    DeletePlayer,
    CreateHuman,
    DeleteHuman,
    CreateItem,
    DeleteItem,
    CreateVehicle,
    DeleteVehicle,
    LinkItem,
    GrenadeExplode,
    HumanDamage,
    Message,
    UpdatePlayer,
    UpdatePlayerFinance,
    UpdateVehicle,
    BulletHit,
    SaveAccounts,
    LineIntersectHuman,
}

/// Which side of the original call a callback runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Phase {
    Pre,
    Post,
}

const POST_PREFIX: &str = "Post";

impl HookId {
    /// Host function this event intercepts
    pub const fn function(self) -> HostFunction {
        match self {
            HookId::ResetGame => HostFunction::ResetGame,
            HookId::Logic => HostFunction::Logic,
            HookId::CreatePlayer => HostFunction::CreatePlayer,
            HookId::DeletePlayer => HostFunction::DeletePlayer,
            HookId::CreateHuman => HostFunction::CreateHuman,
            HookId::DeleteHuman => HostFunction::DeleteHuman,
            HookId::CreateItem => HostFunction::CreateItem,
            HookId::DeleteItem => HostFunction::DeleteItem,
            HookId::CreateVehicle => HostFunction::CreateObject,
            HookId::DeleteVehicle => HostFunction::DeleteObject,
            HookId::LinkItem => HostFunction::LinkItem,
            HookId::GrenadeExplode => HostFunction::GrenadeExplosion,
            HookId::HumanDamage => HostFunction::HumanApplyDamage,
            HookId::Message => HostFunction::EventMessage,
            HookId::UpdatePlayer => HostFunction::EventUpdatePlayer,
            HookId::UpdatePlayerFinance => HostFunction::EventUpdatePlayerFinance,
            HookId::UpdateVehicle => HostFunction::EventUpdateObject,
            HookId::BulletHit => HostFunction::EventBulletHit,
            HookId::SaveAccounts => HostFunction::SaveAccountsServer,
            HookId::LineIntersectHuman => HostFunction::LineIntersectHuman,
        }
    }

    /// Name of the post-event alias, e.g. `PostCreateItem`
    pub fn post_name(self) -> String {
        format!("{POST_PREFIX}{self}")
    }

    /// Resolve an event name, accepting the `Post` alias of every event
    pub fn parse_event(name: &str) -> Option<(HookId, Phase)> {
        if let Ok(id) = HookId::from_str(name) {
            return Some((id, Phase::Pre));
        }
        let base = name.strip_prefix(POST_PREFIX)?;
        HookId::from_str(base).ok().map(|id| (id, Phase::Post))
    }
}
