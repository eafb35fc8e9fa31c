use std::ptr::NonNull;

use tracing::warn;

use super::Category;
use crate::error::{Error, Result};
use crate::game::*;
use crate::memory::layout::capacity;
use crate::memory::{Arena, Extent};
use crate::offset::ResolvedLayout;

/// Every host array this crate can see; `None` where the layout did not resolve
#[derive(Debug, Clone, Default)]
pub struct World {
    pub connections: Option<Arena<Connection>>,
    pub accounts: Option<Arena<Account>>,
    pub players: Option<Arena<Player>>,
    pub humans: Option<Arena<Human>>,
    pub item_types: Option<Arena<ItemType>>,
    pub items: Option<Arena<Item>>,
    pub vehicles: Option<Arena<Vehicle>>,
    pub bullets: Option<Arena<Bullet>>,
    pub bodies: Option<Arena<RigidBody>>,
    pub bonds: Option<Arena<Bond>>,
    pub streets: Option<Arena<Street>>,
    pub intersections: Option<Arena<StreetIntersection>>,
    /// Out-parameter block filled by the host's line intersection functions
    pub line_intersect_result: Option<NonNull<LineIntersectResult>>,
}

/// Build one arena from layout entries, bounded by its live counter when `counted`
///
/// # Safety
/// The resolved addresses must point at the host's arrays and counters.
unsafe fn locate<T: Category>(
    layout: &ResolvedLayout,
    capacity: usize,
    counted: bool,
) -> Option<Arena<T>> {
    let Some(base) = layout.array(T::LIBRARY) else {
        warn!("Array {} is unavailable", T::LIBRARY);
        return None;
    };
    let extent = if counted {
        let Some(counter) = layout.counter(T::LIBRARY).and_then(|c| NonNull::new(c as *mut i32))
        else {
            warn!("Counter of {} is unavailable", T::LIBRARY);
            return None;
        };
        Extent::Counted { counter, capacity }
    } else {
        Extent::Fixed(capacity)
    };
    unsafe { Arena::from_raw_parts(base as *mut T, extent) }.ok()
}

impl World {
    /// Arenas at the addresses of a resolved layout
    ///
    /// # Safety
    /// The layout must describe the running host build.
    pub unsafe fn from_layout(layout: &ResolvedLayout) -> Self {
        unsafe {
            Self {
                connections: locate(layout, capacity::CONNECTIONS, true),
                accounts: locate(layout, capacity::ACCOUNTS, false),
                players: locate(layout, capacity::PLAYERS, false),
                humans: locate(layout, capacity::HUMANS, false),
                item_types: locate(layout, capacity::ITEM_TYPES, false),
                items: locate(layout, capacity::ITEMS, false),
                vehicles: locate(layout, capacity::VEHICLES, false),
                bullets: locate(layout, capacity::BULLETS, true),
                bodies: locate(layout, capacity::RIGID_BODIES, false),
                bonds: locate(layout, capacity::BONDS, false),
                streets: locate(layout, capacity::STREETS, true),
                intersections: locate(layout, capacity::INTERSECTIONS, true),
                line_intersect_result: layout
                    .array("lineIntersectResult")
                    .and_then(|a| NonNull::new(a as *mut LineIntersectResult)),
            }
        }
    }

    /// Arena of category `T`, or `ArrayNotResolved`
    pub fn arena<T: Category>(&self) -> Result<Arena<T>> {
        T::arena(self).ok_or(Error::ArrayNotResolved(T::NAME))
    }

    /// Last line intersection result written by the host
    pub fn line_intersect_result(&self) -> Result<LineIntersectResult> {
        let ptr = self
            .line_intersect_result
            .ok_or(Error::ArrayNotResolved("LineIntersectResult"))?;
        // SAFETY: resolved from the layout; the host keeps it in static storage.
        Ok(unsafe { ptr.as_ptr().read_unaligned() })
    }
}
