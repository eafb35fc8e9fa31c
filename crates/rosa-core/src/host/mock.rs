//! In-process stand-in for the host binary.
//!
//! Allocates zeroed arrays for every category, exposes fake host functions
//! through dispatch slots, and plays the host's call sites by calling through
//! those slots, so redirects land in the real trampolines.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::ffi::{CStr, CString, c_char};
use std::path::Path;
use std::ptr::{self, NonNull};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bytemuck::Zeroable;

use super::{Entry, Host, HostFunction};
use super::function::*;
use crate::config::ScriptConfig;
use crate::entity::World;
use crate::game::*;
use crate::memory::layout::{NO_REFERENCE, capacity};
use crate::memory::{Arena, Extent, Record};
use crate::network::{Headers, HttpRequest, HttpResponse, Network, Transport};
use crate::runtime::{self, Runtime};

thread_local! {
    static WORLD: RefCell<World> = RefCell::new(World::default());
    static CALLS: RefCell<BTreeMap<HostFunction, usize>> = RefCell::new(BTreeMap::new());
    static MESSAGES: RefCell<Vec<(i32, String, i32, i32)>> = const { RefCell::new(Vec::new()) };
}

fn record(function: HostFunction) {
    CALLS.with(|calls| *calls.borrow_mut().entry(function).or_default() += 1);
}

fn world() -> World {
    WORLD.with(|world| world.borrow().clone())
}

/// Number of times the fake of `function` ran on this thread
pub fn calls(function: HostFunction) -> usize {
    CALLS.with(|calls| calls.borrow().get(&function).copied().unwrap_or(0))
}

/// Messages that reached the fake message event
pub fn messages() -> Vec<(i32, String, i32, i32)> {
    MESSAGES.with(|messages| messages.borrow().clone())
}

/// Answers with the request path, or fails for hosts containing `down`
pub struct MockTransport;

impl Transport for MockTransport {
    fn execute(&self, request: &HttpRequest) -> Option<HttpResponse> {
        if request.scheme.contains("down") {
            return None;
        }
        let mut headers = Headers::new();
        headers.insert("content-type".to_string(), "text/plain".to_string());
        Some(HttpResponse {
            status: 200,
            body: request.path.clone(),
            headers,
        })
    }
}

fn slots_of<T: Record>(capacity: usize) -> Vec<T> {
    vec![T::zeroed(); capacity]
}

fn fixed<T: Record>(storage: &mut [T]) -> Option<Arena<T>> {
    // SAFETY: the storage outlives the mock host and every arena built from it.
    unsafe { Arena::from_raw_parts(storage.as_mut_ptr(), Extent::Fixed(storage.len())) }.ok()
}

fn counted<T: Record>(storage: &mut [T], counter: &mut i32) -> Option<Arena<T>> {
    let extent = Extent::Counted {
        counter: NonNull::from(counter),
        capacity: storage.len(),
    };
    // SAFETY: as in `fixed`; the counter is boxed by the mock host.
    unsafe { Arena::from_raw_parts(storage.as_mut_ptr(), extent) }.ok()
}

pub struct MockHost {
    _connections: Vec<Connection>,
    _accounts: Vec<Account>,
    _players: Vec<Player>,
    _humans: Vec<Human>,
    _item_types: Vec<ItemType>,
    _items: Vec<Item>,
    _vehicles: Vec<Vehicle>,
    _bullets: Vec<Bullet>,
    _bodies: Vec<RigidBody>,
    _bonds: Vec<Bond>,
    _streets: Vec<Street>,
    _intersections: Vec<StreetIntersection>,
    counters: Box<[i32; 4]>,
    _line_intersect: Box<LineIntersectResult>,
    world: World,
    slots: BTreeMap<HostFunction, Arc<AtomicUsize>>,
}

impl MockHost {
    pub fn new() -> Self {
        let mut connections = slots_of::<Connection>(capacity::CONNECTIONS);
        let mut accounts = slots_of::<Account>(capacity::ACCOUNTS);
        let mut players = slots_of::<Player>(capacity::PLAYERS);
        let mut humans = slots_of::<Human>(capacity::HUMANS);
        let mut item_types = slots_of::<ItemType>(capacity::ITEM_TYPES);
        let mut items = slots_of::<Item>(capacity::ITEMS);
        let mut vehicles = slots_of::<Vehicle>(capacity::VEHICLES);
        let mut bullets = slots_of::<Bullet>(capacity::BULLETS);
        let mut bodies = slots_of::<RigidBody>(capacity::RIGID_BODIES);
        let mut bonds = slots_of::<Bond>(capacity::BONDS);
        let mut streets = slots_of::<Street>(capacity::STREETS);
        let mut intersections = slots_of::<StreetIntersection>(capacity::INTERSECTIONS);
        let mut counters = Box::new([0i32; 4]);
        let mut line_intersect = Box::new(LineIntersectResult::zeroed());

        let [connection_count, bullet_count, street_count, intersection_count] = &mut *counters;
        let world = World {
            connections: counted(&mut connections, connection_count),
            accounts: fixed(&mut accounts),
            players: fixed(&mut players),
            humans: fixed(&mut humans),
            item_types: fixed(&mut item_types),
            items: fixed(&mut items),
            vehicles: fixed(&mut vehicles),
            bullets: counted(&mut bullets, bullet_count),
            bodies: fixed(&mut bodies),
            bonds: fixed(&mut bonds),
            streets: counted(&mut streets, street_count),
            intersections: counted(&mut intersections, intersection_count),
            line_intersect_result: Some(NonNull::from(&mut *line_intersect)),
        };

        WORLD.with(|w| *w.borrow_mut() = world.clone());
        CALLS.with(|calls| calls.borrow_mut().clear());
        MESSAGES.with(|messages| messages.borrow_mut().clear());

        let fakes: [(HostFunction, usize); 19] = [
            (HostFunction::ResetGame, fake_resetgame as usize),
            (HostFunction::Logic, fake_logic as usize),
            (HostFunction::CreatePlayer, fake_createplayer as usize),
            (HostFunction::DeletePlayer, fake_deleteplayer as usize),
            (HostFunction::CreateHuman, fake_createhuman as usize),
            (HostFunction::DeleteHuman, fake_deletehuman as usize),
            (HostFunction::CreateItem, fake_createitem as usize),
            (HostFunction::DeleteItem, fake_deleteitem as usize),
            (HostFunction::CreateObject, fake_createobject as usize),
            (HostFunction::DeleteObject, fake_deleteobject as usize),
            (HostFunction::LinkItem, fake_linkitem as usize),
            (HostFunction::EventMessage, fake_message as usize),
            (HostFunction::EventUpdatePlayer, fake_updateplayer as usize),
            (HostFunction::SaveAccountsServer, fake_saveaccounts as usize),
            (HostFunction::LineIntersectLevel, fake_lineintersectlevel as usize),
            (HostFunction::LineIntersectObject, fake_lineintersectobject as usize),
            (HostFunction::ScenarioArmHuman, fake_armhuman as usize),
            (HostFunction::BondRigidBodyRigidBody, fake_bondbodies as usize),
            (HostFunction::ItemSetMemo, fake_setmemo as usize),
        ];
        let slots = fakes
            .into_iter()
            .map(|(function, address)| (function, Arc::new(AtomicUsize::new(address))))
            .collect();

        Self {
            _connections: connections,
            _accounts: accounts,
            _players: players,
            _humans: humans,
            _item_types: item_types,
            _items: items,
            _vehicles: vehicles,
            _bullets: bullets,
            _bodies: bodies,
            _bonds: bonds,
            _streets: streets,
            _intersections: intersections,
            counters,
            _line_intersect: line_intersect,
            world,
            slots,
        }
    }

    pub fn world(&self) -> World {
        self.world.clone()
    }

    /// Move the live counter of one of the counted arrays
    pub fn set_count(&mut self, library: &str, count: i32) {
        let index = match library {
            "connections" => 0,
            "bullets" => 1,
            "streets" => 2,
            "intersections" => 3,
            _ => panic!("{library} is not counted"),
        };
        self.counters[index] = count;
    }

    /// Function table whose resolved entries are the fakes' dispatch slots
    pub fn host(&self) -> Host {
        let mut host = Host::new();
        for (function, slot) in &self.slots {
            host.set_entry(*function, Entry::Slot(Arc::clone(slot)));
        }
        host
    }

    /// A runtime over this host, current on this thread with hooks installed
    pub fn runtime(&self) -> Rc<Runtime> {
        self.runtime_with_entry(Path::new("main/init.lua"))
    }

    pub fn runtime_with_entry(&self, entry: &Path) -> Rc<Runtime> {
        let script = ScriptConfig {
            entry: entry.to_path_buf(),
            mode: "default".to_string(),
        };
        let network = Arc::new(Network::new(Arc::new(MockTransport)));
        let rt = Runtime::new(self.host(), self.world(), network, &script, 0x40_0000);
        runtime::enter(Rc::clone(&rt));
        rt.install_hooks();
        rt
    }

    /// Current target of the host's call site for `function`
    fn call_site<F: Copy>(&self, function: HostFunction) -> F {
        let address = self.slots[&function].load(Ordering::Acquire);
        // SAFETY: slots only ever hold fakes or trampolines of the matching signature.
        unsafe { std::mem::transmute_copy(&address) }
    }

    pub fn logic(&self) {
        let f: VoidFn = self.call_site(HostFunction::Logic);
        unsafe { f() }
    }

    pub fn reset_game(&self) {
        let f: VoidFn = self.call_site(HostFunction::ResetGame);
        unsafe { f() }
    }

    pub fn create_item(&self, item_type: i32) -> i32 {
        self.create_item_at(item_type, Vector::default())
    }

    pub fn create_item_at(&self, item_type: i32, pos: Vector) -> i32 {
        let mut pos = pos;
        let f: CreateItemFn = self.call_site(HostFunction::CreateItem);
        unsafe { f(item_type, &mut pos, ptr::null_mut(), ptr::null_mut()) }
    }

    pub fn delete_item(&self, item: i32) {
        let f: IdFn = self.call_site(HostFunction::DeleteItem);
        unsafe { f(item) }
    }

    pub fn create_player(&self) -> i32 {
        let f: CreatePlayerFn = self.call_site(HostFunction::CreatePlayer);
        unsafe { f() }
    }

    pub fn delete_player(&self, player: i32) {
        let f: IdFn = self.call_site(HostFunction::DeletePlayer);
        unsafe { f(player) }
    }

    pub fn link_item(&self, item: i32, child: i32, human: i32, slot: i32) -> i32 {
        let f: LinkItemFn = self.call_site(HostFunction::LinkItem);
        unsafe { f(item, child, human, slot) }
    }

    pub fn message(&self, kind: i32, text: &str, speaker: i32) {
        let text = CString::new(text).unwrap();
        let f: MessageFn = self.call_site(HostFunction::EventMessage);
        unsafe { f(kind, text.as_ptr() as *mut c_char, speaker, 0) }
    }
}

/// Activate the first free slot of `arena` with `init`
fn allocate<T: Record>(arena: Option<Arena<T>>, init: impl FnOnce(&mut T)) -> i32 {
    let Some(arena) = arena else {
        return NO_REFERENCE;
    };
    match arena.iter().find(|slot| !slot.is_active()) {
        Some(slot) => {
            slot.write(|record| {
                *record = T::zeroed();
                init(record);
            });
            slot.index() as i32
        }
        None => NO_REFERENCE,
    }
}

fn modify<T: Record>(arena: Option<Arena<T>>, id: i32, f: impl FnOnce(&mut T)) {
    if let Some(slot) = arena.and_then(|arena| arena.get(id.into()).ok()) {
        slot.write(f);
    }
}

unsafe fn read_or_default<T: Copy + Default>(ptr: *const T) -> T {
    if ptr.is_null() { T::default() } else { unsafe { *ptr } }
}

extern "C" fn fake_resetgame() {
    record(HostFunction::ResetGame);
    let world = world();
    for item in world.items.iter().flat_map(|arena| arena.iter()) {
        item.write(|i| i.active = 0);
    }
    for human in world.humans.iter().flat_map(|arena| arena.iter()) {
        human.write(|h| h.active = 0);
    }
    for vehicle in world.vehicles.iter().flat_map(|arena| arena.iter()) {
        vehicle.write(|v| v.active = 0);
    }
}

extern "C" fn fake_logic() {
    record(HostFunction::Logic);
}

extern "C" fn fake_createplayer() -> i32 {
    record(HostFunction::CreatePlayer);
    allocate(world().players, |p| {
        p.active = 1;
        p.human_id = NO_REFERENCE;
        p.account_id = NO_REFERENCE;
    })
}

extern "C" fn fake_deleteplayer(player: i32) {
    record(HostFunction::DeletePlayer);
    modify(world().players, player, |p| p.active = 0);
}

extern "C" fn fake_createhuman(pos: *mut Vector, rot: *mut RotMatrix, player: i32) -> i32 {
    record(HostFunction::CreateHuman);
    let _ = rot;
    let pos = unsafe { read_or_default(pos) };
    allocate(world().humans, |h| {
        h.active = 1;
        h.player_id = player;
        h.account_id = NO_REFERENCE;
        h.vehicle_id = NO_REFERENCE;
        h.pos = pos;
        for (i, bone) in h.bones.iter_mut().enumerate() {
            bone.body_id = i as i32;
            bone.pos = pos;
            bone.pos2 = pos;
        }
    })
}

extern "C" fn fake_deletehuman(human: i32) {
    record(HostFunction::DeleteHuman);
    modify(world().humans, human, |h| h.active = 0);
}

extern "C" fn fake_createitem(
    item_type: i32,
    pos: *mut Vector,
    vel: *mut Vector,
    rot: *mut RotMatrix,
) -> i32 {
    record(HostFunction::CreateItem);
    let (pos, vel, rot) = unsafe { (read_or_default(pos), read_or_default(vel), read_or_default(rot)) };
    allocate(world().items, |i| {
        i.active = 1;
        i.type_id = item_type;
        i.pos = pos;
        i.vel = vel;
        i.rot = rot;
        i.grenade_primer_id = NO_REFERENCE;
        i.parent_human_id = NO_REFERENCE;
        i.parent_item_id = NO_REFERENCE;
        i.body_id = NO_REFERENCE;
    })
}

extern "C" fn fake_deleteitem(item: i32) {
    record(HostFunction::DeleteItem);
    modify(world().items, item, |i| i.active = 0);
}

extern "C" fn fake_createobject(
    vehicle_type: i32,
    pos: *mut Vector,
    vel: *mut Vector,
    rot: *mut RotMatrix,
    color: i32,
) -> i32 {
    record(HostFunction::CreateObject);
    let (pos, vel, rot) = unsafe { (read_or_default(pos), read_or_default(vel), read_or_default(rot)) };
    allocate(world().vehicles, |v| {
        v.active = 1;
        v.type_id = vehicle_type;
        v.pos = pos;
        v.vel = vel;
        v.rot = rot;
        v.color = color;
        v.last_driver_player_id = NO_REFERENCE;
        v.body_id = NO_REFERENCE;
    })
}

extern "C" fn fake_deleteobject(vehicle: i32) {
    record(HostFunction::DeleteObject);
    modify(world().vehicles, vehicle, |v| v.active = 0);
}

extern "C" fn fake_linkitem(item: i32, child: i32, human: i32, slot: i32) -> i32 {
    record(HostFunction::LinkItem);
    let _ = child;
    modify(world().items, item, |i| {
        i.parent_human_id = human;
        i.parent_slot = slot;
    });
    1
}

extern "C" fn fake_message(kind: i32, message: *mut c_char, speaker: i32, distance: i32) {
    record(HostFunction::EventMessage);
    let text = unsafe { CStr::from_ptr(message) }.to_string_lossy().into_owned();
    MESSAGES.with(|messages| messages.borrow_mut().push((kind, text, speaker, distance)));
}

extern "C" fn fake_updateplayer(player: i32) {
    let _ = player;
    record(HostFunction::EventUpdatePlayer);
}

extern "C" fn fake_saveaccounts() {
    record(HostFunction::SaveAccountsServer);
}

extern "C" fn fake_lineintersectlevel(a: *mut Vector, b: *mut Vector) -> i32 {
    record(HostFunction::LineIntersectLevel);
    let (a, b) = unsafe { (read_or_default(a), read_or_default(b)) };
    if b.y >= 0.0 {
        return 0;
    }
    let Some(result) = world().line_intersect_result else {
        return 0;
    };
    let fraction = a.y / (a.y - b.y);
    unsafe {
        result.as_ptr().write(LineIntersectResult {
            pos: a + (b - a) * fraction,
            normal: Vector::new(0.0, 1.0, 0.0),
            fraction,
            human_bone: 0,
            vehicle_face: 0,
        });
    }
    1
}

/// Segments crossing y = 0 hit; those starting at negative x hit wheel 2,
/// the rest hit face 5.
extern "C" fn fake_lineintersectobject(vehicle: i32, a: *mut Vector, b: *mut Vector) -> i32 {
    record(HostFunction::LineIntersectObject);
    let _ = vehicle;
    let (a, b) = unsafe { (read_or_default(a), read_or_default(b)) };
    if a.y < 0.0 || b.y >= 0.0 {
        return 0;
    }
    let Some(result) = world().line_intersect_result else {
        return 0;
    };
    let fraction = a.y / (a.y - b.y);
    let (human_bone, vehicle_face) = if a.x < 0.0 { (2, -1) } else { (0, 5) };
    unsafe {
        result.as_ptr().write(LineIntersectResult {
            pos: a + (b - a) * fraction,
            normal: Vector::new(0.0, 1.0, 0.0),
            fraction,
            human_bone,
            vehicle_face,
        });
    }
    1
}

extern "C" fn fake_armhuman(human: i32, weapon: i32, magazines: i32) {
    record(HostFunction::ScenarioArmHuman);
    let _ = (human, weapon, magazines);
}

extern "C" fn fake_bondbodies(body: i32, other: i32, local: *mut Vector, other_local: *mut Vector) -> i32 {
    record(HostFunction::BondRigidBodyRigidBody);
    let (local, other_local) = unsafe { (read_or_default(local), read_or_default(other_local)) };
    allocate(world().bonds, |b| {
        b.active = 1;
        b.body_id = body;
        b.other_body_id = other;
        b.local_pos = local;
        b.other_local_pos = other_local;
    })
}

extern "C" fn fake_setmemo(item: i32, memo: *const c_char) {
    record(HostFunction::ItemSetMemo);
    let _ = (item, memo);
}
