//! The context object shared by trampolines and script bindings
//!
//! One [`Runtime`] owns the host function table, the world view, the hook
//! registry, the side tables and the current Lua state. The shim creates it
//! once and makes it current on the host's main thread; trampolines find it
//! through [`current`], script functions through the Lua app data.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use mlua::{Function, IntoLuaMulti, Lua, Table};
use tracing::{debug, info};

use crate::config::ScriptConfig;
use crate::entity::World;
use crate::error::{Error, Result};
use crate::game::{Human, Item, Player, RigidBody, Vehicle};
use crate::hook::{self, HookId, HookRegistry, Phase};
use crate::host::Host;
use crate::network::{Network, RequestId};
use crate::script;
use crate::storage::{Attached, SideTables};

/// Why a game reset is happening, as passed to `ResetGame` callbacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ResetReason {
    /// First logic tick after the shim attached
    Boot = 0,
    /// The host called its own reset function
    EngineCall = 1,
    /// Follows an environment reset requested by script
    ScriptReset = 2,
    /// `server.reset()` from script
    ScriptCall = 3,
}

pub struct Runtime {
    this: Weak<Runtime>,
    host: RefCell<Host>,
    world: World,
    image_base: usize,
    network: Arc<Network>,
    hooks: RefCell<HookRegistry<Function>>,
    storage: RefCell<SideTables<Table>>,
    requests: RefCell<HashMap<RequestId, Function>>,
    lua: RefCell<Option<Lua>>,
    entry: PathBuf,
    mode: RefCell<String>,
    pending_reset: RefCell<Option<String>>,
    booted: Cell<bool>,
}

thread_local! {
    static CURRENT: RefCell<Option<Rc<Runtime>>> = const { RefCell::new(None) };
}

/// Make `runtime` current on this thread, returning the previous one
pub fn enter(runtime: Rc<Runtime>) -> Option<Rc<Runtime>> {
    CURRENT.with(|current| current.replace(Some(runtime)))
}

/// Clear the current runtime of this thread
pub fn leave() -> Option<Rc<Runtime>> {
    CURRENT.with(|current| current.take())
}

pub fn current() -> Option<Rc<Runtime>> {
    CURRENT.with(|current| current.borrow().clone())
}

impl Runtime {
    pub fn new(
        host: Host,
        world: World,
        network: Arc<Network>,
        script: &ScriptConfig,
        image_base: usize,
    ) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            host: RefCell::new(host),
            world,
            image_base,
            network,
            hooks: RefCell::new(HookRegistry::new()),
            storage: RefCell::new(SideTables::default()),
            requests: RefCell::new(HashMap::new()),
            lua: RefCell::new(None),
            entry: script.entry.clone(),
            mode: RefCell::new(script.mode.clone()),
            pending_reset: RefCell::new(None),
            booted: Cell::new(false),
        })
    }

    pub fn host(&self) -> Ref<'_, Host> {
        self.host.borrow()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn image_base(&self) -> usize {
        self.image_base
    }

    pub fn network(&self) -> &Arc<Network> {
        &self.network
    }

    pub fn mode(&self) -> String {
        self.mode.borrow().clone()
    }

    pub fn lua(&self) -> Option<Lua> {
        self.lua.borrow().clone()
    }

    /// Redirect every resolvable hookable function to its trampoline
    pub fn install_hooks(&self) -> Vec<HookId> {
        self.host.borrow_mut().install_all(hook::trampoline_address)
    }

    pub fn uninstall_hooks(&self) {
        self.host.borrow_mut().uninstall_all();
    }

    pub(crate) fn hooks(&self) -> Ref<'_, HookRegistry<Function>> {
        self.hooks.borrow()
    }

    pub(crate) fn hooks_mut(&self) -> RefMut<'_, HookRegistry<Function>> {
        self.hooks.borrow_mut()
    }

    /// Callback registered for `id` and `phase` together with the state it belongs to
    pub(crate) fn callback(&self, id: HookId, phase: Phase) -> Option<(Lua, Function)> {
        let callback = self.hooks.borrow().callback(id, phase).cloned()?;
        let lua = self.lua()?;
        Some((lua, callback))
    }

    /// Replace the Lua state with a fresh environment without running any script
    pub fn create_environment(&self) -> Result<Lua> {
        let lua = script::create_environment(self.this.clone(), &self.mode())?;
        let old = self.lua.replace(Some(lua.clone()));
        drop(old);
        Ok(lua)
    }

    /// Run the entry script in the current environment
    pub fn run_entry(&self) -> Result<()> {
        let lua = self.lua().ok_or(Error::NoEnvironment)?;
        let source = fs::read_to_string(&self.entry)?;
        lua.load(source)
            .set_name(format!("@{}", self.entry.display()))
            .exec()?;
        Ok(())
    }

    /// Create the environment and run the entry script
    pub fn start(&self) -> Result<()> {
        self.create_environment()?;
        info!("Loading {} (mode {})", self.entry.display(), self.mode());
        self.run_entry()
    }

    /// Schedule an environment reset for the next logic tick
    pub fn flag_reset(&self, mode: &str) {
        *self.pending_reset.borrow_mut() = Some(mode.to_string());
    }

    /// Tear down every script-owned object and start over in `mode`.
    ///
    /// The worker is held off for the whole teardown so no completion of the
    /// old environment can reach the new one.
    pub fn reset_environment(&self, mode: &str) {
        info!("Resetting script environment (mode {})", mode);
        let rebuilt = self.network.reset(|| {
            self.discard_script_state();
            *self.mode.borrow_mut() = mode.to_string();
            self.create_environment()
        });
        let result = rebuilt.and_then(|_| self.run_entry());
        if let Err(e) = result {
            script::report_error(&e);
        }
    }

    /// Release the Lua state together with every callback and table of it.
    ///
    /// Closing the state runs finalizers that may reach back into the runtime,
    /// so nothing stays borrowed while it drops. The second pass drops what
    /// those finalizers stored.
    fn discard_script_state(&self) {
        for _ in 0..2 {
            let old = (
                self.lua.take(),
                self.hooks.take(),
                self.storage.take(),
                self.requests.take(),
            );
            drop(old);
        }
    }

    /// Run the host's game reset with `ResetGame` callbacks around it
    pub fn reset_game(&self, reason: ResetReason) {
        info!("Resetting game ({:?})", reason);
        hook::intercept(
            self,
            HookId::ResetGame,
            (),
            move |_, lua, _| (reason as i32).into_lua_multi(lua),
            // SAFETY: resetgame takes no arguments.
            |host| unsafe { host.reset_game() },
            |rt, ()| rt.release_inactive(),
        );
    }

    /// Work done at the start of every logic tick, before its callbacks
    pub(crate) fn tick(&self) {
        let pending = self.pending_reset.borrow_mut().take();
        if let Some(mode) = pending {
            self.booted.set(true);
            self.reset_environment(&mode);
            self.reset_game(ResetReason::ScriptReset);
        } else if !self.booted.replace(true) {
            self.reset_game(ResetReason::Boot);
        }
        self.deliver_responses();
    }

    fn deliver_responses(&self) {
        for completion in self.network.drain_responses() {
            let callback = self.requests.borrow_mut().remove(&completion.id);
            let (Some(callback), Some(lua)) = (callback, self.lua()) else {
                debug!("Response {} has no callback", completion.id);
                continue;
            };
            let result = script::http::response_value(&lua, completion.response.as_ref())
                .and_then(|response| callback.call::<()>(response));
            if let Err(e) = result {
                script::report_error(&e);
            }
        }
    }

    pub(crate) fn track_request(&self, id: RequestId, callback: Function) {
        self.requests.borrow_mut().insert(id, callback);
    }

    /// Data table attached to slot `index` of `T`, created on first use
    pub fn data<T: Attached>(&self, lua: &Lua, index: usize) -> mlua::Result<Table> {
        if let Some(table) = T::side_table(&mut self.storage.borrow_mut()).get(index) {
            return Ok(table.clone());
        }
        // Allocating may run finalizers, which can reach the storage again.
        let fresh = lua.create_table()?;
        let mut storage = self.storage.borrow_mut();
        let table = T::side_table(&mut storage).get_or_try_insert_with(index, || Ok(fresh))?;
        Ok(table.clone())
    }

    /// Drop the data attached to slot `index` of `T`
    pub fn clear_data<T: Attached>(&self, index: usize) {
        T::side_table(&mut self.storage.borrow_mut()).clear(index);
    }

    /// Drop data of every slot the host no longer considers live
    fn release_inactive(&self) {
        let mut storage = self.storage.borrow_mut();
        release::<Player>(&self.world, &mut storage);
        release::<Human>(&self.world, &mut storage);
        release::<Item>(&self.world, &mut storage);
        release::<Vehicle>(&self.world, &mut storage);
        release::<RigidBody>(&self.world, &mut storage);
    }
}

fn release<T: Attached>(world: &World, storage: &mut SideTables<Table>) {
    let table = T::side_table(storage);
    match world.arena::<T>() {
        Ok(arena) => table.retain(|index| {
            arena
                .get(index as i64)
                .map(|entity| entity.is_active())
                .unwrap_or(false)
        }),
        Err(_) => table.reset(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::mock::{self, MockHost};
    use crate::host::HostFunction;
    use crate::network::{Headers, Method};

    fn lua_bool(lua: &Lua, expression: &str) -> bool {
        lua.load(expression).eval::<bool>().unwrap()
    }

    #[test]
    fn test_reset_game_veto_skips_original_and_post() {
        let mock = MockHost::new();
        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        lua.load(
            r#"
            post = false
            hook.set("ResetGame", function(reason) seen = reason; return true end)
            hook.set("PostResetGame", function() post = true end)
            hook.enable("ResetGame")
            "#,
        )
        .exec()
        .unwrap();

        rt.reset_game(ResetReason::ScriptCall);
        assert_eq!(lua.globals().get::<i32>("seen").unwrap(), 3);
        assert!(!lua_bool(&lua, "post"));
        assert_eq!(mock::calls(HostFunction::ResetGame), 0);
    }

    #[test]
    fn test_reset_game_runs_post_and_releases_dead_slots() {
        let mock = MockHost::new();
        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        lua.load(
            r#"
            item = items.create(1, Vector())
            item.data.owner = "alice"
            hook.set("PostResetGame", function(reason) post = reason end)
            hook.enable("ResetGame")
            "#,
        )
        .exec()
        .unwrap();

        rt.reset_game(ResetReason::EngineCall);
        assert_eq!(mock::calls(HostFunction::ResetGame), 1);
        assert_eq!(lua.globals().get::<i32>("post").unwrap(), 1);
        assert!(lua_bool(&lua, "item.data.owner == nil"));
    }

    #[test]
    fn test_first_tick_boots() {
        let mock = MockHost::new();
        let rt = mock.runtime();
        rt.create_environment().unwrap();
        rt.tick();
        rt.tick();
        assert_eq!(mock::calls(HostFunction::ResetGame), 1);
    }

    #[test]
    fn test_flagged_reset_rebuilds_environment() {
        let dir = tempfile::tempdir().unwrap();
        let entry = dir.path().join("init.lua");
        fs::write(&entry, "loaded_mode = server.mode").unwrap();
        let mock = MockHost::new();
        let rt = mock.runtime_with_entry(&entry);
        rt.start().unwrap();

        let old = rt.lua().unwrap();
        old.load("hook.set('Logic', function() end) hook.enable('Logic') flagStateForReset('race')")
            .exec()
            .unwrap();
        assert!(rt.hooks().is_enabled(HookId::Logic));

        rt.tick();
        let lua = rt.lua().unwrap();
        assert_eq!(rt.mode(), "race");
        assert_eq!(lua.globals().get::<String>("loaded_mode").unwrap(), "race");
        assert!(!rt.hooks().is_enabled(HookId::Logic));
    }

    #[test]
    fn test_responses_delivered_on_tick() {
        let mock = MockHost::new();
        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        lua.load(
            r#"
            http.get("http://localhost", "/hello", {}, function(res) body = res.body; status = res.status end)
            http.get("http://down", "/", {}, function(res) failed = res == nil end)
            "#,
        )
        .exec()
        .unwrap();

        while rt.network().process_one() {}
        rt.tick();
        assert_eq!(lua.globals().get::<String>("body").unwrap(), "/hello");
        assert_eq!(lua.globals().get::<u16>("status").unwrap(), 200);
        assert!(lua_bool(&lua, "failed"));
    }

    #[test]
    fn test_responses_of_old_environment_are_dropped() {
        let mock = MockHost::new();
        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        let id = rt
            .network()
            .enqueue(Method::Get, "http://localhost", "/", Headers::new());
        rt.track_request(id, lua.create_function(|_, ()| Ok(())).unwrap());

        rt.reset_environment("default");
        while rt.network().process_one() {}
        assert!(rt.network().drain_responses().is_empty());
        assert!(rt.requests.borrow().is_empty());
    }

    #[test]
    fn test_data_cleared_slot_is_fresh() {
        let mock = MockHost::new();
        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        let table = rt.data::<Item>(&lua, 3).unwrap();
        table.set("x", 1).unwrap();
        assert_eq!(rt.data::<Item>(&lua, 3).unwrap().get::<i32>("x").unwrap(), 1);

        rt.clear_data::<Item>(3);
        assert!(rt.data::<Item>(&lua, 3).unwrap().get::<Option<i32>>("x").unwrap().is_none());
    }

    #[test]
    fn test_finalizers_may_touch_data() {
        let mock = MockHost::new();
        let rt = mock.runtime();
        let lua = rt.create_environment().unwrap();
        lua.load(
            r#"
            collectgarbage("incremental", 0, 1000)
            setmetatable({}, { __gc = function() items.getByIndex(1).data.swept = true end })
            for i = 2, 200 do
                items.getByIndex(i).data.n = i
            end
            collectgarbage()
            "#,
        )
        .exec()
        .unwrap();
        let swept: bool = rt.data::<Item>(&lua, 1).unwrap().get("swept").unwrap();
        assert!(swept);

        lua.load(r#"setmetatable({}, { __gc = function() items.getByIndex(5).data.closed = true end })"#)
            .exec()
            .unwrap();
        drop(lua);
        rt.reset_environment("default");
        assert!(rt.lua().is_some());
    }
}
