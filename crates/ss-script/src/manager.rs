use std::collections::BTreeMap;

use ss_world::{EntityId, World, WorldError, WorldEventKind};

use crate::context::{ScriptContext, ScriptEnv};
use crate::error::{ScriptError, SimError, SimResult};
use crate::instance::{CallRequest, ExternalReturn, InstanceId, ScriptInstance, Termination, TickOutcome};
use crate::system::SystemCatalog;

/// Owns every live script instance and drives them once per tick.
///
/// Entity and item calls do not recurse: the scheduler keeps an explicit
/// work stack. A spawned child is pushed and ticked right away; a child that
/// terminates pushes its parent back as a forced resume. A chain of calls
/// that never sleeps therefore settles within one tick.
#[derive(Debug, Default)]
pub struct ScriptManager {
    instances: BTreeMap<InstanceId, ScriptInstance>,
    systems: SystemCatalog,
    next_id: u64,
}

impl ScriptManager {
    /// A manager with the built-in system functions.
    pub fn new() -> Self {
        Self::default()
    }

    /// A manager using a custom system function catalog.
    pub fn with_systems(systems: SystemCatalog) -> Self {
        Self {
            systems,
            ..Self::default()
        }
    }

    pub fn systems(&self) -> &SystemCatalog {
        &self.systems
    }

    pub fn systems_mut(&mut self) -> &mut SystemCatalog {
        &mut self.systems
    }

    /// Attach a new top-level script to `entity`, running as `authority`.
    pub fn attach(&mut self, world: &World, entity: EntityId, source: &str, authority: i32) -> SimResult<InstanceId> {
        if source.trim().is_empty() {
            return Err(SimError::EmptyScript);
        }
        if world.entity(entity).is_none() {
            return Err(WorldError::EntityNotFound(entity).into());
        }
        let id = self.allocate_id();
        self.instances
            .insert(id, ScriptInstance::new(id, entity, authority, source));
        tracing::info!(instance = %id, %entity, authority, "attached script");
        Ok(id)
    }

    pub fn get(&self, id: InstanceId) -> Option<&ScriptInstance> {
        self.instances.get(&id)
    }

    /// Live instances in ascending id order.
    pub fn instances(&self) -> impl Iterator<Item = &ScriptInstance> {
        self.instances.values()
    }

    /// Live instances attached to `entity`.
    pub fn instances_on(&self, entity: EntityId) -> impl Iterator<Item = &ScriptInstance> {
        self.instances.values().filter(move |i| i.entity == entity)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Remove an instance. A parent waiting on it receives a failure and
    /// fails on its next tick. Returns `false` if no such instance is live.
    pub fn detach(&mut self, id: InstanceId) -> bool {
        let Some(mut instance) = self.instances.remove(&id) else {
            return false;
        };
        let termination = instance.abort(ScriptError::Custom("Script detached".into()));
        tracing::info!(instance = %id, entity = %termination.entity, "detached script");
        if let Some(parent) = termination.parent {
            self.deliver(parent, id, ExternalReturn::Failed(ScriptError::Custom("Script detached".into())));
        }
        true
    }

    /// Tick every live instance once, in ascending id order. Instances
    /// created during this call are ticked as part of their call chain.
    pub fn tick_scripts(&mut self, env: &mut ScriptEnv<'_>) {
        let ids: Vec<InstanceId> = self.instances.keys().copied().collect();
        for id in ids {
            self.run(env, id, false);
        }
    }

    /// Tick `start` and everything its calls and returns make runnable.
    fn run(&mut self, env: &mut ScriptEnv<'_>, start: InstanceId, forced: bool) {
        let mut work = vec![(start, forced)];
        while let Some((id, forced)) = work.pop() {
            let Some(mut instance) = self.instances.remove(&id) else {
                continue;
            };

            let outcome = {
                let mut ctx = ScriptContext {
                    world: &mut *env.world,
                    repository: env.repository,
                    registry: env.registry,
                    systems: &self.systems,
                    config: env.config,
                    tick: env.tick,
                };
                instance.tick(&mut ctx, forced)
            };

            match outcome {
                TickOutcome::Skipped | TickOutcome::Yielded => {
                    self.instances.insert(id, instance);
                }
                TickOutcome::Called(mut request) => {
                    let resume = request.resume.take();
                    match self.spawn_child(env, &instance, request) {
                        Ok(child) => {
                            instance.await_child(child, resume);
                            self.instances.insert(id, instance);
                            work.push((child, true));
                        }
                        Err(error) => {
                            let termination = instance.abort(error);
                            work.extend(self.finish(env.world, termination).map(|p| (p, true)));
                        }
                    }
                }
                TickOutcome::Terminated(termination) => {
                    work.extend(self.finish(env.world, termination).map(|p| (p, true)));
                }
            }
        }
    }

    /// Create the child instance for an entity or item call.
    fn spawn_child(
        &mut self,
        env: &ScriptEnv<'_>,
        caller: &ScriptInstance,
        request: CallRequest,
    ) -> Result<InstanceId, ScriptError> {
        let max = env.config.max_call_depth;
        if self.chain_len(caller) >= max {
            return Err(ScriptError::CallDepthExceeded(max));
        }
        let source = env
            .loader
            .load(request.category, &request.script)
            .ok_or_else(|| ScriptError::ScriptNotFound(format!("{}/{}", request.category, request.script)))?;
        if source.trim().is_empty() {
            return Err(ScriptError::EmptyScript(format!("{}/{}", request.category, request.script)));
        }

        let id = self.allocate_id();
        let mut child = ScriptInstance::new(id, request.host, request.authority, &source);
        child.parent = Some(caller.id);
        for (name, value) in request.seeds {
            child.seed(name, value);
        }
        tracing::debug!(
            instance = %id,
            parent = %caller.id,
            entity = %request.host,
            "spawned {} {}",
            request.category,
            request.script
        );
        self.instances.insert(id, child);
        Ok(id)
    }

    /// Number of instances in `caller`'s parent chain, itself included.
    fn chain_len(&self, caller: &ScriptInstance) -> usize {
        let mut len = 1;
        let mut next = caller.parent;
        while let Some(id) = next {
            len += 1;
            next = self.instances.get(&id).and_then(|i| i.parent);
        }
        len
    }

    /// Report a terminated instance and hand its result to its parent.
    /// Returns the parent to resume.
    fn finish(&mut self, world: &mut World, termination: Termination) -> Option<InstanceId> {
        let Termination {
            instance,
            entity,
            parent,
            line,
            result,
        } = termination;

        let ret = match result {
            Ok(value) => {
                tracing::debug!(%instance, %entity, "script exited");
                ExternalReturn::Value(value.unwrap_or_default())
            }
            Err(error) => {
                let message = match line {
                    Some(n) => format!("line {n}: {error}"),
                    None => error.to_string(),
                };
                tracing::warn!(%instance, %entity, "script failed: {message}");
                // The entity may have been removed; the event still records the failure.
                if let Err(e) = world.append_log(entity, message.clone()) {
                    tracing::debug!(%instance, "failure not logged: {e}");
                }
                world.emit(WorldEventKind::ScriptFailed {
                    entity,
                    error: message,
                });
                ExternalReturn::Failed(error)
            }
        };

        let parent = parent?;
        self.deliver(parent, instance, ret).then_some(parent)
    }

    fn deliver(&mut self, parent: InstanceId, child: InstanceId, ret: ExternalReturn) -> bool {
        match self.instances.get_mut(&parent) {
            Some(p) if p.awaiting() == Some(child) => {
                p.deliver(ret);
                true
            }
            _ => false,
        }
    }

    fn allocate_id(&mut self) -> InstanceId {
        let id = InstanceId(self.next_id);
        self.next_id += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::loader::{MemoryLoader, ScriptCategory};
    use crate::registry::{TypeRegistry, declared_functions};
    use crate::repository::FunctionRepository;
    use ss_world::{EntityType, ItemType, SERVER_OWNER, TilePos, TypeCatalog};

    struct Fixture {
        world: World,
        loader: MemoryLoader,
        repository: FunctionRepository,
        registry: TypeRegistry,
        config: SimConfig,
        tick: u64,
    }

    impl Fixture {
        fn new(loader: MemoryLoader) -> Self {
            let world = World::new(
                TypeCatalog::new(vec![EntityType::new(0, "Npc").with_storage(1), EntityType::new(1, "Door")]),
                TypeCatalog::new(vec![ItemType::new(0, "Key")]),
            );
            let repository = FunctionRepository::scan(&loader, &declared_functions(&world)).unwrap();
            let registry = TypeRegistry::build(&world, &repository);
            Self {
                world,
                loader,
                repository,
                registry,
                config: SimConfig::default(),
                tick: 0,
            }
        }

        fn tick(&mut self, manager: &mut ScriptManager) {
            self.tick += 1;
            self.world.set_tick(self.tick);
            let mut env = ScriptEnv {
                world: &mut self.world,
                repository: &self.repository,
                registry: &self.registry,
                loader: &self.loader,
                config: &self.config,
                tick: self.tick,
            };
            manager.tick_scripts(&mut env);
            self.world.tick_entities();
        }
    }

    fn log_of(world: &World, id: EntityId) -> Vec<String> {
        world.entity(id).unwrap().log.iter().cloned().collect()
    }

    #[test]
    fn attach_rejects_blank_and_missing() {
        let mut fx = Fixture::new(MemoryLoader::new());
        let npc = fx.world.spawn(0, TilePos::default(), SERVER_OWNER).unwrap();
        let mut manager = ScriptManager::new();

        assert!(matches!(
            manager.attach(&fx.world, npc, "  \n ", SERVER_OWNER),
            Err(SimError::EmptyScript)
        ));
        assert!(matches!(
            manager.attach(&fx.world, EntityId(99), "log(1)", SERVER_OWNER),
            Err(SimError::World(_))
        ));
        let a = manager.attach(&fx.world, npc, "log(1)", SERVER_OWNER).unwrap();
        let b = manager.attach(&fx.world, npc, "log(2)", SERVER_OWNER).unwrap();
        assert!(a < b);
        assert_eq!(manager.instances_on(npc).count(), 2);
        fx.tick(&mut manager);
    }

    #[test]
    fn failed_instance_is_removed_and_logged() {
        let mut fx = Fixture::new(MemoryLoader::new());
        let npc = fx.world.spawn(0, TilePos::default(), SERVER_OWNER).unwrap();
        let mut manager = ScriptManager::new();
        let id = manager
            .attach(&fx.world, npc, "log(\"hi\")\nnope(1)", SERVER_OWNER)
            .unwrap();

        fx.tick(&mut manager);

        assert!(manager.get(id).is_none());
        assert!(manager.is_empty());
        assert_eq!(
            log_of(&fx.world, npc),
            vec![
                "hi".to_string(),
                "line 2: Referencing non-existent function NULL:nope".to_string()
            ]
        );
        assert!(fx.world.events().events().iter().any(|e| matches!(
            &e.kind,
            WorldEventKind::ScriptFailed { entity, .. } if *entity == npc
        )));
    }

    #[test]
    fn item_call_returns_within_tick() {
        let loader = MemoryLoader::new().with(ScriptCategory::Item, "key.turn", "$SetNumParams(1)\nexit(_param0 * 2)");
        let mut fx = Fixture::new(loader);
        let npc = fx.world.spawn(0, TilePos::default(), SERVER_OWNER).unwrap();
        let key = fx.world.give_item(npc, 0).unwrap();

        let mut manager = ScriptManager::new();
        let source = format!("var k = $Item[{key}]\nlog(k.turn(21))\nexit()");
        let id = manager.attach(&fx.world, npc, &source, SERVER_OWNER).unwrap();
        fx.tick(&mut manager);

        assert!(manager.get(id).is_none());
        assert_eq!(log_of(&fx.world, npc), vec!["42".to_string()]);
    }

    #[test]
    fn call_depth_is_bounded() {
        let loader = MemoryLoader::new().with(ScriptCategory::Item, "key.spin", "_item.spin()");
        let mut fx = Fixture::new(loader);
        fx.config = SimConfig::default().with_max_call_depth(3);
        let npc = fx.world.spawn(0, TilePos::default(), SERVER_OWNER).unwrap();
        let key = fx.world.give_item(npc, 0).unwrap();

        let mut manager = ScriptManager::new();
        let source = format!("var k = $Item[{key}]\nk.spin()");
        manager.attach(&fx.world, npc, &source, SERVER_OWNER).unwrap();
        fx.tick(&mut manager);

        // Third child is refused; the failure unwinds through both ancestors.
        assert!(manager.is_empty());
        assert_eq!(log_of(&fx.world, npc), vec!["Call depth exceeded (3)".to_string(); 3]);
    }

    #[test]
    fn detach_fails_waiting_parent() {
        let loader = MemoryLoader::new().with(ScriptCategory::Item, "key.wait", "sleep(50)");
        let mut fx = Fixture::new(loader);
        let npc = fx.world.spawn(0, TilePos::default(), SERVER_OWNER).unwrap();
        let key = fx.world.give_item(npc, 0).unwrap();

        let mut manager = ScriptManager::new();
        let source = format!("var k = $Item[{key}]\nvar r = k.wait()");
        let parent = manager.attach(&fx.world, npc, &source, SERVER_OWNER).unwrap();
        fx.tick(&mut manager);

        let child = manager.get(parent).unwrap().awaiting().unwrap();
        assert_eq!(manager.get(child).unwrap().parent(), Some(parent));
        assert!(manager.detach(child));
        assert!(!manager.detach(child));
        assert!(manager.get(parent).unwrap().is_enabled());
    }
}
