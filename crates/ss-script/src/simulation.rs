use ss_world::{EntityId, World, WorldError};

use crate::clock::SimClock;
use crate::config::SimConfig;
use crate::context::ScriptEnv;
use crate::error::{SimError, SimResult};
use crate::instance::InstanceId;
use crate::loader::{ScriptCategory, ScriptSource};
use crate::manager::ScriptManager;
use crate::registry::{TypeRegistry, declared_functions};
use crate::repository::FunctionRepository;
use crate::system::{SystemCall, SystemReturn};

/// The top-level simulation orchestrator.
///
/// Owns the world, the script loader, the function repository and type
/// registry built from them, the script scheduler, and the clock. Drives the
/// tick loop: scripts first, then entity cooldowns and queued commands.
pub struct Simulation {
    world: World,
    loader: Box<dyn ScriptSource>,
    repository: FunctionRepository,
    registry: TypeRegistry,
    scripts: ScriptManager,
    clock: SimClock,
    config: SimConfig,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("tick", &self.clock.tick())
            .field("entities", &self.world.entity_count())
            .field("functions", &self.repository.len())
            .field("scripts", &self.scripts.len())
            .finish()
    }
}

impl Simulation {
    /// Scan `loader` for entity and item functions and set up an empty
    /// scheduler over `world`.
    pub fn new(mut world: World, loader: impl ScriptSource + 'static, config: SimConfig) -> SimResult<Self> {
        let repository = FunctionRepository::scan(&loader, &declared_functions(&world))?;
        let registry = TypeRegistry::build(&world, &repository);
        if config.max_events > 0 {
            world.events_mut().set_max_events(config.max_events);
        }
        tracing::info!(functions = repository.len(), "simulation ready");
        Ok(Self {
            world,
            loader: Box::new(loader),
            repository,
            registry,
            scripts: ScriptManager::new(),
            clock: SimClock::new(),
            config,
        })
    }

    /// Attach the behavior script `name` to `entity`, running with the
    /// entity owner's authority.
    pub fn attach_script(&mut self, entity: EntityId, name: &str) -> SimResult<InstanceId> {
        let source = self
            .loader
            .load(ScriptCategory::Behavior, name)
            .ok_or_else(|| SimError::ScriptNotFound(name.to_string()))?;
        self.attach_source(entity, &source)
    }

    /// Attach script text to `entity`, running with the entity owner's
    /// authority.
    pub fn attach_source(&mut self, entity: EntityId, source: &str) -> SimResult<InstanceId> {
        let owner = self
            .world
            .entity(entity)
            .map(|e| e.owner_id)
            .ok_or(WorldError::EntityNotFound(entity))?;
        self.attach_source_with_authority(entity, source, owner)
    }

    /// Attach script text to `entity` with an explicit authority.
    pub fn attach_source_with_authority(
        &mut self,
        entity: EntityId,
        source: &str,
        authority: i32,
    ) -> SimResult<InstanceId> {
        self.scripts.attach(&self.world, entity, source, authority)
    }

    /// Remove a live script instance.
    pub fn detach(&mut self, id: InstanceId) -> bool {
        self.scripts.detach(id)
    }

    /// Add or replace a system function.
    pub fn register_system_function(
        &mut self,
        name: impl Into<String>,
        f: impl Fn(&mut SystemCall<'_>) -> SystemReturn + 'static,
    ) {
        self.scripts.systems_mut().register(name, f);
    }

    /// Advance the simulation by one tick.
    pub fn tick(&mut self) {
        let tick = self.clock.advance();
        self.world.set_tick(tick);

        let mut env = ScriptEnv {
            world: &mut self.world,
            repository: &self.repository,
            registry: &self.registry,
            loader: self.loader.as_ref(),
            config: &self.config,
            tick,
        };
        self.scripts.tick_scripts(&mut env);

        self.world.tick_entities();
    }

    /// Advance the simulation by `n` ticks.
    pub fn run(&mut self, n: u64) {
        for _ in 0..n {
            self.tick();
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn scripts(&self) -> &ScriptManager {
        &self.scripts
    }

    pub fn repository(&self) -> &FunctionRepository {
        &self.repository
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn current_tick(&self) -> u64 {
        self.clock.tick()
    }

    /// Extract the world, consuming the simulation.
    pub fn into_world(self) -> World {
        self.world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MemoryLoader;
    use crate::value::Value;
    use ss_world::{EntityType, ItemType, SERVER_OWNER, TilePos, TypeCatalog};

    fn world() -> World {
        World::new(
            TypeCatalog::new(vec![EntityType::new(0, "Npc")]),
            TypeCatalog::new(vec![ItemType::new(0, "Key")]),
        )
    }

    #[test]
    fn attach_named_behavior() {
        let loader = MemoryLoader::new().with(ScriptCategory::Behavior, "greeter", "log(\"hello\")\nexit()");
        let mut sim = Simulation::new(world(), loader, SimConfig::default()).unwrap();
        let npc = sim.world_mut().spawn(0, TilePos::default(), 7).unwrap();

        let id = sim.attach_script(npc, "greeter").unwrap();
        assert_eq!(sim.scripts().get(id).unwrap().authority(), 7);
        assert!(matches!(
            sim.attach_script(npc, "missing"),
            Err(SimError::ScriptNotFound(_))
        ));

        sim.tick();
        assert_eq!(sim.current_tick(), 1);
        assert_eq!(sim.world().tick(), 1);
        assert!(sim.scripts().is_empty());
        assert_eq!(sim.world().entity(npc).unwrap().log.front().map(String::as_str), Some("hello"));
    }

    #[test]
    fn custom_system_function() {
        let mut sim = Simulation::new(world(), MemoryLoader::new(), SimConfig::default()).unwrap();
        sim.register_system_function("answer", |_call| SystemReturn::value(42_i64));
        let npc = sim
            .world_mut()
            .spawn(0, TilePos::default(), SERVER_OWNER)
            .unwrap();
        let id = sim
            .attach_source(npc, "var a = answer() + 1\nlog(a)\nsleep(1)")
            .unwrap();

        sim.tick();
        let instance = sim.scripts().get(id).unwrap();
        assert_eq!(instance.variable("a"), Some(&Value::Int(43)));
        assert_eq!(sim.world().entity(npc).unwrap().log.back().map(String::as_str), Some("43"));
    }

    #[test]
    fn max_events_bounds_the_log() {
        let config = SimConfig::default().with_max_events(2);
        let mut sim = Simulation::new(world(), MemoryLoader::new(), config).unwrap();
        let npc = sim.world_mut().spawn(0, TilePos::default(), SERVER_OWNER).unwrap();
        sim.attach_source(npc, "log(1)\nlog(2)\nlog(3)\nexit()").unwrap();
        sim.tick();
        assert_eq!(sim.world().events().len(), 2);
    }

    #[test]
    fn run_advances_clock() {
        let mut sim = Simulation::new(world(), MemoryLoader::new(), SimConfig::default()).unwrap();
        sim.run(5);
        assert_eq!(sim.current_tick(), 5);
        let world = sim.into_world();
        assert_eq!(world.tick(), 5);
    }
}
