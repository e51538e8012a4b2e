use ss_world::World;

use crate::config::SimConfig;
use crate::loader::ScriptSource;
use crate::registry::TypeRegistry;
use crate::repository::FunctionRepository;
use crate::system::SystemCatalog;

/// What the scheduler needs from its owner for one tick.
pub struct ScriptEnv<'a> {
    /// The world scripts act on.
    pub world: &'a mut World,
    /// Entity and item function metadata.
    pub repository: &'a FunctionRepository,
    /// Public function lists per type.
    pub registry: &'a TypeRegistry,
    /// Source of child scripts.
    pub loader: &'a dyn ScriptSource,
    /// Interpreter limits.
    pub config: &'a SimConfig,
    /// Current tick.
    pub tick: u64,
}

/// Mutable context passed to a script instance while it evaluates lines.
pub struct ScriptContext<'a> {
    pub world: &'a mut World,
    pub repository: &'a FunctionRepository,
    pub registry: &'a TypeRegistry,
    pub systems: &'a SystemCatalog,
    pub config: &'a SimConfig,
    pub tick: u64,
}
