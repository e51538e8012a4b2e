//! Tick-driven interpreter for SimpleScript, the line-oriented language that
//! drives entities in an [`ss_world::World`].
//!
//! Each [`ScriptInstance`] is a program counter and a variable table bound to
//! one entity. Once per tick the [`ScriptManager`] runs every live instance
//! for a bounded number of statements. Calls to entity and item functions
//! spawn child instances that are ticked immediately; their return values
//! are substituted back into the caller's line. [`Simulation`] ties the world,
//! the script loader, and the scheduler together.

/// Pure text helpers: chain tokenizer, call and parameter splitting.
pub mod chain;
/// Static validation of script text.
pub mod check;
/// Simulation tick counter.
pub mod clock;
/// Interpreter configuration.
pub mod config;
/// Borrowed state handed to the scheduler and to running instances.
pub mod context;
/// Error types for scripts and simulation setup.
pub mod error;
mod eval;
/// Script instances and their per-tick state machine.
pub mod instance;
/// Script sources: directories on disk and in-memory maps.
pub mod loader;
/// `if` condition evaluation.
pub mod logic;
/// The scheduler that owns and drives script instances.
pub mod manager;
/// Per-type public function lists.
pub mod registry;
/// Function metadata loaded from function scripts.
pub mod repository;
/// Top-level simulation orchestrator.
pub mod simulation;
/// Built-in system functions and the catalog that hosts them.
pub mod system;
/// Script values.
pub mod value;

/// Re-exports of the static checker.
pub use check::{Problem, check};
/// Re-export of [`clock::SimClock`].
pub use clock::SimClock;
/// Re-export of [`config::SimConfig`].
pub use config::SimConfig;
/// Re-exports of the error types.
pub use error::{ErrorKind, ScriptError, ScriptResult, SimError, SimResult};
/// Largest summed tile delta between a caller and an entity it calls.
pub use eval::MAX_CALL_RANGE;
/// Re-exports of instance types.
pub use instance::{Cursor, InstanceId, InstanceState, ScriptInstance};
/// Re-exports of loader types.
pub use loader::{DirectoryLoader, MemoryLoader, ScriptCategory, ScriptSource};
/// Re-export of [`manager::ScriptManager`].
pub use manager::ScriptManager;
/// Re-export of [`registry::TypeRegistry`].
pub use registry::TypeRegistry;
/// Re-exports of repository types.
pub use repository::{FunctionDescriptor, FunctionId, FunctionRepository};
/// Re-export of [`simulation::Simulation`].
pub use simulation::Simulation;
/// Re-exports of system function types.
pub use system::{Accessor, Sentinel, SystemCall, SystemCatalog, SystemReturn};
/// Re-export of [`value::Value`].
pub use value::Value;
