//! Built-in functions available to every script, and the catalog that hosts
//! them.
//!
//! System functions report failures through their return data: a string of
//! the form `!E<code>[ args]`. The interpreter decodes that back into a
//! [`ScriptError`] for the calling instance.

use std::collections::BTreeMap;
use std::fmt;

use ss_world::{Command, Direction, EntityId, World, WorldError};

use crate::error::ScriptError;
use crate::value::Value;

/// What a system call was invoked on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accessor {
    /// Plain call, `get()`.
    None,
    /// Authority root, `_:get(3)`.
    Authority,
    /// Inventory root, `items:get(0)`.
    Items,
    /// A value produced earlier in the chain.
    Target(Value),
}

impl fmt::Display for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("NULL"),
            Self::Authority => f.write_str("_"),
            Self::Items => f.write_str("items"),
            Self::Target(v) => f.write_str(&v.literal()),
        }
    }
}

/// Error codes carried in system function return data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sentinel {
    /// `1000`: no such function for this accessor.
    UnknownFunction,
    /// `1001 n`: wrong parameter count, `n` expected.
    WrongArity(usize),
    /// `1002`: a referenced entity or item does not exist.
    NullReference,
    /// `1003 msg`: inventory or slot failure.
    Resource(String),
    /// `9000 msg`: free-form failure.
    Custom(String),
    /// `9999`: path not implemented.
    NotImplemented,
}

impl Sentinel {
    const PREFIX: &'static str = "!E";

    /// Render as return data.
    pub fn encode(&self) -> String {
        match self {
            Self::UnknownFunction => "!E1000".into(),
            Self::WrongArity(n) => format!("!E1001 {n}"),
            Self::NullReference => "!E1002".into(),
            Self::Resource(msg) => format!("!E1003 {msg}"),
            Self::Custom(msg) => format!("!E9000 {msg}"),
            Self::NotImplemented => "!E9999".into(),
        }
    }

    /// Decode return data. `None` when the data is not a sentinel.
    pub fn decode(data: &str) -> Option<Self> {
        let body = data.strip_prefix(Self::PREFIX)?;
        let (code, args) = body.split_once(' ').unwrap_or((body, ""));
        Some(match code {
            "1000" => Self::UnknownFunction,
            "1001" => Self::WrongArity(args.trim().parse().unwrap_or(0)),
            "1002" => Self::NullReference,
            "1003" => Self::Resource(args.to_string()),
            "9000" => Self::Custom(args.to_string()),
            "9999" => Self::NotImplemented,
            other => Self::Custom(format!("Unknown error code {other}")),
        })
    }

    /// Turn into the calling instance's error.
    pub fn into_error(self, accessor: &Accessor, function: &str, got: usize) -> ScriptError {
        match self {
            Self::UnknownFunction => ScriptError::UnknownFunction(format!("{accessor}:{function}")),
            Self::WrongArity(expected) => ScriptError::Arity {
                function: function.to_string(),
                expected,
                got,
            },
            Self::NullReference => ScriptError::NullReference(format!("{accessor}:{function}")),
            Self::Resource(msg) => ScriptError::Resource(msg),
            Self::Custom(msg) => ScriptError::Custom(msg),
            Self::NotImplemented => ScriptError::NotImplemented(format!("{accessor}:{function}")),
        }
    }
}

/// Result of a system function.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SystemReturn {
    /// Return data: literal text, plain text, or a sentinel.
    pub data: Option<String>,
    /// `< 0` yields the caller now, `0` continues, `> 0` puts the entity on
    /// cooldown for that many ticks and yields.
    pub tick_cooldown: i32,
    /// Terminate the calling instance, handing `data` to its parent.
    pub exit: bool,
}

impl SystemReturn {
    /// No data, keep going.
    pub fn done() -> Self {
        Self::default()
    }

    /// Return `value`, keep going.
    pub fn value(value: impl Into<Value>) -> Self {
        Self {
            data: Some(value.into().literal()),
            ..Self::default()
        }
    }

    /// No data, stop evaluating until the next tick.
    pub fn yield_now() -> Self {
        Self {
            tick_cooldown: -1,
            ..Self::default()
        }
    }

    /// No data, cool down for `ticks`.
    pub fn cooldown(ticks: i32) -> Self {
        Self {
            tick_cooldown: ticks,
            ..Self::default()
        }
    }

    /// Terminate with an optional return value.
    pub fn exit(value: Option<&Value>) -> Self {
        Self {
            data: value.map(Value::literal),
            exit: true,
            ..Self::default()
        }
    }

    /// Fail with a sentinel.
    pub fn error(sentinel: Sentinel) -> Self {
        Self {
            data: Some(sentinel.encode()),
            ..Self::default()
        }
    }
}

/// Everything a system function can see.
#[derive(Debug)]
pub struct SystemCall<'a> {
    /// The world, for lookups and mutations.
    pub world: &'a mut World,
    /// Entity the calling script is attached to.
    pub entity: EntityId,
    /// Authority of the calling script.
    pub authority: i32,
    /// What the function was invoked on.
    pub accessor: &'a Accessor,
    /// Evaluated parameters.
    pub params: &'a [Value],
}

impl SystemCall<'_> {
    /// Same call with different parameters.
    pub fn with_params<'b>(&'b mut self, params: &'b [Value]) -> SystemCall<'b> {
        SystemCall {
            world: &mut *self.world,
            entity: self.entity,
            authority: self.authority,
            accessor: self.accessor,
            params,
        }
    }

    /// Fail unless exactly `n` parameters were given.
    pub fn expect_params(&self, n: usize) -> Result<(), Sentinel> {
        if self.params.len() == n {
            Ok(())
        } else {
            Err(Sentinel::WrongArity(n))
        }
    }

    /// Integer parameter `i`.
    pub fn int(&self, i: usize) -> Result<i64, Sentinel> {
        let param = self.params.get(i).ok_or(Sentinel::NullReference)?;
        param
            .as_int()
            .ok_or_else(|| Sentinel::Custom(format!("Expected a number, got {}", param.literal())))
    }

    /// Entity parameter `i`, given as a reference or a numeric id. The
    /// entity must exist.
    pub fn entity(&self, i: usize) -> Result<EntityId, Sentinel> {
        let param = self.params.get(i).ok_or(Sentinel::NullReference)?;
        let id = match param {
            Value::Entity(id) => *id,
            other => other
                .as_int()
                .and_then(|n| u32::try_from(n).ok())
                .map(EntityId)
                .ok_or(Sentinel::NullReference)?,
        };
        if self.world.entity(id).is_none() {
            return Err(Sentinel::NullReference);
        }
        Ok(id)
    }
}

/// Signature of a system function.
pub type SystemFn = Box<dyn Fn(&mut SystemCall<'_>) -> SystemReturn>;

/// Name → system function.
pub struct SystemCatalog {
    functions: BTreeMap<String, SystemFn>,
}

impl fmt::Debug for SystemCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SystemCatalog")
            .field("functions", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Default for SystemCatalog {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl SystemCatalog {
    /// A catalog with no functions.
    pub fn empty() -> Self {
        Self {
            functions: BTreeMap::new(),
        }
    }

    /// A catalog with every built-in function registered.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::empty();
        catalog.register_builtin("log", log);
        catalog.register_builtin("exit", exit);
        catalog.register_builtin("move", move_entity);
        catalog.register_builtin("up", |c| step(c, Direction::Up));
        catalog.register_builtin("down", |c| step(c, Direction::Down));
        catalog.register_builtin("left", |c| step(c, Direction::Left));
        catalog.register_builtin("right", |c| step(c, Direction::Right));
        catalog.register_builtin("get", get);
        catalog.register_builtin("sleep", sleep);
        catalog.register_builtin("giveItem", give_item);
        catalog.register_builtin("shake", shake);
        catalog
    }

    /// Register a function, replacing any previous one with the same name.
    pub fn register(&mut self, name: impl Into<String>, f: impl Fn(&mut SystemCall<'_>) -> SystemReturn + 'static) {
        self.functions.insert(name.into(), Box::new(f));
    }

    fn register_builtin(
        &mut self,
        name: &str,
        f: impl Fn(&mut SystemCall<'_>) -> Result<SystemReturn, Sentinel> + 'static,
    ) {
        self.register(name, move |call| f(call).unwrap_or_else(SystemReturn::error));
    }

    pub fn get(&self, name: &str) -> Option<&SystemFn> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Built-ins
// ---------------------------------------------------------------------------

fn log(call: &mut SystemCall<'_>) -> Result<SystemReturn, Sentinel> {
    if *call.accessor != Accessor::None {
        return Err(Sentinel::UnknownFunction);
    }
    call.expect_params(1)?;
    let message = call.params[0].to_string();
    tracing::info!(target: "script", entity = %call.entity, "{message}");
    call.world
        .append_log(call.entity, message)
        .map_err(|_| Sentinel::NullReference)?;
    Ok(SystemReturn::done())
}

fn exit(call: &mut SystemCall<'_>) -> Result<SystemReturn, Sentinel> {
    if *call.accessor != Accessor::None {
        return Err(Sentinel::UnknownFunction);
    }
    if call.params.len() > 1 {
        return Err(Sentinel::WrongArity(1));
    }
    Ok(SystemReturn::exit(call.params.first()))
}

fn move_entity(call: &mut SystemCall<'_>) -> Result<SystemReturn, Sentinel> {
    match call.accessor {
        Accessor::None => {
            call.expect_params(1)?;
            let index = call.int(0)?;
            let direction = Direction::from_index(index)
                .ok_or_else(|| Sentinel::Custom(format!("Invalid direction {index}")))?;
            call.world
                .send_command(call.entity, Command::Move(direction), call.authority)
                .map_err(|e| match e {
                    WorldError::NotAuthorized { .. } => Sentinel::Custom("Invalid authentication".into()),
                    _ => Sentinel::NullReference,
                })?;
            Ok(SystemReturn::yield_now())
        }
        Accessor::Authority => {
            call.expect_params(4)?;
            let target = call.entity(0)?;
            let to = ss_world::TilePos::new(coord(call, 1)?, coord(call, 2)?, coord(call, 3)?);
            call.world
                .try_move(target, to, true)
                .map_err(|_| Sentinel::NullReference)?;
            Ok(SystemReturn::done())
        }
        Accessor::Target(_) => Err(Sentinel::NotImplemented),
        Accessor::Items => Err(Sentinel::UnknownFunction),
    }
}

fn coord(call: &SystemCall<'_>, i: usize) -> Result<i32, Sentinel> {
    let n = call.int(i)?;
    i32::try_from(n).map_err(|_| Sentinel::Custom(format!("Coordinate out of range: {n}")))
}

fn step(call: &mut SystemCall<'_>, direction: Direction) -> Result<SystemReturn, Sentinel> {
    call.expect_params(0)?;
    let params = [Value::Int(direction.index())];
    move_entity(&mut call.with_params(&params))
}

fn get(call: &mut SystemCall<'_>) -> Result<SystemReturn, Sentinel> {
    match call.accessor {
        Accessor::None => {
            call.expect_params(0)?;
            let me = call.world.entity(call.entity).ok_or(Sentinel::NullReference)?;
            let ahead = me.pos.step(me.direction);
            let found = call.world.entity_at(ahead).ok_or(Sentinel::NullReference)?;
            Ok(SystemReturn::value(found))
        }
        Accessor::Authority => {
            call.expect_params(1)?;
            Ok(SystemReturn::value(call.entity(0)?))
        }
        Accessor::Items => {
            call.expect_params(1)?;
            let slot = call.int(0)?;
            let me = call.world.entity(call.entity).ok_or(Sentinel::NullReference)?;
            let item = usize::try_from(slot)
                .ok()
                .and_then(|s| me.item_in_slot(s))
                .ok_or_else(|| Sentinel::Resource(format!("Item slot {slot} not found")))?;
            Ok(SystemReturn::value(item))
        }
        Accessor::Target(_) => Err(Sentinel::UnknownFunction),
    }
}

fn sleep(call: &mut SystemCall<'_>) -> Result<SystemReturn, Sentinel> {
    if *call.accessor != Accessor::None {
        return Err(Sentinel::UnknownFunction);
    }
    call.expect_params(1)?;
    let ticks = call.int(0)?;
    let ticks = i32::try_from(ticks)
        .ok()
        .filter(|t| *t >= 0)
        .ok_or_else(|| Sentinel::Custom(format!("Invalid sleep duration {ticks}")))?;
    if ticks == 0 {
        return Ok(SystemReturn::yield_now());
    }
    Ok(SystemReturn::cooldown(ticks))
}

fn give_item(call: &mut SystemCall<'_>) -> Result<SystemReturn, Sentinel> {
    if *call.accessor != Accessor::Authority {
        return Err(Sentinel::UnknownFunction);
    }
    call.expect_params(2)?;
    let target = call.entity(0)?;
    let item_type = u32::try_from(call.int(1)?).map_err(|_| Sentinel::NullReference)?;
    match call.world.give_item(target, item_type) {
        Ok(item) => Ok(SystemReturn::value(item)),
        Err(e @ (WorldError::InventoryFull(_) | WorldError::NoStorage(_))) => {
            Err(Sentinel::Resource(e.to_string()))
        }
        Err(_) => Err(Sentinel::NullReference),
    }
}

fn shake(call: &mut SystemCall<'_>) -> Result<SystemReturn, Sentinel> {
    if *call.accessor != Accessor::Authority {
        return Err(Sentinel::UnknownFunction);
    }
    call.expect_params(2)?;
    let target = call.entity(0)?;
    let seconds = match &call.params[1] {
        Value::Int(n) => *n as f64,
        Value::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| Sentinel::Custom(format!("Invalid duration {s}")))?,
        other => return Err(Sentinel::Custom(format!("Invalid duration {}", other.literal()))),
    };
    call.world
        .shake(target, seconds)
        .map_err(|_| Sentinel::NullReference)?;
    Ok(SystemReturn::done())
}
