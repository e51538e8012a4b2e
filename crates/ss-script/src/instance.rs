use std::collections::HashMap;
use std::fmt;

use ss_world::EntityId;

use crate::chain;
use crate::context::ScriptContext;
use crate::error::ScriptError;
use crate::eval::{Flow, LineState};
use crate::loader::ScriptCategory;
use crate::logic;
use crate::value::Value;

/// Unique id of a script instance. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(pub u64);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Program counter of an instance.
///
/// `logic_depth <= line_depth` always holds. Statements run only while the
/// two are equal, i.e. every enclosing block was entered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    /// Next line to interpret.
    pub line_index: usize,
    /// Number of open `if` blocks.
    pub line_depth: usize,
    /// Number of open blocks whose branch was taken.
    pub logic_depth: usize,
}

/// Where to resume after a child returns a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCall {
    /// The child being waited on.
    pub child: InstanceId,
    /// Line text as it was when the call was made.
    pub line: String,
    /// Call text inside `line` that the return value replaces.
    pub statement: String,
}

/// Line and statement text a call wants its value substituted into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumePoint {
    /// Line text to re-evaluate.
    pub line: String,
    /// Call text to replace with the returned literal.
    pub statement: String,
}

/// Coarse lifecycle state, for introspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    /// Evaluating lines, or ready to.
    Running,
    /// Blocked on a child instance.
    AwaitingChildReturn,
    /// Yielded until a later tick.
    Sleeping,
    /// Exited or failed. Never runs again.
    Terminated,
}

/// What a terminated child hands back to its parent.
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalReturn {
    /// Normal `exit`, with the returned value (empty text when none).
    Value(Value),
    /// The child failed; the parent fails with the same error.
    Failed(ScriptError),
}

/// A request to run an entity or item function as a child instance.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRequest {
    /// Entity the child is attached to.
    pub host: EntityId,
    /// Authority the child runs with.
    pub authority: i32,
    /// Loader category of the child script.
    pub category: ScriptCategory,
    /// Loader name of the child script.
    pub script: String,
    /// Variables injected into the child (`_entity`, `_item`, `_paramN`).
    pub seeds: Vec<(String, Value)>,
    /// Set when the caller wants the return value.
    pub resume: Option<ResumePoint>,
}

/// How an instance ended.
#[derive(Debug, Clone, PartialEq)]
pub struct Termination {
    /// The instance that ended.
    pub instance: InstanceId,
    /// Entity it was attached to.
    pub entity: EntityId,
    /// Caller waiting for the result, if any.
    pub parent: Option<InstanceId>,
    /// 1-based line the error was raised on, if any.
    pub line: Option<usize>,
    /// Returned value, or the error that ended the run.
    pub result: Result<Option<Value>, ScriptError>,
}

/// Result of one [`ScriptInstance::tick`].
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Disabled, gated, or already ticked this tick.
    Skipped,
    /// Stopped for this tick; resumes on a later one.
    Yielded,
    /// Suspended on a call; the scheduler must spawn the child.
    Called(CallRequest),
    /// Finished, by `exit` or by error.
    Terminated(Termination),
}

/// One running script bound to one entity.
#[derive(Debug, Clone)]
pub struct ScriptInstance {
    pub(crate) id: InstanceId,
    pub(crate) entity: EntityId,
    pub(crate) authority: i32,
    lines: Vec<String>,
    cursor: Cursor,
    pub(crate) variables: HashMap<String, Value>,
    seeds: Vec<(String, Value)>,
    enabled: bool,
    valid: bool,
    state: InstanceState,
    pub(crate) parent: Option<InstanceId>,
    pending: Option<PendingCall>,
    awaiting: Option<InstanceId>,
    external: Option<ExternalReturn>,
    last_tick: Option<u64>,
}

impl ScriptInstance {
    pub(crate) fn new(id: InstanceId, entity: EntityId, authority: i32, source: &str) -> Self {
        let mut instance = Self {
            id,
            entity,
            authority,
            lines: source.lines().map(|l| l.trim().to_string()).collect(),
            cursor: Cursor::default(),
            variables: HashMap::new(),
            seeds: Vec::new(),
            enabled: true,
            valid: true,
            state: InstanceState::Running,
            parent: None,
            pending: None,
            awaiting: None,
            external: None,
            last_tick: None,
        };
        instance.reinitialize();
        instance
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Entity this instance is attached to.
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn authority(&self) -> i32 {
        self.authority
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn state(&self) -> InstanceState {
        self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn parent(&self) -> Option<InstanceId> {
        self.parent
    }

    /// Child currently awaited, if any.
    pub fn awaiting(&self) -> Option<InstanceId> {
        self.awaiting
    }

    pub fn pending_call(&self) -> Option<&PendingCall> {
        self.pending.as_ref()
    }

    /// Current value of a script variable.
    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Inject a variable that survives every re-initialization.
    pub(crate) fn seed(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        self.variables.insert(name.clone(), value.clone());
        self.seeds.push((name, value));
    }

    /// Mark this instance as blocked on `child`.
    pub(crate) fn await_child(&mut self, child: InstanceId, resume: Option<ResumePoint>) {
        self.awaiting = Some(child);
        self.pending = resume.map(|r| PendingCall {
            child,
            line: r.line,
            statement: r.statement,
        });
    }

    /// Hand a child's result to this instance and re-enable it.
    pub(crate) fn deliver(&mut self, ret: ExternalReturn) {
        self.external = Some(ret);
        self.enabled = true;
    }

    /// Terminate from outside (failed spawn, detach).
    pub(crate) fn abort(&mut self, error: ScriptError) -> Termination {
        self.finish(Err(error), None)
    }

    /// Reset the cursor and rebuild variables from the seeds.
    fn reinitialize(&mut self) {
        self.cursor = Cursor::default();
        self.variables.clear();
        for (name, value) in &self.seeds {
            self.variables.insert(name.clone(), value.clone());
        }
        self.variables
            .insert("this".to_string(), Value::Entity(self.entity));
    }

    fn finish(&mut self, result: Result<Option<Value>, ScriptError>, line: Option<usize>) -> Termination {
        self.enabled = false;
        self.valid = false;
        self.state = InstanceState::Terminated;
        self.pending = None;
        self.awaiting = None;
        Termination {
            instance: self.id,
            entity: self.entity,
            parent: self.parent,
            line,
            result,
        }
    }

    fn terminate(&mut self, result: Result<Option<Value>, ScriptError>, line: Option<usize>) -> TickOutcome {
        TickOutcome::Terminated(self.finish(result, line))
    }

    /// Run this instance for one tick. `forced` bypasses the once-per-tick
    /// guard; the scheduler sets it when spawning a child and when resuming
    /// a parent.
    pub(crate) fn tick(&mut self, ctx: &mut ScriptContext<'_>, forced: bool) -> TickOutcome {
        if !self.enabled || !self.valid {
            return TickOutcome::Skipped;
        }
        let Some(entity) = ctx.world.entity(self.entity) else {
            let error = ScriptError::NullReference(format!("$Entity[{}]", self.entity));
            return self.terminate(Err(error), None);
        };
        if !entity.can_act() {
            return TickOutcome::Skipped;
        }
        if !forced && self.last_tick == Some(ctx.tick) {
            return TickOutcome::Skipped;
        }
        self.last_tick = Some(ctx.tick);
        self.state = InstanceState::Running;
        self.awaiting = None;

        let mut resumed_line = None;
        match self.external.take() {
            Some(ExternalReturn::Failed(error)) => {
                let line = self.pending.as_ref().map(|_| self.cursor.line_index + 1);
                return self.terminate(Err(error), line);
            }
            Some(ExternalReturn::Value(value)) => {
                if let Some(pending) = self.pending.take() {
                    if !pending.line.contains(&pending.statement) {
                        let line = Some(self.cursor.line_index + 1);
                        return self.terminate(Err(ScriptError::LostResume(pending.statement)), line);
                    }
                    tracing::debug!(
                        instance = %self.id,
                        "resuming '{}' with {}",
                        pending.statement,
                        value.literal()
                    );
                    resumed_line = Some(pending.line.replacen(&pending.statement, &value.literal(), 1));
                }
            }
            None => {}
        }

        let mut budget = ctx.config.token_budget;
        let mut evaluated_this_pass = true;
        loop {
            if self.cursor.line_index >= self.lines.len() {
                if !evaluated_this_pass || self.lines.is_empty() {
                    return TickOutcome::Yielded;
                }
                evaluated_this_pass = false;
                self.reinitialize();
            }

            let index = self.cursor.line_index;
            let line = resumed_line
                .take()
                .unwrap_or_else(|| self.lines[index].clone());
            self.cursor.line_index += 1;

            let mut state = LineState::new(&line);
            match self.run_line(ctx, &mut state, &mut budget) {
                Ok(significant) => evaluated_this_pass |= significant,
                Err(Flow::Error(error)) => return self.terminate(Err(error), Some(index + 1)),
                Err(Flow::Exit(value)) => return self.terminate(Ok(value), None),
                Err(Flow::Call(request)) => {
                    if request.resume.is_some() {
                        self.cursor.line_index = index;
                    }
                    self.enabled = false;
                    self.state = InstanceState::AwaitingChildReturn;
                    return TickOutcome::Called(request);
                }
            }

            if let Some(cooldown) = state.yield_request {
                if cooldown > 0 {
                    if let Err(e) = ctx.world.extend_cooldown(self.entity, cooldown) {
                        tracing::debug!(instance = %self.id, "cooldown not applied: {e}");
                    }
                }
                self.state = InstanceState::Sleeping;
                return TickOutcome::Yielded;
            }
        }
    }

    /// Interpret one line. Returns whether it was a logic-significant
    /// statement.
    fn run_line(
        &mut self,
        ctx: &mut ScriptContext<'_>,
        state: &mut LineState<'_>,
        budget: &mut usize,
    ) -> Result<bool, Flow> {
        let line = state.text.trim();
        if line.is_empty() || is_comment(line) {
            return Ok(false);
        }

        let cursor = &mut self.cursor;
        if line == "end" {
            if cursor.line_depth == 0 {
                return Err(ScriptError::UnexpectedBlockKeyword("end").into());
            }
            if cursor.line_depth == cursor.logic_depth {
                cursor.logic_depth -= 1;
            }
            cursor.line_depth -= 1;
            return Ok(false);
        }
        if line == "else" {
            if cursor.line_depth == 0 {
                return Err(ScriptError::UnexpectedBlockKeyword("else").into());
            }
            if cursor.line_depth == cursor.logic_depth + 1 {
                cursor.logic_depth += 1;
            } else if cursor.line_depth == cursor.logic_depth {
                cursor.logic_depth -= 1;
            }
            return Ok(false);
        }

        let condition = if_condition(line);
        if cursor.line_depth != cursor.logic_depth {
            if condition.is_some() {
                cursor.line_depth += 1;
            }
            return Ok(false);
        }

        if *budget == 0 {
            return Err(ScriptError::BudgetExceeded.into());
        }
        *budget -= 1;
        tracing::debug!(instance = %self.id, line = self.cursor.line_index, "{line}");

        if let Some(rest) = line.strip_prefix("var ") {
            let (name, expr) = split_var(rest)?;
            if self.variables.contains_key(name) {
                return Err(ScriptError::VariableAlreadyDefined(name.to_string()).into());
            }
            let value = self.evaluate_expression(ctx, state, expr)?;
            self.variables.insert(name.to_string(), value);
            return Ok(true);
        }

        if let Some(expr) = condition {
            let taken = logic::evaluate(expr.trim(), |lhs, op, rhs| {
                let a = self.evaluate_expression(ctx, state, lhs)?;
                let b = self.evaluate_expression(ctx, state, rhs)?;
                Ok::<bool, Flow>(op.apply(&a, &b)?)
            })?;
            self.cursor.line_depth += 1;
            if taken {
                self.cursor.logic_depth += 1;
            }
            return Ok(true);
        }

        if let Some((name, expr)) = chain::split_assignment(line) {
            if !chain::is_identifier(name) {
                return Err(ScriptError::InvalidVariableSyntax.into());
            }
            if !self.variables.contains_key(name) {
                return Err(ScriptError::VariableNotDefined(name.to_string()).into());
            }
            let value = self.evaluate_expression(ctx, state, expr)?;
            self.variables.insert(name.to_string(), value);
            return Ok(true);
        }

        self.evaluate_statement(ctx, state, line, false)?;
        Ok(true)
    }
}

pub(crate) fn is_comment(line: &str) -> bool {
    line.starts_with("//") || line.starts_with('#') || line.starts_with('$')
}

/// Split the text after `var ` into a valid, non-reserved name and its
/// initializer.
pub(crate) fn split_var(rest: &str) -> Result<(&str, &str), ScriptError> {
    let (name, expr) = rest
        .split_once('=')
        .ok_or(ScriptError::InvalidVariableSyntax)?;
    let name = name.trim();
    if !chain::is_identifier(name) || matches!(name, "_" | "items") {
        return Err(ScriptError::InvalidVariableSyntax);
    }
    Ok((name, expr))
}

/// Condition text of an `if` line, or `None` for any other line.
pub(crate) fn if_condition(line: &str) -> Option<&str> {
    if line == "if" {
        Some("")
    } else {
        line.strip_prefix("if ")
    }
}
